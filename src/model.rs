//! Classifier training: logistic regression and a grid-searched random forest
//!
//! The forest is a bootstrap-aggregated ensemble of linfa decision trees with
//! per-tree feature subsampling; the grid search exhaustively scores every
//! hyperparameter candidate with k-fold cross-validation on the training
//! partition and refits the winner on the full training set.

use std::fmt;
use std::fs;
use std::path::Path;

use linfa::prelude::*;
use linfa::Dataset;
use linfa_logistic::{FittedLogisticRegression, LogisticRegression};
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ChurnError;
use crate::eval::accuracy;

/// Iteration cap for the logistic solver, raised beyond the library default
/// so it converges on this data scale. Fixed, not tuned.
pub const LOGISTIC_MAX_ITERATIONS: u64 = 3000;

/// Split quality criterion for the forest's trees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criterion {
    Gini,
    Entropy,
}

impl From<Criterion> for SplitQuality {
    fn from(criterion: Criterion) -> Self {
        match criterion {
            Criterion::Gini => SplitQuality::Gini,
            Criterion::Entropy => SplitQuality::Entropy,
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::Gini => write!(f, "gini"),
            Criterion::Entropy => write!(f, "entropy"),
        }
    }
}

/// Strategy for the number of features considered per tree
///
/// For a classifier both variants resolve to ceil(sqrt(n_features)); they are
/// kept as distinct grid entries because the searched grid lists both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaxFeatures {
    Auto,
    Sqrt,
}

impl MaxFeatures {
    pub fn resolve(&self, n_features: usize) -> usize {
        ((n_features as f64).sqrt().ceil() as usize).clamp(1, n_features)
    }
}

impl fmt::Display for MaxFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxFeatures::Auto => write!(f, "auto"),
            MaxFeatures::Sqrt => write!(f, "sqrt"),
        }
    }
}

/// One hyperparameter configuration for the random forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_features: MaxFeatures,
    pub max_depth: Option<usize>,
    pub criterion: Criterion,
}

impl fmt::Display for ForestParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n_trees={}, max_features={}, max_depth={}, criterion={}",
            self.n_trees,
            self.max_features,
            self.max_depth
                .map_or_else(|| "none".to_string(), |d| d.to_string()),
            self.criterion
        )
    }
}

/// The searched hyperparameter grid
#[derive(Debug, Clone)]
pub struct ParamGrid {
    pub n_trees: Vec<usize>,
    pub max_features: Vec<MaxFeatures>,
    pub max_depth: Vec<Option<usize>>,
    pub criterion: Vec<Criterion>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            n_trees: vec![200, 500],
            max_features: vec![MaxFeatures::Auto, MaxFeatures::Sqrt],
            max_depth: vec![Some(4), Some(5), Some(100)],
            criterion: vec![Criterion::Gini, Criterion::Entropy],
        }
    }
}

impl ParamGrid {
    /// Enumerate every candidate configuration in grid order
    pub fn candidates(&self) -> Vec<ForestParams> {
        let mut candidates = Vec::new();
        for &n_trees in &self.n_trees {
            for &max_features in &self.max_features {
                for &max_depth in &self.max_depth {
                    for &criterion in &self.criterion {
                        candidates.push(ForestParams {
                            n_trees,
                            max_features,
                            max_depth,
                            criterion,
                        });
                    }
                }
            }
        }
        candidates
    }
}

/// One tree of the ensemble together with the feature columns it was fit on
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TreeMember {
    tree: DecisionTree<f64, usize>,
    columns: Vec<usize>,
}

/// Bootstrap-aggregated decision tree classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    params: ForestParams,
    seed: u64,
    trees: Vec<TreeMember>,
    feature_names: Vec<String>,
    feature_importances: Vec<f64>,
}

impl RandomForestClassifier {
    /// Fit the ensemble on the given training data
    ///
    /// Each tree is trained on a bootstrap sample of the rows restricted to a
    /// random feature subset; trees are built in parallel with deterministic
    /// per-tree seeds derived from `seed`.
    pub fn fit(
        x: &Array2<f64>,
        y: &Array1<usize>,
        feature_names: &[String],
        params: &ForestParams,
        seed: u64,
    ) -> crate::Result<Self> {
        if x.nrows() == 0 {
            anyhow::bail!("Cannot fit a forest on an empty training set");
        }
        if x.nrows() != y.len() {
            anyhow::bail!(
                "Feature matrix has {} rows but target has {} values",
                x.nrows(),
                y.len()
            );
        }
        if feature_names.len() != x.ncols() {
            anyhow::bail!(
                "Got {} feature names for {} columns",
                feature_names.len(),
                x.ncols()
            );
        }

        let trees: Vec<TreeMember> = (0..params.n_trees)
            .into_par_iter()
            .map(|i| fit_tree(x, y, params, seed.wrapping_add(i as u64)))
            .collect::<crate::Result<_>>()?;

        // Aggregate per-tree importances back through each feature subset
        let mut importances = vec![0.0; x.ncols()];
        for member in &trees {
            let tree_importance = member.tree.feature_importance();
            for (local, &column) in member.columns.iter().enumerate() {
                importances[column] += tree_importance[local];
            }
        }
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for importance in &mut importances {
                *importance /= total;
            }
        }

        Ok(Self {
            params: params.clone(),
            seed,
            trees,
            feature_names: feature_names.to_vec(),
            feature_importances: importances,
        })
    }

    /// Majority-vote class prediction for each row
    pub fn predict(&self, x: &Array2<f64>) -> Array1<usize> {
        let mut votes = vec![0usize; x.nrows()];
        for member in &self.trees {
            let subset = x.select(Axis(1), &member.columns);
            let predictions = member.tree.predict(&subset);
            for (count, &prediction) in votes.iter_mut().zip(predictions.iter()) {
                *count += prediction;
            }
        }

        votes
            .into_iter()
            .map(|positive| (positive * 2 > self.trees.len()) as usize)
            .collect()
    }

    /// Normalized mean-decrease-in-impurity importance per feature,
    /// in feature matrix column order
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Feature names paired with importances, sorted descending
    pub fn importance_ranking(&self) -> Vec<(String, f64)> {
        let mut ranking: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(self.feature_importances.iter().copied())
            .collect();

        ranking.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranking
    }

    /// Hyperparameters this forest was fit with
    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Number of trees in the fitted ensemble
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Serialize the fitted model to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let json = serde_json::to_string(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load a fitted model from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

fn fit_tree(
    x: &Array2<f64>,
    y: &Array1<usize>,
    params: &ForestParams,
    seed: u64,
) -> crate::Result<TreeMember> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let n_rows = x.nrows();

    // Bootstrap rows with replacement
    let rows: Vec<usize> = (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();

    // Random feature subset for this tree
    let subset_size = params.max_features.resolve(x.ncols());
    let mut columns: Vec<usize> = (0..x.ncols()).collect();
    columns.shuffle(&mut rng);
    columns.truncate(subset_size);
    columns.sort_unstable();

    let x_boot = x.select(Axis(0), &rows).select(Axis(1), &columns);
    let y_boot: Array1<usize> = rows.iter().map(|&i| y[i]).collect();

    let dataset = Dataset::new(x_boot, y_boot);
    let tree = DecisionTree::params()
        .split_quality(params.criterion.into())
        .max_depth(params.max_depth)
        .fit(&dataset)?;

    Ok(TreeMember { tree, columns })
}

/// Serializable coefficients of a fitted logistic model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticSummary {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

/// Fit the logistic-regression classifier with the raised iteration cap
pub fn train_logistic(
    x_train: &Array2<f64>,
    y_train: &Array1<usize>,
) -> crate::Result<FittedLogisticRegression<f64, usize>> {
    let dataset = Dataset::new(x_train.clone(), y_train.clone());
    let model = LogisticRegression::default()
        .max_iterations(LOGISTIC_MAX_ITERATIONS)
        .fit(&dataset)?;
    Ok(model)
}

/// Extract and persist the logistic coefficients as a JSON artifact
pub fn save_logistic<P: AsRef<Path>>(
    model: &FittedLogisticRegression<f64, usize>,
    path: P,
) -> crate::Result<()> {
    let summary = LogisticSummary {
        coefficients: model.params().to_vec(),
        intercept: model.intercept(),
    };
    let json = serde_json::to_string(&summary)?;
    fs::write(path, json)?;
    Ok(())
}

/// Cross-validation scores for one grid candidate
#[derive(Debug, Clone)]
pub struct CvResult {
    pub params: ForestParams,
    pub fold_accuracies: Vec<f64>,
    pub mean_accuracy: f64,
}

/// Result of the exhaustive grid search
#[derive(Debug)]
pub struct GridSearchOutcome {
    pub best_model: RandomForestClassifier,
    pub best_params: ForestParams,
    pub best_score: f64,
    pub results: Vec<CvResult>,
}

/// Exhaustive grid search with k-fold cross-validation, scored by accuracy
///
/// Every candidate is evaluated on every fold; a fit failure surfaces as a
/// training error naming the candidate and the fold instead of being skipped.
/// Ties go to the earlier candidate in grid order. The winning configuration
/// is refit on the full training partition.
pub fn grid_search_forest(
    x: &Array2<f64>,
    y: &Array1<usize>,
    feature_names: &[String],
    grid: &ParamGrid,
    folds: usize,
    seed: u64,
) -> crate::Result<GridSearchOutcome> {
    let candidates = grid.candidates();
    if candidates.is_empty() {
        anyhow::bail!("Hyperparameter grid is empty");
    }
    if folds < 2 {
        anyhow::bail!("Cross-validation needs at least 2 folds, got {}", folds);
    }
    if x.nrows() < folds {
        anyhow::bail!(
            "Cannot split {} rows into {} cross-validation folds",
            x.nrows(),
            folds
        );
    }

    let fold_assignments = kfold_indices(x.nrows(), folds, seed);
    let mut results = Vec::with_capacity(candidates.len());
    let mut best: Option<(usize, f64)> = None;

    for (candidate_idx, params) in candidates.iter().enumerate() {
        let mut fold_accuracies = Vec::with_capacity(folds);

        for (fold, validation_idx) in fold_assignments.iter().enumerate() {
            let train_idx: Vec<usize> = fold_assignments
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != fold)
                .flat_map(|(_, idx)| idx.iter().copied())
                .collect();

            let x_fold = x.select(Axis(0), &train_idx);
            let y_fold: Array1<usize> = train_idx.iter().map(|&i| y[i]).collect();

            let model = RandomForestClassifier::fit(&x_fold, &y_fold, feature_names, params, seed)
                .map_err(|err| ChurnError::Training {
                    config: params.to_string(),
                    fold,
                    reason: err.to_string(),
                })?;

            let x_val = x.select(Axis(0), validation_idx);
            let y_val: Array1<usize> = validation_idx.iter().map(|&i| y[i]).collect();
            let predictions = model.predict(&x_val);
            fold_accuracies.push(accuracy(&y_val, &predictions));
        }

        let mean_accuracy = fold_accuracies.iter().sum::<f64>() / folds as f64;
        results.push(CvResult {
            params: params.clone(),
            fold_accuracies,
            mean_accuracy,
        });

        // Strictly greater keeps the earlier candidate on ties
        if best.map_or(true, |(_, score)| mean_accuracy > score) {
            best = Some((candidate_idx, mean_accuracy));
        }
    }

    let (best_idx, best_score) = best.expect("at least one candidate was scored");
    let best_params = candidates[best_idx].clone();

    let best_model = RandomForestClassifier::fit(x, y, feature_names, &best_params, seed)
        .map_err(|err| ChurnError::Training {
            config: best_params.to_string(),
            fold: folds,
            reason: format!("refit on full training set failed: {}", err),
        })?;

    Ok(GridSearchOutcome {
        best_model,
        best_params,
        best_score,
        results,
    })
}

/// Deterministic shuffled k-fold assignment of row indices
fn kfold_indices(n: usize, folds: usize, seed: u64) -> Vec<Vec<usize>> {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let mut assignments = vec![Vec::with_capacity(n / folds + 1); folds];
    for (position, index) in indices.into_iter().enumerate() {
        assignments[position % folds].push(index);
    }
    assignments
}
