//! Feature matrix assembly and deterministic train/test splitting

use ndarray::{Array1, Array2, Axis};
use polars::prelude::DataFrame;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::data::column_as_f64;

/// The fixed feature matrix: 14 raw numeric fields followed by the
/// 5 mean-churn encodings. Order matters only for the importance ranking.
pub const FEATURE_COLUMNS: [&str; 19] = [
    "Customer_Age",
    "Dependent_count",
    "Months_on_book",
    "Total_Relationship_Count",
    "Months_Inactive_12_mon",
    "Contacts_Count_12_mon",
    "Credit_Limit",
    "Total_Revolving_Bal",
    "Avg_Open_To_Buy",
    "Total_Amt_Chng_Q4_Q1",
    "Total_Trans_Amt",
    "Total_Trans_Ct",
    "Total_Ct_Chng_Q4_Q1",
    "Avg_Utilization_Ratio",
    "Gender_Churn",
    "Education_Level_Churn",
    "Marital_Status_Churn",
    "Income_Category_Churn",
    "Card_Category_Churn",
];

/// Train/test partition of the feature matrix and target vector
#[derive(Debug, Clone)]
pub struct SplitData {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<usize>,
    pub y_test: Array1<usize>,
}

/// Assemble the fixed 19-column feature matrix and the target vector
///
/// Fails with a missing-column error when any expected column is absent,
/// e.g. when the encoding step was skipped.
pub fn build_feature_matrix(
    df: &DataFrame,
    target: &str,
) -> crate::Result<(Array2<f64>, Array1<usize>)> {
    let n_rows = df.height();
    let mut data = Vec::with_capacity(n_rows * FEATURE_COLUMNS.len());

    let columns: Vec<Vec<f64>> = FEATURE_COLUMNS
        .iter()
        .map(|&name| column_as_f64(df, name))
        .collect::<crate::Result<_>>()?;

    for row in 0..n_rows {
        for column in &columns {
            data.push(column[row]);
        }
    }

    let x = Array2::from_shape_vec((n_rows, FEATURE_COLUMNS.len()), data)?;
    let y: Array1<usize> = column_as_f64(df, target)?
        .into_iter()
        .map(|v| v as usize)
        .collect();

    Ok((x, y))
}

/// Deterministic pseudo-random 70/30-style row partition
///
/// Shuffles the row indices with a seeded RNG and assigns round(n * fraction)
/// rows to the test set. The same seed and input order always produce the
/// same assignment.
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<usize>,
    test_fraction: f64,
    seed: u64,
) -> crate::Result<SplitData> {
    let n = x.nrows();
    if n != y.len() {
        anyhow::bail!(
            "Feature matrix has {} rows but target has {} values",
            n,
            y.len()
        );
    }

    let test_size = (n as f64 * test_fraction).round() as usize;
    if test_size == 0 || test_size >= n {
        anyhow::bail!(
            "Test fraction {} leaves an empty partition for {} rows",
            test_fraction,
            n
        );
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(test_size);

    Ok(SplitData {
        x_train: x.select(Axis(0), train_idx),
        x_test: x.select(Axis(0), test_idx),
        y_train: train_idx.iter().map(|&i| y[i]).collect(),
        y_test: test_idx.iter().map(|&i| y[i]).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{derive_churn_label, encode_categoricals, TARGET_COLUMN};
    use crate::error::ChurnError;
    use ndarray::Array;
    use polars::prelude::*;

    fn synthetic_frame(n: usize) -> DataFrame {
        let statuses: Vec<&str> = (0..n)
            .map(|i| {
                if i % 5 == 0 {
                    "Attrited Customer"
                } else {
                    "Existing Customer"
                }
            })
            .collect();
        let genders: Vec<&str> = (0..n).map(|i| if i % 2 == 0 { "M" } else { "F" }).collect();
        let education: Vec<&str> = (0..n)
            .map(|i| match i % 3 {
                0 => "Graduate",
                1 => "High School",
                _ => "Unknown",
            })
            .collect();
        let marital: Vec<&str> = (0..n)
            .map(|i| match i % 3 {
                0 => "Married",
                1 => "Single",
                _ => "Divorced",
            })
            .collect();
        let income: Vec<&str> = (0..n)
            .map(|i| match i % 3 {
                0 => "Less than $40K",
                1 => "$40K - $60K",
                _ => "$80K - $120K",
            })
            .collect();
        let card: Vec<&str> = (0..n)
            .map(|i| match i % 3 {
                0 => "Blue",
                1 => "Silver",
                _ => "Gold",
            })
            .collect();

        let numeric = |offset: usize| -> Vec<f64> {
            (0..n).map(|i| (i + offset) as f64 * 0.5).collect()
        };

        df!(
            "Attrition_Flag" => statuses,
            "Gender" => genders,
            "Education_Level" => education,
            "Marital_Status" => marital,
            "Income_Category" => income,
            "Card_Category" => card,
            "Customer_Age" => numeric(1),
            "Dependent_count" => numeric(2),
            "Months_on_book" => numeric(3),
            "Total_Relationship_Count" => numeric(4),
            "Months_Inactive_12_mon" => numeric(5),
            "Contacts_Count_12_mon" => numeric(6),
            "Credit_Limit" => numeric(7),
            "Total_Revolving_Bal" => numeric(8),
            "Avg_Open_To_Buy" => numeric(9),
            "Total_Amt_Chng_Q4_Q1" => numeric(10),
            "Total_Trans_Amt" => numeric(11),
            "Total_Trans_Ct" => numeric(12),
            "Total_Ct_Chng_Q4_Q1" => numeric(13),
            "Avg_Utilization_Ratio" => numeric(14),
        )
        .unwrap()
    }

    fn encoded_frame(n: usize) -> DataFrame {
        let mut df = synthetic_frame(n);
        derive_churn_label(&mut df).unwrap();
        encode_categoricals(&mut df, &crate::data::CATEGORICAL_COLUMNS, TARGET_COLUMN).unwrap();
        df
    }

    #[test]
    fn test_feature_matrix_has_19_columns() {
        let df = encoded_frame(30);
        let (x, y) = build_feature_matrix(&df, TARGET_COLUMN).unwrap();
        assert_eq!(x.shape(), &[30, 19]);
        assert_eq!(y.len(), 30);
    }

    #[test]
    fn test_feature_matrix_missing_encoding_column() {
        let mut df = synthetic_frame(10);
        derive_churn_label(&mut df).unwrap();
        // Encoder step skipped: the *_Churn columns do not exist

        let err = build_feature_matrix(&df, TARGET_COLUMN).unwrap_err();
        let missing = err.downcast_ref::<ChurnError>();
        assert!(matches!(missing, Some(ChurnError::MissingColumn(_))));
    }

    #[test]
    fn test_split_proportions() {
        let df = encoded_frame(100);
        let (x, y) = build_feature_matrix(&df, TARGET_COLUMN).unwrap();
        let split = train_test_split(&x, &y, 0.3, 42).unwrap();

        assert_eq!(split.x_test.nrows(), 30);
        assert_eq!(split.x_train.nrows(), 70);
        assert_eq!(split.y_test.len(), 30);
        assert_eq!(split.y_train.len(), 70);
    }

    #[test]
    fn test_split_is_deterministic() {
        let df = encoded_frame(50);
        let (x, y) = build_feature_matrix(&df, TARGET_COLUMN).unwrap();

        let first = train_test_split(&x, &y, 0.3, 42).unwrap();
        let second = train_test_split(&x, &y, 0.3, 42).unwrap();

        assert_eq!(first.x_train, second.x_train);
        assert_eq!(first.x_test, second.x_test);
        assert_eq!(first.y_train, second.y_train);
        assert_eq!(first.y_test, second.y_test);
    }

    #[test]
    fn test_split_different_seeds_differ() {
        let df = encoded_frame(50);
        let (x, y) = build_feature_matrix(&df, TARGET_COLUMN).unwrap();

        let first = train_test_split(&x, &y, 0.3, 42).unwrap();
        let second = train_test_split(&x, &y, 0.3, 7).unwrap();
        assert_ne!(first.x_test, second.x_test);
    }

    #[test]
    fn test_split_rejects_degenerate_fraction() {
        let x = Array::zeros((10, 2));
        let y: Array1<usize> = Array1::zeros(10);
        assert!(train_test_split(&x, &y, 0.001, 42).is_err());
    }

    #[test]
    fn test_split_rejects_length_mismatch() {
        let x = Array::zeros((10, 2));
        let y: Array1<usize> = Array1::zeros(8);
        assert!(train_test_split(&x, &y, 0.3, 42).is_err());
    }
}
