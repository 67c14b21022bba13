//! ChurnForge: Customer churn prediction CLI
//!
//! This is the main entrypoint that orchestrates data loading, exploratory
//! analysis, target encoding, model training and evaluation artifacts.

use anyhow::Result;
use churnforge::{
    build_feature_matrix, derive_churn_label, encode_categoricals, eval, grid_search_forest,
    load_dataset, model, train_logistic, viz, Args, ClassificationReport, ParamGrid,
    CATEGORICAL_COLUMNS, FEATURE_COLUMNS, TARGET_COLUMN,
};
use clap::Parser;
use linfa::prelude::*;
use std::fs;
use std::time::Instant;

fn main() -> Result<()> {
    let args = Args::parse();
    args.validate()?;

    println!("ChurnForge - Customer Churn Prediction");
    println!("======================================\n");

    let start_time = Instant::now();

    let eda_dir = format!("{}/eda", args.images_dir);
    let results_dir = format!("{}/results", args.images_dir);
    fs::create_dir_all(&eda_dir)?;
    fs::create_dir_all(&results_dir)?;
    fs::create_dir_all(&args.models_dir)?;

    // Step 1: Load the dataset
    if args.verbose {
        println!("Step 1: Loading dataset");
        println!("  Input file: {}", args.input);
    }
    let load_start = Instant::now();
    let mut df = load_dataset(&args.input)?;
    println!("✓ Data loaded: {} customers, {} columns", df.height(), df.width());
    if args.verbose {
        println!("  Loading time: {:.2}s", load_start.elapsed().as_secs_f64());
    }

    // Step 2: Exploratory data analysis
    if !args.skip_eda {
        if args.verbose {
            println!("\nStep 2: Exploratory data analysis");
            println!("  Output directory: {}", eda_dir);
        }
        let eda_start = Instant::now();
        viz::generate_eda_report(&df, &eda_dir)?;
        println!("✓ EDA artifacts generated");
        if args.verbose {
            println!("  EDA time: {:.2}s", eda_start.elapsed().as_secs_f64());
        }
    }

    // Step 3: Derive the churn label and target-encode the categoricals
    if args.verbose {
        println!("\nStep 3: Target encoding");
    }
    derive_churn_label(&mut df)?;
    encode_categoricals(&mut df, &CATEGORICAL_COLUMNS, TARGET_COLUMN)?;
    println!("✓ Encoded {} categorical columns", CATEGORICAL_COLUMNS.len());

    // Step 4: Feature matrix and train/test split
    let (x, y) = build_feature_matrix(&df, TARGET_COLUMN)?;
    let split = churnforge::train_test_split(&x, &y, args.test_fraction, args.seed)?;
    println!(
        "✓ Split {} rows into {} train / {} test (seed {})",
        x.nrows(),
        split.x_train.nrows(),
        split.x_test.nrows(),
        args.seed
    );

    // Step 5: Train logistic regression
    if args.verbose {
        println!("\nStep 5: Training logistic regression");
    }
    let lr_start = Instant::now();
    let logistic = train_logistic(&split.x_train, &split.y_train)?;
    let lr_train_preds = logistic.predict(&split.x_train);
    let lr_test_preds = logistic.predict(&split.x_test);
    println!(
        "✓ Logistic regression fitted ({:.2}s)",
        lr_start.elapsed().as_secs_f64()
    );

    // Step 6: Grid-search the random forest
    if args.verbose {
        println!("\nStep 6: Random forest grid search");
        println!("  Candidates: {}", ParamGrid::default().candidates().len());
        println!("  Folds: {}", args.cv_folds);
    }
    let rf_start = Instant::now();
    let feature_names: Vec<String> = FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect();
    let outcome = grid_search_forest(
        &split.x_train,
        &split.y_train,
        &feature_names,
        &ParamGrid::default(),
        args.cv_folds,
        args.seed,
    )?;
    let rf_train_preds = outcome.best_model.predict(&split.x_train);
    let rf_test_preds = outcome.best_model.predict(&split.x_test);
    println!(
        "✓ Grid search complete ({:.2}s)",
        rf_start.elapsed().as_secs_f64()
    );
    println!("  Best configuration: [{}]", outcome.best_params);
    println!("  Cross-validation accuracy: {:.4}", outcome.best_score);

    // Step 7: Evaluation artifacts
    let lr_train_report = ClassificationReport::from_predictions(&split.y_train, &lr_train_preds)?;
    let lr_test_report = ClassificationReport::from_predictions(&split.y_test, &lr_test_preds)?;
    let rf_train_report = ClassificationReport::from_predictions(&split.y_train, &rf_train_preds)?;
    let rf_test_report = ClassificationReport::from_predictions(&split.y_test, &rf_test_preds)?;

    eval::write_model_report(
        format!("{}/logistic_regression_results.txt", results_dir),
        "Logistic Regression",
        &lr_train_report,
        &lr_test_report,
    )?;
    eval::write_model_report(
        format!("{}/random_forest_results.txt", results_dir),
        "Random Forest",
        &rf_train_report,
        &rf_test_report,
    )?;

    let ranking = outcome.best_model.importance_ranking();
    eval::write_importance_ranking(
        format!("{}/feature_importances.txt", results_dir),
        &ranking,
        FEATURE_COLUMNS.len(),
    )?;
    viz::plot_feature_importances(
        &ranking,
        &format!("{}/feature_importances.png", results_dir),
    )?;

    println!("\n=== Test Set Performance ===");
    println!("Logistic regression accuracy: {:.4}", lr_test_report.accuracy);
    println!("Random forest accuracy:       {:.4}", rf_test_report.accuracy);
    if args.verbose {
        println!("\nTop 5 features by importance:");
        for (name, importance) in ranking.iter().take(5) {
            println!("  {:<28} {:.4}", name, importance);
        }
    }

    // Step 8: Persist the fitted models
    outcome
        .best_model
        .save(format!("{}/random_forest.json", args.models_dir))?;
    model::save_logistic(
        &logistic,
        format!("{}/logistic_regression.json", args.models_dir),
    )?;
    println!("\n✓ Models saved to: {}", args.models_dir);

    println!("\n=== Pipeline Complete ===");
    println!(
        "Total processing time: {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    println!("Artifacts saved to: {}", args.images_dir);

    Ok(())
}
