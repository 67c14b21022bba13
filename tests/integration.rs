//! Integration tests for ChurnForge

use churnforge::{
    build_feature_matrix, derive_churn_label, encode_categoricals, grid_search_forest,
    load_dataset, train_logistic, train_test_split, ClassificationReport, ParamGrid,
    CATEGORICAL_COLUMNS, FEATURE_COLUMNS, TARGET_COLUMN,
};
use linfa::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const NUMERIC_COLUMNS: [&str; 14] = [
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
];

fn churned(i: usize) -> bool {
    // Exactly 20 churned rows out of 100
    i % 5 == 0
}

/// Synthetic 100-row dataset: 80 existing / 20 attrited customers,
/// 5 categorical columns with 3 values each, 14 numeric behavioral fields.
/// Transaction activity is depressed for churned rows so the models have
/// signal to find.
fn create_test_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();

    let mut header = vec!["Attrition_Flag".to_string()];
    header.extend(CATEGORICAL_COLUMNS.iter().map(|c| c.to_string()));
    header.extend(NUMERIC_COLUMNS.iter().map(|c| c.to_string()));
    writeln!(file, "{}", header.join(",")).unwrap();

    let cat_values = [
        ["M", "F", "U"],
        ["Graduate", "High School", "Unknown"],
        ["Married", "Single", "Divorced"],
        ["Less than $40K", "$40K - $60K", "$80K - $120K"],
        ["Blue", "Silver", "Gold"],
    ];

    for i in 0..100 {
        let status = if churned(i) {
            "Attrited Customer"
        } else {
            "Existing Customer"
        };

        let mut row = vec![status.to_string()];
        for (c, values) in cat_values.iter().enumerate() {
            row.push(values[(i + c * 7) % 3].to_string());
        }

        let activity = if churned(i) { 0.2 } else { 1.0 };
        for (k, _) in NUMERIC_COLUMNS.iter().enumerate() {
            let base = ((i * 31 + k * 17) % 97) as f64;
            let value = match k {
                10 => 1000.0 + base * 40.0 * activity, // Total_Trans_Amt
                11 => 20.0 + base * activity,          // Total_Trans_Ct
                _ => base + k as f64,
            };
            row.push(format!("{:.3}", value));
        }

        writeln!(file, "{}", row.join(",")).unwrap();
    }

    file
}

fn load_encoded() -> polars::prelude::DataFrame {
    let file = create_test_csv();
    let mut df = load_dataset(file.path().to_str().unwrap()).unwrap();
    derive_churn_label(&mut df).unwrap();
    encode_categoricals(&mut df, &CATEGORICAL_COLUMNS, TARGET_COLUMN).unwrap();
    df
}

#[test]
fn test_churn_label_sums_to_twenty() {
    let df = load_encoded();
    let churn = df
        .column(TARGET_COLUMN)
        .unwrap()
        .cast(&polars::prelude::DataType::Float64)
        .unwrap();
    let total: f64 = churn.f64().unwrap().into_no_null_iter().sum();
    assert_eq!(total, 20.0);
}

#[test]
fn test_encoding_matches_group_means() {
    let df = load_encoded();

    let genders: Vec<String> = df
        .column("Gender")
        .unwrap()
        .utf8()
        .unwrap()
        .into_no_null_iter()
        .map(|s| s.to_string())
        .collect();
    let encoded: Vec<f64> = df
        .column("Gender_Churn")
        .unwrap()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .collect();

    for value in ["M", "F", "U"] {
        let group: Vec<usize> = (0..100).filter(|&i| genders[i] == value).collect();
        let expected =
            group.iter().filter(|&&i| churned(i)).count() as f64 / group.len() as f64;
        for &i in &group {
            assert!(
                (encoded[i] - expected).abs() < 1e-12,
                "encoding for gender {} row {} was {}, expected {}",
                value,
                i,
                encoded[i],
                expected
            );
        }
    }
}

#[test]
fn test_feature_matrix_and_split() {
    let df = load_encoded();
    let (x, y) = build_feature_matrix(&df, TARGET_COLUMN).unwrap();

    assert_eq!(x.shape(), &[100, FEATURE_COLUMNS.len()]);
    assert_eq!(x.ncols(), 19);

    let split = train_test_split(&x, &y, 0.3, 42).unwrap();
    assert_eq!(split.x_train.nrows(), 70);
    assert_eq!(split.x_test.nrows(), 30);

    // Deterministic for a fixed seed
    let again = train_test_split(&x, &y, 0.3, 42).unwrap();
    assert_eq!(split.x_train, again.x_train);
    assert_eq!(split.y_test, again.y_test);
}

#[test]
fn test_logistic_regression_end_to_end() {
    let df = load_encoded();
    let (x, y) = build_feature_matrix(&df, TARGET_COLUMN).unwrap();
    let split = train_test_split(&x, &y, 0.3, 42).unwrap();

    let model = train_logistic(&split.x_train, &split.y_train).unwrap();
    let train_preds = model.predict(&split.x_train);
    let test_preds = model.predict(&split.x_test);

    let train_report =
        ClassificationReport::from_predictions(&split.y_train, &train_preds).unwrap();
    let test_report = ClassificationReport::from_predictions(&split.y_test, &test_preds).unwrap();

    for report in [&train_report, &test_report] {
        for metrics in [&report.negative, &report.positive] {
            assert!((0.0..=1.0).contains(&metrics.precision));
            assert!((0.0..=1.0).contains(&metrics.recall));
            assert!((0.0..=1.0).contains(&metrics.f1));
        }
        assert!((0.0..=1.0).contains(&report.accuracy));
    }
    assert_eq!(
        train_report.negative.support + train_report.positive.support,
        70
    );
}

#[test]
fn test_grid_search_end_to_end() {
    let df = load_encoded();
    let (x, y) = build_feature_matrix(&df, TARGET_COLUMN).unwrap();
    let split = train_test_split(&x, &y, 0.3, 42).unwrap();

    let feature_names: Vec<String> = FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect();
    let grid = ParamGrid::default();
    assert_eq!(grid.candidates().len(), 24);

    let outcome =
        grid_search_forest(&split.x_train, &split.y_train, &feature_names, &grid, 5, 42).unwrap();

    // Exactly one best configuration among the 24 candidates
    assert_eq!(outcome.results.len(), 24);
    assert_eq!(
        grid.candidates()
            .iter()
            .filter(|c| **c == outcome.best_params)
            .count(),
        1
    );
    assert!(outcome
        .results
        .iter()
        .all(|r| r.mean_accuracy <= outcome.best_score));

    let test_preds = outcome.best_model.predict(&split.x_test);
    let report = ClassificationReport::from_predictions(&split.y_test, &test_preds).unwrap();
    assert!((0.0..=1.0).contains(&report.accuracy));

    // Ranking pairs every feature name with a non-negative importance
    let ranking = outcome.best_model.importance_ranking();
    assert_eq!(ranking.len(), 19);
    assert!(ranking.windows(2).all(|w| w[0].1 >= w[1].1));
    assert!(ranking.iter().all(|(_, imp)| *imp >= 0.0));

    // The depressed-activity columns should carry most of the signal
    let top5: Vec<&str> = ranking.iter().take(5).map(|(n, _)| n.as_str()).collect();
    assert!(
        top5.contains(&"Total_Trans_Ct") || top5.contains(&"Total_Trans_Amt"),
        "expected a transaction feature in the top 5, got {:?}",
        top5
    );
}

#[test]
fn test_pipeline_fails_without_encoding() {
    let file = create_test_csv();
    let mut df = load_dataset(file.path().to_str().unwrap()).unwrap();
    derive_churn_label(&mut df).unwrap();

    // Encoder skipped: the 19-column contract cannot be satisfied
    assert!(build_feature_matrix(&df, TARGET_COLUMN).is_err());
}

#[test]
fn test_missing_input_file() {
    assert!(load_dataset("no/such/file.csv").is_err());
}
