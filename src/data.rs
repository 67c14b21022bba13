//! Data loading, churn label derivation and categorical target encoding using Polars

use std::collections::HashMap;
use std::path::Path;

use ndarray::Array2;
use polars::prelude::*;

use crate::error::ChurnError;

/// Status column present in the raw CSV
pub const STATUS_COLUMN: &str = "Attrition_Flag";

/// Status value of a customer that has not churned
pub const RETAINED_STATUS: &str = "Existing Customer";

/// Derived binary target column
pub const TARGET_COLUMN: &str = "Churn";

/// Categorical columns that receive a mean-churn-rate encoding
pub const CATEGORICAL_COLUMNS: [&str; 5] = [
    "Gender",
    "Education_Level",
    "Marital_Status",
    "Income_Category",
    "Card_Category",
];

/// Per-column summary statistics for the dataset overview artifact
#[derive(Debug, Clone)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Load the customer dataset from a CSV file
///
/// Fails before the CSV reader runs when the path does not exist, and after
/// parsing when the file holds no rows.
pub fn load_dataset(path: &str) -> crate::Result<DataFrame> {
    if !Path::new(path).exists() {
        anyhow::bail!("Input CSV not found: {}", path);
    }

    let df = CsvReader::from_path(path)?.has_header(true).finish()?;

    if df.height() == 0 {
        anyhow::bail!("No rows found in {}", path);
    }

    Ok(df)
}

/// Derive the binary churn label from the customer status column
///
/// A customer is labeled 1 when the status is anything other than
/// "Existing Customer" (a missing status also counts as churned), else 0.
/// Must run before [`encode_categoricals`], which averages this column.
pub fn derive_churn_label(df: &mut DataFrame) -> crate::Result<()> {
    let status = df
        .column(STATUS_COLUMN)
        .map_err(|_| ChurnError::MissingColumn(STATUS_COLUMN.to_string()))?
        .utf8()?;

    let labels: Vec<i64> = status
        .into_iter()
        .map(|value| (value != Some(RETAINED_STATUS)) as i64)
        .collect();

    df.with_column(Series::new(TARGET_COLUMN, labels))?;
    Ok(())
}

/// Append a "{column}_Churn" mean-target encoding for each categorical column
///
/// Group means are computed over the entire dataset before any train/test
/// split; the original categorical columns are kept. A row whose category
/// value has no group (only possible for a null cell, since the groups come
/// from the same column) falls back to the global target mean.
pub fn encode_categoricals(
    df: &mut DataFrame,
    categories: &[&str],
    target: &str,
) -> crate::Result<()> {
    let global_mean = df
        .column(target)
        .map_err(|_| ChurnError::MissingColumn(target.to_string()))?
        .cast(&DataType::Float64)?
        .f64()?
        .mean()
        .ok_or_else(|| anyhow::anyhow!("Target column '{}' holds no values", target))?;

    for &feature in categories {
        let rates = category_churn_rates(df, feature, target)?;

        let encoded: Vec<f64> = df
            .column(feature)
            .map_err(|_| ChurnError::MissingColumn(feature.to_string()))?
            .utf8()?
            .into_iter()
            .map(|value| {
                value
                    .and_then(|v| rates.get(v).copied())
                    .unwrap_or(global_mean)
            })
            .collect();

        df.with_column(Series::new(&format!("{}_Churn", feature), encoded))?;
    }

    Ok(())
}

/// Mean target value per distinct category value
fn category_churn_rates(
    df: &DataFrame,
    feature: &str,
    target: &str,
) -> crate::Result<HashMap<String, f64>> {
    let grouped = df
        .clone()
        .lazy()
        .group_by([col(feature)])
        .agg([col(target)
            .cast(DataType::Float64)
            .mean()
            .alias("__churn_rate")])
        .collect()?;

    let values = grouped.column(feature)?.utf8()?;
    let rates = grouped.column("__churn_rate")?.f64()?;

    let mut map = HashMap::with_capacity(grouped.height());
    for (value, rate) in values.into_iter().zip(rates.into_iter()) {
        if let (Some(value), Some(rate)) = (value, rate) {
            map.insert(value.to_string(), rate);
        }
    }

    Ok(map)
}

/// Extract a column as f64 values, rejecting nulls
pub fn column_as_f64(df: &DataFrame, name: &str) -> crate::Result<Vec<f64>> {
    let series = df
        .column(name)
        .map_err(|_| ChurnError::MissingColumn(name.to_string()))?
        .cast(&DataType::Float64)?;
    let values = series.f64()?;

    if values.null_count() > 0 {
        anyhow::bail!(
            "Column '{}' contains {} null values",
            name,
            values.null_count()
        );
    }

    Ok(values.into_no_null_iter().collect())
}

/// Names of all numeric columns in dataset order
fn numeric_column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|series| series.dtype().is_numeric())
        .map(|series| series.name().to_string())
        .collect()
}

/// Summary statistics for every numeric column
pub fn numeric_summary(df: &DataFrame) -> crate::Result<Vec<ColumnSummary>> {
    let mut summaries = Vec::new();

    for name in numeric_column_names(df) {
        let values = column_as_f64(df, &name)?;
        let count = values.len();
        if count == 0 {
            continue;
        }

        let mean = values.iter().sum::<f64>() / count as f64;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;
        let min = values.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max = values.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));

        summaries.push(ColumnSummary {
            name,
            count,
            mean,
            std: variance.sqrt(),
            min,
            max,
        });
    }

    Ok(summaries)
}

/// Pearson correlation matrix over all numeric columns
///
/// Returns the column names alongside the symmetric correlation matrix.
/// A constant column correlates 0.0 with everything (its variance is zero).
pub fn numeric_correlations(df: &DataFrame) -> crate::Result<(Vec<String>, Array2<f64>)> {
    let names = numeric_column_names(df);
    let columns: Vec<Vec<f64>> = names
        .iter()
        .map(|name| column_as_f64(df, name))
        .collect::<crate::Result<_>>()?;

    let n = names.len();
    let mut corr = Array2::zeros((n, n));

    for i in 0..n {
        corr[[i, i]] = 1.0;
        for j in (i + 1)..n {
            let value = pearson(&columns[i], &columns[j]);
            corr[[i, j]] = value;
            corr[[j, i]] = value;
        }
    }

    Ok((names, corr))
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    if n == 0.0 {
        return 0.0;
    }

    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = (var_a * var_b).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        cov / denom
    }
}
