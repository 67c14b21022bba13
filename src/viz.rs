//! Chart and report artifacts rendered with Plotters

use ndarray::Array2;
use plotters::prelude::*;
use polars::prelude::DataFrame;

use crate::data::{self, ColumnSummary, RETAINED_STATUS, STATUS_COLUMN};

const BAR_COLOR: RGBColor = RGBColor(70, 130, 180);

/// Bar chart of retained vs churned customer counts
pub fn plot_churn_distribution(df: &DataFrame, output_path: &str) -> crate::Result<()> {
    let status = df.column(STATUS_COLUMN)?.utf8()?;
    let mut retained = 0usize;
    let mut churned = 0usize;
    for value in status.into_iter() {
        if value == Some(RETAINED_STATUS) {
            retained += 1;
        } else {
            churned += 1;
        }
    }

    let max_count = retained.max(churned) as f64;
    let root = BitMapBackend::new(output_path, (600, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Churn Distribution", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..2f64, 0f64..(max_count * 1.1))?;

    let labels = ["Existing", "Attrited"];
    chart
        .configure_mesh()
        .x_labels(2)
        .x_label_formatter(&|x| {
            labels
                .get(*x as usize)
                .map(|l| l.to_string())
                .unwrap_or_default()
        })
        .y_desc("Number of Customers")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (i, &count) in [retained, churned].iter().enumerate() {
        chart.draw_series(std::iter::once(Rectangle::new(
            [(i as f64 + 0.1, 0.0), (i as f64 + 0.9, count as f64)],
            BAR_COLOR.filled(),
        )))?;
    }

    root.present()?;
    println!("Churn distribution saved to: {}", output_path);
    Ok(())
}

/// Histogram of a numeric column
pub fn plot_histogram(
    df: &DataFrame,
    column: &str,
    bins: usize,
    output_path: &str,
) -> crate::Result<()> {
    let values = data::column_as_f64(df, column)?;
    if values.is_empty() || bins == 0 {
        anyhow::bail!("Cannot plot a histogram of column '{}'", column);
    }

    let min = values.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let max = values.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let width = ((max - min) / bins as f64).max(f64::EPSILON);

    let mut counts = vec![0usize; bins];
    for &value in &values {
        let bin = (((value - min) / width) as usize).min(bins - 1);
        counts[bin] += 1;
    }
    let max_count = *counts.iter().max().unwrap_or(&1) as f64;

    let root = BitMapBackend::new(output_path, (800, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Distribution of {}", column), ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(min..(min + width * bins as f64), 0f64..(max_count * 1.1))?;

    chart
        .configure_mesh()
        .x_desc(column)
        .y_desc("Count")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (bin, &count) in counts.iter().enumerate() {
        let left = min + width * bin as f64;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(left, 0.0), (left + width, count as f64)],
            BAR_COLOR.filled(),
        )))?;
    }

    root.present()?;
    println!("Histogram of {} saved to: {}", column, output_path);
    Ok(())
}

/// Normalized bar chart of a categorical column's value proportions
pub fn plot_category_proportions(
    df: &DataFrame,
    column: &str,
    output_path: &str,
) -> crate::Result<()> {
    let values = df.column(column)?.utf8()?;
    let total = values.len() as f64;

    let mut counts: Vec<(String, usize)> = Vec::new();
    for value in values.into_iter() {
        let key = value.unwrap_or("Unknown").to_string();
        match counts.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, count)) => *count += 1,
            None => counts.push((key, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let max_share = counts
        .first()
        .map(|(_, count)| *count as f64 / total)
        .unwrap_or(1.0);

    let root = BitMapBackend::new(output_path, (800, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{} Proportions", column), ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..(counts.len() as f64), 0f64..(max_share * 1.1))?;

    let names: Vec<String> = counts.iter().map(|(name, _)| name.clone()).collect();
    chart
        .configure_mesh()
        .x_labels(counts.len())
        .x_label_formatter(&|x| names.get(*x as usize).cloned().unwrap_or_default())
        .y_desc("Proportion")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (i, (_, count)) in counts.iter().enumerate() {
        let share = *count as f64 / total;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(i as f64 + 0.1, 0.0), (i as f64 + 0.9, share)],
            BAR_COLOR.filled(),
        )))?;
    }

    root.present()?;
    println!("{} proportions saved to: {}", column, output_path);
    Ok(())
}

/// Correlation heatmap over the numeric columns
pub fn plot_correlation_heatmap(
    names: &[String],
    corr: &Array2<f64>,
    output_path: &str,
) -> crate::Result<()> {
    let n = names.len();
    if corr.shape() != [n, n] {
        anyhow::bail!(
            "Correlation matrix shape {:?} does not match {} columns",
            corr.shape(),
            n
        );
    }

    let root = BitMapBackend::new(output_path, (900, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Feature Correlations", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(140)
        .y_label_area_size(160)
        .build_cartesian_2d(0f64..(n as f64), 0f64..(n as f64))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(n)
        .y_labels(n)
        .x_label_formatter(&|x| names.get(*x as usize).cloned().unwrap_or_default())
        .y_label_formatter(&|y| names.get(*y as usize).cloned().unwrap_or_default())
        .label_style(("sans-serif", 10))
        .draw()?;

    for i in 0..n {
        for j in 0..n {
            // Row 0 at the top
            let value = corr[[n - 1 - j, i]];
            chart.draw_series(std::iter::once(Rectangle::new(
                [(i as f64, j as f64), (i as f64 + 1.0, j as f64 + 1.0)],
                correlation_color(value).filled(),
            )))?;
        }
    }

    root.present()?;
    println!("Correlation heatmap saved to: {}", output_path);
    Ok(())
}

/// Blue (-1) through white (0) to red (+1)
fn correlation_color(value: f64) -> RGBColor {
    let v = value.clamp(-1.0, 1.0);
    if v >= 0.0 {
        let fade = ((1.0 - v) * 255.0) as u8;
        RGBColor(255, fade, fade)
    } else {
        let fade = ((1.0 + v) * 255.0) as u8;
        RGBColor(fade, fade, 255)
    }
}

/// Bar chart of the sorted feature importances
pub fn plot_feature_importances(
    ranking: &[(String, f64)],
    output_path: &str,
) -> crate::Result<()> {
    if ranking.is_empty() {
        anyhow::bail!("Feature importance ranking is empty");
    }
    let max_importance = ranking[0].1;

    let root = BitMapBackend::new(output_path, (1000, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Feature Importance", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(120)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..(ranking.len() as f64), 0f64..(max_importance * 1.1))?;

    let names: Vec<String> = ranking.iter().map(|(name, _)| name.clone()).collect();
    chart
        .configure_mesh()
        .x_labels(ranking.len())
        .x_label_formatter(&|x| names.get(*x as usize).cloned().unwrap_or_default())
        .label_style(("sans-serif", 10))
        .y_desc("Importance")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (i, (_, importance)) in ranking.iter().enumerate() {
        chart.draw_series(std::iter::once(Rectangle::new(
            [(i as f64 + 0.1, 0.0), (i as f64 + 0.9, *importance)],
            BAR_COLOR.filled(),
        )))?;
    }

    root.present()?;
    println!("Feature importance chart saved to: {}", output_path);
    Ok(())
}

/// Write the numeric column summaries as a text table
pub fn write_dataset_summary(summaries: &[ColumnSummary], output_path: &str) -> crate::Result<()> {
    let mut body = String::new();
    body.push_str(&format!(
        "{:<28} {:>8} {:>12} {:>12} {:>12} {:>12}\n",
        "column", "count", "mean", "std", "min", "max"
    ));
    for summary in summaries {
        body.push_str(&format!(
            "{:<28} {:>8} {:>12.3} {:>12.3} {:>12.3} {:>12.3}\n",
            summary.name, summary.count, summary.mean, summary.std, summary.min, summary.max
        ));
    }
    std::fs::write(output_path, body)?;
    println!("Dataset summary saved to: {}", output_path);
    Ok(())
}

/// Generate the full set of exploratory data analysis artifacts
pub fn generate_eda_report(df: &DataFrame, output_dir: &str) -> crate::Result<()> {
    let summaries = data::numeric_summary(df)?;
    write_dataset_summary(&summaries, &format!("{}/dataset_summary.txt", output_dir))?;

    plot_churn_distribution(df, &format!("{}/churn_distribution.png", output_dir))?;
    plot_histogram(df, "Customer_Age", 20, &format!("{}/customer_age.png", output_dir))?;
    plot_category_proportions(
        df,
        "Marital_Status",
        &format!("{}/marital_status.png", output_dir),
    )?;
    plot_histogram(
        df,
        "Total_Trans_Ct",
        20,
        &format!("{}/total_trans_ct.png", output_dir),
    )?;

    let (names, corr) = data::numeric_correlations(df)?;
    plot_correlation_heatmap(
        &names,
        &corr,
        &format!("{}/feature_correlations.png", output_dir),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use polars::prelude::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn test_frame() -> DataFrame {
        df!(
            "Attrition_Flag" => &[
                "Existing Customer",
                "Attrited Customer",
                "Existing Customer",
                "Existing Customer",
            ],
            "Marital_Status" => &["Married", "Single", "Married", "Divorced"],
            "Customer_Age" => &[45i64, 51, 38, 29],
            "Total_Trans_Ct" => &[40i64, 22, 67, 51],
        )
        .unwrap()
    }

    #[test]
    fn test_plot_churn_distribution() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("churn.png");
        let path = path.to_str().unwrap();

        plot_churn_distribution(&test_frame(), path).unwrap();
        assert!(Path::new(path).exists());
    }

    #[test]
    fn test_plot_histogram() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("age.png");
        let path = path.to_str().unwrap();

        plot_histogram(&test_frame(), "Customer_Age", 5, path).unwrap();
        assert!(Path::new(path).exists());
    }

    #[test]
    fn test_plot_category_proportions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("marital.png");
        let path = path.to_str().unwrap();

        plot_category_proportions(&test_frame(), "Marital_Status", path).unwrap();
        assert!(Path::new(path).exists());
    }

    #[test]
    fn test_plot_correlation_heatmap() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corr.png");
        let path = path.to_str().unwrap();

        let names = vec!["a".to_string(), "b".to_string()];
        let corr = array![[1.0, -0.4], [-0.4, 1.0]];
        plot_correlation_heatmap(&names, &corr, path).unwrap();
        assert!(Path::new(path).exists());
    }

    #[test]
    fn test_plot_feature_importances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("importance.png");
        let path = path.to_str().unwrap();

        let ranking = vec![
            ("Total_Trans_Ct".to_string(), 0.5),
            ("Customer_Age".to_string(), 0.3),
            ("Credit_Limit".to_string(), 0.2),
        ];
        plot_feature_importances(&ranking, path).unwrap();
        assert!(Path::new(path).exists());
    }

    #[test]
    fn test_write_dataset_summary() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("summary.txt");
        let path = path.to_str().unwrap();

        let summaries = crate::data::numeric_summary(&test_frame()).unwrap();
        write_dataset_summary(&summaries, path).unwrap();

        let body = std::fs::read_to_string(path).unwrap();
        assert!(body.contains("Customer_Age"));
        assert!(body.contains("mean"));
    }
}
