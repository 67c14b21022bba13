//! Command-line interface definitions and argument parsing

use clap::Parser;

/// Customer churn prediction CLI: target encoding + logistic regression and
/// a grid-searched random forest on bank customer data
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, default_value = "data/bank_data.csv")]
    pub input: String,

    /// Directory for chart and report artifacts
    #[arg(short = 'o', long, default_value = "images")]
    pub images_dir: String,

    /// Directory for serialized model files
    #[arg(short, long, default_value = "models")]
    pub models_dir: String,

    /// Fraction of rows assigned to the test partition
    #[arg(long, default_value = "0.3")]
    pub test_fraction: f64,

    /// Random seed for the train/test split and forest bootstrapping
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Number of cross-validation folds for the grid search
    #[arg(long, default_value = "5")]
    pub cv_folds: usize,

    /// Skip the exploratory data analysis charts
    #[arg(long)]
    pub skip_eda: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Validate argument ranges before the pipeline starts
    pub fn validate(&self) -> crate::Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            anyhow::bail!(
                "Test fraction must be strictly between 0 and 1, got {}",
                self.test_fraction
            );
        }
        if self.cv_folds < 2 {
            anyhow::bail!("Cross-validation needs at least 2 folds, got {}", self.cv_folds);
        }
        Ok(())
    }
}
