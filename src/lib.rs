//! ChurnForge: A Rust CLI application for predicting customer churn
//!
//! This library loads a bank customer dataset, target-encodes the categorical
//! features against a derived churn label, and trains two classifiers (logistic
//! regression and a grid-searched random forest), producing classification
//! reports, a feature importance ranking and serialized model artifacts.

pub mod cli;
pub mod data;
pub mod error;
pub mod eval;
pub mod features;
pub mod model;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{
    derive_churn_label, encode_categoricals, load_dataset, CATEGORICAL_COLUMNS, TARGET_COLUMN,
};
pub use error::ChurnError;
pub use eval::{accuracy, ClassificationReport};
pub use features::{build_feature_matrix, train_test_split, SplitData, FEATURE_COLUMNS};
pub use model::{
    grid_search_forest, train_logistic, ForestParams, GridSearchOutcome, ParamGrid,
    RandomForestClassifier,
};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
