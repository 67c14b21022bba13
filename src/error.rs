//! Typed errors for schema and training failures

use thiserror::Error;

/// Errors with a named contract in the pipeline. Everything else is reported
/// through `anyhow` at the call site.
#[derive(Debug, Error)]
pub enum ChurnError {
    /// An expected column is absent from the dataset, usually because the
    /// encoding step was skipped or misconfigured.
    #[error("missing expected column '{0}' in dataset")]
    MissingColumn(String),

    /// A model fit failed for a specific hyperparameter configuration.
    #[error("training failed for configuration [{config}] on fold {fold}: {reason}")]
    Training {
        config: String,
        fold: usize,
        reason: String,
    },
}
