use thiserror::Error;

/// Fatal, pre-loop errors. Any of these aborts the run before the first
/// model call; per-item failures never surface here.
#[derive(Debug, Error)]
pub enum AssessorError {
    #[error("Feature catalog error: {0}")]
    Catalog(String),

    #[error("Taxonomy CSV missing required columns: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("Error reading taxonomy CSV: {0}")]
    TaxonomyRead(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
