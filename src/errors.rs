use thiserror::Error;

/// Error type that captures catalog, schedule and input failures.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Product not found: {0}")]
    ProductNotFound(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Invalid reference: {0}")]
    InvalidRef(String),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
