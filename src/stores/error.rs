use thiserror::Error;

/// Failure reported by a grant store, identity store or node directory.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing service rejected or failed the call
    #[error("Store operation failed: {operation} - {reason}")]
    Backend { operation: String, reason: String },

    /// A stored record could not be encoded or decoded
    #[error("Serialization error: {context} - {reason}")]
    Serialization { context: String, reason: String },

    #[error("Sled error: {0}")]
    Sled(#[from] sled::Error),
}

impl StoreError {
    pub fn backend(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::Backend {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Serialization {
            context: "grant".to_string(),
            reason: error.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
