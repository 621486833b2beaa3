use thiserror::Error;

/// Error types for the compute module
#[derive(Error, Debug)]
pub enum ComputeError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// The embedded grade book could not be encoded or decoded
    #[error("Grade book serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Input rejected before any state was touched
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced record does not exist
    #[error("{0}")]
    NotFound(String),

    /// The record changed between read and write
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl ComputeError {
    pub(crate) fn not_found(kind: &str, id: i32) -> Self {
        ComputeError::NotFound(format!("{} with id {} not found", kind, id))
    }
}

/// Type alias for Result with ComputeError
pub type Result<T> = std::result::Result<T, ComputeError>;
