//! Store error types.

use thiserror::Error;

/// Errors surfaced by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A version guard failed: someone else wrote the row since it was
    /// read. The engine retries the whole operation on this.
    #[error("write conflict on {entity}")]
    Conflict { entity: &'static str },

    /// A stored value could not be decoded into a domain type.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
