//! # Storage Errors
//!
//! Everything the hymn store can fail with, as seen by the query layer.
//!
//! ```text
//!  sqlx::Error ──► DbError ──► SqlHymnalRepository (as is)
//!                     │
//!                     └──────► SafeHymnalRepository
//!                                 reads      → reported, then None / [] / false
//!                                 mutations  → reported, then Err
//! ```
//!
//! A hymn id that does not exist is not an error for reads. Writes that
//! reference one fail with [`DbError::ForeignKeyViolation`] because every
//! user table points at `hymns(id)`.

use hymnal_core::ValidationError;
use sqlx::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// A `fetch_one` came back empty. The query layer uses
    /// `fetch_optional`, so this only surfaces from raw pool access.
    #[error("No matching row")]
    NotFound,

    /// Second insert of a unique key, e.g. two hymns with the same number.
    #[error("Already exists: {0}")]
    UniqueViolation(String),

    /// Favorite, history entry or highlight for an unknown hymn.
    #[error("Unknown hymn reference: {0}")]
    ForeignKeyViolation(String),

    /// A CHECK or NOT NULL rule in the schema rejected the row.
    #[error("Constraint failed: {0}")]
    ConstraintViolation(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Every connection was busy for longer than the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Copying or reading the bundled catalog file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Rejected before any SQL ran.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => DbError::UniqueViolation(message),
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation(message),
                    ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                        DbError::ConstraintViolation(message)
                    }
                    _ => DbError::QueryFailed(message),
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool closed".to_string()),
            sqlx::Error::Io(io) => DbError::Io(io),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
