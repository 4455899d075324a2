//! # App Error Types
//!
//! Error type for the runtime context.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       App Error Categories                              │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │    Settings     │  │     Storage             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  SettingsIo     │  │  Database (DbError)     │ │
//! │  │  ConfigLoad     │  │  Serialization  │  │  Validation             │ │
//! │  │  ConfigSave     │  │                 │  │  Domain (CoreError)     │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use hymnal_core::{CoreError, ValidationError};
use hymnal_db::DbError;
use thiserror::Error;

/// Result type alias for app operations.
pub type AppResult<T> = Result<T, AppError>;

/// App error type.
#[derive(Debug, Error)]
pub enum AppError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration is present but not usable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to read or parse the config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to write the config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Settings Errors
    // =========================================================================
    /// The settings file could not be read or written.
    #[error("Settings I/O failed: {0}")]
    SettingsIo(#[from] std::io::Error),

    /// The settings file is not valid JSON.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    // =========================================================================
    // Storage & Domain Errors
    // =========================================================================
    /// Database operation failed.
    #[error(transparent)]
    Database(#[from] DbError),

    /// Caller input rejected before reaching storage.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Domain rule violated.
    #[error(transparent)]
    Domain(#[from] CoreError),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for AppError {
    fn from(err: toml::ser::Error) -> Self {
        AppError::ConfigSaveFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_error_message_passes_through() {
        let err: AppError = DbError::QueryFailed("disk I/O error".into()).into();
        assert!(matches!(err, AppError::Database(_)));
        assert_eq!(err.to_string(), "Query failed: disk I/O error");
    }

    #[test]
    fn test_toml_error_is_config_load() {
        let parse: Result<toml::Value, _> = toml::from_str("[storage\n");
        let err: AppError = parse.unwrap_err().into();
        assert!(matches!(err, AppError::ConfigLoadFailed(_)));
    }
}
