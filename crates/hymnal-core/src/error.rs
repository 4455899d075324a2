//! # Domain Errors
//!
//! ```text
//!   ValidationError ──┬──► CoreError   (parsing, unknown enum strings)
//!                     ├──► DbError     (hymnal-db, before any SQL runs)
//!                     └──► AppError    (hymnal-app, purchases and settings)
//! ```
//!
//! There is no not-found error here. Lookups answer with `Option` and list
//! queries with an empty `Vec`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Not one of the five catalog sections.
    #[error("Unknown hymn category: {0}")]
    UnknownCategory(String),

    #[error("Unknown purchase type: {0}")]
    UnknownPurchaseType(String),

    #[error("Unknown entitlement model: {0}")]
    UnknownEntitlementModel(String),

    /// Plain-text catalog import failed. `line` is 1-based.
    #[error("Catalog parse error at line {line}: {reason}")]
    CatalogParse { line: usize, reason: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Caller input rejected by `crate::validation`.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Highlight offsets with `start >= end`.
    #[error("highlight start ({start}) must be before end ({end})")]
    InvalidSpan { start: i64, end: i64 },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_parse_message() {
        let err = CoreError::CatalogParse {
            line: 12,
            reason: "missing hymn number".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Catalog parse error at line 12: missing hymn number"
        );
    }

    #[test]
    fn test_span_and_required_messages() {
        let err = ValidationError::InvalidSpan { start: 10, end: 4 };
        assert_eq!(err.to_string(), "highlight start (10) must be before end (4)");

        let err = ValidationError::Required {
            field: "product_id".to_string(),
        };
        assert_eq!(err.to_string(), "product_id is required");
    }

    #[test]
    fn test_validation_wraps_into_core_error() {
        let err: CoreError = ValidationError::MustBePositive {
            field: "number".to_string(),
        }
        .into();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(err.to_string(), "Validation error: number must be positive");
    }
}
