//! # Validation Module
//!
//! Input validation utilities for the hymnal.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: UI                                                           │
//! │  ├── Minimum search length (MIN_SEARCH_QUERY_LEN)                      │
//! │  └── Text selection produces start < end                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Repository facade (Rust)                                     │
//! │  └── THIS MODULE: spans, colors, catalog fields                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  ├── UNIQUE(favorites.hymn_id)                                         │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use hymnal_core::validation::{validate_highlight_span, validate_color_index};
//!
//! validate_highlight_span(0, 10).unwrap();
//! validate_color_index(1).unwrap();
//! assert!(validate_highlight_span(5, 5).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{HighlightColor, NewHymn};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest title accepted from the seed catalog.
pub const MAX_TITLE_LEN: usize = 300;

// =============================================================================
// Highlight Validators
// =============================================================================

/// Validates a highlight span.
///
/// ## Rules
/// - `start` must not be negative
/// - `start` must be strictly less than `end`
pub fn validate_highlight_span(start: i64, end: i64) -> ValidationResult<()> {
    if start < 0 {
        return Err(ValidationError::OutOfRange {
            field: "start_index".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    if start >= end {
        return Err(ValidationError::InvalidSpan { start, end });
    }

    Ok(())
}

/// Validates that a color index names a palette entry.
pub fn validate_color_index(index: i64) -> ValidationResult<()> {
    if HighlightColor::from_index(index).is_none() {
        return Err(ValidationError::OutOfRange {
            field: "color_index".to_string(),
            min: 0,
            max: HighlightColor::ALL.len() as i64 - 1,
        });
    }

    Ok(())
}

// =============================================================================
// Catalog Validators
// =============================================================================

/// Validates a hymn before it is inserted into the catalog.
///
/// ## Rules
/// - Number must be positive
/// - Title, if present, at most [`MAX_TITLE_LEN`] characters
/// - Content must not be blank
pub fn validate_new_hymn(hymn: &NewHymn) -> ValidationResult<()> {
    if hymn.number <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "number".to_string(),
        });
    }

    if let Some(title) = &hymn.title {
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(ValidationError::TooLong {
                field: "title".to_string(),
                max: MAX_TITLE_LEN,
            });
        }
    }

    if hymn.content.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "content".to_string(),
        });
    }

    Ok(())
}

/// Validates a store product identifier.
pub fn validate_product_id(product_id: &str) -> ValidationResult<()> {
    let product_id = product_id.trim();

    if product_id.is_empty() {
        return Err(ValidationError::Required {
            field: "product_id".to_string(),
        });
    }

    if !product_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "product_id".to_string(),
            reason: "must contain only letters, digits, '.', '_' and '-'".to_string(),
        });
    }

    Ok(())
}

/// Validates a result limit.
pub fn validate_limit(limit: i64) -> ValidationResult<()> {
    if limit <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "limit".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
