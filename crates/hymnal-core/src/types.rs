//! # Domain Types
//!
//! Core domain types used throughout the hymnal.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Hymn       │   │    Favorite     │   │  HistoryEntry   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (i64)       │◄──│  hymn_id (FK)   │   │  hymn_id (FK)   │──┐    │
//! │  │  number         │   │  UNIQUE         │   │  accessed_at    │  │    │
//! │  │  title?         │   └─────────────────┘   └─────────────────┘  │    │
//! │  │  category       │◄─────────────────────────────────────────────┘    │
//! │  │  content        │   ┌─────────────────┐   ┌─────────────────┐       │
//! │  └─────────────────┘◄──│   Highlight     │   │  HymnCategory   │       │
//! │                        │  ─────────────  │   │  ─────────────  │       │
//! │                        │  start..end     │   │  AncientModern  │       │
//! │                        │  color_index    │   │  Supplementary  │       │
//! │                        └─────────────────┘   │  Canticles ...  │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Hymns carry an integer `id` that is stable across catalog refreshes.
//! `(number, category)` is unique in practice but not enforced by the schema.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// =============================================================================
// Hymn Category
// =============================================================================

/// The catalog section a hymn belongs to.
///
/// Stored in SQLite as the snake_case string (`ancient_modern`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum HymnCategory {
    /// Hymns Ancient & Modern.
    AncientModern,
    /// Supplementary hymns.
    Supplementary,
    /// Canticles.
    Canticles,
    /// Psalms.
    Psalms,
    /// Creeds.
    Creed,
}

impl HymnCategory {
    /// All categories, in catalog order.
    pub const ALL: [HymnCategory; 5] = [
        HymnCategory::AncientModern,
        HymnCategory::Supplementary,
        HymnCategory::Canticles,
        HymnCategory::Psalms,
        HymnCategory::Creed,
    ];

    /// The string stored in the database and used for seed file names.
    pub const fn as_str(&self) -> &'static str {
        match self {
            HymnCategory::AncientModern => "ancient_modern",
            HymnCategory::Supplementary => "supplementary",
            HymnCategory::Canticles => "canticles",
            HymnCategory::Psalms => "psalms",
            HymnCategory::Creed => "creed",
        }
    }

    /// Human-readable section title.
    pub const fn display_name(&self) -> &'static str {
        match self {
            HymnCategory::AncientModern => "Ancient & Modern",
            HymnCategory::Supplementary => "Supplementary",
            HymnCategory::Canticles => "Canticles",
            HymnCategory::Psalms => "Psalms",
            HymnCategory::Creed => "Creed",
        }
    }
}

impl fmt::Display for HymnCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HymnCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ancient_modern" => Ok(HymnCategory::AncientModern),
            "supplementary" => Ok(HymnCategory::Supplementary),
            "canticles" => Ok(HymnCategory::Canticles),
            "psalms" => Ok(HymnCategory::Psalms),
            "creed" => Ok(HymnCategory::Creed),
            other => Err(CoreError::UnknownCategory(other.to_string())),
        }
    }
}

// =============================================================================
// Hymn
// =============================================================================

/// An immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Hymn {
    /// Stable row id.
    pub id: i64,

    /// Hymn number within its category (not globally unique).
    pub number: i64,

    /// Optional title; many psalms and canticles only have a number.
    pub title: Option<String>,

    /// Catalog section.
    pub category: HymnCategory,

    /// Full text, verses separated by blank lines.
    pub content: String,

    /// When the row was inserted into the catalog.
    pub created_at: DateTime<Utc>,
}

impl Hymn {
    /// Title to show in lists, falling back to the number.
    pub fn display_title(&self) -> String {
        match &self.title {
            Some(title) if !title.trim().is_empty() => title.clone(),
            _ => format!("{} {}", self.category.display_name(), self.number),
        }
    }

    /// Verses of the hymn, split on blank lines.
    pub fn verses(&self) -> Vec<&str> {
        self.content
            .split("\n\n")
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect()
    }
}

/// A hymn that has not been inserted yet (no id, no created_at).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHymn {
    pub number: i64,
    pub title: Option<String>,
    pub category: HymnCategory,
    pub content: String,
}

// =============================================================================
// Favorite
// =============================================================================

/// Marks a hymn as favorited by the local user. At most one per hymn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Favorite {
    pub id: i64,
    pub hymn_id: i64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// History
// =============================================================================

/// One view of a hymn. Repeat views produce repeat rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct HistoryEntry {
    pub id: i64,
    pub hymn_id: i64,
    pub accessed_at: DateTime<Utc>,
}

// =============================================================================
// Highlight
// =============================================================================

/// Palette used for highlights. The discriminant is the stored `color_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightColor {
    Yellow = 0,
    Green = 1,
    Blue = 2,
    Pink = 3,
    Orange = 4,
}

impl HighlightColor {
    /// All palette entries, ordered by index.
    pub const ALL: [HighlightColor; 5] = [
        HighlightColor::Yellow,
        HighlightColor::Green,
        HighlightColor::Blue,
        HighlightColor::Pink,
        HighlightColor::Orange,
    ];

    /// Stored index of this color.
    #[inline]
    pub const fn index(&self) -> i64 {
        *self as i64
    }

    /// Looks up a color by stored index.
    pub fn from_index(index: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.index() == index)
    }
}

/// A user-authored span annotation over a hymn's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Highlight {
    pub id: i64,
    pub hymn_id: i64,
    /// Character offset where the span starts (inclusive).
    pub start_index: i64,
    /// Character offset where the span ends (exclusive).
    pub end_index: i64,
    pub color_index: i64,
    pub created_at: DateTime<Utc>,
}

impl Highlight {
    /// Palette entry, if the stored index is known.
    pub fn color(&self) -> Option<HighlightColor> {
        HighlightColor::from_index(self.color_index)
    }

    /// Length of the span in characters.
    #[inline]
    pub fn len(&self) -> i64 {
        self.end_index - self.start_index
    }

    /// True for an empty or reversed span.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() <= 0
    }

    /// The highlighted slice of `content`, by character offsets.
    ///
    /// Offsets past the end of the text are clamped.
    pub fn excerpt<'a>(&self, content: &'a str) -> &'a str {
        let start = self.start_index.max(0) as usize;
        let end = self.end_index.max(0) as usize;
        let byte_at = |chars: usize| {
            content
                .char_indices()
                .nth(chars)
                .map(|(i, _)| i)
                .unwrap_or(content.len())
        };
        let (from, to) = (byte_at(start), byte_at(end));
        if from >= to {
            ""
        } else {
            &content[from..to]
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
