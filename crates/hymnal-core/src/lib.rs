//! # hymnal-core: Pure Domain Logic for the Hymnal
//!
//! This crate is the **heart** of the hymnal. It contains the catalog types,
//! the search-query builder, and the entitlement / support-prompt rules as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Hymnal Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Mobile UI (out of scope)                     │   │
//! │  │    Browse ──► Hymn Detail ──► Favorites ──► History ──► Paywall │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    hymnal-app (AppContext)                      │   │
//! │  │    settings, purchases, entitlement manager, usage tracker      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ hymnal-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌─────────────────┐    │   │
//! │  │   │  types   │ │  search  │ │ catalog  │ │ entitlement     │    │   │
//! │  │   │  Hymn    │ │ FTS5     │ │ seed     │ │ usage           │    │   │
//! │  │   │ Highlight│ │ escaping │ │ parsing  │ │ state machines  │    │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └─────────────────┘    │   │
//! │  │                                                                 │   │
//! │  │   no files, no SQL, no clock: `now` is always a parameter       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                   hymnal-db (Database Layer)                    │   │
//! │  │          SQLite + FTS5, migrations, repositories                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Hymn, Favorite, HistoryEntry, Highlight)
//! - [`search`] - User query normalization and FTS5 escaping
//! - [`catalog`] - Seed text file parsing
//! - [`entitlement`] - Trial / subscription state machine
//! - [`usage`] - Support-prompt threshold scheduler
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use hymnal_core::entitlement::{evaluate, EntitlementModel, EntitlementSnapshot, EntitlementState};
//!
//! let now = Utc::now();
//! let snapshot = EntitlementSnapshot {
//!     trial_started_at: Some(now - Duration::days(31)),
//!     purchase: None,
//! };
//!
//! let state = evaluate(EntitlementModel::default(), &snapshot, now);
//! assert_eq!(state, EntitlementState::TrialExpired);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod entitlement;
pub mod error;
pub mod search;
pub mod types;
pub mod usage;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use entitlement::{EntitlementModel, EntitlementState, EntitlementStatus, PurchaseType};
pub use error::{CoreError, CoreResult, ValidationError};
pub use search::SearchQuery;
pub use types::*;
pub use usage::{PromptSchedule, UsageCounters};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Number of history rows kept after every insert.
///
/// Older rows beyond this cap are trimmed in the same transaction as the insert.
pub const HISTORY_RETENTION_LIMIT: i64 = 100;

/// Default number of rows returned by the "recent hymns" list.
pub const DEFAULT_RECENT_LIMIT: i64 = 20;

/// Length of the free trial in days.
pub const DEFAULT_TRIAL_DAYS: i64 = 30;

/// Minimum query length the UI applies before calling search.
///
/// This is call-site policy. The repository itself accepts any non-blank
/// query, so callers that want the filter must apply it themselves.
pub const MIN_SEARCH_QUERY_LEN: usize = 2;

/// Upper bound on rows returned from a single search.
pub const SEARCH_RESULT_LIMIT: i64 = 200;
