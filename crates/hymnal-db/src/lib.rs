//! # hymnal-db: Persistence Layer for the Hymnal
//!
//! This crate provides local storage and search for the hymnal.
//! It uses SQLite with sqlx for async operations and FTS5 for search.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Hymnal Data Flow                                 │
//! │                                                                         │
//! │  AppContext (hymnal-app)                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     hymnal-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   SafeHymnalRepository   report + degrade reads / rethrow writes│   │
//! │  │          │                                                      │   │
//! │  │          ▼                                                      │   │
//! │  │   HymnalRepository ─── SqlHymnalRepository (facade.rs)          │   │
//! │  │          │                       │                              │   │
//! │  │          ▼                       ▼                              │   │
//! │  │   ┌──────────────┐    ┌────────────────┐    ┌──────────────┐   │   │
//! │  │   │   Database   │    │  Query layer   │    │  Migrations  │   │   │
//! │  │   │  (pool.rs)   │◄───│ Hymn/Favorite/ │    │  (embedded)  │   │   │
//! │  │   │ SqlitePool   │    │ History/       │    │ 001 schema   │   │   │
//! │  │   │ ChangeTracker│    │ HighlightQ...  │    │ 002 fts5     │   │   │
//! │  │   └──────────────┘    └────────────────┘    │ 003 meta     │   │   │
//! │  │                                             └──────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  SQLite file, copied from the bundled seed on first launch     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`observe`] - Change tracking and live queries
//! - [`repository`] - Per-table query layer
//! - [`facade`] - The repository contract and its SQLite implementation
//! - [`safe`] - Failure-reporting wrapper around the facade
//! - [`seed`] - Bundled catalog install and refresh
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hymnal_db::{Database, DbConfig, HymnalRepository, SafeHymnalRepository};
//!
//! let db = Database::new(DbConfig::new("path/to/hymnal.db")).await?;
//! let repo = SafeHymnalRepository::new(db.repository());
//!
//! let hymn = repo.hymn_by_id(1).await;
//! repo.add_to_history(1).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod facade;
pub mod migrations;
pub mod observe;
pub mod pool;
pub mod repository;
pub mod safe;
pub mod seed;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use facade::{HymnalRepository, SqlHymnalRepository};
pub use observe::{ChangeTracker, LiveQuery, Table};
pub use pool::{Database, DbConfig, Location};
pub use safe::{DiagnosticsReporter, SafeHymnalRepository, SafeStream, TracingReporter};
pub use seed::{install_catalog, SeedOutcome};

// Repository re-exports for convenience
pub use repository::{FavoriteQueries, HighlightQueries, HistoryQueries, HymnQueries};
