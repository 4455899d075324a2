//! # Query Layer
//!
//! Typed per-table repositories over the hymnal schema.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Query Layer                                          │
//! │                                                                         │
//! │  SqlHymnalRepository (facade.rs)                                       │
//! │       │                                                                 │
//! │       ├── HymnQueries       all / by_category / by_id / search ...     │
//! │       ├── FavoriteQueries   add (INSERT OR IGNORE) / remove / hymns    │
//! │       ├── HistoryQueries    record (insert + trim, one tx) / recent    │
//! │       └── HighlightQueries  add / update_color / remove / for_hymn     │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite ──► after COMMIT: ChangeTracker::notify(table)                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every handle holds a pool clone and the shared change tracker, so handles
//! are cheap to create and clone.

pub mod favorite;
pub mod highlight;
pub mod history;
pub mod hymn;

pub use favorite::FavoriteQueries;
pub use highlight::HighlightQueries;
pub use history::HistoryQueries;
pub use hymn::HymnQueries;
