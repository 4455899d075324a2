//! # Repository Facade
//!
//! The contract the rest of the app talks to: domain intents in, hymns and
//! live result streams out.
//!
//! ## Shape of the Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    HymnalRepository                                     │
//! │                                                                         │
//! │  Observables (LiveQuery<T>, re-emit on change)                         │
//! │  ├── all_hymns / hymns_by_category / search_hymns      [hymns]        │
//! │  ├── favorite_hymns                        [hymns, favorites]          │
//! │  ├── recent_hymns(limit)                   [hymns, history]            │
//! │  └── highlights_for_hymn / hymns_with_highlights  [.., highlights]     │
//! │                                                                         │
//! │  One-shot reads (absent → None, never an error)                        │
//! │  └── hymn_by_id / hymn_by_number / random_hymn / is_favorite           │
//! │                                                                         │
//! │  Mutations (errors propagate unchanged)                                │
//! │  ├── add_to_favorites / remove_from_favorites   (idempotent)           │
//! │  ├── add_to_history  (insert + trim to 100, one transaction)           │
//! │  ├── clear_history                                                     │
//! │  └── add_highlight / update_highlight_color / remove_highlight / ...   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`SqlHymnalRepository`] does not catch anything. Wrap it in
//! [`SafeHymnalRepository`](crate::safe::SafeHymnalRepository) for reporting
//! and degraded reads.

use std::future::Future;

use hymnal_core::validation::{validate_color_index, validate_highlight_span};
use hymnal_core::{Highlight, Hymn, HymnCategory, HISTORY_RETENTION_LIMIT};

use crate::error::DbResult;
use crate::observe::{live_query, ChangeTracker, LiveQuery, Table};
use crate::pool::Database;
use crate::repository::{FavoriteQueries, HighlightQueries, HistoryQueries, HymnQueries};

const HYMN_TABLES: &[Table] = &[Table::Hymns];
const FAVORITE_TABLES: &[Table] = &[Table::Hymns, Table::Favorites];
const HISTORY_TABLES: &[Table] = &[Table::Hymns, Table::History];
const HIGHLIGHT_TABLES: &[Table] = &[Table::Highlights];
const HIGHLIGHTED_HYMN_TABLES: &[Table] = &[Table::Hymns, Table::Highlights];

// =============================================================================
// Contract
// =============================================================================

/// Repository contract over hymns, favorites, history and highlights.
pub trait HymnalRepository: Send + Sync {
    /// Every hymn, ordered by category then number.
    fn all_hymns(&self) -> LiveQuery<Vec<Hymn>>;

    /// Hymns in one category, ordered by number.
    fn hymns_by_category(&self, category: HymnCategory) -> LiveQuery<Vec<Hymn>>;

    fn hymn_by_id(&self, id: i64) -> impl Future<Output = DbResult<Option<Hymn>>> + Send;

    fn hymn_by_number(
        &self,
        number: i64,
        category: HymnCategory,
    ) -> impl Future<Output = DbResult<Option<Hymn>>> + Send;

    fn random_hymn(&self) -> impl Future<Output = DbResult<Option<Hymn>>> + Send;

    /// Matches for `query`. Blank input yields empty results, never the
    /// whole catalog. Minimum-length filtering is the caller's business.
    fn search_hymns(&self, query: &str) -> LiveQuery<Vec<Hymn>>;

    fn favorite_hymns(&self) -> LiveQuery<Vec<Hymn>>;

    /// Idempotent: favoriting twice is a no-op.
    fn add_to_favorites(&self, hymn_id: i64) -> impl Future<Output = DbResult<()>> + Send;

    /// Idempotent: removing a non-favorite is a no-op.
    fn remove_from_favorites(&self, hymn_id: i64) -> impl Future<Output = DbResult<()>> + Send;

    fn is_favorite(&self, hymn_id: i64) -> impl Future<Output = DbResult<bool>> + Send;

    /// Distinct recently viewed hymns, newest first, at most `limit`.
    fn recent_hymns(&self, limit: i64) -> LiveQuery<Vec<Hymn>>;

    /// Records a view and trims history to the retention limit atomically.
    fn add_to_history(&self, hymn_id: i64) -> impl Future<Output = DbResult<()>> + Send;

    fn clear_history(&self) -> impl Future<Output = DbResult<()>> + Send;

    /// Adds a highlight after checking `start < end` and the colour index.
    fn add_highlight(
        &self,
        hymn_id: i64,
        start_index: i64,
        end_index: i64,
        color_index: i64,
    ) -> impl Future<Output = DbResult<Highlight>> + Send;

    fn update_highlight_color(
        &self,
        id: i64,
        color_index: i64,
    ) -> impl Future<Output = DbResult<()>> + Send;

    fn remove_highlight(&self, id: i64) -> impl Future<Output = DbResult<()>> + Send;

    fn clear_highlights_for_hymn(&self, hymn_id: i64)
        -> impl Future<Output = DbResult<()>> + Send;

    fn highlights_for_hymn(&self, hymn_id: i64) -> LiveQuery<Vec<Highlight>>;

    /// Distinct hymns with at least one highlight, as full records.
    fn hymns_with_highlights(&self) -> LiveQuery<Vec<Hymn>>;
}

// =============================================================================
// SQLite Implementation
// =============================================================================

/// [`HymnalRepository`] over the SQLite query layer.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.repository();
///
/// repo.add_to_favorites(hymn.id).await?;
/// let mut favorites = repo.favorite_hymns();
/// while let Some(hymns) = favorites.next().await {
///     render(hymns?);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SqlHymnalRepository {
    hymns: HymnQueries,
    favorites: FavoriteQueries,
    history: HistoryQueries,
    highlights: HighlightQueries,
    changes: ChangeTracker,
}

impl SqlHymnalRepository {
    /// Creates a facade sharing `db`'s pool and change tracker.
    pub fn new(db: &Database) -> Self {
        SqlHymnalRepository {
            hymns: db.hymns(),
            favorites: db.favorites(),
            history: db.history(),
            highlights: db.highlights(),
            changes: db.changes().clone(),
        }
    }

    /// The hymn query layer, for the catalog operations the facade
    /// doesn't expose (bulk insert, counts).
    pub fn hymn_queries(&self) -> &HymnQueries {
        &self.hymns
    }
}

impl HymnalRepository for SqlHymnalRepository {
    fn all_hymns(&self) -> LiveQuery<Vec<Hymn>> {
        let hymns = self.hymns.clone();
        live_query(&self.changes, HYMN_TABLES, move || {
            let hymns = hymns.clone();
            async move { hymns.all().await }
        })
    }

    fn hymns_by_category(&self, category: HymnCategory) -> LiveQuery<Vec<Hymn>> {
        let hymns = self.hymns.clone();
        live_query(&self.changes, HYMN_TABLES, move || {
            let hymns = hymns.clone();
            async move { hymns.by_category(category).await }
        })
    }

    async fn hymn_by_id(&self, id: i64) -> DbResult<Option<Hymn>> {
        self.hymns.by_id(id).await
    }

    async fn hymn_by_number(&self, number: i64, category: HymnCategory) -> DbResult<Option<Hymn>> {
        self.hymns.by_number(number, category).await
    }

    async fn random_hymn(&self) -> DbResult<Option<Hymn>> {
        self.hymns.random().await
    }

    fn search_hymns(&self, query: &str) -> LiveQuery<Vec<Hymn>> {
        let hymns = self.hymns.clone();
        let query = query.to_string();
        live_query(&self.changes, HYMN_TABLES, move || {
            let hymns = hymns.clone();
            let query = query.clone();
            async move { hymns.search(&query).await }
        })
    }

    fn favorite_hymns(&self) -> LiveQuery<Vec<Hymn>> {
        let favorites = self.favorites.clone();
        live_query(&self.changes, FAVORITE_TABLES, move || {
            let favorites = favorites.clone();
            async move { favorites.hymns().await }
        })
    }

    async fn add_to_favorites(&self, hymn_id: i64) -> DbResult<()> {
        self.favorites.add(hymn_id).await.map(|_| ())
    }

    async fn remove_from_favorites(&self, hymn_id: i64) -> DbResult<()> {
        self.favorites.remove(hymn_id).await.map(|_| ())
    }

    async fn is_favorite(&self, hymn_id: i64) -> DbResult<bool> {
        self.favorites.is_favorite(hymn_id).await
    }

    fn recent_hymns(&self, limit: i64) -> LiveQuery<Vec<Hymn>> {
        let history = self.history.clone();
        live_query(&self.changes, HISTORY_TABLES, move || {
            let history = history.clone();
            async move { history.recent(limit).await }
        })
    }

    async fn add_to_history(&self, hymn_id: i64) -> DbResult<()> {
        self.history.record(hymn_id, HISTORY_RETENTION_LIMIT).await
    }

    async fn clear_history(&self) -> DbResult<()> {
        self.history.clear().await.map(|_| ())
    }

    async fn add_highlight(
        &self,
        hymn_id: i64,
        start_index: i64,
        end_index: i64,
        color_index: i64,
    ) -> DbResult<Highlight> {
        validate_highlight_span(start_index, end_index)?;
        validate_color_index(color_index)?;

        self.highlights
            .add(hymn_id, start_index, end_index, color_index)
            .await
    }

    async fn update_highlight_color(&self, id: i64, color_index: i64) -> DbResult<()> {
        validate_color_index(color_index)?;
        self.highlights.update_color(id, color_index).await.map(|_| ())
    }

    async fn remove_highlight(&self, id: i64) -> DbResult<()> {
        self.highlights.remove(id).await.map(|_| ())
    }

    async fn clear_highlights_for_hymn(&self, hymn_id: i64) -> DbResult<()> {
        self.highlights.clear_for_hymn(hymn_id).await.map(|_| ())
    }

    fn highlights_for_hymn(&self, hymn_id: i64) -> LiveQuery<Vec<Highlight>> {
        let highlights = self.highlights.clone();
        live_query(&self.changes, HIGHLIGHT_TABLES, move || {
            let highlights = highlights.clone();
            async move { highlights.for_hymn(hymn_id).await }
        })
    }

    fn hymns_with_highlights(&self) -> LiveQuery<Vec<Hymn>> {
        let highlights = self.highlights.clone();
        live_query(&self.changes, HIGHLIGHTED_HYMN_TABLES, move || {
            let highlights = highlights.clone();
            async move { highlights.hymns_with_highlights().await }
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
