//! # Safe Repository Wrapper
//!
//! Reports every repository failure, then either degrades or re-throws
//! depending on the operation.
//!
//! ## Policy Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operation kind         On success      On failure                      │
//! │  ──────────────────     ───────────     ─────────────────────────────   │
//! │  point read             value           report → None                   │
//! │  collection stream      Vec<T>          report → empty Vec (stream on)  │
//! │  boolean query          bool            report → false                  │
//! │  mutation               Ok(..)          report → Err (caller decides)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A degraded read looks like "nothing found". The diagnostics record is the
//! only way to tell the two apart.

use std::sync::Arc;

use futures_util::stream::{BoxStream, StreamExt};
use tracing::error;

use hymnal_core::{Highlight, Hymn, HymnCategory};

use crate::error::{DbError, DbResult};
use crate::facade::HymnalRepository;
use crate::observe::LiveQuery;

/// A live stream that has already swallowed its errors.
pub type SafeStream<T> = BoxStream<'static, T>;

/// Key/value context attached to a failure report.
pub type Attributes = [(&'static str, String)];

// =============================================================================
// Diagnostics Capability
// =============================================================================

/// Receives repository failures (crash reporter, log sink, ...).
///
/// Implementations must not panic.
pub trait DiagnosticsReporter: Send + Sync {
    /// Reports one failed operation.
    fn report(&self, message: &str, attributes: &Attributes, error: &DbError);
}

/// Default reporter: one `tracing` error event per failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl DiagnosticsReporter for TracingReporter {
    fn report(&self, message: &str, attributes: &Attributes, err: &DbError) {
        let context = attributes
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(" ");
        error!(error = %err, context = %context, "{}", message);
    }
}

// =============================================================================
// Safe Repository
// =============================================================================

/// Wraps a [`HymnalRepository`] with the failure policy above.
pub struct SafeHymnalRepository<R> {
    inner: R,
    reporter: Arc<dyn DiagnosticsReporter>,
}

impl<R: HymnalRepository> SafeHymnalRepository<R> {
    /// Wraps `inner`, reporting through [`TracingReporter`].
    pub fn new(inner: R) -> Self {
        Self::with_reporter(inner, Arc::new(TracingReporter))
    }

    /// Wraps `inner` with a custom reporter.
    pub fn with_reporter(inner: R, reporter: Arc<dyn DiagnosticsReporter>) -> Self {
        SafeHymnalRepository { inner, reporter }
    }

    /// The wrapped repository.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn report(&self, message: &str, attributes: &Attributes, err: &DbError) {
        self.reporter.report(message, attributes, err);
    }

    fn degrade<T>(&self, result: DbResult<T>, default: T, message: &str, attributes: &Attributes) -> T {
        match result {
            Ok(value) => value,
            Err(err) => {
                self.report(message, attributes, &err);
                default
            }
        }
    }

    fn rethrow<T>(&self, result: DbResult<T>, message: &str, attributes: &Attributes) -> DbResult<T> {
        if let Err(err) = &result {
            self.report(message, attributes, err);
        }
        result
    }

    fn degrade_stream<T>(
        &self,
        stream: LiveQuery<Vec<T>>,
        message: &'static str,
        attributes: Vec<(&'static str, String)>,
    ) -> SafeStream<Vec<T>>
    where
        T: Send + 'static,
    {
        let reporter = self.reporter.clone();
        stream
            .map(move |result| match result {
                Ok(items) => items,
                Err(err) => {
                    reporter.report(message, &attributes, &err);
                    Vec::new()
                }
            })
            .boxed()
    }

    // -------------------------------------------------------------------------
    // Hymns
    // -------------------------------------------------------------------------

    pub fn all_hymns(&self) -> SafeStream<Vec<Hymn>> {
        self.degrade_stream(self.inner.all_hymns(), "Failed to load hymns", Vec::new())
    }

    pub fn hymns_by_category(&self, category: HymnCategory) -> SafeStream<Vec<Hymn>> {
        self.degrade_stream(
            self.inner.hymns_by_category(category),
            "Failed to load hymns by category",
            vec![("category", category.to_string())],
        )
    }

    pub async fn hymn_by_id(&self, id: i64) -> Option<Hymn> {
        let result = self.inner.hymn_by_id(id).await;
        self.degrade(result, None, "Failed to get hymn by id", &[("hymn_id", id.to_string())])
    }

    pub async fn hymn_by_number(&self, number: i64, category: HymnCategory) -> Option<Hymn> {
        let result = self.inner.hymn_by_number(number, category).await;
        self.degrade(
            result,
            None,
            "Failed to get hymn by number",
            &[("number", number.to_string()), ("category", category.to_string())],
        )
    }

    pub async fn random_hymn(&self) -> Option<Hymn> {
        let result = self.inner.random_hymn().await;
        self.degrade(result, None, "Failed to get random hymn", &[])
    }

    pub fn search_hymns(&self, query: &str) -> SafeStream<Vec<Hymn>> {
        self.degrade_stream(
            self.inner.search_hymns(query),
            "Failed to search hymns",
            vec![("query", query.to_string())],
        )
    }

    // -------------------------------------------------------------------------
    // Favorites
    // -------------------------------------------------------------------------

    pub fn favorite_hymns(&self) -> SafeStream<Vec<Hymn>> {
        self.degrade_stream(
            self.inner.favorite_hymns(),
            "Failed to load favorite hymns",
            Vec::new(),
        )
    }

    pub async fn add_to_favorites(&self, hymn_id: i64) -> DbResult<()> {
        let result = self.inner.add_to_favorites(hymn_id).await;
        self.rethrow(result, "Failed to add favorite", &[("hymn_id", hymn_id.to_string())])
    }

    pub async fn remove_from_favorites(&self, hymn_id: i64) -> DbResult<()> {
        let result = self.inner.remove_from_favorites(hymn_id).await;
        self.rethrow(result, "Failed to remove favorite", &[("hymn_id", hymn_id.to_string())])
    }

    pub async fn is_favorite(&self, hymn_id: i64) -> bool {
        let result = self.inner.is_favorite(hymn_id).await;
        self.degrade(
            result,
            false,
            "Failed to check favorite",
            &[("hymn_id", hymn_id.to_string())],
        )
    }

    // -------------------------------------------------------------------------
    // History
    // -------------------------------------------------------------------------

    pub fn recent_hymns(&self, limit: i64) -> SafeStream<Vec<Hymn>> {
        self.degrade_stream(
            self.inner.recent_hymns(limit),
            "Failed to load recent hymns",
            vec![("limit", limit.to_string())],
        )
    }

    pub async fn add_to_history(&self, hymn_id: i64) -> DbResult<()> {
        let result = self.inner.add_to_history(hymn_id).await;
        self.rethrow(result, "Failed to add to history", &[("hymn_id", hymn_id.to_string())])
    }

    pub async fn clear_history(&self) -> DbResult<()> {
        let result = self.inner.clear_history().await;
        self.rethrow(result, "Failed to clear history", &[])
    }

    // -------------------------------------------------------------------------
    // Highlights
    // -------------------------------------------------------------------------

    pub async fn add_highlight(
        &self,
        hymn_id: i64,
        start_index: i64,
        end_index: i64,
        color_index: i64,
    ) -> DbResult<Highlight> {
        let result = self
            .inner
            .add_highlight(hymn_id, start_index, end_index, color_index)
            .await;
        self.rethrow(
            result,
            "Failed to add highlight",
            &[
                ("hymn_id", hymn_id.to_string()),
                ("start_index", start_index.to_string()),
                ("end_index", end_index.to_string()),
                ("color_index", color_index.to_string()),
            ],
        )
    }

    pub async fn update_highlight_color(&self, id: i64, color_index: i64) -> DbResult<()> {
        let result = self.inner.update_highlight_color(id, color_index).await;
        self.rethrow(
            result,
            "Failed to update highlight color",
            &[("highlight_id", id.to_string()), ("color_index", color_index.to_string())],
        )
    }

    pub async fn remove_highlight(&self, id: i64) -> DbResult<()> {
        let result = self.inner.remove_highlight(id).await;
        self.rethrow(result, "Failed to remove highlight", &[("highlight_id", id.to_string())])
    }

    pub async fn clear_highlights_for_hymn(&self, hymn_id: i64) -> DbResult<()> {
        let result = self.inner.clear_highlights_for_hymn(hymn_id).await;
        self.rethrow(result, "Failed to clear highlights", &[("hymn_id", hymn_id.to_string())])
    }

    pub fn highlights_for_hymn(&self, hymn_id: i64) -> SafeStream<Vec<Highlight>> {
        self.degrade_stream(
            self.inner.highlights_for_hymn(hymn_id),
            "Failed to load highlights",
            vec![("hymn_id", hymn_id.to_string())],
        )
    }

    pub fn hymns_with_highlights(&self) -> SafeStream<Vec<Hymn>> {
        self.degrade_stream(
            self.inner.hymns_with_highlights(),
            "Failed to load highlighted hymns",
            Vec::new(),
        )
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facade::SqlHymnalRepository;
    use crate::pool::{Database, DbConfig};
    use hymnal_core::NewHymn;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingReporter {
        reports: Mutex<Vec<(String, Vec<(&'static str, String)>)>>,
    }

    impl RecordingReporter {
        fn messages(&self) -> Vec<String> {
            self.reports.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
        }
    }

    impl DiagnosticsReporter for RecordingReporter {
        fn report(&self, message: &str, attributes: &Attributes, _error: &DbError) {
            self.reports
                .lock()
                .unwrap()
                .push((message.to_string(), attributes.to_vec()));
        }
    }

    async fn setup() -> (Database, SafeHymnalRepository<SqlHymnalRepository>, Arc<RecordingReporter>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.hymns()
            .insert(&NewHymn {
                number: 1,
                title: Some("Abide with me".to_string()),
                category: HymnCategory::AncientModern,
                content: "Fast falls the eventide".to_string(),
            })
            .await
            .unwrap();

        let reporter = Arc::new(RecordingReporter::default());
        let safe = SafeHymnalRepository::with_reporter(db.repository(), reporter.clone());
        (db, safe, reporter)
    }

    #[tokio::test]
    async fn test_success_passes_through_without_reports() {
        let (_db, safe, reporter) = setup().await;

        assert!(safe.hymn_by_id(1).await.is_some());
        assert!(safe.hymn_by_id(2).await.is_none());
        safe.add_to_favorites(1).await.unwrap();
        assert!(safe.is_favorite(1).await);
        assert_eq!(safe.all_hymns().next().await.unwrap().len(), 1);

        assert!(reporter.messages().is_empty());
    }

    #[tokio::test]
    async fn test_reads_degrade_after_failure() {
        let (db, safe, reporter) = setup().await;
        db.close().await;

        assert!(safe.hymn_by_id(1).await.is_none());
        assert!(safe.random_hymn().await.is_none());
        assert!(!safe.is_favorite(1).await);
        assert!(safe.all_hymns().next().await.unwrap().is_empty());

        let reports = reporter.reports.lock().unwrap().clone();
        assert_eq!(reports.len(), 4);
        assert_eq!(reports[0].0, "Failed to get hymn by id");
        assert_eq!(reports[0].1, vec![("hymn_id", "1".to_string())]);
    }

    #[tokio::test]
    async fn test_mutations_rethrow_after_report() {
        let (db, safe, reporter) = setup().await;
        db.close().await;

        assert!(safe.add_to_favorites(1).await.is_err());
        assert!(safe.add_to_history(1).await.is_err());
        assert!(safe.add_highlight(1, 0, 4, 0).await.is_err());

        assert_eq!(
            reporter.messages(),
            vec![
                "Failed to add favorite".to_string(),
                "Failed to add to history".to_string(),
                "Failed to add highlight".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_validation_failure_is_reported_and_returned() {
        let (_db, safe, reporter) = setup().await;

        let err = safe.add_highlight(1, 4, 2, 0).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert_eq!(reporter.messages().len(), 1);
    }
}
