//! # Live Queries
//!
//! Re-emitting query results for the repository's observable operations.
//!
//! ## How a Live Query Works
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Change Tracking                                      │
//! │                                                                         │
//! │  FavoriteQueries::add()                                                │
//! │       │  INSERT ... COMMIT                                              │
//! │       ▼                                                                 │
//! │  ChangeTracker::notify(Favorites)                                      │
//! │       │  versions: [hymns 0, favorites 1 → 2, history 4, highlights 0] │
//! │       ▼                                                                 │
//! │  watch channel ──► every subscribed LiveQuery wakes up                  │
//! │                        │                                                │
//! │                        ├── watches [Hymns, Favorites]? → re-run query  │
//! │                        └── watches [Hymns, History]?   → stay asleep   │
//! │                                                                         │
//! │  Several commits while a query runs collapse into one re-run, because  │
//! │  the watch channel only keeps the latest versions.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A live query emits its first result immediately. Dropping the stream is
//! the only way to stop it.

use std::future::Future;
use std::sync::Arc;

use futures_util::future;
use futures_util::stream::{BoxStream, StreamExt};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::trace;

use crate::error::DbResult;

/// A stream of query results, re-emitted whenever the underlying tables change.
pub type LiveQuery<T> = BoxStream<'static, DbResult<T>>;

// =============================================================================
// Tables
// =============================================================================

/// Tables whose changes live queries can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Hymns = 0,
    Favorites = 1,
    History = 2,
    Highlights = 3,
}

impl Table {
    /// All observable tables.
    pub const ALL: [Table; 4] = [
        Table::Hymns,
        Table::Favorites,
        Table::History,
        Table::Highlights,
    ];

    /// SQL table name.
    pub const fn name(&self) -> &'static str {
        match self {
            Table::Hymns => "hymns",
            Table::Favorites => "favorites",
            Table::History => "history",
            Table::Highlights => "highlights",
        }
    }

    #[inline]
    const fn slot(self) -> usize {
        self as usize
    }
}

/// Per-table commit counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableVersions([u64; 4]);

impl TableVersions {
    /// Version of one table.
    pub fn get(&self, table: Table) -> u64 {
        self.0[table.slot()]
    }

    /// True if any of `tables` moved between `earlier` and `self`.
    pub fn changed_since(&self, earlier: &TableVersions, tables: &[Table]) -> bool {
        tables.iter().any(|t| self.get(*t) != earlier.get(*t))
    }

    fn bump(&mut self, table: Table) {
        let slot = &mut self.0[table.slot()];
        *slot = slot.wrapping_add(1);
    }
}

// =============================================================================
// Change Tracker
// =============================================================================

/// Broadcasts table changes to live queries.
///
/// Cloning is cheap; all clones share one channel.
#[derive(Debug, Clone)]
pub struct ChangeTracker {
    tx: Arc<watch::Sender<TableVersions>>,
}

impl Default for ChangeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeTracker {
    /// Creates a tracker with every table at version 0.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(TableVersions::default());
        ChangeTracker { tx: Arc::new(tx) }
    }

    /// Records a committed change to `tables`.
    ///
    /// Call only after the transaction has committed.
    pub fn notify(&self, tables: &[Table]) {
        if tables.is_empty() {
            return;
        }
        self.tx.send_modify(|versions| {
            for table in tables {
                versions.bump(*table);
            }
        });
        trace!(?tables, "Tables changed");
    }

    /// Current versions.
    pub fn versions(&self) -> TableVersions {
        *self.tx.borrow()
    }

    /// A receiver positioned at the current versions.
    pub fn subscribe(&self) -> watch::Receiver<TableVersions> {
        self.tx.subscribe()
    }
}

// =============================================================================
// Live Query
// =============================================================================

/// Runs `query` now and again after every change to one of `tables`.
///
/// ## Example
/// ```rust,ignore
/// let hymns = db.hymns();
/// let stream = live_query(db.changes(), &[Table::Hymns], move || {
///     let hymns = hymns.clone();
///     async move { hymns.all().await }
/// });
/// ```
pub fn live_query<T, F, Fut>(
    tracker: &ChangeTracker,
    tables: &'static [Table],
    query: F,
) -> LiveQuery<T>
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = DbResult<T>> + Send + 'static,
{
    let mut seen: Option<TableVersions> = None;

    WatchStream::new(tracker.subscribe())
        .filter(move |versions| {
            let relevant = match &seen {
                None => true,
                Some(earlier) => versions.changed_since(earlier, tables),
            };
            if relevant {
                seen = Some(*versions);
            }
            future::ready(relevant)
        })
        .then(move |_| query())
        .boxed()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    #[test]
    fn test_notify_bumps_only_named_tables() {
        let tracker = ChangeTracker::new();
        let before = tracker.versions();

        tracker.notify(&[Table::Favorites]);
        let after = tracker.versions();

        assert_eq!(after.get(Table::Favorites), 1);
        assert_eq!(after.get(Table::Hymns), 0);
        assert!(after.changed_since(&before, &[Table::Hymns, Table::Favorites]));
        assert!(!after.changed_since(&before, &[Table::History]));
    }

    #[tokio::test]
    async fn test_live_query_emits_immediately_and_on_change() {
        let tracker = ChangeTracker::new();
        let counter = Arc::new(AtomicU64::new(0));

        let c = counter.clone();
        let mut stream = live_query(&tracker, &[Table::History], move || {
            let c = c.clone();
            async move { Ok(c.fetch_add(1, Ordering::SeqCst)) }
        });

        assert_eq!(stream.next().await.unwrap().unwrap(), 0);

        tracker.notify(&[Table::History]);
        assert_eq!(stream.next().await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_live_query_ignores_unrelated_tables() {
        let tracker = ChangeTracker::new();
        let mut stream = live_query(&tracker, &[Table::Highlights], || async { Ok(()) });

        stream.next().await.unwrap().unwrap();

        tracker.notify(&[Table::Hymns, Table::History]);
        let next = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;
        assert!(next.is_err(), "unrelated change must not re-run the query");
    }

    #[tokio::test]
    async fn test_stream_ends_when_tracker_dropped() {
        let tracker = ChangeTracker::new();
        let mut stream = live_query(&tracker, &[Table::Hymns], || async { Ok(1u8) });

        stream.next().await.unwrap().unwrap();
        drop(tracker);
        assert!(stream.next().await.is_none());
    }
}
