//! # History Queries
//!
//! Append-only log of hymn views, capped at a retention limit.
//!
//! ## Insert-Then-Trim
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    record(hymn_id, retention = 100)                     │
//! │                                                                         │
//! │  BEGIN                                                                 │
//! │    INSERT INTO history (hymn_id, accessed_at)        → 101 rows        │
//! │    DELETE FROM history WHERE id NOT IN (newest 100)  → 100 rows        │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  Readers on other connections see either 100 rows before or 100 rows   │
//! │  after. The 101-row state never leaves the transaction.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repeat views of the same hymn are separate rows. [`HistoryQueries::recent`]
//! collapses them so each hymn appears once, at its latest view.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use hymnal_core::validation::validate_limit;
use hymnal_core::Hymn;

use crate::error::{DbError, DbResult};
use crate::observe::{ChangeTracker, Table};

/// Repository for view history.
#[derive(Debug, Clone)]
pub struct HistoryQueries {
    pool: SqlitePool,
    changes: ChangeTracker,
}

impl HistoryQueries {
    /// Creates a new HistoryQueries.
    pub fn new(pool: SqlitePool, changes: ChangeTracker) -> Self {
        HistoryQueries { pool, changes }
    }

    /// Records a view now and trims history to `retention` rows.
    pub async fn record(&self, hymn_id: i64, retention: i64) -> DbResult<()> {
        self.record_at(hymn_id, Utc::now(), retention).await
    }

    /// Records a view at `accessed_at` and trims history to `retention` rows,
    /// in one transaction.
    ///
    /// ## Errors
    /// * `DbError::Validation` - `retention` is not positive
    /// * `DbError::ForeignKeyViolation` - no hymn with that id
    pub async fn record_at(
        &self,
        hymn_id: i64,
        accessed_at: DateTime<Utc>,
        retention: i64,
    ) -> DbResult<()> {
        validate_limit(retention)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO history (hymn_id, accessed_at) VALUES (?1, ?2)")
            .bind(hymn_id)
            .bind(accessed_at)
            .execute(&mut *tx)
            .await?;

        let trimmed = sqlx::query(
            r#"
            DELETE FROM history
            WHERE id NOT IN (
                SELECT id FROM history
                ORDER BY accessed_at DESC, id DESC
                LIMIT ?1
            )
            "#,
        )
        .bind(retention)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(hymn_id, trimmed, "Recorded hymn view");
        self.changes.notify(&[Table::History]);

        Ok(())
    }

    /// Distinct hymns by most recent view, newest first, at most `limit`.
    pub async fn recent(&self, limit: i64) -> DbResult<Vec<Hymn>> {
        validate_limit(limit)?;

        let hymns = sqlx::query_as::<_, Hymn>(
            r#"
            SELECT h.id, h.number, h.title, h.category, h.content, h.created_at
            FROM hymns h
            INNER JOIN (
                SELECT hymn_id, MAX(accessed_at) AS last_accessed, MAX(id) AS last_id
                FROM history
                GROUP BY hymn_id
            ) r ON r.hymn_id = h.id
            ORDER BY r.last_accessed DESC, r.last_id DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(hymns)
    }

    /// Deletes all history. Returns the number of rows removed.
    pub async fn clear(&self) -> DbResult<u64> {
        let removed = sqlx::query("DELETE FROM history")
            .execute(&self.pool)
            .await?
            .rows_affected();

        debug!(removed, "Cleared history");
        self.changes.notify(&[Table::History]);

        Ok(removed)
    }

    /// Number of stored history rows (not distinct hymns).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM history")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;
    use hymnal_core::{HymnCategory, NewHymn};

    async fn db_with_hymns(n: i64) -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for number in 1..=n {
            db.hymns()
                .insert(&NewHymn {
                    number,
                    title: None,
                    category: HymnCategory::Supplementary,
                    content: format!("Hymn {}", number),
                })
                .await
                .unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_recent_is_newest_first_and_distinct() {
        let db = db_with_hymns(3).await;
        let history = db.history();
        let t0 = Utc::now();

        history.record_at(1, t0, 100).await.unwrap();
        history.record_at(2, t0 + Duration::seconds(1), 100).await.unwrap();
        history.record_at(1, t0 + Duration::seconds(2), 100).await.unwrap();
        history.record_at(3, t0 + Duration::seconds(3), 100).await.unwrap();

        let ids: Vec<i64> = history.recent(20).await.unwrap().iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(history.count().await.unwrap(), 4);

        let ids: Vec<i64> = history.recent(2).await.unwrap().iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[tokio::test]
    async fn test_trim_keeps_newest() {
        let db = db_with_hymns(5).await;
        let history = db.history();
        let t0 = Utc::now();

        for i in 0..8 {
            history
                .record_at(i % 5 + 1, t0 + Duration::seconds(i), 5)
                .await
                .unwrap();
        }

        assert_eq!(history.count().await.unwrap(), 5);
        // Last view was i = 7 → hymn 3.
        assert_eq!(history.recent(1).await.unwrap()[0].id, 3);
    }

    #[tokio::test]
    async fn test_clear() {
        let db = db_with_hymns(1).await;
        db.history().record(1, 100).await.unwrap();

        assert_eq!(db.history().clear().await.unwrap(), 1);
        assert!(db.history().recent(20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_bad_limits() {
        let db = db_with_hymns(1).await;
        assert!(db.history().record(1, 0).await.is_err());
        assert!(db.history().recent(0).await.is_err());
        assert_eq!(db.history().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_hymn_rolls_back() {
        let db = db_with_hymns(1).await;
        assert!(db.history().record(99, 100).await.is_err());
        assert_eq!(db.history().count().await.unwrap(), 0);
    }
}
