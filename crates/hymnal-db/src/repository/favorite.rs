//! # Favorite Queries
//!
//! The local user's favorite hymns. At most one row per hymn.
//!
//! ```text
//! add(7)    → INSERT OR IGNORE ... → 1 row
//! add(7)    → INSERT OR IGNORE ... → still 1 row (no-op, not an error)
//! remove(7) → DELETE ...           → 0 rows
//! remove(7) → DELETE ...           → 0 rows (no-op)
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use hymnal_core::Hymn;

use crate::error::DbResult;
use crate::observe::{ChangeTracker, Table};

/// Repository for favorites.
#[derive(Debug, Clone)]
pub struct FavoriteQueries {
    pool: SqlitePool,
    changes: ChangeTracker,
}

impl FavoriteQueries {
    /// Creates a new FavoriteQueries.
    pub fn new(pool: SqlitePool, changes: ChangeTracker) -> Self {
        FavoriteQueries { pool, changes }
    }

    /// Favorites a hymn. Returns `false` if it already was one.
    ///
    /// ## Errors
    /// * `DbError::ForeignKeyViolation` - no hymn with that id
    pub async fn add(&self, hymn_id: i64) -> DbResult<bool> {
        debug!(hymn_id, "Adding favorite");

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO favorites (hymn_id, created_at)
            VALUES (?1, ?2)
            "#,
        )
        .bind(hymn_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let added = result.rows_affected() > 0;
        if added {
            self.changes.notify(&[Table::Favorites]);
        }

        Ok(added)
    }

    /// Unfavorites a hymn. Returns `false` if it wasn't one.
    pub async fn remove(&self, hymn_id: i64) -> DbResult<bool> {
        debug!(hymn_id, "Removing favorite");

        let result = sqlx::query("DELETE FROM favorites WHERE hymn_id = ?1")
            .bind(hymn_id)
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            self.changes.notify(&[Table::Favorites]);
        }

        Ok(removed)
    }

    /// Whether the hymn is a favorite.
    pub async fn is_favorite(&self, hymn_id: i64) -> DbResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM favorites WHERE hymn_id = ?1)")
                .bind(hymn_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    /// Favorite hymns, most recently favorited first.
    pub async fn hymns(&self) -> DbResult<Vec<Hymn>> {
        let hymns = sqlx::query_as::<_, Hymn>(
            r#"
            SELECT h.id, h.number, h.title, h.category, h.content, h.created_at
            FROM favorites f
            INNER JOIN hymns h ON h.id = f.hymn_id
            ORDER BY f.created_at DESC, f.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(hymns)
    }

    /// Number of favorites.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM favorites")
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
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use hymnal_core::{HymnCategory, NewHymn};

    async fn db_with_hymns(n: i64) -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for number in 1..=n {
            db.hymns()
                .insert(&NewHymn {
                    number,
                    title: None,
                    category: HymnCategory::AncientModern,
                    content: format!("Hymn {}", number),
                })
                .await
                .unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let db = db_with_hymns(1).await;
        let favorites = db.favorites();

        assert!(favorites.add(1).await.unwrap());
        assert!(!favorites.add(1).await.unwrap());

        assert_eq!(favorites.count().await.unwrap(), 1);
        assert!(favorites.is_favorite(1).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove() {
        let db = db_with_hymns(1).await;
        let favorites = db.favorites();

        favorites.add(1).await.unwrap();
        assert!(favorites.remove(1).await.unwrap());
        assert!(!favorites.remove(1).await.unwrap());
        assert!(!favorites.is_favorite(1).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_hymn_is_rejected() {
        let db = db_with_hymns(0).await;
        let err = db.favorites().add(42).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation(_)));
    }

    #[tokio::test]
    async fn test_hymns_joined() {
        let db = db_with_hymns(3).await;
        let favorites = db.favorites();

        favorites.add(3).await.unwrap();
        favorites.add(1).await.unwrap();

        let ids: Vec<i64> = favorites.hymns().await.unwrap().iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_notifies_only_on_change() {
        let db = db_with_hymns(1).await;
        let before = db.changes().versions().get(Table::Favorites);

        db.favorites().add(1).await.unwrap();
        db.favorites().add(1).await.unwrap();

        assert_eq!(db.changes().versions().get(Table::Favorites), before + 1);
    }
}
