//! # Highlight Queries
//!
//! User span annotations over hymn content.
//!
//! Spans are character offsets `[start_index, end_index)` into
//! `hymns.content`. The schema does not enforce `start < end`; the facade
//! validates before calling [`HighlightQueries::add`].

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use hymnal_core::{Highlight, Hymn};

use crate::error::DbResult;
use crate::observe::{ChangeTracker, Table};

/// Repository for highlights.
#[derive(Debug, Clone)]
pub struct HighlightQueries {
    pool: SqlitePool,
    changes: ChangeTracker,
}

impl HighlightQueries {
    /// Creates a new HighlightQueries.
    pub fn new(pool: SqlitePool, changes: ChangeTracker) -> Self {
        HighlightQueries { pool, changes }
    }

    /// Inserts a highlight and returns it with its generated id.
    pub async fn add(
        &self,
        hymn_id: i64,
        start_index: i64,
        end_index: i64,
        color_index: i64,
    ) -> DbResult<Highlight> {
        debug!(hymn_id, start_index, end_index, color_index, "Adding highlight");

        let now = Utc::now();

        let id = sqlx::query(
            r#"
            INSERT INTO highlights (hymn_id, start_index, end_index, color_index, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(hymn_id)
        .bind(start_index)
        .bind(end_index)
        .bind(color_index)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.changes.notify(&[Table::Highlights]);

        Ok(Highlight {
            id,
            hymn_id,
            start_index,
            end_index,
            color_index,
            created_at: now,
        })
    }

    /// Changes a highlight's colour. Returns `false` if it doesn't exist.
    pub async fn update_color(&self, id: i64, color_index: i64) -> DbResult<bool> {
        debug!(id, color_index, "Updating highlight color");

        let updated = sqlx::query("UPDATE highlights SET color_index = ?2 WHERE id = ?1")
            .bind(id)
            .bind(color_index)
            .execute(&self.pool)
            .await?
            .rows_affected()
            > 0;

        if updated {
            self.changes.notify(&[Table::Highlights]);
        }

        Ok(updated)
    }

    /// Deletes one highlight. Returns `false` if it doesn't exist.
    pub async fn remove(&self, id: i64) -> DbResult<bool> {
        let removed = sqlx::query("DELETE FROM highlights WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected()
            > 0;

        if removed {
            self.changes.notify(&[Table::Highlights]);
        }

        Ok(removed)
    }

    /// Deletes every highlight on a hymn. Returns the number removed.
    pub async fn clear_for_hymn(&self, hymn_id: i64) -> DbResult<u64> {
        let removed = sqlx::query("DELETE FROM highlights WHERE hymn_id = ?1")
            .bind(hymn_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        debug!(hymn_id, removed, "Cleared highlights");
        if removed > 0 {
            self.changes.notify(&[Table::Highlights]);
        }

        Ok(removed)
    }

    /// Highlights on a hymn, in text order.
    pub async fn for_hymn(&self, hymn_id: i64) -> DbResult<Vec<Highlight>> {
        let highlights = sqlx::query_as::<_, Highlight>(
            r#"
            SELECT id, hymn_id, start_index, end_index, color_index, created_at
            FROM highlights
            WHERE hymn_id = ?1
            ORDER BY start_index, id
            "#,
        )
        .bind(hymn_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(highlights)
    }

    /// Gets a highlight by id.
    pub async fn by_id(&self, id: i64) -> DbResult<Option<Highlight>> {
        let highlight = sqlx::query_as::<_, Highlight>(
            r#"
            SELECT id, hymn_id, start_index, end_index, color_index, created_at
            FROM highlights
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(highlight)
    }

    /// Distinct hymns with at least one highlight, ordered by category then number.
    pub async fn hymns_with_highlights(&self) -> DbResult<Vec<Hymn>> {
        let hymns = sqlx::query_as::<_, Hymn>(
            r#"
            SELECT h.id, h.number, h.title, h.category, h.content, h.created_at
            FROM hymns h
            WHERE h.id IN (SELECT DISTINCT hymn_id FROM highlights)
            ORDER BY h.category, h.number
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(hymns)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
