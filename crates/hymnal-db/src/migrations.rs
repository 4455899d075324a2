//! # Schema Migrations
//!
//! The SQL under `migrations/sqlite/` is compiled into the binary and
//! applied by [`Database::new`](crate::Database::new).
//!
//! ```text
//!   001_initial_schema  hymns, favorites, history, highlights
//!   002_hymn_search     hymns_fts + sync triggers (hymns_ai / _ad / _au)
//!   003_catalog_meta    catalog_meta (content_version)
//! ```
//!
//! The bundled seed catalog is produced by these same files, so a copied
//! seed and a fresh database end up with identical schemas. Applied files
//! are recorded in `_sqlx_migrations` and are never edited afterwards; a
//! schema change is a new numbered file.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies whatever has not been applied yet. Safe to call on every open.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    debug!(known = MIGRATOR.migrations.len(), "Schema up to date");
    Ok(())
}

/// `(known, applied)` migration counts. `applied` is 0 on a database that
/// has never been migrated.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let known = MIGRATOR.migrations.len();

    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations')",
    )
    .fetch_one(pool)
    .await?;
    if !table_exists {
        return Ok((known, 0));
    }

    let applied: i64 = sqlx::query_scalar("SELECT count(*) FROM _sqlx_migrations WHERE success")
        .fetch_one(pool)
        .await?;
    Ok((known, applied as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn count_objects(db: &Database, names: &str) -> i64 {
        sqlx::query_scalar(&format!(
            "SELECT count(*) FROM sqlite_master WHERE name IN ({})",
            names
        ))
        .fetch_one(db.pool())
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_fresh_database_is_fully_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert_eq!(migration_status(db.pool()).await.unwrap(), (3, 3));
        assert_eq!(
            count_objects(&db, "'hymns', 'favorites', 'history', 'highlights', 'catalog_meta'")
                .await,
            5
        );
    }

    #[tokio::test]
    async fn test_unmigrated_database_reports_zero() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();
        assert_eq!(migration_status(db.pool()).await.unwrap(), (3, 0));
    }

    #[tokio::test]
    async fn test_rerun_is_a_no_op() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.run_migrations().await.unwrap();
        assert_eq!(migration_status(db.pool()).await.unwrap(), (3, 3));
    }

    #[tokio::test]
    async fn test_search_index_and_triggers_exist() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert_eq!(
            count_objects(&db, "'hymns_fts', 'hymns_ai', 'hymns_ad', 'hymns_au'").await,
            4
        );
    }
}
