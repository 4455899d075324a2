//! # Seed Catalog Install
//!
//! Puts the bundled hymn catalog in place on first launch and refreshes it
//! when an app update ships newer content.
//!
//! ## Decision Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    install_catalog(bundled, target)                     │
//! │                                                                         │
//! │  target missing or zero bytes?                                         │
//! │       │                                                                 │
//! │       ├── YES → copy to <target>.db.tmp, rename → SeedOutcome::Copied  │
//! │       │                                                                 │
//! │       ▼ NO                                                              │
//! │  open target (runs migrations), ATTACH bundled AS bundle               │
//! │       │                                                                 │
//! │  bundle.content_version > main.content_version?                        │
//! │       │                                                                 │
//! │       ├── NO  →                              → SeedOutcome::UpToDate   │
//! │       │                                                                 │
//! │       ▼ YES, in one transaction:                                        │
//! │  1. upsert bundle.hymns into hymns by id   (FTS update trigger fires)  │
//! │  2. delete hymns missing from the bundle   (cascades user rows)        │
//! │  3. stamp content_version                                              │
//! │                                              → SeedOutcome::Refreshed  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Favorites, history and highlights of hymns that survive the refresh are
//! kept, since hymn ids are stable across catalog versions.

use std::io::ErrorKind;
use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use sqlx::{ConnectOptions, Connection, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::pool::{Database, DbConfig};

/// `catalog_meta` key holding the catalog content version.
pub const CONTENT_VERSION_KEY: &str = "content_version";

/// What [`install_catalog`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The bundled file was copied to the target path.
    Copied,
    /// The catalog in the existing database was replaced.
    Refreshed { from: i64, to: i64 },
    /// The existing database already has this content version or newer.
    UpToDate,
}

/// Reads the catalog content version. Missing or unparsable counts as 0.
pub async fn read_content_version(pool: &SqlitePool) -> DbResult<i64> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM catalog_meta WHERE key = ?1")
        .bind(CONTENT_VERSION_KEY)
        .fetch_optional(pool)
        .await?;

    Ok(parse_version(value))
}

/// Writes the catalog content version.
pub async fn stamp_content_version(pool: &SqlitePool, version: i64) -> DbResult<()> {
    write_version(pool, version).await
}

/// Makes a freshly built catalog at `path` ready to ship as one file:
/// switching to rollback journaling folds the WAL back in and removes the
/// `-wal` / `-shm` sidecars. Close every pool on `path` first.
pub async fn seal_bundle(path: &Path) -> DbResult<()> {
    let conn = SqliteConnectOptions::new()
        .filename(path)
        .journal_mode(SqliteJournalMode::Delete)
        .connect()
        .await
        .map_err(|e| DbError::ConnectionFailed(format!("{}: {}", path.display(), e)))?;
    conn.close().await?;

    debug!(path = %path.display(), "Sealed catalog bundle");
    Ok(())
}

/// Installs or refreshes the hymn catalog at `target` from `bundled`.
///
/// ## Errors
/// * `DbError::Io` - the bundled file is missing or the copy failed
/// * any database error while refreshing (the refresh is rolled back)
pub async fn install_catalog(bundled: &Path, target: &Path) -> DbResult<SeedOutcome> {
    // Fails early with NotFound if the app bundle is broken.
    tokio::fs::metadata(bundled).await?;

    let target_len = match tokio::fs::metadata(target).await {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == ErrorKind::NotFound => 0,
        Err(e) => return Err(DbError::Io(e)),
    };

    if target_len == 0 {
        copy_into_place(bundled, target).await?;
        info!(
            bundled = %bundled.display(),
            target = %target.display(),
            "Copied bundled hymn catalog"
        );
        return Ok(SeedOutcome::Copied);
    }

    let db = Database::new(DbConfig::new(target).max_connections(1)).await?;
    let outcome = refresh_from_bundle(&db, bundled).await;
    db.close().await;
    outcome
}

/// Copies `bundled` to a sibling temp file and renames it over `target`,
/// so an interrupted copy never leaves a truncated catalog at `target`.
async fn copy_into_place(bundled: &Path, target: &Path) -> DbResult<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = target.with_extension("db.tmp");
    let copied = match tokio::fs::copy(bundled, &tmp).await {
        Ok(_) => tokio::fs::rename(&tmp, target).await,
        Err(e) => Err(e),
    };

    if let Err(e) = copied {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(DbError::Io(e));
    }
    Ok(())
}

async fn refresh_from_bundle(db: &Database, bundled: &Path) -> DbResult<SeedOutcome> {
    let mut conn = db.pool().acquire().await?;

    sqlx::query("ATTACH DATABASE ?1 AS bundle")
        .bind(bundled.to_string_lossy().into_owned())
        .execute(&mut *conn)
        .await?;

    let outcome = refresh_attached(&mut conn).await;

    // Always detach, even if the refresh failed.
    let detached = sqlx::query("DETACH DATABASE bundle")
        .execute(&mut *conn)
        .await;

    let outcome = outcome?;
    detached?;
    Ok(outcome)
}

async fn refresh_attached(conn: &mut SqliteConnection) -> DbResult<SeedOutcome> {
    let current: Option<String> =
        sqlx::query_scalar("SELECT value FROM main.catalog_meta WHERE key = ?1")
            .bind(CONTENT_VERSION_KEY)
            .fetch_optional(&mut *conn)
            .await?;
    let bundled: Option<String> =
        sqlx::query_scalar("SELECT value FROM bundle.catalog_meta WHERE key = ?1")
            .bind(CONTENT_VERSION_KEY)
            .fetch_optional(&mut *conn)
            .await?;

    let (from, to) = (parse_version(current), parse_version(bundled));
    debug!(current = from, bundled = to, "Comparing catalog versions");

    if to <= from {
        return Ok(SeedOutcome::UpToDate);
    }

    let mut tx = conn.begin().await?;

    // `WHERE true` keeps SQLite from parsing ON CONFLICT as a join constraint.
    let upserted = sqlx::query(
        r#"
        INSERT INTO main.hymns (id, number, title, category, content, created_at)
        SELECT id, number, title, category, content, created_at
        FROM bundle.hymns
        WHERE true
        ON CONFLICT(id) DO UPDATE SET
            number = excluded.number,
            title = excluded.title,
            category = excluded.category,
            content = excluded.content
        "#,
    )
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let removed = sqlx::query(
        "DELETE FROM main.hymns WHERE id NOT IN (SELECT id FROM bundle.hymns)",
    )
    .execute(&mut *tx)
    .await?
    .rows_affected();

    write_version(&mut *tx, to).await?;

    tx.commit()
        .await
        .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

    info!(from, to, upserted, removed, "Refreshed hymn catalog");
    Ok(SeedOutcome::Refreshed { from, to })
}

async fn write_version<'e, E>(executor: E, version: i64) -> DbResult<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO main.catalog_meta (key, value) VALUES (?1, ?2)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(CONTENT_VERSION_KEY)
    .bind(version.to_string())
    .execute(executor)
    .await?;

    Ok(())
}

fn parse_version(value: Option<String>) -> i64 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use hymnal_core::{HymnCategory, NewHymn};
    use std::path::PathBuf;

    fn hymn(number: i64, content: &str) -> NewHymn {
        NewHymn {
            number,
            title: None,
            category: HymnCategory::Psalms,
            content: content.to_string(),
        }
    }

    async fn build_bundle(path: &Path, version: i64, hymns: &[NewHymn]) {
        let db = Database::new(DbConfig::new(path)).await.unwrap();
        db.hymns().insert_many(hymns).await.unwrap();
        stamp_content_version(db.pool(), version).await.unwrap();
        db.close().await;
        seal_bundle(path).await.unwrap();
    }

    fn paths() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let bundled = dir.path().join("bundle").join("hymnal.db");
        let target = dir.path().join("data").join("hymnal.db");
        std::fs::create_dir_all(bundled.parent().unwrap()).unwrap();
        (dir, bundled, target)
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version(None), 0);
        assert_eq!(parse_version(Some("7".to_string())), 7);
        assert_eq!(parse_version(Some("x".to_string())), 0);
    }

    #[tokio::test]
    async fn test_missing_bundle_is_an_error() {
        let (_dir, bundled, target) = paths();
        let err = install_catalog(&bundled, &target).await.unwrap_err();
        assert!(matches!(err, DbError::Io(_)));
    }

    #[tokio::test]
    async fn test_first_launch_copies() {
        let (_dir, bundled, target) = paths();
        build_bundle(&bundled, 1, &[hymn(1, "The Lord is my shepherd")]).await;

        assert_eq!(install_catalog(&bundled, &target).await.unwrap(), SeedOutcome::Copied);

        let db = Database::new(DbConfig::new(&target)).await.unwrap();
        assert_eq!(db.hymns().count().await.unwrap(), 1);
        assert_eq!(read_content_version(db.pool()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_zero_length_target_is_replaced() {
        let (_dir, bundled, target) = paths();
        build_bundle(&bundled, 1, &[hymn(1, "Praise")]).await;
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&target, b"").unwrap();

        assert_eq!(install_catalog(&bundled, &target).await.unwrap(), SeedOutcome::Copied);
    }

    #[tokio::test]
    async fn test_sealed_bundle_is_a_single_file() {
        let (_dir, bundled, _target) = paths();
        build_bundle(&bundled, 1, &[hymn(1, "Praise")]).await;

        assert!(!bundled.with_extension("db-wal").exists());
        assert!(!bundled.with_extension("db-shm").exists());

        // File format bytes 18/19 are 1 for rollback journaling, 2 for WAL.
        let header = std::fs::read(&bundled).unwrap();
        assert_eq!((header[18], header[19]), (1, 1));
    }

    #[tokio::test]
    async fn test_stale_temp_copy_is_replaced() {
        let (_dir, bundled, target) = paths();
        build_bundle(&bundled, 2, &[hymn(1, "Praise"), hymn(2, "Glory")]).await;
        let tmp = target.with_extension("db.tmp");
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&tmp, b"half a catalog").unwrap();

        assert_eq!(install_catalog(&bundled, &target).await.unwrap(), SeedOutcome::Copied);
        assert!(!tmp.exists());

        let db = Database::new(DbConfig::new(&target)).await.unwrap();
        assert_eq!(db.hymns().count().await.unwrap(), 2);
        assert_eq!(read_content_version(db.pool()).await.unwrap(), 2);
        db.close().await;
    }

    #[tokio::test]
    async fn test_failed_copy_leaves_no_target() {
        let (_dir, bundled, target) = paths();
        // A directory as the bundle: metadata succeeds, the copy fails.
        std::fs::create_dir_all(&bundled).unwrap();

        let err = install_catalog(&bundled, &target).await.unwrap_err();
        assert!(matches!(err, DbError::Io(_)));
        assert!(!target.exists());
        assert!(!target.with_extension("db.tmp").exists());
    }

    #[tokio::test]
    async fn test_same_version_is_up_to_date() {
        let (_dir, bundled, target) = paths();
        build_bundle(&bundled, 3, &[hymn(1, "Praise")]).await;

        install_catalog(&bundled, &target).await.unwrap();
        assert_eq!(install_catalog(&bundled, &target).await.unwrap(), SeedOutcome::UpToDate);
    }

    #[tokio::test]
    async fn test_newer_bundle_refreshes_and_keeps_user_rows() {
        let (_dir, bundled, target) = paths();
        build_bundle(
            &bundled,
            1,
            &[hymn(1, "Old words"), hymn(2, "Second"), hymn(3, "Dropped later")],
        )
        .await;
        install_catalog(&bundled, &target).await.unwrap();

        {
            let db = Database::new(DbConfig::new(&target)).await.unwrap();
            db.favorites().add(1).await.unwrap();
            db.favorites().add(3).await.unwrap();
            db.close().await;
        }

        // Same ids, new text for hymn 1, hymn 3 gone.
        std::fs::remove_file(&bundled).unwrap();
        build_bundle(&bundled, 2, &[hymn(1, "Revised words"), hymn(2, "Second")]).await;

        assert_eq!(
            install_catalog(&bundled, &target).await.unwrap(),
            SeedOutcome::Refreshed { from: 1, to: 2 }
        );

        let db = Database::new(DbConfig::new(&target)).await.unwrap();
        assert_eq!(db.hymns().count().await.unwrap(), 2);
        assert_eq!(read_content_version(db.pool()).await.unwrap(), 2);

        let favorites: Vec<i64> = db.favorites().hymns().await.unwrap().iter().map(|h| h.id).collect();
        assert_eq!(favorites, vec![1]);

        assert_eq!(db.hymns().search("revised").await.unwrap().len(), 1);
        assert!(db.hymns().search("old words").await.unwrap().is_empty());
        assert!(db.hymns().search("dropped").await.unwrap().is_empty());
    }
}
