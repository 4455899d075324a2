//! # Database Handle
//!
//! Opens the SQLite file that holds both the bundled catalog and the
//! user's favorites, history and highlights, and hands out query objects
//! that share one pool and one [`ChangeTracker`].
//!
//! ```text
//!   DbConfig ──► Database::new ──► SqlitePool (WAL, foreign_keys=ON)
//!                      │                 │
//!                      │                 ├── db.hymns()      HymnQueries
//!                      │                 ├── db.favorites()  FavoriteQueries
//!                      │                 ├── db.history()    HistoryQueries
//!                      │                 └── db.highlights() HighlightQueries
//!                      │
//!                      └── migrations::run_migrations
//!
//!   db.repository() = SqlHymnalRepository over the four query objects
//! ```
//!
//! Foreign keys are switched on for every connection; the user tables
//! cascade when a hymn row is removed by a catalog refresh.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::facade::SqlHymnalRepository;
use crate::migrations;
use crate::observe::ChangeTracker;
use crate::repository::{FavoriteQueries, HighlightQueries, HistoryQueries, HymnQueries};

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// A file on disk, created on first open.
    File(PathBuf),
    /// A private in-memory database. Gone when the pool closes.
    Memory,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::File(path) => write!(f, "{}", path.display()),
            Location::Memory => f.write_str("<memory>"),
        }
    }
}

/// How to open the hymnal database.
///
/// ```rust,ignore
/// let db = Database::new(DbConfig::new(data_dir.join("hymnal.db")).max_connections(2)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub location: Location,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long to wait for a free connection before `PoolExhausted`.
    pub acquire_timeout: Duration,
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            location: Location::File(path.into()),
            max_connections: 4,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            run_migrations: true,
        }
    }

    /// In-memory database for tests. Pinned to one connection, since each
    /// SQLite memory connection would otherwise see its own empty database.
    pub fn in_memory() -> Self {
        DbConfig {
            location: Location::Memory,
            max_connections: 1,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Skip the embedded migrations. Used when opening a file that is
    /// about to be replaced, or by migration tests.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        let options = match &self.location {
            Location::File(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true),
            Location::Memory => SqliteConnectOptions::new().in_memory(true),
        };
        options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
    }
}

/// The open hymnal database.
///
/// Cloning is cheap. All clones share the pool, and a commit made through
/// any query object wakes live queries created from any other.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    changes: ChangeTracker,
}

impl Database {
    /// Opens the pool and brings the schema up to date.
    ///
    /// ## Errors
    /// * `DbError::ConnectionFailed` - the file could not be opened or created
    /// * `DbError::MigrationFailed` - the schema could not be migrated
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        debug!(location = %config.location, "Opening hymnal database");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(config.connect_options())
            .await
            .map_err(|e| DbError::ConnectionFailed(format!("{}: {}", config.location, e)))?;

        let db = Database {
            pool,
            changes: ChangeTracker::new(),
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        info!(
            location = %config.location,
            max_connections = config.max_connections,
            "Hymnal database ready"
        );
        Ok(db)
    }

    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Raw pool access for seeding and maintenance.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn changes(&self) -> &ChangeTracker {
        &self.changes
    }

    pub fn hymns(&self) -> HymnQueries {
        HymnQueries::new(self.pool.clone(), self.changes.clone())
    }

    pub fn favorites(&self) -> FavoriteQueries {
        FavoriteQueries::new(self.pool.clone(), self.changes.clone())
    }

    pub fn history(&self) -> HistoryQueries {
        HistoryQueries::new(self.pool.clone(), self.changes.clone())
    }

    pub fn highlights(&self) -> HighlightQueries {
        HighlightQueries::new(self.pool.clone(), self.changes.clone())
    }

    pub fn repository(&self) -> SqlHymnalRepository {
        SqlHymnalRepository::new(self)
    }

    /// Closes every connection. Later queries fail with `ConnectionFailed`.
    pub async fn close(&self) {
        self.pool.close().await;
        debug!("Hymnal database closed");
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT count(*) FROM hymns")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}
