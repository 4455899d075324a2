//! # Hymn Queries
//!
//! Read access to the hymn catalog, plus the bulk insert used to build it.
//!
//! ## Full-Text Search
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How Hymn Search Works                                │
//! │                                                                         │
//! │  User types: "Abide"                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SearchQuery::parse → plan                                             │
//! │       │                                                                 │
//! │       ├── Match("abide") ──► hymns_fts MATCH (trigram, any substring)  │
//! │       │                                                                 │
//! │       └── Like(["%o%", ...]) ──► scan of number/title/category/content │
//! │                                                                         │
//! │  ┌───────────────────────────────────────────────┐                     │
//! │  │ hymns_fts (external content = hymns)          │                     │
//! │  │                                               │                     │
//! │  │  1 | Abide with me    | ancient_modern | ...  │ ← MATCH             │
//! │  │ 23 | NULL             | psalms         | ...  │                     │
//! │  └───────────────────────────────────────────────┘                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ORDER BY rank, category, number  LIMIT 200                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use hymnal_core::search::{SearchPlan, SearchQuery};
use hymnal_core::validation::validate_new_hymn;
use hymnal_core::{Hymn, HymnCategory, NewHymn, SEARCH_RESULT_LIMIT};

use crate::error::{DbError, DbResult};
use crate::observe::{ChangeTracker, Table};

/// Repository for the hymn catalog.
///
/// ## Usage
/// ```rust,ignore
/// let hymns = db.hymns();
///
/// let psalms = hymns.by_category(HymnCategory::Psalms).await?;
/// let found = hymns.search("shepherd").await?;
/// ```
#[derive(Debug, Clone)]
pub struct HymnQueries {
    pool: SqlitePool,
    changes: ChangeTracker,
}

impl HymnQueries {
    /// Creates a new HymnQueries.
    pub fn new(pool: SqlitePool, changes: ChangeTracker) -> Self {
        HymnQueries { pool, changes }
    }

    /// Inserts one hymn and returns it with its generated id.
    pub async fn insert(&self, hymn: &NewHymn) -> DbResult<Hymn> {
        validate_new_hymn(hymn)?;

        debug!(number = hymn.number, category = %hymn.category, "Inserting hymn");

        let now = Utc::now();

        let id = sqlx::query(
            r#"
            INSERT INTO hymns (number, title, category, content, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(hymn.number)
        .bind(&hymn.title)
        .bind(hymn.category)
        .bind(&hymn.content)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.changes.notify(&[Table::Hymns]);

        Ok(Hymn {
            id,
            number: hymn.number,
            title: hymn.title.clone(),
            category: hymn.category,
            content: hymn.content.clone(),
            created_at: now,
        })
    }

    /// Inserts many hymns in a single transaction.
    ///
    /// Either every hymn is inserted or none is.
    pub async fn insert_many(&self, hymns: &[NewHymn]) -> DbResult<u64> {
        for hymn in hymns {
            validate_new_hymn(hymn)?;
        }

        debug!(count = hymns.len(), "Bulk inserting hymns");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        for hymn in hymns {
            sqlx::query(
                r#"
                INSERT INTO hymns (number, title, category, content, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(hymn.number)
            .bind(&hymn.title)
            .bind(hymn.category)
            .bind(&hymn.content)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        self.changes.notify(&[Table::Hymns]);

        Ok(hymns.len() as u64)
    }

    /// All hymns, ordered by category then number.
    pub async fn all(&self) -> DbResult<Vec<Hymn>> {
        let hymns = sqlx::query_as::<_, Hymn>(
            r#"
            SELECT id, number, title, category, content, created_at
            FROM hymns
            ORDER BY category, number, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(hymns)
    }

    /// Hymns in one category, ordered by number.
    pub async fn by_category(&self, category: HymnCategory) -> DbResult<Vec<Hymn>> {
        let hymns = sqlx::query_as::<_, Hymn>(
            r#"
            SELECT id, number, title, category, content, created_at
            FROM hymns
            WHERE category = ?1
            ORDER BY number, id
            "#,
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(hymns)
    }

    /// Gets a hymn by its id.
    ///
    /// ## Returns
    /// * `Ok(Some(Hymn))` - Hymn found
    /// * `Ok(None)` - No hymn with that id
    pub async fn by_id(&self, id: i64) -> DbResult<Option<Hymn>> {
        let hymn = sqlx::query_as::<_, Hymn>(
            r#"
            SELECT id, number, title, category, content, created_at
            FROM hymns
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(hymn)
    }

    /// Gets a hymn by its number within a category.
    ///
    /// The pair is not enforced unique; the lowest id wins.
    pub async fn by_number(&self, number: i64, category: HymnCategory) -> DbResult<Option<Hymn>> {
        let hymn = sqlx::query_as::<_, Hymn>(
            r#"
            SELECT id, number, title, category, content, created_at
            FROM hymns
            WHERE number = ?1 AND category = ?2
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(number)
        .bind(category)
        .fetch_optional(&self.pool)
        .await?;

        Ok(hymn)
    }

    /// One arbitrary hymn, or `None` for an empty catalog.
    pub async fn random(&self) -> DbResult<Option<Hymn>> {
        let hymn = sqlx::query_as::<_, Hymn>(
            r#"
            SELECT id, number, title, category, content, created_at
            FROM hymns
            ORDER BY RANDOM()
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(hymn)
    }

    /// Searches number, title, category and content.
    ///
    /// Blank input returns an empty result without touching the database.
    /// User input is never interpreted as FTS5 syntax.
    pub async fn search(&self, raw: &str) -> DbResult<Vec<Hymn>> {
        let query = match SearchQuery::parse(raw) {
            Some(query) => query,
            None => return Ok(Vec::new()),
        };

        let plan = query.plan();
        debug!(query = %query.normalized(), ?plan, "Searching hymns");

        let hymns = match plan {
            SearchPlan::Match(expression) => {
                sqlx::query_as::<_, Hymn>(
                    r#"
                    SELECT h.id, h.number, h.title, h.category, h.content, h.created_at
                    FROM hymns_fts
                    INNER JOIN hymns h ON h.id = hymns_fts.rowid
                    WHERE hymns_fts MATCH ?1
                    ORDER BY rank, h.category, h.number
                    LIMIT ?2
                    "#,
                )
                .bind(expression)
                .bind(SEARCH_RESULT_LIMIT)
                .fetch_all(&self.pool)
                .await?
            }
            SearchPlan::Like(patterns) => {
                let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                    "SELECT h.id, h.number, h.title, h.category, h.content, h.created_at \
                     FROM hymns h WHERE ",
                );
                for (i, pattern) in patterns.into_iter().enumerate() {
                    if i > 0 {
                        builder.push(" AND ");
                    }
                    // Space-joined so a term (which has no spaces) can't span two columns.
                    builder.push(
                        "(h.number || ' ' || COALESCE(h.title, '') || ' ' || h.category \
                         || ' ' || h.content) LIKE ",
                    );
                    builder.push_bind(pattern);
                    builder.push(" ESCAPE '\\'");
                }
                builder.push(" ORDER BY h.category, h.number LIMIT ");
                builder.push_bind(SEARCH_RESULT_LIMIT);

                builder
                    .build_query_as::<Hymn>()
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        debug!(count = hymns.len(), "Search returned hymns");
        Ok(hymns)
    }

    /// Number of hymns in the catalog.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM hymns")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Hymn count per category, for categories that have any.
    pub async fn count_by_category(&self) -> DbResult<Vec<(HymnCategory, i64)>> {
        let counts = sqlx::query_as::<_, (HymnCategory, i64)>(
            r#"
            SELECT category, COUNT(*)
            FROM hymns
            GROUP BY category
            ORDER BY category
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
