//! # Application Context
//!
//! Owns every long-lived service. Built once at startup and passed by
//! reference to whatever needs it; there are no process-wide statics.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       AppContext::open                                  │
//! │                                                                         │
//! │  1. Install / refresh catalog ─────────────────────────────────────────►│
//! │     • only when [storage] seed_path is set                             │
//! │     • copies on first launch, refreshes on newer content version       │
//! │                                                                         │
//! │  2. Open database ─────────────────────────────────────────────────────►│
//! │     • pool + embedded migrations                                       │
//! │     • SafeHymnalRepository with the given diagnostics reporter         │
//! │                                                                         │
//! │  3. Open settings ─────────────────────────────────────────────────────►│
//! │     • JsonFileSettings at [storage] settings_path                      │
//! │                                                                         │
//! │  4. Entitlement + usage ───────────────────────────────────────────────►│
//! │     • model fixed from [entitlement] for the context's lifetime        │
//! │     • ensure_trial_started(now)                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use hymnal_core::Hymn;
use hymnal_db::{
    install_catalog, Database, DbConfig, DiagnosticsReporter, SafeHymnalRepository,
    SqlHymnalRepository,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::entitlement::EntitlementManager;
use crate::error::AppResult;
use crate::purchase::PurchaseProvider;
use crate::settings::{JsonFileSettings, SettingsStore};
use crate::usage::UsageTracker;

/// Repository type the UI talks to.
pub type AppRepository = SafeHymnalRepository<SqlHymnalRepository>;

/// Everything the reader screen needs after opening a hymn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenedHymn {
    pub hymn: Hymn,
    pub is_favorite: bool,
    pub has_access: bool,
    pub show_donation_prompt: bool,
}

/// The app's services, wired together.
pub struct AppContext<P> {
    config: AppConfig,
    db: Database,
    repository: AppRepository,
    settings: Arc<dyn SettingsStore>,
    entitlement: EntitlementManager<P>,
    usage: UsageTracker,
}

impl<P: PurchaseProvider> AppContext<P> {
    /// Opens storage and settings from `config` and builds the context.
    ///
    /// ## Errors
    /// * the catalog install, database open or settings open failed
    pub async fn open(
        config: AppConfig,
        purchases: P,
        reporter: Arc<dyn DiagnosticsReporter>,
    ) -> AppResult<Self> {
        let db_path = config.database_path()?;

        if let Some(seed) = &config.storage.seed_path {
            let outcome = install_catalog(seed, &db_path).await?;
            info!(?outcome, "Hymn catalog ready");
        }

        let db = Database::new(
            DbConfig::new(&db_path).max_connections(config.storage.max_connections),
        )
        .await?;
        info!(path = %db_path.display(), "Database opened");

        let settings_path = config.settings_path()?;
        let settings: Arc<dyn SettingsStore> = Arc::new(JsonFileSettings::open(&settings_path)?);
        debug!(path = %settings_path.display(), "Settings opened");

        Self::from_parts(config, db, settings, purchases, reporter, Utc::now())
    }

    /// Builds the context over an already opened database and settings
    /// store. Anchors the trial at `now` if needed.
    pub fn from_parts(
        config: AppConfig,
        db: Database,
        settings: Arc<dyn SettingsStore>,
        purchases: P,
        reporter: Arc<dyn DiagnosticsReporter>,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let repository = SafeHymnalRepository::with_reporter(db.repository(), reporter);
        let entitlement =
            EntitlementManager::new(settings.clone(), purchases, config.entitlement.clone());
        let usage = UsageTracker::new(settings.clone(), config.usage.schedule());

        entitlement.ensure_trial_started(now)?;
        info!(model = %config.entitlement.model, "Entitlement model selected");

        Ok(AppContext {
            config,
            db,
            repository,
            settings,
            entitlement,
            usage,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn repository(&self) -> &AppRepository {
        &self.repository
    }

    pub fn settings(&self) -> &dyn SettingsStore {
        self.settings.as_ref()
    }

    pub fn entitlement(&self) -> &EntitlementManager<P> {
        &self.entitlement
    }

    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    // =========================================================================
    // Composite Operations
    // =========================================================================

    /// Opens a hymn for reading: looks it up, records the view in history
    /// and counts one read.
    ///
    /// Returns `Ok(None)` if the hymn does not exist (or the lookup failed
    /// and was reported). A failed history write is returned as an error.
    pub async fn open_hymn(&self, id: i64, now: DateTime<Utc>) -> AppResult<Option<OpenedHymn>> {
        let Some(hymn) = self.repository.hymn_by_id(id).await else {
            debug!(hymn_id = id, "Hymn not available");
            return Ok(None);
        };

        self.repository.add_to_history(id).await?;
        self.usage.record_hymn_read()?;

        Ok(Some(OpenedHymn {
            is_favorite: self.repository.is_favorite(id).await,
            has_access: self.entitlement.has_access(now),
            show_donation_prompt: self.should_show_donation_prompt(),
            hymn,
        }))
    }

    /// Whether the donation prompt is due. Any recorded purchase makes the
    /// user a supporter, who is never prompted.
    pub fn should_show_donation_prompt(&self) -> bool {
        self.usage
            .should_show_donation_prompt(self.entitlement.is_supporter())
    }

    /// Closes the database pool.
    pub async fn close(&self) {
        self.db.close().await;
        info!("App context closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelKind;
    use crate::purchase::NoopPurchaseProvider;
    use crate::settings::{keys, MemorySettings};
    use chrono::Duration;
    use futures_util::StreamExt;
    use hymnal_core::{EntitlementState, HymnCategory, NewHymn};
    use hymnal_db::TracingReporter;

    async fn context(config: AppConfig, now: DateTime<Utc>) -> AppContext<NoopPurchaseProvider> {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        AppContext::from_parts(
            config,
            db,
            Arc::new(MemorySettings::new()),
            NoopPurchaseProvider,
            Arc::new(TracingReporter),
            now,
        )
        .unwrap()
    }

    async fn add_hymn(ctx: &AppContext<NoopPurchaseProvider>, number: i64) -> Hymn {
        ctx.database()
            .hymns()
            .insert(&NewHymn {
                number,
                title: Some(format!("Hymn {}", number)),
                category: HymnCategory::AncientModern,
                content: "Praise to the Holiest in the height".to_string(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_starts_trial() {
        let now = Utc::now();
        let ctx = context(AppConfig::default(), now).await;

        assert!(ctx.settings().contains(keys::TRIAL_STARTED_AT));
        assert_eq!(ctx.entitlement().state(now), EntitlementState::Trial);
        assert_eq!(
            ctx.entitlement().state(now + Duration::days(31)),
            EntitlementState::TrialExpired
        );
    }

    #[tokio::test]
    async fn test_purchase_only_config_has_no_trial() {
        let mut config = AppConfig::default();
        config.entitlement.model = ModelKind::PurchaseOnly;
        let now = Utc::now();
        let ctx = context(config, now).await;

        assert!(!ctx.settings().contains(keys::TRIAL_STARTED_AT));
        assert!(ctx.entitlement().needs_paywall(now));
    }

    #[tokio::test]
    async fn test_open_hymn_records_history_and_read() {
        let now = Utc::now();
        let ctx = context(AppConfig::default(), now).await;
        let hymn = add_hymn(&ctx, 1).await;

        let opened = ctx.open_hymn(hymn.id, now).await.unwrap().unwrap();
        assert_eq!(opened.hymn, hymn);
        assert!(!opened.is_favorite);
        assert!(opened.has_access);
        assert!(!opened.show_donation_prompt);

        assert_eq!(ctx.usage().counters().hymns_read, 1);
        let recent = ctx.repository().recent_hymns(20).next().await.unwrap();
        assert_eq!(recent, vec![hymn]);
    }

    #[tokio::test]
    async fn test_open_missing_hymn_counts_nothing() {
        let now = Utc::now();
        let ctx = context(AppConfig::default(), now).await;

        assert!(ctx.open_hymn(404, now).await.unwrap().is_none());
        assert_eq!(ctx.usage().counters().hymns_read, 0);
    }

    #[tokio::test]
    async fn test_donation_prompt_due_after_ten_reads_unless_supporter() {
        let now = Utc::now();
        let ctx = context(AppConfig::default(), now).await;
        let hymn = add_hymn(&ctx, 7).await;

        let mut last = None;
        for _ in 0..10 {
            last = ctx.open_hymn(hymn.id, now).await.unwrap();
        }
        assert!(last.unwrap().show_donation_prompt);
        assert!(ctx.should_show_donation_prompt());

        ctx.settings().set_bool(keys::IS_PURCHASED, true).unwrap();
        assert!(!ctx.should_show_donation_prompt());
    }

    #[tokio::test]
    async fn test_lapsed_subscriber_is_never_prompted() {
        let now = Utc::now();
        let ctx = context(AppConfig::default(), now).await;
        let hymn = add_hymn(&ctx, 12).await;

        ctx.entitlement()
            .record_purchase(&hymnal_core::entitlement::PurchaseRecord {
                product_id: "hymnal.yearly".to_string(),
                purchase_type: hymnal_core::PurchaseType::Subscription,
                purchased_at: Some(now),
                expires_at: None,
            })
            .unwrap();
        // The no-op provider reports nothing purchased, so verify clears it.
        ctx.entitlement().verify_purchases(now).await.unwrap();
        assert!(ctx.entitlement().snapshot().purchase.is_none());

        for _ in 0..10 {
            let opened = ctx.open_hymn(hymn.id, now).await.unwrap().unwrap();
            assert!(!opened.show_donation_prompt);
        }
        assert_eq!(ctx.usage().counters().hymns_read, 10);
        assert!(!ctx.should_show_donation_prompt());
    }

    #[tokio::test]
    async fn test_open_from_config_with_seed() {
        let dir = tempfile::tempdir().unwrap();
        let seed = dir.path().join("bundle.db");
        {
            let db = Database::new(DbConfig::new(&seed)).await.unwrap();
            db.hymns()
                .insert(&NewHymn {
                    number: 23,
                    title: None,
                    category: HymnCategory::Psalms,
                    content: "The Lord is my shepherd".to_string(),
                })
                .await
                .unwrap();
            hymnal_db::seed::stamp_content_version(db.pool(), 1).await.unwrap();
            db.close().await;
            hymnal_db::seed::seal_bundle(&seed).await.unwrap();
        }

        let mut config = AppConfig::default();
        config.storage.database_path = Some(dir.path().join("data").join("hymnal.db"));
        config.storage.seed_path = Some(seed);

        let ctx = AppContext::open(config, NoopPurchaseProvider, Arc::new(TracingReporter))
            .await
            .unwrap();

        let found = ctx.repository().search_hymns("shepherd").next().await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(dir.path().join("data").join("settings.json").exists());
        ctx.close().await;
    }
}
