//! # App Configuration
//!
//! Configuration for storage, entitlement, usage prompts and logging.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     HYMNAL_DB_PATH=/data/hymnal.db                                     │
//! │     HYMNAL_ENTITLEMENT_MODEL=purchase_only                             │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/hymnal/hymnal.toml (Linux)                               │
//! │     ~/Library/Application Support/org.hymnal.hymnal/hymnal.toml (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     Trial model, 30 days, thresholds 10/25/50/100/200 capped at 400    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # hymnal.toml
//! [storage]
//! database_path = "/data/hymnal.db"
//! seed_path = "/app/assets/hymnal.db"
//! settings_path = "/data/settings.json"
//! max_connections = 4
//!
//! [entitlement]
//! model = "trial"          # trial | purchase_only
//! trial_days = 30
//! one_time_products = ["hymnal.support.lifetime"]
//! subscription_products = ["hymnal.support.yearly"]
//!
//! [usage]
//! prompt_thresholds = [10, 25, 50, 100, 200]
//! prompt_cap = 400
//!
//! [logging]
//! filter = "info,hymnal=debug,sqlx=warn"
//! ```

use std::path::PathBuf;

use hymnal_core::usage::{PromptSchedule, DEFAULT_PROMPT_CAP, DEFAULT_PROMPT_THRESHOLDS};
use hymnal_core::validation::validate_product_id;
use hymnal_core::{EntitlementModel, PurchaseType, DEFAULT_TRIAL_DAYS};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};

/// Name of the config file inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "hymnal.toml";

/// Default settings file name.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

// =============================================================================
// Storage Settings
// =============================================================================

/// Where the database lives and where the bundled catalog comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Database file. `None` uses the platform data directory.
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Bundled catalog database shipped with the app.
    /// When unset the database is opened as-is.
    #[serde(default)]
    pub seed_path: Option<PathBuf>,

    /// Settings JSON file. `None` puts `settings.json` next to the database.
    #[serde(default)]
    pub settings_path: Option<PathBuf>,

    /// Pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    4
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            database_path: None,
            seed_path: None,
            settings_path: None,
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Entitlement Settings
// =============================================================================

/// Which entitlement model is in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Free trial, then paywall.
    #[default]
    Trial,

    /// No trial, access only with a purchase.
    PurchaseOnly,
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelKind::Trial => write!(f, "trial"),
            ModelKind::PurchaseOnly => write!(f, "purchase_only"),
        }
    }
}

impl std::str::FromStr for ModelKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trial" => Ok(ModelKind::Trial),
            "purchase_only" | "freemium" => Ok(ModelKind::PurchaseOnly),
            other => Err(AppError::InvalidConfig(format!(
                "Unknown entitlement model: '{}'. Valid options: trial, purchase_only",
                other
            ))),
        }
    }
}

/// Entitlement model and store product catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitlementSettings {
    #[serde(default)]
    pub model: ModelKind,

    /// Trial length. Ignored by the purchase-only model.
    #[serde(default = "default_trial_days")]
    pub trial_days: i64,

    /// Lifetime / donation products.
    #[serde(default)]
    pub one_time_products: Vec<String>,

    /// Auto-renewing products.
    #[serde(default)]
    pub subscription_products: Vec<String>,
}

fn default_trial_days() -> i64 {
    DEFAULT_TRIAL_DAYS
}

impl Default for EntitlementSettings {
    fn default() -> Self {
        EntitlementSettings {
            model: ModelKind::default(),
            trial_days: default_trial_days(),
            one_time_products: Vec::new(),
            subscription_products: Vec::new(),
        }
    }
}

impl EntitlementSettings {
    /// The model used by the entitlement state machine.
    pub fn model(&self) -> EntitlementModel {
        match self.model {
            ModelKind::Trial => EntitlementModel::Trial {
                trial_days: self.trial_days,
            },
            ModelKind::PurchaseOnly => EntitlementModel::PurchaseOnly,
        }
    }

    /// Purchase type of a product. Only configured subscription ids renew.
    pub fn purchase_type_of(&self, product_id: &str) -> PurchaseType {
        if self.subscription_products.iter().any(|p| p == product_id) {
            PurchaseType::Subscription
        } else {
            PurchaseType::OneTime
        }
    }
}

// =============================================================================
// Usage Settings
// =============================================================================

/// Donation prompt schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSettings {
    #[serde(default = "default_prompt_thresholds")]
    pub prompt_thresholds: Vec<i64>,

    #[serde(default = "default_prompt_cap")]
    pub prompt_cap: i64,
}

fn default_prompt_thresholds() -> Vec<i64> {
    DEFAULT_PROMPT_THRESHOLDS.to_vec()
}

fn default_prompt_cap() -> i64 {
    DEFAULT_PROMPT_CAP
}

impl Default for UsageSettings {
    fn default() -> Self {
        UsageSettings {
            prompt_thresholds: default_prompt_thresholds(),
            prompt_cap: default_prompt_cap(),
        }
    }
}

impl UsageSettings {
    pub fn schedule(&self) -> PromptSchedule {
        PromptSchedule::new(self.prompt_thresholds.clone(), self.prompt_cap)
    }
}

// =============================================================================
// Logging Settings
// =============================================================================

/// Default `EnvFilter` directive.
pub const DEFAULT_LOG_FILTER: &str = "info,hymnal=debug,sqlx=warn";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive. `RUST_LOG` still wins when set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete app configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub entitlement: EntitlementSettings,

    #[serde(default)]
    pub usage: UsageSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (hymnal.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| AppError::ConfigLoadFailed(e.to_string()))?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> AppResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| AppError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| AppError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> AppResult<()> {
        if self.storage.max_connections == 0 {
            return Err(AppError::InvalidConfig(
                "max_connections must be greater than 0".into(),
            ));
        }

        if self.entitlement.model == ModelKind::Trial && self.entitlement.trial_days <= 0 {
            return Err(AppError::InvalidConfig(
                "trial_days must be greater than 0".into(),
            ));
        }

        for product in self
            .entitlement
            .one_time_products
            .iter()
            .chain(&self.entitlement.subscription_products)
        {
            validate_product_id(product)?;
        }

        if let Some(both) = self
            .entitlement
            .one_time_products
            .iter()
            .find(|p| self.entitlement.subscription_products.contains(p))
        {
            return Err(AppError::InvalidConfig(format!(
                "Product '{}' is listed as both one-time and subscription",
                both
            )));
        }

        if self.usage.prompt_cap <= 0 {
            return Err(AppError::InvalidConfig(
                "prompt_cap must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("HYMNAL_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.storage.database_path = Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("HYMNAL_SEED_PATH") {
            debug!(path = %path, "Overriding seed path from environment");
            self.storage.seed_path = Some(PathBuf::from(path));
        }

        if let Ok(model) = std::env::var("HYMNAL_ENTITLEMENT_MODEL") {
            match model.parse() {
                Ok(parsed) => {
                    debug!(model = %model, "Overriding entitlement model from environment");
                    self.entitlement.model = parsed;
                }
                Err(_) => warn!(model = %model, "Unknown entitlement model in environment"),
            }
        }

        if let Ok(days) = std::env::var("HYMNAL_TRIAL_DAYS") {
            if let Ok(d) = days.parse::<i64>() {
                self.entitlement.trial_days = d;
            }
        }

        if let Ok(filter) = std::env::var("HYMNAL_LOG") {
            self.logging.filter = filter;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Database path, falling back to the platform data directory.
    pub fn database_path(&self) -> AppResult<PathBuf> {
        if let Some(path) = &self.storage.database_path {
            return Ok(path.clone());
        }

        project_dirs()
            .map(|dirs| dirs.data_dir().join("hymnal.db"))
            .ok_or_else(|| AppError::InvalidConfig("Could not determine app data directory".into()))
    }

    /// Settings file path, defaulting to `settings.json` beside the database.
    pub fn settings_path(&self) -> AppResult<PathBuf> {
        if let Some(path) = &self.storage.settings_path {
            return Ok(path.clone());
        }

        Ok(self.database_path()?.with_file_name(SETTINGS_FILE_NAME))
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("org", "hymnal", "hymnal")
}
