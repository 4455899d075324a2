//! # hymnal-app: Runtime Context for the Hymnal
//!
//! Configuration, logging, settings persistence, entitlement and the
//! [`AppContext`] that owns them alongside the database.
//!
//! ## Module Organization
//!
//! - [`config`] - TOML + environment configuration
//! - [`logging`] - `tracing` subscriber setup
//! - [`settings`] - Typed key-value store (memory / JSON file)
//! - [`purchase`] - Platform billing capability
//! - [`entitlement`] - Trial and purchase state, persisted in settings
//! - [`usage`] - Donation prompt counters
//! - [`context`] - The wired-up application context
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use hymnal_app::{init_tracing, AppConfig, AppContext, NoopPurchaseProvider};
//! use hymnal_db::TracingReporter;
//!
//! let config = AppConfig::load_or_default(None);
//! init_tracing(&config.logging.filter);
//!
//! let ctx = AppContext::open(config, NoopPurchaseProvider, Arc::new(TracingReporter)).await?;
//! if let Some(opened) = ctx.open_hymn(42, chrono::Utc::now()).await? {
//!     println!("{}", opened.hymn.content);
//! }
//! ```

pub mod config;
pub mod context;
pub mod entitlement;
pub mod error;
pub mod logging;
pub mod purchase;
pub mod settings;
pub mod usage;

pub use config::AppConfig;
pub use context::{AppContext, AppRepository, OpenedHymn};
pub use entitlement::EntitlementManager;
pub use error::{AppError, AppResult};
pub use logging::init_tracing;
pub use purchase::{NoopPurchaseProvider, PurchaseProvider, RestoreResult, RestoredPurchase};
pub use settings::{JsonFileSettings, MemorySettings, SettingsStore};
pub use usage::UsageTracker;
