//! # Entitlement Manager
//!
//! Persists the trial anchor and purchase record in the settings store and
//! evaluates them with the pure state machine in `hymnal_core::entitlement`.
//!
//! ## Flows
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      EntitlementManager                                 │
//! │                                                                         │
//! │  first launch ── ensure_trial_started ──► TRIAL_STARTED_AT (Trial only)│
//! │                                                                         │
//! │  purchase(id) ── provider.initiate_purchase ── true ──► record_purchase│
//! │                                                                         │
//! │  restore ─────── provider.restore_purchases ─ success ─► record best   │
//! │                                                  (one-time wins, then  │
//! │                                                   most recent)         │
//! │                                                                         │
//! │  verify ──────── subscription recorded? ── provider.check_purchased    │
//! │                      │                           │                     │
//! │                      NO → nothing               false → clear_purchase │
//! │                  (one-time never revoked)     (supporter flag stays)   │
//! │                                                                         │
//! │  status(now) ─── snapshot from settings ──► evaluate(model, .., now)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use hymnal_core::entitlement::{EntitlementSnapshot, PurchaseRecord};
use hymnal_core::validation::validate_product_id;
use hymnal_core::{EntitlementModel, EntitlementState, EntitlementStatus, PurchaseType};
use tracing::{debug, info, warn};

use crate::config::EntitlementSettings;
use crate::error::AppResult;
use crate::purchase::{PurchaseProvider, RestoreResult};
use crate::settings::{keys, SettingsStore};

/// Entitlement state backed by the settings store and a billing provider.
pub struct EntitlementManager<P> {
    settings: Arc<dyn SettingsStore>,
    provider: P,
    products: EntitlementSettings,
}

impl<P: PurchaseProvider> EntitlementManager<P> {
    pub fn new(settings: Arc<dyn SettingsStore>, provider: P, products: EntitlementSettings) -> Self {
        EntitlementManager {
            settings,
            provider,
            products,
        }
    }

    /// The model in force for this manager's lifetime.
    pub fn model(&self) -> EntitlementModel {
        self.products.model()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Anchors the trial at `now` unless it already is anchored.
    ///
    /// Returns `true` if the anchor was written by this call. The
    /// purchase-only model has no trial and never writes one.
    pub fn ensure_trial_started(&self, now: DateTime<Utc>) -> AppResult<bool> {
        if !matches!(self.model(), EntitlementModel::Trial { .. })
            || self.settings.get_timestamp(keys::TRIAL_STARTED_AT).is_some()
        {
            return Ok(false);
        }

        self.settings.set_timestamp(keys::TRIAL_STARTED_AT, now)?;
        info!(started_at = %now, "Trial started");
        Ok(true)
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    /// Reads everything evaluation needs from the settings store.
    pub fn snapshot(&self) -> EntitlementSnapshot {
        EntitlementSnapshot {
            trial_started_at: self.settings.get_timestamp(keys::TRIAL_STARTED_AT),
            purchase: self.purchase_record(),
        }
    }

    fn purchase_record(&self) -> Option<PurchaseRecord> {
        if !self.settings.get_bool(keys::IS_PURCHASED, false) {
            return None;
        }

        let product_id = self.settings.get_string(keys::PURCHASE_PRODUCT_ID, "");
        let purchase_type = self
            .settings
            .get_string(keys::PURCHASE_TYPE, "")
            .parse()
            .unwrap_or_else(|_| {
                warn!(product_id = %product_id, "Unreadable purchase type, using product catalog");
                self.products.purchase_type_of(&product_id)
            });

        Some(PurchaseRecord {
            product_id,
            purchase_type,
            purchased_at: self.settings.get_timestamp(keys::PURCHASED_AT),
            expires_at: self.settings.get_timestamp(keys::PURCHASE_EXPIRES_AT),
        })
    }

    pub fn status(&self, now: DateTime<Utc>) -> EntitlementStatus {
        EntitlementStatus::compute(self.model(), &self.snapshot(), now)
    }

    pub fn state(&self, now: DateTime<Utc>) -> EntitlementState {
        self.status(now).state
    }

    pub fn has_access(&self, now: DateTime<Utc>) -> bool {
        self.state(now).has_access()
    }

    pub fn needs_paywall(&self, now: DateTime<Utc>) -> bool {
        self.state(now).needs_paywall()
    }

    pub fn trial_days_remaining(&self, now: DateTime<Utc>) -> i64 {
        self.status(now).trial_days_remaining
    }

    /// Whether a purchase was ever recorded on this device. Survives a
    /// lapsed subscription being cleared.
    pub fn is_supporter(&self) -> bool {
        self.settings.get_bool(keys::HAS_EVER_PURCHASED, false)
            || self.settings.get_bool(keys::IS_PURCHASED, false)
    }

    // =========================================================================
    // Platform Flows
    // =========================================================================

    /// Runs the platform purchase flow for `product_id` and records the
    /// purchase if the platform confirms it.
    pub async fn purchase(&self, product_id: &str, now: DateTime<Utc>) -> AppResult<bool> {
        validate_product_id(product_id)?;

        if !self.provider.initiate_purchase(product_id).await {
            info!(product_id, "Purchase not completed");
            return Ok(false);
        }

        self.record_purchase(&self.record_for(product_id, now))?;
        Ok(true)
    }

    /// Asks the platform for earlier purchases and records the best one.
    ///
    /// A one-time purchase is preferred over subscriptions, then the most
    /// recent. An unsuccessful or empty restore leaves the store unchanged.
    pub async fn restore_purchases(&self, now: DateTime<Utc>) -> AppResult<RestoreResult> {
        let result = self.provider.restore_purchases().await;

        if !result.success {
            warn!("Restore purchases failed on the platform side");
            return Ok(result);
        }

        let best = result.purchases.iter().max_by_key(|p| {
            (
                self.products.purchase_type_of(&p.product_id) == PurchaseType::OneTime,
                p.purchased_at,
            )
        });

        match best {
            Some(restored) => {
                let record = self.record_for(&restored.product_id, restored.purchased_at);
                self.record_purchase(&record)?;
                info!(
                    product_id = %restored.product_id,
                    restored = result.purchases.len(),
                    "Purchases restored"
                );
            }
            None => debug!(at = %now, "No purchases to restore"),
        }

        Ok(result)
    }

    /// Re-checks a recorded subscription with the platform and clears it if
    /// the platform no longer reports it. One-time purchases are never
    /// revoked here.
    pub async fn verify_purchases(&self, now: DateTime<Utc>) -> AppResult<EntitlementState> {
        let is_subscription = matches!(
            self.purchase_record(),
            Some(PurchaseRecord {
                purchase_type: PurchaseType::Subscription,
                ..
            })
        );

        if is_subscription && !self.provider.check_purchased().await {
            info!("Subscription no longer active on the platform");
            self.clear_purchase()?;
        }

        Ok(self.state(now))
    }

    pub async fn manage_subscription(&self) {
        self.provider.manage_subscription().await;
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    fn record_for(&self, product_id: &str, purchased_at: DateTime<Utc>) -> PurchaseRecord {
        PurchaseRecord {
            product_id: product_id.to_string(),
            purchase_type: self.products.purchase_type_of(product_id),
            purchased_at: Some(purchased_at),
            // Renewal is tracked by the platform.
            expires_at: None,
        }
    }

    /// Stores `record` as the current purchase.
    pub fn record_purchase(&self, record: &PurchaseRecord) -> AppResult<()> {
        self.settings
            .set_string(keys::PURCHASE_PRODUCT_ID, &record.product_id)?;
        self.settings
            .set_string(keys::PURCHASE_TYPE, record.purchase_type.as_str())?;

        match record.purchased_at {
            Some(at) => self.settings.set_timestamp(keys::PURCHASED_AT, at)?,
            None => self.settings.remove(keys::PURCHASED_AT)?,
        }
        match record.expires_at {
            Some(at) => self.settings.set_timestamp(keys::PURCHASE_EXPIRES_AT, at)?,
            None => self.settings.remove(keys::PURCHASE_EXPIRES_AT)?,
        }

        // Flags last, so a partial write never reads as purchased.
        self.settings.set_bool(keys::IS_PURCHASED, true)?;
        self.settings.set_bool(keys::HAS_EVER_PURCHASED, true)?;

        info!(
            product_id = %record.product_id,
            purchase_type = %record.purchase_type,
            "Purchase recorded"
        );
        Ok(())
    }

    /// Forgets the current purchase. The trial anchor and the supporter
    /// flag are kept.
    pub fn clear_purchase(&self) -> AppResult<()> {
        self.settings.set_bool(keys::IS_PURCHASED, false)?;
        for key in [
            keys::PURCHASE_PRODUCT_ID,
            keys::PURCHASE_TYPE,
            keys::PURCHASED_AT,
            keys::PURCHASE_EXPIRES_AT,
        ] {
            self.settings.remove(key)?;
        }

        info!("Purchase cleared");
        Ok(())
    }
}
