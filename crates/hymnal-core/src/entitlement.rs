//! # Entitlement State Machine
//!
//! Computes the user's access state from persisted timestamps and purchase
//! flags. Nothing here is stored: the state is derived on every call.
//!
//! ## States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Entitlement Evaluation (Trial model)                 │
//! │                                                                         │
//! │  purchase recorded?                                                    │
//! │   ├── YES, OneTime ───────────────────────────────► SUBSCRIBED         │
//! │   │        (expiration ignored, never expires)                         │
//! │   ├── YES, Subscription                                                │
//! │   │     ├── no expiration stored ─────────────────► SUBSCRIBED         │
//! │   │     ├── now ≤ expires_at ─────────────────────► SUBSCRIBED         │
//! │   │     └── now > expires_at ─────────────────────► SUBSCRIPTION_EXPIRED│
//! │   └── NO                                                               │
//! │         ├── no trial anchor ──────────────────────► NONE               │
//! │         ├── elapsed days < trial_days ────────────► TRIAL              │
//! │         └── elapsed days ≥ trial_days ────────────► TRIAL_EXPIRED      │
//! │                                                                         │
//! │  PurchaseOnly model: purchase rules as above, otherwise NONE.          │
//! │                                                                         │
//! │  has_access    = TRIAL | SUBSCRIBED                                    │
//! │  needs_paywall = TRIAL_EXPIRED | SUBSCRIPTION_EXPIRED | NONE           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::DEFAULT_TRIAL_DAYS;

// =============================================================================
// State
// =============================================================================

/// Computed access state of the local user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntitlementState {
    Trial,
    Subscribed,
    TrialExpired,
    SubscriptionExpired,
    None,
}

impl EntitlementState {
    /// Whether premium features are unlocked.
    #[inline]
    pub const fn has_access(&self) -> bool {
        matches!(self, EntitlementState::Trial | EntitlementState::Subscribed)
    }

    /// Whether the paywall should be shown.
    #[inline]
    pub const fn needs_paywall(&self) -> bool {
        !self.has_access()
    }
}

// =============================================================================
// Purchases
// =============================================================================

/// Kind of store product that was bought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseType {
    /// Lifetime unlock / donation. Never expires.
    OneTime,
    /// Auto-renewing subscription managed by the platform.
    Subscription,
}

impl PurchaseType {
    /// String used in the settings store.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PurchaseType::OneTime => "one_time",
            PurchaseType::Subscription => "subscription",
        }
    }
}

impl fmt::Display for PurchaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "one_time" | "onetime" | "lifetime" => Ok(PurchaseType::OneTime),
            "subscription" | "renewable" => Ok(PurchaseType::Subscription),
            other => Err(CoreError::UnknownPurchaseType(other.to_string())),
        }
    }
}

/// A purchase recorded on this device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub product_id: String,
    pub purchase_type: PurchaseType,
    pub purchased_at: Option<DateTime<Utc>>,
    /// Only meaningful for subscriptions. `None` means the platform manages renewal.
    pub expires_at: Option<DateTime<Utc>>,
}

impl PurchaseRecord {
    /// Whether this purchase grants access at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.purchase_type {
            // One-time purchases never expire, whatever expires_at says.
            PurchaseType::OneTime => true,
            PurchaseType::Subscription => match self.expires_at {
                Some(expires_at) => now <= expires_at,
                None => true,
            },
        }
    }
}

/// Everything evaluation needs, as read from the settings store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementSnapshot {
    /// Trial anchor, set on first launch.
    pub trial_started_at: Option<DateTime<Utc>>,
    /// Recorded purchase, if any.
    pub purchase: Option<PurchaseRecord>,
}

// =============================================================================
// Model
// =============================================================================

/// Which entitlement rules apply.
///
/// Chosen once at startup and used for the lifetime of the app context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum EntitlementModel {
    /// Free trial, then paywall unless purchased.
    Trial { trial_days: i64 },
    /// No trial: access only with a recorded purchase.
    PurchaseOnly,
}

impl Default for EntitlementModel {
    fn default() -> Self {
        EntitlementModel::Trial {
            trial_days: DEFAULT_TRIAL_DAYS,
        }
    }
}

impl FromStr for EntitlementModel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trial" => Ok(EntitlementModel::default()),
            "purchase_only" | "freemium" => Ok(EntitlementModel::PurchaseOnly),
            other => Err(CoreError::UnknownEntitlementModel(other.to_string())),
        }
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Computes the entitlement state at `now`.
pub fn evaluate(
    model: EntitlementModel,
    snapshot: &EntitlementSnapshot,
    now: DateTime<Utc>,
) -> EntitlementState {
    if let Some(purchase) = &snapshot.purchase {
        return if purchase.is_active(now) {
            EntitlementState::Subscribed
        } else {
            EntitlementState::SubscriptionExpired
        };
    }

    match model {
        EntitlementModel::PurchaseOnly => EntitlementState::None,
        EntitlementModel::Trial { trial_days } => match snapshot.trial_started_at {
            None => EntitlementState::None,
            Some(started) if elapsed_days(started, now) < trial_days => EntitlementState::Trial,
            Some(_) => EntitlementState::TrialExpired,
        },
    }
}

/// Days left in the trial, clamped at zero.
///
/// Zero for the PurchaseOnly model and when no trial has started.
pub fn trial_days_remaining(
    model: EntitlementModel,
    snapshot: &EntitlementSnapshot,
    now: DateTime<Utc>,
) -> i64 {
    match (model, snapshot.trial_started_at) {
        (EntitlementModel::Trial { trial_days }, Some(started)) => {
            (trial_days - elapsed_days(started, now)).max(0)
        }
        _ => 0,
    }
}

/// Whole days between the anchor and `now`. Clock skew backwards counts as zero.
fn elapsed_days(started: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - started).num_days().max(0)
}

/// Summary handed to the paywall / settings screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementStatus {
    pub state: EntitlementState,
    pub has_access: bool,
    pub needs_paywall: bool,
    pub trial_days_remaining: i64,
    pub purchase: Option<PurchaseRecord>,
}

impl EntitlementStatus {
    /// Evaluates a snapshot into a full status.
    pub fn compute(
        model: EntitlementModel,
        snapshot: &EntitlementSnapshot,
        now: DateTime<Utc>,
    ) -> Self {
        let state = evaluate(model, snapshot, now);
        EntitlementStatus {
            state,
            has_access: state.has_access(),
            needs_paywall: state.needs_paywall(),
            trial_days_remaining: trial_days_remaining(model, snapshot, now),
            purchase: snapshot.purchase.clone(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
