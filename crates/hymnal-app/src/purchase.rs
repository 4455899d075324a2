//! # Purchase Capability
//!
//! The platform billing surface (App Store / Play Billing), seen from the
//! entitlement manager. Platform layers implement [`PurchaseProvider`];
//! builds without billing use [`NoopPurchaseProvider`].

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One purchase reported by the platform during a restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoredPurchase {
    pub product_id: String,
    pub purchased_at: DateTime<Utc>,
}

/// Result of asking the platform to restore earlier purchases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreResult {
    /// Whether the platform answered at all.
    pub success: bool,
    pub purchases: Vec<RestoredPurchase>,
}

/// Platform billing operations.
///
/// Implementations translate platform failures into `false` / an
/// unsuccessful [`RestoreResult`]; they never panic.
pub trait PurchaseProvider: Send + Sync {
    /// Whether the platform still considers the user a purchaser.
    fn check_purchased(&self) -> impl Future<Output = bool> + Send;

    /// Starts the purchase flow. `true` once the platform confirms payment.
    fn initiate_purchase(&self, product_id: &str) -> impl Future<Output = bool> + Send;

    fn restore_purchases(&self) -> impl Future<Output = RestoreResult> + Send;

    /// Opens the platform's subscription management screen.
    fn manage_subscription(&self) -> impl Future<Output = ()> + Send;
}

/// Provider for platforms without billing. Nothing is ever purchased.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPurchaseProvider;

impl PurchaseProvider for NoopPurchaseProvider {
    async fn check_purchased(&self) -> bool {
        false
    }

    async fn initiate_purchase(&self, _product_id: &str) -> bool {
        false
    }

    async fn restore_purchases(&self) -> RestoreResult {
        RestoreResult::default()
    }

    async fn manage_subscription(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_provider_never_purchases() {
        let provider = NoopPurchaseProvider;
        assert!(!provider.check_purchased().await);
        assert!(!provider.initiate_purchase("hymnal.support").await);

        let restored = provider.restore_purchases().await;
        assert!(!restored.success);
        assert!(restored.purchases.is_empty());
    }
}
