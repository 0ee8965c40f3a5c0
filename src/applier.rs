//! Benefit application.
//!
//! The applier is the single place promotion fields are mutated. Both intake
//! paths converge here once a transaction is approved, so the grant logic is
//! keyed by outcome, not by path.
//!
//! Feature-listing windows stack: buying while a window is still live extends
//! it from its current end, never from `now` alone. A revoked window (flag and
//! expiry cleared together) contributes nothing to the extension base, so
//! revocation is never undone by a later purchase.

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::packages::Packages;
use crate::storage::{PromotionState, PromotionStore};
use crate::transaction::{BenefitKind, Transaction, TransactionStatus};

/// Compute the end of a new window granted at `now` on top of `current`.
///
/// The base is the current expiry while the window is still live, otherwise
/// `now`; the purchased duration is added on top.
#[must_use]
pub fn extended_expiry(current: &PromotionState, now: u64, duration_secs: u64) -> u64 {
    let base = match current.expires_at {
        Some(expires_at) if current.flagged && expires_at > now => expires_at,
        _ => now,
    };
    base + duration_secs
}

/// Applies the benefit purchased by an approved transaction to its target.
pub struct BenefitApplier<P: PromotionStore> {
    promotions: P,
}

impl<P: PromotionStore> BenefitApplier<P> {
    /// Create a new benefit applier.
    #[must_use]
    pub fn new(promotions: P) -> Self {
        Self { promotions }
    }

    /// Apply the transaction's benefit and return the new promotion window.
    ///
    /// Only approved transactions carry a grant; callers invoke this inside
    /// the same operation that flips the status, and roll the flip back if
    /// this fails.
    pub async fn apply(
        &self,
        transaction: &Transaction,
        packages: &Packages,
        config: &LedgerConfig,
        now: u64,
    ) -> Result<PromotionState> {
        if transaction.status != TransactionStatus::Approved {
            return Err(LedgerError::internal(format!(
                "benefit requested for {} transaction '{}'",
                transaction.status, transaction.id
            )));
        }

        match transaction.benefit {
            BenefitKind::FeatureListing => {
                self.apply_feature_listing(transaction, packages, now).await
            }
            BenefitKind::Subscription => self.apply_subscription(transaction, config, now).await,
        }
    }

    async fn apply_feature_listing(
        &self,
        transaction: &Transaction,
        packages: &Packages,
        now: u64,
    ) -> Result<PromotionState> {
        let package_id = transaction
            .package_id
            .as_deref()
            .ok_or_else(|| LedgerError::validation("feature_listing transaction has no package"))?;
        let listing_id = transaction
            .target_listing_id
            .as_deref()
            .ok_or_else(|| LedgerError::validation("feature_listing transaction has no target"))?;

        let package = packages.get(package_id).ok_or_else(|| {
            LedgerError::validation(format!("unknown package '{}'", package_id))
        })?;

        let listing = self
            .promotions
            .get_listing(listing_id)
            .await?
            .ok_or_else(|| LedgerError::not_found(format!("listing '{}'", listing_id)))?;

        let window = PromotionState::active_until(extended_expiry(
            &listing.promotion,
            now,
            package.duration_secs(),
        ));
        self.promotions
            .set_listing_promotion(listing_id, &window)
            .await?;

        Ok(window)
    }

    async fn apply_subscription(
        &self,
        transaction: &Transaction,
        config: &LedgerConfig,
        now: u64,
    ) -> Result<PromotionState> {
        let window = PromotionState::active_until(now + config.subscription_duration_secs());
        self.promotions
            .set_subscription(&transaction.payer_id, &window)
            .await?;

        Ok(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryPromotionStore;
    use crate::storage::{ListingLifecycle, ListingRecord, PromotionStore};
    use crate::transaction::PaymentChannel;

    const DAY: u64 = 86_400;

    fn packages() -> Packages {
        Packages::builder()
            .package("short")
                .price_cents(500)
                .duration_days(7)
                .done()
            .build()
    }

    fn approved_feature_transaction(listing_id: &str) -> Transaction {
        Transaction {
            id: Transaction::new_id(),
            payer_id: "acct_a".to_string(),
            amount_cents: 500,
            currency: "usd".to_string(),
            channel: PaymentChannel::Gateway,
            reference: "pi_1".to_string(),
            proof_url: None,
            status: TransactionStatus::Approved,
            benefit: BenefitKind::FeatureListing,
            package_id: Some("short".to_string()),
            target_listing_id: Some(listing_id.to_string()),
            created_at: 1_000,
            resolved_at: Some(1_000),
        }
    }

    async fn store_with_listing(promotion: PromotionState) -> MemoryPromotionStore {
        let store = MemoryPromotionStore::new();
        store
            .insert_listing(ListingRecord {
                id: "listing_1".to_string(),
                owner_id: "acct_a".to_string(),
                lifecycle: ListingLifecycle::Approved,
                promotion,
            })
            .await;
        store
    }

    #[test]
    fn test_extended_expiry_from_now_when_inactive() {
        let now = 10_000;
        assert_eq!(
            extended_expiry(&PromotionState::inactive(), now, 7 * DAY),
            now + 7 * DAY
        );
    }

    #[test]
    fn test_extended_expiry_stacks_on_live_window() {
        // 3 days left on a live window + 7-day tier = 10 days of coverage.
        let now = 10_000;
        let current = PromotionState::active_until(now + 3 * DAY);
        assert_eq!(extended_expiry(&current, now, 7 * DAY), now + 10 * DAY);
    }

    #[test]
    fn test_extended_expiry_ignores_expired_window() {
        let now = 100_000;
        let stale = PromotionState::active_until(now - DAY);
        assert_eq!(extended_expiry(&stale, now, 7 * DAY), now + 7 * DAY);
    }

    #[test]
    fn test_extended_expiry_ignores_revoked_window() {
        // Revocation clears flag and expiry together; nothing to extend from.
        let now = 10_000;
        assert_eq!(
            extended_expiry(&PromotionState::inactive(), now, 7 * DAY),
            now + 7 * DAY
        );

        // Even a lingering expiry with a lowered flag contributes nothing.
        let lowered = PromotionState {
            flagged: false,
            expires_at: Some(now + 30 * DAY),
        };
        assert_eq!(extended_expiry(&lowered, now, 7 * DAY), now + 7 * DAY);
    }

    #[tokio::test]
    async fn test_apply_feature_listing() {
        let store = store_with_listing(PromotionState::inactive()).await;
        let applier = BenefitApplier::new(store.clone());
        let now = 50_000;

        let window = applier
            .apply(
                &approved_feature_transaction("listing_1"),
                &packages(),
                &LedgerConfig::default(),
                now,
            )
            .await
            .unwrap();

        assert!(window.flagged);
        assert_eq!(window.expires_at, Some(now + 7 * DAY));

        let listing = store.get_listing("listing_1").await.unwrap().unwrap();
        assert_eq!(listing.promotion, window);
    }

    #[tokio::test]
    async fn test_apply_extends_live_window() {
        let now = 50_000;
        let store = store_with_listing(PromotionState::active_until(now + 3 * DAY)).await;
        let applier = BenefitApplier::new(store.clone());

        let window = applier
            .apply(
                &approved_feature_transaction("listing_1"),
                &packages(),
                &LedgerConfig::default(),
                now,
            )
            .await
            .unwrap();

        assert_eq!(window.expires_at, Some(now + 10 * DAY));
    }

    #[tokio::test]
    async fn test_apply_subscription() {
        let store = MemoryPromotionStore::new();
        let applier = BenefitApplier::new(store.clone());
        let config = LedgerConfig::default();
        let now = 50_000;

        let txn = Transaction {
            benefit: BenefitKind::Subscription,
            package_id: None,
            target_listing_id: None,
            ..approved_feature_transaction("listing_1")
        };

        let window = applier.apply(&txn, &packages(), &config, now).await.unwrap();
        assert_eq!(window.expires_at, Some(now + 30 * DAY));

        let stored = store.get_subscription("acct_a").await.unwrap();
        assert_eq!(stored, window);
    }

    #[tokio::test]
    async fn test_apply_rejects_unapproved_transaction() {
        let store = store_with_listing(PromotionState::inactive()).await;
        let applier = BenefitApplier::new(store);

        let txn = Transaction {
            status: TransactionStatus::Pending,
            ..approved_feature_transaction("listing_1")
        };

        let result = applier
            .apply(&txn, &packages(), &LedgerConfig::default(), 50_000)
            .await;
        assert!(matches!(result, Err(LedgerError::Internal(_))));
    }

    #[tokio::test]
    async fn test_apply_missing_listing() {
        let store = MemoryPromotionStore::new();
        let applier = BenefitApplier::new(store);

        let result = applier
            .apply(
                &approved_feature_transaction("listing_missing"),
                &packages(),
                &LedgerConfig::default(),
                50_000,
            )
            .await;
        assert!(matches!(result, Err(LedgerError::NotFound(_))));
    }
}
