//! Read-time promotion evaluation and maintenance.
//!
//! Nothing in the system retracts an expired benefit: decay is computed, not
//! stored. Every consumer of "is this promoted" derives liveness from the
//! stored window and the current instant via [`is_currently_promoted`]; the
//! stored flag on its own means nothing. The [`normalize`] sweep exists for
//! systems that insist on reading the raw flag — it restores consistency but
//! is never the source of truth.
//!
//! [`normalize`]: PromotionManager::normalize

use crate::audit::{LedgerAuditEvent, LedgerAuditLogger, TracingAuditLogger};
use crate::clock::{Clock, SystemClock};
use crate::error::{LedgerError, Result};
use crate::review::Actor;
use crate::storage::{ListingRecord, PromotionState, PromotionStore};
use crate::validation::validate_id;

/// Whether a promotion window is live at `now`.
///
/// A raised flag with a past or absent expiry reads as inactive; this is the
/// one derivation every read site must go through.
#[must_use]
pub fn is_currently_promoted(state: &PromotionState, now: u64) -> bool {
    state.is_active_at(now)
}

/// Report from a normalization sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NormalizeReport {
    /// Listings whose stale flag was cleared.
    pub listings_cleared: usize,
    /// Accounts whose stale subscription flag was cleared.
    pub subscriptions_cleared: usize,
}

/// Read-time promotion queries, the normalization sweep, and administrative
/// revocation.
pub struct PromotionManager<P, A = TracingAuditLogger, C = SystemClock> {
    promotions: P,
    audit: A,
    clock: C,
}

impl<P: PromotionStore> PromotionManager<P> {
    /// Create a new promotion manager with tracing audit and the system
    /// clock.
    #[must_use]
    pub fn new(promotions: P) -> Self {
        Self {
            promotions,
            audit: TracingAuditLogger,
            clock: SystemClock,
        }
    }
}

impl<P, A, C> PromotionManager<P, A, C>
where
    P: PromotionStore,
    A: LedgerAuditLogger,
    C: Clock,
{
    /// Replace the audit logger.
    #[must_use]
    pub fn with_audit<A2: LedgerAuditLogger>(self, audit: A2) -> PromotionManager<P, A2, C> {
        PromotionManager {
            promotions: self.promotions,
            audit,
            clock: self.clock,
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock<C2: Clock>(self, clock: C2) -> PromotionManager<P, A, C2> {
        PromotionManager {
            promotions: self.promotions,
            audit: self.audit,
            clock,
        }
    }

    /// Whether a listing is featured right now.
    pub async fn is_listing_featured(&self, listing_id: &str) -> Result<bool> {
        validate_id("listing_id", listing_id)?;
        let now = self.clock.now();
        Ok(self
            .promotions
            .get_listing(listing_id)
            .await?
            .map(|l| is_currently_promoted(&l.promotion, now))
            .unwrap_or(false))
    }

    /// Whether an account's subscription is active right now.
    pub async fn is_subscription_active(&self, account_id: &str) -> Result<bool> {
        validate_id("account_id", account_id)?;
        let now = self.clock.now();
        let state = self.promotions.get_subscription(account_id).await?;
        Ok(is_currently_promoted(&state, now))
    }

    /// Listings whose featured window is live right now. Rows with a stale
    /// flag are excluded, whether or not a sweep has cleared them yet.
    pub async fn featured_listings(&self) -> Result<Vec<ListingRecord>> {
        let now = self.clock.now();
        let mut listings: Vec<ListingRecord> = self
            .promotions
            .flagged_listings()
            .await?
            .into_iter()
            .filter(|l| is_currently_promoted(&l.promotion, now))
            .collect();
        listings.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(listings)
    }

    /// Clear stale promotion flags.
    ///
    /// Idempotent, on-demand: flips every flagged row whose window is no
    /// longer live to the inactive state (flag and expiry cleared together).
    /// Running it twice is a no-op; not running it at all is fine, because
    /// every reader re-derives liveness anyway.
    pub async fn normalize(&self) -> Result<NormalizeReport> {
        let now = self.clock.now();
        let mut report = NormalizeReport::default();

        for listing in self.promotions.flagged_listings().await? {
            if !is_currently_promoted(&listing.promotion, now) {
                self.promotions
                    .set_listing_promotion(&listing.id, &PromotionState::inactive())
                    .await?;
                report.listings_cleared += 1;
            }
        }

        for (account_id, state) in self.promotions.flagged_subscriptions().await? {
            if !is_currently_promoted(&state, now) {
                self.promotions
                    .set_subscription(&account_id, &PromotionState::inactive())
                    .await?;
                report.subscriptions_cleared += 1;
            }
        }

        if report.listings_cleared > 0 || report.subscriptions_cleared > 0 {
            self.audit
                .log(LedgerAuditEvent::PromotionsNormalized {
                    listings_cleared: report.listings_cleared,
                    subscriptions_cleared: report.subscriptions_cleared,
                })
                .await;
        }

        Ok(report)
    }

    /// Force-demote a listing before its natural expiry.
    ///
    /// Clears the flag and the expiry together, so a later purchase extends
    /// from `now` rather than resurrecting the revoked window.
    pub async fn revoke_listing(&self, actor: &Actor, listing_id: &str) -> Result<()> {
        actor.require_reviewer()?;
        validate_id("listing_id", listing_id)?;

        self.promotions
            .get_listing(listing_id)
            .await?
            .ok_or_else(|| LedgerError::not_found(format!("listing '{}'", listing_id)))?;

        self.promotions
            .set_listing_promotion(listing_id, &PromotionState::inactive())
            .await?;
        self.audit
            .log(LedgerAuditEvent::PromotionRevoked {
                target: listing_id.to_string(),
                actor_id: actor.account_id.clone(),
            })
            .await;
        Ok(())
    }

    /// Force-demote an account's subscription before its natural expiry.
    pub async fn revoke_subscription(&self, actor: &Actor, account_id: &str) -> Result<()> {
        actor.require_reviewer()?;
        validate_id("account_id", account_id)?;

        self.promotions
            .set_subscription(account_id, &PromotionState::inactive())
            .await?;
        self.audit
            .log(LedgerAuditEvent::PromotionRevoked {
                target: account_id.to_string(),
                actor_id: actor.account_id.clone(),
            })
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::memory::MemoryPromotionStore;
    use crate::storage::ListingLifecycle;
    use crate::testing::CapturingAuditLogger;

    async fn seeded_store(now: u64) -> MemoryPromotionStore {
        let store = MemoryPromotionStore::new();
        store
            .insert_listing(ListingRecord {
                id: "listing_live".to_string(),
                owner_id: "acct_a".to_string(),
                lifecycle: ListingLifecycle::Approved,
                promotion: PromotionState::active_until(now + 1_000),
            })
            .await;
        store
            .insert_listing(ListingRecord {
                id: "listing_stale".to_string(),
                owner_id: "acct_a".to_string(),
                lifecycle: ListingLifecycle::Approved,
                promotion: PromotionState::active_until(now.saturating_sub(1_000)),
            })
            .await;
        store
            .insert_listing(ListingRecord {
                id: "listing_plain".to_string(),
                owner_id: "acct_b".to_string(),
                lifecycle: ListingLifecycle::Approved,
                promotion: PromotionState::inactive(),
            })
            .await;
        store
    }

    fn manager(
        store: MemoryPromotionStore,
        now: u64,
    ) -> PromotionManager<MemoryPromotionStore, CapturingAuditLogger, ManualClock> {
        PromotionManager::new(store)
            .with_audit(CapturingAuditLogger::new())
            .with_clock(ManualClock::new(now))
    }

    #[test]
    fn test_is_currently_promoted() {
        assert!(is_currently_promoted(
            &PromotionState::active_until(1_000),
            999
        ));
        assert!(!is_currently_promoted(
            &PromotionState::active_until(1_000),
            1_000
        ));
        assert!(!is_currently_promoted(&PromotionState::inactive(), 0));
        assert!(!is_currently_promoted(
            &PromotionState {
                flagged: true,
                expires_at: None
            },
            0
        ));
    }

    #[tokio::test]
    async fn test_stale_flag_reads_inactive() {
        let now = 100_000;
        let manager = manager(seeded_store(now).await, now);

        assert!(manager.is_listing_featured("listing_live").await.unwrap());
        assert!(!manager.is_listing_featured("listing_stale").await.unwrap());
        assert!(!manager.is_listing_featured("listing_plain").await.unwrap());
        assert!(!manager.is_listing_featured("listing_missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_featured_listings_excludes_stale_rows() {
        let now = 100_000;
        let manager = manager(seeded_store(now).await, now);

        let featured = manager.featured_listings().await.unwrap();
        assert_eq!(featured.len(), 1);
        assert_eq!(featured[0].id, "listing_live");
    }

    #[tokio::test]
    async fn test_expiry_is_reactive_not_swept() {
        let now = 100_000;
        let store = seeded_store(now).await;
        let clock = ManualClock::new(now);
        let manager = PromotionManager::new(store)
            .with_audit(CapturingAuditLogger::new())
            .with_clock(clock.clone());

        assert!(manager.is_listing_featured("listing_live").await.unwrap());

        // No sweep runs; the same row simply reads inactive once time passes.
        clock.advance(2_000);
        assert!(!manager.is_listing_featured("listing_live").await.unwrap());
    }

    #[tokio::test]
    async fn test_normalize_clears_stale_flags_idempotently() {
        let now = 100_000;
        let store = seeded_store(now).await;
        store
            .set_subscription("acct_v", &PromotionState::active_until(now - 10))
            .await
            .unwrap();
        store
            .set_subscription("acct_w", &PromotionState::active_until(now + 10))
            .await
            .unwrap();

        let manager = manager(store.clone(), now);

        let report = manager.normalize().await.unwrap();
        assert_eq!(report.listings_cleared, 1);
        assert_eq!(report.subscriptions_cleared, 1);

        let stale = store.get_listing("listing_stale").await.unwrap().unwrap();
        assert_eq!(stale.promotion, PromotionState::inactive());

        // Live rows are untouched.
        let live = store.get_listing("listing_live").await.unwrap().unwrap();
        assert!(live.promotion.flagged);

        let again = manager.normalize().await.unwrap();
        assert_eq!(again, NormalizeReport::default());
    }

    #[tokio::test]
    async fn test_revoke_clears_flag_and_expiry_together() {
        let now = 100_000;
        let store = seeded_store(now).await;
        let manager = manager(store.clone(), now);
        let reviewer = Actor::reviewer("acct_r");

        manager
            .revoke_listing(&reviewer, "listing_live")
            .await
            .unwrap();

        let listing = store.get_listing("listing_live").await.unwrap().unwrap();
        assert_eq!(listing.promotion, PromotionState::inactive());
        assert_eq!(listing.promotion.expires_at, None);

        assert!(matches!(
            manager.revoke_listing(&reviewer, "listing_missing").await,
            Err(LedgerError::NotFound(_))
        ));
        assert!(matches!(
            manager
                .revoke_listing(&Actor::customer("acct_a"), "listing_live")
                .await,
            Err(LedgerError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_revoke_subscription() {
        let now = 100_000;
        let store = MemoryPromotionStore::new();
        store
            .set_subscription("acct_v", &PromotionState::active_until(now + 5_000))
            .await
            .unwrap();

        let manager = manager(store.clone(), now);
        manager
            .revoke_subscription(&Actor::reviewer("acct_r"), "acct_v")
            .await
            .unwrap();

        assert_eq!(
            store.get_subscription("acct_v").await.unwrap(),
            PromotionState::inactive()
        );
        assert!(!manager.is_subscription_active("acct_v").await.unwrap());
    }
}
