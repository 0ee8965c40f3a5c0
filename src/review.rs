//! Manual review surface.
//!
//! Reviewers see the pending queue and resolve each transaction exactly once.
//! Approval flips the status and applies the benefit as one unit: if the
//! grant fails, the flip is rolled back and the transaction stays pending for
//! a later retry. A second decision on the same transaction is rejected with
//! [`LedgerError::AlreadyResolved`], never silently overwritten.

use crate::applier::BenefitApplier;
use crate::audit::{LedgerAuditEvent, LedgerAuditLogger, TracingAuditLogger};
use crate::clock::{Clock, SystemClock};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::packages::Packages;
use crate::storage::{LedgerStore, PromotionState, PromotionStore, ResolveOutcome};
use crate::transaction::{Transaction, TransactionStatus};
use crate::validation::validate_id;

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Account id of the caller.
    pub account_id: String,
    /// Role the caller holds.
    pub role: ActorRole,
}

impl Actor {
    /// A regular customer.
    #[must_use]
    pub fn customer(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            role: ActorRole::Customer,
        }
    }

    /// A privileged reviewer.
    #[must_use]
    pub fn reviewer(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            role: ActorRole::Reviewer,
        }
    }

    /// Fail with [`LedgerError::Unauthorized`] unless the caller holds the
    /// reviewer role.
    pub fn require_reviewer(&self) -> Result<()> {
        if self.role != ActorRole::Reviewer {
            return Err(LedgerError::unauthorized(format!(
                "account '{}' is not a reviewer",
                self.account_id
            )));
        }
        Ok(())
    }
}

/// Role carried by an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRole {
    /// Regular marketplace account.
    Customer,
    /// Privileged payment reviewer.
    Reviewer,
}

/// A reviewer's verdict on a pending transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Accept the payment and apply its benefit.
    Approve,
    /// Decline the payment; nothing is granted.
    Reject,
}

/// Result of a decision.
#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    /// The resolved transaction.
    pub transaction: Transaction,
    /// The target's promotion window after approval; `None` on rejection.
    pub window: Option<PromotionState>,
}

/// Review operations over the pending queue.
pub struct ReviewManager<L, P: PromotionStore, A = TracingAuditLogger, C = SystemClock> {
    ledger: L,
    applier: BenefitApplier<P>,
    packages: Packages,
    config: LedgerConfig,
    audit: A,
    clock: C,
}

impl<L, P> ReviewManager<L, P>
where
    L: LedgerStore,
    P: PromotionStore,
{
    /// Create a new review manager with tracing audit and the system clock.
    #[must_use]
    pub fn new(ledger: L, promotions: P, packages: Packages, config: LedgerConfig) -> Self {
        Self {
            ledger,
            applier: BenefitApplier::new(promotions),
            packages,
            config,
            audit: TracingAuditLogger,
            clock: SystemClock,
        }
    }
}

impl<L, P, A, C> ReviewManager<L, P, A, C>
where
    L: LedgerStore,
    P: PromotionStore,
    A: LedgerAuditLogger,
    C: Clock,
{
    /// Replace the audit logger.
    #[must_use]
    pub fn with_audit<A2: LedgerAuditLogger>(self, audit: A2) -> ReviewManager<L, P, A2, C> {
        ReviewManager {
            ledger: self.ledger,
            applier: self.applier,
            packages: self.packages,
            config: self.config,
            audit,
            clock: self.clock,
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock<C2: Clock>(self, clock: C2) -> ReviewManager<L, P, A, C2> {
        ReviewManager {
            ledger: self.ledger,
            applier: self.applier,
            packages: self.packages,
            config: self.config,
            audit: self.audit,
            clock,
        }
    }

    /// The pending queue, oldest first.
    pub async fn list_pending(&self, actor: &Actor) -> Result<Vec<Transaction>> {
        actor.require_reviewer()?;
        self.ledger.list_pending().await
    }

    /// Resolve a pending transaction.
    ///
    /// Concurrent decisions on the same transaction serialize on the store's
    /// compare-and-swap: exactly one caller transitions the status, every
    /// later caller observes [`LedgerError::AlreadyResolved`].
    pub async fn decide(
        &self,
        actor: &Actor,
        transaction_id: &str,
        decision: Decision,
    ) -> Result<DecisionOutcome> {
        actor.require_reviewer()?;
        validate_id("transaction_id", transaction_id)?;

        let to = match decision {
            Decision::Approve => TransactionStatus::Approved,
            Decision::Reject => TransactionStatus::Rejected,
        };

        let now = self.clock.now();
        let transaction = match self
            .ledger
            .resolve_transaction(transaction_id, to, now)
            .await?
        {
            ResolveOutcome::Resolved(transaction) => transaction,
            ResolveOutcome::AlreadyResolved(_) => {
                return Err(LedgerError::already_resolved(transaction_id));
            }
            ResolveOutcome::NotFound => {
                return Err(LedgerError::not_found(format!(
                    "transaction '{}'",
                    transaction_id
                )));
            }
        };

        match decision {
            Decision::Reject => {
                self.audit
                    .log(LedgerAuditEvent::TransactionRejected {
                        transaction_id: transaction.id.clone(),
                        reviewer_id: actor.account_id.clone(),
                    })
                    .await;
                Ok(DecisionOutcome {
                    transaction,
                    window: None,
                })
            }
            Decision::Approve => {
                match self
                    .applier
                    .apply(&transaction, &self.packages, &self.config, now)
                    .await
                {
                    Ok(window) => {
                        self.audit
                            .log(LedgerAuditEvent::TransactionApproved {
                                transaction_id: transaction.id.clone(),
                                reviewer_id: actor.account_id.clone(),
                            })
                            .await;
                        self.audit
                            .log(LedgerAuditEvent::BenefitApplied {
                                transaction_id: transaction.id.clone(),
                                target: transaction.benefit_target().to_string(),
                                expires_at: window.expires_at.unwrap_or(0),
                            })
                            .await;
                        Ok(DecisionOutcome {
                            transaction,
                            window: Some(window),
                        })
                    }
                    Err(err) => {
                        // The flip must not persist without its grant; put the
                        // transaction back in the queue for a retry.
                        if let Err(rollback) =
                            self.ledger.reopen_transaction(&transaction.id).await
                        {
                            tracing::error!(
                                target: "pawledger::review",
                                transaction_id = %transaction.id,
                                error = %rollback,
                                "failed to reopen transaction after benefit failure"
                            );
                        }
                        self.audit
                            .log(LedgerAuditEvent::BenefitRolledBack {
                                transaction_id: transaction.id.clone(),
                                reason: err.to_string(),
                            })
                            .await;
                        Err(err)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::manual::{ManualIntake, SubmitRequest};
    use crate::transaction::BenefitKind;
    use crate::storage::memory::{MemoryLedgerStore, MemoryPromotionStore};
    use crate::storage::{ListingLifecycle, ListingRecord, PromotionStore};
    use crate::testing::CapturingAuditLogger;

    const DAY: u64 = 86_400;

    fn packages() -> Packages {
        Packages::builder()
            .package("short")
                .price_cents(500)
                .duration_days(7)
                .done()
            .build()
    }

    async fn seeded_promotions() -> MemoryPromotionStore {
        let store = MemoryPromotionStore::new();
        store
            .insert_listing(ListingRecord {
                id: "listing_1".to_string(),
                owner_id: "acct_a".to_string(),
                lifecycle: ListingLifecycle::Approved,
                promotion: crate::storage::PromotionState::inactive(),
            })
            .await;
        store
    }

    async fn submit_feature(
        ledger: &MemoryLedgerStore,
        promotions: &MemoryPromotionStore,
        reference: &str,
    ) -> Transaction {
        let intake = ManualIntake::new(
            ledger.clone(),
            promotions.clone(),
            packages(),
            LedgerConfig::default(),
        )
        .with_clock(ManualClock::new(100_000));

        intake
            .submit(
                "acct_a",
                SubmitRequest {
                    amount_cents: 500,
                    channel: "bank_transfer".to_string(),
                    reference: reference.to_string(),
                    proof_url: None,
                    benefit: BenefitKind::FeatureListing,
                    target_listing_id: Some("listing_1".to_string()),
                    package_id: Some("short".to_string()),
                },
            )
            .await
            .unwrap()
    }

    fn review(
        ledger: MemoryLedgerStore,
        promotions: MemoryPromotionStore,
        now: u64,
    ) -> ReviewManager<MemoryLedgerStore, MemoryPromotionStore, CapturingAuditLogger, ManualClock>
    {
        ReviewManager::new(ledger, promotions, packages(), LedgerConfig::default())
            .with_audit(CapturingAuditLogger::new())
            .with_clock(ManualClock::new(now))
    }

    #[tokio::test]
    async fn test_list_pending_requires_reviewer() {
        let ledger = MemoryLedgerStore::new();
        let promotions = seeded_promotions().await;
        let manager = review(ledger, promotions, 100_000);

        let result = manager.list_pending(&Actor::customer("acct_a")).await;
        assert!(matches!(result, Err(LedgerError::Unauthorized(_))));

        let pending = manager
            .list_pending(&Actor::reviewer("acct_r"))
            .await
            .unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_approve_applies_benefit() {
        let ledger = MemoryLedgerStore::new();
        let promotions = seeded_promotions().await;
        let txn = submit_feature(&ledger, &promotions, "TID123").await;

        let now = 200_000;
        let manager = review(ledger.clone(), promotions.clone(), now);
        let outcome = manager
            .decide(&Actor::reviewer("acct_r"), &txn.id, Decision::Approve)
            .await
            .unwrap();

        assert_eq!(outcome.transaction.status, TransactionStatus::Approved);
        assert_eq!(outcome.transaction.resolved_at, Some(now));
        let window = outcome.window.unwrap();
        assert_eq!(window.expires_at, Some(now + 7 * DAY));

        let listing = promotions.get_listing("listing_1").await.unwrap().unwrap();
        assert!(listing.promotion.is_active_at(now));
    }

    #[tokio::test]
    async fn test_reject_leaves_target_untouched() {
        let ledger = MemoryLedgerStore::new();
        let promotions = seeded_promotions().await;
        let txn = submit_feature(&ledger, &promotions, "TID123").await;

        let manager = review(ledger.clone(), promotions.clone(), 200_000);
        let outcome = manager
            .decide(&Actor::reviewer("acct_r"), &txn.id, Decision::Reject)
            .await
            .unwrap();

        assert_eq!(outcome.transaction.status, TransactionStatus::Rejected);
        assert!(outcome.window.is_none());

        let listing = promotions.get_listing("listing_1").await.unwrap().unwrap();
        assert!(!listing.promotion.flagged);
    }

    #[tokio::test]
    async fn test_second_decide_is_already_resolved() {
        let ledger = MemoryLedgerStore::new();
        let promotions = seeded_promotions().await;
        let txn = submit_feature(&ledger, &promotions, "TID123").await;

        let now = 200_000;
        let manager = review(ledger.clone(), promotions.clone(), now);
        let reviewer = Actor::reviewer("acct_r");

        manager
            .decide(&reviewer, &txn.id, Decision::Approve)
            .await
            .unwrap();
        let second = manager.decide(&reviewer, &txn.id, Decision::Approve).await;
        assert!(matches!(second, Err(LedgerError::AlreadyResolved { .. })));

        // The window is exactly one tier deep: the second decide changed
        // nothing.
        let listing = promotions.get_listing("listing_1").await.unwrap().unwrap();
        assert_eq!(listing.promotion.expires_at, Some(now + 7 * DAY));

        // A reject after an approve is refused the same way.
        let result = manager.decide(&reviewer, &txn.id, Decision::Reject).await;
        assert!(matches!(result, Err(LedgerError::AlreadyResolved { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_decides_resolve_once() {
        let ledger = MemoryLedgerStore::new();
        let promotions = seeded_promotions().await;
        let txn = submit_feature(&ledger, &promotions, "TID123").await;

        let m1 = review(ledger.clone(), promotions.clone(), 200_000);
        let m2 = review(ledger.clone(), promotions.clone(), 200_000);
        let reviewer = Actor::reviewer("acct_r");

        let (a, b) = tokio::join!(
            m1.decide(&reviewer, &txn.id, Decision::Approve),
            m2.decide(&reviewer, &txn.id, Decision::Approve),
        );

        let wins = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);
        let loss = if a.is_err() { a } else { b };
        assert!(matches!(loss, Err(LedgerError::AlreadyResolved { .. })));
    }

    #[tokio::test]
    async fn test_decide_missing_transaction() {
        let manager = review(MemoryLedgerStore::new(), seeded_promotions().await, 200_000);
        let result = manager
            .decide(
                &Actor::reviewer("acct_r"),
                "txn_missing",
                Decision::Approve,
            )
            .await;
        assert!(matches!(result, Err(LedgerError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_decide_requires_reviewer_role() {
        let ledger = MemoryLedgerStore::new();
        let promotions = seeded_promotions().await;
        let txn = submit_feature(&ledger, &promotions, "TID123").await;

        let manager = review(ledger.clone(), promotions, 200_000);
        let result = manager
            .decide(&Actor::customer("acct_a"), &txn.id, Decision::Approve)
            .await;
        assert!(matches!(result, Err(LedgerError::Unauthorized(_))));

        // Still pending; the ownership check never reached the store.
        let stored = ledger.get_transaction(&txn.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn test_failed_benefit_rolls_back_the_flip() {
        let ledger = MemoryLedgerStore::new();
        let promotions = seeded_promotions().await;
        let txn = submit_feature(&ledger, &promotions, "TID123").await;

        // Remove the listing between submission and approval so the grant
        // fails.
        let empty_promotions = MemoryPromotionStore::new();
        let manager = review(ledger.clone(), empty_promotions, 200_000);

        let result = manager
            .decide(&Actor::reviewer("acct_r"), &txn.id, Decision::Approve)
            .await;
        assert!(matches!(result, Err(LedgerError::NotFound(_))));

        // No approved-but-uncredited row: the transaction is pending again.
        let stored = ledger.get_transaction(&txn.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::Pending);
        assert_eq!(stored.resolved_at, None);

        // And a retry against a repaired store succeeds.
        let manager = review(ledger.clone(), promotions, 300_000);
        let outcome = manager
            .decide(&Actor::reviewer("acct_r"), &txn.id, Decision::Approve)
            .await
            .unwrap();
        assert_eq!(outcome.transaction.status, TransactionStatus::Approved);
    }
}
