//! Automatic (gateway) intake path.
//!
//! `initiate` opens a gateway session and deliberately writes nothing: an
//! abandoned checkout leaves no ledger noise. `confirm` pulls the
//! authoritative settlement state from the gateway, records the transaction
//! as already approved (settlement is the proof; no reviewer is involved),
//! and applies the benefit in the same operation. Confirmations are
//! idempotent per reference: retries and races converge on the single stored
//! row.

use std::time::Duration;

use crate::applier::BenefitApplier;
use crate::audit::{LedgerAuditEvent, LedgerAuditLogger, TracingAuditLogger};
use crate::clock::{Clock, SystemClock};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::gateway::{GatewaySession, PaymentGateway, Settlement};
use crate::packages::Packages;
use crate::storage::{LedgerStore, PromotionState, PromotionStore, ReferenceInsert};
use crate::transaction::{BenefitKind, PaymentChannel, Transaction, TransactionStatus};
use crate::validation::{
    canonical_amount_cents, validate_amount_cents, validate_benefit_request, validate_currency,
    validate_id, validate_reference,
};

/// A gateway confirmation request.
#[derive(Debug, Clone)]
pub struct ConfirmRequest {
    /// Gateway payment id to confirm.
    pub reference: String,
    /// The benefit being purchased.
    pub benefit: BenefitKind,
    /// Target listing, required iff `benefit` is `FeatureListing`.
    pub target_listing_id: Option<String>,
    /// Duration tier, required iff `benefit` is `FeatureListing`.
    pub package_id: Option<String>,
}

/// Result of a confirmation.
#[derive(Debug, Clone)]
pub struct ConfirmOutcome {
    /// The stored transaction (fresh, or the existing row on a duplicate).
    pub transaction: Transaction,
    /// The target's promotion window after this call.
    pub window: Option<PromotionState>,
    /// True when the reference had already been recorded and this call was
    /// an idempotent no-op.
    pub already_recorded: bool,
}

/// Gateway intake operations.
pub struct CheckoutManager<L, P: PromotionStore, G, A = TracingAuditLogger, C = SystemClock> {
    ledger: L,
    promotions: P,
    applier: BenefitApplier<P>,
    gateway: G,
    packages: Packages,
    config: LedgerConfig,
    audit: A,
    clock: C,
}

impl<L, P, G> CheckoutManager<L, P, G>
where
    L: LedgerStore,
    P: PromotionStore + Clone,
    G: PaymentGateway,
{
    /// Create a new checkout manager with tracing audit and the system clock.
    #[must_use]
    pub fn new(
        ledger: L,
        promotions: P,
        gateway: G,
        packages: Packages,
        config: LedgerConfig,
    ) -> Self {
        Self {
            ledger,
            applier: BenefitApplier::new(promotions.clone()),
            promotions,
            gateway,
            packages,
            config,
            audit: TracingAuditLogger,
            clock: SystemClock,
        }
    }
}

impl<L, P, G, A, C> CheckoutManager<L, P, G, A, C>
where
    L: LedgerStore,
    P: PromotionStore,
    G: PaymentGateway,
    A: LedgerAuditLogger,
    C: Clock,
{
    /// Replace the audit logger.
    #[must_use]
    pub fn with_audit<A2: LedgerAuditLogger>(self, audit: A2) -> CheckoutManager<L, P, G, A2, C> {
        CheckoutManager {
            ledger: self.ledger,
            promotions: self.promotions,
            applier: self.applier,
            gateway: self.gateway,
            packages: self.packages,
            config: self.config,
            audit,
            clock: self.clock,
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock<C2: Clock>(self, clock: C2) -> CheckoutManager<L, P, G, A, C2> {
        CheckoutManager {
            ledger: self.ledger,
            promotions: self.promotions,
            applier: self.applier,
            gateway: self.gateway,
            packages: self.packages,
            config: self.config,
            audit: self.audit,
            clock,
        }
    }

    /// Open a gateway payment session.
    ///
    /// Returns the client secret the frontend needs. No transaction is
    /// created; the ledger only learns about the payment at `confirm`.
    pub async fn initiate(&self, amount_cents: i64, currency: &str) -> Result<GatewaySession> {
        validate_amount_cents(amount_cents)?;
        validate_currency(currency)?;
        self.gateway.initiate(amount_cents, currency).await
    }

    /// Record a settled gateway payment and apply its benefit.
    ///
    /// The settlement state is fetched from the gateway under a bounded
    /// timeout; anything but a confirmed settlement fails with
    /// [`LedgerError::PaymentNotSettled`]. A reference that is already in the
    /// ledger returns the stored row unchanged, with no second benefit
    /// application.
    pub async fn confirm(&self, payer_id: &str, request: ConfirmRequest) -> Result<ConfirmOutcome> {
        validate_id("payer_id", payer_id)?;
        validate_reference(&request.reference)?;

        let settlement = self.fetch_settlement(&request.reference).await?;
        if !settlement.is_settled() {
            return Err(LedgerError::payment_not_settled(
                &request.reference,
                settlement.state.as_str(),
            ));
        }

        let canonical = canonical_amount_cents(
            &self.packages,
            &self.config,
            request.benefit,
            request.package_id.as_deref(),
        )?;
        if settlement.currency != self.config.currency {
            return Err(LedgerError::validation(format!(
                "settled in '{}', expected '{}'",
                settlement.currency, self.config.currency
            )));
        }
        if settlement.settled_amount_cents != canonical {
            return Err(LedgerError::validation(format!(
                "settled amount {} does not match the package price {}",
                settlement.settled_amount_cents, canonical
            )));
        }

        validate_benefit_request(
            &self.promotions,
            payer_id,
            request.benefit,
            request.target_listing_id.as_deref(),
            request.package_id.as_deref(),
        )
        .await?;

        let now = self.clock.now();
        let transaction = Transaction {
            id: Transaction::new_id(),
            payer_id: payer_id.to_string(),
            amount_cents: canonical,
            currency: self.config.currency.clone(),
            channel: PaymentChannel::Gateway,
            reference: request.reference.clone(),
            proof_url: None,
            status: TransactionStatus::Approved,
            benefit: request.benefit,
            package_id: request.package_id.clone(),
            target_listing_id: request.target_listing_id.clone(),
            created_at: now,
            resolved_at: Some(now),
        };

        match self.ledger.create_if_reference_absent(&transaction).await? {
            ReferenceInsert::Existing(existing) => {
                self.audit
                    .log(LedgerAuditEvent::DuplicateConfirmation {
                        transaction_id: existing.id.clone(),
                        reference: request.reference.clone(),
                    })
                    .await;

                let window = self.current_window(&existing).await?;
                Ok(ConfirmOutcome {
                    transaction: existing,
                    window,
                    already_recorded: true,
                })
            }
            ReferenceInsert::Created => {
                match self
                    .applier
                    .apply(&transaction, &self.packages, &self.config, now)
                    .await
                {
                    Ok(window) => {
                        self.audit
                            .log(LedgerAuditEvent::SettlementRecorded {
                                transaction_id: transaction.id.clone(),
                                reference: request.reference.clone(),
                                payer_id: payer_id.to_string(),
                            })
                            .await;
                        self.audit
                            .log(LedgerAuditEvent::BenefitApplied {
                                transaction_id: transaction.id.clone(),
                                target: transaction.benefit_target().to_string(),
                                expires_at: window.expires_at.unwrap_or(0),
                            })
                            .await;

                        Ok(ConfirmOutcome {
                            transaction,
                            window: Some(window),
                            already_recorded: false,
                        })
                    }
                    Err(err) => {
                        // The approved row must not outlive a failed grant;
                        // removing it lets a caller retry replay the whole
                        // confirmation.
                        if let Err(cleanup) =
                            self.ledger.remove_transaction(&transaction.id).await
                        {
                            tracing::error!(
                                target: "pawledger::checkout",
                                transaction_id = %transaction.id,
                                error = %cleanup,
                                "failed to remove transaction after benefit failure"
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

    async fn fetch_settlement(&self, reference: &str) -> Result<Settlement> {
        let lookup = self.gateway.settlement_status(reference);
        match tokio::time::timeout(Duration::from_secs(self.config.gateway_timeout_secs), lookup)
            .await
        {
            Ok(result) => result,
            Err(_) => Err(LedgerError::payment_not_settled(
                reference,
                "settlement lookup timed out",
            )),
        }
    }

    async fn current_window(&self, transaction: &Transaction) -> Result<Option<PromotionState>> {
        match transaction.benefit {
            BenefitKind::FeatureListing => match &transaction.target_listing_id {
                Some(listing_id) => Ok(self
                    .promotions
                    .get_listing(listing_id)
                    .await?
                    .map(|l| l.promotion)),
                None => Ok(None),
            },
            BenefitKind::Subscription => Ok(Some(
                self.promotions
                    .get_subscription(&transaction.payer_id)
                    .await?,
            )),
        }
    }
}
