//! Manual intake path.
//!
//! Payers who transfer funds out-of-band (bank transfer, mobile money)
//! submit the transfer id and optional proof here. Submission validates the
//! target and records a pending transaction for human review; no resource is
//! touched until a reviewer approves it.

use crate::audit::{LedgerAuditEvent, LedgerAuditLogger, TracingAuditLogger};
use crate::clock::{Clock, SystemClock};
use crate::config::LedgerConfig;
use crate::error::Result;
use crate::packages::Packages;
use crate::storage::{LedgerStore, PromotionStore};
use crate::transaction::{BenefitKind, PaymentChannel, Transaction, TransactionStatus};
use crate::validation::{
    canonical_amount_cents, validate_benefit_request, validate_channel, validate_id,
    validate_proof_url, validate_reference,
};

/// A manual payment submission.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// Amount the payer claims to have transferred, in cents. Informational
    /// only; the stored amount is always the server-computed price.
    pub amount_cents: i64,
    /// Transfer method (e.g., "bank_transfer").
    pub channel: String,
    /// User-typed transfer id.
    pub reference: String,
    /// Link to payment proof.
    pub proof_url: Option<String>,
    /// The benefit being purchased.
    pub benefit: BenefitKind,
    /// Target listing, required iff `benefit` is `FeatureListing`.
    pub target_listing_id: Option<String>,
    /// Duration tier, required iff `benefit` is `FeatureListing`.
    pub package_id: Option<String>,
}

/// Manual intake operations.
pub struct ManualIntake<L, P, A = TracingAuditLogger, C = SystemClock> {
    ledger: L,
    promotions: P,
    packages: Packages,
    config: LedgerConfig,
    audit: A,
    clock: C,
}

impl<L, P> ManualIntake<L, P>
where
    L: LedgerStore,
    P: PromotionStore,
{
    /// Create a new manual intake with tracing audit and the system clock.
    #[must_use]
    pub fn new(ledger: L, promotions: P, packages: Packages, config: LedgerConfig) -> Self {
        Self {
            ledger,
            promotions,
            packages,
            config,
            audit: TracingAuditLogger,
            clock: SystemClock,
        }
    }
}

impl<L, P, A, C> ManualIntake<L, P, A, C>
where
    L: LedgerStore,
    P: PromotionStore,
    A: LedgerAuditLogger,
    C: Clock,
{
    /// Replace the audit logger.
    #[must_use]
    pub fn with_audit<A2: LedgerAuditLogger>(self, audit: A2) -> ManualIntake<L, P, A2, C> {
        ManualIntake {
            ledger: self.ledger,
            promotions: self.promotions,
            packages: self.packages,
            config: self.config,
            audit,
            clock: self.clock,
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock<C2: Clock>(self, clock: C2) -> ManualIntake<L, P, A, C2> {
        ManualIntake {
            ledger: self.ledger,
            promotions: self.promotions,
            packages: self.packages,
            config: self.config,
            audit: self.audit,
            clock,
        }
    }

    /// Record a manual transfer as a pending transaction.
    ///
    /// All validation and ownership checks run before anything is written;
    /// a failed submission leaves zero rows. The stored amount is the
    /// server-computed price for the selected benefit, never the amount the
    /// payer typed.
    pub async fn submit(&self, payer_id: &str, request: SubmitRequest) -> Result<Transaction> {
        validate_id("payer_id", payer_id)?;
        validate_channel(&request.channel)?;
        validate_reference(&request.reference)?;
        if let Some(proof_url) = &request.proof_url {
            validate_proof_url(proof_url)?;
        }

        validate_benefit_request(
            &self.promotions,
            payer_id,
            request.benefit,
            request.target_listing_id.as_deref(),
            request.package_id.as_deref(),
        )
        .await?;

        let canonical = canonical_amount_cents(
            &self.packages,
            &self.config,
            request.benefit,
            request.package_id.as_deref(),
        )?;
        if request.amount_cents != canonical {
            tracing::warn!(
                target: "pawledger::manual",
                payer_id = %payer_id,
                claimed = request.amount_cents,
                canonical = canonical,
                "submitted amount differs from the canonical price; storing canonical"
            );
        }

        let transaction = Transaction {
            id: Transaction::new_id(),
            payer_id: payer_id.to_string(),
            amount_cents: canonical,
            currency: self.config.currency.clone(),
            channel: PaymentChannel::manual(&request.channel),
            reference: request.reference,
            proof_url: request.proof_url,
            status: TransactionStatus::Pending,
            benefit: request.benefit,
            package_id: request.package_id,
            target_listing_id: request.target_listing_id,
            created_at: self.clock.now(),
            resolved_at: None,
        };

        self.ledger.create_transaction(&transaction).await?;
        self.audit
            .log(LedgerAuditEvent::TransactionSubmitted {
                transaction_id: transaction.id.clone(),
                payer_id: payer_id.to_string(),
                benefit: transaction.benefit.to_string(),
            })
            .await;

        Ok(transaction)
    }
}
