//! Audit logging for ledger operations.
//!
//! Every state-changing ledger operation emits an audit event through a
//! trait-based logger, so deployments can route them to their own compliance
//! sink. The default [`TracingAuditLogger`] emits structured `tracing` events
//! at INFO level.

use std::fmt;

/// Audit event types for ledger operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerAuditEvent {
    /// Manual transfer submitted for review.
    TransactionSubmitted {
        transaction_id: String,
        payer_id: String,
        benefit: String,
    },
    /// Gateway settlement recorded as an approved transaction.
    SettlementRecorded {
        transaction_id: String,
        reference: String,
        payer_id: String,
    },
    /// A confirmation arrived for a reference that was already recorded.
    DuplicateConfirmation {
        transaction_id: String,
        reference: String,
    },
    /// Reviewer approved a pending transaction.
    TransactionApproved {
        transaction_id: String,
        reviewer_id: String,
    },
    /// Reviewer rejected a pending transaction.
    TransactionRejected {
        transaction_id: String,
        reviewer_id: String,
    },
    /// Benefit applied to a target.
    BenefitApplied {
        transaction_id: String,
        target: String,
        expires_at: u64,
    },
    /// Benefit application failed and the status flip was rolled back.
    BenefitRolledBack {
        transaction_id: String,
        reason: String,
    },
    /// Promotion force-demoted before natural expiry.
    PromotionRevoked { target: String, actor_id: String },
    /// Normalization sweep cleared stale promotion flags.
    PromotionsNormalized {
        listings_cleared: usize,
        subscriptions_cleared: usize,
    },
}

impl fmt::Display for LedgerAuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransactionSubmitted {
                transaction_id,
                payer_id,
                benefit,
            } => {
                write!(
                    f,
                    "Transaction submitted: txn={}, payer={}, benefit={}",
                    transaction_id, payer_id, benefit
                )
            }
            Self::SettlementRecorded {
                transaction_id,
                reference,
                payer_id,
            } => {
                write!(
                    f,
                    "Settlement recorded: txn={}, reference={}, payer={}",
                    transaction_id, reference, payer_id
                )
            }
            Self::DuplicateConfirmation {
                transaction_id,
                reference,
            } => {
                write!(
                    f,
                    "Duplicate confirmation: txn={}, reference={}",
                    transaction_id, reference
                )
            }
            Self::TransactionApproved {
                transaction_id,
                reviewer_id,
            } => {
                write!(
                    f,
                    "Transaction approved: txn={}, reviewer={}",
                    transaction_id, reviewer_id
                )
            }
            Self::TransactionRejected {
                transaction_id,
                reviewer_id,
            } => {
                write!(
                    f,
                    "Transaction rejected: txn={}, reviewer={}",
                    transaction_id, reviewer_id
                )
            }
            Self::BenefitApplied {
                transaction_id,
                target,
                expires_at,
            } => {
                write!(
                    f,
                    "Benefit applied: txn={}, target={}, expires_at={}",
                    transaction_id, target, expires_at
                )
            }
            Self::BenefitRolledBack {
                transaction_id,
                reason,
            } => {
                write!(
                    f,
                    "Benefit rolled back: txn={}, reason={}",
                    transaction_id, reason
                )
            }
            Self::PromotionRevoked { target, actor_id } => {
                write!(f, "Promotion revoked: target={}, actor={}", target, actor_id)
            }
            Self::PromotionsNormalized {
                listings_cleared,
                subscriptions_cleared,
            } => {
                write!(
                    f,
                    "Promotions normalized: listings={}, subscriptions={}",
                    listings_cleared, subscriptions_cleared
                )
            }
        }
    }
}

/// Trait for audit logging backends.
///
/// Implementations should handle failures gracefully to avoid disrupting
/// ledger operations.
pub trait LedgerAuditLogger: Send + Sync {
    /// Log a ledger audit event.
    async fn log(&self, event: LedgerAuditEvent);
}

/// No-op audit logger that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpAuditLogger;

impl LedgerAuditLogger for NoOpAuditLogger {
    async fn log(&self, _event: LedgerAuditEvent) {
        // No-op
    }
}

/// Tracing-based audit logger.
///
/// Logs audit events using the `tracing` crate at INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLogger;

impl LedgerAuditLogger for TracingAuditLogger {
    async fn log(&self, event: LedgerAuditEvent) {
        tracing::info!(
            target: "pawledger::audit",
            event_type = %event_kind(&event),
            "{}", event
        );
    }
}

/// Get the event kind as a string for structured logging.
fn event_kind(event: &LedgerAuditEvent) -> &'static str {
    match event {
        LedgerAuditEvent::TransactionSubmitted { .. } => "transaction_submitted",
        LedgerAuditEvent::SettlementRecorded { .. } => "settlement_recorded",
        LedgerAuditEvent::DuplicateConfirmation { .. } => "duplicate_confirmation",
        LedgerAuditEvent::TransactionApproved { .. } => "transaction_approved",
        LedgerAuditEvent::TransactionRejected { .. } => "transaction_rejected",
        LedgerAuditEvent::BenefitApplied { .. } => "benefit_applied",
        LedgerAuditEvent::BenefitRolledBack { .. } => "benefit_rolled_back",
        LedgerAuditEvent::PromotionRevoked { .. } => "promotion_revoked",
        LedgerAuditEvent::PromotionsNormalized { .. } => "promotions_normalized",
    }
}
