//! Error types for ledger operations.
//!
//! The error taxonomy distinguishes pre-write validation failures (client
//! errors) from storage and gateway failures so callers can map them to the
//! right response class. Duplicate gateway confirmations are NOT errors; they
//! are idempotent successes and never appear here.

/// The main error type for ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Malformed input, or a settled amount that contradicts the canonical
    /// package price.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Transaction or target resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller does not own the target, or lacks the reviewer role.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Target exists but is not in a promotable lifecycle state.
    #[error("Target not eligible: {0}")]
    InvalidTargetState(String),

    /// A decision was attempted on a transaction that is no longer pending.
    /// Decisions are one-shot; the second decide is rejected, not overwritten.
    #[error("Transaction '{transaction_id}' is already resolved")]
    AlreadyResolved { transaction_id: String },

    /// The gateway has not confirmed settlement for this reference
    /// (failed, still pending, or the status lookup timed out).
    #[error("Payment '{reference}' is not settled: {state}")]
    PaymentNotSettled { reference: String, state: String },

    /// Underlying store failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// An unexpected internal error occurred.
    #[error("Internal ledger error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn invalid_target_state(msg: impl Into<String>) -> Self {
        Self::InvalidTargetState(msg.into())
    }

    pub fn already_resolved(transaction_id: impl Into<String>) -> Self {
        Self::AlreadyResolved {
            transaction_id: transaction_id.into(),
        }
    }

    pub fn payment_not_settled(reference: impl Into<String>, state: impl Into<String>) -> Self {
        Self::PaymentNotSettled {
            reference: reference.into(),
            state: state.into(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this is a client error (bad input, missing resource, or a
    /// precondition the caller can observe and correct).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::NotFound(_)
                | Self::Unauthorized(_)
                | Self::InvalidTargetState(_)
                | Self::AlreadyResolved { .. }
                | Self::PaymentNotSettled { .. }
        )
    }

    /// Check if this is a server-side error.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Internal(_) | Self::Anyhow(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LedgerError::already_resolved("txn_123");
        assert_eq!(err.to_string(), "Transaction 'txn_123' is already resolved");

        let err = LedgerError::payment_not_settled("pi_1", "pending");
        assert_eq!(err.to_string(), "Payment 'pi_1' is not settled: pending");

        let err = LedgerError::unauthorized("listing belongs to another account");
        assert_eq!(
            err.to_string(),
            "Unauthorized: listing belongs to another account"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(LedgerError::validation("bad amount").is_client_error());
        assert!(LedgerError::already_resolved("txn_1").is_client_error());
        assert!(LedgerError::payment_not_settled("pi_1", "failed").is_client_error());
        assert!(!LedgerError::validation("bad amount").is_server_error());

        assert!(LedgerError::storage("lock poisoned").is_server_error());
        assert!(!LedgerError::storage("lock poisoned").is_client_error());

        let err: LedgerError = anyhow::anyhow!("unexpected").into();
        assert!(err.is_server_error());
    }
}
