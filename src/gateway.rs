//! Payment gateway adapter boundary.
//!
//! The ledger never speaks the gateway's wire protocol; it sees an opaque
//! adapter that can open a checkout session and report the authoritative
//! settlement state of a payment reference. Confirmation always pulls the
//! state from the adapter — a client-asserted "it succeeded" is never
//! trusted.

use crate::error::Result;

/// Trait for the third-party payment processor.
///
/// Implementations wrap a real processor SDK;
/// [`MockGateway`](crate::testing::MockGateway) provides a scriptable
/// stand-in.
pub trait PaymentGateway: Send + Sync {
    /// Open a payment session for the given amount and return the client
    /// secret the frontend needs to complete it. No ledger record is created
    /// at this point; abandoned checkouts leave no trace.
    async fn initiate(&self, amount_cents: i64, currency: &str) -> Result<GatewaySession>;

    /// Fetch the authoritative settlement state for a payment reference.
    async fn settlement_status(&self, reference: &str) -> Result<Settlement>;
}

/// An open gateway payment session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySession {
    /// Gateway-side session id.
    pub session_id: String,
    /// Secret the client uses to complete the payment.
    pub client_secret: String,
}

/// Authoritative settlement state for a payment reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    /// Settlement state as reported by the processor.
    pub state: SettlementState,
    /// Amount actually captured, in cents. Eligibility is derived from this,
    /// never from the amount the client asked for.
    pub settled_amount_cents: i64,
    /// Currency the amount was captured in.
    pub currency: String,
}

impl Settlement {
    /// Whether funds were captured.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.state == SettlementState::Succeeded
    }
}

/// Processor-reported state of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementState {
    /// Funds captured.
    Succeeded,
    /// Payment failed.
    Failed,
    /// Still in flight.
    Pending,
}

impl SettlementState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Pending => "pending",
        }
    }
}

impl std::fmt::Display for SettlementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
