//! Transaction entity and its enums.
//!
//! A [`Transaction`] is the durable record of a single monetization attempt.
//! It is created `Pending` on the manual path, or already `Approved` on the
//! gateway path (settlement is itself the proof), and resolved exactly once.

use serde::{Deserialize, Serialize};

/// Status of a transaction in the ledger.
///
/// The only legal transitions are `Pending -> Approved` and
/// `Pending -> Rejected`; a resolved transaction is never revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Awaiting a reviewer decision.
    Pending,
    /// Payment accepted; the benefit has been (or is being) applied.
    Approved,
    /// Payment rejected by a reviewer; no benefit applied.
    Rejected,
}

impl TransactionStatus {
    /// Whether this status is terminal.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The benefit a transaction pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenefitKind {
    /// Featured placement for a listing, for a package-selected duration.
    FeatureListing,
    /// Vet subscription on the payer's own account.
    Subscription,
}

impl BenefitKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FeatureListing => "feature_listing",
            Self::Subscription => "subscription",
        }
    }
}

impl std::fmt::Display for BenefitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the payment entered the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentChannel {
    /// Settled by the payment gateway; the reference is the gateway payment id.
    Gateway,
    /// Submitted by the payer with an out-of-band transfer; the reference is
    /// user-typed and the channel names the transfer method.
    Manual { channel: String },
}

impl PaymentChannel {
    /// Create a manual channel.
    #[must_use]
    pub fn manual(channel: impl Into<String>) -> Self {
        Self::Manual {
            channel: channel.into(),
        }
    }

    #[must_use]
    pub fn is_gateway(&self) -> bool {
        matches!(self, Self::Gateway)
    }
}

impl std::fmt::Display for PaymentChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gateway => write!(f, "gateway"),
            Self::Manual { channel } => write!(f, "manual:{}", channel),
        }
    }
}

/// A single monetization attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Ledger id (uuid).
    pub id: String,
    /// Account that paid.
    pub payer_id: String,
    /// Server-computed price in cents. Client-supplied amounts are never
    /// stored here.
    pub amount_cents: i64,
    /// Lowercase ISO 4217 currency code.
    pub currency: String,
    /// Intake channel.
    pub channel: PaymentChannel,
    /// Gateway payment id, or the user-typed transfer id on the manual path.
    pub reference: String,
    /// Link to payment proof (manual path only).
    pub proof_url: Option<String>,
    /// Current status.
    pub status: TransactionStatus,
    /// The benefit being purchased.
    pub benefit: BenefitKind,
    /// Duration tier, set iff `benefit` is `FeatureListing`.
    pub package_id: Option<String>,
    /// Target listing, set iff `benefit` is `FeatureListing`.
    pub target_listing_id: Option<String>,
    /// Creation timestamp (Unix seconds).
    pub created_at: u64,
    /// Resolution timestamp, set exactly once.
    pub resolved_at: Option<u64>,
}

impl Transaction {
    /// Generate a fresh transaction id.
    #[must_use]
    pub fn new_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Whether this transaction has reached a terminal status.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.status.is_resolved()
    }

    /// The resource this transaction's benefit lands on: the target listing
    /// for featured placement, the payer's own account for a subscription.
    #[must_use]
    pub fn benefit_target(&self) -> &str {
        match self.benefit {
            BenefitKind::FeatureListing => self
                .target_listing_id
                .as_deref()
                .unwrap_or(&self.payer_id),
            BenefitKind::Subscription => &self.payer_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_transaction() -> Transaction {
        Transaction {
            id: Transaction::new_id(),
            payer_id: "acct_a".to_string(),
            amount_cents: 500,
            currency: "usd".to_string(),
            channel: PaymentChannel::manual("bank_transfer"),
            reference: "TID123".to_string(),
            proof_url: Some("https://cdn.example.com/proof.png".to_string()),
            status: TransactionStatus::Pending,
            benefit: BenefitKind::FeatureListing,
            package_id: Some("short".to_string()),
            target_listing_id: Some("listing_1".to_string()),
            created_at: 1_700_000_000,
            resolved_at: None,
        }
    }

    #[test]
    fn test_status_transitions_are_terminal() {
        assert!(!TransactionStatus::Pending.is_resolved());
        assert!(TransactionStatus::Approved.is_resolved());
        assert!(TransactionStatus::Rejected.is_resolved());
    }

    #[test]
    fn test_enum_display() {
        assert_eq!(TransactionStatus::Approved.to_string(), "approved");
        assert_eq!(BenefitKind::FeatureListing.to_string(), "feature_listing");
        assert_eq!(PaymentChannel::Gateway.to_string(), "gateway");
        assert_eq!(
            PaymentChannel::manual("bank_transfer").to_string(),
            "manual:bank_transfer"
        );
    }

    #[test]
    fn test_serde_round_trip() {
        let txn = sample_transaction();
        let json = serde_json::to_string(&txn).unwrap();
        assert!(json.contains("\"status\":\"pending\""));
        assert!(json.contains("\"benefit\":\"feature_listing\""));

        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, txn);
    }

    #[test]
    fn test_unique_ids() {
        assert_ne!(Transaction::new_id(), Transaction::new_id());
    }
}
