//! Storage traits for ledger and promotion data.
//!
//! Implement these traits to persist state to your database. The in-memory
//! implementations in [`memory`] are suitable for development, testing, and
//! single-instance deployments.
//!
//! Two operations carry the subsystem's race guarantees and MUST be atomic in
//! any implementation:
//!
//! - [`LedgerStore::create_if_reference_absent`] — check-and-insert under one
//!   lock (or a unique index), so concurrent gateway confirmations sharing a
//!   reference produce exactly one row.
//! - [`LedgerStore::resolve_transaction`] — compare-and-swap on the pending
//!   status, so concurrent decisions produce exactly one transition.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::transaction::{Transaction, TransactionStatus};

/// Outcome of an insert-if-reference-absent attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceInsert {
    /// The reference was new; the transaction was stored.
    Created,
    /// A transaction with this reference already exists; nothing was written.
    Existing(Transaction),
}

/// Outcome of a compare-and-swap status resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// This call won the transition; the stored transaction is returned.
    Resolved(Transaction),
    /// The transaction was already resolved; the stored row is returned
    /// unchanged.
    AlreadyResolved(Transaction),
    /// No transaction with that id.
    NotFound,
}

/// Trait for storing ledger transactions.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Store a new transaction.
    async fn create_transaction(&self, transaction: &Transaction) -> Result<()>;

    /// Store `transaction` only if no gateway-channel row carries its
    /// `reference` yet. Manual references are user-typed and do not
    /// participate in the uniqueness rule.
    ///
    /// This is the serialization point for concurrent gateway confirmations:
    /// exactly one caller observes [`ReferenceInsert::Created`]; every other
    /// caller gets the existing row back.
    async fn create_if_reference_absent(&self, transaction: &Transaction)
        -> Result<ReferenceInsert>;

    /// Get a transaction by id.
    async fn get_transaction(&self, transaction_id: &str) -> Result<Option<Transaction>>;

    /// Find a transaction by its external reference.
    async fn find_by_reference(&self, reference: &str) -> Result<Option<Transaction>>;

    /// All pending transactions, oldest first (the review queue).
    async fn list_pending(&self) -> Result<Vec<Transaction>>;

    /// Transition a pending transaction to a terminal status.
    ///
    /// The swap only applies when the stored status is still `Pending`;
    /// concurrent decisions serialize here and exactly one wins.
    async fn resolve_transaction(
        &self,
        transaction_id: &str,
        to: TransactionStatus,
        now: u64,
    ) -> Result<ResolveOutcome>;

    /// Put a resolved transaction back to `Pending`, clearing its resolution
    /// timestamp. Used only to roll back a status flip whose benefit
    /// application failed.
    async fn reopen_transaction(&self, transaction_id: &str) -> Result<()>;

    /// Delete a transaction. Used only to compensate a gateway-path insert
    /// whose benefit application failed, so a caller retry replays the whole
    /// confirmation.
    async fn remove_transaction(&self, transaction_id: &str) -> Result<()>;
}

/// Promotion window embedded on a target resource.
///
/// The flag alone is never authoritative: a true flag with a past or absent
/// expiry reads as inactive everywhere (see
/// [`is_currently_promoted`](crate::promotion::is_currently_promoted)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PromotionState {
    /// Stored promotion flag.
    pub flagged: bool,
    /// Window end (Unix seconds). Cleared together with the flag on
    /// revocation so a later extension never resurrects a revoked window.
    pub expires_at: Option<u64>,
}

impl PromotionState {
    /// The unpromoted state: flag and expiry both cleared.
    #[must_use]
    pub fn inactive() -> Self {
        Self::default()
    }

    /// An active window ending at `expires_at`.
    #[must_use]
    pub fn active_until(expires_at: u64) -> Self {
        Self {
            flagged: true,
            expires_at: Some(expires_at),
        }
    }

    /// Whether the window is live at `now`. False for a flagged row whose
    /// expiry is past or missing.
    #[must_use]
    pub fn is_active_at(&self, now: u64) -> bool {
        self.flagged && self.expires_at.is_some_and(|e| e > now)
    }
}

/// Lifecycle state of a listing, as managed by the (external) listings
/// service. Only `Approved` listings are promotable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingLifecycle {
    /// Awaiting moderation.
    PendingReview,
    /// Publicly visible.
    Approved,
    /// Rejected by moderation.
    Rejected,
}

impl ListingLifecycle {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingReview => "pending_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for ListingLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The slice of a listing the ledger needs: ownership, lifecycle, and the
/// embedded promotion window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    /// Listing id.
    pub id: String,
    /// Owning account.
    pub owner_id: String,
    /// Moderation lifecycle state.
    pub lifecycle: ListingLifecycle,
    /// Embedded promotion window.
    pub promotion: PromotionState,
}

/// Trait for reading targets and writing their promotion windows.
///
/// Listing CRUD itself belongs to the listings service; the ledger only
/// reads the fields it validates against and writes the promotion window.
#[async_trait]
pub trait PromotionStore: Send + Sync {
    /// Get a listing by id.
    async fn get_listing(&self, listing_id: &str) -> Result<Option<ListingRecord>>;

    /// Write a listing's promotion window.
    async fn set_listing_promotion(
        &self,
        listing_id: &str,
        promotion: &PromotionState,
    ) -> Result<()>;

    /// Listings whose stored flag is raised, regardless of expiry. Input to
    /// the normalization sweep and to featured queries (which re-derive
    /// liveness).
    async fn flagged_listings(&self) -> Result<Vec<ListingRecord>>;

    /// Subscription window for an account. Unknown accounts read as the
    /// inactive state.
    async fn get_subscription(&self, account_id: &str) -> Result<PromotionState>;

    /// Write an account's subscription window.
    async fn set_subscription(&self, account_id: &str, promotion: &PromotionState) -> Result<()>;

    /// Accounts whose stored subscription flag is raised, regardless of
    /// expiry.
    async fn flagged_subscriptions(&self) -> Result<Vec<(String, PromotionState)>>;
}

/// In-memory store implementations.
pub mod memory {
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    use super::*;

    /// In-memory ledger store.
    ///
    /// A single mutex guards the transaction table, so check-and-insert and
    /// compare-and-swap each run under one critical section. Cloning shares
    /// the table.
    #[derive(Clone, Default)]
    pub struct MemoryLedgerStore {
        inner: Arc<Mutex<HashMap<String, Transaction>>>,
    }

    impl MemoryLedgerStore {
        /// Create a new empty store.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of stored transactions (for tests).
        pub async fn len(&self) -> usize {
            self.inner.lock().await.len()
        }

        /// Whether the store is empty (for tests).
        pub async fn is_empty(&self) -> bool {
            self.inner.lock().await.is_empty()
        }
    }

    #[async_trait]
    impl LedgerStore for MemoryLedgerStore {
        async fn create_transaction(&self, transaction: &Transaction) -> Result<()> {
            self.inner
                .lock()
                .await
                .insert(transaction.id.clone(), transaction.clone());
            Ok(())
        }

        async fn create_if_reference_absent(
            &self,
            transaction: &Transaction,
        ) -> Result<ReferenceInsert> {
            let mut transactions = self.inner.lock().await;

            if let Some(existing) = transactions
                .values()
                .find(|t| t.channel.is_gateway() && t.reference == transaction.reference)
            {
                return Ok(ReferenceInsert::Existing(existing.clone()));
            }

            transactions.insert(transaction.id.clone(), transaction.clone());
            Ok(ReferenceInsert::Created)
        }

        async fn get_transaction(&self, transaction_id: &str) -> Result<Option<Transaction>> {
            Ok(self.inner.lock().await.get(transaction_id).cloned())
        }

        async fn find_by_reference(&self, reference: &str) -> Result<Option<Transaction>> {
            Ok(self
                .inner
                .lock()
                .await
                .values()
                .find(|t| t.reference == reference)
                .cloned())
        }

        async fn list_pending(&self) -> Result<Vec<Transaction>> {
            let transactions = self.inner.lock().await;
            let mut pending: Vec<Transaction> = transactions
                .values()
                .filter(|t| t.status == TransactionStatus::Pending)
                .cloned()
                .collect();
            pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
            Ok(pending)
        }

        async fn resolve_transaction(
            &self,
            transaction_id: &str,
            to: TransactionStatus,
            now: u64,
        ) -> Result<ResolveOutcome> {
            let mut transactions = self.inner.lock().await;

            let Some(stored) = transactions.get_mut(transaction_id) else {
                return Ok(ResolveOutcome::NotFound);
            };

            if stored.status != TransactionStatus::Pending {
                return Ok(ResolveOutcome::AlreadyResolved(stored.clone()));
            }

            stored.status = to;
            stored.resolved_at = Some(now);
            Ok(ResolveOutcome::Resolved(stored.clone()))
        }

        async fn reopen_transaction(&self, transaction_id: &str) -> Result<()> {
            let mut transactions = self.inner.lock().await;
            match transactions.get_mut(transaction_id) {
                Some(stored) => {
                    stored.status = TransactionStatus::Pending;
                    stored.resolved_at = None;
                    Ok(())
                }
                None => Err(crate::error::LedgerError::not_found(format!(
                    "transaction '{}'",
                    transaction_id
                ))),
            }
        }

        async fn remove_transaction(&self, transaction_id: &str) -> Result<()> {
            self.inner.lock().await.remove(transaction_id);
            Ok(())
        }
    }

    #[derive(Default)]
    struct PromotionTables {
        listings: HashMap<String, ListingRecord>,
        subscriptions: HashMap<String, PromotionState>,
    }

    /// In-memory promotion store.
    ///
    /// Cloning shares the tables.
    #[derive(Clone, Default)]
    pub struct MemoryPromotionStore {
        inner: Arc<Mutex<PromotionTables>>,
    }

    impl MemoryPromotionStore {
        /// Create a new empty store.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed a listing (normally owned by the listings service).
        pub async fn insert_listing(&self, listing: ListingRecord) {
            self.inner
                .lock()
                .await
                .listings
                .insert(listing.id.clone(), listing);
        }
    }

    #[async_trait]
    impl PromotionStore for MemoryPromotionStore {
        async fn get_listing(&self, listing_id: &str) -> Result<Option<ListingRecord>> {
            Ok(self.inner.lock().await.listings.get(listing_id).cloned())
        }

        async fn set_listing_promotion(
            &self,
            listing_id: &str,
            promotion: &PromotionState,
        ) -> Result<()> {
            let mut tables = self.inner.lock().await;
            match tables.listings.get_mut(listing_id) {
                Some(listing) => {
                    listing.promotion = *promotion;
                    Ok(())
                }
                None => Err(crate::error::LedgerError::not_found(format!(
                    "listing '{}'",
                    listing_id
                ))),
            }
        }

        async fn flagged_listings(&self) -> Result<Vec<ListingRecord>> {
            Ok(self
                .inner
                .lock()
                .await
                .listings
                .values()
                .filter(|l| l.promotion.flagged)
                .cloned()
                .collect())
        }

        async fn get_subscription(&self, account_id: &str) -> Result<PromotionState> {
            Ok(self
                .inner
                .lock()
                .await
                .subscriptions
                .get(account_id)
                .copied()
                .unwrap_or_default())
        }

        async fn set_subscription(
            &self,
            account_id: &str,
            promotion: &PromotionState,
        ) -> Result<()> {
            self.inner
                .lock()
                .await
                .subscriptions
                .insert(account_id.to_string(), *promotion);
            Ok(())
        }

        async fn flagged_subscriptions(&self) -> Result<Vec<(String, PromotionState)>> {
            Ok(self
                .inner
                .lock()
                .await
                .subscriptions
                .iter()
                .filter(|(_, s)| s.flagged)
                .map(|(id, s)| (id.clone(), *s))
                .collect())
        }
    }
}
