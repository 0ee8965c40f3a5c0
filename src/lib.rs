//! Pawledger - the monetization ledger for a pet marketplace
//!
//! Pawledger verifies payment for promotional benefits (featured listing
//! placement, vet subscriptions) and applies time-bounded benefits to target
//! resources exactly once. Payments arrive through two intake paths with
//! different trust models that converge on one benefit applier:
//!
//! - **Gateway**: the processor settles the payment; confirmation pulls the
//!   authoritative state from the gateway and records an already-approved
//!   transaction, idempotently per payment reference.
//! - **Manual**: the payer submits an out-of-band transfer id; a privileged
//!   reviewer approves or rejects the pending transaction exactly once.
//!
//! Benefit expiry is derived at read time from the stored window and an
//! injected clock; no scheduler retracts expired benefits.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pawledger::{
//!     CheckoutManager, LedgerConfig, ManualIntake, Packages, PromotionManager,
//!     ReviewManager,
//! };
//! use pawledger::storage::memory::{MemoryLedgerStore, MemoryPromotionStore};
//! use pawledger::testing::MockGateway;
//!
//! #[tokio::main]
//! async fn main() {
//!     pawledger::init_tracing();
//!
//!     let packages = Packages::builder()
//!         .package("short")
//!             .price_cents(500)
//!             .duration_days(7)
//!             .done()
//!         .package("long")
//!             .price_cents(1800)
//!             .duration_days(30)
//!             .done()
//!         .build();
//!     let config = LedgerConfig::builder().from_env().build();
//!
//!     let ledger = MemoryLedgerStore::new();
//!     let promotions = MemoryPromotionStore::new();
//!
//!     let checkout = CheckoutManager::new(
//!         ledger.clone(),
//!         promotions.clone(),
//!         MockGateway::new(),
//!         packages.clone(),
//!         config.clone(),
//!     );
//!     let manual = ManualIntake::new(
//!         ledger.clone(),
//!         promotions.clone(),
//!         packages.clone(),
//!         config.clone(),
//!     );
//!     let review = ReviewManager::new(ledger, promotions.clone(), packages, config);
//!     let queries = PromotionManager::new(promotions);
//!     let _ = (checkout, manual, review, queries);
//! }
//! ```

#![allow(async_fn_in_trait)]

pub mod applier;
pub mod audit;
pub mod checkout;
pub mod clock;
mod config;
mod error;
pub mod gateway;
pub mod manual;
pub mod packages;
pub mod promotion;
pub mod review;
pub mod storage;
pub mod testing;
pub mod transaction;
pub mod validation;

// Re-exports for public API
pub use applier::{extended_expiry, BenefitApplier};
pub use audit::{LedgerAuditEvent, LedgerAuditLogger, NoOpAuditLogger, TracingAuditLogger};
pub use checkout::{CheckoutManager, ConfirmOutcome, ConfirmRequest};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{LedgerConfig, LedgerConfigBuilder};
pub use error::{LedgerError, Result};
pub use gateway::{GatewaySession, PaymentGateway, Settlement, SettlementState};
pub use manual::{ManualIntake, SubmitRequest};
pub use packages::{PackageBuilder, PackageConfig, Packages, PackagesBuilder};
pub use promotion::{is_currently_promoted, NormalizeReport, PromotionManager};
pub use review::{Actor, ActorRole, Decision, DecisionOutcome, ReviewManager};
pub use storage::{
    LedgerStore, ListingLifecycle, ListingRecord, PromotionState, PromotionStore,
    ReferenceInsert, ResolveOutcome,
};
pub use transaction::{BenefitKind, PaymentChannel, Transaction, TransactionStatus};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging with sensible defaults
///
/// This should be called early in your application, typically in main().
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "pawledger=debug")
/// - `PAWLEDGER_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("PAWLEDGER_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
