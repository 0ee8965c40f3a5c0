//! Test doubles for the gateway boundary and the audit sink.
//!
//! These are real implementations of the crate's traits, exported
//! unconditionally so downstream crates can drive their own tests with them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::audit::{LedgerAuditEvent, LedgerAuditLogger};
use crate::error::Result;
use crate::gateway::{GatewaySession, PaymentGateway, Settlement, SettlementState};

/// Scriptable payment gateway.
///
/// Settlements are seeded per reference; unknown references report as still
/// pending with nothing captured. An optional lookup delay simulates a slow
/// processor for timeout tests. Cloning shares the scripted state.
#[derive(Clone, Default)]
pub struct MockGateway {
    inner: Arc<Mutex<MockGatewayState>>,
}

#[derive(Default)]
struct MockGatewayState {
    settlements: HashMap<String, Settlement>,
    sessions: Vec<(i64, String)>,
    lookup_delay: Option<Duration>,
}

impl MockGateway {
    /// Create a new mock gateway with no scripted settlements.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful settlement for `reference`.
    pub async fn settle(&self, reference: &str, amount_cents: i64, currency: &str) {
        self.set_settlement(reference, SettlementState::Succeeded, amount_cents, currency)
            .await;
    }

    /// Script an arbitrary settlement state for `reference`.
    pub async fn set_settlement(
        &self,
        reference: &str,
        state: SettlementState,
        amount_cents: i64,
        currency: &str,
    ) {
        self.inner.lock().await.settlements.insert(
            reference.to_string(),
            Settlement {
                state,
                settled_amount_cents: amount_cents,
                currency: currency.to_string(),
            },
        );
    }

    /// Delay every settlement lookup by `delay`.
    pub async fn set_lookup_delay(&self, delay: Duration) {
        self.inner.lock().await.lookup_delay = Some(delay);
    }

    /// Sessions opened via `initiate`, as `(amount_cents, currency)` pairs.
    pub async fn initiated_sessions(&self) -> Vec<(i64, String)> {
        self.inner.lock().await.sessions.clone()
    }
}

impl PaymentGateway for MockGateway {
    async fn initiate(&self, amount_cents: i64, currency: &str) -> Result<GatewaySession> {
        let mut state = self.inner.lock().await;
        state.sessions.push((amount_cents, currency.to_string()));

        let n = state.sessions.len();
        Ok(GatewaySession {
            session_id: format!("sess_{}", n),
            client_secret: format!("secret_{}", uuid::Uuid::new_v4()),
        })
    }

    async fn settlement_status(&self, reference: &str) -> Result<Settlement> {
        let (settlement, delay) = {
            let state = self.inner.lock().await;
            (
                state.settlements.get(reference).cloned(),
                state.lookup_delay,
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        Ok(settlement.unwrap_or(Settlement {
            state: SettlementState::Pending,
            settled_amount_cents: 0,
            currency: String::new(),
        }))
    }
}

/// Audit logger that captures events for assertions.
#[derive(Clone, Default)]
pub struct CapturingAuditLogger {
    events: Arc<Mutex<Vec<LedgerAuditEvent>>>,
}

impl CapturingAuditLogger {
    /// Create a new capturing logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events logged so far, in order.
    pub async fn events(&self) -> Vec<LedgerAuditEvent> {
        self.events.lock().await.clone()
    }
}

impl LedgerAuditLogger for CapturingAuditLogger {
    async fn log(&self, event: LedgerAuditEvent) {
        self.events.lock().await.push(event);
    }
}
