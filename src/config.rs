//! Ledger configuration.
//!
//! Holds the settings that are not per-package: the currency the ledger
//! operates in, subscription pricing, and the gateway round-trip bound.
//! Feature-listing tiers live in [`Packages`](crate::packages::Packages).

use serde::{Deserialize, Serialize};

/// Configuration for the monetization ledger.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LedgerConfig {
    /// Currency code all prices are denominated in (lowercase ISO 4217).
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Price of a vet subscription in cents.
    #[serde(default = "default_subscription_price_cents")]
    pub subscription_price_cents: i64,
    /// Length of a subscription window in days.
    #[serde(default = "default_subscription_duration_days")]
    pub subscription_duration_days: u32,
    /// Upper bound on a gateway settlement lookup, in seconds. A lookup that
    /// exceeds this reads as not-settled.
    #[serde(default = "default_gateway_timeout_secs")]
    pub gateway_timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            subscription_price_cents: default_subscription_price_cents(),
            subscription_duration_days: default_subscription_duration_days(),
            gateway_timeout_secs: default_gateway_timeout_secs(),
        }
    }
}

fn default_currency() -> String {
    "usd".to_string()
}

fn default_subscription_price_cents() -> i64 {
    1_000
}

fn default_subscription_duration_days() -> u32 {
    30
}

fn default_gateway_timeout_secs() -> u64 {
    10
}

impl LedgerConfig {
    /// Create a builder for constructing a configuration.
    #[must_use]
    pub fn builder() -> LedgerConfigBuilder {
        LedgerConfigBuilder::default()
    }

    /// Subscription window length in seconds.
    #[must_use]
    pub fn subscription_duration_secs(&self) -> u64 {
        u64::from(self.subscription_duration_days) * 86_400
    }
}

/// Builder for [`LedgerConfig`].
///
/// # Environment Variables
///
/// `from_env` reads:
/// - `PAWLEDGER_CURRENCY`
/// - `PAWLEDGER_SUBSCRIPTION_PRICE_CENTS`
/// - `PAWLEDGER_SUBSCRIPTION_DURATION_DAYS`
/// - `PAWLEDGER_GATEWAY_TIMEOUT_SECS`
#[derive(Debug, Default)]
pub struct LedgerConfigBuilder {
    config: Option<LedgerConfig>,
}

impl LedgerConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn config_mut(&mut self) -> &mut LedgerConfig {
        self.config.get_or_insert_with(LedgerConfig::default)
    }

    /// Overlay values from `PAWLEDGER_*` environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        let config = self.config_mut();

        if let Ok(currency) = std::env::var("PAWLEDGER_CURRENCY") {
            config.currency = currency.to_lowercase();
        }
        if let Some(price) = parse_env("PAWLEDGER_SUBSCRIPTION_PRICE_CENTS") {
            config.subscription_price_cents = price;
        }
        if let Some(days) = parse_env("PAWLEDGER_SUBSCRIPTION_DURATION_DAYS") {
            config.subscription_duration_days = days;
        }
        if let Some(secs) = parse_env("PAWLEDGER_GATEWAY_TIMEOUT_SECS") {
            config.gateway_timeout_secs = secs;
        }

        self
    }

    #[must_use]
    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.config_mut().currency = currency.into().to_lowercase();
        self
    }

    #[must_use]
    pub fn subscription_price_cents(mut self, cents: i64) -> Self {
        self.config_mut().subscription_price_cents = cents;
        self
    }

    #[must_use]
    pub fn subscription_duration_days(mut self, days: u32) -> Self {
        self.config_mut().subscription_duration_days = days;
        self
    }

    #[must_use]
    pub fn gateway_timeout_secs(mut self, secs: u64) -> Self {
        self.config_mut().gateway_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn build(self) -> LedgerConfig {
        self.config.unwrap_or_default()
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
