//! Feature-listing package tiers.
//!
//! A package maps a named duration tier to both its price and its window
//! length. Price and duration live in the same [`PackageConfig`] so the two
//! can never diverge for a tier: the amount charged at intake and the window
//! granted at approval come from one lookup.
//!
//! ```rust
//! use pawledger::packages::Packages;
//!
//! let packages = Packages::builder()
//!     .package("short")
//!         .price_cents(500)
//!         .duration_days(7)
//!         .done()
//!     .package("medium")
//!         .price_cents(900)
//!         .duration_days(14)
//!         .done()
//!     .package("long")
//!         .price_cents(1800)
//!         .duration_days(30)
//!         .done()
//!     .build();
//!
//! assert_eq!(packages.get("short").unwrap().price_cents, 500);
//! ```

use std::collections::HashMap;

/// A collection of package configurations, keyed by tier id.
#[derive(Clone, Debug, Default)]
pub struct Packages {
    packages: HashMap<String, PackageConfig>,
}

impl Packages {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for constructing packages.
    #[must_use]
    pub fn builder() -> PackagesBuilder {
        PackagesBuilder::new()
    }

    /// Add a single package config.
    pub fn add(&mut self, config: PackageConfig) {
        self.packages.insert(config.id.clone(), config);
    }

    /// Get a package by tier id.
    #[must_use]
    pub fn get(&self, package_id: &str) -> Option<&PackageConfig> {
        self.packages.get(package_id)
    }

    /// Check if a tier exists.
    #[must_use]
    pub fn contains(&self, package_id: &str) -> bool {
        self.packages.contains_key(package_id)
    }

    /// Get all tier ids.
    #[must_use]
    pub fn package_ids(&self) -> Vec<&str> {
        self.packages.keys().map(|s| s.as_str()).collect()
    }

    /// Get the number of tiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Check if there are no tiers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Iterate over all tiers.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PackageConfig)> {
        self.packages.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Configuration for a single duration tier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageConfig {
    /// Tier identifier (e.g., "short", "medium", "long").
    pub id: String,
    /// Price in cents. This is the canonical amount; client-submitted amounts
    /// are informational only.
    pub price_cents: i64,
    /// Length of the featured window in days.
    pub duration_days: u32,
    /// Display name for the tier.
    pub display_name: Option<String>,
}

impl PackageConfig {
    /// Window length in seconds.
    #[must_use]
    pub fn duration_secs(&self) -> u64 {
        u64::from(self.duration_days) * 86_400
    }
}

/// Builder for constructing a collection of packages.
#[derive(Debug, Default)]
pub struct PackagesBuilder {
    packages: HashMap<String, PackageConfig>,
}

impl PackagesBuilder {
    /// Create a new packages builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start defining a new tier.
    #[must_use]
    pub fn package(self, id: &str) -> PackageBuilder {
        PackageBuilder {
            parent: self,
            id: id.to_string(),
            price_cents: 0,
            duration_days: 0,
            display_name: None,
        }
    }

    /// Build the packages collection.
    #[must_use]
    pub fn build(self) -> Packages {
        Packages {
            packages: self.packages,
        }
    }

    fn add_package(mut self, config: PackageConfig) -> Self {
        self.packages.insert(config.id.clone(), config);
        self
    }
}

/// Builder for a single tier configuration.
#[derive(Debug)]
pub struct PackageBuilder {
    parent: PackagesBuilder,
    id: String,
    price_cents: i64,
    duration_days: u32,
    display_name: Option<String>,
}

impl PackageBuilder {
    /// Set the tier price in cents.
    #[must_use]
    pub fn price_cents(mut self, cents: i64) -> Self {
        self.price_cents = cents;
        self
    }

    /// Set the featured window length in days.
    #[must_use]
    pub fn duration_days(mut self, days: u32) -> Self {
        self.duration_days = days;
        self
    }

    /// Set the display name.
    #[must_use]
    pub fn display_name(mut self, name: &str) -> Self {
        self.display_name = Some(name.to_string());
        self
    }

    /// Finish this tier and return to the packages builder.
    #[must_use]
    pub fn done(self) -> PackagesBuilder {
        self.parent.add_package(PackageConfig {
            id: self.id,
            price_cents: self.price_cents,
            duration_days: self.duration_days,
            display_name: self.display_name,
        })
    }
}
