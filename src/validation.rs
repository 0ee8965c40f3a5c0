//! Input validation for ledger operations.
//!
//! Validation failures are always pre-write: nothing reaches a store until
//! every field has passed.

use url::Url;

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::packages::Packages;
use crate::storage::{ListingLifecycle, PromotionStore};
use crate::transaction::BenefitKind;

/// Maximum length for account and listing ids.
const MAX_ID_LENGTH: usize = 256;

/// Maximum length for package ids.
const MAX_PACKAGE_ID_LENGTH: usize = 64;

/// Maximum length for external references.
const MAX_REFERENCE_LENGTH: usize = 256;

/// Maximum length for manual channel names.
const MAX_CHANNEL_LENGTH: usize = 64;

/// Validate an account or listing id.
///
/// Ids must be non-empty, at most 256 characters, and contain only
/// alphanumeric characters, underscores, and hyphens.
pub fn validate_id(field: &str, id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(LedgerError::validation(format!("{} cannot be empty", field)));
    }
    if id.len() > MAX_ID_LENGTH {
        return Err(LedgerError::validation(format!(
            "{} exceeds maximum length of {}",
            field, MAX_ID_LENGTH
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(LedgerError::validation(format!(
            "{} contains invalid characters (only alphanumeric, underscore, and hyphen allowed)",
            field
        )));
    }
    Ok(())
}

/// Validate a package tier id.
pub fn validate_package_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(LedgerError::validation("package_id cannot be empty"));
    }
    if id.len() > MAX_PACKAGE_ID_LENGTH {
        return Err(LedgerError::validation(format!(
            "package_id exceeds maximum length of {}",
            MAX_PACKAGE_ID_LENGTH
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(LedgerError::validation(
            "package_id contains invalid characters",
        ));
    }
    Ok(())
}

/// Validate an external payment reference (gateway payment id or user-typed
/// transfer id). References carry looser charset rules than ids but must
/// stay printable and bounded.
pub fn validate_reference(reference: &str) -> Result<()> {
    if reference.trim().is_empty() {
        return Err(LedgerError::validation("reference cannot be empty"));
    }
    if reference.len() > MAX_REFERENCE_LENGTH {
        return Err(LedgerError::validation(format!(
            "reference exceeds maximum length of {}",
            MAX_REFERENCE_LENGTH
        )));
    }
    if reference.chars().any(|c| c.is_control()) {
        return Err(LedgerError::validation(
            "reference contains control characters",
        ));
    }
    Ok(())
}

/// Validate a manual payment channel name.
pub fn validate_channel(channel: &str) -> Result<()> {
    if channel.is_empty() {
        return Err(LedgerError::validation("channel cannot be empty"));
    }
    if channel.len() > MAX_CHANNEL_LENGTH {
        return Err(LedgerError::validation(format!(
            "channel exceeds maximum length of {}",
            MAX_CHANNEL_LENGTH
        )));
    }
    if !channel
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(LedgerError::validation(
            "channel contains invalid characters",
        ));
    }
    Ok(())
}

/// Validate an amount in cents.
pub fn validate_amount_cents(amount_cents: i64) -> Result<()> {
    if amount_cents <= 0 {
        return Err(LedgerError::validation("amount must be positive"));
    }
    Ok(())
}

/// Validate a currency code (lowercase ISO 4217 shape).
pub fn validate_currency(currency: &str) -> Result<()> {
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_lowercase()) {
        return Err(LedgerError::validation(format!(
            "currency '{}' must be a lowercase 3-letter code",
            currency
        )));
    }
    Ok(())
}

/// Validate a payment-proof URL.
///
/// Proof links are shown to reviewers, so they must parse and must be HTTPS.
pub fn validate_proof_url(url: &str) -> Result<()> {
    let parsed =
        Url::parse(url).map_err(|e| LedgerError::validation(format!("invalid proof URL: {}", e)))?;

    if parsed.scheme() != "https" {
        return Err(LedgerError::validation("proof URL must use HTTPS"));
    }

    if parsed.host_str().is_none() {
        return Err(LedgerError::validation("proof URL must have a host"));
    }

    Ok(())
}

/// Validate that a benefit request is well-formed and its target is eligible.
///
/// Both intake paths run this before writing anything:
/// - `FeatureListing` requires a package and a target listing that exists
///   (`NotFound`), is owned by the payer (`Unauthorized`), and is already
///   publicly approved (`InvalidTargetState`).
/// - `Subscription` applies to the payer's own account and carries neither a
///   package nor a target.
pub async fn validate_benefit_request<P: PromotionStore>(
    promotions: &P,
    payer_id: &str,
    benefit: BenefitKind,
    target_listing_id: Option<&str>,
    package_id: Option<&str>,
) -> Result<()> {
    match benefit {
        BenefitKind::FeatureListing => {
            let package_id = package_id.ok_or_else(|| {
                LedgerError::validation("feature_listing requires a package_id")
            })?;
            validate_package_id(package_id)?;

            let listing_id = target_listing_id.ok_or_else(|| {
                LedgerError::validation("feature_listing requires a target_listing_id")
            })?;
            validate_id("target_listing_id", listing_id)?;

            let listing = promotions
                .get_listing(listing_id)
                .await?
                .ok_or_else(|| LedgerError::not_found(format!("listing '{}'", listing_id)))?;

            if listing.owner_id != payer_id {
                return Err(LedgerError::unauthorized(format!(
                    "listing '{}' belongs to another account",
                    listing_id
                )));
            }

            if listing.lifecycle != ListingLifecycle::Approved {
                return Err(LedgerError::invalid_target_state(format!(
                    "listing '{}' is {}",
                    listing_id, listing.lifecycle
                )));
            }

            Ok(())
        }
        BenefitKind::Subscription => {
            if package_id.is_some() {
                return Err(LedgerError::validation(
                    "subscription does not take a package_id",
                ));
            }
            if target_listing_id.is_some() {
                return Err(LedgerError::validation(
                    "subscription does not take a target_listing_id",
                ));
            }
            Ok(())
        }
    }
}

/// The server-computed price for a benefit, in cents.
///
/// This is the only amount the ledger ever records; client-submitted amounts
/// are informational. Feature-listing prices come from the same
/// [`PackageConfig`](crate::packages::PackageConfig) that sizes the window.
pub fn canonical_amount_cents(
    packages: &Packages,
    config: &LedgerConfig,
    benefit: BenefitKind,
    package_id: Option<&str>,
) -> Result<i64> {
    match benefit {
        BenefitKind::FeatureListing => {
            let package_id = package_id.ok_or_else(|| {
                LedgerError::validation("feature_listing requires a package_id")
            })?;
            let package = packages.get(package_id).ok_or_else(|| {
                LedgerError::validation(format!("unknown package '{}'", package_id))
            })?;
            Ok(package.price_cents)
        }
        BenefitKind::Subscription => Ok(config.subscription_price_cents),
    }
}
