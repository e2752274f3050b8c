//! Account insurance.
//!
//! Adds a monthly premium to the chain's fees and lets the holder file claims
//! against a per-claim coverage limit. Each tier covers every claim type of
//! the tier below it.

use crate::account::Account;
use crate::layer::{find_layer_mut, Feature, FeatureLayer, LayerKind};
use crate::ledger::Reference;
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// What a claim is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    /// Unauthorized transactions
    Fraud,
    /// Stolen card
    CardTheft,
    /// Stolen identity
    IdentityTheft,
    /// Damaged or undelivered purchases
    PurchaseProtection,
    /// Incidents while travelling
    TravelIncident,
}

impl fmt::Display for ClaimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Fraud => "fraud",
            Self::CardTheft => "card theft",
            Self::IdentityTheft => "identity theft",
            Self::PurchaseProtection => "purchase protection",
            Self::TravelIncident => "travel incident",
        };
        f.write_str(label)
    }
}

/// Insurance plans
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsuranceTier {
    /// Fraud and card theft
    Basic,
    /// Basic plus identity theft and purchase protection
    Standard,
    /// Everything
    Premium,
}

impl InsuranceTier {
    /// Monthly premium
    #[must_use]
    pub const fn premium(self) -> Money {
        match self {
            Self::Basic => Money::new(1_000),
            Self::Standard => Money::new(2_500),
            Self::Premium => Money::new(5_000),
        }
    }

    /// Maximum payout per claim
    #[must_use]
    pub const fn coverage_limit(self) -> Money {
        match self {
            Self::Basic => Money::new(1_000_000),
            Self::Standard => Money::new(5_000_000),
            Self::Premium => Money::new(20_000_000),
        }
    }

    /// Lowest tier that covers `kind`
    #[must_use]
    pub const fn minimum_for(kind: ClaimType) -> Self {
        match kind {
            ClaimType::Fraud | ClaimType::CardTheft => Self::Basic,
            ClaimType::IdentityTheft | ClaimType::PurchaseProtection => Self::Standard,
            ClaimType::TravelIncident => Self::Premium,
        }
    }

    /// Whether the tier covers `kind`
    #[must_use]
    pub fn covers(self, kind: ClaimType) -> bool {
        self >= Self::minimum_for(kind)
    }
}

impl fmt::Display for InsuranceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Basic => "Basic",
            Self::Standard => "Standard",
            Self::Premium => "Premium",
        };
        f.write_str(label)
    }
}

/// Approved claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Claim reference
    pub reference: Reference,
    /// Claim type
    pub kind: ClaimType,
    /// Amount asked for
    pub requested: Money,
    /// Amount approved, capped at the coverage limit
    pub approved: Money,
    /// When the claim was filed
    pub filed_at: DateTime<Utc>,
}

/// Reasons a claim is refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimError {
    /// Claimed amount is zero or negative
    #[error("Invalid claim amount {amount}: must be greater than zero")]
    InvalidAmount {
        /// Rejected amount
        amount: Money,
    },

    /// The plan does not cover this claim type
    #[error("{tier} insurance does not cover {kind}")]
    NotCovered {
        /// Plan of the account
        tier: InsuranceTier,
        /// Claim type asked for
        kind: ClaimType,
    },

    /// The account carries no insurance layer
    #[error("Account has no insurance layer")]
    NoInsurance,
}

/// Insurance feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insurance {
    tier: InsuranceTier,
    claims: Vec<Claim>,
}

impl Insurance {
    /// Insures the account under `tier`
    #[must_use]
    pub const fn new(tier: InsuranceTier) -> Self {
        Self {
            tier,
            claims: Vec::new(),
        }
    }

    /// Plan of the account
    #[must_use]
    pub const fn tier(&self) -> InsuranceTier {
        self.tier
    }

    /// Approved claims, oldest first
    #[must_use]
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// Sum of every approved payout
    #[must_use]
    pub fn total_approved(&self) -> Money {
        self.claims.iter().map(|claim| claim.approved).sum()
    }

    /// Whether the plan covers `kind`
    #[must_use]
    pub fn is_covered(&self, kind: ClaimType) -> bool {
        self.tier.covers(kind)
    }

    fn file(
        &mut self,
        kind: ClaimType,
        amount: Money,
        filed_at: DateTime<Utc>,
    ) -> Result<&Claim, ClaimError> {
        if !amount.is_positive() {
            return Err(ClaimError::InvalidAmount { amount });
        }
        if !self.is_covered(kind) {
            return Err(ClaimError::NotCovered {
                tier: self.tier,
                kind,
            });
        }

        self.claims.push(Claim {
            reference: Reference::generate(),
            kind,
            requested: amount,
            approved: amount.min(self.tier.coverage_limit()),
            filed_at,
        });
        let index = self.claims.len() - 1;
        Ok(&self.claims[index])
    }
}

impl Feature for Insurance {
    const KIND: LayerKind = LayerKind::Insurance;

    fn label(&self) -> String {
        format!(
            "{} insurance (coverage {})",
            self.tier,
            self.tier.coverage_limit()
        )
    }

    fn monthly_fees(&self, inner: &dyn Account) -> Money {
        inner.monthly_fees() + self.tier.premium()
    }
}

impl FeatureLayer<Insurance> {
    /// Files a claim; approved claims are recorded on the layer
    ///
    /// # Errors
    ///
    /// Returns [`ClaimError::InvalidAmount`] for non-positive amounts and
    /// [`ClaimError::NotCovered`] when the plan excludes `kind`.
    #[tracing::instrument(skip(self), fields(account = %self.account_number()))]
    pub fn file_claim(&mut self, kind: ClaimType, amount: Money) -> Result<Claim, ClaimError> {
        let filed_at = self.innermost().now();
        match self.feature_mut().file(kind, amount, filed_at) {
            Ok(claim) => {
                tracing::info!(reference = %claim.reference, approved = %claim.approved, "Claim approved");
                Ok(claim.clone())
            }
            Err(error) => {
                tracing::warn!(%error, "Claim refused");
                Err(error)
            }
        }
    }
}

impl<'a> dyn Account + 'a {
    /// Files a claim via the insurance layer of this chain
    ///
    /// # Errors
    ///
    /// Returns [`ClaimError::NoInsurance`] if the chain has no insurance
    /// layer, otherwise as [`FeatureLayer::file_claim`].
    pub fn file_claim(&mut self, kind: ClaimType, amount: Money) -> Result<Claim, ClaimError> {
        find_layer_mut::<Insurance>(self)
            .ok_or(ClaimError::NoInsurance)?
            .file_claim(kind, amount)
    }

    /// Whether the chain's insurance covers `kind`; `false` without insurance
    #[must_use]
    pub fn is_covered(&self, kind: ClaimType) -> bool {
        self.layer::<Insurance>()
            .is_some_and(|layer| layer.feature().is_covered(kind))
    }
}
