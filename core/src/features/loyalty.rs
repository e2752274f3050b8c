//! Loyalty points.
//!
//! Successful deposits earn 1 point per 100 units, successful withdrawals 1
//! point per 200 units. The tier follows the point balance:
//!
//! | Tier     | Points  | Monthly bonus | Fee discount |
//! |----------|---------|---------------|--------------|
//! | Bronze   | 0       | 0             | 0 %          |
//! | Silver   | 1,000   | 500           | 10 %         |
//! | Gold     | 5,000   | 2,000         | 20 %         |
//! | Platinum | 20,000  | 5,000         | 30 %         |
//!
//! # Fee discount
//!
//! Unlike every other aggregate in the chain, the loyalty fee contribution is
//! multiplicative: the layer discounts the total fees of the account it
//! wraps. Fee layers attached *outside* the loyalty layer are therefore not
//! discounted, and attachment order changes the monthly fee total.

use crate::account::Account;
use crate::error::{TransactionError, TransactionResult};
use crate::layer::{find_layer_mut, Feature, FeatureLayer, LayerKind};
use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Loyalty tiers, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoyaltyTier {
    /// Entry tier
    Bronze,
    /// 1,000 points
    Silver,
    /// 5,000 points
    Gold,
    /// 20,000 points
    Platinum,
}

impl LoyaltyTier {
    /// Every tier, lowest first
    pub const ALL: [Self; 4] = [Self::Bronze, Self::Silver, Self::Gold, Self::Platinum];

    /// Highest tier whose threshold `points` reaches
    #[must_use]
    pub fn for_points(points: u64) -> Self {
        Self::ALL
            .into_iter()
            .rev()
            .find(|tier| points >= tier.threshold())
            .unwrap_or(Self::Bronze)
    }

    /// Points needed to reach the tier
    #[must_use]
    pub const fn threshold(self) -> u64 {
        match self {
            Self::Bronze => 0,
            Self::Silver => 1_000,
            Self::Gold => 5_000,
            Self::Platinum => 20_000,
        }
    }

    /// Monthly bonus granted by the tier
    #[must_use]
    pub const fn monthly_bonus(self) -> Money {
        match self {
            Self::Bronze => Money::ZERO,
            Self::Silver => Money::new(500),
            Self::Gold => Money::new(2_000),
            Self::Platinum => Money::new(5_000),
        }
    }

    /// Discount on wrapped monthly fees, in percent
    #[must_use]
    pub const fn discount_percent(self) -> i64 {
        match self {
            Self::Bronze => 0,
            Self::Silver => 10,
            Self::Gold => 20,
            Self::Platinum => 30,
        }
    }
}

impl fmt::Display for LoyaltyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
            Self::Platinum => "Platinum",
        };
        f.write_str(label)
    }
}

/// Loyalty points feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loyalty {
    points: u64,
    tier: LoyaltyTier,
}

impl Loyalty {
    /// Starts at zero points, Bronze
    #[must_use]
    pub fn new() -> Self {
        Self::with_points(0)
    }

    /// Starts with an existing point balance
    #[must_use]
    pub fn with_points(points: u64) -> Self {
        Self {
            points,
            tier: LoyaltyTier::for_points(points),
        }
    }

    /// Current point balance
    #[must_use]
    pub const fn points(&self) -> u64 {
        self.points
    }

    /// Current tier
    #[must_use]
    pub const fn tier(&self) -> LoyaltyTier {
        self.tier
    }

    fn award(&mut self, earned: u64) {
        if earned == 0 {
            return;
        }
        self.points = self.points.saturating_add(earned);
        self.refresh_tier();
    }

    fn redeem(&mut self, requested: u64) -> u64 {
        let redeemed = requested.min(self.points);
        self.points -= redeemed;
        self.refresh_tier();
        redeemed
    }

    fn refresh_tier(&mut self) {
        let tier = LoyaltyTier::for_points(self.points);
        if tier != self.tier {
            tracing::info!(from = %self.tier, to = %tier, points = self.points, "Loyalty tier changed");
            self.tier = tier;
        }
    }
}

impl Default for Loyalty {
    fn default() -> Self {
        Self::new()
    }
}

/// Whole points earned on `amount` at one point per `per` units
fn points_for(amount: Money, per: i64) -> u64 {
    u64::try_from(amount.units() / per).unwrap_or(0)
}

impl Feature for Loyalty {
    const KIND: LayerKind = LayerKind::Loyalty;

    fn label(&self) -> String {
        format!("Loyalty {} ({} pts)", self.tier, self.points)
    }

    fn deposit(&mut self, inner: &mut dyn Account, amount: Money) -> TransactionResult {
        let receipt = inner.deposit(amount)?;
        self.award(points_for(amount, 100));
        Ok(receipt)
    }

    fn withdraw(&mut self, inner: &mut dyn Account, amount: Money) -> TransactionResult {
        let receipt = inner.withdraw(amount)?;
        self.award(points_for(amount, 200));
        Ok(receipt)
    }

    fn monthly_fees(&self, inner: &dyn Account) -> Money {
        inner
            .monthly_fees()
            .scale(100 - self.tier.discount_percent(), 100)
    }

    fn monthly_bonus(&self, inner: &dyn Account) -> Money {
        inner.monthly_bonus() + self.tier.monthly_bonus()
    }
}

impl FeatureLayer<Loyalty> {
    /// Redeems up to `points`; returns the points actually redeemed
    pub fn redeem_points(&mut self, points: u64) -> u64 {
        let redeemed = self.feature_mut().redeem(points);
        tracing::debug!(requested = points, redeemed, "Loyalty points redeemed");
        redeemed
    }
}

impl<'a> dyn Account + 'a {
    /// Redeems loyalty points via the loyalty layer of this chain
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::MissingLayer`] if the chain has no loyalty layer.
    pub fn redeem_points(&mut self, points: u64) -> Result<u64, TransactionError> {
        find_layer_mut::<Loyalty>(self)
            .map(|layer| layer.redeem_points(points))
            .ok_or(TransactionError::MissingLayer {
                kind: LayerKind::Loyalty,
            })
    }
}
