//! Interest accrual.
//!
//! Interest accrues monthly at `annual_rate / 12` on balances at or above a
//! minimum. The accrued amount counts toward the chain's monthly bonus and is
//! credited by [`apply_monthly_interest`](FeatureLayer::apply_monthly_interest),
//! which deposits through the wrapped chain so every layer between this one
//! and the base sees the credit.

use crate::account::Account;
use crate::error::{TransactionError, TransactionResult};
use crate::layer::{find_layer_mut, Feature, FeatureLayer, LayerKind};
use crate::money::{Money, Rate};
use serde::{Deserialize, Serialize};

/// Months per year, times basis points per unit
const MONTHLY_BPS_DENOMINATOR: i64 = 12 * Rate::BPS_PER_UNIT;

/// Interest accrual feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interest {
    annual_rate: Rate,
    minimum_balance: Money,
}

impl Interest {
    /// Balance below which nothing accrues, when none is configured
    pub const DEFAULT_MINIMUM_BALANCE: Money = Money::new(10_000);

    /// Accrues at `annual_rate` on balances of at least 10,000
    #[must_use]
    pub const fn new(annual_rate: Rate) -> Self {
        Self {
            annual_rate,
            minimum_balance: Self::DEFAULT_MINIMUM_BALANCE,
        }
    }

    /// Sets the balance threshold
    #[must_use]
    pub const fn with_minimum_balance(mut self, minimum_balance: Money) -> Self {
        self.minimum_balance = minimum_balance;
        self
    }

    /// Annual rate
    #[must_use]
    pub const fn annual_rate(&self) -> Rate {
        self.annual_rate
    }

    /// Balance threshold
    #[must_use]
    pub const fn minimum_balance(&self) -> Money {
        self.minimum_balance
    }

    /// One month of interest on `balance`, rounded half up
    #[must_use]
    pub fn monthly_interest(&self, balance: Money) -> Money {
        if balance < self.minimum_balance || !balance.is_positive() {
            return Money::ZERO;
        }
        balance.scale(i64::from(self.annual_rate.bps()), MONTHLY_BPS_DENOMINATOR)
    }
}

impl Feature for Interest {
    const KIND: LayerKind = LayerKind::Interest;

    fn label(&self) -> String {
        format!("Interest {} p.a.", self.annual_rate)
    }

    fn monthly_bonus(&self, inner: &dyn Account) -> Money {
        inner.monthly_bonus() + self.monthly_interest(inner.balance())
    }
}

impl FeatureLayer<Interest> {
    /// Credits one month of interest through the wrapped chain.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::InvalidAmount`] when the balance is below
    /// the threshold (nothing accrues), plus any rejection of the deposit.
    #[tracing::instrument(skip(self), fields(account = %self.account_number()))]
    pub fn apply_monthly_interest(&mut self) -> TransactionResult {
        let (interest, inner) = self.parts_mut();
        let amount = interest.monthly_interest(inner.balance());
        if !amount.is_positive() {
            tracing::debug!(balance = %inner.balance(), "No interest accrued");
            return Err(TransactionError::InvalidAmount { amount });
        }
        let receipt = inner.deposit(amount)?;
        tracing::info!(%amount, balance = %receipt.balance_after, "Monthly interest credited");
        Ok(receipt)
    }
}

impl<'a> dyn Account + 'a {
    /// Credits one month of interest via the interest layer of this chain
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::MissingLayer`] if the chain has no
    /// interest layer, otherwise as [`FeatureLayer::apply_monthly_interest`].
    pub fn apply_monthly_interest(&mut self) -> TransactionResult {
        find_layer_mut::<Interest>(self)
            .ok_or(TransactionError::MissingLayer {
                kind: LayerKind::Interest,
            })?
            .apply_monthly_interest()
    }
}
