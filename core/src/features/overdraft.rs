//! Overdraft facility.
//!
//! Lets withdrawals take the balance below zero, down to `-limit`. The part of
//! a withdrawal that exceeds the positive balance is the *overdraft used*; it
//! carries a fee, rounded up, that is added to the debit.
//!
//! [`crate::BaseAccount`] refuses negative balances, so overdrawing
//! withdrawals are posted through the bypass path straight onto the base as a
//! single [`EntryKind::OverdraftWithdrawal`] entry. Layers attached *inside*
//! the overdraft layer (closer to the base) therefore never see those
//! withdrawals through their hooks. Withdrawals covered by the balance take
//! the normal delegation path.

use crate::account::chain::Link;
use crate::account::Account;
use crate::error::{Receipt, TransactionError, TransactionResult};
use crate::layer::{Feature, LayerKind};
use crate::ledger::EntryKind;
use crate::money::{Money, Rate};
use serde::{Deserialize, Serialize};

/// Overdraft facility with a limit, a usage fee and a monthly interest charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overdraft {
    limit: Money,
    fee_rate: Rate,
    interest_rate: Rate,
}

impl Overdraft {
    /// Monthly charge on the overdrawn amount when none is configured
    pub const DEFAULT_INTEREST_RATE: Rate = Rate::from_percent(2);

    /// Creates a facility with `limit` and a fee of `fee_rate` on the overdraft used
    #[must_use]
    pub const fn new(limit: Money, fee_rate: Rate) -> Self {
        Self {
            limit,
            fee_rate,
            interest_rate: Self::DEFAULT_INTEREST_RATE,
        }
    }

    /// Sets the monthly charge on the overdrawn amount
    #[must_use]
    pub const fn with_interest_rate(mut self, rate: Rate) -> Self {
        self.interest_rate = rate;
        self
    }

    /// How far below zero the balance may go
    #[must_use]
    pub const fn limit(&self) -> Money {
        self.limit
    }

    /// Fee rate on the overdraft used
    #[must_use]
    pub const fn fee_rate(&self) -> Rate {
        self.fee_rate
    }

    /// Monthly charge rate on the overdrawn amount
    #[must_use]
    pub const fn interest_rate(&self) -> Rate {
        self.interest_rate
    }

    /// Fee charged for using `overdraft_used` of the facility
    #[must_use]
    pub fn usage_fee(&self, overdraft_used: Money) -> Money {
        self.fee_rate.of_ceil(overdraft_used)
    }
}

impl Feature for Overdraft {
    const KIND: LayerKind = LayerKind::Overdraft;

    fn label(&self) -> String {
        format!("Overdraft up to {} ({} fee)", self.limit, self.fee_rate)
    }

    fn withdraw(&mut self, inner: &mut dyn Account, amount: Money) -> TransactionResult {
        inner.innermost().check_debit(amount)?;

        let balance = inner.balance();
        let available = balance + self.limit;
        if amount > available {
            tracing::warn!(account = %inner.account_number(), %amount, %available, "Overdraft limit exceeded");
            return Err(TransactionError::OverdraftLimitExceeded {
                limit: self.limit,
                available,
                requested: amount,
            });
        }

        if amount <= balance {
            return inner.withdraw(amount);
        }

        // Only the part not covered by a positive balance counts as used;
        // an overdrawn balance does not enlarge it.
        let overdraft_used = amount - balance.max(Money::ZERO);
        let fee = self.usage_fee(overdraft_used);
        let balance_after = balance - amount - fee;
        if balance_after < -self.limit {
            tracing::warn!(account = %inner.account_number(), %amount, %fee, "Overdraft fee exceeds remaining headroom");
            return Err(TransactionError::OverdraftLimitExceeded {
                limit: self.limit,
                available,
                requested: amount + fee,
            });
        }

        let entry = inner.innermost_mut().post(
            EntryKind::OverdraftWithdrawal,
            amount,
            fee,
            balance_after,
            format!("overdraft withdrawal, {overdraft_used} over balance"),
        );
        tracing::debug!(%overdraft_used, %fee, balance = %balance_after, "Overdraft withdrawal posted");
        Ok(Receipt::from_entry(entry))
    }

    fn monthly_fees(&self, inner: &dyn Account) -> Money {
        let balance = inner.balance();
        let charge = if balance.is_negative() {
            self.interest_rate.of_ceil(balance.abs())
        } else {
            Money::ZERO
        };
        inner.monthly_fees() + charge
    }

    fn overdraft_limit(&self) -> Option<Money> {
        Some(self.limit)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can unwrap
mod tests {
    use super::*;
    use crate::FeatureLayer;
    use crate::features::fixtures::open;
    use crate::features::{FeeSchedule, Fees};

    fn with_overdraft(balance: i64, limit: i64, fee_bps: u32) -> Box<dyn Account> {
        FeatureLayer::boxed(
            open(balance),
            Overdraft::new(Money::new(limit), Rate::from_bps(fee_bps)),
        )
    }

    #[test]
    fn test_overdraft_withdrawal_adds_fee_to_debit() {
        let mut account = with_overdraft(50_000, 200_000, 150);
        let receipt = account.withdraw(Money::new(150_000)).unwrap();

        assert_eq!(receipt.kind, EntryKind::OverdraftWithdrawal);
        assert_eq!(receipt.fee, Money::new(1_500));
        assert_eq!(account.balance(), Money::new(-101_500));
        assert_eq!(account.ledger().len(), 2);
    }

    #[test]
    fn test_covered_withdrawal_takes_normal_path() {
        let mut account = with_overdraft(50_000, 200_000, 150);
        let receipt = account.withdraw(Money::new(50_000)).unwrap();
        assert_eq!(receipt.kind, EntryKind::Withdrawal);
        assert_eq!(receipt.fee, Money::ZERO);
        assert_eq!(account.balance(), Money::ZERO);
    }

    #[test]
    fn test_full_headroom_reaches_exactly_minus_limit() {
        let mut account = with_overdraft(1_000, 5_000, 0);
        account.withdraw(Money::new(6_000)).unwrap();
        assert_eq!(account.balance(), Money::new(-5_000));

        let result = account.withdraw(Money::new(1));
        assert!(matches!(
            result,
            Err(TransactionError::OverdraftLimitExceeded { .. })
        ));
        assert_eq!(account.balance(), Money::new(-5_000));
    }

    #[test]
    fn test_amount_over_headroom_rejected() {
        let mut account = with_overdraft(1_000, 5_000, 0);
        let result = account.withdraw(Money::new(6_001));
        assert_eq!(
            result,
            Err(TransactionError::OverdraftLimitExceeded {
                limit: Money::new(5_000),
                available: Money::new(6_000),
                requested: Money::new(6_001),
            })
        );
        assert_eq!(account.ledger().len(), 1);
    }

    #[test]
    fn test_fee_that_breaches_limit_is_rejected() {
        let mut account = with_overdraft(0, 1_000, 1_000);
        let result = account.withdraw(Money::new(1_000));
        assert!(matches!(
            result,
            Err(TransactionError::OverdraftLimitExceeded { requested, .. }) if requested == Money::new(1_100)
        ));
        assert!(account.ledger().is_empty());
    }

    #[test]
    fn test_already_overdrawn_only_charges_new_usage() {
        // Overdraft used is `amount - max(balance, 0)`, not `amount - balance`:
        // an existing negative balance is not charged a second time.
        let mut account = with_overdraft(0, 10_000, 100);
        account.withdraw(Money::new(1_000)).unwrap();
        assert_eq!(account.balance(), Money::new(-1_010));

        let receipt = account.withdraw(Money::new(1_000)).unwrap();
        assert_eq!(receipt.fee, Money::new(10));
        assert_eq!(account.balance(), Money::new(-2_020));
    }

    #[test]
    fn test_monthly_interest_on_overdrawn_balance() {
        let mut account = FeatureLayer::boxed(
            open(50_000),
            Overdraft::new(Money::new(200_000), Rate::from_bps(150))
                .with_interest_rate(Rate::from_percent(2)),
        );
        assert_eq!(account.monthly_fees(), Money::ZERO);

        account.withdraw(Money::new(150_000)).unwrap();
        // 2 % of 101,500 = 2,030
        assert_eq!(account.monthly_fees(), Money::new(2_030));
    }

    #[test]
    fn test_limit_and_inactive_checks_still_apply() {
        let mut account = with_overdraft(0, 10_000_000, 0);
        assert!(matches!(
            account.withdraw(Money::new(6_000_000)),
            Err(TransactionError::LimitExceeded { .. })
        ));
        account.freeze();
        assert!(matches!(
            account.withdraw(Money::new(1)),
            Err(TransactionError::InactiveAccount { .. })
        ));
    }

    #[test]
    fn test_reports_balance_floor() {
        let account = with_overdraft(0, 7_500, 0);
        assert_eq!(account.balance_floor(), Money::new(-7_500));
    }

    #[test]
    fn test_balance_floor_reaches_inner_layers() {
        let mut account = FeatureLayer::boxed(open(0), Fees::new(FeeSchedule::basic()));
        account = FeatureLayer::boxed(account, Overdraft::new(Money::new(7_500), Rate::ZERO));
        account = FeatureLayer::boxed(account, Overdraft::new(Money::new(2_000), Rate::ZERO));

        assert_eq!(account.balance_floor(), Money::new(-7_500));
        let fees = account.wrapped().and_then(|layer| layer.wrapped()).unwrap();
        assert_eq!(fees.balance_floor(), Money::new(-7_500));
    }
}
