//! Fee schedules.
//!
//! A fee layer charges a monthly maintenance fee (added to the chain's
//! monthly fee total) and a per-withdrawal fee:
//!
//! ```text
//! fee = clamp(fixed + amount × rate, minimum, maximum)
//! ```
//!
//! # Posting policy
//!
//! - If `amount + fee` fits in the current balance, both are debited at once
//!   through the bypass path: one [`EntryKind::WithdrawalWithFee`] entry.
//! - Otherwise the plain wrapped `withdraw(amount)` runs first (an inner
//!   overdraft layer may accept it) and the fee follows as a second bypass
//!   debit: a separate [`EntryKind::Fee`] entry.
//!
//! The split keeps an inner overdraft layer from rejecting a combined debit
//! it cannot see the fee of. Reconciliation relies on this entry granularity.
//!
//! The fee entry may take the balance down to the floor granted by any
//! overdraft layer in the chain, inside or outside this one.

use crate::account::chain::Link;
use crate::account::Account;
use crate::error::{Receipt, TransactionError, TransactionResult};
use crate::layer::{Feature, LayerKind};
use crate::ledger::EntryKind;
use crate::money::{Money, Rate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named fee plans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeTier {
    /// Low monthly fee, small per-withdrawal fee
    Basic,
    /// Default plan
    Standard,
    /// High monthly fee, free withdrawals
    Premium,
    /// Caller-defined parameters
    Custom,
}

impl fmt::Display for FeeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Basic => "Basic",
            Self::Standard => "Standard",
            Self::Premium => "Premium",
            Self::Custom => "Custom",
        };
        f.write_str(label)
    }
}

/// Fee parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Plan name
    pub tier: FeeTier,
    /// Monthly maintenance fee
    pub monthly_fee: Money,
    /// Fixed part of the per-withdrawal fee
    pub fixed_withdrawal_fee: Money,
    /// Proportional part of the per-withdrawal fee
    pub transaction_rate: Rate,
    /// Lower bound of the per-withdrawal fee
    pub minimum_fee: Money,
    /// Upper bound of the per-withdrawal fee
    pub maximum_fee: Money,
}

impl FeeSchedule {
    /// Monthly 500; 500 + 0.25 % per withdrawal, between 100 and 2,000
    #[must_use]
    pub const fn basic() -> Self {
        Self {
            tier: FeeTier::Basic,
            monthly_fee: Money::new(500),
            fixed_withdrawal_fee: Money::new(500),
            transaction_rate: Rate::from_bps(25),
            minimum_fee: Money::new(100),
            maximum_fee: Money::new(2_000),
        }
    }

    /// Monthly 2,000; 1,000 + 0.5 % per withdrawal, between 200 and 5,000
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            tier: FeeTier::Standard,
            monthly_fee: Money::new(2_000),
            fixed_withdrawal_fee: Money::new(1_000),
            transaction_rate: Rate::from_bps(50),
            minimum_fee: Money::new(200),
            maximum_fee: Money::new(5_000),
        }
    }

    /// Monthly 5,000; no per-withdrawal fee
    #[must_use]
    pub const fn premium() -> Self {
        Self {
            tier: FeeTier::Premium,
            monthly_fee: Money::new(5_000),
            fixed_withdrawal_fee: Money::ZERO,
            transaction_rate: Rate::ZERO,
            minimum_fee: Money::ZERO,
            maximum_fee: Money::ZERO,
        }
    }

    /// Caller-defined schedule; a maximum below the minimum is raised to it
    #[must_use]
    pub fn custom(
        monthly_fee: Money,
        fixed_withdrawal_fee: Money,
        transaction_rate: Rate,
        minimum_fee: Money,
        maximum_fee: Money,
    ) -> Self {
        Self {
            tier: FeeTier::Custom,
            monthly_fee,
            fixed_withdrawal_fee,
            transaction_rate,
            minimum_fee,
            maximum_fee: maximum_fee.max(minimum_fee),
        }
    }

    /// Per-withdrawal fee for `amount`
    #[must_use]
    pub fn withdrawal_fee(&self, amount: Money) -> Money {
        let raw = self.fixed_withdrawal_fee + self.transaction_rate.of(amount);
        raw.clamp(self.minimum_fee, self.maximum_fee.max(self.minimum_fee))
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::standard()
    }
}

/// Fee layer feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fees {
    schedule: FeeSchedule,
}

impl Fees {
    /// Creates a fee layer charging `schedule`
    #[must_use]
    pub const fn new(schedule: FeeSchedule) -> Self {
        Self { schedule }
    }

    /// The schedule charged
    #[must_use]
    pub const fn schedule(&self) -> &FeeSchedule {
        &self.schedule
    }

    fn over_floor(inner: &dyn Account, requested: Money) -> TransactionError {
        let balance = inner.balance();
        let floor = inner.balance_floor();
        if floor.is_negative() {
            TransactionError::OverdraftLimitExceeded {
                limit: -floor,
                available: balance - floor,
                requested,
            }
        } else {
            TransactionError::InsufficientFunds {
                available: balance,
                requested,
            }
        }
    }
}

impl Feature for Fees {
    const KIND: LayerKind = LayerKind::Fee;

    fn label(&self) -> String {
        format!("{} fees ({} monthly)", self.schedule.tier, self.schedule.monthly_fee)
    }

    fn withdraw(&mut self, inner: &mut dyn Account, amount: Money) -> TransactionResult {
        inner.innermost().check_debit(amount)?;

        let fee = self.schedule.withdrawal_fee(amount);
        if !fee.is_positive() {
            return inner.withdraw(amount);
        }

        let balance = inner.balance();
        if amount + fee <= balance {
            let entry = inner.innermost_mut().post(
                EntryKind::WithdrawalWithFee,
                amount,
                fee,
                balance - amount - fee,
                "withdrawal with fee",
            );
            tracing::debug!(%amount, %fee, "Combined withdrawal and fee posted");
            return Ok(Receipt::from_entry(entry));
        }

        // Split path: the fee cannot ride along with the withdrawal.
        let floor = inner.balance_floor();
        if balance - amount - fee < floor {
            tracing::warn!(account = %inner.account_number(), %amount, %fee, "Withdrawal plus fee exceeds available funds");
            return Err(Self::over_floor(inner, amount + fee));
        }

        let withdrawal = inner.withdraw(amount)?;
        let after_withdrawal = inner.balance();
        let balance_after = after_withdrawal - fee;
        if balance_after < floor {
            // An inner layer charged more than expected; undo so no entry is left half-applied.
            inner
                .innermost_mut()
                .reverse_to(balance, "withdrawal reversed, fee not payable");
            return Err(Self::over_floor(inner, amount + withdrawal.fee + fee));
        }

        let entry = inner
            .innermost_mut()
            .post(EntryKind::Fee, fee, Money::ZERO, balance_after, "withdrawal fee");
        tracing::debug!(%amount, %fee, "Withdrawal and separate fee posted");

        Ok(Receipt {
            reference: entry.reference.clone(),
            kind: withdrawal.kind,
            amount,
            fee: withdrawal.fee + fee,
            balance_after,
            message: format!("withdrawal of {amount} posted with fee {fee}, balance {balance_after}"),
        })
    }

    fn monthly_fees(&self, inner: &dyn Account) -> Money {
        self.schedule.monthly_fee + inner.monthly_fees()
    }
}
