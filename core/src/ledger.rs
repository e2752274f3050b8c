//! Ledger entries posted by the base account.
//!
//! The ledger is append-only: entries are created once by [`crate::BaseAccount`]
//! and never mutated or removed afterwards. Reconciliation tooling relies on
//! the granularity of entries, so every posting path documents how many
//! entries it produces.

use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique reference of a posted movement
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference(String);

impl Reference {
    /// Generates a new random reference (`TX-` followed by 12 hex digits)
    #[must_use]
    pub fn generate() -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        Self(format!("TX-{}", &simple[..12]).to_uppercase())
    }

    /// Returns the reference as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What kind of movement an entry records
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Credit through the deposit path (opening balance, deposits, interest, incoming transfers)
    Deposit,
    /// Plain debit through the base withdrawal path
    Withdrawal,
    /// Single combined debit of a withdrawal and its fee
    WithdrawalWithFee,
    /// Debit that took the balance below zero
    OverdraftWithdrawal,
    /// Standalone fee debit
    Fee,
    /// Debit of an outgoing transfer
    TransferOut,
    /// Compensation of an earlier debit that could not be completed
    Reversal,
}

impl EntryKind {
    /// Checks if this kind reduces the balance
    #[must_use]
    pub const fn is_debit(self) -> bool {
        !matches!(self, Self::Deposit | Self::Reversal)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::WithdrawalWithFee => "withdrawal with fee",
            Self::OverdraftWithdrawal => "overdraft withdrawal",
            Self::Fee => "fee",
            Self::TransferOut => "transfer out",
            Self::Reversal => "reversal",
        };
        f.write_str(label)
    }
}

/// Immutable record of one posted movement
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique reference
    pub reference: Reference,
    /// Kind of movement
    pub kind: EntryKind,
    /// Principal amount moved (always non-negative)
    pub amount: Money,
    /// Fee charged on top of the amount (zero if none)
    pub fee: Money,
    /// Balance right after posting
    pub balance_after: Money,
    /// Free-form description
    pub description: String,
    /// When the entry was posted
    pub posted_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Creates a new entry with a fresh reference
    #[must_use]
    pub fn new(
        kind: EntryKind,
        amount: Money,
        fee: Money,
        balance_after: Money,
        description: impl Into<String>,
        posted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            reference: Reference::generate(),
            kind,
            amount,
            fee,
            balance_after,
            description: description.into(),
            posted_at,
        }
    }

    /// Signed effect of the entry on the balance
    #[must_use]
    pub fn net_change(&self) -> Money {
        if self.kind.is_debit() {
            -(self.amount + self.fee)
        } else {
            self.amount
        }
    }
}

/// Sums the net change of a slice of entries.
///
/// For an untouched ledger this equals the current balance, since the opening
/// balance is posted as the first entry.
#[must_use]
pub fn net_total(entries: &[LedgerEntry]) -> Money {
    entries.iter().map(LedgerEntry::net_change).sum()
}
