//! Transaction outcomes shared by every layer of an account chain.
//!
//! Every capability that can fail returns [`TransactionResult`]. Layers never
//! panic across layer boundaries: a failure produced deep in the chain is
//! passed back up unchanged, so callers see one uniform shape no matter how
//! many layers the account carries.

use crate::account::AccountNumber;
use crate::layer::LayerKind;
use crate::ledger::{EntryKind, LedgerEntry, Reference};
use crate::money::Money;
use thiserror::Error;

/// Result of a deposit, withdrawal or transfer
pub type TransactionResult = Result<Receipt, TransactionError>;

/// Reasons a transaction is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    /// Amount is zero or negative
    #[error("Invalid amount {amount}: must be greater than zero")]
    InvalidAmount {
        /// Rejected amount
        amount: Money,
    },

    /// Account is frozen
    #[error("Account {account} is inactive")]
    InactiveAccount {
        /// The inactive account
        account: AccountNumber,
    },

    /// Requested amount exceeds what the account can pay
    #[error("Insufficient funds: available {available} < requested {requested}")]
    InsufficientFunds {
        /// Funds available to the operation
        available: Money,
        /// Requested amount (fee included where one applies)
        requested: Money,
    },

    /// Requested amount exceeds the per-withdrawal cap
    #[error("Withdrawal limit exceeded: limit {limit} < requested {requested}")]
    LimitExceeded {
        /// Configured withdrawal limit
        limit: Money,
        /// Requested amount
        requested: Money,
    },

    /// Debit would take the balance below the negative overdraft limit
    #[error("Overdraft limit {limit} exceeded: available {available} < requested {requested}")]
    OverdraftLimitExceeded {
        /// Configured overdraft limit
        limit: Money,
        /// Balance plus overdraft headroom
        available: Money,
        /// Requested amount (fees included)
        requested: Money,
    },

    /// Transfer target is not acceptable
    #[error("Invalid transfer target: {reason}")]
    InvalidTarget {
        /// Why the target was rejected
        reason: String,
    },

    /// A layer-specific operation was requested on a chain without that layer
    #[error("Account has no {kind} layer")]
    MissingLayer {
        /// Kind of layer that was looked up
        kind: LayerKind,
    },

    /// Unexpected internal fault
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransactionError {
    /// Short machine-readable name of the error kind
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::InactiveAccount { .. } => "inactive_account",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::LimitExceeded { .. } => "limit_exceeded",
            Self::OverdraftLimitExceeded { .. } => "overdraft_limit_exceeded",
            Self::InvalidTarget { .. } => "invalid_target",
            Self::MissingLayer { .. } => "missing_layer",
            Self::Internal(_) => "internal",
        }
    }
}

/// Successful transaction outcome
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    /// Reference of the last ledger entry posted by the operation
    pub reference: Reference,
    /// Kind of the last entry posted
    pub kind: EntryKind,
    /// Principal amount
    pub amount: Money,
    /// Total fees charged by the operation
    pub fee: Money,
    /// Balance after the operation
    pub balance_after: Money,
    /// Human-readable summary
    pub message: String,
}

impl Receipt {
    /// Builds a receipt from the entry an operation posted
    #[must_use]
    pub fn from_entry(entry: &LedgerEntry) -> Self {
        Self {
            reference: entry.reference.clone(),
            kind: entry.kind,
            amount: entry.amount,
            fee: entry.fee,
            balance_after: entry.balance_after,
            message: format!(
                "{} of {} posted, balance {}",
                entry.kind, entry.amount, entry.balance_after
            ),
        }
    }
}
