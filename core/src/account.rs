//! The account capability trait and the base account that backs every chain.
//!
//! [`BaseAccount`] is the only type holding monetary state. Feature layers
//! ([`crate::FeatureLayer`]) wrap it, and every capability call made on the
//! outermost layer threads down to it. A few layers must change the base
//! directly without passing through the layers in between; they do so through
//! the crate-internal [`chain::Link`] supertrait, which ordinary callers can
//! neither name nor call.

use self::chain::Link;
use crate::environment::Clock;
use crate::error::{Receipt, TransactionError, TransactionResult};
use crate::layer::LayerKind;
use crate::ledger::{EntryKind, LedgerEntry};
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Per-withdrawal cap used when none is configured
pub const DEFAULT_WITHDRAWAL_LIMIT: Money = Money::new(5_000_000);

/// Account number, unique and immutable once assigned
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Wraps an existing account number
    #[must_use]
    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    /// Generates a random 12-digit account number
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("{:012}", Uuid::new_v4().as_u128() % 1_000_000_000_000))
    }

    /// Returns the account number as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Masks all but the last four characters, e.g. `********9012`
    #[must_use]
    pub fn masked(&self) -> String {
        mask_tail(&self.0)
    }
}

/// Replaces every character but the last four with `*`
pub(crate) fn mask_tail(value: &str) -> String {
    let hidden = value.chars().count().saturating_sub(4);
    let tail: String = value.chars().skip(hidden).collect();
    format!("{}{tail}", "*".repeat(hidden))
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Account category; affects labeling only
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountCategory {
    /// Everyday checking account
    Checking,
    /// Savings account
    Savings,
    /// Account for businesses and professionals
    Professional,
    /// Account for minors
    Youth,
}

impl fmt::Display for AccountCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Checking => "Checking",
            Self::Savings => "Savings",
            Self::Professional => "Professional",
            Self::Youth => "Youth",
        };
        f.write_str(label)
    }
}

/// Crate-internal chain access.
///
/// `Link` is a supertrait of [`Account`] declared in a module other crates
/// cannot reach, so its methods are callable only inside this crate.
pub(crate) mod chain {
    use super::{Account, BaseAccount};
    use crate::money::Money;
    use std::any::Any;

    pub trait Link: Any {
        /// The base account at the bottom of the chain
        fn innermost_mut(&mut self) -> &mut BaseAccount;

        /// Lowest balance the whole chain tolerates (zero unless an overdraft layer is attached anywhere)
        fn balance_floor(&self) -> Money;

        /// The wrapped account, if this is a layer
        fn wrapped(&self) -> Option<&dyn Account>;

        /// The wrapped account, if this is a layer
        fn wrapped_mut(&mut self) -> Option<&mut dyn Account>;

        /// Label of this layer, `None` for the base account
        fn layer_label(&self) -> Option<String>;

        /// Upcast for layer lookup
        fn as_any(&self) -> &dyn Any;

        /// Upcast for layer lookup
        fn as_any_mut(&mut self) -> &mut dyn Any;
    }
}

/// Capability set shared by the base account and every feature layer.
///
/// Callers only ever hold a `Box<dyn Account>`; whether it is a bare
/// [`BaseAccount`] or a stack of layers is invisible to them.
pub trait Account: Send + Sync + chain::Link {
    /// Account number of the backing base account
    fn account_number(&self) -> &AccountNumber;

    /// Holder name
    fn holder(&self) -> &str;

    /// Account category
    fn category(&self) -> AccountCategory;

    /// Credits the account
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::InvalidAmount`] for non-positive amounts and
    /// [`TransactionError::InactiveAccount`] for frozen accounts. Layers may
    /// add their own rejections.
    fn deposit(&mut self, amount: Money) -> TransactionResult;

    /// Debits the account
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Account::deposit`] plus
    /// [`TransactionError::LimitExceeded`] and
    /// [`TransactionError::InsufficientFunds`] (or
    /// [`TransactionError::OverdraftLimitExceeded`] when an overdraft layer
    /// is present).
    fn withdraw(&mut self, amount: Money) -> TransactionResult;

    /// Moves money to another account.
    ///
    /// The credit goes through the target's full `deposit` chain, so the
    /// recipient's layers run even though the source initiated the call.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::InvalidTarget`] for self-transfers, plus
    /// any error of the debit or of the target's deposit.
    fn transfer(&mut self, target: &mut dyn Account, amount: Money) -> TransactionResult;

    /// Current balance
    fn balance(&self) -> Money;

    /// Description of the base account
    fn description(&self) -> String;

    /// Base description followed by every layer label, first-attached first
    fn full_description(&self) -> String;

    /// Total monthly fees across the chain
    fn monthly_fees(&self) -> Money;

    /// Total monthly bonus across the chain
    fn monthly_bonus(&self) -> Money;

    /// Per-withdrawal cap
    fn withdrawal_limit(&self) -> Money;

    /// Whether the account accepts transactions
    fn is_active(&self) -> bool;

    /// Posted ledger entries, oldest first
    fn ledger(&self) -> &[LedgerEntry];

    /// Number of layers wrapped around the base (zero for a bare base)
    fn layer_count(&self) -> usize;

    /// Whether a layer of `kind` is present anywhere in the chain
    fn has_layer(&self, kind: LayerKind) -> bool;

    /// The base account at the bottom of the chain
    fn innermost(&self) -> &BaseAccount;
}

/// Holder of all monetary state
pub struct BaseAccount {
    number: AccountNumber,
    holder: String,
    category: AccountCategory,
    balance: Money,
    withdrawal_limit: Money,
    overdraft_limit: Money,
    active: bool,
    ledger: Vec<LedgerEntry>,
    clock: Arc<dyn Clock>,
}

impl BaseAccount {
    /// Opens an account; a positive opening balance is posted as the first entry.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::InvalidAmount`] if the opening balance is negative.
    pub fn open(
        number: AccountNumber,
        holder: impl Into<String>,
        category: AccountCategory,
        opening_balance: Money,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TransactionError> {
        if opening_balance.is_negative() {
            return Err(TransactionError::InvalidAmount {
                amount: opening_balance,
            });
        }

        let mut account = Self {
            number,
            holder: holder.into(),
            category,
            balance: Money::ZERO,
            withdrawal_limit: DEFAULT_WITHDRAWAL_LIMIT,
            overdraft_limit: Money::ZERO,
            active: true,
            ledger: Vec::new(),
            clock,
        };

        if opening_balance.is_positive() {
            account.post(
                EntryKind::Deposit,
                opening_balance,
                Money::ZERO,
                opening_balance,
                "opening balance",
            );
        }

        tracing::debug!(account = %account.number, balance = %opening_balance, "Opened base account");
        Ok(account)
    }

    /// Sets the per-withdrawal cap
    #[must_use]
    pub fn with_withdrawal_limit(mut self, limit: Money) -> Self {
        self.withdrawal_limit = limit;
        self
    }

    /// Boxes the account as a chain handle
    #[must_use]
    pub fn boxed(self) -> Box<dyn Account> {
        Box::new(self)
    }

    /// Validation shared by every debit path: positive amount, active account,
    /// within the withdrawal limit.
    pub(crate) fn check_debit(&self, amount: Money) -> Result<(), TransactionError> {
        if !amount.is_positive() {
            return Err(TransactionError::InvalidAmount { amount });
        }
        if !self.active {
            return Err(TransactionError::InactiveAccount {
                account: self.number.clone(),
            });
        }
        if amount > self.withdrawal_limit {
            return Err(TransactionError::LimitExceeded {
                limit: self.withdrawal_limit,
                requested: amount,
            });
        }
        Ok(())
    }

    fn check_credit(&self, amount: Money) -> Result<(), TransactionError> {
        if !amount.is_positive() {
            return Err(TransactionError::InvalidAmount { amount });
        }
        if !self.active {
            return Err(TransactionError::InactiveAccount {
                account: self.number.clone(),
            });
        }
        Ok(())
    }

    /// Bypass: overwrites the balance without any validation
    pub(crate) const fn set_balance(&mut self, balance: Money) {
        self.balance = balance;
    }

    /// Bypass: appends an entry without touching the balance
    pub(crate) fn append_entry(&mut self, entry: LedgerEntry) {
        self.ledger.push(entry);
    }

    /// Bypass: sets the balance and appends the matching entry in one step
    pub(crate) fn post(
        &mut self,
        kind: EntryKind,
        amount: Money,
        fee: Money,
        balance_after: Money,
        description: impl Into<String>,
    ) -> &LedgerEntry {
        let entry = LedgerEntry::new(kind, amount, fee, balance_after, description, self.clock.now());
        self.set_balance(balance_after);
        self.append_entry(entry);
        &self.ledger[self.ledger.len() - 1]
    }

    /// Restores the balance to `restored` after a debit that could not be completed.
    pub(crate) fn reverse_to(&mut self, restored: Money, description: impl Into<String>) -> &LedgerEntry {
        let amount = restored - self.balance;
        tracing::warn!(account = %self.number, %amount, "Reversing incomplete debit");
        self.post(EntryKind::Reversal, amount, Money::ZERO, restored, description)
    }

    /// Current time of the injected clock
    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Records an overdraft limit granted by a layer anywhere in the chain.
    /// The widest grant wins.
    pub(crate) fn grant_overdraft(&mut self, limit: Money) {
        self.overdraft_limit = self.overdraft_limit.max(limit);
    }

    pub(crate) const fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

impl fmt::Debug for BaseAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseAccount")
            .field("number", &self.number)
            .field("holder", &self.holder)
            .field("category", &self.category)
            .field("balance", &self.balance)
            .field("withdrawal_limit", &self.withdrawal_limit)
            .field("active", &self.active)
            .field("entries", &self.ledger.len())
            .finish_non_exhaustive()
    }
}

impl Link for BaseAccount {
    fn innermost_mut(&mut self) -> &mut BaseAccount {
        self
    }

    fn balance_floor(&self) -> Money {
        -self.overdraft_limit
    }

    fn wrapped(&self) -> Option<&dyn Account> {
        None
    }

    fn wrapped_mut(&mut self) -> Option<&mut dyn Account> {
        None
    }

    fn layer_label(&self) -> Option<String> {
        None
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

impl Account for BaseAccount {
    fn account_number(&self) -> &AccountNumber {
        &self.number
    }

    fn holder(&self) -> &str {
        &self.holder
    }

    fn category(&self) -> AccountCategory {
        self.category
    }

    #[tracing::instrument(skip(self), fields(account = %self.number))]
    fn deposit(&mut self, amount: Money) -> TransactionResult {
        self.check_credit(amount)?;
        let balance_after = self.balance + amount;
        let entry = self.post(EntryKind::Deposit, amount, Money::ZERO, balance_after, "deposit");
        tracing::debug!(balance = %balance_after, "Deposit posted");
        Ok(Receipt::from_entry(entry))
    }

    #[tracing::instrument(skip(self), fields(account = %self.number))]
    fn withdraw(&mut self, amount: Money) -> TransactionResult {
        self.check_debit(amount)?;
        if amount > self.balance {
            return Err(TransactionError::InsufficientFunds {
                available: self.balance,
                requested: amount,
            });
        }
        let balance_after = self.balance - amount;
        let entry = self.post(EntryKind::Withdrawal, amount, Money::ZERO, balance_after, "withdrawal");
        tracing::debug!(balance = %balance_after, "Withdrawal posted");
        Ok(Receipt::from_entry(entry))
    }

    #[tracing::instrument(skip(self, target), fields(account = %self.number, target = %target.account_number()))]
    fn transfer(&mut self, target: &mut dyn Account, amount: Money) -> TransactionResult {
        if target.account_number() == &self.number {
            return Err(TransactionError::InvalidTarget {
                reason: "cannot transfer to the same account".to_string(),
            });
        }
        self.check_debit(amount)?;
        if !target.is_active() {
            return Err(TransactionError::InactiveAccount {
                account: target.account_number().clone(),
            });
        }
        if amount > self.balance {
            return Err(TransactionError::InsufficientFunds {
                available: self.balance,
                requested: amount,
            });
        }

        let balance_before = self.balance;
        let description = format!("transfer to {}", target.account_number().masked());
        let receipt = Receipt::from_entry(self.post(
            EntryKind::TransferOut,
            amount,
            Money::ZERO,
            balance_before - amount,
            description,
        ));

        // The credit runs through the recipient's own layers.
        if let Err(error) = target.deposit(amount) {
            self.reverse_to(balance_before, "transfer reversed");
            return Err(error);
        }

        tracing::debug!(balance = %receipt.balance_after, "Transfer posted");
        Ok(receipt)
    }

    fn balance(&self) -> Money {
        self.balance
    }

    fn description(&self) -> String {
        format!(
            "{} account {} held by {}",
            self.category,
            self.number.masked(),
            self.holder
        )
    }

    fn full_description(&self) -> String {
        self.description()
    }

    fn monthly_fees(&self) -> Money {
        Money::ZERO
    }

    fn monthly_bonus(&self) -> Money {
        Money::ZERO
    }

    fn withdrawal_limit(&self) -> Money {
        self.withdrawal_limit
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn ledger(&self) -> &[LedgerEntry] {
        &self.ledger
    }

    fn layer_count(&self) -> usize {
        0
    }

    fn has_layer(&self, _kind: LayerKind) -> bool {
        false
    }

    fn innermost(&self) -> &BaseAccount {
        self
    }
}

impl<'a> dyn Account + 'a {
    /// Freezes the account; every later transaction fails with
    /// [`TransactionError::InactiveAccount`].
    pub fn freeze(&mut self) {
        let base = self.innermost_mut();
        base.set_active(false);
        tracing::info!(account = %base.number, "Account frozen");
    }

    /// Reactivates a frozen account
    pub fn unfreeze(&mut self) {
        let base = self.innermost_mut();
        base.set_active(true);
        tracing::info!(account = %base.number, "Account unfrozen");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can unwrap
mod tests {
    use super::*;
    use crate::environment::SystemClock;

    fn open(balance: i64) -> BaseAccount {
        BaseAccount::open(
            AccountNumber::new("100000000001"),
            "Alice",
            AccountCategory::Checking,
            Money::new(balance),
            Arc::new(SystemClock),
        )
        .unwrap()
    }

    fn other(balance: i64) -> BaseAccount {
        BaseAccount::open(
            AccountNumber::new("100000000002"),
            "Bob",
            AccountCategory::Savings,
            Money::new(balance),
            Arc::new(SystemClock),
        )
        .unwrap()
    }

    #[test]
    fn test_opening_balance_is_first_entry() {
        let account = open(100_000);
        assert_eq!(account.balance(), Money::new(100_000));
        assert_eq!(account.ledger().len(), 1);
        assert_eq!(account.ledger()[0].kind, EntryKind::Deposit);
        assert_eq!(account.ledger()[0].description, "opening balance");
    }

    #[test]
    fn test_zero_opening_balance_posts_nothing() {
        let account = open(0);
        assert!(account.ledger().is_empty());
    }

    #[test]
    fn test_negative_opening_balance_rejected() {
        let result = BaseAccount::open(
            AccountNumber::generate(),
            "Alice",
            AccountCategory::Checking,
            Money::new(-1),
            Arc::new(SystemClock),
        );
        assert!(matches!(result, Err(TransactionError::InvalidAmount { .. })));
    }

    #[test]
    fn test_deposit_and_withdraw() {
        let mut account = open(1_000);
        let receipt = account.deposit(Money::new(500)).unwrap();
        assert_eq!(receipt.balance_after, Money::new(1_500));

        let receipt = account.withdraw(Money::new(700)).unwrap();
        assert_eq!(receipt.balance_after, Money::new(800));
        assert_eq!(receipt.kind, EntryKind::Withdrawal);
        assert_eq!(account.ledger().len(), 3);
    }

    #[test]
    fn test_rejects_non_positive_amounts() {
        let mut account = open(1_000);
        assert_eq!(
            account.deposit(Money::ZERO),
            Err(TransactionError::InvalidAmount { amount: Money::ZERO })
        );
        assert_eq!(
            account.withdraw(Money::new(-5)),
            Err(TransactionError::InvalidAmount { amount: Money::new(-5) })
        );
        assert_eq!(account.ledger().len(), 1);
    }

    #[test]
    fn test_withdraw_never_goes_negative() {
        let mut account = open(1_000);
        let result = account.withdraw(Money::new(1_001));
        assert_eq!(
            result,
            Err(TransactionError::InsufficientFunds {
                available: Money::new(1_000),
                requested: Money::new(1_001),
            })
        );
        assert_eq!(account.balance(), Money::new(1_000));
    }

    #[test]
    fn test_withdrawal_limit() {
        let mut account = open(100_000).with_withdrawal_limit(Money::new(10_000));
        let result = account.withdraw(Money::new(10_001));
        assert!(matches!(result, Err(TransactionError::LimitExceeded { .. })));
        assert!(account.withdraw(Money::new(10_000)).is_ok());
    }

    #[test]
    fn test_frozen_account_rejects_everything() {
        let mut account: Box<dyn Account> = open(1_000).boxed();
        account.freeze();
        assert!(!account.is_active());
        assert!(matches!(
            account.deposit(Money::new(1)),
            Err(TransactionError::InactiveAccount { .. })
        ));
        assert!(matches!(
            account.withdraw(Money::new(1)),
            Err(TransactionError::InactiveAccount { .. })
        ));
        account.unfreeze();
        assert!(account.deposit(Money::new(1)).is_ok());
    }

    #[test]
    fn test_transfer_moves_money() {
        let mut source = open(10_000);
        let mut target = other(0);
        let receipt = source.transfer(&mut target, Money::new(4_000)).unwrap();

        assert_eq!(receipt.kind, EntryKind::TransferOut);
        assert_eq!(source.balance(), Money::new(6_000));
        assert_eq!(target.balance(), Money::new(4_000));
        assert_eq!(target.ledger().len(), 1);
    }

    #[test]
    fn test_transfer_to_self_rejected() {
        let mut source = open(10_000);
        let mut twin = open(0);
        let result = source.transfer(&mut twin, Money::new(1));
        assert!(matches!(result, Err(TransactionError::InvalidTarget { .. })));
    }

    #[test]
    fn test_transfer_to_frozen_target_posts_nothing() {
        let mut source = open(10_000);
        let mut target: Box<dyn Account> = other(0).boxed();
        target.freeze();
        let result = source.transfer(target.as_mut(), Money::new(1_000));
        assert!(matches!(result, Err(TransactionError::InactiveAccount { .. })));
        assert_eq!(source.ledger().len(), 1);
        assert_eq!(source.balance(), Money::new(10_000));
    }

    #[test]
    fn test_masked_account_number() {
        assert_eq!(AccountNumber::new("100000009012").masked(), "********9012");
        assert_eq!(AccountNumber::new("12").masked(), "12");
        assert_eq!(mask_tail("+84901234567"), "********4567");
        assert_eq!(mask_tail(""), "");
        assert_eq!(AccountNumber::generate().as_str().len(), 12);
    }

    #[test]
    fn test_ledger_matches_balance() {
        let mut account = open(5_000);
        account.deposit(Money::new(2_500)).unwrap();
        account.withdraw(Money::new(1_000)).unwrap();
        assert_eq!(crate::ledger::net_total(account.ledger()), account.balance());
    }
}
