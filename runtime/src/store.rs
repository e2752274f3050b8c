//! Keyed account store.
//!
//! Every stored account sits behind its own mutex, so at most one caller
//! mutates a given account at a time while different accounts proceed in
//! parallel. Attaching a layer changes the identity of the outermost object,
//! so [`AccountStore::attach`] replaces the stored handle; callers still
//! holding the previous handle must look the account up again.

use crate::metrics::{STORE_LOOKUPS, STORE_TRANSFERS, counter};
use layerbank_core::{
    Account, AccountNumber, Money, Receipt, TransactionError, TransactionResult,
};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Shared handle to a stored account chain
pub type AccountHandle = Arc<Mutex<Box<dyn Account>>>;

/// Errors that can occur during store operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No account is stored under the number
    #[error("Account {0} not found")]
    NotFound(AccountNumber),

    /// Another account is already stored under the number
    #[error("Account {0} already exists")]
    AlreadyExists(AccountNumber),

    /// The handle is still held elsewhere, so the chain cannot be rewrapped
    #[error("Account {0} is in use and cannot be rewrapped")]
    HandleInUse(AccountNumber),

    /// A previous holder of the handle panicked mid-operation
    #[error("Account {0} was poisoned by a panicking operation")]
    Poisoned(AccountNumber),

    /// The operation on the stored account was rejected
    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

/// In-memory store of account chains keyed by account number
#[derive(Default)]
pub struct AccountStore {
    accounts: Mutex<HashMap<AccountNumber, AccountHandle>>,
}

impl AccountStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn accounts(&self) -> MutexGuard<'_, HashMap<AccountNumber, AccountHandle>> {
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `account` under its own number, replacing any previous handle
    pub fn put(&self, account: Box<dyn Account>) -> AccountHandle {
        let number = account.account_number().clone();
        let handle = Arc::new(Mutex::new(account));
        if self.accounts().insert(number.clone(), Arc::clone(&handle)).is_some() {
            tracing::debug!(account = %number, "Replaced stored account handle");
        } else {
            tracing::debug!(account = %number, "Stored account");
        }
        handle
    }

    /// Stores `account` only if its number is not taken yet.
    ///
    /// The check and the insertion happen under one lock, so concurrent
    /// callers opening the same number cannot overwrite each other.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] if the number is taken.
    pub fn insert(&self, account: Box<dyn Account>) -> Result<AccountHandle, StoreError> {
        let mut accounts = self.accounts();
        match accounts.entry(account.account_number().clone()) {
            Entry::Occupied(entry) => Err(StoreError::AlreadyExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                tracing::debug!(account = %entry.key(), "Stored new account");
                let handle = Arc::new(Mutex::new(account));
                entry.insert(Arc::clone(&handle));
                Ok(handle)
            }
        }
    }

    /// Looks up the current handle of an account
    #[must_use]
    pub fn get(&self, number: &AccountNumber) -> Option<AccountHandle> {
        let handle = self.accounts().get(number).cloned();
        let outcome = if handle.is_some() { "hit" } else { "miss" };
        counter!(STORE_LOOKUPS, "outcome" => outcome).increment(1);
        handle
    }

    /// Checks if an account is stored under `number`
    #[must_use]
    pub fn contains(&self, number: &AccountNumber) -> bool {
        self.accounts().contains_key(number)
    }

    /// Rewraps a stored chain and replaces its handle.
    ///
    /// `wrap` receives the current outermost account and returns the new one,
    /// typically `|inner| FeatureLayer::boxed(inner, feature)`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown numbers and
    /// [`StoreError::HandleInUse`] while another caller holds the handle.
    pub fn attach<F>(&self, number: &AccountNumber, wrap: F) -> Result<AccountHandle, StoreError>
    where
        F: FnOnce(Box<dyn Account>) -> Box<dyn Account>,
    {
        let mut accounts = self.accounts();
        let handle = accounts
            .remove(number)
            .ok_or_else(|| StoreError::NotFound(number.clone()))?;

        let account = match Arc::try_unwrap(handle) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(PoisonError::into_inner),
            Err(handle) => {
                accounts.insert(number.clone(), handle);
                tracing::warn!(account = %number, "Cannot attach layer while handle is shared");
                return Err(StoreError::HandleInUse(number.clone()));
            }
        };

        let handle = Arc::new(Mutex::new(wrap(account)));
        accounts.insert(number.clone(), Arc::clone(&handle));
        Ok(handle)
    }

    /// Removes an account, returning its last handle
    pub fn remove(&self, number: &AccountNumber) -> Option<AccountHandle> {
        let removed = self.accounts().remove(number);
        if removed.is_some() {
            tracing::debug!(account = %number, "Removed account");
        }
        removed
    }

    /// Number of stored accounts
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts().len()
    }

    /// Check if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored account numbers, sorted
    #[must_use]
    pub fn account_numbers(&self) -> Vec<AccountNumber> {
        let mut numbers: Vec<_> = self.accounts().keys().cloned().collect();
        numbers.sort();
        numbers
    }

    /// Runs `operation` with exclusive access to one account
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown numbers and
    /// [`StoreError::Poisoned`] if a previous operation panicked.
    pub fn with_account<T, F>(&self, number: &AccountNumber, operation: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut dyn Account) -> T,
    {
        let handle = self
            .get(number)
            .ok_or_else(|| StoreError::NotFound(number.clone()))?;
        let mut account = lock_account(&handle, number)?;
        Ok(operation(account.as_mut()))
    }

    /// Transfers between two stored accounts.
    ///
    /// Both accounts are locked for the duration, always in account-number
    /// order, so concurrent opposite transfers cannot deadlock.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] / [`StoreError::Poisoned`] for the
    /// lookups and [`StoreError::Transaction`] when the transfer is rejected.
    #[tracing::instrument(skip(self), fields(from = %from, to = %to))]
    pub fn transfer(
        &self,
        from: &AccountNumber,
        to: &AccountNumber,
        amount: Money,
    ) -> Result<Receipt, StoreError> {
        if from == to {
            return Err(TransactionError::InvalidTarget {
                reason: "cannot transfer to the same account".to_string(),
            }
            .into());
        }

        let source_handle = self
            .get(from)
            .ok_or_else(|| StoreError::NotFound(from.clone()))?;
        let target_handle = self
            .get(to)
            .ok_or_else(|| StoreError::NotFound(to.clone()))?;

        let (mut source, mut target) = if from < to {
            let source = lock_account(&source_handle, from)?;
            (source, lock_account(&target_handle, to)?)
        } else {
            let target = lock_account(&target_handle, to)?;
            (lock_account(&source_handle, from)?, target)
        };

        let result: TransactionResult = source.transfer(target.as_mut(), amount);
        let outcome = if result.is_ok() { "ok" } else { "rejected" };
        counter!(STORE_TRANSFERS, "outcome" => outcome).increment(1);
        Ok(result?)
    }
}

fn lock_account<'a>(
    handle: &'a AccountHandle,
    number: &AccountNumber,
) -> Result<MutexGuard<'a, Box<dyn Account>>, StoreError> {
    handle
        .lock()
        .map_err(|_| StoreError::Poisoned(number.clone()))
}

impl std::fmt::Debug for AccountStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountStore")
            .field("accounts", &self.len())
            .finish()
    }
}
