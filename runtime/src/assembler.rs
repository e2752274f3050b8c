//! Account assembly.
//!
//! [`AccountAssembler`] opens a base account and wraps it with the requested
//! feature layers. Layers are always attached in the same order, whatever the
//! order they were requested in:
//!
//! ```text
//! fees → overdraft → interest → insurance → loyalty → notifications
//! ```
//!
//! The first kind ends up innermost, closest to the base account. Callers who
//! need a different order compose the chain by hand with
//! [`FeatureLayer::boxed`].

use crate::config::PipelineConfig;
use crate::metrics::{ACCOUNTS_OPENED, LAYERS_ATTACHED, counter};
use crate::store::{AccountHandle, AccountStore, StoreError};
use layerbank_core::environment::{AccountEnvironment, Channel};
use layerbank_core::features::{
    FeeSchedule, Fees, Insurance, InsuranceTier, Interest, Loyalty, Notifications, Overdraft,
};
use layerbank_core::{
    Account, AccountCategory, AccountNumber, BaseAccount, FeatureLayer, LayerKind, Money, Rate,
    TransactionError,
};
use std::collections::BTreeSet;
use std::sync::PoisonError;
use thiserror::Error;

/// Errors that can occur while assembling an account
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    /// Holder name is empty or blank
    #[error("Holder name must not be empty")]
    EmptyHolder,

    /// The same feature was requested twice
    #[error("Feature {0} requested more than once")]
    DuplicateFeature(LayerKind),

    /// The base account could not be opened
    #[error("Cannot open account: {0}")]
    Opening(#[from] TransactionError),

    /// An account already exists under the requested number
    #[error("Account {0} already exists")]
    AccountExists(AccountNumber),

    /// The store refused an operation
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// One requested feature with its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureOption {
    /// Fee schedule
    Fees(FeeSchedule),
    /// Overdraft facility
    Overdraft(Overdraft),
    /// Interest at the given annual rate; the minimum balance comes from the configuration
    Interest(Rate),
    /// Insurance plan
    Insurance(InsuranceTier),
    /// Loyalty points, starting from the given balance
    Loyalty(u64),
    /// Notifications to a recipient; `None` uses the configured channel
    Notifications {
        /// Delivery channel
        channel: Option<Channel>,
        /// Phone number or email address
        recipient: String,
    },
}

impl FeatureOption {
    /// Layer kind this option attaches
    #[must_use]
    pub const fn kind(&self) -> LayerKind {
        match self {
            Self::Fees(_) => LayerKind::Fee,
            Self::Overdraft(_) => LayerKind::Overdraft,
            Self::Interest(_) => LayerKind::Interest,
            Self::Insurance(_) => LayerKind::Insurance,
            Self::Loyalty(_) => LayerKind::Loyalty,
            Self::Notifications { .. } => LayerKind::Notification,
        }
    }
}

/// Builder for fully assembled account chains
///
/// # Example
///
/// ```
/// use layerbank_core::{AccountCategory, LayerKind, Money, environment::AccountEnvironment};
/// use layerbank_core::features::FeeSchedule;
/// use layerbank_runtime::{AccountAssembler, FeatureOption, PipelineConfig};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let account = AccountAssembler::new(AccountEnvironment::production(), PipelineConfig::default())
///     .holder("Alice")
///     .category(AccountCategory::Savings)
///     .opening_balance(Money::new(100_000))
///     .with(FeatureOption::Loyalty(0))
///     .with(FeatureOption::Fees(FeeSchedule::standard()))
///     .build()?;
///
/// assert_eq!(account.layer_count(), 2);
/// assert_eq!(account.layer_labels()[0], "Standard fees (2,000 monthly)");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AccountAssembler {
    environment: AccountEnvironment,
    config: PipelineConfig,
    number: Option<AccountNumber>,
    holder: String,
    category: AccountCategory,
    opening_balance: Money,
    withdrawal_limit: Option<Money>,
    options: Vec<FeatureOption>,
}

impl AccountAssembler {
    /// Starts an assembly with the given collaborators and defaults
    #[must_use]
    pub fn new(environment: AccountEnvironment, config: PipelineConfig) -> Self {
        Self {
            environment,
            config,
            number: None,
            holder: String::new(),
            category: AccountCategory::Checking,
            opening_balance: Money::ZERO,
            withdrawal_limit: None,
            options: Vec::new(),
        }
    }

    /// Uses a fixed account number instead of a generated one
    #[must_use]
    pub fn account_number(mut self, number: AccountNumber) -> Self {
        self.number = Some(number);
        self
    }

    /// Sets the holder name
    #[must_use]
    pub fn holder(mut self, holder: impl Into<String>) -> Self {
        self.holder = holder.into();
        self
    }

    /// Sets the category
    #[must_use]
    pub const fn category(mut self, category: AccountCategory) -> Self {
        self.category = category;
        self
    }

    /// Sets the opening balance
    #[must_use]
    pub const fn opening_balance(mut self, amount: Money) -> Self {
        self.opening_balance = amount;
        self
    }

    /// Overrides the configured per-withdrawal cap
    #[must_use]
    pub const fn withdrawal_limit(mut self, limit: Money) -> Self {
        self.withdrawal_limit = Some(limit);
        self
    }

    /// Requests a feature
    #[must_use]
    pub fn with(mut self, option: FeatureOption) -> Self {
        self.options.push(option);
        self
    }

    /// Validates the request and returns the options in attachment order
    fn validate(&mut self) -> Result<Vec<FeatureOption>, AssemblyError> {
        if self.holder.trim().is_empty() {
            return Err(AssemblyError::EmptyHolder);
        }
        if self.opening_balance.is_negative() {
            return Err(TransactionError::InvalidAmount {
                amount: self.opening_balance,
            }
            .into());
        }

        let mut seen = BTreeSet::new();
        for option in &self.options {
            if !seen.insert(option.kind()) {
                return Err(AssemblyError::DuplicateFeature(option.kind()));
            }
        }

        let mut options = std::mem::take(&mut self.options);
        options.sort_by_key(FeatureOption::kind);
        Ok(options)
    }

    fn open_base(&mut self) -> Result<Box<dyn Account>, AssemblyError> {
        let number = self.number.take().unwrap_or_else(AccountNumber::generate);
        let base = BaseAccount::open(
            number,
            std::mem::take(&mut self.holder),
            self.category,
            self.opening_balance,
            self.environment.clock.clone(),
        )?
        .with_withdrawal_limit(self.withdrawal_limit.unwrap_or(self.config.withdrawal_limit));
        Ok(base.boxed())
    }

    fn record_opened(account: &dyn Account) {
        counter!(ACCOUNTS_OPENED).increment(1);
        tracing::info!(
            account = %account.account_number(),
            category = %account.category(),
            balance = %account.balance(),
            "Opened account"
        );
    }

    fn layer(&self, inner: Box<dyn Account>, option: FeatureOption) -> Box<dyn Account> {
        counter!(LAYERS_ATTACHED, "kind" => option.kind().to_string()).increment(1);
        match option {
            FeatureOption::Fees(schedule) => FeatureLayer::boxed(inner, Fees::new(schedule)),
            FeatureOption::Overdraft(overdraft) => FeatureLayer::boxed(inner, overdraft),
            FeatureOption::Interest(rate) => FeatureLayer::boxed(
                inner,
                Interest::new(rate).with_minimum_balance(self.config.interest_minimum_balance),
            ),
            FeatureOption::Insurance(tier) => FeatureLayer::boxed(inner, Insurance::new(tier)),
            FeatureOption::Loyalty(points) => FeatureLayer::boxed(inner, Loyalty::with_points(points)),
            FeatureOption::Notifications { channel, recipient } => FeatureLayer::boxed(
                inner,
                Notifications::new(
                    self.environment.notifier.clone(),
                    channel.unwrap_or(self.config.notification_channel),
                    recipient,
                )
                .with_low_balance_threshold(self.config.low_balance_threshold),
            ),
        }
    }

    /// Opens the account and attaches every requested layer.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError`] for an empty holder, a negative opening
    /// balance or a feature requested twice.
    pub fn build(mut self) -> Result<Box<dyn Account>, AssemblyError> {
        let options = self.validate()?;
        let mut account = self.open_base()?;
        Self::record_opened(account.as_ref());
        for option in options {
            account = self.layer(account, option);
        }
        tracing::debug!(description = %account.full_description(), "Assembled account");
        Ok(account)
    }

    /// Opens the account into `store`, replacing the stored handle after
    /// every attachment.
    ///
    /// # Errors
    ///
    /// As [`AccountAssembler::build`], plus [`AssemblyError::AccountExists`]
    /// when the number is taken (checked atomically with the insertion) and [`AssemblyError::Store`] if the stored
    /// handle is shared while layers are attached.
    pub fn open_in(mut self, store: &AccountStore) -> Result<AccountHandle, AssemblyError> {
        let options = self.validate()?;
        let base = self.open_base()?;
        let number = base.account_number().clone();
        let mut handle = store.insert(base).map_err(|error| match error {
            StoreError::AlreadyExists(number) => AssemblyError::AccountExists(number),
            other => AssemblyError::Store(other),
        })?;
        Self::record_opened(handle.lock().unwrap_or_else(PoisonError::into_inner).as_ref());
        for option in options {
            drop(handle);
            handle = store.attach(&number, |inner| self.layer(inner, option))?;
        }
        Ok(handle)
    }
}
