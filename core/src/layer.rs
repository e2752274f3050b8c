//! Feature layers: wrappers that add one feature to an account.
//!
//! A [`FeatureLayer`] owns the next account in the chain and forwards every
//! capability to it. The behavior it adds comes from a [`Feature`], whose
//! hooks default to plain delegation, so a feature overrides only what it
//! changes.
//!
//! # Aggregates
//!
//! `monthly_fees` and `monthly_bonus` are folded over the chain: each layer
//! adds its own contribution to the wrapped total. The loyalty feature is the
//! single exception, see [`crate::features::loyalty`].
//!
//! # Example
//!
//! ```
//! use layerbank_core::{
//!     Account, AccountCategory, AccountNumber, BaseAccount, FeatureLayer, LayerKind, Money,
//!     environment::SystemClock,
//!     features::{FeeSchedule, Fees, Interest},
//! };
//! use layerbank_core::money::Rate;
//! use std::sync::Arc;
//!
//! let base = BaseAccount::open(
//!     AccountNumber::new("100000000001"),
//!     "Alice",
//!     AccountCategory::Savings,
//!     Money::new(50_000),
//!     Arc::new(SystemClock),
//! )
//! .unwrap_or_else(|e| panic!("{e}"));
//!
//! let account = FeatureLayer::boxed(base.boxed(), Fees::new(FeeSchedule::standard()));
//! let account = FeatureLayer::boxed(account, Interest::new(Rate::from_percent(3)));
//!
//! assert_eq!(account.layer_count(), 2);
//! assert!(account.has_layer(LayerKind::Fee));
//! assert!(account.full_description().ends_with("+ Interest 3% p.a."));
//! ```

use crate::account::chain::Link;
use crate::account::{Account, AccountCategory, AccountNumber, BaseAccount};
use crate::error::TransactionResult;
use crate::ledger::LedgerEntry;
use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// Kinds of feature layers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// Fee schedule
    Fee,
    /// Overdraft facility
    Overdraft,
    /// Interest accrual
    Interest,
    /// Account insurance
    Insurance,
    /// Loyalty points
    Loyalty,
    /// Transaction notifications
    Notification,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Fee => "fee",
            Self::Overdraft => "overdraft",
            Self::Interest => "interest",
            Self::Insurance => "insurance",
            Self::Loyalty => "loyalty",
            Self::Notification => "notification",
        };
        f.write_str(label)
    }
}

/// Behavior a layer adds on top of the account it wraps.
///
/// Every hook receives the wrapped account and defaults to delegating to it.
pub trait Feature: fmt::Debug + Send + Sync + 'static {
    /// Kind reported by [`Account::has_layer`]
    const KIND: LayerKind;

    /// Label appended to the composed description
    fn label(&self) -> String;

    /// Deposit hook
    ///
    /// # Errors
    ///
    /// Returns whatever the wrapped account or the feature rejects.
    fn deposit(&mut self, inner: &mut dyn Account, amount: Money) -> TransactionResult {
        inner.deposit(amount)
    }

    /// Withdrawal hook
    ///
    /// # Errors
    ///
    /// Returns whatever the wrapped account or the feature rejects.
    fn withdraw(&mut self, inner: &mut dyn Account, amount: Money) -> TransactionResult {
        inner.withdraw(amount)
    }

    /// Transfer hook
    ///
    /// # Errors
    ///
    /// Returns whatever the wrapped account, the target or the feature rejects.
    fn transfer(
        &mut self,
        inner: &mut dyn Account,
        target: &mut dyn Account,
        amount: Money,
    ) -> TransactionResult {
        inner.transfer(target, amount)
    }

    /// Monthly fee aggregate
    fn monthly_fees(&self, inner: &dyn Account) -> Money {
        inner.monthly_fees()
    }

    /// Monthly bonus aggregate
    fn monthly_bonus(&self, inner: &dyn Account) -> Money {
        inner.monthly_bonus()
    }

    /// Overdraft limit this feature grants to the whole chain, if any
    fn overdraft_limit(&self) -> Option<Money> {
        None
    }
}

/// Wrapper adding feature `F` to the account it owns
pub struct FeatureLayer<F: Feature> {
    feature: F,
    inner: Box<dyn Account>,
}

impl<F: Feature> FeatureLayer<F> {
    /// Wraps `inner` with `feature`
    #[must_use]
    pub fn wrap(mut inner: Box<dyn Account>, feature: F) -> Self {
        if let Some(limit) = feature.overdraft_limit() {
            inner.innermost_mut().grant_overdraft(limit);
        }
        tracing::debug!(
            account = %inner.account_number(),
            layer = %F::KIND,
            depth = inner.layer_count() + 1,
            "Attached feature layer"
        );
        Self { feature, inner }
    }

    /// Wraps `inner` with `feature` and boxes the result as a chain handle
    #[must_use]
    pub fn boxed(inner: Box<dyn Account>, feature: F) -> Box<dyn Account> {
        Box::new(Self::wrap(inner, feature))
    }

    /// The feature this layer adds
    #[must_use]
    pub const fn feature(&self) -> &F {
        &self.feature
    }

    pub(crate) const fn feature_mut(&mut self) -> &mut F {
        &mut self.feature
    }

    /// Splits the layer into its feature and the wrapped account
    pub(crate) fn parts_mut(&mut self) -> (&mut F, &mut dyn Account) {
        (&mut self.feature, self.inner.as_mut())
    }
}

impl<F: Feature> fmt::Debug for FeatureLayer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureLayer")
            .field("kind", &F::KIND)
            .field("feature", &self.feature)
            .field("account", self.inner.account_number())
            .field("depth", &self.layer_count())
            .finish()
    }
}

impl<F: Feature> Link for FeatureLayer<F> {
    fn innermost_mut(&mut self) -> &mut BaseAccount {
        self.inner.innermost_mut()
    }

    fn balance_floor(&self) -> Money {
        self.inner.balance_floor()
    }

    fn wrapped(&self) -> Option<&dyn Account> {
        Some(self.inner.as_ref())
    }

    fn wrapped_mut(&mut self) -> Option<&mut dyn Account> {
        Some(self.inner.as_mut())
    }

    fn layer_label(&self) -> Option<String> {
        Some(self.feature.label())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<F: Feature> Account for FeatureLayer<F> {
    fn account_number(&self) -> &AccountNumber {
        self.inner.account_number()
    }

    fn holder(&self) -> &str {
        self.inner.holder()
    }

    fn category(&self) -> AccountCategory {
        self.inner.category()
    }

    fn deposit(&mut self, amount: Money) -> TransactionResult {
        self.feature.deposit(self.inner.as_mut(), amount)
    }

    fn withdraw(&mut self, amount: Money) -> TransactionResult {
        self.feature.withdraw(self.inner.as_mut(), amount)
    }

    fn transfer(&mut self, target: &mut dyn Account, amount: Money) -> TransactionResult {
        self.feature.transfer(self.inner.as_mut(), target, amount)
    }

    fn balance(&self) -> Money {
        self.inner.balance()
    }

    fn description(&self) -> String {
        self.inner.description()
    }

    fn full_description(&self) -> String {
        format!("{} + {}", self.inner.full_description(), self.feature.label())
    }

    fn monthly_fees(&self) -> Money {
        self.feature.monthly_fees(self.inner.as_ref())
    }

    fn monthly_bonus(&self) -> Money {
        self.feature.monthly_bonus(self.inner.as_ref())
    }

    fn withdrawal_limit(&self) -> Money {
        self.inner.withdrawal_limit()
    }

    fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    fn ledger(&self) -> &[LedgerEntry] {
        self.inner.ledger()
    }

    fn layer_count(&self) -> usize {
        1 + self.inner.layer_count()
    }

    fn has_layer(&self, kind: LayerKind) -> bool {
        F::KIND == kind || self.inner.has_layer(kind)
    }

    fn innermost(&self) -> &BaseAccount {
        self.inner.innermost()
    }
}

/// Finds the outermost layer carrying feature `F`
pub(crate) fn find_layer<F: Feature>(account: &dyn Account) -> Option<&FeatureLayer<F>> {
    if let Some(layer) = account.as_any().downcast_ref::<FeatureLayer<F>>() {
        return Some(layer);
    }
    account.wrapped().and_then(find_layer::<F>)
}

/// Mutable variant of [`find_layer`]
pub(crate) fn find_layer_mut<F: Feature>(account: &mut dyn Account) -> Option<&mut FeatureLayer<F>> {
    if account.as_any().is::<FeatureLayer<F>>() {
        return account.as_any_mut().downcast_mut::<FeatureLayer<F>>();
    }
    account.wrapped_mut().and_then(find_layer_mut::<F>)
}

impl<'a> dyn Account + 'a {
    /// Looks up the outermost layer carrying feature `F` anywhere in the chain
    #[must_use]
    pub fn layer<F: Feature>(&self) -> Option<&FeatureLayer<F>> {
        find_layer::<F>(self)
    }

    /// Labels of every layer, first-attached first
    #[must_use]
    pub fn layer_labels(&self) -> Vec<String> {
        let mut labels = Vec::with_capacity(self.layer_count());
        collect_labels(self, &mut labels);
        labels
    }
}

fn collect_labels(account: &dyn Account, labels: &mut Vec<String>) {
    if let Some(inner) = account.wrapped() {
        collect_labels(inner, labels);
    }
    labels.extend(account.layer_label());
}
