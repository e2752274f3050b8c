//! # Layerbank Core
//!
//! Account capability trait, base account and composable feature layers.
//!
//! An account is a [`BaseAccount`] wrapped by an ordered stack of
//! [`FeatureLayer`]s. Each layer adds one feature (fees, overdraft, interest,
//! insurance, loyalty points, notifications) and delegates everything else to
//! the account it wraps. Callers hold a single `Box<dyn Account>` handle and
//! cannot tell how many layers sit behind it.
//!
//! ## Core Concepts
//!
//! - **Account**: the capability set every layer and the base implement
//! - **`BaseAccount`**: the only holder of balance, ledger and active flag
//! - **Feature**: the behavior a layer adds, with hooks that default to delegation
//! - **Bypass**: the crate-internal path some layers use to post directly on the base
//! - **Environment**: injected clock and notification sink
//!
//! ## Example
//!
//! ```
//! use layerbank_core::{
//!     Account, AccountCategory, AccountNumber, BaseAccount, FeatureLayer, Money,
//!     environment::SystemClock,
//!     features::{FeeSchedule, Fees},
//! };
//! use std::sync::Arc;
//!
//! let base = BaseAccount::open(
//!     AccountNumber::new("100000000001"),
//!     "Alice",
//!     AccountCategory::Checking,
//!     Money::new(100_000),
//!     Arc::new(SystemClock),
//! )
//! .unwrap_or_else(|e| panic!("{e}"));
//!
//! let mut account = FeatureLayer::boxed(base.boxed(), Fees::new(FeeSchedule::standard()));
//! let receipt = account.withdraw(Money::new(50_000)).unwrap_or_else(|e| panic!("{e}"));
//!
//! assert_eq!(receipt.fee, Money::new(1_250));
//! assert_eq!(account.balance(), Money::new(48_750));
//! ```

pub mod account;
pub mod error;
pub mod features;
pub mod layer;
pub mod ledger;
pub mod money;

// Re-export commonly used types
pub use account::{Account, AccountCategory, AccountNumber, BaseAccount, DEFAULT_WITHDRAWAL_LIMIT};
pub use chrono::{DateTime, Utc};
pub use error::{Receipt, TransactionError, TransactionResult};
pub use layer::{Feature, FeatureLayer, LayerKind};
pub use ledger::{EntryKind, LedgerEntry, Reference};
pub use money::{Money, Rate};

/// Environment module - Dependency injection traits
///
/// All external collaborators of the pipeline are abstracted behind traits
/// and injected through [`AccountEnvironment`](environment::AccountEnvironment).
pub mod environment {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use std::sync::Arc;
    use thiserror::Error;

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Delivery channel of a notification
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Channel {
        /// Text message to a phone number
        Sms,
        /// Email to an address
        Email,
    }

    impl Channel {
        /// Masks a recipient for display and delivery logs.
        ///
        /// Phone numbers keep their last four digits; email addresses keep the
        /// first character of the local part and the domain.
        #[must_use]
        pub fn mask(self, recipient: &str) -> String {
            match self {
                Self::Sms => crate::account::mask_tail(recipient),
                Self::Email => match recipient.split_once('@') {
                    Some((local, domain)) => {
                        let first: String = local.chars().take(1).collect();
                        format!("{first}***@{domain}")
                    }
                    None => "***".to_string(),
                },
            }
        }
    }

    impl fmt::Display for Channel {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Sms => f.write_str("sms"),
                Self::Email => f.write_str("email"),
            }
        }
    }

    /// Errors a notification sink may report
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum NotificationError {
        /// The provider rejected or failed to deliver the message
        #[error("Delivery over {channel} failed: {reason}")]
        DeliveryFailed {
            /// Channel used
            channel: Channel,
            /// Provider-reported reason
            reason: String,
        },
    }

    /// Outbound message delivery (SMS / email providers).
    ///
    /// Delivery is fire-and-forget from the pipeline's point of view: a
    /// returned error is logged and never changes a transaction outcome.
    pub trait NotificationSink: Send + Sync {
        /// Sends `message` to the masked recipient over `channel`
        ///
        /// # Errors
        ///
        /// Returns [`NotificationError`] if the provider fails.
        fn send(
            &self,
            channel: Channel,
            masked_recipient: &str,
            message: &str,
        ) -> Result<(), NotificationError>;
    }

    /// Sink that writes every notification to the log instead of a provider
    #[derive(Debug, Clone, Copy, Default)]
    pub struct LogSink;

    impl NotificationSink for LogSink {
        fn send(
            &self,
            channel: Channel,
            masked_recipient: &str,
            message: &str,
        ) -> Result<(), NotificationError> {
            tracing::info!(%channel, recipient = masked_recipient, message, "Notification sent");
            Ok(())
        }
    }

    /// Environment dependencies for building accounts
    #[derive(Clone)]
    pub struct AccountEnvironment {
        /// Clock for ledger timestamps
        pub clock: Arc<dyn Clock>,
        /// Sink used by notification layers
        pub notifier: Arc<dyn NotificationSink>,
    }

    impl AccountEnvironment {
        /// Creates a new `AccountEnvironment`
        #[must_use]
        pub fn new(clock: Arc<dyn Clock>, notifier: Arc<dyn NotificationSink>) -> Self {
            Self { clock, notifier }
        }

        /// System clock and log-only notifications
        #[must_use]
        pub fn production() -> Self {
            Self::new(Arc::new(SystemClock), Arc::new(LogSink))
        }
    }

    impl fmt::Debug for AccountEnvironment {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("AccountEnvironment").finish_non_exhaustive()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::environment::{Channel, Clock, SystemClock};

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }

    #[test]
    fn test_channel_masks_recipients() {
        assert_eq!(Channel::Sms.mask("+84901234567"), "********4567");
        assert_eq!(Channel::Email.mask("alice@example.com"), "a***@example.com");
        assert_eq!(Channel::Email.mask("not-an-email"), "***");
    }
}
