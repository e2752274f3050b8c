//! # Layerbank Testing
//!
//! Testing utilities and helpers for Layerbank account chains.
//!
//! This crate provides:
//! - Mock implementations of Environment traits
//! - A fluent Given-When-Then helper for account operations
//! - Property-based testing strategies
//! - Assertion helpers for receipts and ledgers
//!
//! ## Example
//!
//! ```
//! use layerbank_core::Money;
//! use layerbank_testing::{AccountTest, helpers::open_account};
//!
//! AccountTest::new()
//!     .given_account(open_account(100_000))
//!     .when_withdraw(Money::new(40_000))
//!     .then_balance(Money::new(60_000))
//!     .then_ledger_len(2)
//!     .run();
//! ```


use chrono::{DateTime, Utc};
use layerbank_core::environment::Clock;

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use layerbank_core::environment::{
        AccountEnvironment, Channel, NotificationError, NotificationSink,
    };
    use std::sync::{Arc, Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making ledger timestamps reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use layerbank_testing::mocks::FixedClock;
    /// use layerbank_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// One captured notification
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SentNotification {
        /// Channel used
        pub channel: Channel,
        /// Recipient as the layer masked it
        pub recipient: String,
        /// Message body
        pub message: String,
    }

    /// Sink that captures every notification instead of delivering it
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        sent: Mutex<Vec<SentNotification>>,
    }

    impl RecordingSink {
        /// Create an empty recording sink
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Every notification captured so far, oldest first
        #[must_use]
        pub fn sent(&self) -> Vec<SentNotification> {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Message bodies captured so far, oldest first
        #[must_use]
        pub fn messages(&self) -> Vec<String> {
            self.sent().into_iter().map(|n| n.message).collect()
        }

        /// Number of captured notifications
        #[must_use]
        pub fn len(&self) -> usize {
            self.sent.lock().unwrap_or_else(PoisonError::into_inner).len()
        }

        /// Check if nothing was captured
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    impl NotificationSink for RecordingSink {
        fn send(
            &self,
            channel: Channel,
            masked_recipient: &str,
            message: &str,
        ) -> Result<(), NotificationError> {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(SentNotification {
                    channel,
                    recipient: masked_recipient.to_string(),
                    message: message.to_string(),
                });
            Ok(())
        }
    }

    /// Sink whose provider is always down
    #[derive(Debug, Clone, Copy, Default)]
    pub struct FailingSink;

    impl NotificationSink for FailingSink {
        fn send(&self, channel: Channel, _: &str, _: &str) -> Result<(), NotificationError> {
            Err(NotificationError::DeliveryFailed {
                channel,
                reason: "provider unavailable".to_string(),
            })
        }
    }

    /// Environment with the fixed test clock and a recording sink
    ///
    /// The sink is returned alongside so tests can inspect what was sent.
    #[must_use]
    pub fn test_environment() -> (AccountEnvironment, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let environment = AccountEnvironment::new(Arc::new(test_clock()), sink.clone());
        (environment, sink)
    }
}

/// Test helpers and utilities.
pub mod helpers {
    use super::mocks::test_clock;
    use layerbank_core::{Account, AccountCategory, AccountNumber, BaseAccount, Money};
    use std::sync::Arc;

    /// Opens a bare checking account for "Alice" on the test clock
    ///
    /// # Panics
    ///
    /// Panics if `balance` is negative.
    #[must_use]
    pub fn open_account(balance: i64) -> Box<dyn Account> {
        open_numbered("100000000001", "Alice", balance)
    }

    /// Opens a bare checking account with the given number and holder
    ///
    /// # Panics
    ///
    /// Panics if `balance` is negative.
    #[must_use]
    #[allow(clippy::expect_used)] // Test helper
    pub fn open_numbered(number: &str, holder: &str, balance: i64) -> Box<dyn Account> {
        BaseAccount::open(
            AccountNumber::new(number),
            holder,
            AccountCategory::Checking,
            Money::new(balance),
            Arc::new(test_clock()),
        )
        .expect("test accounts open with a non-negative balance")
        .boxed()
    }

    /// Installs a `tracing` subscriber honoring `RUST_LOG`, once per process
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use layerbank_core::features::FeeSchedule;
    use layerbank_core::{Money, Rate};
    use proptest::prelude::*;

    /// Positive transaction amounts up to one million
    pub fn amount() -> impl Strategy<Value = Money> {
        (1i64..=1_000_000).prop_map(Money::new)
    }

    /// Non-negative opening balances up to ten million
    pub fn opening_balance() -> impl Strategy<Value = Money> {
        (0i64..=10_000_000).prop_map(Money::new)
    }

    /// Rates between 0 % and 25 %
    pub fn rate() -> impl Strategy<Value = Rate> {
        (0u32..=2_500).prop_map(Rate::from_bps)
    }

    /// One of the named fee schedules
    pub fn fee_schedule() -> impl Strategy<Value = FeeSchedule> {
        prop_oneof![
            Just(FeeSchedule::basic()),
            Just(FeeSchedule::standard()),
            Just(FeeSchedule::premium()),
        ]
    }
}

/// Helper assertions for receipts and ledgers
pub mod assertions {
    use layerbank_core::ledger::net_total;
    use layerbank_core::{Account, Receipt, TransactionResult};

    /// Assert that the operation succeeded and return its receipt
    ///
    /// # Panics
    ///
    /// Panics if `result` is an error.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_ok(result: &TransactionResult) -> &Receipt {
        match result {
            Ok(receipt) => receipt,
            Err(error) => panic!("Expected success, but got {error}"),
        }
    }

    /// Assert that the operation failed with the given error code
    ///
    /// # Panics
    ///
    /// Panics if `result` succeeded or failed with another code.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_rejected(result: &TransactionResult, code: &str) {
        match result {
            Ok(receipt) => panic!("Expected {code} rejection, but got {receipt:?}"),
            Err(error) => assert_eq!(error.code(), code, "Unexpected rejection: {error}"),
        }
    }

    /// Assert that replaying the ledger yields the current balance
    ///
    /// # Panics
    ///
    /// Panics if the ledger and the balance disagree.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_ledger_consistent(account: &dyn Account) {
        assert_eq!(
            net_total(account.ledger()),
            account.balance(),
            "Ledger does not reconcile with balance"
        );
    }
}

// Re-export commonly used items
pub use account_test::AccountTest;
pub use mocks::{FailingSink, FixedClock, RecordingSink, test_clock, test_environment};
