//! Transaction notifications.
//!
//! After every delegated deposit, withdrawal or transfer the layer sends a
//! message through the injected [`NotificationSink`]. A declined withdrawal
//! produces an alert instead, and a successful posting that leaves the
//! balance under the low-balance threshold produces a second alert.
//!
//! The layer never changes the outcome of the call it wraps: the wrapped
//! result is returned as-is, and sink failures are only logged.

use crate::account::Account;
use crate::environment::{Channel, NotificationSink};
use crate::error::{Receipt, TransactionResult};
use crate::layer::{Feature, LayerKind};
use crate::money::Money;
use std::fmt;
use std::sync::Arc;

/// Notification feature
#[derive(Clone)]
pub struct Notifications {
    sink: Arc<dyn NotificationSink>,
    channel: Channel,
    recipient: String,
    low_balance_threshold: Money,
}

impl Notifications {
    /// Balance under which an extra alert is sent, when none is configured
    pub const DEFAULT_LOW_BALANCE_THRESHOLD: Money = Money::new(10_000);

    /// Notifies `recipient` over `channel` through `sink`
    #[must_use]
    pub fn new(sink: Arc<dyn NotificationSink>, channel: Channel, recipient: impl Into<String>) -> Self {
        Self {
            sink,
            channel,
            recipient: recipient.into(),
            low_balance_threshold: Self::DEFAULT_LOW_BALANCE_THRESHOLD,
        }
    }

    /// Sets the low-balance alert threshold
    #[must_use]
    pub const fn with_low_balance_threshold(mut self, threshold: Money) -> Self {
        self.low_balance_threshold = threshold;
        self
    }

    /// Delivery channel
    #[must_use]
    pub const fn channel(&self) -> Channel {
        self.channel
    }

    /// Recipient, masked for display
    #[must_use]
    pub fn masked_recipient(&self) -> String {
        self.channel.mask(&self.recipient)
    }

    /// Low-balance alert threshold
    #[must_use]
    pub const fn low_balance_threshold(&self) -> Money {
        self.low_balance_threshold
    }

    fn deliver(&self, message: &str) {
        let recipient = self.masked_recipient();
        match self.sink.send(self.channel, &recipient, message) {
            Ok(()) => tracing::debug!(channel = %self.channel, %recipient, "Notification delivered"),
            Err(error) => {
                tracing::warn!(channel = %self.channel, %recipient, %error, "Notification delivery failed");
            }
        }
    }

    fn posted(&self, inner: &dyn Account, receipt: &Receipt, action: &str) {
        self.deliver(&format!(
            "{action} of {} on account {}: balance {}, ref {}",
            receipt.amount,
            inner.account_number().masked(),
            receipt.balance_after,
            receipt.reference
        ));
        if receipt.balance_after < self.low_balance_threshold {
            self.deliver(&format!(
                "Low balance alert on account {}: balance {} is below {}",
                inner.account_number().masked(),
                receipt.balance_after,
                self.low_balance_threshold
            ));
        }
    }
}

impl fmt::Debug for Notifications {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifications")
            .field("channel", &self.channel)
            .field("recipient", &self.masked_recipient())
            .field("low_balance_threshold", &self.low_balance_threshold)
            .finish_non_exhaustive()
    }
}

impl Feature for Notifications {
    const KIND: LayerKind = LayerKind::Notification;

    fn label(&self) -> String {
        format!("{} notifications to {}", self.channel, self.masked_recipient())
    }

    fn deposit(&mut self, inner: &mut dyn Account, amount: Money) -> TransactionResult {
        let result = inner.deposit(amount);
        if let Ok(receipt) = &result {
            self.posted(inner, receipt, "Deposit");
        }
        result
    }

    fn withdraw(&mut self, inner: &mut dyn Account, amount: Money) -> TransactionResult {
        let result = inner.withdraw(amount);
        match &result {
            Ok(receipt) => self.posted(inner, receipt, "Withdrawal"),
            Err(error) => self.deliver(&format!(
                "Alert: withdrawal of {amount} on account {} was declined: {error}",
                inner.account_number().masked()
            )),
        }
        result
    }

    fn transfer(
        &mut self,
        inner: &mut dyn Account,
        target: &mut dyn Account,
        amount: Money,
    ) -> TransactionResult {
        let result = inner.transfer(target, amount);
        if let Ok(receipt) = &result {
            let action = format!("Transfer to {}", target.account_number().masked());
            self.posted(inner, receipt, &action);
        }
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can unwrap
mod tests {
    use super::*;
    use crate::environment::NotificationError;
    use crate::features::fixtures::open;
    use crate::{AccountCategory, AccountNumber, BaseAccount, FeatureLayer, TransactionError};
    use crate::environment::SystemClock;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Outbox {
        sent: Mutex<Vec<(Channel, String, String)>>,
    }

    impl Outbox {
        fn messages(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|(_, _, m)| m.clone()).collect()
        }
    }

    impl NotificationSink for Outbox {
        fn send(&self, channel: Channel, masked_recipient: &str, message: &str) -> Result<(), NotificationError> {
            self.sent
                .lock()
                .unwrap()
                .push((channel, masked_recipient.to_string(), message.to_string()));
            Ok(())
        }
    }

    struct Broken;

    impl NotificationSink for Broken {
        fn send(&self, channel: Channel, _: &str, _: &str) -> Result<(), NotificationError> {
            Err(NotificationError::DeliveryFailed {
                channel,
                reason: "provider down".to_string(),
            })
        }
    }

    fn notified(balance: i64, outbox: &Arc<Outbox>) -> Box<dyn Account> {
        let sink: Arc<dyn NotificationSink> = outbox.clone();
        FeatureLayer::boxed(open(balance), Notifications::new(sink, Channel::Sms, "+84901234567"))
    }

    #[test]
    fn test_deposit_sends_masked_message() {
        let outbox = Arc::new(Outbox::default());
        let mut account = notified(50_000, &outbox);
        let receipt = account.deposit(Money::new(1_000)).unwrap();

        let sent = outbox.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, Channel::Sms);
        assert_eq!(sent[0].1, "********4567");
        assert!(sent[0].2.contains("********0001"));
        assert!(sent[0].2.contains("51,000"));
        assert!(sent[0].2.contains(receipt.reference.as_str()));
    }

    #[test]
    fn test_declined_withdrawal_sends_alert() {
        let outbox = Arc::new(Outbox::default());
        let mut account = notified(1_000, &outbox);
        let result = account.withdraw(Money::new(5_000));

        assert!(matches!(result, Err(TransactionError::InsufficientFunds { .. })));
        let messages = outbox.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Alert: withdrawal of 5,000"));
    }

    #[test]
    fn test_low_balance_alert_follows_posting() {
        let outbox = Arc::new(Outbox::default());
        let mut account = notified(15_000, &outbox);
        account.withdraw(Money::new(6_000)).unwrap();

        let messages = outbox.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].starts_with("Low balance alert"));
    }

    #[test]
    fn test_transfer_notifies_sender() {
        let outbox = Arc::new(Outbox::default());
        let mut account = notified(50_000, &outbox);
        let mut target = BaseAccount::open(
            AccountNumber::new("200000000002"),
            "Bob",
            AccountCategory::Savings,
            Money::ZERO,
            Arc::new(SystemClock),
        )
        .unwrap();

        account.transfer(&mut target, Money::new(20_000)).unwrap();
        let messages = outbox.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Transfer to ********0002 of 20,000"));
    }

    #[test]
    fn test_sink_failure_does_not_change_result() {
        let mut account = FeatureLayer::boxed(
            open(50_000),
            Notifications::new(Arc::new(Broken), Channel::Email, "alice@example.com"),
        );
        let receipt = account.withdraw(Money::new(45_000)).unwrap();
        assert_eq!(receipt.balance_after, Money::new(5_000));
        assert_eq!(account.balance(), Money::new(5_000));
    }

    #[test]
    fn test_label_masks_recipient() {
        let notifications = Notifications::new(Arc::new(Broken), Channel::Email, "alice@example.com");
        assert_eq!(notifications.label(), "email notifications to a***@example.com");
    }
}
