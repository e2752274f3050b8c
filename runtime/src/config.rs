//! Pipeline configuration.
//!
//! Loads configuration from environment variables with sensible defaults.
//!
//! | Variable                              | Default  |
//! |---------------------------------------|----------|
//! | `LAYERBANK_WITHDRAWAL_LIMIT`          | 5000000  |
//! | `LAYERBANK_INTEREST_MINIMUM_BALANCE`  | 10000    |
//! | `LAYERBANK_LOW_BALANCE_THRESHOLD`     | 10000    |
//! | `LAYERBANK_NOTIFICATION_CHANNEL`      | `sms`    |

use layerbank_core::environment::Channel;
use layerbank_core::features::{Interest, Notifications};
use layerbank_core::{DEFAULT_WITHDRAWAL_LIMIT, Money};
use serde::{Deserialize, Serialize};
use std::env;

/// Defaults applied by the assembler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Per-withdrawal cap for accounts that do not set one
    pub withdrawal_limit: Money,
    /// Balance below which interest does not accrue
    pub interest_minimum_balance: Money,
    /// Balance under which notification layers send an alert
    pub low_balance_threshold: Money,
    /// Channel used by notification layers that do not name one
    pub notification_channel: Channel,
}

impl PipelineConfig {
    /// Load configuration from environment variables
    ///
    /// Unset or unparseable variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let money = |key: &str, default: Money| {
            lookup(key)
                .and_then(|s| s.trim().parse::<i64>().ok())
                .map_or(default, Money::new)
        };

        let config = Self {
            withdrawal_limit: money("LAYERBANK_WITHDRAWAL_LIMIT", defaults.withdrawal_limit),
            interest_minimum_balance: money(
                "LAYERBANK_INTEREST_MINIMUM_BALANCE",
                defaults.interest_minimum_balance,
            ),
            low_balance_threshold: money(
                "LAYERBANK_LOW_BALANCE_THRESHOLD",
                defaults.low_balance_threshold,
            ),
            notification_channel: lookup("LAYERBANK_NOTIFICATION_CHANNEL")
                .and_then(|s| parse_channel(&s))
                .unwrap_or(defaults.notification_channel),
        };
        tracing::debug!(?config, "Loaded pipeline configuration");
        config
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            withdrawal_limit: DEFAULT_WITHDRAWAL_LIMIT,
            interest_minimum_balance: Interest::DEFAULT_MINIMUM_BALANCE,
            low_balance_threshold: Notifications::DEFAULT_LOW_BALANCE_THRESHOLD,
            notification_channel: Channel::Sms,
        }
    }
}

fn parse_channel(value: &str) -> Option<Channel> {
    match value.trim().to_ascii_lowercase().as_str() {
        "sms" => Some(Channel::Sms),
        "email" => Some(Channel::Email),
        _ => None,
    }
}
