//! Concrete account features.
//!
//! Each feature becomes a layer through [`crate::FeatureLayer`]:
//!
//! | Feature            | Overrides                                   |
//! |--------------------|---------------------------------------------|
//! | [`Fees`]           | `withdraw` (bypass), `monthly_fees`         |
//! | [`Overdraft`]      | `withdraw` (bypass), `monthly_fees`         |
//! | [`Interest`]       | `monthly_bonus`                             |
//! | [`Insurance`]      | `monthly_fees`                              |
//! | [`Loyalty`]        | `deposit`, `withdraw`, `monthly_bonus`, `monthly_fees` (discount) |
//! | [`Notifications`]  | `deposit`, `withdraw`, `transfer`           |

pub mod fee;
pub mod insurance;
pub mod interest;
pub mod loyalty;
pub mod notification;
pub mod overdraft;

pub use fee::{FeeSchedule, FeeTier, Fees};
pub use insurance::{Claim, ClaimError, ClaimType, Insurance, InsuranceTier};
pub use interest::Interest;
pub use loyalty::{Loyalty, LoyaltyTier};
pub use notification::Notifications;
pub use overdraft::Overdraft;

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can unwrap
pub(crate) mod fixtures {
    use crate::environment::SystemClock;
    use crate::{Account, AccountCategory, AccountNumber, BaseAccount, Money};
    use std::sync::Arc;

    /// Bare checking account with the given opening balance
    pub fn open(balance: i64) -> Box<dyn Account> {
        BaseAccount::open(
            AccountNumber::new("100000000001"),
            "Alice",
            AccountCategory::Checking,
            Money::new(balance),
            Arc::new(SystemClock),
        )
        .unwrap()
        .boxed()
    }
}
