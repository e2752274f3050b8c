//! # Layerbank Runtime
//!
//! Runtime pieces around the account chains of `layerbank-core`.
//!
//! ## Core Components
//!
//! - **`AccountStore`**: keyed store handing out one exclusive-access handle per account
//! - **`AccountAssembler`**: opens an account and attaches the requested feature layers
//! - **`PipelineConfig`**: defaults loaded from `LAYERBANK_*` environment variables
//! - **Metrics**: counters for opened accounts, attached layers and store traffic
//!
//! ## Example
//!
//! ```
//! use layerbank_core::{Money, environment::AccountEnvironment};
//! use layerbank_core::features::FeeSchedule;
//! use layerbank_runtime::{AccountAssembler, AccountStore, FeatureOption, PipelineConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = AccountStore::new();
//! let handle = AccountAssembler::new(AccountEnvironment::production(), PipelineConfig::from_env())
//!     .holder("Alice")
//!     .opening_balance(Money::new(100_000))
//!     .with(FeatureOption::Fees(FeeSchedule::standard()))
//!     .open_in(&store)?;
//!
//! let number = handle.lock().map_err(|e| e.to_string())?.account_number().clone();
//! drop(handle);
//!
//! let receipt = store.with_account(&number, |account| account.withdraw(Money::new(50_000)))??;
//! assert_eq!(receipt.fee, Money::new(1_250));
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod config;
pub mod metrics;
pub mod store;

pub use assembler::{AccountAssembler, AssemblyError, FeatureOption};
pub use config::PipelineConfig;
pub use metrics::register_metrics;
pub use store::{AccountHandle, AccountStore, StoreError};
