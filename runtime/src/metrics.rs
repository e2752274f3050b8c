//! Metrics emitted by the runtime.
//!
//! Counters go through the `metrics` facade; with no recorder installed they
//! are no-ops. Binaries that install a recorder call [`register_metrics`]
//! once so every counter carries a description.

use metrics::describe_counter;

// Re-export metrics macros for use in other modules
pub use metrics::counter;

/// Accounts opened through the assembler
pub const ACCOUNTS_OPENED: &str = "layerbank.accounts.opened";

/// Feature layers attached, labelled by `kind`
pub const LAYERS_ATTACHED: &str = "layerbank.layers.attached";

/// Store lookups, labelled by `outcome` (`hit` / `miss`)
pub const STORE_LOOKUPS: &str = "layerbank.store.lookups";

/// Transfers between stored accounts, labelled by `outcome` (`ok` / `rejected`)
pub const STORE_TRANSFERS: &str = "layerbank.store.transfers";

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(ACCOUNTS_OPENED, "Total number of accounts opened by the assembler");
    describe_counter!(LAYERS_ATTACHED, "Total number of feature layers attached to accounts");
    describe_counter!(STORE_LOOKUPS, "Total number of account store lookups");
    describe_counter!(STORE_TRANSFERS, "Total number of transfers between stored accounts");
}
