//! Walkthrough demo for layered accounts.
//!
//! Opens two accounts with different feature stacks, runs a few
//! transactions and prints balances, aggregates and ledgers.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=layerbank_core=debug cargo run --bin walkthrough
//! ```

use anyhow::{Context, Result};
use layerbank_core::environment::{AccountEnvironment, Channel};
use layerbank_core::features::{ClaimType, FeeSchedule, InsuranceTier, Overdraft};
use layerbank_core::{Account, AccountCategory, AccountNumber, Money, Rate};
use layerbank_runtime::{
    AccountAssembler, AccountStore, FeatureOption, PipelineConfig, register_metrics,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn print_account(account: &dyn Account) {
    println!("  {}", account.full_description());
    println!(
        "  balance {} | monthly fees {} | monthly bonus {} | {} layers",
        account.balance(),
        account.monthly_fees(),
        account.monthly_bonus(),
        account.layer_count()
    );
    for entry in account.ledger() {
        println!(
            "    {} {:<20} {:>10} fee {:>6} -> {:>10}  {}",
            entry.reference,
            entry.kind.to_string(),
            entry.amount,
            entry.fee,
            entry.balance_after,
            entry.description
        );
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    register_metrics();

    println!("=== Layered Accounts Walkthrough ===\n");

    let config = PipelineConfig::from_env();
    let environment = AccountEnvironment::production();
    let store = AccountStore::new();
    info!(?config, "Pipeline configured");

    let alice = AccountNumber::new("100000000001");
    let bob = AccountNumber::new("100000000002");

    drop(
        AccountAssembler::new(environment.clone(), config)
            .account_number(alice.clone())
            .holder("Alice")
            .category(AccountCategory::Professional)
            .opening_balance(Money::new(500_000))
            .with(FeatureOption::Fees(FeeSchedule::standard()))
            .with(FeatureOption::Overdraft(Overdraft::new(
                Money::new(200_000),
                Rate::from_bps(150),
            )))
            .with(FeatureOption::Insurance(InsuranceTier::Standard))
            .with(FeatureOption::Loyalty(4_800))
            .with(FeatureOption::Notifications {
                channel: Some(Channel::Email),
                recipient: "alice@example.com".to_string(),
            })
            .open_in(&store)
            .context("opening Alice's account")?,
    );

    drop(
        AccountAssembler::new(environment, config)
            .account_number(bob.clone())
            .holder("Bob")
            .category(AccountCategory::Savings)
            .opening_balance(Money::new(120_000))
            .with(FeatureOption::Interest(Rate::from_percent(3)))
            .open_in(&store)
            .context("opening Bob's account")?,
    );

    println!("Alice withdraws 50,000...");
    let receipt = store.with_account(&alice, |account| account.withdraw(Money::new(50_000)))??;
    println!("  {} (fee {})", receipt.message, receipt.fee);

    println!("Alice transfers 100,000 to Bob...");
    let receipt = store.transfer(&alice, &bob, Money::new(100_000))?;
    println!("  {}", receipt.message);

    println!("Alice withdraws 500,000 into her overdraft...");
    let receipt = store.with_account(&alice, |account| account.withdraw(Money::new(500_000)))??;
    println!("  {} (fee {})", receipt.message, receipt.fee);

    println!("Alice tries to withdraw another 100,000...");
    match store.with_account(&alice, |account| account.withdraw(Money::new(100_000)))? {
        Ok(receipt) => println!("  unexpectedly accepted: {}", receipt.message),
        Err(error) => println!("  rejected ({}): {error}", error.code()),
    }

    println!("Bob receives monthly interest...");
    let receipt = store.with_account(&bob, |account| account.apply_monthly_interest())??;
    println!("  {}", receipt.message);

    println!("Alice files a card theft claim of 80,000...");
    let claim = store
        .with_account(&alice, |account| {
            account.file_claim(ClaimType::CardTheft, Money::new(80_000))
        })??;
    println!("  claim {} approved for {}", claim.reference, claim.approved);

    for number in store.account_numbers() {
        println!("\nAccount {}:", number.masked());
        store.with_account(&number, |account| print_account(account))?;
    }

    println!("\n=== Walkthrough complete ===");
    Ok(())
}
