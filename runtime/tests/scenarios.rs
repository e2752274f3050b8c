//! End-to-end scenarios for assembled account chains
//!
//! Each test assembles an account the way an application would and checks
//! balances, ledger entries, aggregates and notifications.

#![allow(clippy::unwrap_used)] // Test code can unwrap

use layerbank_core::features::{
    ClaimType, FeeSchedule, Fees, InsuranceTier, Loyalty, LoyaltyTier, Overdraft,
};
use layerbank_core::{
    AccountCategory, AccountNumber, EntryKind, FeatureLayer, LayerKind, Money, Rate,
    TransactionError,
};
use layerbank_runtime::{AccountAssembler, AccountStore, FeatureOption, PipelineConfig};
use layerbank_testing::assertions::{assert_ledger_consistent, assert_ok, assert_rejected};
use layerbank_testing::helpers::{init_tracing, open_account};
use layerbank_testing::{AccountTest, test_environment};
use proptest::prelude::*;

fn assembler(opening: i64) -> AccountAssembler {
    let (environment, _sink) = test_environment();
    AccountAssembler::new(environment, PipelineConfig::default())
        .account_number(AccountNumber::new("100000000001"))
        .holder("Alice")
        .category(AccountCategory::Checking)
        .opening_balance(Money::new(opening))
}

#[test]
fn standard_fee_withdrawal() {
    init_tracing();
    let account = assembler(100_000)
        .with(FeatureOption::Fees(FeeSchedule::standard()))
        .build()
        .unwrap();

    AccountTest::new()
        .given_account(account)
        .when_withdraw(Money::new(50_000))
        .then_result(|result| {
            let receipt = assert_ok(result);
            assert_eq!(receipt.fee, Money::new(1_250));
            assert_eq!(receipt.kind, EntryKind::WithdrawalWithFee);
        })
        .then_balance(Money::new(48_750))
        .then_ledger_len(2)
        .then_account(assert_ledger_consistent)
        .run();
}

#[test]
fn overdraft_withdrawal_below_zero() {
    let account = assembler(50_000)
        .with(FeatureOption::Overdraft(Overdraft::new(
            Money::new(200_000),
            Rate::from_bps(150),
        )))
        .build()
        .unwrap();

    AccountTest::new()
        .given_account(account)
        .when_withdraw(Money::new(150_000))
        .then_result(|result| assert_eq!(assert_ok(result).fee, Money::new(1_500)))
        .then_balance(Money::new(-101_500))
        .then_account(assert_ledger_consistent)
        .run();
}

#[test]
fn gold_loyalty_discounts_fees_it_wraps() {
    let account = assembler(0)
        .with(FeatureOption::Loyalty(5_000))
        .with(FeatureOption::Fees(FeeSchedule::standard()))
        .build()
        .unwrap();

    assert_eq!(account.monthly_fees(), Money::new(1_600));
    assert_eq!(account.monthly_bonus(), Money::new(2_000));
}

#[test]
fn attachment_order_changes_fee_total() {
    // Fees outside loyalty: the discount never sees them.
    let account = FeatureLayer::boxed(open_account(0), Loyalty::with_points(5_000));
    let account = FeatureLayer::boxed(account, Fees::new(FeeSchedule::standard()));
    assert_eq!(account.monthly_fees(), Money::new(2_000));
    assert_eq!(
        account.layer_labels(),
        vec!["Loyalty Gold (5000 pts)", "Standard fees (2,000 monthly)"]
    );
}

#[test]
fn full_stack_withdrawal() {
    let (environment, sink) = test_environment();
    let mut account = AccountAssembler::new(environment, PipelineConfig::default())
        .holder("Alice")
        .opening_balance(Money::new(100_000))
        .with(FeatureOption::Notifications {
            channel: None,
            recipient: "+84901234567".to_string(),
        })
        .with(FeatureOption::Loyalty(0))
        .with(FeatureOption::Insurance(InsuranceTier::Basic))
        .with(FeatureOption::Interest(Rate::from_percent(3)))
        .with(FeatureOption::Overdraft(Overdraft::new(
            Money::new(200_000),
            Rate::from_bps(150),
        )))
        .with(FeatureOption::Fees(FeeSchedule::standard()))
        .build()
        .unwrap();

    assert_eq!(account.layer_count(), 6);
    for kind in [
        LayerKind::Fee,
        LayerKind::Overdraft,
        LayerKind::Interest,
        LayerKind::Insurance,
        LayerKind::Loyalty,
        LayerKind::Notification,
    ] {
        assert!(account.has_layer(kind));
    }
    // 2,000 standard fees + 1,000 basic premium, Bronze discount 0 %
    assert_eq!(account.monthly_fees(), Money::new(3_000));

    let receipt = account.withdraw(Money::new(50_000)).unwrap();
    assert_eq!(receipt.kind, EntryKind::WithdrawalWithFee);
    assert_eq!(account.balance(), Money::new(48_750));
    assert_eq!(
        account.layer::<Loyalty>().unwrap().feature().points(),
        250
    );

    let sent = sink.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "********4567");
    assert!(sent[0].message.contains("48,750"));

    assert!(account.is_covered(ClaimType::CardTheft));
    assert!(account.apply_monthly_interest().is_ok());
    assert_ledger_consistent(account.as_ref());
}

#[test]
fn overdraft_outside_fees_skips_withdrawal_fee() {
    // Overdrawing withdrawals are posted straight onto the base, so the fee
    // layer sitting inside the overdraft layer never charges them.
    let mut account = assembler(10_000)
        .with(FeatureOption::Fees(FeeSchedule::standard()))
        .with(FeatureOption::Overdraft(Overdraft::new(Money::new(50_000), Rate::ZERO)))
        .build()
        .unwrap();

    let receipt = account.withdraw(Money::new(20_000)).unwrap();
    assert_eq!(receipt.kind, EntryKind::OverdraftWithdrawal);
    assert_eq!(account.balance(), Money::new(-10_000));
}

#[test]
fn fees_outside_overdraft_split_the_fee() {
    let account = FeatureLayer::boxed(
        open_account(10_000),
        Overdraft::new(Money::new(50_000), Rate::ZERO),
    );
    let mut account = FeatureLayer::boxed(account, Fees::new(FeeSchedule::standard()));

    let receipt = account.withdraw(Money::new(20_000)).unwrap();
    // 1,000 + 0.5 % of 20,000
    assert_eq!(receipt.fee, Money::new(1_100));
    assert_eq!(receipt.kind, EntryKind::OverdraftWithdrawal);
    assert_eq!(account.balance(), Money::new(-11_100));

    let kinds: Vec<_> = account.ledger().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![EntryKind::Deposit, EntryKind::OverdraftWithdrawal, EntryKind::Fee]
    );
}

#[test]
fn assembled_fee_split_uses_outer_overdraft() {
    // Assembled order puts fees inside the overdraft layer.
    let mut account = assembler(10_000)
        .with(FeatureOption::Overdraft(Overdraft::new(Money::new(200_000), Rate::ZERO)))
        .with(FeatureOption::Fees(FeeSchedule::standard()))
        .build()
        .unwrap();

    let receipt = assert_ok(&account.withdraw(Money::new(9_500))).clone();
    assert_eq!(receipt.kind, EntryKind::Withdrawal);
    assert_eq!(receipt.fee, Money::new(1_048));
    assert_eq!(account.balance(), Money::new(-548));

    let ledger = account.ledger();
    assert_eq!(ledger.len(), 3);
    assert_eq!(ledger[1].kind, EntryKind::Withdrawal);
    assert_eq!(ledger[1].amount, Money::new(9_500));
    assert_eq!(ledger[2].kind, EntryKind::Fee);
    assert_eq!(ledger[2].amount, Money::new(1_048));
    assert_ledger_consistent(account.as_ref());
}

#[test]
fn overdraft_headroom_is_exact() {
    let mut account = assembler(1_000)
        .with(FeatureOption::Overdraft(Overdraft::new(Money::new(5_000), Rate::ZERO)))
        .build()
        .unwrap();

    assert_ok(&account.withdraw(Money::new(6_000)));
    assert_eq!(account.balance(), Money::new(-5_000));
    assert_rejected(&account.withdraw(Money::new(1)), "overdraft_limit_exceeded");
}

#[test]
fn transfer_runs_recipient_layers() {
    let store = AccountStore::new();
    let alice = AccountNumber::new("100000000001");
    let bob = AccountNumber::new("100000000002");

    let (environment, sink) = test_environment();
    let handle = assembler(100_000).open_in(&store).unwrap();
    drop(handle);
    let handle = AccountAssembler::new(environment, PipelineConfig::default())
        .account_number(bob.clone())
        .holder("Bob")
        .with(FeatureOption::Loyalty(0))
        .with(FeatureOption::Notifications {
            channel: None,
            recipient: "+84900000002".to_string(),
        })
        .open_in(&store)
        .unwrap();
    drop(handle);

    let receipt = store.transfer(&alice, &bob, Money::new(50_000)).unwrap();
    assert_eq!(receipt.kind, EntryKind::TransferOut);
    assert_eq!(receipt.balance_after, Money::new(50_000));

    store
        .with_account(&bob, |account| {
            assert_eq!(account.balance(), Money::new(50_000));
            assert_eq!(account.layer::<Loyalty>().unwrap().feature().points(), 500);
        })
        .unwrap();
    assert_eq!(sink.len(), 1);
}

#[test]
fn transfer_to_frozen_recipient_is_refused() {
    let mut alice = open_account(10_000);
    let mut bob = layerbank_testing::helpers::open_numbered("100000000002", "Bob", 0);
    bob.freeze();

    let result = alice.transfer(bob.as_mut(), Money::new(1_000));
    assert!(matches!(result, Err(TransactionError::InactiveAccount { .. })));
    assert_eq!(alice.balance(), Money::new(10_000));
    assert_ledger_consistent(alice.as_ref());
}

#[test]
fn loyalty_tier_climbs_with_activity() {
    let mut account = assembler(0).with(FeatureOption::Loyalty(0)).build().unwrap();
    account.deposit(Money::new(600_000)).unwrap();
    assert_eq!(
        account.layer::<Loyalty>().unwrap().feature().tier(),
        LoyaltyTier::Gold
    );
    assert_eq!(account.redeem_points(1_500).unwrap(), 1_500);
    assert_eq!(
        account.layer::<Loyalty>().unwrap().feature().tier(),
        LoyaltyTier::Silver
    );
}

proptest! {
    #[test]
    fn ledger_reconciles_on_full_stack(
        opening in layerbank_testing::properties::opening_balance(),
        operations in prop::collection::vec((any::<bool>(), layerbank_testing::properties::amount()), 1..30),
    ) {
        let mut account = assembler(opening.units())
            .with(FeatureOption::Fees(FeeSchedule::standard()))
            .with(FeatureOption::Overdraft(Overdraft::new(Money::new(200_000), Rate::from_bps(150))))
            .with(FeatureOption::Loyalty(0))
            .build()
            .unwrap();

        let mut previous_tier = LoyaltyTier::Bronze;
        for (is_deposit, amount) in operations {
            let _ = if is_deposit {
                account.deposit(amount)
            } else {
                account.withdraw(amount)
            };
            prop_assert!(account.balance() >= Money::new(-200_000));
            prop_assert_eq!(
                layerbank_core::ledger::net_total(account.ledger()),
                account.balance()
            );
            let tier = account.layer::<Loyalty>().unwrap().feature().tier();
            prop_assert!(tier >= previous_tier);
            previous_tier = tier;
        }
    }

    #[test]
    fn overdraft_accepts_exactly_up_to_headroom(
        balance in 0i64..1_000_000,
        limit in 0i64..1_000_000,
        amount in 1i64..3_000_000,
    ) {
        let mut account = assembler(balance)
            .withdrawal_limit(Money::new(10_000_000))
            .with(FeatureOption::Overdraft(Overdraft::new(Money::new(limit), Rate::ZERO)))
            .build()
            .unwrap();

        let result = account.withdraw(Money::new(amount));
        if amount <= balance + limit {
            prop_assert!(result.is_ok());
            prop_assert_eq!(account.balance(), Money::new(balance - amount));
        } else {
            let rejected = matches!(result, Err(TransactionError::OverdraftLimitExceeded { .. }));
            prop_assert!(rejected);
        }
    }
}
