use engine::store::JsonFileBackend;
use engine::{
    AccountKind, Bank, BankError, CloseAccountStatus, Currency, DomainEvent, LoanDecision, Money,
    OpenAccountStatus, Principal, Role,
};
use rust_decimal_macros::dec;

fn bank() -> Bank {
    Bank::builder().build().unwrap()
}

fn customer(bank: &mut Bank, username: &str) -> Principal {
    bank.register(username, "hunter2", Role::Customer).unwrap();
    bank.login(username, "hunter2").unwrap()
}

fn manager(bank: &mut Bank) -> Principal {
    bank.register("boss", "secret", Role::Manager).unwrap();
    bank.login("boss", "secret").unwrap()
}

fn usd_balance(bank: &Bank, principal: &Principal, kind: AccountKind) -> rust_decimal::Decimal {
    bank.balances(principal, &principal.username)
        .unwrap()
        .into_iter()
        .find(|view| view.kind == kind)
        .map(|view| view.balances.get(&Currency::Usd).copied().unwrap_or_default())
        .unwrap_or_default()
}

/// Opens a savings account holding exactly `usd` after the creation fee.
fn open_savings(bank: &mut Bank, principal: &Principal, usd: rust_decimal::Decimal) {
    let status = bank
        .open_account(
            principal,
            AccountKind::Savings,
            Money::usd(usd + dec!(200)),
        )
        .unwrap();
    assert_eq!(status, OpenAccountStatus::Opened);
}

#[test]
fn login_rejects_bad_credentials() {
    let mut bank = bank();
    let alice = customer(&mut bank, "alice");
    assert_eq!(alice.role, Role::Customer);

    assert!(matches!(
        bank.login("alice", "wrong").unwrap_err(),
        BankError::NotAuthorized(_)
    ));
    assert!(matches!(
        bank.login("nobody", "hunter2").unwrap_err(),
        BankError::NotAuthorized(_)
    ));
    assert!(matches!(
        bank.register("alice", "again", Role::Customer).unwrap_err(),
        BankError::ExistingKey(_)
    ));
    assert!(matches!(
        bank.register("house", "pw", Role::Customer).unwrap_err(),
        BankError::ExistingKey(_)
    ));
}

#[test]
fn role_gating_on_facade_calls() {
    let mut bank = bank();
    let alice = customer(&mut bank, "alice");
    let boss = manager(&mut bank);

    assert!(matches!(
        bank.advance_day(&alice).unwrap_err(),
        BankError::NotAuthorized(_)
    ));
    assert!(matches!(
        bank.open_account(&boss, AccountKind::Savings, Money::usd(dec!(500)))
            .unwrap_err(),
        BankError::NotAuthorized(_)
    ));
    // A customer cannot read another customer's records.
    let bob = customer(&mut bank, "bob");
    assert!(matches!(
        bank.balances(&alice, &bob.username).unwrap_err(),
        BankError::NotAuthorized(_)
    ));
    assert!(bank.balances(&boss, &bob.username).is_ok());
}

#[test]
fn opening_charges_the_creation_fee() {
    let mut bank = bank();
    let alice = customer(&mut bank, "alice");

    let status = bank
        .open_account(&alice, AccountKind::Savings, Money::usd(dec!(1200)))
        .unwrap();
    assert_eq!(status, OpenAccountStatus::Opened);
    assert_eq!(usd_balance(&bank, &alice, AccountKind::Savings), dec!(1000));

    assert_eq!(
        bank.open_account(&alice, AccountKind::Savings, Money::usd(dec!(1200)))
            .unwrap(),
        OpenAccountStatus::AlreadyExists
    );
    // Deposit below the fee cannot fund an account.
    assert_eq!(
        bank.open_account(&alice, AccountKind::Checking, Money::usd(dec!(150)))
            .unwrap(),
        OpenAccountStatus::BelowMinimum
    );
    // Fee is charged in the deposit currency: 1400 CNY fee on a CNY opening.
    let status = bank
        .open_account(&alice, AccountKind::Checking, Money::new(dec!(2100), Currency::Cny))
        .unwrap();
    assert_eq!(status, OpenAccountStatus::Opened);
    let views = bank.balances(&alice, "alice").unwrap();
    let checking = views.iter().find(|v| v.kind == AccountKind::Checking).unwrap();
    assert_eq!(checking.balances.get(&Currency::Cny).copied(), Some(dec!(700)));
}

#[test]
fn security_opening_gates_and_funding_transfer() {
    let mut bank = bank();
    let alice = customer(&mut bank, "alice");

    assert_eq!(
        bank.open_account(&alice, AccountKind::Security, Money::usd(dec!(1500)))
            .unwrap(),
        OpenAccountStatus::NoSavingsAccount
    );

    open_savings(&mut bank, &alice, dec!(6000));
    assert_eq!(
        bank.open_account(&alice, AccountKind::Security, Money::usd(dec!(500)))
            .unwrap(),
        OpenAccountStatus::BelowMinimum
    );
    assert_eq!(
        bank.open_account(&alice, AccountKind::Security, Money::usd(dec!(4000)))
            .unwrap(),
        OpenAccountStatus::WouldBreachMaintenance
    );
    // When the funding both breaches maintenance and exceeds the USD
    // balance, the breach code wins.
    assert_eq!(
        bank.open_account(&alice, AccountKind::Security, Money::usd(dec!(7000)))
            .unwrap(),
        OpenAccountStatus::WouldBreachMaintenance
    );
    // Over-balance funding gets its own code once the post-transfer total
    // would stay above maintenance: 35000 CNY lifts the total to 11000 USD.
    bank.deposit(&alice, AccountKind::Savings, Money::new(dec!(35000), Currency::Cny))
        .unwrap();
    assert_eq!(
        bank.open_account(&alice, AccountKind::Security, Money::usd(dec!(7000)))
            .unwrap(),
        OpenAccountStatus::InsufficientSavingsForFundingTransfer
    );

    // 6000 funded with 1500 leaves savings 4500 and an enabled security
    // account holding 1500.
    assert_eq!(
        bank.open_account(&alice, AccountKind::Security, Money::usd(dec!(1500)))
            .unwrap(),
        OpenAccountStatus::Opened
    );
    assert_eq!(usd_balance(&bank, &alice, AccountKind::Savings), dec!(4500));
    assert_eq!(usd_balance(&bank, &alice, AccountKind::Security), dec!(1500));
    let portfolio = bank.portfolio(&alice, "alice").unwrap();
    assert!(portfolio.enabled);
}

#[test]
fn security_opening_requires_eligible_savings() {
    let mut bank = bank();
    let alice = customer(&mut bank, "alice");
    open_savings(&mut bank, &alice, dec!(4000));

    assert_eq!(
        bank.open_account(&alice, AccountKind::Security, Money::usd(dec!(1000)))
            .unwrap(),
        OpenAccountStatus::SavingsBalanceTooLow
    );
}

#[test]
fn withdraw_then_deposit_restores_balance_minus_fee() {
    let mut bank = bank();
    let alice = customer(&mut bank, "alice");
    open_savings(&mut bank, &alice, dec!(1000));

    bank.withdraw(&alice, AccountKind::Savings, Money::usd(dec!(300)))
        .unwrap();
    assert_eq!(usd_balance(&bank, &alice, AccountKind::Savings), dec!(650));
    bank.deposit(&alice, AccountKind::Savings, Money::usd(dec!(300)))
        .unwrap();
    assert_eq!(usd_balance(&bank, &alice, AccountKind::Savings), dec!(950));

    // Fee rollback: principal would fit but the fee would not.
    let err = bank
        .withdraw(&alice, AccountKind::Savings, Money::usd(dec!(920)))
        .unwrap_err();
    assert!(matches!(err, BankError::InsufficientFunds(_)));
    assert_eq!(usd_balance(&bank, &alice, AccountKind::Savings), dec!(950));
}

#[test]
fn exchange_converts_through_the_dollar_peg() {
    let mut bank = bank();
    let alice = customer(&mut bank, "alice");
    open_savings(&mut bank, &alice, dec!(1000));
    bank.deposit(&alice, AccountKind::Savings, Money::new(dec!(700), Currency::Cny))
        .unwrap();

    bank.exchange_currency(
        &alice,
        AccountKind::Savings,
        Money::new(dec!(700), Currency::Cny),
        Currency::Usd,
    )
    .unwrap();

    let views = bank.balances(&alice, "alice").unwrap();
    let savings = views.iter().find(|v| v.kind == AccountKind::Savings).unwrap();
    // 1000 + 100 converted - 50 withdrawal fee.
    assert_eq!(savings.balances.get(&Currency::Usd).copied(), Some(dec!(1050)));
    assert_eq!(savings.balances.get(&Currency::Cny).copied(), Some(dec!(0)));
}

#[test]
fn exchange_into_a_rejected_leg_does_not_restore_funds() {
    let mut bank = bank();
    let alice = customer(&mut bank, "alice");
    open_savings(&mut bank, &alice, dec!(6000));
    bank.open_account(&alice, AccountKind::Security, Money::usd(dec!(3000)))
        .unwrap();

    // Security accounts hold USD only, so the deposit leg is rejected after
    // the withdraw leg already ran. Observed behavior: the withdrawn funds
    // and the fee stay gone.
    let err = bank
        .exchange_currency(
            &alice,
            AccountKind::Security,
            Money::usd(dec!(1000)),
            Currency::Cny,
        )
        .unwrap_err();
    assert!(matches!(err, BankError::CurrencyMismatch(_)));
    assert_eq!(usd_balance(&bank, &alice, AccountKind::Security), dec!(1950));
}

#[test]
fn checking_transfer_to_missing_recipient_recovers_principal() {
    let mut bank = bank();
    let alice = customer(&mut bank, "alice");
    bank.open_account(&alice, AccountKind::Checking, Money::usd(dec!(1200)))
        .unwrap();

    let err = bank
        .transfer(
            &alice,
            AccountKind::Checking,
            "ghost",
            AccountKind::Savings,
            Money::usd(dec!(100)),
        )
        .unwrap_err();
    assert!(matches!(err, BankError::KeyNotFound(_)));
    // The transfer fee stays paid; the principal is redeposited.
    assert_eq!(usd_balance(&bank, &alice, AccountKind::Checking), dec!(900));
}

#[test]
fn transfer_moves_funds_and_charges_checking_fee() {
    let mut bank = bank();
    let alice = customer(&mut bank, "alice");
    let bob = customer(&mut bank, "bob");
    bank.open_account(&alice, AccountKind::Checking, Money::usd(dec!(1200)))
        .unwrap();
    open_savings(&mut bank, &bob, dec!(1000));

    bank.transfer(
        &alice,
        AccountKind::Checking,
        "bob",
        AccountKind::Savings,
        Money::usd(dec!(300)),
    )
    .unwrap();
    assert_eq!(usd_balance(&bank, &alice, AccountKind::Checking), dec!(600));
    assert_eq!(usd_balance(&bank, &bob, AccountKind::Savings), dec!(1300));

    // Savings senders pay no transfer fee.
    bank.transfer(
        &bob,
        AccountKind::Savings,
        "alice",
        AccountKind::Checking,
        Money::usd(dec!(100)),
    )
    .unwrap();
    assert_eq!(usd_balance(&bank, &bob, AccountKind::Savings), dec!(1200));
    assert_eq!(usd_balance(&bank, &alice, AccountKind::Checking), dec!(700));
}

#[test]
fn savings_threshold_flips_the_security_gate() {
    let mut bank = bank();
    let alice = customer(&mut bank, "alice");
    open_savings(&mut bank, &alice, dec!(6000));
    bank.open_account(&alice, AccountKind::Security, Money::usd(dec!(1500)))
        .unwrap();
    let events = bank.subscribe();

    // Savings 4500 -> 2450: below the maintenance threshold.
    bank.withdraw(&alice, AccountKind::Savings, Money::usd(dec!(2000)))
        .unwrap();
    assert!(!bank.portfolio(&alice, "alice").unwrap().enabled);
    assert!(events.try_iter().any(|event| matches!(
        event,
        DomainEvent::AccountChanged { kind: AccountKind::Security, .. }
    )));

    // Back to exactly 2500: re-enabled.
    bank.deposit(&alice, AccountKind::Savings, Money::usd(dec!(50)))
        .unwrap();
    assert!(bank.portfolio(&alice, "alice").unwrap().enabled);
}

#[test]
fn disabled_security_account_cannot_trade() {
    let mut bank = bank();
    let boss = manager(&mut bank);
    let alice = customer(&mut bank, "alice");
    open_savings(&mut bank, &alice, dec!(6000));
    bank.open_account(&alice, AccountKind::Security, Money::usd(dec!(3000)))
        .unwrap();
    bank.add_stock(&boss, "ACME", dec!(10)).unwrap();

    bank.withdraw(&alice, AccountKind::Savings, Money::usd(dec!(700)))
        .unwrap();
    assert!(matches!(
        bank.buy_stock(&alice, "ACME", 1).unwrap_err(),
        BankError::AccountDisabled(_)
    ));
}

#[test]
fn lot_accounting_on_partial_sell() {
    let mut bank = bank();
    let boss = manager(&mut bank);
    let alice = customer(&mut bank, "alice");
    open_savings(&mut bank, &alice, dec!(10000));
    bank.open_account(&alice, AccountKind::Security, Money::usd(dec!(5000)))
        .unwrap();
    bank.add_stock(&boss, "ACME", dec!(10)).unwrap();

    bank.buy_stock(&alice, "ACME", 10).unwrap();
    assert_eq!(usd_balance(&bank, &alice, AccountKind::Security), dec!(4900));

    bank.update_price(&boss, "ACME", dec!(15)).unwrap();
    let realized = bank.sell_stock(&alice, "ACME", Some(4)).unwrap();
    assert_eq!(realized, dec!(20));
    assert_eq!(usd_balance(&bank, &alice, AccountKind::Security), dec!(4960));

    let portfolio = bank.portfolio(&alice, "alice").unwrap();
    assert_eq!(portfolio.holdings.len(), 1);
    assert_eq!(portfolio.holdings[0].quantity, 6);
    assert_eq!(portfolio.unrealized_profit, dec!(30));
    assert_eq!(portfolio.realized_profit, dec!(20));

    let trades = bank.stock_transactions(&alice, "alice").unwrap();
    assert_eq!(trades.len(), 2);
    assert!(trades[0].is_buy);
    assert!(!trades[1].is_buy);
}

#[test]
fn sell_everything_at_cost_realizes_nothing() {
    let mut bank = bank();
    let boss = manager(&mut bank);
    let alice = customer(&mut bank, "alice");
    open_savings(&mut bank, &alice, dec!(10000));
    bank.open_account(&alice, AccountKind::Security, Money::usd(dec!(5000)))
        .unwrap();
    bank.add_stock(&boss, "ACME", dec!(10)).unwrap();

    bank.buy_stock(&alice, "ACME", 5).unwrap();
    let realized = bank.sell_stock(&alice, "ACME", None).unwrap();
    assert_eq!(realized, dec!(0));
    assert_eq!(usd_balance(&bank, &alice, AccountKind::Security), dec!(5000));

    // Overselling fails with no mutation.
    bank.buy_stock(&alice, "ACME", 3).unwrap();
    assert!(matches!(
        bank.sell_stock(&alice, "ACME", Some(4)).unwrap_err(),
        BankError::InsufficientFunds(_)
    ));
    assert_eq!(bank.portfolio(&alice, "alice").unwrap().holdings[0].quantity, 3);
}

#[test]
fn delisting_force_liquidates_every_holder() {
    let mut bank = bank();
    let boss = manager(&mut bank);
    let alice = customer(&mut bank, "alice");
    let bob = customer(&mut bank, "bob");
    for principal in [&alice, &bob] {
        open_savings(&mut bank, principal, dec!(10000));
        bank.open_account(principal, AccountKind::Security, Money::usd(dec!(5000)))
            .unwrap();
    }
    bank.add_stock(&boss, "ACME", dec!(10)).unwrap();
    bank.buy_stock(&alice, "ACME", 2).unwrap();
    bank.buy_stock(&bob, "ACME", 3).unwrap();
    bank.update_price(&boss, "ACME", dec!(12)).unwrap();

    let events = bank.subscribe();
    bank.delist_stock(&boss, "ACME").unwrap();

    assert!(bank.stocks().is_empty());
    assert_eq!(usd_balance(&bank, &alice, AccountKind::Security), dec!(5004));
    assert_eq!(usd_balance(&bank, &bob, AccountKind::Security), dec!(5006));
    let portfolio = bank.portfolio(&bob, "bob").unwrap();
    assert!(portfolio.holdings.is_empty());
    assert_eq!(portfolio.realized_profit, dec!(6));
    assert!(events.try_iter().any(|event| matches!(
        event,
        DomainEvent::StockDelisted { .. }
    )));
}

#[test]
fn loan_workflow_from_request_to_repayment() {
    let mut bank = bank();
    let boss = manager(&mut bank);
    let alice = customer(&mut bank, "alice");
    open_savings(&mut bank, &alice, dec!(1000));

    bank.request_loan(&alice, "car", dec!(2000), dec!(1000)).unwrap();
    assert!(matches!(
        bank.request_loan(&alice, "car", dec!(3000), dec!(500)).unwrap_err(),
        BankError::ExistingKey(_)
    ));
    assert_eq!(bank.pending_loans(&boss).unwrap().len(), 1);

    assert_eq!(
        bank.approve_loan(&boss, "alice", "car").unwrap(),
        LoanDecision::Approved
    );
    assert_eq!(usd_balance(&bank, &alice, AccountKind::Savings), dec!(2000));
    assert_eq!(bank.active_loans(&alice, "alice").unwrap().len(), 1);

    // Under-collateralized requests are auto-rejected on review.
    bank.request_loan(&alice, "boat", dec!(500), dec!(1000)).unwrap();
    assert_eq!(
        bank.approve_loan(&boss, "alice", "boat").unwrap(),
        LoanDecision::Rejected
    );
    assert!(bank.pending_loans(&boss).unwrap().is_empty());
    assert_eq!(bank.active_loans(&alice, "alice").unwrap().len(), 1);

    // Repayment is all or nothing.
    assert!(matches!(
        bank.pay_loan(&alice, "car", Money::usd(dec!(500))).unwrap_err(),
        BankError::PartialRepayment(_)
    ));
    bank.pay_loan(&alice, "car", Money::new(dec!(7000), Currency::Cny))
        .unwrap();
    assert!(bank.active_loans(&alice, "alice").unwrap().is_empty());
}

#[test]
fn rejecting_a_loan_discards_the_request() {
    let mut bank = bank();
    let boss = manager(&mut bank);
    let alice = customer(&mut bank, "alice");

    bank.request_loan(&alice, "car", dec!(2000), dec!(1000)).unwrap();
    bank.reject_loan(&boss, "alice", "car").unwrap();
    assert!(bank.pending_loans(&boss).unwrap().is_empty());
    assert!(matches!(
        bank.reject_loan(&boss, "alice", "car").unwrap_err(),
        BankError::KeyNotFound(_)
    ));
    // The name is free again after a rejection.
    bank.request_loan(&alice, "car", dec!(2000), dec!(1000)).unwrap();
}

#[test]
fn month_end_accrues_savings_and_loan_interest() {
    let mut bank = bank();
    let boss = manager(&mut bank);
    let alice = customer(&mut bank, "alice");
    let bob = customer(&mut bank, "bob");
    open_savings(&mut bank, &alice, dec!(6000));
    open_savings(&mut bank, &bob, dec!(1000));
    bank.request_loan(&alice, "car", dec!(2000), dec!(1000)).unwrap();
    bank.approve_loan(&boss, "alice", "car").unwrap();

    let events = bank.subscribe();
    bank.advance_month(&boss).unwrap();

    // 7000 (6000 + disbursed 1000) earns 10%; bob is below the threshold.
    assert_eq!(usd_balance(&bank, &alice, AccountKind::Savings), dec!(7700));
    assert_eq!(usd_balance(&bank, &bob, AccountKind::Savings), dec!(1000));
    let loans = bank.active_loans(&alice, "alice").unwrap();
    assert_eq!(loans[0].principal, dec!(1150));
    assert!(events.try_iter().any(|event| matches!(
        event,
        DomainEvent::DateAdvanced { .. }
    )));
}

#[test]
fn day_advance_accrues_only_on_month_rollover() {
    let mut bank = bank();
    let boss = manager(&mut bank);
    let alice = customer(&mut bank, "alice");
    open_savings(&mut bank, &alice, dec!(6000));

    // Genesis is January 1st; thirty advances stay inside January.
    for _ in 0..30 {
        bank.advance_day(&boss).unwrap();
    }
    assert_eq!(usd_balance(&bank, &alice, AccountKind::Savings), dec!(6000));

    let date = bank.advance_day(&boss).unwrap();
    assert_eq!(date.to_string(), "2024-02-01");
    assert_eq!(usd_balance(&bank, &alice, AccountKind::Savings), dec!(6600));
}

#[test]
fn security_deposits_are_usd_only_and_floored() {
    let mut bank = bank();
    let alice = customer(&mut bank, "alice");
    open_savings(&mut bank, &alice, dec!(6000));
    bank.open_account(&alice, AccountKind::Security, Money::usd(dec!(1500)))
        .unwrap();

    assert!(matches!(
        bank.deposit(&alice, AccountKind::Security, Money::new(dec!(7000), Currency::Cny))
            .unwrap_err(),
        BankError::CurrencyMismatch(_)
    ));
    assert!(matches!(
        bank.deposit(&alice, AccountKind::Security, Money::usd(dec!(500)))
            .unwrap_err(),
        BankError::BelowMinimum(_)
    ));
    bank.deposit(&alice, AccountKind::Security, Money::usd(dec!(1000)))
        .unwrap();
    assert_eq!(usd_balance(&bank, &alice, AccountKind::Security), dec!(2500));
}

#[test]
fn closing_an_account_requires_the_fee() {
    let mut bank = bank();
    let alice = customer(&mut bank, "alice");

    assert_eq!(
        bank.close_account(&alice, AccountKind::Savings).unwrap(),
        CloseAccountStatus::NotFound
    );

    open_savings(&mut bank, &alice, dec!(150));
    assert_eq!(
        bank.close_account(&alice, AccountKind::Savings).unwrap(),
        CloseAccountStatus::InsufficientFunds
    );
    assert_eq!(usd_balance(&bank, &alice, AccountKind::Savings), dec!(150));

    bank.deposit(&alice, AccountKind::Savings, Money::usd(dec!(100)))
        .unwrap();
    assert_eq!(
        bank.close_account(&alice, AccountKind::Savings).unwrap(),
        CloseAccountStatus::Closed
    );
    assert!(bank.balances(&alice, "alice").unwrap().is_empty());
}

#[test]
fn state_survives_a_snapshot_reload() {
    let path = std::env::temp_dir().join(format!("teller_it_{}.json", uuid::Uuid::new_v4()));
    {
        let mut bank = Bank::builder()
            .backend(Box::new(JsonFileBackend::new(path.clone())))
            .build()
            .unwrap();
        let alice = customer(&mut bank, "alice");
        open_savings(&mut bank, &alice, dec!(1000));
    }

    let mut bank = Bank::builder()
        .backend(Box::new(JsonFileBackend::new(path.clone())))
        .build()
        .unwrap();
    let alice = bank.login("alice", "hunter2").unwrap();
    assert_eq!(usd_balance(&bank, &alice, AccountKind::Savings), dec!(1000));
    let history = bank.transactions(&alice, "alice", AccountKind::Savings).unwrap();
    assert_eq!(history.len(), 2);

    std::fs::remove_file(path).ok();
}

#[test]
fn daily_report_lists_the_days_entries() {
    let mut bank = bank();
    let boss = manager(&mut bank);
    let alice = customer(&mut bank, "alice");
    open_savings(&mut bank, &alice, dec!(1000));
    let today = bank.current_date();

    let report = bank.daily_report(&boss, today).unwrap();
    // Opening fee plus the net deposit.
    assert_eq!(report.len(), 2);
    assert!(bank.daily_report(&boss, today.succ_opt().unwrap()).unwrap().is_empty());

    assert_eq!(bank.customers(&boss).unwrap(), vec!["alice".to_string()]);
}
