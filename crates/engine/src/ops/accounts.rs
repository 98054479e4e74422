//! Account lifecycle, deposits, withdrawals and currency exchange.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::constants::{
    ACCOUNT_OPEN_CLOSE_FEE_USD, EXTERNAL_PARTY, HOUSE_ACCOUNT, SAVINGS_ELIGIBILITY_USD,
    SECURITY_MAINTENANCE_USD, SECURITY_MIN_DEPOSIT_USD, WITHDRAWAL_FEE_USD,
};
use crate::{
    Account, AccountKind, BankError, BankResult, Currency, DomainEvent, Money, Principal,
    Transaction,
};

use super::Bank;

/// Outcome of an open-account request. Only `Opened` creates the account;
/// every other variant names the first check that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenAccountStatus {
    Opened,
    /// Savings/checking: opening deposit below the creation fee.
    /// Security: funding transfer below the minimum deposit.
    BelowMinimum,
    /// Security: pre-transfer savings total below the eligibility threshold.
    SavingsBalanceTooLow,
    AlreadyExists,
    /// Security: funding transfer exceeds the savings USD balance.
    InsufficientSavingsForFundingTransfer,
    /// Security: the owner has no savings account to fund from.
    NoSavingsAccount,
    /// Security: the funding transfer would drop savings below the
    /// maintenance threshold, disabling the account at birth.
    WouldBreachMaintenance,
}

/// Outcome of a close-account request, distinguishing "never existed" from
/// "cannot pay the closing fee".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseAccountStatus {
    Closed,
    NotFound,
    InsufficientFunds,
}

/// Read model for one account, as shown to its owner or a manager.
#[derive(Clone, Debug, PartialEq)]
pub struct BalanceView {
    pub kind: AccountKind,
    pub balances: BTreeMap<Currency, Decimal>,
    pub total_usd: Decimal,
    pub security: Option<SecurityBalanceView>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SecurityBalanceView {
    pub enabled: bool,
    pub realized_profit: Decimal,
}

impl Bank {
    /// Opens an account for the caller.
    ///
    /// Savings and checking accounts are funded by an external deposit; the
    /// flat creation fee is charged in the deposit currency and goes to the
    /// house. Security accounts are instead funded by a USD transfer out of
    /// the caller's savings account, gated on the savings thresholds, and pay
    /// no creation fee.
    pub fn open_account(
        &mut self,
        principal: &Principal,
        kind: AccountKind,
        initial: Money,
    ) -> BankResult<OpenAccountStatus> {
        let owner = self.require_customer(principal)?.to_string();
        if !initial.is_positive() {
            return Err(BankError::InvalidAmount(format!(
                "opening deposit must be positive, got {initial}"
            )));
        }
        if self.store.accounts.contains(&(owner.clone(), kind)) {
            return Ok(OpenAccountStatus::AlreadyExists);
        }

        let status = match kind {
            AccountKind::Savings | AccountKind::Checking => {
                self.open_funded_account(&owner, kind, initial)
            }
            AccountKind::Security => self.open_security_account(&owner, initial)?,
        };
        if status == OpenAccountStatus::Opened {
            self.refresh_security_gate(&owner);
            self.events.publish(DomainEvent::AccountChanged { owner, kind });
            self.commit();
        }
        Ok(status)
    }

    fn open_funded_account(
        &mut self,
        owner: &str,
        kind: AccountKind,
        initial: Money,
    ) -> OpenAccountStatus {
        let fee = Money::usd(ACCOUNT_OPEN_CLOSE_FEE_USD).exchange(initial.currency);
        if initial.amount < fee.amount {
            return OpenAccountStatus::BelowMinimum;
        }
        let net = Money::new(initial.amount - fee.amount, initial.currency);

        let mut account = Account::new(owner, kind);
        account.credit(net);
        self.store.accounts.upsert(account);
        self.credit_house(fee);

        let date = self.store.current_date;
        self.store.transactions.append(Transaction::new(
            date,
            fee,
            owner,
            HOUSE_ACCOUNT,
            Some(kind),
            None,
        ));
        self.store.transactions.append(Transaction::new(
            date,
            net,
            EXTERNAL_PARTY,
            owner,
            None,
            Some(kind),
        ));
        OpenAccountStatus::Opened
    }

    fn open_security_account(
        &mut self,
        owner: &str,
        funding: Money,
    ) -> BankResult<OpenAccountStatus> {
        if funding.currency != Currency::Usd {
            return Err(BankError::CurrencyMismatch(format!(
                "security accounts hold USD only, got {funding}"
            )));
        }
        let Ok(savings) = self.account(owner, AccountKind::Savings) else {
            return Ok(OpenAccountStatus::NoSavingsAccount);
        };
        let total = savings.total_usd();
        let usd_balance = savings.balance(Currency::Usd);

        if funding.amount < SECURITY_MIN_DEPOSIT_USD {
            return Ok(OpenAccountStatus::BelowMinimum);
        }
        if total < SAVINGS_ELIGIBILITY_USD {
            return Ok(OpenAccountStatus::SavingsBalanceTooLow);
        }
        // Breach takes precedence when the funding also exceeds the USD
        // balance.
        if total - funding.amount < SECURITY_MAINTENANCE_USD {
            return Ok(OpenAccountStatus::WouldBreachMaintenance);
        }
        if funding.amount > usd_balance {
            return Ok(OpenAccountStatus::InsufficientSavingsForFundingTransfer);
        }

        self.account_mut(owner, AccountKind::Savings)?.debit(funding)?;
        let mut account = Account::new(owner, AccountKind::Security);
        account.credit(funding);
        self.store.accounts.upsert(account);

        self.store.transactions.append(Transaction::new(
            self.store.current_date,
            funding,
            owner,
            owner,
            Some(AccountKind::Savings),
            Some(AccountKind::Security),
        ));
        Ok(OpenAccountStatus::Opened)
    }

    /// Closes the caller's account of `kind`.
    ///
    /// The closing fee is paid from the USD balance; the record is removed
    /// only after the fee payment succeeds. Residual balances are forfeited
    /// with the record.
    pub fn close_account(
        &mut self,
        principal: &Principal,
        kind: AccountKind,
    ) -> BankResult<CloseAccountStatus> {
        let owner = self.require_customer(principal)?.to_string();
        let key = (owner.clone(), kind);
        let Some(account) = self.store.accounts.get_mut(&key) else {
            return Ok(CloseAccountStatus::NotFound);
        };

        let fee = Money::usd(ACCOUNT_OPEN_CLOSE_FEE_USD);
        if account.debit(fee).is_err() {
            return Ok(CloseAccountStatus::InsufficientFunds);
        }
        self.credit_house(fee);

        let date = self.store.current_date;
        self.store.transactions.append(Transaction::new(
            date,
            fee,
            &owner,
            HOUSE_ACCOUNT,
            Some(kind),
            None,
        ));
        if let Some(closed) = self.store.accounts.delete(&key) {
            let residual = closed.total_usd();
            if residual > Decimal::ZERO {
                tracing::info!(%owner, %kind, %residual, "residual forfeited on close");
            }
        }

        self.refresh_security_gate(&owner);
        self.events.publish(DomainEvent::AccountChanged { owner, kind });
        self.commit();
        Ok(CloseAccountStatus::Closed)
    }

    /// External cash deposit into the caller's account of `kind`.
    pub fn deposit(
        &mut self,
        principal: &Principal,
        kind: AccountKind,
        money: Money,
    ) -> BankResult<()> {
        let owner = self.require_customer(principal)?.to_string();
        self.deposit_to(&owner, kind, money, true)?;
        self.refresh_security_gate(&owner);
        self.events.publish(DomainEvent::AccountChanged { owner, kind });
        self.commit();
        Ok(())
    }

    /// External cash withdrawal from the caller's account of `kind`.
    ///
    /// Charges the flat withdrawal fee on top of the principal.
    pub fn withdraw(
        &mut self,
        principal: &Principal,
        kind: AccountKind,
        money: Money,
    ) -> BankResult<()> {
        let owner = self.require_customer(principal)?.to_string();
        self.withdraw_from(&owner, kind, money, true)?;
        self.refresh_security_gate(&owner);
        self.events.publish(DomainEvent::AccountChanged { owner, kind });
        self.commit();
        Ok(())
    }

    /// Converts `source` into `target` inside the caller's account of `kind`.
    ///
    /// Both legs are direct, so the withdrawal fee applies. When the deposit
    /// leg is rejected after a successful withdrawal the withdrawn funds are
    /// not restored; the store is flushed as mutated.
    pub fn exchange_currency(
        &mut self,
        principal: &Principal,
        kind: AccountKind,
        source: Money,
        target: Currency,
    ) -> BankResult<()> {
        let owner = self.require_customer(principal)?.to_string();
        if source.currency == target {
            return Err(BankError::CurrencyMismatch(format!(
                "cannot exchange {} into itself",
                source.currency
            )));
        }
        self.withdraw_from(&owner, kind, source, true)?;
        let result = self.deposit_to(&owner, kind, source.exchange(target), true);
        self.refresh_security_gate(&owner);
        self.events.publish(DomainEvent::AccountChanged { owner, kind });
        self.commit();
        result
    }

    /// Credits `money`, recording a journal entry when the deposit is an
    /// external one rather than a leg of an internal movement.
    pub(super) fn deposit_to(
        &mut self,
        owner: &str,
        kind: AccountKind,
        money: Money,
        direct: bool,
    ) -> BankResult<()> {
        if !money.is_positive() {
            return Err(BankError::InvalidAmount(format!(
                "deposit must be positive, got {money}"
            )));
        }
        if kind == AccountKind::Security {
            if money.currency != Currency::Usd {
                return Err(BankError::CurrencyMismatch(format!(
                    "security accounts hold USD only, got {money}"
                )));
            }
            if money.amount < SECURITY_MIN_DEPOSIT_USD {
                return Err(BankError::BelowMinimum(format!(
                    "security deposits start at {} USD, got {money}",
                    SECURITY_MIN_DEPOSIT_USD
                )));
            }
        }
        self.account_mut(owner, kind)?.credit(money);
        if direct {
            self.store.transactions.append(Transaction::new(
                self.store.current_date,
                money,
                EXTERNAL_PARTY,
                owner,
                None,
                Some(kind),
            ));
        }
        Ok(())
    }

    /// Debits `money`; a direct withdrawal additionally pays the flat fee in
    /// USD and records both entries. The principal debit is rolled back when
    /// the fee cannot be covered.
    pub(super) fn withdraw_from(
        &mut self,
        owner: &str,
        kind: AccountKind,
        money: Money,
        direct: bool,
    ) -> BankResult<()> {
        if !money.is_positive() {
            return Err(BankError::InvalidAmount(format!(
                "withdrawal must be positive, got {money}"
            )));
        }
        if kind == AccountKind::Security && money.currency != Currency::Usd {
            return Err(BankError::CurrencyMismatch(format!(
                "security accounts hold USD only, got {money}"
            )));
        }
        let account = self.account_mut(owner, kind)?;
        account.debit(money)?;
        if !direct {
            return Ok(());
        }

        let fee = Money::usd(WITHDRAWAL_FEE_USD);
        if let Err(err) = account.debit(fee) {
            account.credit(money);
            return Err(err);
        }
        self.credit_house(fee);

        let date = self.store.current_date;
        self.store.transactions.append(Transaction::new(
            date,
            fee,
            owner,
            HOUSE_ACCOUNT,
            Some(kind),
            None,
        ));
        self.store.transactions.append(Transaction::new(
            date,
            money,
            owner,
            EXTERNAL_PARTY,
            Some(kind),
            None,
        ));
        Ok(())
    }

    /// All of `username`'s accounts, one view per kind.
    pub fn balances(
        &self,
        principal: &Principal,
        username: &str,
    ) -> BankResult<Vec<BalanceView>> {
        self.require_read_access(principal, username)?;
        Ok(self
            .store
            .accounts
            .get_all()
            .filter(|account| account.owner == username)
            .map(|account| BalanceView {
                kind: account.kind,
                balances: account.balances.clone(),
                total_usd: account.total_usd(),
                security: account.security.as_ref().map(|security| SecurityBalanceView {
                    enabled: security.enabled,
                    realized_profit: security.realized_profit,
                }),
            })
            .collect())
    }

    /// Journal entries touching `username`'s account of `kind`, oldest first.
    pub fn transactions(
        &self,
        principal: &Principal,
        username: &str,
        kind: AccountKind,
    ) -> BankResult<Vec<Transaction>> {
        self.require_read_access(principal, username)?;
        Ok(self
            .store
            .transactions
            .get_all()
            .filter(|tx| tx.involves(username, kind))
            .cloned()
            .collect())
    }

    /// Every journal entry booked on `date`. Manager only.
    pub fn daily_report(
        &self,
        principal: &Principal,
        date: chrono::NaiveDate,
    ) -> BankResult<Vec<Transaction>> {
        self.require_manager(principal)?;
        Ok(self
            .store
            .transactions
            .get_all()
            .filter(|tx| tx.date == date)
            .cloned()
            .collect())
    }

    /// Usernames of all registered customers. Manager only.
    pub fn customers(&self, principal: &Principal) -> BankResult<Vec<String>> {
        self.require_manager(principal)?;
        Ok(self
            .store
            .credentials
            .get_all()
            .filter(|credential| credential.role == crate::Role::Customer)
            .map(|credential| credential.username.clone())
            .collect())
    }
}
