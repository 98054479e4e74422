//! The module contains the `Account` struct and its balance primitives.
//!
//! An account is polymorphic over [`AccountKind`]; kind-specific behavior
//! (the security USD restriction, the savings threshold hook) lives in the
//! orchestration layer, which composes these primitives.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::store::Keyed;
use crate::{BankError, BankResult, Currency, Lot, Money};

/// Kind of customer account.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Savings,
    Checking,
    Security,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Savings => "savings",
            Self::Checking => "checking",
            Self::Security => "security",
        }
    }
}

impl core::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AccountKind {
    type Error = BankError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "savings" => Ok(Self::Savings),
            "checking" => Ok(Self::Checking),
            "security" => Ok(Self::Security),
            other => Err(BankError::KeyNotFound(format!(
                "unknown account kind: {other}"
            ))),
        }
    }
}

/// Trading state carried only by security accounts.
///
/// `lots` holds one entry per purchased unit, oldest first, so partial sells
/// can consume cost bases FIFO. `realized_profit` accumulates across sells
/// and forced liquidations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityState {
    pub enabled: bool,
    pub lots: Vec<Lot>,
    pub realized_profit: Decimal,
}

impl SecurityState {
    /// Units of `stock` currently held.
    #[must_use]
    pub fn quantity(&self, stock: &str) -> usize {
        self.lots.iter().filter(|lot| lot.stock == stock).count()
    }
}

/// A customer account with one balance per currency.
///
/// The USD total is derived, never stored, to avoid desync with the
/// per-currency balances.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub owner: String,
    pub kind: AccountKind,
    pub balances: BTreeMap<Currency, Decimal>,
    /// Present iff `kind == AccountKind::Security`.
    pub security: Option<SecurityState>,
}

impl Account {
    pub fn new(owner: &str, kind: AccountKind) -> Self {
        let security = (kind == AccountKind::Security).then(|| SecurityState {
            enabled: true,
            ..SecurityState::default()
        });
        Self {
            owner: owner.to_string(),
            kind,
            balances: BTreeMap::new(),
            security,
        }
    }

    #[must_use]
    pub fn balance(&self, currency: Currency) -> Decimal {
        self.balances.get(&currency).copied().unwrap_or_default()
    }

    /// Total balance converted to dollars.
    #[must_use]
    pub fn total_usd(&self) -> Decimal {
        self.balances
            .iter()
            .map(|(currency, amount)| Money::new(*amount, *currency).usd_value())
            .sum()
    }

    /// Unconditional credit.
    pub fn credit(&mut self, money: Money) {
        *self.balances.entry(money.currency).or_default() += money.amount;
    }

    /// Debits `money` or fails without mutating when the balance is short.
    pub fn debit(&mut self, money: Money) -> BankResult<()> {
        let balance = self.balances.entry(money.currency).or_default();
        if *balance < money.amount {
            return Err(BankError::InsufficientFunds(format!(
                "{} has {} {}, needs {}",
                self.owner, balance, money.currency, money
            )));
        }
        *balance -= money.amount;
        Ok(())
    }

    pub fn security(&self) -> BankResult<&SecurityState> {
        self.security
            .as_ref()
            .ok_or_else(|| BankError::KeyNotFound(format!("{} security state", self.owner)))
    }

    pub fn security_mut(&mut self) -> BankResult<&mut SecurityState> {
        let owner = self.owner.clone();
        self.security
            .as_mut()
            .ok_or_else(|| BankError::KeyNotFound(format!("{owner} security state")))
    }
}

impl Keyed for Account {
    type Key = (String, AccountKind);

    fn key(&self) -> Self::Key {
        (self.owner.clone(), self.kind)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn account() -> Account {
        let mut account = Account::new("alice", AccountKind::Savings);
        account.credit(Money::usd(dec!(100)));
        account
    }

    #[test]
    fn debit_within_balance() {
        let mut account = account();
        account.debit(Money::usd(dec!(40))).unwrap();
        assert_eq!(account.balance(Currency::Usd), dec!(60));
    }

    #[test]
    fn debit_never_goes_negative() {
        let mut account = account();
        let err = account.debit(Money::usd(dec!(100.01))).unwrap_err();
        assert!(matches!(err, BankError::InsufficientFunds(_)));
        assert_eq!(account.balance(Currency::Usd), dec!(100));
    }

    #[test]
    fn total_usd_converts_every_balance() {
        let mut account = account();
        account.credit(Money::new(dec!(70), Currency::Cny));
        account.credit(Money::new(dec!(2600), Currency::Krw));
        assert_eq!(account.total_usd(), dec!(112));
    }

    #[test]
    fn security_state_only_on_security_accounts() {
        assert!(account().security.is_none());
        let security = Account::new("alice", AccountKind::Security);
        assert!(security.security().unwrap().enabled);
    }
}
