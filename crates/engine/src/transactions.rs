//! Journal records.
//!
//! A `Transaction` is one money movement between two parties; a
//! `StockTransaction` is one trade. Both are append-only and dated with the
//! bank's simulated calendar, not wall-clock time.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AccountKind, Money};

/// One booked money movement.
///
/// `sender_kind`/`receiver_kind` are `None` when the corresponding side is
/// external to the bank (cash deposits and withdrawals, the house account,
/// the market).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub date: NaiveDate,
    pub amount: Money,
    pub sender: String,
    pub receiver: String,
    pub sender_kind: Option<AccountKind>,
    pub receiver_kind: Option<AccountKind>,
}

impl Transaction {
    pub fn new(
        date: NaiveDate,
        amount: Money,
        sender: &str,
        receiver: &str,
        sender_kind: Option<AccountKind>,
        receiver_kind: Option<AccountKind>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            amount,
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            sender_kind,
            receiver_kind,
        }
    }

    /// True when this entry credits `username`'s account of `kind`.
    #[must_use]
    pub fn is_deposit_for(&self, username: &str, kind: AccountKind) -> bool {
        self.receiver == username && self.receiver_kind == Some(kind)
    }

    /// True when this entry debits `username`'s account of `kind`.
    #[must_use]
    pub fn is_withdrawal_from(&self, username: &str, kind: AccountKind) -> bool {
        self.sender == username && self.sender_kind == Some(kind)
    }

    /// True when either leg touches `username`'s account of `kind`.
    #[must_use]
    pub fn involves(&self, username: &str, kind: AccountKind) -> bool {
        self.is_deposit_for(username, kind) || self.is_withdrawal_from(username, kind)
    }
}

/// One executed trade, buy or sell, at the price then current.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockTransaction {
    pub id: Uuid,
    pub date: NaiveDate,
    pub owner: String,
    pub stock: String,
    pub price: rust_decimal::Decimal,
    pub quantity: u32,
    pub is_buy: bool,
}

impl StockTransaction {
    pub fn new(
        date: NaiveDate,
        owner: &str,
        stock: &str,
        price: rust_decimal::Decimal,
        quantity: u32,
        is_buy: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            owner: owner.to_string(),
            stock: stock.to_string(),
            price,
            quantity,
            is_buy,
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::Currency;

    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()
    }

    #[test]
    fn transfer_touches_both_parties() {
        let tx = Transaction::new(
            date(),
            Money::new(dec!(10), Currency::Usd),
            "alice",
            "bob",
            Some(AccountKind::Checking),
            Some(AccountKind::Savings),
        );
        assert!(tx.is_withdrawal_from("alice", AccountKind::Checking));
        assert!(tx.is_deposit_for("bob", AccountKind::Savings));
        assert!(!tx.involves("alice", AccountKind::Savings));
    }

    #[test]
    fn external_deposit_has_no_sender_kind() {
        let tx = Transaction::new(
            date(),
            Money::usd(dec!(10)),
            "external",
            "alice",
            None,
            Some(AccountKind::Savings),
        );
        assert!(tx.is_deposit_for("alice", AccountKind::Savings));
        assert!(!tx.is_withdrawal_from("alice", AccountKind::Savings));
    }
}
