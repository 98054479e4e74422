//! Stock registry records and lot-based cost accounting helpers.
//!
//! Holdings are tracked as one [`Lot`] per purchased unit, so profit on a
//! partial sell is exact per unit rather than averaged. Lots are consumed
//! FIFO: the oldest cost basis goes first.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::store::Keyed;

/// A listed stock and its current price (USD per unit).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub name: String,
    pub price: Decimal,
}

impl Stock {
    pub fn new(name: &str, price: Decimal) -> Self {
        Self {
            name: name.to_string(),
            price,
        }
    }
}

impl Keyed for Stock {
    type Key = String;

    fn key(&self) -> Self::Key {
        self.name.clone()
    }
}

/// A single purchased unit of a stock, remembering what it cost.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    pub stock: String,
    pub cost_basis: Decimal,
}

impl Lot {
    pub fn new(stock: &str, cost_basis: Decimal) -> Self {
        Self {
            stock: stock.to_string(),
            cost_basis,
        }
    }
}

/// Profit of selling `lots` at `price`: Σ(price − cost basis).
///
/// Used for both realized profit (over removed lots) and unrealized profit
/// (over remaining lots).
#[must_use]
pub fn profit_at(price: Decimal, lots: &[Lot]) -> Decimal {
    lots.iter().map(|lot| price - lot.cost_basis).sum()
}

/// Removes the first `quantity` lots of `stock` from `lots`, preserving the
/// order of everything else, and returns them oldest-first.
///
/// Callers must check the holding is large enough beforehand; this consumes
/// at most what is there.
pub fn take_lots_fifo(lots: &mut Vec<Lot>, stock: &str, quantity: usize) -> Vec<Lot> {
    let mut remaining = quantity;
    let mut removed = Vec::with_capacity(quantity.min(lots.len()));
    lots.retain(|lot| {
        if remaining > 0 && lot.stock == stock {
            remaining -= 1;
            removed.push(lot.clone());
            false
        } else {
            true
        }
    });
    removed
}
