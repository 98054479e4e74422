use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{BankError, Currency};

/// A tagged money amount.
///
/// Use this type for **all** monetary values crossing the façade. Amounts are
/// `Decimal` so the fixed 7:1 and 1300:1 cross rates convert without binary
/// floating-point drift; rounding happens only at the presentation boundary
/// (see [`Money::rounded`]).
///
/// # Examples
///
/// ```rust
/// use engine::{Currency, Money};
/// use rust_decimal_macros::dec;
///
/// let price = Money::new(dec!(70), Currency::Cny);
/// assert_eq!(price.exchange(Currency::Usd).amount, dec!(10));
/// assert_eq!(price.exchange(Currency::Cny), price);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: Currency,
}

impl Money {
    #[must_use]
    pub const fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Shorthand for a dollar amount.
    #[must_use]
    pub const fn usd(amount: Decimal) -> Self {
        Self::new(amount, Currency::Usd)
    }

    #[must_use]
    pub fn zero(currency: Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Converts into `target` through the dollar peg.
    ///
    /// Identity when the kinds already match; full precision is kept, so a
    /// round trip differs from the input only by `Decimal`'s 28-digit
    /// truncation of 1/7 and 1/1300.
    #[must_use]
    pub fn exchange(self, target: Currency) -> Money {
        if self.currency == target {
            return self;
        }
        let in_usd = self.amount / self.currency.units_per_usd();
        Money::new(in_usd * target.units_per_usd(), target)
    }

    /// Value of this amount in dollars.
    #[must_use]
    pub fn usd_value(self) -> Decimal {
        self.exchange(Currency::Usd).amount
    }

    /// Presentation-boundary rounding to two fraction digits.
    #[must_use]
    pub fn rounded(self) -> Decimal {
        self.amount.round_dp(2)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.rounded(), self.currency)
    }
}

impl FromStr for Money {
    type Err = BankError;

    /// Parses `"<amount> <code>"`, e.g. `"10.50 USD"`.
    ///
    /// A bare amount defaults to dollars. Parsing user input is otherwise a
    /// presentation-layer concern; this exists for the CLI and tests.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let raw_amount = parts
            .next()
            .ok_or_else(|| BankError::InvalidAmount("empty amount".to_string()))?;
        let amount = Decimal::from_str(raw_amount)
            .map_err(|_| BankError::InvalidAmount(format!("invalid amount: {raw_amount}")))?;
        let currency = match parts.next() {
            Some(code) => Currency::try_from(code)?,
            None => Currency::Usd,
        };
        if parts.next().is_some() {
            return Err(BankError::InvalidAmount(format!("invalid amount: {s}")));
        }
        Ok(Money::new(amount, currency))
    }
}
