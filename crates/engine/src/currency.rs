use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::BankError;

/// Currency kind accepted by the bank.
///
/// The engine is tri-currency with fixed cross rates pegged through the
/// dollar: 1 USD = 7 CNY = 1300 KRW. Rates never change at runtime, so
/// conversion is a pure function (see [`Money::exchange`]).
///
/// [`Money::exchange`]: crate::Money::exchange
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Cny,
    Krw,
}

impl Currency {
    /// All supported kinds, in pegging order.
    pub const ALL: [Currency; 3] = [Currency::Usd, Currency::Cny, Currency::Krw];

    /// Canonical currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Cny => "CNY",
            Currency::Krw => "KRW",
        }
    }

    /// How many units of this currency one dollar buys.
    ///
    /// This is the single source of truth for conversion; both directions
    /// go through the dollar.
    #[must_use]
    pub const fn units_per_usd(self) -> Decimal {
        match self {
            Currency::Usd => Decimal::ONE,
            Currency::Cny => dec!(7),
            Currency::Krw => dec!(1300),
        }
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = BankError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "CNY" => Ok(Currency::Cny),
            "KRW" => Ok(Currency::Krw),
            other => Err(BankError::CurrencyMismatch(format!(
                "unsupported currency: {other}"
            ))),
        }
    }
}
