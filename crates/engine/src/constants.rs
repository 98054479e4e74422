//! Bank-wide fee schedule and thresholds.
//!
//! Dollar figures are fixed by policy and charged in USD unless a call site
//! converts them explicitly (the account-opening fee is charged in the
//! deposit currency).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Flat fee for opening or closing an account, in USD.
pub const ACCOUNT_OPEN_CLOSE_FEE_USD: Decimal = dec!(200);

/// Flat fee a checking account pays on every outgoing transfer, in USD.
pub const CHECKING_TRANSFER_FEE_USD: Decimal = dec!(100);

/// Flat fee on direct (to-self) withdrawals, in USD.
pub const WITHDRAWAL_FEE_USD: Decimal = dec!(50);

/// Monthly interest rate credited to eligible savings balances.
pub const SAVINGS_INTEREST_RATE: Decimal = dec!(0.10);

/// Monthly interest rate applied to active loan principals.
pub const LOAN_INTEREST_RATE: Decimal = dec!(0.15);

/// Minimum savings total (USD) for interest and for opening a security
/// account.
pub const SAVINGS_ELIGIBILITY_USD: Decimal = dec!(5000);

/// Savings total (USD) below which a linked security account is disabled.
pub const SECURITY_MAINTENANCE_USD: Decimal = dec!(2500);

/// Minimum single external deposit into a security account, in USD.
pub const SECURITY_MIN_DEPOSIT_USD: Decimal = dec!(1000);

/// Reserved name of the account collecting fees and paying interest.
pub const HOUSE_ACCOUNT: &str = "house";

/// Counterparty name recorded for exchange-driven stock proceeds.
pub const MARKET_PARTY: &str = "market";

/// Counterparty name recorded for external deposits and withdrawals.
pub const EXTERNAL_PARTY: &str = "external";
