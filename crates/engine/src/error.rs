//! The module contains the errors the banking engine can return.
//!
//! Every failure is a value of [`BankError`]; the engine never panics on
//! domain or persistence failures. The variants map onto the three failure
//! families the presentation layer renders differently: validation,
//! persistence and domain rules.
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum BankError {
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),
    #[error("Below minimum: {0}")]
    BelowMinimum(String),
    #[error("Security account disabled: {0}")]
    AccountDisabled(String),
    #[error("Partial repayment not supported: {0}")]
    PartialRepayment(String),
    #[error("Not authorized: {0}")]
    NotAuthorized(String),
    #[error("Storage failure: {0}")]
    Storage(String),
}

impl From<std::io::Error> for BankError {
    fn from(err: std::io::Error) -> Self {
        BankError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for BankError {
    fn from(err: serde_json::Error) -> Self {
        BankError::Storage(err.to_string())
    }
}
