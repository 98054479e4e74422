//! A single-user banking domain engine: multi-currency accounts,
//! cross-account transfers, collateral-backed loans and lot-based securities
//! trading, behind the [`Bank`] façade.
//!
//! The engine is synchronous and single-threaded. Every façade call takes an
//! authenticated [`Principal`] and either completes or fails with a
//! [`BankError`]; state is held in an in-memory [`store`] flushed to a
//! snapshot backend after each mutation.

pub use accounts::{Account, AccountKind, SecurityState};
pub use currency::Currency;
pub use error::BankError;
pub use events::{DomainEvent, EventBus};
pub use loans::{Loan, LoanDecision};
pub use money::Money;
pub use ops::{
    BalanceView, Bank, BankBuilder, CloseAccountStatus, HoldingView, OpenAccountStatus,
    PortfolioView, SecurityBalanceView,
};
pub use session::{Credential, Principal, Role};
pub use stocks::{Lot, Stock};
pub use transactions::{StockTransaction, Transaction};

mod accounts;
pub mod constants;
mod currency;
mod error;
mod events;
mod loans;
mod money;
mod ops;
mod session;
mod stocks;
pub mod store;
mod transactions;

type BankResult<T> = Result<T, BankError>;
