//! Collateral-backed loans.
//!
//! A loan is keyed by `(owner, collateral)`; the collateral name stays
//! unique per owner across the pending and active sets. State transitions
//! (request, approve/reject, close on full repayment) live in the
//! orchestration layer; this module holds the record and its arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::LOAN_INTEREST_RATE;
use crate::store::Keyed;

/// A collateral-backed loan, pending or active depending on which set it
/// lives in.
///
/// Amounts are dollar values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub owner: String,
    pub collateral: String,
    pub collateral_value: Decimal,
    pub principal: Decimal,
}

impl Loan {
    pub fn new(owner: &str, collateral: &str, collateral_value: Decimal, principal: Decimal) -> Self {
        Self {
            owner: owner.to_string(),
            collateral: collateral.to_string(),
            collateral_value,
            principal,
        }
    }

    /// True when the collateral covers the principal, i.e. the loan is
    /// approvable.
    #[must_use]
    pub fn is_covered(&self) -> bool {
        self.collateral_value >= self.principal
    }

    /// Grows the outstanding principal by the monthly loan rate.
    pub fn accrue_interest(&mut self) {
        self.principal += self.principal * LOAN_INTEREST_RATE;
    }
}

impl Keyed for Loan {
    type Key = (String, String);

    fn key(&self) -> Self::Key {
        (self.owner.clone(), self.collateral.clone())
    }
}

/// Outcome of a manager reviewing a pending loan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoanDecision {
    Approved,
    Rejected,
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn coverage_gate() {
        assert!(Loan::new("alice", "car", dec!(1000), dec!(1000)).is_covered());
        assert!(!Loan::new("alice", "car", dec!(999), dec!(1000)).is_covered());
    }

    #[test]
    fn interest_compounds_on_principal() {
        let mut loan = Loan::new("alice", "car", dec!(2000), dec!(1000));
        loan.accrue_interest();
        assert_eq!(loan.principal, dec!(1150));
        loan.accrue_interest();
        assert_eq!(loan.principal, dec!(1322.50));
    }
}
