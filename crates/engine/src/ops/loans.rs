//! The loan request/approval workflow.
//!
//! Requested loans sit in the pending set until a manager reviews them. An
//! approved loan moves to the active set and its principal is disbursed to
//! the owner's savings account; a rejected one is discarded. Repayment is
//! all or nothing: the payment must cover the full outstanding principal.

use rust_decimal::Decimal;

use crate::constants::HOUSE_ACCOUNT;
use crate::{
    AccountKind, BankError, BankResult, DomainEvent, Loan, LoanDecision, Money, Principal,
    Transaction,
};

use super::Bank;

impl Bank {
    /// Files a loan request backed by a named collateral.
    ///
    /// The collateral name is unique per owner across the pending and active
    /// sets; amounts are dollar values.
    pub fn request_loan(
        &mut self,
        principal: &Principal,
        collateral: &str,
        collateral_value: Decimal,
        amount: Decimal,
    ) -> BankResult<()> {
        let owner = self.require_customer(principal)?.to_string();
        let collateral = super::normalize_required_name(collateral, "collateral")?;
        if collateral_value <= Decimal::ZERO || amount <= Decimal::ZERO {
            return Err(BankError::InvalidAmount(format!(
                "loan amounts must be positive, got {amount} against {collateral_value}"
            )));
        }
        let key = (owner.clone(), collateral.clone());
        if self.store.loans_pending.contains(&key) || self.store.loans_active.contains(&key) {
            return Err(BankError::ExistingKey(format!("{owner} loan on {collateral}")));
        }

        self.store
            .loans_pending
            .upsert(Loan::new(&owner, &collateral, collateral_value, amount));
        self.commit();
        Ok(())
    }

    /// Reviews a pending loan. Manager only.
    ///
    /// Under-collateralized requests are auto-rejected; otherwise the loan
    /// becomes active and its principal is credited to the owner's savings
    /// account.
    pub fn approve_loan(
        &mut self,
        principal: &Principal,
        owner: &str,
        collateral: &str,
    ) -> BankResult<LoanDecision> {
        self.require_manager(principal)?;
        let loan = self.take_pending(owner, collateral)?;
        if !loan.is_covered() {
            self.commit();
            return Ok(LoanDecision::Rejected);
        }

        let disbursement = Money::usd(loan.principal);
        self.store.loans_active.upsert(loan);
        self.account_mut(owner, AccountKind::Savings)?.credit(disbursement);
        self.store.transactions.append(Transaction::new(
            self.store.current_date,
            disbursement,
            HOUSE_ACCOUNT,
            owner,
            None,
            Some(AccountKind::Savings),
        ));

        self.refresh_security_gate(owner);
        self.events.publish(DomainEvent::AccountChanged {
            owner: owner.to_string(),
            kind: AccountKind::Savings,
        });
        self.commit();
        Ok(LoanDecision::Approved)
    }

    /// Discards a pending loan. Manager only.
    pub fn reject_loan(
        &mut self,
        principal: &Principal,
        owner: &str,
        collateral: &str,
    ) -> BankResult<()> {
        self.require_manager(principal)?;
        self.take_pending(owner, collateral)?;
        self.commit();
        Ok(())
    }

    /// Settles an active loan in full.
    ///
    /// The payment, converted to dollars, must cover the whole outstanding
    /// principal; anything less is refused without touching the loan.
    pub fn pay_loan(
        &mut self,
        principal: &Principal,
        collateral: &str,
        payment: Money,
    ) -> BankResult<()> {
        let owner = self.require_customer(principal)?.to_string();
        let key = (owner.clone(), collateral.to_string());
        let loan = self
            .store
            .loans_active
            .get(&key)
            .ok_or_else(|| BankError::KeyNotFound(format!("{owner} loan on {collateral}")))?;

        if payment.usd_value() < loan.principal {
            return Err(BankError::PartialRepayment(format!(
                "{payment} covers less than the outstanding {} USD",
                loan.principal
            )));
        }
        self.store.loans_active.delete(&key);
        self.commit();
        Ok(())
    }

    /// The pending set, oldest key order. Manager only.
    pub fn pending_loans(&self, principal: &Principal) -> BankResult<Vec<Loan>> {
        self.require_manager(principal)?;
        Ok(self.store.loans_pending.get_all().cloned().collect())
    }

    /// Active loans of `username`.
    pub fn active_loans(&self, principal: &Principal, username: &str) -> BankResult<Vec<Loan>> {
        self.require_read_access(principal, username)?;
        Ok(self
            .store
            .loans_active
            .get_all()
            .filter(|loan| loan.owner == username)
            .cloned()
            .collect())
    }

    fn take_pending(&mut self, owner: &str, collateral: &str) -> BankResult<Loan> {
        self.store
            .loans_pending
            .delete(&(owner.to_string(), collateral.to_string()))
            .ok_or_else(|| {
                BankError::KeyNotFound(format!("{owner} pending loan on {collateral}"))
            })
    }
}
