//! Cross-account transfers.

use crate::constants::{CHECKING_TRANSFER_FEE_USD, HOUSE_ACCOUNT};
use crate::{AccountKind, BankError, BankResult, DomainEvent, Money, Principal, Transaction};

use super::Bank;

impl Bank {
    /// Moves `amount` from the caller's `from_kind` account into
    /// `to_user`'s `to_kind` account.
    ///
    /// Checking senders pay the flat transfer fee to the house up front; the
    /// whole transfer fails if the fee cannot be paid. When the recipient
    /// account is missing or rejects the deposit, the withdrawn principal is
    /// redeposited to the sender and the fee stays paid.
    pub fn transfer(
        &mut self,
        principal: &Principal,
        from_kind: AccountKind,
        to_user: &str,
        to_kind: AccountKind,
        amount: Money,
    ) -> BankResult<()> {
        let owner = self.require_customer(principal)?.to_string();
        if !amount.is_positive() {
            return Err(BankError::InvalidAmount(format!(
                "transfer must be positive, got {amount}"
            )));
        }

        if from_kind == AccountKind::Checking {
            let fee = Money::usd(CHECKING_TRANSFER_FEE_USD);
            self.account_mut(&owner, from_kind)?.debit(fee)?;
            self.credit_house(fee);
            self.store.transactions.append(Transaction::new(
                self.store.current_date,
                fee,
                &owner,
                HOUSE_ACCOUNT,
                Some(from_kind),
                None,
            ));
        }

        if let Err(err) = self.withdraw_from(&owner, from_kind, amount, false) {
            // A checking fee already paid stays paid.
            self.commit();
            return Err(err);
        }

        let delivery = if self.store.accounts.contains(&(to_user.to_string(), to_kind)) {
            self.deposit_to(to_user, to_kind, amount, false)
        } else {
            Err(BankError::KeyNotFound(format!("{to_user} {to_kind} account")))
        };
        if let Err(err) = delivery {
            // Recover the stranded principal; the fee, once paid, stays paid.
            self.account_mut(&owner, from_kind)?.credit(amount);
            self.refresh_security_gate(&owner);
            self.commit();
            return Err(err);
        }

        self.store.transactions.append(Transaction::new(
            self.store.current_date,
            amount,
            &owner,
            to_user,
            Some(from_kind),
            Some(to_kind),
        ));

        self.refresh_security_gate(&owner);
        self.refresh_security_gate(to_user);
        self.events.publish(DomainEvent::AccountChanged {
            owner: owner.clone(),
            kind: from_kind,
        });
        self.events.publish(DomainEvent::AccountChanged {
            owner: to_user.to_string(),
            kind: to_kind,
        });
        self.commit();
        Ok(())
    }
}
