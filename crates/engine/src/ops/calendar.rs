//! The simulated calendar and month-end accrual.
//!
//! The bank's clock only moves when a manager advances it. Interest is
//! accrued on the month boundary: eligible savings balances earn the savings
//! rate per currency, then every active loan's principal grows by the loan
//! rate.

use chrono::{Datelike, Months, NaiveDate};
use tracing::info;

use crate::constants::{HOUSE_ACCOUNT, SAVINGS_ELIGIBILITY_USD, SAVINGS_INTEREST_RATE};
use crate::{AccountKind, BankError, BankResult, DomainEvent, Money, Principal, Transaction};

use super::Bank;

impl Bank {
    /// Moves the calendar one day forward, accruing interest when the month
    /// rolls over. Manager only.
    pub fn advance_day(&mut self, principal: &Principal) -> BankResult<NaiveDate> {
        self.require_manager(principal)?;
        let today = self.store.current_date;
        let next = today
            .succ_opt()
            .ok_or_else(|| BankError::Storage("calendar overflow".to_string()))?;
        self.store.current_date = next;
        if next.month() != today.month() {
            self.accrue();
        }
        self.events.publish(DomainEvent::DateAdvanced { date: next });
        self.commit();
        Ok(next)
    }

    /// Jumps the calendar one month forward and accrues interest. Manager
    /// only.
    pub fn advance_month(&mut self, principal: &Principal) -> BankResult<NaiveDate> {
        self.require_manager(principal)?;
        let next = self
            .store
            .current_date
            .checked_add_months(Months::new(1))
            .ok_or_else(|| BankError::Storage("calendar overflow".to_string()))?;
        self.store.current_date = next;
        self.accrue();
        self.events.publish(DomainEvent::DateAdvanced { date: next });
        self.commit();
        Ok(next)
    }

    /// Month-end accrual: savings interest first, then loan interest.
    ///
    /// A savings account earns only while its dollar total meets the
    /// eligibility threshold, one credit and one journal entry per positive
    /// currency balance.
    fn accrue(&mut self) {
        let date = self.store.current_date;
        let mut entries = Vec::new();
        let mut earners = Vec::new();
        for account in self.store.accounts.get_all_mut() {
            if account.kind != AccountKind::Savings
                || account.owner == HOUSE_ACCOUNT
                || account.total_usd() < SAVINGS_ELIGIBILITY_USD
            {
                continue;
            }
            let credits: Vec<Money> = account
                .balances
                .iter()
                .filter(|(_, amount)| **amount > rust_decimal::Decimal::ZERO)
                .map(|(currency, amount)| Money::new(*amount * SAVINGS_INTEREST_RATE, *currency))
                .collect();
            for interest in credits {
                account.credit(interest);
                entries.push(Transaction::new(
                    date,
                    interest,
                    HOUSE_ACCOUNT,
                    &account.owner,
                    None,
                    Some(AccountKind::Savings),
                ));
            }
            earners.push(account.owner.clone());
        }
        for entry in entries {
            self.store.transactions.append(entry);
        }
        for owner in &earners {
            self.refresh_security_gate(owner);
            self.events.publish(DomainEvent::AccountChanged {
                owner: owner.clone(),
                kind: AccountKind::Savings,
            });
        }

        let mut debtors = 0usize;
        for loan in self.store.loans_active.get_all_mut() {
            loan.accrue_interest();
            debtors += 1;
        }
        info!(
            savings = earners.len(),
            loans = debtors,
            %date,
            "month-end accrual"
        );
    }
}
