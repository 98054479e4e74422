use std::sync::mpsc::Receiver;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::constants::HOUSE_ACCOUNT;
use crate::store::{MemoryBackend, SnapshotBackend, Store};
use crate::{
    Account, AccountKind, BankError, BankResult, Credential, DomainEvent, EventBus, Money,
    Principal, Role,
};

mod accounts;
mod calendar;
mod loans;
mod trading;
mod transfers;

pub use accounts::{BalanceView, CloseAccountStatus, OpenAccountStatus, SecurityBalanceView};
pub use trading::{HoldingView, PortfolioView};

/// The banking façade.
///
/// Stateless over its store: there is no current session, every call takes
/// the authenticated [`Principal`] explicitly. Mutating operations flush the
/// store and publish [`DomainEvent`]s before returning; callers re-query
/// after mutation, there is no incremental change feed.
#[derive(Debug)]
pub struct Bank {
    store: Store,
    events: EventBus,
}

impl Bank {
    /// Return a builder for `Bank`. Help to build the struct.
    pub fn builder() -> BankBuilder {
        BankBuilder::default()
    }

    /// Registers a new login. Reserved ledger party names are not available
    /// as usernames.
    pub fn register(&mut self, username: &str, password: &str, role: Role) -> BankResult<()> {
        let username = normalize_required_name(username, "user")?;
        if is_reserved_party(&username) || self.store.credentials.contains(&username) {
            return Err(BankError::ExistingKey(username));
        }
        self.store.credentials.upsert(Credential::new(&username, password, role)?);
        info!(%username, "registered");
        self.commit();
        Ok(())
    }

    /// Checks `password` against the stored hash and returns the principal.
    ///
    /// A missing user and a wrong password are indistinguishable to the
    /// caller.
    pub fn login(&self, username: &str, password: &str) -> BankResult<Principal> {
        let credential = self
            .store
            .credentials
            .get(&username.trim().to_string())
            .filter(|credential| credential.verify(password))
            .ok_or_else(|| BankError::NotAuthorized("bad username or password".to_string()))?;
        Ok(Principal::from(credential))
    }

    /// Opens a subscriber channel for domain events.
    pub fn subscribe(&mut self) -> Receiver<DomainEvent> {
        self.events.subscribe()
    }

    /// The bank's simulated calendar date.
    pub fn current_date(&self) -> NaiveDate {
        self.store.current_date
    }

    fn require_customer<'a>(&self, principal: &'a Principal) -> BankResult<&'a str> {
        if principal.is_manager() {
            return Err(BankError::NotAuthorized(format!(
                "{} is not a customer",
                principal.username
            )));
        }
        Ok(&principal.username)
    }

    fn require_manager(&self, principal: &Principal) -> BankResult<()> {
        if !principal.is_manager() {
            return Err(BankError::NotAuthorized(format!(
                "{} is not a manager",
                principal.username
            )));
        }
        Ok(())
    }

    /// Customers may only read their own records; managers may read anyone's.
    fn require_read_access(&self, principal: &Principal, username: &str) -> BankResult<()> {
        if principal.is_manager() || principal.username == username {
            return Ok(());
        }
        Err(BankError::NotAuthorized(format!(
            "{} may not read {username}",
            principal.username
        )))
    }

    fn account(&self, owner: &str, kind: AccountKind) -> BankResult<&Account> {
        self.store
            .accounts
            .get(&(owner.to_string(), kind))
            .ok_or_else(|| BankError::KeyNotFound(format!("{owner} {kind} account")))
    }

    fn account_mut(&mut self, owner: &str, kind: AccountKind) -> BankResult<&mut Account> {
        self.store
            .accounts
            .get_mut(&(owner.to_string(), kind))
            .ok_or_else(|| BankError::KeyNotFound(format!("{owner} {kind} account")))
    }

    /// Credits a fee to the house account, creating it on first use.
    fn credit_house(&mut self, money: Money) {
        let key = (HOUSE_ACCOUNT.to_string(), AccountKind::Checking);
        if !self.store.accounts.contains(&key) {
            self.store
                .accounts
                .upsert(Account::new(HOUSE_ACCOUNT, AccountKind::Checking));
        }
        if let Some(house) = self.store.accounts.get_mut(&key) {
            house.credit(money);
        }
    }

    /// Recomputes `owner`'s security gate from the savings total.
    ///
    /// Called after every mutation of a savings balance; publishes an event
    /// only when the flag actually flips.
    fn refresh_security_gate(&mut self, owner: &str) {
        let total = self
            .store
            .accounts
            .get(&(owner.to_string(), AccountKind::Savings))
            .map(Account::total_usd)
            .unwrap_or_default();
        let enable = total >= crate::constants::SECURITY_MAINTENANCE_USD;

        let Some(account) = self
            .store
            .accounts
            .get_mut(&(owner.to_string(), AccountKind::Security))
        else {
            return;
        };
        let Some(security) = account.security.as_mut() else {
            return;
        };
        if security.enabled != enable {
            security.enabled = enable;
            self.events.publish(DomainEvent::AccountChanged {
                owner: owner.to_string(),
                kind: AccountKind::Security,
            });
        }
    }

    /// Flushes the store; persistence failures are logged, never retried and
    /// never surfaced to the caller of a completed domain operation.
    fn commit(&mut self) {
        if let Err(err) = self.store.flush() {
            warn!("snapshot flush failed: {err}");
        }
    }
}

fn normalize_required_name(value: &str, label: &str) -> BankResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BankError::InvalidAmount(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

fn is_reserved_party(username: &str) -> bool {
    [
        crate::constants::HOUSE_ACCOUNT,
        crate::constants::MARKET_PARTY,
        crate::constants::EXTERNAL_PARTY,
    ]
    .contains(&username)
}

/// The builder for `Bank`
pub struct BankBuilder {
    backend: Box<dyn SnapshotBackend>,
}

impl Default for BankBuilder {
    fn default() -> Self {
        Self {
            backend: Box::new(MemoryBackend),
        }
    }
}

impl BankBuilder {
    /// Pass the durability backend; defaults to in-memory.
    pub fn backend(mut self, backend: Box<dyn SnapshotBackend>) -> BankBuilder {
        self.backend = backend;
        self
    }

    /// Construct `Bank`, loading the backend's last snapshot.
    pub fn build(self) -> BankResult<Bank> {
        let store = Store::open(self.backend)?;
        Ok(Bank {
            store,
            events: EventBus::default(),
        })
    }
}
