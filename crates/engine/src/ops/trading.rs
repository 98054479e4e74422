//! The stock registry and lot-based portfolio accounting.

use rust_decimal::Decimal;

use crate::constants::MARKET_PARTY;
use crate::stocks::{profit_at, take_lots_fifo};
use crate::{
    AccountKind, BankError, BankResult, DomainEvent, Lot, Money, Principal, Stock,
    StockTransaction, Transaction,
};

use super::Bank;

/// One stock position inside a [`PortfolioView`].
#[derive(Clone, Debug, PartialEq)]
pub struct HoldingView {
    pub stock: String,
    pub quantity: u32,
    pub current_price: Decimal,
    pub unrealized_profit: Decimal,
}

/// Read model of a security account's trading state.
#[derive(Clone, Debug, PartialEq)]
pub struct PortfolioView {
    pub enabled: bool,
    pub holdings: Vec<HoldingView>,
    pub realized_profit: Decimal,
    pub unrealized_profit: Decimal,
}

impl Bank {
    /// Lists a new stock. Manager only.
    pub fn add_stock(&mut self, principal: &Principal, name: &str, price: Decimal) -> BankResult<()> {
        self.require_manager(principal)?;
        let name = super::normalize_required_name(name, "stock")?;
        if price <= Decimal::ZERO {
            return Err(BankError::InvalidAmount(format!(
                "stock price must be positive, got {price}"
            )));
        }
        if self.store.stocks.contains(&name) {
            return Err(BankError::ExistingKey(name));
        }
        self.store.stocks.upsert(Stock::new(&name, price));
        self.events.publish(DomainEvent::StockPriceChanged { stock: name, price });
        self.commit();
        Ok(())
    }

    /// Reprices a listed stock. Manager only.
    pub fn update_price(
        &mut self,
        principal: &Principal,
        name: &str,
        price: Decimal,
    ) -> BankResult<()> {
        self.require_manager(principal)?;
        if price <= Decimal::ZERO {
            return Err(BankError::InvalidAmount(format!(
                "stock price must be positive, got {price}"
            )));
        }
        let stock = self
            .store
            .stocks
            .get_mut(&name.to_string())
            .ok_or_else(|| BankError::KeyNotFound(format!("stock {name}")))?;
        stock.price = price;
        self.events.publish(DomainEvent::StockPriceChanged {
            stock: name.to_string(),
            price,
        });
        self.commit();
        Ok(())
    }

    /// Removes a stock from the registry, force-liquidating every holder's
    /// lots at the last known price. Manager only.
    ///
    /// Liquidation is pushed: proceeds are credited and booked without any
    /// holder action, disabled accounts included.
    pub fn delist_stock(&mut self, principal: &Principal, name: &str) -> BankResult<()> {
        self.require_manager(principal)?;
        let stock = self
            .store
            .stocks
            .delete(&name.to_string())
            .ok_or_else(|| BankError::KeyNotFound(format!("stock {name}")))?;
        let date = self.store.current_date;

        let mut entries = Vec::new();
        let mut trades = Vec::new();
        let mut touched = Vec::new();
        for account in self.store.accounts.get_all_mut() {
            let Some(security) = account.security.as_mut() else {
                continue;
            };
            let removed = take_lots_fifo(&mut security.lots, &stock.name, usize::MAX);
            if removed.is_empty() {
                continue;
            }
            security.realized_profit += profit_at(stock.price, &removed);
            let quantity = removed.len() as u32;
            let proceeds = Money::usd(stock.price * Decimal::from(quantity));
            account.credit(proceeds);

            entries.push(Transaction::new(
                date,
                proceeds,
                MARKET_PARTY,
                &account.owner,
                None,
                Some(AccountKind::Security),
            ));
            trades.push(StockTransaction::new(
                date,
                &account.owner,
                &stock.name,
                stock.price,
                quantity,
                false,
            ));
            touched.push(account.owner.clone());
        }
        for entry in entries {
            self.store.transactions.append(entry);
        }
        for trade in trades {
            self.store.stock_transactions.append(trade);
        }

        self.events.publish(DomainEvent::StockDelisted {
            stock: stock.name.clone(),
        });
        for owner in touched {
            self.events.publish(DomainEvent::AccountChanged {
                owner,
                kind: AccountKind::Security,
            });
        }
        self.commit();
        Ok(())
    }

    /// Buys `quantity` units at the current price, one lot per unit.
    pub fn buy_stock(
        &mut self,
        principal: &Principal,
        stock: &str,
        quantity: u32,
    ) -> BankResult<()> {
        let owner = self.require_customer(principal)?.to_string();
        if quantity == 0 {
            return Err(BankError::InvalidAmount("cannot trade zero units".to_string()));
        }
        let price = self.quoted_price(stock)?;
        let cost = Money::usd(price * Decimal::from(quantity));

        let account = self.account_mut(&owner, AccountKind::Security)?;
        let security = account.security()?;
        if !security.enabled {
            return Err(BankError::AccountDisabled(owner));
        }
        account.debit(cost)?;
        let security = account.security_mut()?;
        for _ in 0..quantity {
            security.lots.push(Lot::new(stock, price));
        }

        let date = self.store.current_date;
        self.store.transactions.append(Transaction::new(
            date,
            cost,
            &owner,
            MARKET_PARTY,
            Some(AccountKind::Security),
            None,
        ));
        self.store
            .stock_transactions
            .append(StockTransaction::new(date, &owner, stock, price, quantity, true));

        self.events.publish(DomainEvent::AccountChanged {
            owner,
            kind: AccountKind::Security,
        });
        self.commit();
        Ok(())
    }

    /// Sells `quantity` units at the current price, consuming the oldest
    /// lots first; `None` sells the entire holding.
    ///
    /// Returns the realized profit of this sale. Overselling fails with no
    /// state mutation.
    pub fn sell_stock(
        &mut self,
        principal: &Principal,
        stock: &str,
        quantity: Option<u32>,
    ) -> BankResult<Decimal> {
        let owner = self.require_customer(principal)?.to_string();
        let price = self.quoted_price(stock)?;

        let account = self.account_mut(&owner, AccountKind::Security)?;
        let held = account.security()?.quantity(stock);
        let quantity = quantity.unwrap_or(held as u32);
        if quantity == 0 {
            return Err(BankError::InvalidAmount("cannot trade zero units".to_string()));
        }
        if quantity as usize > held {
            return Err(BankError::InsufficientFunds(format!(
                "{owner} holds {held} units of {stock}, tried to sell {quantity}"
            )));
        }
        if !account.security()?.enabled {
            return Err(BankError::AccountDisabled(owner));
        }

        let security = account.security_mut()?;
        let removed = take_lots_fifo(&mut security.lots, stock, quantity as usize);
        let realized = profit_at(price, &removed);
        security.realized_profit += realized;
        let proceeds = Money::usd(price * Decimal::from(quantity));
        account.credit(proceeds);

        let date = self.store.current_date;
        self.store.transactions.append(Transaction::new(
            date,
            proceeds,
            MARKET_PARTY,
            &owner,
            None,
            Some(AccountKind::Security),
        ));
        self.store
            .stock_transactions
            .append(StockTransaction::new(date, &owner, stock, price, quantity, false));

        self.events.publish(DomainEvent::AccountChanged {
            owner,
            kind: AccountKind::Security,
        });
        self.commit();
        Ok(realized)
    }

    /// The price board. Public: no principal required.
    pub fn stocks(&self) -> Vec<Stock> {
        self.store.stocks.get_all().cloned().collect()
    }

    /// `username`'s holdings grouped by stock, with profit recomputed on
    /// demand against current prices.
    pub fn portfolio(&self, principal: &Principal, username: &str) -> BankResult<PortfolioView> {
        self.require_read_access(principal, username)?;
        let account = self.account(username, AccountKind::Security)?;
        let security = account.security()?;

        let mut holdings: Vec<HoldingView> = Vec::new();
        for stock in self.store.stocks.get_all() {
            let lots: Vec<Lot> = security
                .lots
                .iter()
                .filter(|lot| lot.stock == stock.name)
                .cloned()
                .collect();
            if lots.is_empty() {
                continue;
            }
            holdings.push(HoldingView {
                stock: stock.name.clone(),
                quantity: lots.len() as u32,
                current_price: stock.price,
                unrealized_profit: profit_at(stock.price, &lots),
            });
        }
        let unrealized_profit = holdings.iter().map(|h| h.unrealized_profit).sum();
        Ok(PortfolioView {
            enabled: security.enabled,
            holdings,
            realized_profit: security.realized_profit,
            unrealized_profit,
        })
    }

    /// `username`'s trade journal, oldest first.
    pub fn stock_transactions(
        &self,
        principal: &Principal,
        username: &str,
    ) -> BankResult<Vec<StockTransaction>> {
        self.require_read_access(principal, username)?;
        Ok(self
            .store
            .stock_transactions
            .get_all()
            .filter(|trade| trade.owner == username)
            .cloned()
            .collect())
    }

    fn quoted_price(&self, stock: &str) -> BankResult<Decimal> {
        self.store
            .stocks
            .get(&stock.to_string())
            .map(|stock| stock.price)
            .ok_or_else(|| BankError::KeyNotFound(format!("stock {stock}")))
    }
}
