//! Domain events.
//!
//! The engine publishes events on subscriber channels and never calls back
//! into a presentation layer; a GUI or bot reacts to price updates and
//! balance changes by listening here. There is no incremental change feed
//! beyond this: after a mutation, callers re-query.

use std::sync::mpsc::{Receiver, Sender, channel};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::AccountKind;

#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    /// A balance or security flag of `owner`'s `kind` account changed.
    AccountChanged { owner: String, kind: AccountKind },
    /// The simulated calendar moved.
    DateAdvanced { date: NaiveDate },
    /// A listed stock was repriced.
    StockPriceChanged { stock: String, price: Decimal },
    /// A stock left the registry; holders were force-liquidated.
    StockDelisted { stock: String },
}

/// Fan-out of [`DomainEvent`]s to any number of subscribers.
///
/// Dropped receivers are pruned on the next publish.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<DomainEvent>>,
}

impl EventBus {
    pub fn subscribe(&mut self) -> Receiver<DomainEvent> {
        let (sender, receiver) = channel();
        self.subscribers.push(sender);
        receiver
    }

    pub fn publish(&mut self, event: DomainEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_sees_every_event() {
        let mut bus = EventBus::default();
        let first = bus.subscribe();
        let second = bus.subscribe();

        let event = DomainEvent::AccountChanged {
            owner: "alice".to_string(),
            kind: AccountKind::Savings,
        };
        bus.publish(event.clone());

        assert_eq!(first.try_recv().unwrap(), event);
        assert_eq!(second.try_recv().unwrap(), event);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut bus = EventBus::default();
        drop(bus.subscribe());
        let kept = bus.subscribe();

        bus.publish(DomainEvent::StockDelisted {
            stock: "ACME".to_string(),
        });

        assert!(kept.try_recv().is_ok());
        assert_eq!(bus.subscribers.len(), 1);
    }
}
