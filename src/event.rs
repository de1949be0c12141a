use std::time::SystemTime;

use crate::errors::ObserverError;
use crate::orders::{Order, Side};

/// Full-field snapshot of an order at the moment an `Add` or `Remove` event
/// is constructed. The book continues to own (and may continue to mutate)
/// its own copy; this is an independent copy for observers.
#[derive(Debug, Clone)]
pub struct OrderSnapshot {
    pub id: String,
    pub side: Side,
    pub price: f64,
    pub quantity: u64,
    pub timestamp: SystemTime,
}

impl From<&Order> for OrderSnapshot {
    fn from(order: &Order) -> Self {
        OrderSnapshot {
            id: order.id().to_string(),
            side: order.side(),
            price: order.price(),
            quantity: order.quantity(),
            timestamp: order.timestamp(),
        }
    }
}

/// Identity-only snapshot of an order's side of a `Match`: just enough to
/// name which order was involved and at what price it was resting.
#[derive(Debug, Clone)]
pub struct MatchSide {
    pub id: String,
    pub side: Side,
    pub price: f64,
}

impl From<&Order> for MatchSide {
    fn from(order: &Order) -> Self {
        MatchSide {
            id: order.id().to_string(),
            side: order.side(),
            price: order.price(),
        }
    }
}

/// The book's lifecycle events, emitted in a strict total order.
#[derive(Debug, Clone)]
pub enum Event {
    Add {
        id: u64,
        timestamp: SystemTime,
        order: OrderSnapshot,
    },
    Remove {
        id: u64,
        timestamp: SystemTime,
        order: OrderSnapshot,
    },
    Match {
        id: u64,
        timestamp: SystemTime,
        buy_order: MatchSide,
        sell_order: MatchSide,
        quantity: u64,
        price: f64,
    },
}

impl Event {
    pub fn id(&self) -> u64 {
        match self {
            Event::Add { id, .. } => *id,
            Event::Remove { id, .. } => *id,
            Event::Match { id, .. } => *id,
        }
    }

    pub fn timestamp(&self) -> SystemTime {
        match self {
            Event::Add { timestamp, .. } => *timestamp,
            Event::Remove { timestamp, .. } => *timestamp,
            Event::Match { timestamp, .. } => *timestamp,
        }
    }
}

/// A sink that accepts events in the order they are emitted.
///
/// Emission is best-effort: the book's internal state has already been
/// committed before the first `on_event` call of a fan-out, so a failing
/// observer aborts the remaining fan-out but never the mutation that
/// produced the events.
pub trait Observer {
    fn on_event(&mut self, event: &Event) -> Result<(), ObserverError>;
}
