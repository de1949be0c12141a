use std::time::SystemTime;

use crate::errors::OrderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The spelling used on the wire: `BUY` / `SELL`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

/// The atomic unit of book state: immutable identity, mutable remaining
/// quantity.
#[derive(Debug, Clone)]
pub struct Order {
    id: String,
    side: Side,
    price: f64,
    quantity: u64,
    timestamp: SystemTime,
}

impl Order {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// Decrements `quantity` by `amount`. The precondition `0 < amount <=
    /// quantity` is enforced leniently: a violating call is silently
    /// ignored rather than rejected.
    pub fn reduce_quantity(&mut self, amount: u64) {
        if amount > 0 && amount <= self.quantity {
            self.quantity -= amount;
        }
    }
}

/// Mints [`Order`]s with a strictly increasing, per-instance identifier and
/// a wall-clock timestamp.
///
/// The counter is owned by the factory instance rather than kept as global
/// process state, so a test can construct its own factory and get
/// reproducible ids ("0", "1", ...) without interfering with other tests
/// running in the same process.
pub struct OrderFactory {
    next_id: u64,
}

impl OrderFactory {
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Creates a limit order. Rejects non-positive quantity or a
    /// non-finite/non-positive price without advancing the counter.
    pub fn create_limit(
        &mut self,
        side: Side,
        quantity: u64,
        price: f64,
    ) -> Result<Order, OrderError> {
        if quantity == 0 {
            return Err(OrderError::NonPositiveQuantity(quantity));
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(OrderError::InvalidPrice(price));
        }

        let id = self.next_id.to_string();
        self.next_id += 1;

        Ok(Order {
            id,
            side,
            price,
            quantity,
            timestamp: SystemTime::now(),
        })
    }

    /// Resets the counter to zero. Intended for tests that need a fresh,
    /// predictable id sequence within a single process.
    pub fn reset(&mut self) {
        self.next_id = 0;
    }
}

impl Default for OrderFactory {
    fn default() -> Self {
        Self::new()
    }
}
