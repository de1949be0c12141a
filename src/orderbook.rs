use std::cmp::Ordering;
use std::collections::{BTreeMap, VecDeque};
use std::time::SystemTime;

use tracing::{debug, info, warn};

use crate::errors::ObserverError;
use crate::event::{Event, MatchSide, Observer, OrderSnapshot};
use crate::orders::{Order, Side};

/// `f64` does not implement `Ord`, so price levels are keyed on this
/// newtype instead. Prices are validated finite and positive at
/// [`crate::orders::OrderFactory::create_limit`], so `total_cmp` gives a
/// total order without reaching for an external "ordered float" crate.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PriceKey(f64);

impl Eq for PriceKey {}

impl PartialOrd for PriceKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PriceKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// A price-indexed side of the book: an ordered map from price to a FIFO
/// queue of resting orders.
#[derive(Default)]
pub struct BookSide {
    levels: BTreeMap<PriceKey, VecDeque<Order>>,
}

impl BookSide {
    fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    fn push(&mut self, order: Order) {
        self.levels
            .entry(PriceKey(order.price()))
            .or_insert_with(VecDeque::new)
            .push_back(order);
    }

    /// Removes the order identified by `id` at `price`, pruning the level
    /// if it becomes empty. Returns whether an order was found.
    fn remove_by_id(&mut self, price: f64, id: &str) -> bool {
        let key = PriceKey(price);
        let Some(queue) = self.levels.get_mut(&key) else {
            return false;
        };
        let Some(pos) = queue.iter().position(|o| o.id() == id) else {
            return false;
        };
        queue.remove(pos);
        if queue.is_empty() {
            self.levels.remove(&key);
            debug!(price, "level erased");
        }
        true
    }

    /// The extreme price currently resting on this side: the highest if
    /// `highest_first`, else the lowest. Callers pick the sense that
    /// matches the side's own "best price" (bids: highest, asks: lowest).
    fn best_price(&self, highest_first: bool) -> Option<f64> {
        if highest_first {
            self.levels.keys().next_back().map(|k| k.0)
        } else {
            self.levels.keys().next().map(|k| k.0)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// The most recently appended order at `price`, if any.
    fn back_mut(&mut self, price: f64) -> Option<&mut Order> {
        self.levels.get_mut(&PriceKey(price))?.back_mut()
    }

    /// Drops the order at the back of `price`'s queue if matching has
    /// drained it to zero, pruning the level if that empties it.
    fn prune_drained_back(&mut self, price: f64) {
        let key = PriceKey(price);
        if let Some(queue) = self.levels.get_mut(&key) {
            if matches!(queue.back(), Some(o) if o.quantity() == 0) {
                queue.pop_back();
            }
            if queue.is_empty() {
                self.levels.remove(&key);
                debug!(price, "level erased");
            }
        }
    }

    /// Total resting quantity at each price, best price first in the
    /// side's own sense. Used by the CLI's `print` command.
    pub fn levels(&self, highest_first: bool) -> Vec<(f64, u64)> {
        let mut v: Vec<(f64, u64)> = self
            .levels
            .iter()
            .map(|(k, q)| (k.0, q.iter().map(|o| o.quantity()).sum::<u64>()))
            .collect();
        if highest_first {
            v.reverse();
        }
        v
    }
}

/// Unifies ascending and descending traversal of a [`BookSide`]'s levels so
/// the matching loop below is written once instead of once per side.
enum EitherIter<'a> {
    Fwd(std::collections::btree_map::IterMut<'a, PriceKey, VecDeque<Order>>),
    Rev(std::iter::Rev<std::collections::btree_map::IterMut<'a, PriceKey, VecDeque<Order>>>),
}

impl<'a> Iterator for EitherIter<'a> {
    type Item = (&'a PriceKey, &'a mut VecDeque<Order>);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            EitherIter::Fwd(iter) => iter.next(),
            EitherIter::Rev(iter) => iter.next(),
        }
    }
}

/// One resolved fill produced by the matching loop, before it has been
/// promoted to a fully-timestamped, identified [`Event::Match`].
struct MatchRecord {
    buy: MatchSide,
    sell: MatchSide,
    quantity: u64,
    price: f64,
}

/// Walks `opposite_side` in best-first order against `incoming`, filling
/// while prices are compatible and quantity remains.
///
/// Mutates `incoming`'s quantity and the resting orders' quantities in
/// place, pops fully-drained orders from the front of their queue, and
/// erases any level left empty. Each `Match` is decremented exactly once
/// here; callers must not decrement `incoming.quantity` again afterward.
fn match_incoming_side(
    incoming: &mut Order,
    opposite_side: &mut BookSide,
    reversed: bool,
) -> Vec<MatchRecord> {
    debug!(incoming_id = incoming.id(), side = ?incoming.side(), "matching incoming order");
    let mut matches = Vec::new();
    let mut levels_to_remove = Vec::new();

    let iter = if reversed {
        EitherIter::Rev(opposite_side.levels.iter_mut().rev())
    } else {
        EitherIter::Fwd(opposite_side.levels.iter_mut())
    };

    'outer: for (price_key, queue) in iter {
        let price = price_key.0;
        let price_compatible = match incoming.side() {
            Side::Buy => incoming.price() >= price,
            Side::Sell => incoming.price() <= price,
        };
        if !price_compatible {
            break;
        }

        while let Some(resting) = queue.front_mut() {
            if incoming.quantity() == 0 {
                break 'outer;
            }

            let fill = incoming.quantity().min(resting.quantity());

            let (buy, sell) = match incoming.side() {
                Side::Buy => (MatchSide::from(&*incoming), MatchSide::from(&*resting)),
                Side::Sell => (MatchSide::from(&*resting), MatchSide::from(&*incoming)),
            };
            matches.push(MatchRecord {
                buy,
                sell,
                quantity: fill,
                price,
            });

            resting.reduce_quantity(fill);
            incoming.reduce_quantity(fill);

            if resting.quantity() == 0 {
                queue.pop_front();
            }
        }

        if queue.is_empty() {
            levels_to_remove.push(*price_key);
        }
        if incoming.quantity() == 0 {
            break;
        }
    }

    for key in levels_to_remove {
        opposite_side.levels.remove(&key);
        debug!(price = key.0, "level erased");
    }

    matches
}

/// A stable reference to a previously-registered observer, returned by
/// [`OrderBook::add_observer`]. Trait objects have no portable notion of
/// pointer identity to remove-by-identity against, so the handle is the
/// identity token instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverHandle(usize);

/// Owns both sides of the book and the observer list; coordinates the
/// add/match/emit and remove/emit protocols.
pub struct OrderBook {
    bids: BookSide,
    asks: BookSide,
    observers: Vec<Option<Box<dyn Observer>>>,
    next_event_id: u64,
}

impl OrderBook {
    pub fn new() -> Self {
        Self {
            bids: BookSide::new(),
            asks: BookSide::new(),
            observers: Vec::new(),
            next_event_id: 0,
        }
    }

    pub fn bids(&self) -> &BookSide {
        &self.bids
    }

    pub fn asks(&self) -> &BookSide {
        &self.asks
    }

    pub fn add_observer(&mut self, observer: Box<dyn Observer>) -> ObserverHandle {
        let handle = ObserverHandle(self.observers.len());
        self.observers.push(Some(observer));
        handle
    }

    pub fn remove_observer(&mut self, handle: ObserverHandle) {
        if let Some(slot) = self.observers.get_mut(handle.0) {
            *slot = None;
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_event_id;
        self.next_event_id += 1;
        id
    }

    /// Dispatches `event` to every registered observer in insertion order.
    /// Stops at (and propagates) the first failure without retrying or
    /// compensating.
    fn emit(&mut self, event: Event) -> Result<(), ObserverError> {
        for slot in self.observers.iter_mut() {
            if let Some(observer) = slot {
                observer.on_event(&event)?;
            }
        }
        Ok(())
    }

    /// Adds `order` to the book: rests it on its own side, emits `Add`,
    /// then matches it in place against the opposite side, emitting each
    /// resulting `Match`. The own-side mutation happens before the `Add`
    /// fan-out, so book state is already committed by the time any
    /// observer sees it, regardless of whether the fan-out later fails.
    pub fn add_order(&mut self, order: Order) -> Result<(), ObserverError> {
        let snapshot = OrderSnapshot::from(&order);
        let price = order.price();
        let side = order.side();

        match side {
            Side::Buy => self.bids.push(order),
            Side::Sell => self.asks.push(order),
        }

        let add_id = self.next_id();
        self.emit(Event::Add {
            id: add_id,
            timestamp: SystemTime::now(),
            order: snapshot,
        })?;

        let matches = {
            let (own, opposite, reversed) = match side {
                Side::Buy => (&mut self.bids, &mut self.asks, false),
                Side::Sell => (&mut self.asks, &mut self.bids, true),
            };
            let incoming = own
                .back_mut(price)
                .expect("order was just pushed onto its own side");
            match_incoming_side(incoming, opposite, reversed)
        };

        for m in matches {
            info!(price = m.price, quantity = m.quantity, "match produced");
            let match_id = self.next_id();
            self.emit(Event::Match {
                id: match_id,
                timestamp: SystemTime::now(),
                buy_order: m.buy,
                sell_order: m.sell,
                quantity: m.quantity,
                price: m.price,
            })?;
        }

        match side {
            Side::Buy => self.bids.prune_drained_back(price),
            Side::Sell => self.asks.prune_drained_back(price),
        }

        debug_assert!(self.is_uncrossed(), "book crossed after add_order");
        Ok(())
    }

    /// Cancels `order`: removes it from its side by identity if present,
    /// and unconditionally emits `Remove`.
    pub fn remove_order(&mut self, order: &Order) -> Result<(), ObserverError> {
        let side = match order.side() {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        let found = side.remove_by_id(order.price(), order.id());
        if found {
            warn!(order_id = order.id(), "order cancelled");
        } else {
            warn!(
                order_id = order.id(),
                "cancel requested for order not on book"
            );
        }

        let remove_id = self.next_id();
        self.emit(Event::Remove {
            id: remove_id,
            timestamp: SystemTime::now(),
            order: OrderSnapshot::from(order),
        })?;

        debug_assert!(self.is_uncrossed(), "book crossed after remove_order");
        Ok(())
    }

    /// `true` unless both sides are non-empty and the best bid is not
    /// strictly less than the best ask.
    fn is_uncrossed(&self) -> bool {
        match (self.bids.best_price(true), self.asks.best_price(false)) {
            (Some(bid), Some(ask)) => bid < ask,
            _ => true,
        }
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}
