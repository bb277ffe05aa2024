//! The per-symbol dual-indexed order book.
//!
//! Each side keeps two logically synchronised indexes over the same
//! orders: a priority-ordered `BTreeMap` (matching order) and a
//! `HashMap` lookup by `client_order_id` (O(1) cancellation). Because a
//! symbol is always owned by exactly one shard worker (see
//! [`crate::dispatch`]), neither index needs to be concurrent.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use crate::model::{Order, OrderId, Price, SequenceNumber, Side, Symbol, Timestamp};

use super::error::OrderBookError;

/// A side's priority ordering key. Bids sort by descending price, asks by
/// ascending price; both tie-break by ascending `(timestamp, sequence_number)`.
pub trait PriorityKey: Ord + Copy + std::fmt::Debug {
    fn new(price: Price, timestamp: Timestamp, sequence_number: SequenceNumber) -> Self;
    fn price(&self) -> Price;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BidKey(Reverse<Price>, Timestamp, SequenceNumber);

impl PriorityKey for BidKey {
    fn new(price: Price, timestamp: Timestamp, sequence_number: SequenceNumber) -> Self {
        BidKey(Reverse(price), timestamp, sequence_number)
    }
    fn price(&self) -> Price {
        self.0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AskKey(Price, Timestamp, SequenceNumber);

impl PriorityKey for AskKey {
    fn new(price: Price, timestamp: Timestamp, sequence_number: SequenceNumber) -> Self {
        AskKey(price, timestamp, sequence_number)
    }
    fn price(&self) -> Price {
        self.0
    }
}

/// One side of a book: the priority index and the lookup index, always
/// kept in lock-step.
#[derive(Debug, Default)]
pub struct OneSideBook<K: PriorityKey> {
    priority: BTreeMap<K, Order>,
    lookup: HashMap<OrderId, K>,
}

impl<K: PriorityKey> OneSideBook<K> {
    pub fn new() -> Self {
        Self {
            priority: BTreeMap::new(),
            lookup: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.priority.is_empty()
    }

    /// The best (first-ordered) resting order, without mutating anything.
    pub fn best(&self) -> Option<&Order> {
        self.priority.values().next()
    }

    /// The key of the best resting order, if any.
    pub fn first_key(&self) -> Option<K> {
        self.priority.keys().next().copied()
    }

    pub fn get_mut_by_key(&mut self, key: K) -> Option<&mut Order> {
        self.priority.get_mut(&key)
    }

    /// Inserts a fresh or residual order, indexing it on both structures.
    pub fn insert(&mut self, order: Order) {
        let key = K::new(order.price, order.timestamp, order.sequence_number);
        self.lookup.insert(order.client_order_id, key);
        self.priority.insert(key, order);
    }

    /// Removes by `client_order_id`, returning the removed order.
    pub fn remove(&mut self, order_id: OrderId) -> Option<Order> {
        let key = self.lookup.remove(&order_id)?;
        self.priority.remove(&key)
    }

    /// Removes by priority key (used once a resting order is fully filled
    /// during matching, when the key is already in hand).
    pub fn remove_by_key(&mut self, key: K) -> Option<Order> {
        let order = self.priority.remove(&key)?;
        self.lookup.remove(&order.client_order_id);
        Some(order)
    }

    pub fn contains(&self, order_id: OrderId) -> bool {
        self.lookup.contains_key(&order_id)
    }

    /// Membership agreement between the two indexes (testable invariant).
    pub fn indexes_agree(&self) -> bool {
        self.priority.len() == self.lookup.len()
            && self
                .lookup
                .iter()
                .all(|(_, key)| self.priority.contains_key(key))
    }

    pub fn len(&self) -> usize {
        self.priority.len()
    }

    /// Orders in priority order (for diagnostics/tests only).
    pub fn iter_in_priority_order(&self) -> impl Iterator<Item = &Order> {
        self.priority.values()
    }
}

/// Per-symbol book: two sides of resting active limit orders plus the
/// book-local sequence counter.
#[derive(Debug)]
pub struct OrderBook {
    pub symbol: Symbol,
    pub(crate) bids: OneSideBook<BidKey>,
    pub(crate) asks: OneSideBook<AskKey>,
    next_sequence: SequenceNumber,
}

impl OrderBook {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            bids: OneSideBook::new(),
            asks: OneSideBook::new(),
            next_sequence: 1,
        }
    }

    /// Assigns and returns the next sequence number for this book.
    pub(crate) fn next_sequence_number(&mut self) -> SequenceNumber {
        let seq = self.next_sequence;
        self.next_sequence += 1;
        seq
    }

    pub fn best_bid(&self) -> Option<&Order> {
        self.bids.best()
    }

    pub fn best_ask(&self) -> Option<&Order> {
        self.asks.best()
    }

    /// Looks up an order by id on either side. At most one side may hold a
    /// given id by construction.
    pub fn contains_order(&self, order_id: OrderId) -> bool {
        self.bids.contains(order_id) || self.asks.contains(order_id)
    }

    /// Rests a fresh or residual order on its own side.
    ///
    /// `debug_assert`s that doing so does not put the same `client_order_id`
    /// on both sides: this would be an upstream bug (two accepted events
    /// reusing an id across a cancel/rest boundary), not a data error, so it
    /// is checked only in debug builds rather than surfaced as a `Result`.
    pub(crate) fn insert(&mut self, order: Order) {
        debug_assert!(
            self.verify_not_already_resident(order.client_order_id).is_ok(),
            "order id {} already resident in {}",
            order.client_order_id,
            self.symbol
        );
        let side = order.side;
        match side {
            Side::Buy => self.bids.insert(order),
            Side::Sell => self.asks.insert(order),
        }
        debug_assert!(
            self.verify_indexes_agree(side, order.client_order_id).is_ok(),
            "priority/lookup index mismatch on {} after inserting order {}",
            self.symbol,
            order.client_order_id
        );
    }

    /// Checks the kind-1 invariant violation in [`OrderBookError`]: `id`
    /// must not already be resident on either side of this book.
    fn verify_not_already_resident(&self, id: OrderId) -> Result<(), OrderBookError> {
        if self.bids.contains(id) || self.asks.contains(id) {
            return Err(OrderBookError::OrderIdOnBothSides {
                symbol: self.symbol,
                order_id: id,
            });
        }
        Ok(())
    }

    /// Checks the kind-2 invariant violation in [`OrderBookError`]: the
    /// priority and lookup index for `side` must agree on membership.
    /// `order_id` is carried through only for the error's diagnostic value —
    /// it is the order whose insertion triggered this check, not necessarily
    /// the one causing the disagreement.
    fn verify_indexes_agree(&self, side: Side, order_id: OrderId) -> Result<(), OrderBookError> {
        let agrees = match side {
            Side::Buy => self.bids.indexes_agree(),
            Side::Sell => self.asks.indexes_agree(),
        };
        if !agrees {
            return Err(OrderBookError::IndexesDisagree {
                symbol: self.symbol,
                order_id,
            });
        }
        Ok(())
    }

    /// Cancels a resting order by id, returning it if found. Checks the bid
    /// side first, then the ask side.
    pub(crate) fn cancel_by_id(&mut self, order_id: OrderId) -> Option<Order> {
        self.bids.remove(order_id).or_else(|| self.asks.remove(order_id))
    }

    /// `true` if both side indexes are internally consistent and no id
    /// appears on both sides.
    pub fn check_invariants(&self) -> bool {
        self.bids.indexes_agree()
            && self.asks.indexes_agree()
            && self
                .bids
                .iter_in_priority_order()
                .all(|o| !self.asks.contains(o.client_order_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OrderType, UserId};

    fn order(id: OrderId, side: Side, price: i64, qty: i64, ts: u64, seq: u64) -> Order {
        Order::new(
            UserId::INVALID,
            id,
            Symbol::from_str_truncating("AAPL"),
            side,
            OrderType::Limit,
            Price(price),
            qty,
            0,
            ts,
            seq,
        )
    }

    #[test]
    fn bids_sort_descending_by_price() {
        let mut book = OrderBook::new(Symbol::from_str_truncating("AAPL"));
        book.insert(order(1, Side::Buy, 150_00, 10, 0, 1));
        book.insert(order(2, Side::Buy, 151_00, 10, 1, 2));
        assert_eq!(book.best_bid().unwrap().client_order_id, 2);
    }

    #[test]
    fn asks_sort_ascending_by_price() {
        let mut book = OrderBook::new(Symbol::from_str_truncating("AAPL"));
        book.insert(order(1, Side::Sell, 151_00, 10, 0, 1));
        book.insert(order(2, Side::Sell, 150_00, 10, 1, 2));
        assert_eq!(book.best_ask().unwrap().client_order_id, 2);
    }

    #[test]
    fn equal_price_ties_break_by_sequence() {
        let mut book = OrderBook::new(Symbol::from_str_truncating("AAPL"));
        book.insert(order(1, Side::Sell, 150_00, 10, 0, 1));
        book.insert(order(2, Side::Sell, 150_00, 10, 0, 2));
        assert_eq!(book.best_ask().unwrap().client_order_id, 1);
    }

    #[test]
    fn cancel_removes_from_both_indexes() {
        let mut book = OrderBook::new(Symbol::from_str_truncating("AAPL"));
        book.insert(order(1, Side::Buy, 150_00, 10, 0, 1));
        assert!(book.cancel_by_id(1).is_some());
        assert!(!book.contains_order(1));
        assert!(book.check_invariants());
    }

    #[test]
    fn cancel_unknown_id_is_none() {
        let mut book = OrderBook::new(Symbol::from_str_truncating("AAPL"));
        assert!(book.cancel_by_id(999).is_none());
    }
}
