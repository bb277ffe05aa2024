//! The tagged-union `Event` that crosses the shard queues.
//!
//! Every arm must stay trivially copyable: `Event` is pushed into a
//! lock-free ring buffer by value, never behind a pointer, so heap fields
//! (`String`, `Vec`, ...) would defeat the point of the queue.

use super::ids::{OrderId, Symbol, UserId};
use super::order::{OrderType, Side};
use super::price::{Price, Quantity, Timestamp};

/// A new order arriving from ingress.
#[derive(Debug, Clone, Copy)]
pub struct NewOrderEvent {
    pub user_id: UserId,
    pub client_order_id: OrderId,
    pub symbol: Symbol,
    pub quantity: Quantity,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Price,
    pub timestamp: Timestamp,
}

/// A request to cancel a previously-submitted order.
#[derive(Debug, Clone, Copy)]
pub struct CancelEvent {
    pub user_id: UserId,
    pub client_order_id: OrderId,
    pub symbol: Symbol,
    pub orig_order_id: OrderId,
}

/// A request for the current best bid/ask.
#[derive(Debug, Clone, Copy)]
pub struct TopOfBookEvent {
    pub user_id: UserId,
    pub client_order_id: OrderId,
    pub symbol: Symbol,
}

/// The event arriving on a shard's queue. `Copy` by construction: every
/// field of every arm is itself `Copy`.
#[derive(Debug, Clone, Copy)]
pub enum Event {
    NewOrder(NewOrderEvent),
    Cancel(CancelEvent),
    TopOfBook(TopOfBookEvent),
    Quit,
}

impl Event {
    /// The symbol this event is routed by. `Quit` carries no symbol and
    /// returns the `INVALID` sentinel (it is never placed on a shard queue
    /// — the dispatcher broadcasts it directly).
    pub fn symbol(&self) -> Symbol {
        match self {
            Event::NewOrder(e) => e.symbol,
            Event::Cancel(e) => e.symbol,
            Event::TopOfBook(e) => e.symbol,
            Event::Quit => Symbol::INVALID,
        }
    }
}
