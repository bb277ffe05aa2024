//! The resting order record and its state machine.

use std::fmt;

use super::ids::{OrderId, Symbol, UserId};
use super::price::{Price, Quantity, SequenceNumber, Timestamp};

/// Which side of the book an order rests on or crosses against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side an aggressive order of this side crosses against.
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// An order's execution style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderType {
    Market,
    Limit,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
            OrderType::Limit => write!(f, "LIMIT"),
        }
    }
}

/// An order's position in its lifecycle. `Filled` and `Cancelled` are
/// terminal; only `New` and `PartiallyFilled` orders are resident in a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderState {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
}

impl OrderState {
    /// Active states are resident in a book.
    pub fn is_active(self) -> bool {
        matches!(self, OrderState::New | OrderState::PartiallyFilled)
    }
}

/// A single resting or in-flight order.
///
/// Mutation is restricted to [`Order::fill`] and [`Order::cancel`]; no other
/// code should write to `state` or `open_quantity` directly.
#[derive(Debug, Clone, Copy)]
pub struct Order {
    pub state: OrderState,
    pub user_id: UserId,
    pub client_order_id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Price,
    pub quantity: Quantity,
    pub open_quantity: Quantity,
    pub timestamp: Timestamp,
    pub sequence_number: SequenceNumber,
}

impl Order {
    /// Constructs a fresh order in state `New`, optionally pre-filled (used
    /// when resting the residual of a partially-matched aggressive order).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: UserId,
        client_order_id: OrderId,
        symbol: Symbol,
        side: Side,
        order_type: OrderType,
        price: Price,
        quantity: Quantity,
        already_filled: Quantity,
        timestamp: Timestamp,
        sequence_number: SequenceNumber,
    ) -> Self {
        let open_quantity = quantity - already_filled;
        let state = if open_quantity <= 0 {
            OrderState::Filled
        } else if already_filled > 0 {
            OrderState::PartiallyFilled
        } else {
            OrderState::New
        };
        Self {
            state,
            user_id,
            client_order_id,
            symbol,
            side,
            order_type,
            price,
            quantity,
            open_quantity,
            timestamp,
            sequence_number,
        }
    }

    /// Filled quantity so far.
    pub fn filled_quantity(&self) -> Quantity {
        self.quantity - self.open_quantity
    }

    /// Reduces `open_quantity` by `qty`, transitioning to `Filled` if it
    /// reaches zero. Non-positive `qty` is a no-op (never crashes).
    /// Returns the quantity actually applied.
    pub fn fill(&mut self, qty: Quantity) -> Quantity {
        if qty <= 0 || !self.state.is_active() {
            return 0;
        }
        let applied = qty.min(self.open_quantity);
        self.open_quantity -= applied;
        self.state = if self.open_quantity == 0 {
            OrderState::Filled
        } else {
            OrderState::PartiallyFilled
        };
        applied
    }

    /// Marks the order `Cancelled`. Idempotent on an already-terminal order.
    pub fn cancel(&mut self) {
        if self.state.is_active() {
            self.state = OrderState::Cancelled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Order {
        Order::new(
            UserId::INVALID,
            1,
            Symbol::from_str_truncating("AAPL"),
            Side::Buy,
            OrderType::Limit,
            Price(15000),
            100,
            0,
            0,
            1,
        )
    }

    #[test]
    fn fill_transitions_to_partially_filled() {
        let mut o = sample();
        assert_eq!(o.fill(40), 40);
        assert_eq!(o.state, OrderState::PartiallyFilled);
        assert_eq!(o.open_quantity, 60);
    }

    #[test]
    fn fill_to_zero_transitions_to_filled() {
        let mut o = sample();
        assert_eq!(o.fill(100), 100);
        assert_eq!(o.state, OrderState::Filled);
    }

    #[test]
    fn fill_clamps_to_open_quantity() {
        let mut o = sample();
        assert_eq!(o.fill(1000), 100);
        assert_eq!(o.open_quantity, 0);
    }

    #[test]
    fn nonpositive_fill_is_noop() {
        let mut o = sample();
        assert_eq!(o.fill(0), 0);
        assert_eq!(o.fill(-5), 0);
        assert_eq!(o.state, OrderState::New);
    }

    #[test]
    fn cancel_is_terminal() {
        let mut o = sample();
        o.cancel();
        assert_eq!(o.state, OrderState::Cancelled);
        assert_eq!(o.fill(10), 0);
    }

    #[test]
    fn prefilled_residual_order_starts_partially_filled() {
        let o = Order::new(
            UserId::INVALID,
            2,
            Symbol::from_str_truncating("AAPL"),
            Side::Buy,
            OrderType::Limit,
            Price(15100),
            100,
            60,
            0,
            2,
        );
        assert_eq!(o.state, OrderState::PartiallyFilled);
        assert_eq!(o.open_quantity, 40);
    }
}
