//! Order book error types.

use std::fmt;

use crate::model::{OrderId, Symbol};

/// Errors that can occur within an [`OrderBook`](super::OrderBook).
///
/// Most ingress-facing failures (bad CSV, unknown symbol, cancel of an
/// unknown id) are *not* represented here: they are absorbed at the
/// Exchange/dispatcher layer per the error taxonomy and never reach a
/// `Result`. This enum covers the remaining kind: book invariant
/// violations, which are bugs, not data errors.
#[derive(Debug)]
#[non_exhaustive]
pub enum OrderBookError {
    /// The same `client_order_id` was found resident on both sides of the
    /// book. Indicates a logic bug upstream of the book, not a data error.
    OrderIdOnBothSides {
        symbol: Symbol,
        order_id: OrderId,
    },

    /// The priority index and lookup index disagree on membership for one
    /// side.
    IndexesDisagree {
        symbol: Symbol,
        order_id: OrderId,
    },
}

impl fmt::Display for OrderBookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderBookError::OrderIdOnBothSides { symbol, order_id } => {
                write!(
                    f,
                    "invariant violation: order {order_id} present on both sides of {symbol}"
                )
            }
            OrderBookError::IndexesDisagree { symbol, order_id } => {
                write!(
                    f,
                    "invariant violation: priority/lookup index mismatch for order {order_id} on {symbol}"
                )
            }
        }
    }
}

impl std::error::Error for OrderBookError {}
