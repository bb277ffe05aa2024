//! Report types emitted by the order book and serialized by the report
//! sink. `Display` impls produce the exact wire text the exchange writes
//! to its output.

use std::fmt;

use crate::model::{OrderId, Price, Quantity, Symbol, INVALID_ORDER_ID, INVALID_PRICE};

/// Why an order was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The unfilled residual of an aggressive order was killed rather than
    /// rested.
    FillAndKill,
    /// The resting order was explicitly cancelled by its owner.
    UserCanceled,
    Other,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::FillAndKill => write!(f, "Fill_And_Kill"),
            CancelReason::UserCanceled => write!(f, "User_Canceled"),
            CancelReason::Other => write!(f, "Other"),
        }
    }
}

/// One fill: either leg of a trade emits its own report, keyed by its own
/// order id with the counterparty as `other_order_id`.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionReport {
    pub symbol: Symbol,
    pub order_id: OrderId,
    pub other_order_id: OrderId,
    pub filled_quantity: Quantity,
    pub price: Price,
}

impl fmt::Display for ExecutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExecutionReport{{symbol={}, orderId={}, otherOrderId={}, filledQuantity={}, price={}}}",
            self.symbol, self.order_id, self.other_order_id, self.filled_quantity, self.price
        )
    }
}

/// An order removed from the book without (fully) resting: fill-and-kill
/// residuals and user cancels both produce this.
#[derive(Debug, Clone, Copy)]
pub struct OrderCanceledReport {
    pub symbol: Symbol,
    pub order_id: OrderId,
    pub remaining_quantity: Quantity,
    pub reason: CancelReason,
}

impl fmt::Display for OrderCanceledReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OrderCanceledReport{{symbol={}, orderId={}, remaining={}, reason={}}}",
            self.symbol, self.order_id, self.remaining_quantity, self.reason
        )
    }
}

/// The best resting order on one side, or the `INVALID` sentinel if the
/// side is empty.
#[derive(Debug, Clone, Copy)]
pub struct SingleOrderReport {
    pub order_id: OrderId,
    pub price: Price,
    pub open_quantity: Quantity,
}

impl SingleOrderReport {
    pub const INVALID: SingleOrderReport = SingleOrderReport {
        order_id: INVALID_ORDER_ID,
        price: INVALID_PRICE,
        open_quantity: 0,
    };
}

impl fmt::Display for SingleOrderReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SingleOrderReport{{orderId={}, price={}, openQty={}}}",
            self.order_id, self.price, self.open_quantity
        )
    }
}

/// Snapshot of the best bid and ask for a symbol.
#[derive(Debug, Clone, Copy)]
pub struct TopOfBookReport {
    pub symbol: Symbol,
    pub bid: SingleOrderReport,
    pub ask: SingleOrderReport,
}

impl fmt::Display for TopOfBookReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TopOfBookReport{{symbol={}, bid={}, ask={}}}",
            self.symbol, self.bid, self.ask
        )
    }
}

/// The tagged union pushed onto the report sink's queue.
#[derive(Debug, Clone, Copy)]
pub enum ReportItem {
    Execution(ExecutionReport),
    Canceled(OrderCanceledReport),
    TopOfBook(TopOfBookReport),
}

impl fmt::Display for ReportItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportItem::Execution(r) => r.fmt(f),
            ReportItem::Canceled(r) => r.fmt(f),
            ReportItem::TopOfBook(r) => r.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_report_format() {
        let r = ExecutionReport {
            symbol: Symbol::from_str_truncating("AAPL"),
            order_id: 2001,
            other_order_id: 2002,
            filled_quantity: 50,
            price: Price(15000),
        };
        assert_eq!(
            r.to_string(),
            "ExecutionReport{symbol=AAPL, orderId=2001, otherOrderId=2002, filledQuantity=50, price=150.00}"
        );
    }

    #[test]
    fn canceled_report_format() {
        let r = OrderCanceledReport {
            symbol: Symbol::from_str_truncating("AAPL"),
            order_id: 1003,
            remaining_quantity: 100,
            reason: CancelReason::FillAndKill,
        };
        assert_eq!(
            r.to_string(),
            "OrderCanceledReport{symbol=AAPL, orderId=1003, remaining=100, reason=Fill_And_Kill}"
        );
    }

    #[test]
    fn top_of_book_invalid_side() {
        let r = TopOfBookReport {
            symbol: Symbol::from_str_truncating("AAPL"),
            bid: SingleOrderReport::INVALID,
            ask: SingleOrderReport::INVALID,
        };
        assert!(r.to_string().contains("orderId=0"));
    }
}
