//! Order submission, cancellation, top-of-book, and the aggressive
//! matching algorithm.

use crate::model::{CancelEvent, NewOrderEvent, Order, OrderType, Quantity, Side, TopOfBookEvent};
use crate::report::{CancelReason, ExecutionReport, OrderCanceledReport, SingleOrderReport, TopOfBookReport};
use crate::sink::ReportSink;

use super::book::{OneSideBook, OrderBook, PriorityKey};

/// `true` if an order of `side`/`order_type`/`price` crosses a resting
/// order at `resting_price`.
fn crosses(side: Side, order_type: OrderType, price: crate::model::Price, resting_price: crate::model::Price) -> bool {
    if order_type == OrderType::Market {
        return true;
    }
    match side {
        Side::Buy => price >= resting_price,
        Side::Sell => price <= resting_price,
    }
}

impl OrderBook {
    /// Routes a new order: aggress against the opposite side if it crosses,
    /// otherwise rest a `Limit` or fill-and-kill a `Market`. Always returns
    /// `true` — side/type rejection happens at decode time, before an
    /// `Event` is ever constructed.
    pub fn submit_new_order(&mut self, event: NewOrderEvent, sink: &ReportSink) -> bool {
        let crosses_opposite = match event.side {
            Side::Buy => self
                .asks
                .best()
                .is_some_and(|ask| crosses(event.side, event.order_type, event.price, ask.price)),
            Side::Sell => self
                .bids
                .best()
                .is_some_and(|bid| crosses(event.side, event.order_type, event.price, bid.price)),
        };

        if crosses_opposite {
            self.aggressive_match(event, sink);
        } else if event.order_type == OrderType::Limit {
            if event.quantity > 0 {
                let seq = self.next_sequence_number();
                let order = Order::new(
                    event.user_id,
                    event.client_order_id,
                    event.symbol,
                    event.side,
                    event.order_type,
                    event.price,
                    event.quantity,
                    0,
                    event.timestamp,
                    seq,
                );
                self.insert(order);
            }
            // quantity <= 0: no crash, no report, nothing rests.
        } else {
            sink.submit_canceled(OrderCanceledReport {
                symbol: event.symbol,
                order_id: event.client_order_id,
                remaining_quantity: event.quantity,
                reason: CancelReason::FillAndKill,
            });
        }
        true
    }

    fn aggressive_match(&mut self, event: NewOrderEvent, sink: &ReportSink) {
        let mut filled: Quantity = 0;
        let mut reports: Vec<ExecutionReport> = Vec::new();

        match event.side {
            Side::Buy => match_against(&mut self.asks, &event, &mut filled, &mut reports),
            Side::Sell => match_against(&mut self.bids, &event, &mut filled, &mut reports),
        }

        if !reports.is_empty() {
            sink.submit_fills(&reports);
        }

        if filled < event.quantity {
            let opposite_empty = match event.side {
                Side::Buy => self.asks.is_empty(),
                Side::Sell => self.bids.is_empty(),
            };
            let remaining = event.quantity - filled;

            if opposite_empty && event.order_type == OrderType::Limit {
                let seq = self.next_sequence_number();
                let residual = Order::new(
                    event.user_id,
                    event.client_order_id,
                    event.symbol,
                    event.side,
                    event.order_type,
                    event.price,
                    event.quantity,
                    filled,
                    event.timestamp,
                    seq,
                );
                self.insert(residual);
            } else {
                // Opposite side empty and Market, or opposite side still
                // has resting orders but none crosses: fill-and-kill the
                // residual, even for a non-crossing Limit order.
                sink.submit_canceled(OrderCanceledReport {
                    symbol: event.symbol,
                    order_id: event.client_order_id,
                    remaining_quantity: remaining,
                    reason: CancelReason::FillAndKill,
                });
            }
        }
    }

    /// Cancels a resting order by id. Checks the bid side first, then the
    /// ask side.
    pub fn submit_cancel_order(&mut self, event: CancelEvent, sink: &ReportSink) -> bool {
        match self.cancel_by_id(event.orig_order_id) {
            Some(mut order) => {
                order.cancel();
                sink.submit_canceled(OrderCanceledReport {
                    symbol: event.symbol,
                    order_id: order.client_order_id,
                    remaining_quantity: order.open_quantity,
                    reason: CancelReason::UserCanceled,
                });
                true
            }
            None => false,
        }
    }

    /// Reports the best bid and ask. A pure read: never mutates the book.
    pub fn submit_top_of_book(&self, event: TopOfBookEvent, sink: &ReportSink) {
        let bid = self
            .best_bid()
            .map(|o| SingleOrderReport {
                order_id: o.client_order_id,
                price: o.price,
                open_quantity: o.open_quantity,
            })
            .unwrap_or(SingleOrderReport::INVALID);
        let ask = self
            .best_ask()
            .map(|o| SingleOrderReport {
                order_id: o.client_order_id,
                price: o.price,
                open_quantity: o.open_quantity,
            })
            .unwrap_or(SingleOrderReport::INVALID);
        sink.submit_top_of_book(TopOfBookReport {
            symbol: event.symbol,
            bid,
            ask,
        });
    }
}

/// Walks `opposite` in priority order, filling the incoming event against
/// each crossing resting order in turn. Mutates `opposite` in place;
/// appends one `ExecutionReport` pair per fill to `reports`.
fn match_against<K: PriorityKey>(
    opposite: &mut OneSideBook<K>,
    event: &NewOrderEvent,
    filled: &mut Quantity,
    reports: &mut Vec<ExecutionReport>,
) {
    loop {
        if *filled >= event.quantity {
            break;
        }
        let Some(key) = opposite.first_key() else {
            break;
        };
        if !crosses(event.side, event.order_type, event.price, key.price()) {
            break;
        }

        let (take, resting_order_id, resting_price, became_empty) = {
            let resting = opposite
                .get_mut_by_key(key)
                .expect("first_key's key must be present in the priority map");
            let take = (event.quantity - *filled).min(resting.open_quantity);
            resting.fill(take);
            (
                take,
                resting.client_order_id,
                resting.price,
                resting.open_quantity == 0,
            )
        };

        if became_empty {
            opposite.remove_by_key(key);
        }

        reports.push(ExecutionReport {
            symbol: event.symbol,
            order_id: resting_order_id,
            other_order_id: event.client_order_id,
            filled_quantity: take,
            price: resting_price,
        });
        reports.push(ExecutionReport {
            symbol: event.symbol,
            order_id: event.client_order_id,
            other_order_id: resting_order_id,
            filled_quantity: take,
            price: resting_price,
        });

        *filled += take;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Price, Symbol, UserId};
    use crate::orderbook::book::AskKey;
    use crate::sink::ReportSink;

    fn aapl() -> Symbol {
        Symbol::from_str_truncating("AAPL")
    }

    fn new_order(
        id: u64,
        side: Side,
        order_type: OrderType,
        price: i64,
        qty: i64,
    ) -> NewOrderEvent {
        NewOrderEvent {
            user_id: UserId::INVALID,
            client_order_id: id,
            symbol: aapl(),
            quantity: qty,
            side,
            order_type,
            price: Price(price),
            timestamp: 0,
        }
    }

    #[test]
    fn price_time_priority_over_four_resting_asks() {
        let mut book = OrderBook::new(aapl());
        let sink = ReportSink::new_for_test();

        book.submit_new_order(new_order(6001, Side::Sell, OrderType::Limit, 150_00, 50), &sink);
        book.submit_new_order(new_order(6002, Side::Sell, OrderType::Limit, 150_00, 30), &sink);
        book.submit_new_order(new_order(6003, Side::Sell, OrderType::Limit, 149_50, 40), &sink);
        book.submit_new_order(new_order(6004, Side::Sell, OrderType::Limit, 149_00, 20), &sink);

        book.submit_new_order(new_order(6005, Side::Buy, OrderType::Limit, 151_00, 100), &sink);

        // 6004 (20) + 6003 (40) + 6001 (40, partial) = 100.
        assert!(!book.contains_order(6004));
        assert!(!book.contains_order(6003));
        assert!(book.contains_order(6001));
        assert!(book.contains_order(6002));
        let residual_6001 = book.asks.get_mut_by_key(AskKey::new(Price(150_00), 0, 1)).unwrap();
        assert_eq!(residual_6001.open_quantity, 10);
    }

    #[test]
    fn exact_fill_emits_no_cancel_report() {
        let mut book = OrderBook::new(aapl());
        let sink = ReportSink::new_for_test();
        book.submit_new_order(new_order(9001, Side::Sell, OrderType::Limit, 150_00, 60), &sink);
        book.submit_new_order(new_order(9002, Side::Sell, OrderType::Limit, 150_00, 40), &sink);
        book.submit_new_order(new_order(9003, Side::Buy, OrderType::Limit, 150_00, 100), &sink);
        assert!(!book.contains_order(9001));
        assert!(!book.contains_order(9002));
        assert!(!book.contains_order(9003));
    }

    #[test]
    fn market_with_no_liquidity_is_fill_and_kill() {
        let mut book = OrderBook::new(aapl());
        let sink = ReportSink::new_for_test();
        book.submit_new_order(new_order(1003, Side::Buy, OrderType::Market, 0, 100), &sink);
        assert!(!book.contains_order(1003));
        assert!(book.best_bid().is_none());
    }

    #[test]
    fn nonpositive_quantity_limit_order_does_not_rest() {
        let mut book = OrderBook::new(aapl());
        let sink = ReportSink::new_for_test();
        book.submit_new_order(new_order(1, Side::Buy, OrderType::Limit, 150_00, 0), &sink);
        assert!(book.best_bid().is_none());
    }
}
