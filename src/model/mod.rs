//! Value types shared by the order book, dispatcher, and report sink.

mod event;
mod ids;
mod order;
mod price;

pub use event::{CancelEvent, Event, NewOrderEvent, TopOfBookEvent};
pub use ids::{FixedBytes, OrderId, Symbol, UserId, INVALID_ORDER_ID};
pub use order::{Order, OrderState, OrderType, Side};
pub use price::{
    Price, PriceConversionError, PriceSpec, Quantity, SequenceNumber, Timestamp,
    DEFAULT_TICK_SIZE, INVALID_PRICE, MARKET_PRICE, TWO_DIGITS_PRICE_SPEC,
};
