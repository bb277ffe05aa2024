//! A sharded, multi-symbol limit order book matching engine with a
//! lock-free event pipeline and an asynchronous report sink.

pub mod dispatch;
pub mod exchange;
pub mod ingress;
pub mod model;
pub mod orderbook;
pub mod report;
pub mod sink;
pub mod sync;

pub use dispatch::OrderBookManager;
pub use exchange::Exchange;
pub use ingress::{IngressSource, UdpIngress};
pub use orderbook::OrderBook;
pub use sink::ReportSink;
