//! The per-symbol order book: dual-indexed storage plus matching.

mod book;
mod error;
mod matching;

pub use book::{AskKey, BidKey, OneSideBook, OrderBook, PriorityKey};
pub use error::OrderBookError;
