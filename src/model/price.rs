//! Price representation: a strong wrapper over a signed tick count, plus
//! the `PriceSpec` that governs decimal-to-tick conversion for an
//! instrument.

use std::fmt;

/// A price expressed in integer ticks. Comparable by the wrapped integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(pub i64);

/// Sentinel lower than every valid price.
pub const INVALID_PRICE: Price = Price(-1);

/// Sentinel higher than every valid price; carried only on inbound market
/// orders and never rested in a book.
pub const MARKET_PRICE: Price = Price(i64::MAX);

/// The rendering constant used to turn ticks back into a decimal price for
/// report output: `decimal = ticks as f64 * DEFAULT_TICK_SIZE`.
pub const DEFAULT_TICK_SIZE: f64 = 0.01;

impl Price {
    /// `true` for either sentinel.
    pub fn is_valid(&self) -> bool {
        *self != INVALID_PRICE && *self != MARKET_PRICE
    }

    /// Renders this price as a decimal using [`DEFAULT_TICK_SIZE`].
    pub fn to_decimal(self) -> f64 {
        self.0 as f64 * DEFAULT_TICK_SIZE
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.to_decimal())
    }
}

/// Governs conversion between a decimal price and the integer tick count a
/// [`Price`] stores: `ticks = round(price * scale / tick_scaled)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceSpec {
    pub scale: i64,
    pub tick_scaled: i64,
}

/// The default two-decimal-digit price spec shipped with the exchange.
pub const TWO_DIGITS_PRICE_SPEC: PriceSpec = PriceSpec {
    scale: 100,
    tick_scaled: 1,
};

/// Error converting a decimal price into ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceConversionError {
    /// `scale` or `tick_scaled` was not positive.
    InvalidSpec,
    /// The scaled value was not an exact multiple of `tick_scaled`.
    NotOnTickGrid,
}

impl fmt::Display for PriceConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceConversionError::InvalidSpec => {
                write!(f, "price spec scale and tick_scaled must both be positive")
            }
            PriceConversionError::NotOnTickGrid => {
                write!(f, "price is not a multiple of the instrument's tick size")
            }
        }
    }
}

impl std::error::Error for PriceConversionError {}

impl PriceSpec {
    /// Converts a decimal price (e.g. `150.00`) into ticks, failing if the
    /// scaled value does not land exactly on the tick grid.
    pub fn to_ticks(self, price: f64) -> Result<Price, PriceConversionError> {
        if self.scale <= 0 || self.tick_scaled <= 0 {
            return Err(PriceConversionError::InvalidSpec);
        }
        let scaled = price * self.scale as f64;
        let ticks_f = scaled / self.tick_scaled as f64;
        let ticks = ticks_f.round();
        if (ticks_f - ticks).abs() > 1e-6 {
            return Err(PriceConversionError::NotOnTickGrid);
        }
        Ok(Price(ticks as i64))
    }
}

/// Signed order/trade quantity; signed so `fill(qty <= 0)` is an ordinary
/// comparison rather than a wrapping-subtraction hazard.
pub type Quantity = i64;

/// Monotonic clock tick recorded at event construction time (nanoseconds
/// since an arbitrary process-local epoch, not wall-clock time).
pub type Timestamp = u64;

/// Strictly increasing per book, assigned by the owning book at insertion.
pub type SequenceNumber = u64;
