//! Core data types for the flowbar pipeline.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp in nanoseconds since Unix epoch (UTC).
pub type TimestampNs = i64;

/// Nanoseconds per second.
pub const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Floor a timestamp to the start of its bucket.
///
/// Uses Euclidean division so pre-epoch timestamps floor downwards too.
/// `None` when the bucket start falls below `i64::MIN` or the width is not positive.
#[inline]
pub fn floor_to_bucket(ts_ns: TimestampNs, width_ns: i64) -> Option<TimestampNs> {
    if width_ns <= 0 {
        return None;
    }
    ts_ns.div_euclid(width_ns).checked_mul(width_ns)
}

/// Convert a nanosecond timestamp to a UTC datetime.
#[inline]
pub fn ts_to_datetime(ts_ns: TimestampNs) -> DateTime<Utc> {
    Utc.timestamp_nanos(ts_ns)
}

/// Aggressor side of a trade, as tagged by the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeSide {
    /// Buyer-initiated (tag `B`).
    Buy,
    /// Seller-initiated (tag `A`).
    Sell,
    /// No aggressor (tag `N`).
    Neutral,
    /// Any other tag the feed produced.
    Unknown(char),
}

impl TradeSide {
    /// Parse a feed side tag. Never fails for a non-empty tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let mut chars = tag.trim().chars();
        let first = chars.next()?;
        let side = match (first, chars.next()) {
            ('B', None) => TradeSide::Buy,
            ('A', None) => TradeSide::Sell,
            ('N', None) => TradeSide::Neutral,
            _ => TradeSide::Unknown(first),
        };
        Some(side)
    }

    /// Get the sign: +1 buy, -1 sell, 0 otherwise.
    #[inline]
    pub fn sign(self) -> i64 {
        match self {
            TradeSide::Buy => 1,
            TradeSide::Sell => -1,
            TradeSide::Neutral | TradeSide::Unknown(_) => 0,
        }
    }
}

/// A single validated trade execution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Event timestamp in nanoseconds.
    pub ts_ns: TimestampNs,
    /// Trade price.
    pub price: f64,
    /// Trade size (contracts).
    pub size: u64,
    /// Aggressor side.
    pub side: TradeSide,
}

/// A trade with its signed delta and the running CVD after it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedTrade {
    /// The trade itself.
    pub trade: Trade,
    /// Signed size (positive buy, negative sell, zero otherwise).
    pub delta: i64,
    /// Cumulative delta including this trade.
    pub running_cvd: i64,
}

/// Floating-point OHLC view shared by every bar flavor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ohlc {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Ohlc {
    pub fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Self { open, high, low, close }
    }

    /// A bar where all four prices are equal.
    pub fn flat(price: f64) -> Self {
        Self::new(price, price, price, price)
    }

    /// Check `high >= max(open, close)` and `low <= min(open, close)`.
    pub fn is_consistent(&self) -> bool {
        self.high >= self.open.max(self.close) && self.low <= self.open.min(self.close)
    }

    /// High minus low.
    #[inline]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// Anything that can be read as an OHLC candle.
pub trait Candle {
    fn ohlc(&self) -> Ohlc;
}

impl Candle for Ohlc {
    fn ohlc(&self) -> Ohlc {
        *self
    }
}

/// Price bar for one bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Bucket start timestamp.
    pub ts_bucket: TimestampNs,
    /// First trade price.
    pub open: f64,
    /// Highest trade price.
    pub high: f64,
    /// Lowest trade price.
    pub low: f64,
    /// Last trade price.
    pub close: f64,
    /// Sum of trade sizes.
    pub volume: u64,
    /// Sum of signed trade deltas.
    pub delta: i64,
    /// Number of trades.
    pub trade_count: u32,
}

impl Candle for PriceBar {
    fn ohlc(&self) -> Ohlc {
        Ohlc::new(self.open, self.high, self.low, self.close)
    }
}

/// OHLC of the cumulative volume delta within one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvdBar {
    pub ts_bucket: TimestampNs,
    pub open: i64,
    pub high: i64,
    pub low: i64,
    pub close: i64,
}

impl Candle for CvdBar {
    fn ohlc(&self) -> Ohlc {
        Ohlc::new(
            self.open as f64,
            self.high as f64,
            self.low as f64,
            self.close as f64,
        )
    }
}

/// A finalized bucket: price bar plus CVD bar sharing one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub ts_bucket: TimestampNs,
    pub price: PriceBar,
    pub cvd: CvdBar,
}

/// Directional movement readings for one bar. Any field may be NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalIndex {
    pub plus_di: f64,
    pub minus_di: f64,
    pub adx: f64,
}

impl DirectionalIndex {
    /// All readings undefined.
    pub fn undefined() -> Self {
        Self {
            plus_di: f64::NAN,
            minus_di: f64::NAN,
            adx: f64::NAN,
        }
    }
}
