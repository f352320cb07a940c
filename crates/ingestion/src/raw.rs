//! Raw feed records and their validation into [`Trade`]s.
//!
//! Any shape violation rejects the whole run; no field is ever defaulted.

use chrono::DateTime;
use flowbar_core::{Error, Result, TimestampNs, Trade, TradeSide};
use serde::{Deserialize, Serialize};

/// Event timestamp as delivered by a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    /// Nanoseconds since epoch.
    Nanos(i64),
    /// RFC 3339 text, or integer nanoseconds as text.
    Text(String),
}

impl RawTimestamp {
    /// Resolve to nanoseconds since epoch.
    pub fn to_ns(&self) -> Result<TimestampNs> {
        match self {
            RawTimestamp::Nanos(ns) => Ok(*ns),
            RawTimestamp::Text(text) => {
                let text = text.trim();
                if let Ok(ns) = text.parse::<i64>() {
                    return Ok(ns);
                }
                DateTime::parse_from_rfc3339(text)
                    .map_err(|e| Error::data(format!("unparseable timestamp {text:?}: {e}")))?
                    .timestamp_nanos_opt()
                    .ok_or_else(|| Error::data(format!("timestamp {text:?} out of range")))
            }
        }
    }
}

/// One trade record as delivered by a feed, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTrade {
    pub ts_event: Option<RawTimestamp>,
    pub price: Option<f64>,
    pub size: Option<i64>,
    pub side: Option<String>,
}

impl RawTrade {
    /// Build a complete record.
    pub fn new(ts_ns: TimestampNs, price: f64, size: i64, side: &str) -> Self {
        Self {
            ts_event: Some(RawTimestamp::Nanos(ts_ns)),
            price: Some(price),
            size: Some(size),
            side: Some(side.to_string()),
        }
    }

    /// Event timestamp, if present and parseable.
    pub fn ts_ns(&self) -> Result<TimestampNs> {
        self.ts_event
            .as_ref()
            .ok_or_else(|| Error::data("missing field ts_event"))?
            .to_ns()
    }

    /// Validate into a [`Trade`]. `index` is used in error messages.
    pub fn validate(&self, index: usize) -> Result<Trade> {
        let at = |msg: String| Error::data(format!("record {index}: {msg}"));

        let ts_ns = self.ts_ns().map_err(|e| at(e.to_string()))?;

        let price = self.price.ok_or_else(|| at("missing field price".into()))?;
        if !price.is_finite() {
            return Err(at(format!("non-finite price {price}")));
        }

        let size = self.size.ok_or_else(|| at("missing field size".into()))?;
        let size = u64::try_from(size).map_err(|_| at(format!("negative size {size}")))?;

        let tag = self.side.as_deref().ok_or_else(|| at("missing field side".into()))?;
        let side = TradeSide::from_tag(tag).ok_or_else(|| at("empty side tag".into()))?;

        Ok(Trade {
            ts_ns,
            price,
            size,
            side,
        })
    }
}

/// Validate a batch of raw records. Fails on the first malformed record.
pub fn validate_all(records: &[RawTrade]) -> Result<Vec<Trade>> {
    records
        .iter()
        .enumerate()
        .map(|(i, raw)| raw.validate(i))
        .collect()
}
