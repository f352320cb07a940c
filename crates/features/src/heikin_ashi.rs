//! Heikin-Ashi candle transform.

use flowbar_core::{Candle, Ohlc};

/// Streaming Heikin-Ashi transformer carrying the previous HA open/close.
#[derive(Debug, Clone, Default)]
pub struct HeikinAshi {
    prev: Option<(f64, f64)>,
}

impl HeikinAshi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transform the next bar.
    pub fn next<C: Candle>(&mut self, bar: &C) -> Ohlc {
        let bar = bar.ohlc();
        let ha_close = (bar.open + bar.high + bar.low + bar.close) / 4.0;
        let ha_open = match self.prev {
            None => (bar.open + bar.close) / 2.0,
            Some((prev_open, prev_close)) => (prev_open + prev_close) / 2.0,
        };
        self.prev = Some((ha_open, ha_close));

        Ohlc {
            open: ha_open,
            high: bar.high.max(ha_open).max(ha_close),
            low: bar.low.min(ha_open).min(ha_close),
            close: ha_close,
        }
    }

    pub fn reset(&mut self) {
        self.prev = None;
    }

    /// Transform a whole ordered series.
    pub fn transform<C: Candle>(bars: &[C]) -> Vec<Ohlc> {
        let mut ha = Self::new();
        bars.iter().map(|b| ha.next(b)).collect()
    }
}
