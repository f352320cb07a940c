//! Trade delta classification from the feed's aggressor tag.
//!
//! Buy-aggressor trades add their size, sell-aggressor trades subtract it.
//! Neutral and unrecognized tags contribute zero and are counted as
//! classification misses; they never abort a run.

use flowbar_core::{Trade, TradeSide};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Signed delta for a trade of `size` on `side`.
#[inline]
pub fn classify(side: TradeSide, size: u64) -> i64 {
    let size = i64::try_from(size).unwrap_or(i64::MAX);
    side.sign() * size
}

/// Statistics about trade classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationStats {
    /// Total trades classified.
    pub total_trades: u64,
    /// Trades with a buy aggressor.
    pub buy_trades: u64,
    /// Trades with a sell aggressor.
    pub sell_trades: u64,
    /// Trades tagged neutral.
    pub neutral_trades: u64,
    /// Trades with an unrecognized tag.
    pub unknown_trades: u64,
    /// Total volume processed.
    pub total_volume: u64,
    /// Buy volume.
    pub buy_volume: u64,
    /// Sell volume.
    pub sell_volume: u64,
    /// Volume that contributed no delta.
    pub miss_volume: u64,
}

impl ClassificationStats {
    /// Trades that contributed no delta (neutral or unrecognized).
    pub fn misses(&self) -> u64 {
        self.neutral_trades + self.unknown_trades
    }

    /// Fraction of volume that contributed no delta.
    pub fn miss_volume_frac(&self) -> f64 {
        if self.total_volume > 0 {
            self.miss_volume as f64 / self.total_volume as f64
        } else {
            0.0
        }
    }

    /// Buy volume minus sell volume, saturating at the `i64` bounds.
    pub fn net_delta(&self) -> i64 {
        let buy = i64::try_from(self.buy_volume).unwrap_or(i64::MAX);
        let sell = i64::try_from(self.sell_volume).unwrap_or(i64::MAX);
        buy.saturating_sub(sell)
    }

    /// Reset statistics.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Stateful classifier that keeps miss statistics.
#[derive(Debug, Default)]
pub struct TradeClassifier {
    stats: ClassificationStats,
    /// Unrecognized tags already reported at warn level.
    reported_tags: HashSet<char>,
}

impl TradeClassifier {
    /// Create a new trade classifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a single trade and record it in the statistics.
    /// Counters saturate instead of wrapping.
    pub fn classify(&mut self, trade: &Trade) -> i64 {
        let delta = classify(trade.side, trade.size);
        let stats = &mut self.stats;

        stats.total_trades = stats.total_trades.saturating_add(1);
        stats.total_volume = stats.total_volume.saturating_add(trade.size);

        match trade.side {
            TradeSide::Buy => {
                stats.buy_trades = stats.buy_trades.saturating_add(1);
                stats.buy_volume = stats.buy_volume.saturating_add(trade.size);
            }
            TradeSide::Sell => {
                stats.sell_trades = stats.sell_trades.saturating_add(1);
                stats.sell_volume = stats.sell_volume.saturating_add(trade.size);
            }
            TradeSide::Neutral => {
                stats.neutral_trades = stats.neutral_trades.saturating_add(1);
                stats.miss_volume = stats.miss_volume.saturating_add(trade.size);
                debug!(ts_ns = trade.ts_ns, size = trade.size, "neutral trade, zero delta");
            }
            TradeSide::Unknown(tag) => {
                stats.unknown_trades = stats.unknown_trades.saturating_add(1);
                stats.miss_volume = stats.miss_volume.saturating_add(trade.size);
                if self.reported_tags.insert(tag) {
                    warn!(%tag, ts_ns = trade.ts_ns, "unrecognized side tag, zero delta");
                } else {
                    debug!(%tag, ts_ns = trade.ts_ns, "unrecognized side tag, zero delta");
                }
            }
        }

        delta
    }

    /// Classify trades in order.
    pub fn classify_all(&mut self, trades: &[Trade]) -> Vec<i64> {
        trades.iter().map(|t| self.classify(t)).collect()
    }

    /// Get classification statistics.
    pub fn stats(&self) -> &ClassificationStats {
        &self.stats
    }

    /// Clear statistics and reported tags.
    pub fn clear(&mut self) {
        self.stats.reset();
        self.reported_tags.clear();
    }
}
