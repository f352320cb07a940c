//! End-of-run summary and trend reading of the last bar.

use crate::table::{BarRecord, EmaValue, HeikinAshiColumns};
use flowbar_core::{ts_to_datetime, Bucket, DirectionalIndex, TimestampNs};
use flowbar_ingestion::ClassificationStats;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// ADX trend strength band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendStrength {
    NoTrend,
    Weak,
    Strong,
    VeryStrong,
}

impl TrendStrength {
    /// Band for an ADX value; `None` when undefined.
    pub fn from_adx(adx: f64) -> Option<Self> {
        if adx.is_nan() {
            return None;
        }
        Some(if adx < 20.0 {
            TrendStrength::NoTrend
        } else if adx < 25.0 {
            TrendStrength::Weak
        } else if adx < 50.0 {
            TrendStrength::Strong
        } else {
            TrendStrength::VeryStrong
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Bullish,
    Bearish,
}

/// Price position relative to the 8 and 21 period EMAs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmaTrend {
    StrongUptrend,
    StrongDowntrend,
    Neutral,
}

impl EmaTrend {
    pub fn classify(close: f64, fast: f64, slow: f64) -> Self {
        if close > fast && fast > slow {
            EmaTrend::StrongUptrend
        } else if close < fast && fast < slow {
            EmaTrend::StrongDowntrend
        } else {
            EmaTrend::Neutral
        }
    }
}

/// Trend reading of one record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendReading {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
    pub strength: Option<TrendStrength>,
    pub direction: TrendDirection,
    /// Needs EMA periods 8 and 21.
    pub ema_trend: Option<EmaTrend>,
}

fn find_ema(ema: &[EmaValue], period: u32) -> Option<f64> {
    ema.iter().find(|e| e.period == period).map(|e| e.value)
}

impl TrendReading {
    fn new(close: f64, di: DirectionalIndex, fast: Option<f64>, slow: Option<f64>) -> Self {
        let direction = if di.plus_di > di.minus_di {
            TrendDirection::Bullish
        } else {
            TrendDirection::Bearish
        };
        let ema_trend = match (fast, slow) {
            (Some(fast), Some(slow)) => Some(EmaTrend::classify(close, fast, slow)),
            _ => None,
        };

        Self {
            adx: di.adx,
            plus_di: di.plus_di,
            minus_di: di.minus_di,
            strength: TrendStrength::from_adx(di.adx),
            direction,
            ema_trend,
        }
    }

    /// Reading of the raw price columns.
    pub fn from_record(record: &BarRecord) -> Self {
        Self::new(
            record.bucket.price.close,
            record.di,
            record.ema(8),
            record.ema(21),
        )
    }

    /// Reading of the Heikin-Ashi price columns.
    pub fn from_heikin_ashi(ha: &HeikinAshiColumns) -> Self {
        Self::new(
            ha.price.close,
            ha.di,
            find_ema(&ha.ema, 8),
            find_ema(&ha.ema, 21),
        )
    }
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Trades processed.
    pub trades: usize,
    /// Buckets built (before warm-up cutoff).
    pub bars: usize,
    /// Records emitted after the warm-up cutoff.
    pub emitted: usize,
    pub total_volume: u64,
    /// Sum of bucket deltas.
    pub net_delta: i64,
    /// Running CVD after the last trade.
    pub final_cvd: i64,
    /// Last bucket's CVD close equals the sum of bucket deltas and the
    /// final running CVD.
    pub cvd_continuous: bool,
    pub first_bucket: Option<TimestampNs>,
    pub last_bucket: Option<TimestampNs>,
    pub classification: ClassificationStats,
    /// Trend of the last emitted record.
    pub trend: Option<TrendReading>,
    /// Trend of the last record's Heikin-Ashi columns, when enabled.
    pub ha_trend: Option<TrendReading>,
}

impl RunSummary {
    pub fn new(
        buckets: &[Bucket],
        records: &[BarRecord],
        final_cvd: i64,
        classification: ClassificationStats,
    ) -> Self {
        let net_delta: i64 = buckets.iter().map(|b| b.price.delta).sum();
        let total_volume = buckets
            .iter()
            .fold(0u64, |acc, b| acc.saturating_add(b.price.volume));
        let trades = buckets.iter().map(|b| b.price.trade_count as usize).sum();
        let cvd_continuous = match buckets.last() {
            Some(last) => last.cvd.close == net_delta && net_delta == final_cvd,
            None => final_cvd == 0,
        };

        Self {
            trades,
            bars: buckets.len(),
            emitted: records.len(),
            total_volume,
            net_delta,
            final_cvd,
            cvd_continuous,
            first_bucket: buckets.first().map(|b| b.ts_bucket),
            last_bucket: buckets.last().map(|b| b.ts_bucket),
            classification,
            trend: records.last().map(TrendReading::from_record),
            ha_trend: records
                .last()
                .and_then(|r| r.heikin_ashi.as_ref())
                .map(TrendReading::from_heikin_ashi),
        }
    }

    /// Log the summary at info level.
    pub fn log(&self) {
        let first = self.first_bucket.map(|ts| ts_to_datetime(ts).to_rfc3339());
        let last = self.last_bucket.map(|ts| ts_to_datetime(ts).to_rfc3339());
        info!(
            trades = self.trades,
            bars = self.bars,
            emitted = self.emitted,
            volume = self.total_volume,
            net_delta = self.net_delta,
            final_cvd = self.final_cvd,
            misses = self.classification.misses(),
            first = ?first,
            last = ?last,
            "run complete"
        );

        if !self.cvd_continuous {
            warn!(
                net_delta = self.net_delta,
                final_cvd = self.final_cvd,
                "cvd bars do not reconcile with trade deltas"
            );
        }

        if let Some(trend) = &self.trend {
            info!(
                adx = trend.adx,
                plus_di = trend.plus_di,
                minus_di = trend.minus_di,
                strength = ?trend.strength,
                direction = ?trend.direction,
                ema_trend = ?trend.ema_trend,
                "last bar trend"
            );
        }

        if let Some(trend) = &self.ha_trend {
            info!(
                adx = trend.adx,
                plus_di = trend.plus_di,
                minus_di = trend.minus_di,
                strength = ?trend.strength,
                direction = ?trend.direction,
                ema_trend = ?trend.ema_trend,
                "last bar heikin-ashi trend"
            );
        }
    }
}
