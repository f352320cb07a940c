//! Configuration structures for the flowbar pipeline.

use crate::error::{Error, Result};
use crate::types::NANOS_PER_SEC;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bar construction configuration.
    pub bars: BarConfig,
    /// Indicator configuration.
    pub indicators: IndicatorConfig,
    /// Input handling configuration.
    pub ingestion: IngestionConfig,
}

impl Config {
    /// Parse a configuration from JSON. Missing sections take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        match self.bars.bucket {
            BucketSpec::Time { width_secs: 0 } => {
                return Err(Error::config("bucket width must be positive"));
            }
            BucketSpec::Time { .. } if self.bars.bucket.width_ns().is_none() => {
                return Err(Error::config("bucket width overflows nanosecond range"));
            }
            BucketSpec::Ticks { trades_per_bar: 0 } => {
                return Err(Error::config("trades per bar must be positive"));
            }
            _ => {}
        }
        if self.indicators.adx_period == 0 {
            return Err(Error::config("ADX period must be positive"));
        }
        if let Some(p) = self.indicators.ema_periods.iter().find(|&&p| p == 0) {
            return Err(Error::config(format!("invalid EMA period {p}")));
        }
        if let EmaSmoothing::Fixed(alpha) = self.indicators.ema_smoothing {
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(Error::config(format!(
                    "EMA alpha must be in (0, 1], got {alpha}"
                )));
            }
        }
        Ok(())
    }
}

/// How trades are grouped into bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketSpec {
    /// Fixed-width time buckets keyed by `floor(ts, width)`.
    Time { width_secs: u64 },
    /// Fixed trade-count buckets keyed by their first trade's timestamp.
    Ticks { trades_per_bar: u32 },
}

impl BucketSpec {
    /// Bucket width in nanoseconds for time buckets.
    pub fn width_ns(&self) -> Option<i64> {
        match *self {
            BucketSpec::Time { width_secs } => i64::try_from(width_secs)
                .ok()
                .and_then(|s| s.checked_mul(NANOS_PER_SEC)),
            BucketSpec::Ticks { .. } => None,
        }
    }
}

impl Default for BucketSpec {
    fn default() -> Self {
        BucketSpec::Time { width_secs: 60 }
    }
}

/// Semantics of the per-bucket CVD bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CvdBarMode {
    /// OHLC of the running CVD sampled at each trade in the bucket.
    #[default]
    IntraBucket,
    /// Cumulative sum of bucket deltas: open is the previous bucket's close.
    BarCumulative,
}

/// Bar construction configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarConfig {
    /// Bucket grouping.
    pub bucket: BucketSpec,
    /// CVD bar semantics.
    pub cvd_mode: CvdBarMode,
    /// Drop records whose bucket starts before this timestamp (warm-up).
    pub emit_from_ns: Option<i64>,
}

/// Smoothing constant used by the EMA banks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmaSmoothing {
    /// alpha = 2 / (period + 1).
    #[default]
    Span,
    /// alpha = 1 / period.
    Wilder,
    /// Same alpha for every period.
    Fixed(f64),
}

/// Indicator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Wilder smoothing period for ATR, DM and ADX.
    pub adx_period: u32,
    /// EMA periods tracked for every series.
    pub ema_periods: Vec<u32>,
    /// EMA smoothing convention.
    pub ema_smoothing: EmaSmoothing,
    /// Compute Heikin-Ashi bars and their indicators.
    pub heikin_ashi: bool,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            adx_period: 14,
            ema_periods: vec![8, 9, 13, 21, 22, 50, 100, 200],
            ema_smoothing: EmaSmoothing::Span,
            heikin_ashi: false,
        }
    }
}

/// What to do when trades arrive out of timestamp order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingPolicy {
    /// Fail the run on the first inversion.
    Strict,
    /// Stable-sort by timestamp before processing.
    #[default]
    Sort,
}

/// Input handling configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Ordering policy for unsorted input.
    pub ordering: OrderingPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.indicators.adx_period, 14);
        assert_eq!(config.indicators.ema_periods, vec![8, 9, 13, 21, 22, 50, 100, 200]);
        assert_eq!(config.bars.bucket.width_ns(), Some(60 * NANOS_PER_SEC));
        assert_eq!(config.ingestion.ordering, OrderingPolicy::Sort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = Config::from_json_str(
            r#"{"bars": {"bucket": {"time": {"width_secs": 300}}}, "indicators": {"heikin_ashi": true}}"#,
        )
        .unwrap();
        assert_eq!(config.bars.bucket, BucketSpec::Time { width_secs: 300 });
        assert!(config.indicators.heikin_ashi);
        assert_eq!(config.indicators.adx_period, 14);
        assert_eq!(config.bars.cvd_mode, CvdBarMode::IntraBucket);
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("flowbar-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"indicators": {"adx_period": 21, "ema_periods": [8, 21]}}"#)
            .unwrap();
        let config = Config::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.indicators.adx_period, 21);
        assert_eq!(config.indicators.ema_periods, vec![8, 21]);
        assert!(matches!(Config::from_file(&path), Err(Error::Io(_))));
    }

    #[test]
    fn test_tick_bucket_json() {
        let config = Config::from_json_str(
            r#"{"bars": {"bucket": {"ticks": {"trades_per_bar": 700}}, "cvd_mode": "bar_cumulative"}}"#,
        )
        .unwrap();
        assert_eq!(config.bars.bucket, BucketSpec::Ticks { trades_per_bar: 700 });
        assert_eq!(config.bars.cvd_mode, CvdBarMode::BarCumulative);
        assert_eq!(config.bars.bucket.width_ns(), None);
    }

    #[test]
    fn test_invalid_configs() {
        let mut config = Config::default();
        config.bars.bucket = BucketSpec::Time { width_secs: 0 };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.indicators.adx_period = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.indicators.ema_periods = vec![8, 0];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.indicators.ema_smoothing = EmaSmoothing::Fixed(1.5);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.bars.bucket = BucketSpec::Time { width_secs: u64::MAX };
        assert!(config.validate().is_err());
    }
}
