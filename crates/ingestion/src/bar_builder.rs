//! Bucket bar building from classified trades.
//!
//! Folds an ordered trade stream into price bars and CVD bars. A bucket is
//! emitted only when a trade with a different (later) bucket key arrives,
//! or when the stream is finished.

use flowbar_core::config::{BucketSpec, CvdBarMode};
use flowbar_core::{
    floor_to_bucket, Bucket, ClassifiedTrade, CvdBar, Error, PriceBar, Result, TimestampNs,
};
use tracing::debug;

/// A bar that's currently being built.
#[derive(Debug, Clone)]
struct BarInProgress {
    ts_bucket: TimestampNs,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
    delta: i64,
    trade_count: u32,
    cvd_open: i64,
    cvd_high: i64,
    cvd_low: i64,
    cvd_close: i64,
    /// Cumulative bucket delta before this bar.
    cum_open: i64,
    /// Cumulative bucket delta including this bar.
    cum_close: i64,
}

fn overflow(index: usize, what: &str) -> Error {
    Error::data(format!("record {index}: bucket {what} overflows"))
}

impl BarInProgress {
    fn new(
        ts_bucket: TimestampNs,
        ct: &ClassifiedTrade,
        cum_open: i64,
        index: usize,
    ) -> Result<Self> {
        let price = ct.trade.price;
        Ok(Self {
            ts_bucket,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: ct.trade.size,
            delta: ct.delta,
            trade_count: 1,
            cvd_open: ct.running_cvd,
            cvd_high: ct.running_cvd,
            cvd_low: ct.running_cvd,
            cvd_close: ct.running_cvd,
            cum_open,
            cum_close: cum_open
                .checked_add(ct.delta)
                .ok_or_else(|| overflow(index, "cumulative delta"))?,
        })
    }

    fn add_trade(&mut self, ct: &ClassifiedTrade, index: usize) -> Result<()> {
        let volume = self
            .volume
            .checked_add(ct.trade.size)
            .ok_or_else(|| overflow(index, "volume"))?;
        let delta = self
            .delta
            .checked_add(ct.delta)
            .ok_or_else(|| overflow(index, "delta"))?;
        let cum_close = self
            .cum_close
            .checked_add(ct.delta)
            .ok_or_else(|| overflow(index, "cumulative delta"))?;
        let trade_count = self
            .trade_count
            .checked_add(1)
            .ok_or_else(|| overflow(index, "trade count"))?;

        let price = ct.trade.price;
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.volume = volume;
        self.delta = delta;
        self.cum_close = cum_close;
        self.trade_count = trade_count;
        self.cvd_high = self.cvd_high.max(ct.running_cvd);
        self.cvd_low = self.cvd_low.min(ct.running_cvd);
        self.cvd_close = ct.running_cvd;
        Ok(())
    }

    fn to_bucket(&self, mode: CvdBarMode) -> Bucket {
        let cvd = match mode {
            CvdBarMode::IntraBucket => CvdBar {
                ts_bucket: self.ts_bucket,
                open: self.cvd_open,
                high: self.cvd_high,
                low: self.cvd_low,
                close: self.cvd_close,
            },
            CvdBarMode::BarCumulative => CvdBar {
                ts_bucket: self.ts_bucket,
                open: self.cum_open,
                high: self.cum_open.max(self.cum_close),
                low: self.cum_open.min(self.cum_close),
                close: self.cum_close,
            },
        };

        Bucket {
            ts_bucket: self.ts_bucket,
            price: PriceBar {
                ts_bucket: self.ts_bucket,
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
                volume: self.volume,
                delta: self.delta,
                trade_count: self.trade_count,
            },
            cvd,
        }
    }
}

/// Streaming builder for bucket bars.
pub struct BarBuilder {
    spec: BucketSpec,
    mode: CvdBarMode,
    /// Bar currently being built.
    current: Option<BarInProgress>,
    /// Timestamp of the last accepted trade.
    last_ts: Option<TimestampNs>,
    /// Trades accepted so far.
    trades_seen: usize,
    /// Cumulative bucket delta of everything already emitted.
    emitted_delta: i64,
    /// Buckets emitted so far.
    emitted: usize,
}

impl BarBuilder {
    /// Create a new bar builder. The bucket settings must already be validated.
    pub fn new(spec: BucketSpec, mode: CvdBarMode) -> Self {
        Self {
            spec,
            mode,
            current: None,
            last_ts: None,
            trades_seen: 0,
            emitted_delta: 0,
            emitted: 0,
        }
    }

    /// Bucket key for the trade at `index` given the bar in progress.
    fn bucket_key(&self, ts_ns: TimestampNs, index: usize) -> Result<TimestampNs> {
        match self.spec {
            BucketSpec::Time { .. } => {
                let width = self
                    .spec
                    .width_ns()
                    .ok_or_else(|| Error::config("invalid bucket width"))?;
                floor_to_bucket(ts_ns, width).ok_or_else(|| {
                    Error::data(format!(
                        "record {index}: timestamp {ts_ns} has no bucket start in range"
                    ))
                })
            }
            BucketSpec::Ticks { trades_per_bar } => match &self.current {
                Some(bar) if bar.trade_count < trades_per_bar => Ok(bar.ts_bucket),
                _ => Ok(ts_ns),
            },
        }
    }

    /// Add a classified trade. Returns the previous bucket if this trade
    /// closed it.
    pub fn push(&mut self, ct: &ClassifiedTrade) -> Result<Option<Bucket>> {
        let index = self.trades_seen;
        let ts_ns = ct.trade.ts_ns;
        if let Some(prev) = self.last_ts {
            if ts_ns < prev {
                return Err(Error::Ordering {
                    index,
                    prev_ts_ns: prev,
                    ts_ns,
                });
            }
        }

        let key = self.bucket_key(ts_ns, index)?;

        let same_bar = matches!(
            &self.current,
            Some(bar) if bar.ts_bucket == key && !self.closes_on_count(bar)
        );
        let completed = if same_bar {
            if let Some(bar) = self.current.as_mut() {
                bar.add_trade(ct, index)?;
            }
            None
        } else {
            let cum_open = self
                .current
                .as_ref()
                .map_or(self.emitted_delta, |bar| bar.cum_close);
            let next = BarInProgress::new(key, ct, cum_open, index)?;
            self.current.replace(next).map(|bar| self.emit(&bar))
        };

        self.last_ts = Some(ts_ns);
        self.trades_seen += 1;
        Ok(completed)
    }

    /// Tick bars started at the same timestamp must still split on count.
    fn closes_on_count(&self, bar: &BarInProgress) -> bool {
        match self.spec {
            BucketSpec::Ticks { trades_per_bar } => bar.trade_count >= trades_per_bar,
            BucketSpec::Time { .. } => false,
        }
    }

    fn emit(&mut self, bar: &BarInProgress) -> Bucket {
        let bucket = bar.to_bucket(self.mode);
        self.emitted_delta = bar.cum_close;
        self.emitted += 1;
        debug!(
            ts_bucket = bucket.ts_bucket,
            trades = bucket.price.trade_count,
            delta = bucket.price.delta,
            cvd_close = bucket.cvd.close,
            "bucket finalized"
        );
        bucket
    }

    /// Flush the bar in progress at end of stream.
    pub fn finish(&mut self) -> Option<Bucket> {
        let bar = self.current.take()?;
        Some(self.emit(&bar))
    }

    /// Fold a whole ordered batch into buckets, flushing the last one.
    pub fn aggregate(&mut self, trades: &[ClassifiedTrade]) -> Result<Vec<Bucket>> {
        let mut buckets = Vec::new();
        for ct in trades {
            if let Some(bucket) = self.push(ct)? {
                buckets.push(bucket);
            }
        }
        buckets.extend(self.finish());
        Ok(buckets)
    }

    /// Whether a bar is currently being built.
    pub fn has_pending(&self) -> bool {
        self.current.is_some()
    }

    /// Number of buckets emitted so far.
    pub fn emitted_count(&self) -> usize {
        self.emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowbar_core::{Trade, TradeSide, NANOS_PER_SEC};

    const MINUTE: BucketSpec = BucketSpec::Time { width_secs: 60 };

    /// Build classified trades from (seconds, price, size, side) tuples.
    fn classified(rows: &[(i64, f64, u64, TradeSide)]) -> Vec<ClassifiedTrade> {
        let mut running = 0;
        rows.iter()
            .map(|&(secs, price, size, side)| {
                let delta = side.sign() * size as i64;
                running += delta;
                ClassifiedTrade {
                    trade: Trade {
                        ts_ns: secs * NANOS_PER_SEC,
                        price,
                        size,
                        side,
                    },
                    delta,
                    running_cvd: running,
                }
            })
            .collect()
    }

    #[test]
    fn test_two_buckets() {
        let trades = classified(&[
            (0, 100.0, 5, TradeSide::Buy),
            (0, 101.0, 2, TradeSide::Sell),
            (61, 99.0, 3, TradeSide::Buy),
        ]);
        let buckets = BarBuilder::new(MINUTE, CvdBarMode::IntraBucket)
            .aggregate(&trades)
            .unwrap();

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].price.delta, 3);
        assert_eq!(buckets[0].cvd.close, 3);
        assert_eq!(buckets[0].cvd.open, 5);
        assert_eq!(buckets[0].cvd.high, 5);
        assert_eq!(buckets[0].cvd.low, 3);
        assert_eq!(buckets[1].ts_bucket, 60 * NANOS_PER_SEC);
        assert_eq!(buckets[1].price.delta, 3);
        assert_eq!(buckets[1].cvd.close, 6);
    }

    #[test]
    fn test_price_ohlc() {
        let trades = classified(&[
            (10, 6300.0, 1, TradeSide::Buy),
            (20, 6305.0, 2, TradeSide::Buy),
            (30, 6295.0, 1, TradeSide::Sell),
            (50, 6301.0, 1, TradeSide::Neutral),
        ]);
        let buckets = BarBuilder::new(MINUTE, CvdBarMode::IntraBucket)
            .aggregate(&trades)
            .unwrap();

        let bar = &buckets[0].price;
        assert_eq!(buckets.len(), 1);
        assert_eq!((bar.open, bar.high, bar.low, bar.close), (6300.0, 6305.0, 6295.0, 6301.0));
        assert_eq!(bar.volume, 5);
        assert_eq!(bar.delta, 2);
        assert_eq!(bar.trade_count, 4);
    }

    #[test]
    fn test_boundary_trade_opens_new_bucket() {
        let trades = classified(&[(59, 1.0, 1, TradeSide::Buy), (60, 2.0, 1, TradeSide::Buy)]);
        let buckets = BarBuilder::new(MINUTE, CvdBarMode::IntraBucket)
            .aggregate(&trades)
            .unwrap();

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[1].ts_bucket, 60 * NANOS_PER_SEC);
        assert_eq!(buckets[1].price.open, 2.0);
    }

    #[test]
    fn test_gaps_are_not_filled() {
        let trades = classified(&[(0, 1.0, 1, TradeSide::Buy), (600, 2.0, 1, TradeSide::Buy)]);
        let buckets = BarBuilder::new(MINUTE, CvdBarMode::IntraBucket)
            .aggregate(&trades)
            .unwrap();

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[1].ts_bucket, 600 * NANOS_PER_SEC);
    }

    #[test]
    fn test_streaming_emits_on_key_change() {
        let trades = classified(&[
            (1, 1.0, 1, TradeSide::Buy),
            (30, 1.0, 1, TradeSide::Buy),
            (61, 1.0, 1, TradeSide::Buy),
        ]);
        let mut builder = BarBuilder::new(MINUTE, CvdBarMode::IntraBucket);

        assert!(builder.push(&trades[0]).unwrap().is_none());
        assert!(builder.push(&trades[1]).unwrap().is_none());
        let first = builder.push(&trades[2]).unwrap().unwrap();
        assert_eq!(first.price.trade_count, 2);
        assert!(builder.has_pending());

        let last = builder.finish().unwrap();
        assert_eq!(last.ts_bucket, 60 * NANOS_PER_SEC);
        assert!(builder.finish().is_none());
        assert_eq!(builder.emitted_count(), 2);
    }

    #[test]
    fn test_out_of_order_rejected() {
        let trades = classified(&[(30, 1.0, 1, TradeSide::Buy), (10, 1.0, 1, TradeSide::Buy)]);
        let mut builder = BarBuilder::new(MINUTE, CvdBarMode::IntraBucket);
        assert!(matches!(builder.aggregate(&trades), Err(Error::Ordering { index: 1, .. })));
    }

    #[test]
    fn test_bar_cumulative_mode() {
        let trades = classified(&[
            (0, 1.0, 5, TradeSide::Buy),
            (1, 1.0, 2, TradeSide::Sell),
            (61, 1.0, 4, TradeSide::Sell),
        ]);
        let buckets = BarBuilder::new(MINUTE, CvdBarMode::BarCumulative)
            .aggregate(&trades)
            .unwrap();

        assert_eq!(buckets[0].cvd, CvdBar { ts_bucket: 0, open: 0, high: 3, low: 0, close: 3 });
        assert_eq!(
            buckets[1].cvd,
            CvdBar { ts_bucket: 60 * NANOS_PER_SEC, open: 3, high: 3, low: -1, close: -1 }
        );
    }

    #[test]
    fn test_tick_buckets() {
        let trades = classified(&[
            (0, 1.0, 1, TradeSide::Buy),
            (0, 2.0, 1, TradeSide::Buy),
            (0, 3.0, 1, TradeSide::Sell),
            (5, 4.0, 1, TradeSide::Buy),
            (9, 5.0, 1, TradeSide::Buy),
        ]);
        let buckets = BarBuilder::new(BucketSpec::Ticks { trades_per_bar: 2 }, CvdBarMode::IntraBucket)
            .aggregate(&trades)
            .unwrap();

        let counts: Vec<u32> = buckets.iter().map(|b| b.price.trade_count).collect();
        assert_eq!(counts, vec![2, 2, 1]);
        assert_eq!(buckets[0].ts_bucket, 0);
        assert_eq!(buckets[1].ts_bucket, 0);
        assert_eq!(buckets[1].price.open, 3.0);
        assert_eq!(buckets[2].ts_bucket, 9 * NANOS_PER_SEC);
    }

    #[test]
    fn test_empty_input() {
        let buckets = BarBuilder::new(MINUTE, CvdBarMode::IntraBucket)
            .aggregate(&[])
            .unwrap();
        assert!(buckets.is_empty());
    }

    #[test]
    fn test_volume_overflow_is_an_error() {
        let big = i64::MAX as u64;
        let trades = classified(&[
            (0, 1.0, big, TradeSide::Neutral),
            (1, 1.0, big, TradeSide::Neutral),
            (2, 1.0, big, TradeSide::Neutral),
        ]);
        let mut builder = BarBuilder::new(MINUTE, CvdBarMode::IntraBucket);
        let err = builder.aggregate(&trades).unwrap_err();
        assert!(matches!(err, Error::Data(ref msg) if msg.contains("record 2")));
    }

    #[test]
    fn test_timestamp_without_bucket_start() {
        let trades = classified(&[(0, 1.0, 1, TradeSide::Buy)]);
        let mut early = trades[0];
        early.trade.ts_ns = i64::MIN;
        let mut builder = BarBuilder::new(MINUTE, CvdBarMode::IntraBucket);
        assert!(matches!(builder.push(&early), Err(Error::Data(_))));
        assert!(!builder.has_pending());
    }
}
