//! End-to-end run: raw records to bar records.

use crate::engine::compute_table;
use crate::sink::BarSink;
use crate::summary::RunSummary;
use crate::table::BarRecord;
use flowbar_core::{Config, Result};
use flowbar_ingestion::{
    enforce_order, validate_all, BarBuilder, CvdAccumulator, FeedRequest, RawTrade,
    TradeClassifier, TradeFeed,
};
use tracing::{debug, info_span};

/// Records and summary of one run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub records: Vec<BarRecord>,
    pub summary: RunSummary,
}

/// Batch pipeline driver.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    /// Create a pipeline. Fails on invalid configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run every stage over a batch of raw records.
    pub fn process(&self, raw: &[RawTrade]) -> Result<PipelineOutput> {
        let _span = info_span!("process", records = raw.len()).entered();

        let trades = validate_all(raw)?;
        let trades = enforce_order(trades, self.config.ingestion.ordering)?;

        let mut classifier = TradeClassifier::new();
        let mut cvd = CvdAccumulator::new();
        let classified = cvd.annotate(&trades, &mut classifier)?;

        let bars = &self.config.bars;
        let buckets = BarBuilder::new(bars.bucket, bars.cvd_mode).aggregate(&classified)?;
        let mut records = compute_table(&self.config.indicators, &buckets)?;

        if let Some(cutoff) = bars.emit_from_ns {
            let before = records.len();
            records.retain(|r| r.timestamp() >= cutoff);
            debug!(cutoff, dropped = before - records.len(), "warm-up records dropped");
        }

        let summary = RunSummary::new(&buckets, &records, cvd.value(), classifier.stats().clone());
        summary.log();

        Ok(PipelineOutput { records, summary })
    }

    /// Fetch from a feed, process, and write to a sink.
    pub fn run<F, S>(&self, feed: &mut F, request: &FeedRequest, sink: &mut S) -> Result<RunSummary>
    where
        F: TradeFeed + ?Sized,
        S: BarSink + ?Sized,
    {
        let raw = feed.fetch(request)?;
        let output = self.process(&raw)?;
        sink.write(&output.records)?;
        Ok(output.summary)
    }
}
