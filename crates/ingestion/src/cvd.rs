//! Running cumulative volume delta.

use crate::classifier::TradeClassifier;
use flowbar_core::{ClassifiedTrade, Error, Result, Trade};

/// Prefix sum of trade deltas, advanced once per trade.
#[derive(Debug, Clone, Default)]
pub struct CvdAccumulator {
    value: i64,
    pushes: u64,
}

impl CvdAccumulator {
    /// Create an accumulator starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one trade's delta and return the new cumulative value.
    /// Fails without changing state if the sum leaves the `i64` range.
    #[inline]
    pub fn push(&mut self, delta: i64) -> Result<i64> {
        self.value = self.value.checked_add(delta).ok_or_else(|| {
            Error::data(format!(
                "cumulative delta overflows after {} trades",
                self.pushes
            ))
        })?;
        self.pushes += 1;
        Ok(self.value)
    }

    /// Current cumulative value.
    pub fn value(&self) -> i64 {
        self.value
    }

    /// Number of deltas pushed so far.
    pub fn len(&self) -> u64 {
        self.pushes
    }

    pub fn is_empty(&self) -> bool {
        self.pushes == 0
    }

    /// Classify ordered trades and attach the running CVD to each.
    pub fn annotate(
        &mut self,
        trades: &[Trade],
        classifier: &mut TradeClassifier,
    ) -> Result<Vec<ClassifiedTrade>> {
        trades
            .iter()
            .enumerate()
            .map(|(i, trade)| {
                let delta = classifier.classify(trade);
                let running_cvd = self
                    .push(delta)
                    .map_err(|_| Error::data(format!("record {i}: cumulative delta overflows")))?;
                Ok(ClassifiedTrade {
                    trade: *trade,
                    delta,
                    running_cvd,
                })
            })
            .collect()
    }
}
