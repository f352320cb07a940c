//! Timestamp ordering enforcement.
//!
//! Every downstream stage is an order-dependent recurrence, so trades must
//! be in non-decreasing timestamp order before classification.

use flowbar_core::config::OrderingPolicy;
use flowbar_core::{Error, Result, Trade};
use tracing::warn;

/// Index of the first trade whose timestamp is below its predecessor's.
pub fn first_inversion(trades: &[Trade]) -> Option<usize> {
    trades
        .windows(2)
        .position(|w| w[1].ts_ns < w[0].ts_ns)
        .map(|i| i + 1)
}

/// Number of adjacent pairs that go backwards in time.
pub fn count_inversions(trades: &[Trade]) -> usize {
    trades.windows(2).filter(|w| w[1].ts_ns < w[0].ts_ns).count()
}

/// Apply the ordering policy. Equal timestamps keep their arrival order.
pub fn enforce_order(mut trades: Vec<Trade>, policy: OrderingPolicy) -> Result<Vec<Trade>> {
    let Some(index) = first_inversion(&trades) else {
        return Ok(trades);
    };

    match policy {
        OrderingPolicy::Strict => Err(Error::Ordering {
            index,
            prev_ts_ns: trades[index - 1].ts_ns,
            ts_ns: trades[index].ts_ns,
        }),
        OrderingPolicy::Sort => {
            let inversions = count_inversions(&trades);
            warn!(
                inversions,
                first_index = index,
                trades = trades.len(),
                "input not time-ordered, sorting by timestamp"
            );
            trades.sort_by_key(|t| t.ts_ns);
            Ok(trades)
        }
    }
}
