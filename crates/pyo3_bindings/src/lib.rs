//! PyO3 bindings for the flowbar pipeline.
//!
//! Exposes the Rust implementation to Python:
//! - Trade delta classification
//! - Heikin-Ashi transform
//! - The bar pipeline (CVD bars, ADX/DI, EMAs)

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use flowbar_core::config::{BucketSpec, OrderingPolicy};
use flowbar_core::{logging, Config, Error, Ohlc, TradeSide};
use flowbar_features::table::ColumnValue;
use flowbar_features::{HeikinAshi, Pipeline, RunSummary};
use flowbar_ingestion::RawTrade;

fn to_py_err(e: Error) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn check_len(name: &str, expected: usize, actual: usize) -> PyResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(PyValueError::new_err(format!(
            "{name} has {actual} entries, expected {expected}"
        )))
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Signed delta of a trade: +size for `B`, -size for `A`, 0 otherwise.
#[pyfunction]
fn classify(side: &str, size: u64) -> PyResult<i64> {
    let side = TradeSide::from_tag(side)
        .ok_or_else(|| PyValueError::new_err("empty side tag"))?;
    Ok(flowbar_ingestion::classify(side, size))
}

/// Heikin-Ashi transform of OHLC columns.
#[pyfunction]
#[allow(clippy::type_complexity)]
fn heikin_ashi(
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
) -> PyResult<(Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>)> {
    let n = open.len();
    check_len("high", n, high.len())?;
    check_len("low", n, low.len())?;
    check_len("close", n, close.len())?;

    let bars: Vec<Ohlc> = (0..n)
        .map(|i| Ohlc::new(open[i], high[i], low[i], close[i]))
        .collect();
    let ha = HeikinAshi::transform(&bars);

    Ok((
        ha.iter().map(|b| b.open).collect(),
        ha.iter().map(|b| b.high).collect(),
        ha.iter().map(|b| b.low).collect(),
        ha.iter().map(|b| b.close).collect(),
    ))
}

// ============================================================================
// Pipeline
// ============================================================================

/// Trade-to-bar pipeline.
#[pyclass(name = "BarPipeline")]
pub struct PyBarPipeline {
    inner: Pipeline,
    last_summary: Option<RunSummary>,
}

#[pymethods]
impl PyBarPipeline {
    #[new]
    #[pyo3(signature = (bucket_width_secs=60, adx_period=14, ema_periods=None, heikin_ashi=false, sort_unordered=true))]
    fn new(
        bucket_width_secs: u64,
        adx_period: u32,
        ema_periods: Option<Vec<u32>>,
        heikin_ashi: bool,
        sort_unordered: bool,
    ) -> PyResult<Self> {
        let mut config = Config::default();
        config.bars.bucket = BucketSpec::Time {
            width_secs: bucket_width_secs,
        };
        config.indicators.adx_period = adx_period;
        if let Some(periods) = ema_periods {
            config.indicators.ema_periods = periods;
        }
        config.indicators.heikin_ashi = heikin_ashi;
        config.ingestion.ordering = if sort_unordered {
            OrderingPolicy::Sort
        } else {
            OrderingPolicy::Strict
        };

        Ok(PyBarPipeline {
            inner: Pipeline::new(config).map_err(to_py_err)?,
            last_summary: None,
        })
    }

    /// Run trade columns through the pipeline. Returns one dict per bar.
    fn process<'py>(
        &mut self,
        py: Python<'py>,
        ts_ns: Vec<i64>,
        price: Vec<f64>,
        size: Vec<i64>,
        side: Vec<String>,
    ) -> PyResult<Vec<Bound<'py, PyDict>>> {
        let n = ts_ns.len();
        check_len("price", n, price.len())?;
        check_len("size", n, size.len())?;
        check_len("side", n, side.len())?;

        let raw: Vec<RawTrade> = (0..n)
            .map(|i| RawTrade::new(ts_ns[i], price[i], size[i], &side[i]))
            .collect();
        let output = self.inner.process(&raw).map_err(to_py_err)?;

        let rows = output
            .records
            .iter()
            .map(|record| {
                let row = PyDict::new_bound(py);
                for (name, value) in record.columns() {
                    match value {
                        ColumnValue::Int(v) => row.set_item(name, v)?,
                        ColumnValue::Float(v) => row.set_item(name, v)?,
                    }
                }
                Ok(row)
            })
            .collect::<PyResult<Vec<_>>>()?;

        self.last_summary = Some(output.summary);
        Ok(rows)
    }

    /// Summary of the last run, or None before the first run.
    fn summary<'py>(&self, py: Python<'py>) -> PyResult<Option<Bound<'py, PyDict>>> {
        let Some(s) = &self.last_summary else {
            return Ok(None);
        };

        let d = PyDict::new_bound(py);
        d.set_item("trades", s.trades)?;
        d.set_item("bars", s.bars)?;
        d.set_item("emitted", s.emitted)?;
        d.set_item("total_volume", s.total_volume)?;
        d.set_item("net_delta", s.net_delta)?;
        d.set_item("final_cvd", s.final_cvd)?;
        d.set_item("cvd_continuous", s.cvd_continuous)?;

        let c = &s.classification;
        d.set_item("buy_trades", c.buy_trades)?;
        d.set_item("sell_trades", c.sell_trades)?;
        d.set_item("neutral_trades", c.neutral_trades)?;
        d.set_item("unknown_trades", c.unknown_trades)?;
        d.set_item("miss_volume_frac", c.miss_volume_frac())?;

        if let Some(t) = &s.trend {
            d.set_item("adx", t.adx)?;
            d.set_item("plus_di", t.plus_di)?;
            d.set_item("minus_di", t.minus_di)?;
            d.set_item("trend_strength", t.strength.map(|v| format!("{v:?}")))?;
            d.set_item("trend_direction", format!("{:?}", t.direction))?;
            d.set_item("ema_trend", t.ema_trend.map(|v| format!("{v:?}")))?;
        }
        if let Some(t) = &s.ha_trend {
            d.set_item("ha_adx", t.adx)?;
            d.set_item("ha_plus_di", t.plus_di)?;
            d.set_item("ha_minus_di", t.minus_di)?;
            d.set_item("ha_trend_strength", t.strength.map(|v| format!("{v:?}")))?;
            d.set_item("ha_trend_direction", format!("{:?}", t.direction))?;
            d.set_item("ha_ema_trend", t.ema_trend.map(|v| format!("{v:?}")))?;
        }
        Ok(Some(d))
    }

    fn __repr__(&self) -> String {
        let config = self.inner.config();
        format!(
            "BarPipeline(bucket={:?}, adx_period={}, ema_periods={:?}, heikin_ashi={})",
            config.bars.bucket,
            config.indicators.adx_period,
            config.indicators.ema_periods,
            config.indicators.heikin_ashi
        )
    }
}

// ============================================================================
// Module Definition
// ============================================================================

/// Flowbar - order-flow bars and trend indicators from Rust.
#[pymodule]
fn flowbar_native(m: &Bound<'_, PyModule>) -> PyResult<()> {
    logging::init_logging("warn", false);

    m.add_function(wrap_pyfunction!(classify, m)?)?;
    m.add_function(wrap_pyfunction!(heikin_ashi, m)?)?;
    m.add_class::<PyBarPipeline>()?;

    Ok(())
}
