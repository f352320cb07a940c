//! Indicator computation for the flowbar pipeline.
//!
//! This crate handles:
//! - Exponential smoothing and EMA banks
//! - Wilder ADX / directional indicators
//! - Heikin-Ashi transform
//! - Output record assembly and sinks
//! - The end-to-end pipeline driver and run summary

pub mod ema;
pub mod engine;
pub mod heikin_ashi;
pub mod pipeline;
pub mod sink;
pub mod smoothing;
pub mod summary;
pub mod table;
pub mod wilder;

pub use ema::{ema_series, EmaBank};
pub use engine::{compute_table, IndicatorEngine};
pub use heikin_ashi::HeikinAshi;
pub use pipeline::{Pipeline, PipelineOutput};
pub use sink::{BarSink, JsonLinesSink, MemorySink};
pub use smoothing::{ExpSmoother, Smoothing};
pub use summary::{EmaTrend, RunSummary, TrendDirection, TrendStrength};
pub use table::{BarRecord, ColumnValue};
pub use wilder::{adx_series, AdxEngine};
