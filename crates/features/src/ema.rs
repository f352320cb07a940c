//! Exponential moving averages over bar closes.

use crate::smoothing::{ExpSmoother, Smoothing};
use flowbar_core::config::EmaSmoothing;

/// One EMA step. `prev = None` seeds with `x`.
#[inline]
pub fn ema_step(prev: Option<f64>, x: f64, alpha: f64) -> f64 {
    match prev {
        None => x,
        Some(prev) => prev + alpha * (x - prev),
    }
}

/// EMA for one period.
#[derive(Debug, Clone)]
pub struct EmaState {
    period: u32,
    smoother: ExpSmoother,
}

impl EmaState {
    pub fn new(period: u32, smoothing: EmaSmoothing) -> Self {
        Self {
            period,
            smoother: ExpSmoother::new(Smoothing::for_period(smoothing, period)),
        }
    }

    pub fn update(&mut self, close: f64) -> f64 {
        self.smoother.update(close)
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn value(&self) -> Option<f64> {
        self.smoother.value()
    }
}

/// EMAs for every configured period over one close series.
#[derive(Debug, Clone)]
pub struct EmaBank {
    states: Vec<EmaState>,
}

impl EmaBank {
    pub fn new(periods: &[u32], smoothing: EmaSmoothing) -> Self {
        Self {
            states: periods
                .iter()
                .map(|&p| EmaState::new(p, smoothing))
                .collect(),
        }
    }

    /// Feed one close. Returns one value per period, in configured order.
    pub fn update(&mut self, close: f64) -> Vec<f64> {
        self.states.iter_mut().map(|s| s.update(close)).collect()
    }

    pub fn periods(&self) -> Vec<u32> {
        self.states.iter().map(|s| s.period).collect()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Run the bank over a whole series. Result is indexed `[bar][period]`.
    pub fn series(periods: &[u32], smoothing: EmaSmoothing, closes: &[f64]) -> Vec<Vec<f64>> {
        let mut bank = Self::new(periods, smoothing);
        closes.iter().map(|&c| bank.update(c)).collect()
    }
}

/// EMA of a whole series with a single smoothing.
pub fn ema_series(values: &[f64], smoothing: Smoothing) -> Vec<f64> {
    let mut smoother = ExpSmoother::new(smoothing);
    values.iter().map(|&v| smoother.update(v)).collect()
}
