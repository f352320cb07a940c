//! Exponential smoothing primitives shared by the EMA and ADX engines.

use flowbar_core::config::EmaSmoothing;
use serde::{Deserialize, Serialize};

/// How the smoothing factor is derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Smoothing {
    /// `alpha = 2 / (period + 1)`.
    Span(u32),
    /// `alpha = 1 / period`.
    Wilder(u32),
    /// Fixed factor in `(0, 1]`.
    Alpha(f64),
}

impl Smoothing {
    /// Resolve the configured EMA smoothing for one period.
    pub fn for_period(smoothing: EmaSmoothing, period: u32) -> Self {
        match smoothing {
            EmaSmoothing::Span => Smoothing::Span(period),
            EmaSmoothing::Wilder => Smoothing::Wilder(period),
            EmaSmoothing::Fixed(alpha) => Smoothing::Alpha(alpha),
        }
    }

    /// Smoothing factor. Periods are validated non-zero by the config layer;
    /// a zero period here degrades to `alpha = 1`.
    pub fn alpha(self) -> f64 {
        match self {
            Smoothing::Span(p) => 2.0 / (p.max(1) as f64 + 1.0),
            Smoothing::Wilder(p) => 1.0 / p.max(1) as f64,
            Smoothing::Alpha(a) => a,
        }
    }
}

/// Recursive exponential smoother seeded with its first input.
///
/// A NaN input yields NaN and leaves the state untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpSmoother {
    alpha: f64,
    value: Option<f64>,
}

impl ExpSmoother {
    pub fn new(smoothing: Smoothing) -> Self {
        Self::with_alpha(smoothing.alpha())
    }

    pub fn with_alpha(alpha: f64) -> Self {
        Self { alpha, value: None }
    }

    /// Feed one observation and return the smoothed value.
    ///
    /// NaN returns NaN and leaves the state untouched, so the next defined
    /// value decays the previous one by a single step regardless of gap length.
    #[inline]
    pub fn update(&mut self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        let next = match self.value {
            None => x,
            Some(prev) => prev + self.alpha * (x - prev),
        };
        self.value = Some(next);
        next
    }

    /// Current smoothed value, if seeded.
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn is_seeded(&self) -> bool {
        self.value.is_some()
    }

    pub fn reset(&mut self) {
        self.value = None;
    }
}
