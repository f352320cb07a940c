//! Wilder directional movement: +DI, -DI and ADX.

use crate::smoothing::{ExpSmoother, Smoothing};
use flowbar_core::{Candle, DirectionalIndex, Ohlc};

/// Raw true range and directional movement of one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalMovement {
    pub true_range: f64,
    pub plus_dm: f64,
    pub minus_dm: f64,
}

/// True range and directional movement against the previous bar.
/// Without a previous bar the true range is `high - low` and both DMs are 0.
pub fn directional_movement(prev: Option<&Ohlc>, bar: &Ohlc) -> DirectionalMovement {
    let Some(prev) = prev else {
        return DirectionalMovement {
            true_range: bar.range(),
            plus_dm: 0.0,
            minus_dm: 0.0,
        };
    };

    let true_range = bar
        .range()
        .max((bar.high - prev.close).abs())
        .max((bar.low - prev.close).abs());

    let high_diff = bar.high - prev.high;
    let low_diff = prev.low - bar.low;
    let plus_dm = if high_diff > low_diff && high_diff > 0.0 {
        high_diff
    } else {
        0.0
    };
    let minus_dm = if low_diff > high_diff && low_diff > 0.0 {
        low_diff
    } else {
        0.0
    };

    DirectionalMovement {
        true_range,
        plus_dm,
        minus_dm,
    }
}

/// `100 * dm / atr`, NaN when the ATR is zero.
#[inline]
fn directional_index(dm_smooth: f64, atr: f64) -> f64 {
    if atr == 0.0 || !atr.is_finite() {
        f64::NAN
    } else {
        100.0 * dm_smooth / atr
    }
}

/// `100 * |+DI - -DI| / (+DI + -DI)`, NaN on a zero sum or NaN input.
#[inline]
pub fn dx(plus_di: f64, minus_di: f64) -> f64 {
    let sum = plus_di + minus_di;
    if sum == 0.0 || sum.is_nan() {
        f64::NAN
    } else {
        100.0 * (plus_di - minus_di).abs() / sum
    }
}

/// Smoother state for one ADX computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WilderState {
    atr: ExpSmoother,
    plus_dm: ExpSmoother,
    minus_dm: ExpSmoother,
    adx: ExpSmoother,
}

impl WilderState {
    pub fn new(period: u32) -> Self {
        let smoother = ExpSmoother::new(Smoothing::Wilder(period));
        Self {
            atr: smoother,
            plus_dm: smoother,
            minus_dm: smoother,
            adx: smoother,
        }
    }

    /// Smoothed average true range, if any bar has been seen.
    pub fn atr(&self) -> Option<f64> {
        self.atr.value()
    }

    /// Current ADX, if any DX has been defined yet.
    pub fn adx(&self) -> Option<f64> {
        self.adx.value()
    }
}

/// Advance the Wilder state by one bar.
pub fn wilder_update(
    prev: Option<&Ohlc>,
    bar: &Ohlc,
    state: &WilderState,
) -> (DirectionalIndex, WilderState) {
    let mut next = *state;
    let dm = directional_movement(prev, bar);

    let atr = next.atr.update(dm.true_range);
    let plus_smooth = next.plus_dm.update(dm.plus_dm);
    let minus_smooth = next.minus_dm.update(dm.minus_dm);

    let plus_di = directional_index(plus_smooth, atr);
    let minus_di = directional_index(minus_smooth, atr);
    let adx = next.adx.update(dx(plus_di, minus_di));

    (
        DirectionalIndex {
            plus_di,
            minus_di,
            adx,
        },
        next,
    )
}

/// Streaming ADX/DI over a bar series.
#[derive(Debug, Clone)]
pub struct AdxEngine {
    period: u32,
    state: WilderState,
    prev: Option<Ohlc>,
}

impl AdxEngine {
    pub fn new(period: u32) -> Self {
        Self {
            period,
            state: WilderState::new(period),
            prev: None,
        }
    }

    /// Feed the next bar in chronological order.
    pub fn update<C: Candle>(&mut self, bar: &C) -> DirectionalIndex {
        let bar = bar.ohlc();
        let (reading, state) = wilder_update(self.prev.as_ref(), &bar, &self.state);
        self.state = state;
        self.prev = Some(bar);
        reading
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn state(&self) -> &WilderState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = WilderState::new(self.period);
        self.prev = None;
    }
}

/// ADX/DI for a whole bar series.
pub fn adx_series<C: Candle>(bars: &[C], period: u32) -> Vec<DirectionalIndex> {
    let mut engine = AdxEngine::new(period);
    bars.iter().map(|b| engine.update(b)).collect()
}
