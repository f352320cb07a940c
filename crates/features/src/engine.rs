//! Indicator computation engine.
//!
//! Combines the ADX, EMA and Heikin-Ashi components into one interface,
//! either bucket by bucket or over a whole run.

use crate::{
    ema::EmaBank,
    heikin_ashi::HeikinAshi,
    table::{assemble, BarRecord, EmaValue, HeikinAshiColumns, HeikinAshiSeries, IndicatorSeries},
    wilder::{adx_series, AdxEngine},
};
use flowbar_core::config::IndicatorConfig;
use flowbar_core::{Bucket, Candle, Ohlc, Result};

/// Heikin-Ashi state: transformers for price and CVD plus their indicators.
#[derive(Debug, Clone)]
struct HeikinAshiState {
    price: HeikinAshi,
    cvd: HeikinAshi,
    adx: AdxEngine,
    ema: EmaBank,
    cvd_ema: EmaBank,
}

/// Streaming indicator engine.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    periods: Vec<u32>,
    /// ADX/DI on price bars.
    adx: AdxEngine,
    /// EMAs of the price close.
    ema: EmaBank,
    /// EMAs of the CVD close.
    cvd_ema: EmaBank,
    /// Heikin-Ashi mode, when enabled.
    heikin_ashi: Option<HeikinAshiState>,
    /// Buckets processed.
    bars_seen: usize,
}

fn with_periods(periods: &[u32], values: Vec<f64>) -> Vec<EmaValue> {
    periods
        .iter()
        .zip(values)
        .map(|(&period, value)| EmaValue { period, value })
        .collect()
}

impl IndicatorEngine {
    /// Create a new engine from configuration.
    pub fn new(config: &IndicatorConfig) -> Self {
        let periods = config.ema_periods.clone();
        let bank = EmaBank::new(&periods, config.ema_smoothing);

        let heikin_ashi = config.heikin_ashi.then(|| HeikinAshiState {
            price: HeikinAshi::new(),
            cvd: HeikinAshi::new(),
            adx: AdxEngine::new(config.adx_period),
            ema: bank.clone(),
            cvd_ema: bank.clone(),
        });

        Self {
            adx: AdxEngine::new(config.adx_period),
            ema: bank.clone(),
            cvd_ema: bank,
            heikin_ashi,
            periods,
            bars_seen: 0,
        }
    }

    /// Compute the record for the next bucket in chronological order.
    pub fn on_bucket(&mut self, bucket: &Bucket) -> BarRecord {
        self.bars_seen += 1;

        let di = self.adx.update(&bucket.price);
        let ema = self.ema.update(bucket.price.close);
        let cvd_ema = self.cvd_ema.update(bucket.cvd.close as f64);

        let heikin_ashi = self.heikin_ashi.as_mut().map(|ha| {
            let price = ha.price.next(&bucket.price);
            let cvd = ha.cvd.next(&bucket.cvd);
            HeikinAshiColumns {
                price,
                cvd,
                di: ha.adx.update(&price),
                ema: with_periods(&self.periods, ha.ema.update(price.close)),
                cvd_ema: with_periods(&self.periods, ha.cvd_ema.update(cvd.close)),
            }
        });

        BarRecord {
            bucket: bucket.clone(),
            di,
            ema: with_periods(&self.periods, ema),
            cvd_ema: with_periods(&self.periods, cvd_ema),
            heikin_ashi,
        }
    }

    /// Number of buckets processed.
    pub fn bars_seen(&self) -> usize {
        self.bars_seen
    }

    pub fn periods(&self) -> &[u32] {
        &self.periods
    }
}

/// Compute every indicator series over a whole run and assemble the table.
pub fn compute_table(config: &IndicatorConfig, buckets: &[Bucket]) -> Result<Vec<BarRecord>> {
    let periods = &config.ema_periods;
    let closes: Vec<f64> = buckets.iter().map(|b| b.price.close).collect();
    let cvd_closes: Vec<f64> = buckets.iter().map(|b| b.cvd.close as f64).collect();
    let price_bars: Vec<Ohlc> = buckets.iter().map(|b| b.price.ohlc()).collect();

    let heikin_ashi = config.heikin_ashi.then(|| {
        let price = HeikinAshi::transform(&price_bars);
        let cvd_bars: Vec<Ohlc> = buckets.iter().map(|b| b.cvd.ohlc()).collect();
        let cvd = HeikinAshi::transform(&cvd_bars);
        let ha_closes: Vec<f64> = price.iter().map(|b| b.close).collect();
        let ha_cvd_closes: Vec<f64> = cvd.iter().map(|b| b.close).collect();

        HeikinAshiSeries {
            di: adx_series(&price, config.adx_period),
            ema: EmaBank::series(periods, config.ema_smoothing, &ha_closes),
            cvd_ema: EmaBank::series(periods, config.ema_smoothing, &ha_cvd_closes),
            price,
            cvd,
        }
    });

    let series = IndicatorSeries {
        di: adx_series(&price_bars, config.adx_period),
        ema: EmaBank::series(periods, config.ema_smoothing, &closes),
        cvd_ema: EmaBank::series(periods, config.ema_smoothing, &cvd_closes),
        heikin_ashi,
    };

    assemble(periods, buckets, &series)
}
