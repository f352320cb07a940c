//! Output records: one row per bucket with every indicator column.

use flowbar_core::{Bucket, DirectionalIndex, Error, Ohlc, Result, TimestampNs};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// EMA reading for one period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmaValue {
    pub period: u32,
    pub value: f64,
}

/// Heikin-Ashi columns of one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeikinAshiColumns {
    pub price: Ohlc,
    pub cvd: Ohlc,
    pub di: DirectionalIndex,
    pub ema: Vec<EmaValue>,
    pub cvd_ema: Vec<EmaValue>,
}

/// One output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarRecord {
    pub bucket: Bucket,
    pub di: DirectionalIndex,
    pub ema: Vec<EmaValue>,
    pub cvd_ema: Vec<EmaValue>,
    pub heikin_ashi: Option<HeikinAshiColumns>,
}

/// A typed column value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnValue {
    Int(i64),
    Float(f64),
}

impl ColumnValue {
    /// JSON value; NaN and infinities become `null`.
    pub fn to_json(self) -> Value {
        match self {
            ColumnValue::Int(v) => Value::from(v),
            ColumnValue::Float(v) => serde_json::Number::from_f64(v)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            ColumnValue::Int(v) => v as f64,
            ColumnValue::Float(v) => v,
        }
    }
}

fn push_ohlc(cols: &mut Vec<(String, ColumnValue)>, prefix: &str, ohlc: &Ohlc) {
    for (name, v) in [
        ("open", ohlc.open),
        ("high", ohlc.high),
        ("low", ohlc.low),
        ("close", ohlc.close),
    ] {
        cols.push((format!("{prefix}{name}"), ColumnValue::Float(v)));
    }
}

fn push_di(cols: &mut Vec<(String, ColumnValue)>, prefix: &str, di: &DirectionalIndex) {
    cols.push((format!("{prefix}plus_di"), ColumnValue::Float(di.plus_di)));
    cols.push((format!("{prefix}minus_di"), ColumnValue::Float(di.minus_di)));
    cols.push((format!("{prefix}adx"), ColumnValue::Float(di.adx)));
}

fn push_ema(cols: &mut Vec<(String, ColumnValue)>, prefix: &str, emas: &[EmaValue]) {
    for e in emas {
        cols.push((format!("{prefix}{}", e.period), ColumnValue::Float(e.value)));
    }
}

impl BarRecord {
    pub fn timestamp(&self) -> TimestampNs {
        self.bucket.ts_bucket
    }

    /// EMA of the price close for `period`, if configured.
    pub fn ema(&self, period: u32) -> Option<f64> {
        self.ema.iter().find(|e| e.period == period).map(|e| e.value)
    }

    /// EMA of the CVD close for `period`, if configured.
    pub fn cvd_ema(&self, period: u32) -> Option<f64> {
        self.cvd_ema.iter().find(|e| e.period == period).map(|e| e.value)
    }

    /// Flat, ordered column list.
    pub fn columns(&self) -> Vec<(String, ColumnValue)> {
        let price = &self.bucket.price;
        let cvd = &self.bucket.cvd;

        let mut cols = vec![
            ("timestamp".to_string(), ColumnValue::Int(self.bucket.ts_bucket)),
            ("open".to_string(), ColumnValue::Float(price.open)),
            ("high".to_string(), ColumnValue::Float(price.high)),
            ("low".to_string(), ColumnValue::Float(price.low)),
            ("close".to_string(), ColumnValue::Float(price.close)),
            ("volume".to_string(), ColumnValue::Int(price.volume as i64)),
            ("delta".to_string(), ColumnValue::Int(price.delta)),
            ("trade_count".to_string(), ColumnValue::Int(price.trade_count as i64)),
            ("cvd_open".to_string(), ColumnValue::Int(cvd.open)),
            ("cvd_high".to_string(), ColumnValue::Int(cvd.high)),
            ("cvd_low".to_string(), ColumnValue::Int(cvd.low)),
            ("cvd_close".to_string(), ColumnValue::Int(cvd.close)),
        ];
        push_di(&mut cols, "", &self.di);
        push_ema(&mut cols, "ema_", &self.ema);
        push_ema(&mut cols, "cvd_ema_", &self.cvd_ema);

        if let Some(ha) = &self.heikin_ashi {
            push_ohlc(&mut cols, "ha_", &ha.price);
            push_ohlc(&mut cols, "ha_cvd_", &ha.cvd);
            push_di(&mut cols, "ha_", &ha.di);
            push_ema(&mut cols, "ha_ema_", &ha.ema);
            push_ema(&mut cols, "ha_cvd_ema_", &ha.cvd_ema);
        }
        cols
    }

    /// JSON object keyed by column name.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .columns()
            .into_iter()
            .map(|(name, v)| (name, v.to_json()))
            .collect();
        Value::Object(map)
    }
}

/// Heikin-Ashi series for a whole run.
#[derive(Debug, Clone, Default)]
pub struct HeikinAshiSeries {
    pub price: Vec<Ohlc>,
    pub cvd: Vec<Ohlc>,
    pub di: Vec<DirectionalIndex>,
    pub ema: Vec<Vec<f64>>,
    pub cvd_ema: Vec<Vec<f64>>,
}

/// Indicator series for a whole run, indexed by bucket position.
#[derive(Debug, Clone, Default)]
pub struct IndicatorSeries {
    pub di: Vec<DirectionalIndex>,
    pub ema: Vec<Vec<f64>>,
    pub cvd_ema: Vec<Vec<f64>>,
    pub heikin_ashi: Option<HeikinAshiSeries>,
}

fn check_len(series: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::LengthMismatch {
            series,
            expected,
            actual,
        })
    }
}

fn check_rows(series: &'static str, rows: &[Vec<f64>], buckets: usize, periods: usize) -> Result<()> {
    check_len(series, buckets, rows.len())?;
    rows.iter().try_for_each(|row| check_len(series, periods, row.len()))
}

fn zip_periods(periods: &[u32], values: &[f64]) -> Vec<EmaValue> {
    periods
        .iter()
        .zip(values)
        .map(|(&period, &value)| EmaValue { period, value })
        .collect()
}

/// Zip buckets and indicator series into records.
pub fn assemble(
    periods: &[u32],
    buckets: &[Bucket],
    series: &IndicatorSeries,
) -> Result<Vec<BarRecord>> {
    let n = buckets.len();
    check_len("di", n, series.di.len())?;
    check_rows("ema", &series.ema, n, periods.len())?;
    check_rows("cvd_ema", &series.cvd_ema, n, periods.len())?;
    if let Some(ha) = &series.heikin_ashi {
        check_len("ha_price", n, ha.price.len())?;
        check_len("ha_cvd", n, ha.cvd.len())?;
        check_len("ha_di", n, ha.di.len())?;
        check_rows("ha_ema", &ha.ema, n, periods.len())?;
        check_rows("ha_cvd_ema", &ha.cvd_ema, n, periods.len())?;
    }

    let records = buckets
        .iter()
        .enumerate()
        .map(|(i, bucket)| BarRecord {
            bucket: bucket.clone(),
            di: series.di[i],
            ema: zip_periods(periods, &series.ema[i]),
            cvd_ema: zip_periods(periods, &series.cvd_ema[i]),
            heikin_ashi: series.heikin_ashi.as_ref().map(|ha| HeikinAshiColumns {
                price: ha.price[i],
                cvd: ha.cvd[i],
                di: ha.di[i],
                ema: zip_periods(periods, &ha.ema[i]),
                cvd_ema: zip_periods(periods, &ha.cvd_ema[i]),
            }),
        })
        .collect();

    Ok(records)
}
