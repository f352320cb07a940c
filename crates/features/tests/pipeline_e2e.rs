//! End-to-end tests for the flowbar pipeline
//!
//! Runs raw trade records through every stage using only the public API.

use approx::assert_relative_eq;
use flowbar_core::config::{BucketSpec, CvdBarMode, OrderingPolicy};
use flowbar_core::{Config, Error, NANOS_PER_SEC};
use flowbar_features::{
    BarSink, EmaTrend, JsonLinesSink, MemorySink, Pipeline, TrendDirection, TrendStrength,
};
use flowbar_ingestion::{FeedRequest, JsonLinesFeed, MemoryFeed, RawTrade};
use std::io::Cursor;

const SEC: i64 = NANOS_PER_SEC;

/// A steady uptrend: one buy-heavy minute after another.
fn trending_session(minutes: i64) -> Vec<RawTrade> {
    let mut trades = Vec::new();
    for m in 0..minutes {
        let base = 6300.0 + m as f64 * 1.5;
        trades.push(RawTrade::new(m * 60 * SEC + 5 * SEC, base, 4, "B"));
        trades.push(RawTrade::new(m * 60 * SEC + 20 * SEC, base + 1.0, 2, "A"));
        trades.push(RawTrade::new(m * 60 * SEC + 40 * SEC, base - 0.5, 1, "N"));
        trades.push(RawTrade::new(m * 60 * SEC + 55 * SEC, base + 1.25, 6, "B"));
    }
    trades
}

#[test]
fn e2e_two_bucket_scenario() {
    let raw = vec![
        RawTrade::new(0, 100.0, 5, "B"),
        RawTrade::new(0, 100.0, 2, "A"),
        RawTrade::new(61 * SEC, 100.0, 3, "B"),
    ];
    let output = Pipeline::new(Config::default()).unwrap().process(&raw).unwrap();

    let bars: Vec<(i64, i64, i64)> = output
        .records
        .iter()
        .map(|r| (r.timestamp(), r.bucket.price.delta, r.bucket.cvd.close))
        .collect();
    assert_eq!(bars, vec![(0, 3, 3), (60 * SEC, 3, 6)]);
}

#[test]
fn e2e_neutral_trade() {
    let raw = vec![RawTrade::new(0, 100.0, 10, "N")];
    let output = Pipeline::new(Config::default()).unwrap().process(&raw).unwrap();

    let bucket = &output.records[0].bucket;
    assert_eq!(bucket.price.delta, 0);
    assert_eq!(bucket.price.volume, 10);
    assert_eq!(bucket.cvd.close, 0);
    assert_eq!(output.summary.classification.neutral_trades, 1);
    assert_eq!(output.summary.classification.misses(), 1);
}

#[test]
fn e2e_unknown_side_is_a_miss() {
    let raw = vec![RawTrade::new(0, 100.0, 4, "B"), RawTrade::new(1, 100.0, 9, "Z")];
    let output = Pipeline::new(Config::default()).unwrap().process(&raw).unwrap();

    assert_eq!(output.records[0].bucket.cvd.close, 4);
    assert_eq!(output.summary.classification.unknown_trades, 1);
    assert_eq!(output.summary.total_volume, 13);
}

#[test]
fn e2e_flat_bars_do_not_panic() {
    let raw = vec![
        RawTrade::new(0, 100.0, 1, "B"),
        RawTrade::new(60 * SEC, 100.0, 1, "A"),
    ];
    let output = Pipeline::new(Config::default()).unwrap().process(&raw).unwrap();

    for r in &output.records {
        assert!(r.di.plus_di.is_nan());
        assert!(r.di.minus_di.is_nan());
        assert!(r.di.adx.is_nan());
    }
    assert_eq!(output.summary.trend.unwrap().strength, None);
}

#[test]
fn e2e_empty_input() {
    let output = Pipeline::new(Config::default()).unwrap().process(&[]).unwrap();
    assert!(output.records.is_empty());
    assert_eq!(output.summary.trades, 0);
    assert_eq!(output.summary.bars, 0);
    assert!(output.summary.trend.is_none());
}

#[test]
fn e2e_uptrend_reading() {
    let output = Pipeline::new(Config::default())
        .unwrap()
        .process(&trending_session(60))
        .unwrap();

    let trend = output.summary.trend.unwrap();
    assert_eq!(trend.direction, TrendDirection::Bullish);
    assert_eq!(trend.strength, Some(TrendStrength::VeryStrong));
    assert!(trend.adx <= 100.0 + 1e-9);
    assert_eq!(output.summary.net_delta, 60 * 8);
}

#[test]
fn e2e_heikin_ashi_columns() {
    let mut config = Config::default();
    config.indicators.heikin_ashi = true;
    config.indicators.ema_periods = vec![8, 21];
    let output = Pipeline::new(config).unwrap().process(&trending_session(30)).unwrap();

    let first = &output.records[0];
    let ha = first.heikin_ashi.as_ref().unwrap();
    let price = &first.bucket.price;
    assert_relative_eq!(ha.price.open, (price.open + price.close) / 2.0);
    assert_relative_eq!(
        ha.price.close,
        (price.open + price.high + price.low + price.close) / 4.0
    );

    let names: Vec<String> = first.columns().into_iter().map(|(n, _)| n).collect();
    for name in ["ha_open", "ha_cvd_close", "ha_adx", "ha_ema_21", "ha_cvd_ema_8"] {
        assert!(names.iter().any(|n| n == name), "missing column {name}");
    }
}

#[test]
fn e2e_heikin_ashi_trend_reading() {
    let mut config = Config::default();
    config.indicators.heikin_ashi = true;
    let output = Pipeline::new(config).unwrap().process(&trending_session(30)).unwrap();

    let ha = output.summary.ha_trend.unwrap();
    assert_eq!(ha.direction, TrendDirection::Bullish);
    assert_eq!(ha.strength, Some(TrendStrength::VeryStrong));
    assert_eq!(ha.ema_trend, Some(EmaTrend::StrongUptrend));

    let plain = Pipeline::new(Config::default())
        .unwrap()
        .process(&trending_session(30))
        .unwrap();
    assert!(plain.summary.ha_trend.is_none());
}

#[test]
fn e2e_delta_overflow_is_an_error() {
    let size = i64::MAX;
    let raw = vec![RawTrade::new(0, 100.0, size, "B"), RawTrade::new(1, 100.0, size, "B")];
    let err = Pipeline::new(Config::default()).unwrap().process(&raw).unwrap_err();
    assert!(matches!(err, Error::Data(ref msg) if msg.contains("record 1")));
}

#[test]
fn e2e_bar_cumulative_mode() {
    let mut config = Config::default();
    config.bars.cvd_mode = CvdBarMode::BarCumulative;
    let output = Pipeline::new(config).unwrap().process(&trending_session(5)).unwrap();

    let mut prev_close = 0;
    for r in &output.records {
        assert_eq!(r.bucket.cvd.open, prev_close);
        assert_eq!(r.bucket.cvd.close, prev_close + r.bucket.price.delta);
        prev_close = r.bucket.cvd.close;
    }
    assert!(output.summary.cvd_continuous);
}

#[test]
fn e2e_tick_bars() {
    let mut config = Config::default();
    config.bars.bucket = BucketSpec::Ticks { trades_per_bar: 3 };
    let output = Pipeline::new(config).unwrap().process(&trending_session(3)).unwrap();

    let counts: Vec<u32> = output.records.iter().map(|r| r.bucket.price.trade_count).collect();
    assert_eq!(counts, vec![3, 3, 3, 3]);
}

#[test]
fn e2e_ordering_policies() {
    let raw = vec![
        RawTrade::new(30 * SEC, 101.0, 1, "B"),
        RawTrade::new(10 * SEC, 100.0, 2, "A"),
        RawTrade::new(70 * SEC, 102.0, 3, "B"),
    ];

    let mut strict = Config::default();
    strict.ingestion.ordering = OrderingPolicy::Strict;
    let err = Pipeline::new(strict).unwrap().process(&raw).unwrap_err();
    assert!(matches!(err, Error::Ordering { index: 1, .. }));

    let output = Pipeline::new(Config::default()).unwrap().process(&raw).unwrap();
    let first = &output.records[0].bucket.price;
    assert_eq!(first.open, 100.0);
    assert_eq!(first.close, 101.0);
    assert_eq!(output.records[0].bucket.cvd.open, -2);
}

#[test]
fn e2e_feed_to_sink() {
    let lines: String = trending_session(10)
        .iter()
        .map(|r| serde_json::to_string(r).unwrap() + "\n")
        .collect();
    let mut feed = JsonLinesFeed::new(Cursor::new(lines));
    let mut sink = JsonLinesSink::new(Vec::new());
    let request = FeedRequest::new("ES.c.0", "trades", 0, 5 * 60 * SEC);

    let summary = Pipeline::new(Config::default())
        .unwrap()
        .run(&mut feed, &request, &mut sink)
        .unwrap();

    assert_eq!(summary.bars, 5);
    assert_eq!(sink.written(), 5);
    let out = String::from_utf8(sink.into_inner()).unwrap();
    let last: serde_json::Value = serde_json::from_str(out.lines().last().unwrap()).unwrap();
    assert_eq!(last["timestamp"], serde_json::Value::from(4 * 60 * SEC));
    assert_eq!(last["cvd_close"], serde_json::Value::from(5 * 8));
}

#[test]
fn e2e_memory_feed_and_sink_trait_objects() {
    let mut feed = MemoryFeed::new("ES.c.0", trending_session(3));
    let mut sink = MemorySink::new();
    let request = FeedRequest::new("ES.c.0", "trades", 0, i64::MAX);
    let pipeline = Pipeline::new(Config::default()).unwrap();

    let sink_dyn: &mut dyn BarSink = &mut sink;
    pipeline.run(&mut feed, &request, sink_dyn).unwrap();
    assert_eq!(sink.records().len(), 3);
}
