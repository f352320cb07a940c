//! Trade feed providers.

use crate::raw::RawTrade;
use flowbar_core::{Error, Result, TimestampNs};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

/// What to fetch from a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRequest {
    /// Instrument symbol, e.g. `ES.c.0`.
    pub symbol: String,
    /// Feed schema, e.g. `trades`.
    pub schema: String,
    /// Inclusive start.
    pub start_ns: TimestampNs,
    /// Exclusive end.
    pub end_ns: TimestampNs,
}

impl FeedRequest {
    pub fn new(
        symbol: impl Into<String>,
        schema: impl Into<String>,
        start_ns: TimestampNs,
        end_ns: TimestampNs,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            schema: schema.into(),
            start_ns,
            end_ns,
        }
    }

    /// Whether a timestamp falls inside `[start_ns, end_ns)`.
    #[inline]
    pub fn contains(&self, ts_ns: TimestampNs) -> bool {
        ts_ns >= self.start_ns && ts_ns < self.end_ns
    }
}

/// Source of raw trade records.
pub trait TradeFeed {
    fn fetch(&mut self, request: &FeedRequest) -> Result<Vec<RawTrade>>;
}

/// Keep records inside the request window. Records whose timestamp can't
/// be read are kept so validation reports them.
fn in_window(request: &FeedRequest, raw: &RawTrade) -> bool {
    raw.ts_ns().map(|ts| request.contains(ts)).unwrap_or(true)
}

/// In-memory feed for one symbol.
#[derive(Debug, Clone)]
pub struct MemoryFeed {
    symbol: String,
    records: Vec<RawTrade>,
}

impl MemoryFeed {
    pub fn new(symbol: impl Into<String>, records: Vec<RawTrade>) -> Self {
        Self {
            symbol: symbol.into(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl TradeFeed for MemoryFeed {
    fn fetch(&mut self, request: &FeedRequest) -> Result<Vec<RawTrade>> {
        if request.symbol != self.symbol {
            return Err(Error::feed(format!(
                "unknown symbol {:?} (feed serves {:?})",
                request.symbol, self.symbol
            )));
        }

        let records: Vec<RawTrade> = self
            .records
            .iter()
            .filter(|raw| in_window(request, raw))
            .cloned()
            .collect();

        debug!(
            symbol = %request.symbol,
            fetched = records.len(),
            available = self.records.len(),
            "memory feed fetch"
        );
        Ok(records)
    }
}

/// Feed reading one JSON trade record per line.
pub struct JsonLinesFeed<R> {
    reader: R,
}

impl<R: BufRead> JsonLinesFeed<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl JsonLinesFeed<BufReader<File>> {
    /// Open a JSON-lines file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> TradeFeed for JsonLinesFeed<R> {
    fn fetch(&mut self, request: &FeedRequest) -> Result<Vec<RawTrade>> {
        let mut records = Vec::new();
        let mut line = String::new();
        let mut line_no = 0usize;

        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                break;
            }
            line_no += 1;
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            let raw: RawTrade = serde_json::from_str(text)
                .map_err(|e| Error::feed(format!("line {line_no}: {e}")))?;
            if in_window(request, &raw) {
                records.push(raw);
            }
        }

        info!(
            symbol = %request.symbol,
            lines = line_no,
            fetched = records.len(),
            "json-lines feed read"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn make_request(start_ns: i64, end_ns: i64) -> FeedRequest {
        FeedRequest::new("ES.c.0", "trades", start_ns, end_ns)
    }

    #[test]
    fn test_memory_feed_window() {
        let mut feed = MemoryFeed::new(
            "ES.c.0",
            vec![
                RawTrade::new(5, 1.0, 1, "B"),
                RawTrade::new(10, 1.0, 1, "B"),
                RawTrade::new(19, 1.0, 1, "A"),
                RawTrade::new(20, 1.0, 1, "A"),
            ],
        );
        let records = feed.fetch(&make_request(10, 20)).unwrap();
        let ts: Vec<i64> = records.iter().map(|r| r.ts_ns().unwrap()).collect();
        assert_eq!(ts, vec![10, 19]);
    }

    #[test]
    fn test_memory_feed_unknown_symbol() {
        let mut feed = MemoryFeed::new("ES.c.0", vec![]);
        let request = FeedRequest::new("NQ.c.0", "trades", 0, 1);
        assert!(matches!(feed.fetch(&request), Err(Error::Feed(_))));
    }

    #[test]
    fn test_json_lines_feed() {
        let input = concat!(
            r#"{"ts_event": 1, "price": 6300.25, "size": 2, "side": "B"}"#,
            "\n\n",
            r#"{"ts_event": "2025-07-14T13:30:00Z", "price": 6300.5, "size": 1, "side": "A"}"#,
            "\n",
        );
        let mut feed = JsonLinesFeed::new(Cursor::new(input));
        let records = feed.fetch(&make_request(0, i64::MAX)).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].size, Some(2));
        assert_eq!(records[1].side.as_deref(), Some("A"));
    }

    #[test]
    fn test_json_lines_feed_bad_line() {
        let mut feed = JsonLinesFeed::new(Cursor::new("{not json}\n"));
        let err = feed.fetch(&make_request(0, 10)).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_json_lines_file() {
        let path = std::env::temp_dir().join(format!("flowbar-feed-{}.jsonl", std::process::id()));
        std::fs::write(
            &path,
            concat!(
                r#"{"ts_event": 3, "price": 10.0, "size": 1, "side": "B"}"#,
                "\n",
                r#"{"ts_event": 30, "price": 10.5, "size": 2, "side": "A"}"#,
                "\n",
            ),
        )
        .unwrap();
        let mut feed = JsonLinesFeed::open(&path).unwrap();
        let records = feed.fetch(&make_request(0, 10)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ts_ns().unwrap(), 3);
        assert!(JsonLinesFeed::open(&path).is_err());
    }
}
