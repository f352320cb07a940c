//! Bar record sinks.

use crate::table::BarRecord;
use flowbar_core::{Error, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Destination for finished records.
pub trait BarSink {
    fn write(&mut self, records: &[BarRecord]) -> Result<()>;
}

/// Collects records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<BarRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[BarRecord] {
        &self.records
    }
}

impl BarSink for MemorySink {
    fn write(&mut self, records: &[BarRecord]) -> Result<()> {
        self.records.extend_from_slice(records);
        Ok(())
    }
}

/// Writes one JSON object per record per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesSink<BufWriter<File>> {
    /// Create (or truncate) a JSON-lines file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> BarSink for JsonLinesSink<W> {
    fn write(&mut self, records: &[BarRecord]) -> Result<()> {
        for record in records {
            serde_json::to_writer(&mut self.writer, &record.to_json())
                .map_err(|e| Error::sink(format!("record {}: {e}", self.written)))?;
            self.writer
                .write_all(b"\n")
                .map_err(|e| Error::sink(format!("record {}: {e}", self.written)))?;
            self.written += 1;
        }
        self.writer
            .flush()
            .map_err(|e| Error::sink(format!("flush failed after {} records: {e}", self.written)))?;
        debug!(records = records.len(), total = self.written, "json-lines sink flushed");
        Ok(())
    }
}
