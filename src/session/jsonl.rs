//! JSON Lines report writer.

use std::io::Write;

use tracing::debug;

use super::{encode_line, ReportSink, TrackerReport};
use crate::error::Result;

/// Writes each report as one JSON line and flushes.
#[derive(Debug)]
pub struct JsonlSink<W: Write> {
    writer: W,
    written: u64,
}

impl<W: Write> JsonlSink<W> {
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Number of reports written.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReportSink for JsonlSink<W> {
    fn publish(&mut self, report: &TrackerReport) -> Result<()> {
        let line = encode_line(report)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;
        self.written += 1;
        debug!("Wrote report #{} for sensor {}", self.written, report.sensor);
        Ok(())
    }
}
