use std::io::Write;

use crate::{Report, StabilizedState, Y2mError};

/// Receives the reports emitted by the stabilizer.
pub trait ReportSink {
    /// Handle one report.
    fn report(&mut self, report: &Report) -> Result<(), Y2mError>;
}

/// Prints reports as status lines and mirrors them to the log.
pub struct LogSink<W> {
    writer: W,
}

impl<W: Write> LogSink<W> {
    /// Create a new sink writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Give back the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReportSink for LogSink<W> {
    fn report(&mut self, report: &Report) -> Result<(), Y2mError> {
        match report.state() {
            StabilizedState::Drowsy => tracing::warn!(frame = report.frame(), "drowsy"),
            state => tracing::info!(frame = report.frame(), %state),
        }
        writeln!(self.writer, "{report}")?;
        Ok(())
    }
}

/// Writes reports as JSON lines.
pub struct JsonSink<W> {
    writer: W,
}

impl<W: Write> JsonSink<W> {
    /// Create a new sink writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Give back the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReportSink for JsonSink<W> {
    fn report(&mut self, report: &Report) -> Result<(), Y2mError> {
        serde_json::to_writer(&mut self.writer, report)?;
        writeln!(self.writer)?;
        Ok(())
    }
}
