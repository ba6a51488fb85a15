//! Destinations for output statements.

use parking_lot::Mutex;
use std::io::Write;

/// Receives one rendered line per executed output statement.
pub trait OutputSink: Send + Sync {
    fn emit(&self, line: &str);
}

/// Writes lines to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn emit(&self, line: &str) {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        if let Err(e) = writeln!(handle, "{}", line) {
            tracing::warn!("failed to write output line: {}", e);
        }
    }
}

/// Collects lines in memory.
#[derive(Debug, Default)]
pub struct CaptureSink {
    lines: Mutex<Vec<String>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines emitted so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl OutputSink for CaptureSink {
    fn emit(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}
