//! Result stream
//!
//! One line per NEW, CHANGED or DELETED path, formatted `<kind>: <path>`.
//! Classifier threads and the reconciler share one sink; each line is
//! written under the lock so lines never interleave.

use crate::error::{Result, ScanError};
use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

/// Kinds of change that appear on the result stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    New,
    Changed,
    Deleted,
}

impl Change {
    pub fn label(self) -> &'static str {
        match self {
            Change::New => "new",
            Change::Changed => "changed",
            Change::Deleted => "deleted",
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Shared writer for the result stream
#[derive(Clone)]
pub struct ResultSink {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl ResultSink {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Result stream on stdout
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Write one `<kind>: <path>` line
    pub fn report(&self, change: Change, path: &str) -> Result<()> {
        let mut out = self.out.lock();
        writeln!(out, "{}: {}", change, path).map_err(ScanError::Output)
    }

    pub fn flush(&self) -> Result<()> {
        self.out.lock().flush().map_err(ScanError::Output)
    }
}

impl fmt::Debug for ResultSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSink").finish_non_exhaustive()
    }
}

/// In-memory result stream, for capturing output
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer(Arc<Mutex<Vec<u8>>>);

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink writing into this buffer
    pub fn sink(&self) -> ResultSink {
        ResultSink::new(self.clone())
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    /// Captured lines in sorted order
    ///
    /// Classifier threads report concurrently, so only the set of lines is
    /// deterministic.
    pub fn sorted_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.contents().lines().map(str::to_string).collect();
        lines.sort();
        lines
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_report_format() {
        let buffer = CaptureBuffer::new();
        let sink = buffer.sink();

        sink.report(Change::New, "a").unwrap();
        sink.report(Change::Changed, "dir/b").unwrap();
        sink.report(Change::Deleted, "c d").unwrap();

        assert_eq!(buffer.contents(), "new: a\nchanged: dir/b\ndeleted: c d\n");
    }

    #[test]
    fn test_concurrent_reports_do_not_interleave() {
        let buffer = CaptureBuffer::new();
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let sink = buffer.sink();
                thread::spawn(move || {
                    for i in 0..100 {
                        sink.report(Change::New, &format!("t{}/file{}", t, i)).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let lines = buffer.sorted_lines();
        assert_eq!(lines.len(), 400);
        assert!(lines.iter().all(|l| l.starts_with("new: t")));
    }
}
