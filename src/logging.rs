//! JSON-lines training log.
//!
//! Each record is one line of the form `{"event": "...", "data": {...}}`, so a
//! log can be tailed while training runs and parsed line by line afterwards.
//!
//! Logging never fails a training run: a write error is reported once on
//! stderr and later records are dropped.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::Result;

#[derive(Serialize)]
struct Record<'a, T> {
    event: &'a str,
    data: &'a T,
}

/// Sink for training events.
pub struct TrainingLog {
    sink: Box<dyn Write + Send>,
    failed: bool,
}

impl TrainingLog {
    pub fn stderr() -> Self {
        Self::to_writer(io::stderr())
    }

    /// Log to any writer.
    pub fn to_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            sink: Box::new(writer),
            failed: false,
        }
    }

    /// Create (or truncate) `path` and log to it.
    pub fn to_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::to_writer(BufWriter::new(file)))
    }

    /// Append one event.
    pub fn record<T: Serialize>(&mut self, event: &str, data: &T) {
        if self.failed {
            return;
        }
        let result = serde_json::to_writer(&mut self.sink, &Record { event, data })
            .map_err(io::Error::from)
            .and_then(|()| self.sink.write_all(b"\n"));
        if let Err(err) = result {
            self.fail(&err);
        }
    }

    pub fn flush(&mut self) {
        if self.failed {
            return;
        }
        if let Err(err) = self.sink.flush() {
            self.fail(&err);
        }
    }

    /// True once a write has failed.
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    fn fail(&mut self, err: &io::Error) {
        eprintln!("training log disabled after write error: {err}");
        self.failed = true;
    }
}

impl fmt::Debug for TrainingLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainingLog")
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

impl Drop for TrainingLog {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("disk full"))
        }
    }

    #[test]
    fn records_are_json_lines() {
        let buf = SharedBuf::default();
        let mut log = TrainingLog::to_writer(buf.clone());
        log.record("epoch", &serde_json::json!({ "epoch": 1, "loss": 0.5 }));
        log.record("fit", &serde_json::json!({ "epochs": 1 }));

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "epoch");
        assert_eq!(first["data"]["loss"], 0.5);
    }

    #[test]
    fn write_errors_disable_the_log() {
        let mut log = TrainingLog::to_writer(Broken);
        log.record("epoch", &1_u32);
        assert!(log.has_failed());
        // Further records are ignored rather than retried.
        log.record("epoch", &2_u32);
        assert!(log.has_failed());
    }
}
