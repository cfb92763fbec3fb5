#![forbid(unsafe_code)]

//! JSONL evidence sink for binding diagnostics.
//!
//! Every diagnostic recorded by [`Diagnostics`](crate::diagnostics::Diagnostics)
//! can be mirrored to a line-oriented sink so tooling can consume binding
//! failures without scraping log output. Lines appear in record order; flush
//! behavior is explicit and configurable.
//!
//! # Failure Modes
//!
//! - **Unwritable destination**: [`EvidenceSink::from_config`] returns the
//!   I/O error; the engine then runs without a sink.
//! - **Write failure mid-run**: reported to the caller of
//!   [`EvidenceSink::write_record`]; diagnostics log it and carry on.

use std::cell::RefCell;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::rc::Rc;

use serde::Serialize;

/// Destination for evidence JSONL output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvidenceSinkDestination {
    Stdout,
    /// Append to a file at the given path.
    File(PathBuf),
}

impl EvidenceSinkDestination {
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }
}

/// Configuration for evidence logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceSinkConfig {
    pub enabled: bool,
    pub destination: EvidenceSinkDestination,
    /// Flush after every line.
    pub flush_on_write: bool,
}

impl Default for EvidenceSinkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            destination: EvidenceSinkDestination::Stdout,
            flush_on_write: true,
        }
    }
}

impl EvidenceSinkConfig {
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Append to a file with flush-on-write.
    #[must_use]
    pub fn enabled_file(path: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            destination: EvidenceSinkDestination::file(path),
            flush_on_write: true,
        }
    }

    /// Write to stdout.
    #[must_use]
    pub fn enabled_stdout() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Flush after every record.
    #[must_use]
    pub fn with_flush_on_write(mut self, enabled: bool) -> Self {
        self.flush_on_write = enabled;
        self
    }
}

struct SinkState {
    writer: BufWriter<Box<dyn Write>>,
    flush_on_write: bool,
    lines: u64,
}

/// Shared JSONL sink. Clones write to the same destination.
#[derive(Clone)]
pub struct EvidenceSink {
    state: Rc<RefCell<SinkState>>,
}

impl std::fmt::Debug for EvidenceSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvidenceSink")
            .field("lines", &self.state.borrow().lines)
            .finish()
    }
}

impl EvidenceSink {
    /// Build a sink from config. `Ok(None)` when disabled.
    pub fn from_config(config: &EvidenceSinkConfig) -> io::Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        let writer: Box<dyn Write> = match &config.destination {
            EvidenceSinkDestination::Stdout => Box::new(io::stdout()),
            EvidenceSinkDestination::File(path) => Box::new(OpenOptions::new().create(true).append(true).open(path)?),
        };
        Ok(Some(Self::from_writer(writer, config.flush_on_write)))
    }

    /// Wrap an arbitrary writer.
    #[must_use]
    pub fn from_writer(writer: Box<dyn Write>, flush_on_write: bool) -> Self {
        Self {
            state: Rc::new(RefCell::new(SinkState {
                writer: BufWriter::new(writer),
                flush_on_write,
                lines: 0,
            })),
        }
    }

    /// Serialize `record` as one JSON line.
    pub fn write_record<T: Serialize>(&self, record: &T) -> io::Result<()> {
        let line = serde_json::to_string(record).map_err(io::Error::other)?;
        let mut state = self.state.borrow_mut();
        state.writer.write_all(line.as_bytes())?;
        state.writer.write_all(b"\n")?;
        state.lines += 1;
        if state.flush_on_write {
            state.writer.flush()?;
        }
        Ok(())
    }

    /// Number of lines written so far.
    #[must_use]
    pub fn lines_written(&self) -> u64 {
        self.state.borrow().lines
    }

    pub fn flush(&self) -> io::Result<()> {
        self.state.borrow_mut().writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[derive(Serialize)]
    struct Sample<'a> {
        kind: &'a str,
        n: u32,
    }

    #[test]
    fn disabled_config_builds_nothing() {
        assert!(EvidenceSink::from_config(&EvidenceSinkConfig::disabled()).unwrap().is_none());
    }

    #[test]
    fn file_sink_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evidence.jsonl");
        let sink = EvidenceSink::from_config(&EvidenceSinkConfig::enabled_file(&path))
            .unwrap()
            .unwrap();
        sink.write_record(&Sample { kind: "a", n: 1 }).unwrap();
        sink.clone().write_record(&Sample { kind: "b", n: 2 }).unwrap();
        assert_eq!(sink.lines_written(), 2);

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![r#"{"kind":"a","n":1}"#, r#"{"kind":"b","n":2}"#]);
    }

    #[test]
    fn buffered_sink_flushes_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buffered.jsonl");
        let config = EvidenceSinkConfig::enabled_file(&path).with_flush_on_write(false);
        let sink = EvidenceSink::from_config(&config).unwrap().unwrap();
        sink.write_record(&Sample { kind: "x", n: 0 }).unwrap();
        sink.flush().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);
    }
}
