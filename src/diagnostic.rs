//! Append-only diagnostic log
//!
//! Each event is one line, `[YYYY-MM-DD HH:MM:SS] <message>`, stamped with the local
//! time. The file is opened in append mode for every entry so several processes can
//! share it.

use std::{
    fs::OpenOptions,
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local, TimeZone};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Writes diagnostic lines to a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticLog {
    path: PathBuf,
}

impl DiagnosticLog {
    /// Creates a log appending to the given file
    pub fn new<P: AsRef<Path>>(path: P) -> DiagnosticLog {
        DiagnosticLog {
            path: PathBuf::from(path.as_ref()),
        }
    }

    /// The file lines are appended to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line stamped with the current time
    pub fn append(&self, message: &str) -> io::Result<()> {
        let line = format_line(&Local::now(), message);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?
            .write_all(line.as_bytes())
    }

    /// Like [`DiagnosticLog::append`], a failure to write only shows up in the trace
    pub fn record(&self, message: &str) {
        if let Err(err) = self.append(message) {
            tracing::warn!(path = %self.path.display(), "could not write diagnostic log: {err}");
        }
    }
}

/// Formats one log line, newline included
///
/// Line breaks inside `message` are folded so an entry never spans several lines.
pub fn format_line<Tz: TimeZone>(at: &DateTime<Tz>, message: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let message = message.replace("\r\n", " | ").replace(['\r', '\n'], " | ");
    format!("[{}] {message}\n", at.format(TIMESTAMP_FORMAT))
}
