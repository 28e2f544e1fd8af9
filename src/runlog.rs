//! JSON Lines run log written by `html2md --log-file`.
//!
//! One object per processed URL:
//!
//! ```json
//! {"ts":"2026-01-02T03:04:05Z","input":"https://example.com","output":"out/example.com.md","status":"ok","reason":null}
//! ```
//!
//! The file is opened in append mode so successive runs accumulate, and is
//! the input format of [`crate::log_export`].

use crate::error::Html2MdError;
use crate::output::ConversionOutput;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Ok,
    Blocked,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub ts: String,
    pub input: String,
    pub output: Option<String>,
    pub status: RunStatus,
    pub reason: Option<String>,
}

impl RunRecord {
    /// Record for `input` stamped with the current UTC time.
    pub fn from_result(input: &str, result: &Result<ConversionOutput, Html2MdError>) -> Self {
        let ts = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        match result {
            Ok(out) => Self {
                ts,
                input: input.to_string(),
                output: Some(out.output_label()),
                status: RunStatus::Ok,
                reason: None,
            },
            Err(e) => Self {
                ts,
                input: input.to_string(),
                output: None,
                status: if e.is_blocked() {
                    RunStatus::Blocked
                } else {
                    RunStatus::Error
                },
                reason: Some(e.to_string()),
            },
        }
    }
}

/// Append-only JSON Lines writer.
pub struct RunLog {
    writer: BufWriter<File>,
}

impl RunLog {
    /// Open (or create) `path` for appending. Parent directories are created.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Write one record and flush it, so a crash loses at most the record
    /// in flight.
    pub fn append(&mut self, record: &RunRecord) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}
