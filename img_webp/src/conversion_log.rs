//! Conversion Log Module
//!
//! Writes the per-batch `conversion.log` and reads it back into a named
//! record for the gallery index.
//!
//! Layout:
//!
//! ```text
//! a.png -> a.webp: 100.00 KB -> 40.00 KB | Quality: 80 | Lossless: false
//! b.jpg -> b.webp: 50.00 KB -> 20.00 KB | Quality: 80 | Lossless: false
//! Total filesize saved: 60.00%
//! Total time: 0.42 seconds
//! ```
//!
//! Entry lines appear in completion order; the two summary lines are always
//! last and only present once the whole batch succeeded.

use crate::conversion_api::{BatchSummary, ConversionResult};
use crate::{Result, WebpError};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::trace;

pub const LOG_FILE_NAME: &str = "conversion.log";

const ENTRY_ARROW: &str = " -> ";
const QUALITY_LABEL: &str = " | Quality: ";
const LOSSLESS_LABEL: &str = " | Lossless: ";
const SAVED_LABEL: &str = "Total filesize saved: ";
const TIME_LABEL: &str = "Total time: ";
const TIME_UNIT: &str = " seconds";

// ═══════════════════════════════════════════════════════════════
// Writer
// ═══════════════════════════════════════════════════════════════

/// Append-only log of one batch.
///
/// Each append opens the file, writes one complete line (or the complete
/// summary block) in a single `write_all`, and closes it again. Appends from
/// the worker threads of a batch are serialized by an internal lock.
#[derive(Debug)]
pub struct ConversionLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ConversionLog {
    /// Start a fresh log in `output_dir`, discarding one left by an earlier run.
    pub fn create(output_dir: &Path) -> Result<Self> {
        let path = output_dir.join(LOG_FILE_NAME);
        fs::File::create(&path).map_err(|e| WebpError::file_system(&path, e))?;
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append_entry(&self, result: &ConversionResult, quality: u8, lossless: bool) -> Result<()> {
        self.append(&format_entry(result, quality, lossless))
    }

    pub fn append_summary(&self, summary: &BatchSummary) -> Result<()> {
        self.append(&format_summary(summary))
    }

    fn append(&self, text: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| WebpError::file_system(&self.path, e))?;
        file.write_all(text.as_bytes())
            .map_err(|e| WebpError::file_system(&self.path, e))
    }
}

pub fn format_entry(result: &ConversionResult, quality: u8, lossless: bool) -> String {
    format!(
        "{}{}{}: {}{}{}{}{}{}{}\n",
        result.original_name,
        ENTRY_ARROW,
        result.converted_name,
        result.original_size.kb_display(),
        ENTRY_ARROW,
        result.converted_size.kb_display(),
        QUALITY_LABEL,
        quality,
        LOSSLESS_LABEL,
        lossless
    )
}

pub fn format_summary(summary: &BatchSummary) -> String {
    format!(
        "{}{:.2}%\n{}{:.2}{}\n",
        SAVED_LABEL, summary.percent_saved, TIME_LABEL, summary.elapsed_secs, TIME_UNIT
    )
}

// ═══════════════════════════════════════════════════════════════
// Reader
// ═══════════════════════════════════════════════════════════════

/// One per-file line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub original_name: String,
    pub converted_name: String,
    pub original_size: String,
    pub converted_size: String,
    pub quality: u8,
    pub lossless: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogSummary {
    pub percent_saved: f64,
    pub elapsed_secs: f64,
}

/// Parsed `conversion.log`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConversionLogRecord {
    pub entries: Vec<LogEntry>,
    /// `None` while the batch is running or after it failed.
    pub summary: Option<LogSummary>,
}

impl ConversionLogRecord {
    pub fn read(path: &Path) -> std::io::Result<Self> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    /// Classify lines by shape rather than position. Unrecognized lines are
    /// ignored; when several summary blocks are present the last one wins.
    pub fn parse(text: &str) -> Self {
        let mut record = Self::default();
        let mut saved: Option<f64> = None;

        for line in text.lines().map(str::trim_end).filter(|l| !l.is_empty()) {
            if let Some(value) = line.strip_prefix(SAVED_LABEL) {
                saved = value.trim_end_matches('%').trim().parse().ok();
            } else if let Some(value) = line.strip_prefix(TIME_LABEL) {
                let elapsed = value.trim_end_matches(TIME_UNIT).trim().parse().ok();
                if let (Some(percent_saved), Some(elapsed_secs)) = (saved.take(), elapsed) {
                    record.summary = Some(LogSummary {
                        percent_saved,
                        elapsed_secs,
                    });
                }
            } else if let Some(entry) = parse_entry(line) {
                record.entries.push(entry);
            } else {
                trace!(line, "Ignoring unrecognized log line");
            }
        }

        record
    }

    pub fn quality(&self) -> Option<u8> {
        self.entries.first().map(|e| e.quality)
    }

    pub fn lossless(&self) -> Option<bool> {
        self.entries.first().map(|e| e.lossless)
    }

    pub fn is_complete(&self) -> bool {
        self.summary.is_some()
    }
}

/// Parsed right-to-left so file names may contain the separators.
fn parse_entry(line: &str) -> Option<LogEntry> {
    let (rest, lossless) = line.rsplit_once(LOSSLESS_LABEL)?;
    let (rest, quality) = rest.rsplit_once(QUALITY_LABEL)?;
    let (names, sizes) = rest.rsplit_once(": ")?;
    let (original_name, converted_name) = names.rsplit_once(ENTRY_ARROW)?;
    let (original_size, converted_size) = sizes.split_once(ENTRY_ARROW)?;

    Some(LogEntry {
        original_name: original_name.to_string(),
        converted_name: converted_name.to_string(),
        original_size: original_size.to_string(),
        converted_size: converted_size.to_string(),
        quality: quality.trim().parse().ok()?,
        lossless: lossless.trim().parse().ok()?,
    })
}
