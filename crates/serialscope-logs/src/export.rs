use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};

use serialscope_types::{ErrorRecord, LogLine};

/// Timestamp layout used in exported files
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("line {line}: missing timestamp separator")]
    MissingSeparator { line: usize },

    #[error("line {line}: invalid timestamp {value:?}")]
    Timestamp { line: usize, value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One entry read back from an export
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportedLine {
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Render lines as `timestamp text`, one per line
pub fn export_lines(lines: &[Arc<LogLine>]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(&format_timestamp(&line.timestamp));
        out.push(' ');
        out.push_str(&line.text);
        out.push('\n');
    }
    out
}

/// Render an error log, stamped with each source line's arrival time
pub fn export_errors<F>(records: &[ErrorRecord], source: F) -> String
where
    F: Fn(u64) -> Option<Arc<LogLine>>,
{
    let mut out = String::new();
    for record in records {
        let ts = source(record.source_sequence)
            .map(|l| format_timestamp(&l.timestamp))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!("{} [{}] {}\n", ts, record.category.as_str(), record.text));
    }
    out
}

/// Write lines to `path` in the export format, returning the count
pub fn write_export(path: &Path, lines: &[Arc<LogLine>]) -> Result<usize, ExportError> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(export_lines(lines).as_bytes())?;
    writer.flush()?;
    Ok(lines.len())
}

/// Read an export back into ordered entries
pub fn parse_export(content: &str) -> Result<Vec<ExportedLine>, ExportError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.is_empty())
        .map(|(idx, l)| {
            let line = idx + 1;
            let (ts, text) = l
                .split_once(' ')
                .ok_or(ExportError::MissingSeparator { line })?;
            let naive = NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT).map_err(|_| {
                ExportError::Timestamp {
                    line,
                    value: ts.to_string(),
                }
            })?;
            Ok(ExportedLine {
                timestamp: naive.and_utc(),
                text: text.to_string(),
            })
        })
        .collect()
}
