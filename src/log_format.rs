//! Parsing and rendering of the `time,status` entity log format

use crate::errors::{CollectorError, Result};
use crate::status::{Status, StatusEntry};
use chrono::{DateTime, Utc};
use std::path::Path;

pub const HEADER: &str = "time,status";

/// Parse the content of an entity log.
///
/// `path` is only used for error context. A zero-byte file is an empty log;
/// otherwise the first non-blank line must be the header.
pub fn parse_log(path: &Path, content: &str) -> Result<Vec<StatusEntry>> {
    let mut entries = Vec::new();
    let mut header_seen = false;

    for (index, raw) in content.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let fields = split_record(line);
        if fields.len() != 2 {
            return Err(CollectorError::corruption(
                path,
                line_no,
                format!("expected 2 columns, found {}", fields.len()),
            ));
        }

        if !header_seen {
            if fields[0] != "time" || fields[1] != "status" {
                return Err(CollectorError::corruption(
                    path,
                    line_no,
                    format!("expected header '{}'", HEADER),
                ));
            }
            header_seen = true;
            continue;
        }

        let time = parse_timestamp(fields[0]).ok_or_else(|| {
            CollectorError::corruption(path, line_no, format!("invalid timestamp '{}'", fields[0]))
        })?;
        let status = fields[1]
            .parse::<Status>()
            .map_err(|reason| CollectorError::corruption(path, line_no, reason))?;

        entries.push(StatusEntry::new(time, status));
    }

    Ok(entries)
}

/// Render entries with a header row, one `\n`-terminated line per entry.
pub fn render_log(entries: &[StatusEntry]) -> String {
    let mut out = String::with_capacity(HEADER.len() + 1 + entries.len() * 30);
    out.push_str(HEADER);
    out.push('\n');
    for entry in entries {
        out.push_str(&entry.formatted_time());
        out.push(',');
        out.push_str(entry.status.as_str());
        out.push('\n');
    }
    out
}

/// Parse an RFC3339 timestamp into UTC
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn split_record(line: &str) -> Vec<&str> {
    line.split(',').map(unquote).collect()
}

fn unquote(field: &str) -> &str {
    field
        .strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .unwrap_or(field)
}
