//! Results table loading.
//!
//! Parses CSV results files into [`ResultTable`]s. Timestamps are parsed
//! eagerly; `task_id` stays raw until the merge stage coerces it.

use crate::error::{AuditError, AuditResult};
use crate::models::{ResultRow, ResultTable, TaskField};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Columns every results file must carry. Others are ignored.
#[derive(Debug, Deserialize)]
struct RawRecord {
    task_id: String,
    container_id: String,
    timestamp: String,
}

/// Load a single results file.
pub fn load_table(path: &Path, sentinel: &str) -> AuditResult<ResultTable> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| csv_error(path, source))?;

    let mut rows = Vec::new();
    for (index, record) in reader.deserialize::<RawRecord>().enumerate() {
        let record = record.map_err(|source| csv_error(path, source))?;
        let line = index + 1;

        let timestamp =
            parse_timestamp(&record.timestamp).ok_or_else(|| AuditError::InvalidTimestamp {
                path: path.to_path_buf(),
                line,
                value: record.timestamp.clone(),
            })?;

        rows.push(ResultRow {
            task_id: TaskField::from_raw(&record.task_id, sentinel),
            container_id: record.container_id,
            timestamp,
            line,
        });
    }

    let table = ResultTable::new(path.to_path_buf(), rows);
    debug!(
        "Parsed {} rows ({} without a task) from {}",
        table.rows.len(),
        table.sentinel_count(),
        path.display()
    );
    Ok(table)
}

/// Load every file in order, aborting on the first failure.
pub fn load_tables(
    paths: &[PathBuf],
    sentinel: &str,
    show_progress: bool,
) -> AuditResult<Vec<ResultTable>> {
    let pb = if show_progress && !paths.is_empty() {
        let pb = ProgressBar::new(paths.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut tables = Vec::with_capacity(paths.len());
    for path in paths {
        pb.set_message(
            path.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
        );

        match load_table(path, sentinel) {
            Ok(table) => tables.push(table),
            Err(e) => {
                pb.abandon();
                return Err(e);
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(tables)
}

/// Parse a timestamp cell into a UTC-normalized naive datetime.
///
/// Accepts RFC 3339 (offset applied), ISO-like naive datetimes with a `T`
/// or space separator and optional fractional seconds, and bare dates.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.naive_utc());
    }

    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn csv_error(path: &Path, source: csv::Error) -> AuditError {
    // Opening a missing file surfaces as a csv I/O error
    if let csv::ErrorKind::Io(io) = source.kind() {
        return AuditError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(io.kind(), io.to_string()),
        };
    }
    AuditError::Csv {
        path: path.to_path_buf(),
        source,
    }
}
