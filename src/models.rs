//! Data models for the result auditor.
//!
//! This module contains the table types produced by the loader, the merged
//! aggregate view, and the summary structures that feed the reports.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Raw `task_id` cell as read from a results file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskField {
    /// The sentinel marker: no task was assigned for this row.
    Sentinel,
    /// Any other value, not yet coerced to a number.
    Value(String),
}

impl TaskField {
    /// Classify a raw cell against the configured sentinel.
    pub fn from_raw(raw: &str, sentinel: &str) -> Self {
        if raw == sentinel {
            TaskField::Sentinel
        } else {
            TaskField::Value(raw.to_string())
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, TaskField::Sentinel)
    }
}

/// A single row of a results file.
#[derive(Debug, Clone)]
pub struct ResultRow {
    pub task_id: TaskField,
    pub container_id: String,
    /// UTC-normalized processing time.
    pub timestamp: NaiveDateTime,
    /// 1-based record number within the source file.
    pub line: usize,
}

/// All rows from one results file.
#[derive(Debug, Clone)]
pub struct ResultTable {
    /// Path the table was loaded from.
    pub source: PathBuf,
    /// Container label, taken from the first row.
    pub container_id: String,
    pub rows: Vec<ResultRow>,
}

impl ResultTable {
    /// Build a table, labelling it with the first row's container.
    ///
    /// An empty table falls back to the file stem so it can still be named
    /// in reports.
    pub fn new(source: PathBuf, rows: Vec<ResultRow>) -> Self {
        let container_id = rows
            .first()
            .map(|r| r.container_id.clone())
            .unwrap_or_else(|| file_stem(&source));

        Self {
            source,
            container_id,
            rows,
        }
    }

    /// Display name of the source file.
    pub fn file_name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.source.display().to_string())
    }

    /// Number of sentinel rows in this table.
    pub fn sentinel_count(&self) -> usize {
        self.rows.iter().filter(|r| r.task_id.is_sentinel()).count()
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// A row that survived sentinel filtering and numeric coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRow {
    pub task_id: i64,
    pub container_id: String,
    pub timestamp: NaiveDateTime,
    /// Index of the source table this row came from.
    pub table: usize,
}

/// Concatenation of every table after filtering.
#[derive(Debug, Clone, Default)]
pub struct AggregateTable {
    /// Valid rows, table by table, original order within each table.
    pub rows: Vec<ValidRow>,
    /// Number of sentinel rows dropped during the merge.
    pub sentinel_rows: usize,
    /// Number of source tables merged.
    pub table_count: usize,
}

impl AggregateTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Valid rows belonging to one source table.
    pub fn rows_for_table(&self, table: usize) -> impl Iterator<Item = &ValidRow> {
        self.rows.iter().filter(move |r| r.table == table)
    }
}

/// One entry of the most-duplicated list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateEntry {
    pub task_id: i64,
    pub count: usize,
}

/// Containers that produced each occurrence of a duplicated task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateDetail {
    pub task_id: i64,
    pub containers: Vec<String>,
}

/// Outcome of the duplicate-detection pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DuplicateSummary {
    /// Total valid rows in the aggregate.
    pub total_valid: usize,
    /// Distinct task ids.
    pub unique_task_ids: usize,
    /// Distinct task ids seen more than once.
    pub duplicate_task_ids: usize,
    /// Most frequently duplicated tasks, highest count first.
    pub top_duplicates: Vec<DuplicateEntry>,
    /// Container sequences for the first duplicated tasks.
    pub details: Vec<DuplicateDetail>,
}

impl DuplicateSummary {
    /// True when every task was processed exactly once.
    pub fn is_clean(&self) -> bool {
        self.duplicate_task_ids == 0
    }
}

/// Throughput of a single container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughputStat {
    pub container_id: String,
    pub source_file: String,
    pub row_count: usize,
    pub duration_seconds: f64,
    /// Rows per second, zero when the span is degenerate.
    pub rate: f64,
}

/// Cumulative processing curve of one container.
#[derive(Debug, Clone)]
pub struct Timeline {
    pub label: String,
    /// `(timestamp, running count)` pairs, sorted by time.
    pub points: Vec<(NaiveDateTime, usize)>,
}

/// Per-file load information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadedFile {
    pub file_name: String,
    pub container_id: String,
    pub rows: usize,
}

/// Metadata about a completed analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Directory the results were read from.
    pub results_dir: String,
    pub analysis_date: DateTime<Utc>,
    pub files: Vec<LoadedFile>,
    pub sentinel_rows: usize,
    /// Where the chart was written, if rendered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_path: Option<String>,
    pub duration_seconds: f64,
}

/// The complete analysis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub duplicates: DuplicateSummary,
    pub throughput: Vec<ThroughputStat>,
}
