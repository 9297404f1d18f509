//! Merging, duplicate detection and throughput statistics.
//!
//! This module turns the loaded result tables into an [`AggregateTable`]
//! and computes every figure the reports and chart need from it.

use crate::error::{AuditError, AuditResult};
use crate::models::{
    AggregateTable, DuplicateDetail, DuplicateEntry, DuplicateSummary, ResultTable, TaskField,
    ThroughputStat, Timeline, ValidRow,
};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use tracing::debug;

/// Concatenate all tables, drop sentinel rows and coerce task ids.
///
/// Fails on the first `task_id` that is not an integer.
pub fn merge_tables(tables: &[ResultTable]) -> AuditResult<AggregateTable> {
    let mut aggregate = AggregateTable {
        table_count: tables.len(),
        ..Default::default()
    };

    for (index, table) in tables.iter().enumerate() {
        for row in &table.rows {
            let raw = match &row.task_id {
                TaskField::Sentinel => {
                    aggregate.sentinel_rows += 1;
                    continue;
                }
                TaskField::Value(raw) => raw,
            };

            let task_id = parse_task_id(raw).ok_or_else(|| AuditError::InvalidTaskId {
                path: table.source.clone(),
                line: row.line,
                value: raw.clone(),
            })?;

            aggregate.rows.push(ValidRow {
                task_id,
                container_id: row.container_id.clone(),
                timestamp: row.timestamp,
                table: index,
            });
        }
    }

    debug!(
        "Merged {} tables: {} valid rows, {} sentinel rows",
        aggregate.table_count,
        aggregate.rows.len(),
        aggregate.sentinel_rows
    );

    Ok(aggregate)
}

/// Coerce a raw task id to an integer.
///
/// Integral float spellings such as `42.0` are accepted.
pub fn parse_task_id(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<i64>() {
        return Some(id);
    }

    let value = raw.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

/// Occurrence count of every task id, in order of first appearance.
pub fn task_counts(aggregate: &AggregateTable) -> Vec<(i64, usize)> {
    let mut positions: HashMap<i64, usize> = HashMap::new();
    let mut counts: Vec<(i64, usize)> = Vec::new();

    for row in &aggregate.rows {
        match positions.get(&row.task_id) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                positions.insert(row.task_id, counts.len());
                counts.push((row.task_id, 1));
            }
        }
    }

    counts
}

/// Find task ids processed more than once.
///
/// `top_n` limits the most-duplicated list (ties keep first-appearance
/// order); `detail_n` limits how many duplicated ids get their container
/// sequence listed.
pub fn detect_duplicates(
    aggregate: &AggregateTable,
    top_n: usize,
    detail_n: usize,
) -> DuplicateSummary {
    let counts = task_counts(aggregate);

    let duplicates: Vec<DuplicateEntry> = counts
        .iter()
        .filter(|(_, count)| *count > 1)
        .map(|&(task_id, count)| DuplicateEntry { task_id, count })
        .collect();

    let details = duplicates
        .iter()
        .take(detail_n)
        .map(|entry| DuplicateDetail {
            task_id: entry.task_id,
            containers: containers_for_task(aggregate, entry.task_id),
        })
        .collect();

    let mut top_duplicates = duplicates.clone();
    top_duplicates.sort_by_key(|e| std::cmp::Reverse(e.count));
    top_duplicates.truncate(top_n);

    DuplicateSummary {
        total_valid: aggregate.len(),
        unique_task_ids: counts.len(),
        duplicate_task_ids: duplicates.len(),
        top_duplicates,
        details,
    }
}

/// Containers that produced each occurrence of a task, in table order.
pub fn containers_for_task(aggregate: &AggregateTable, task_id: i64) -> Vec<String> {
    aggregate
        .rows
        .iter()
        .filter(|r| r.task_id == task_id)
        .map(|r| r.container_id.clone())
        .collect()
}

/// Rows per second, or zero for a non-positive span.
pub fn compute_rate(row_count: usize, duration_seconds: f64) -> f64 {
    if duration_seconds > 0.0 {
        row_count as f64 / duration_seconds
    } else {
        0.0
    }
}

/// Seconds between the earliest and latest timestamp.
pub fn span_seconds<'a, I>(timestamps: I) -> f64
where
    I: IntoIterator<Item = &'a NaiveDateTime>,
{
    let mut iter = timestamps.into_iter();
    let Some(first) = iter.next() else {
        return 0.0;
    };

    let (min, max) = iter.fold((first, first), |(lo, hi), ts| (lo.min(ts), hi.max(ts)));
    let delta = *max - *min;

    delta
        .num_microseconds()
        .map(|us| us as f64 / 1_000_000.0)
        .unwrap_or_else(|| delta.num_seconds() as f64)
}

/// Duration and rate of each source table, over its valid rows.
pub fn throughput_by_table(
    tables: &[ResultTable],
    aggregate: &AggregateTable,
) -> Vec<ThroughputStat> {
    tables
        .iter()
        .enumerate()
        .map(|(index, table)| {
            let timestamps: Vec<&NaiveDateTime> = aggregate
                .rows_for_table(index)
                .map(|r| &r.timestamp)
                .collect();

            let row_count = timestamps.len();
            let duration_seconds = span_seconds(timestamps);

            ThroughputStat {
                container_id: table.container_id.clone(),
                source_file: table.file_name(),
                row_count,
                duration_seconds,
                rate: compute_rate(row_count, duration_seconds),
            }
        })
        .collect()
}

/// Cumulative processing curve of each table with at least one valid row.
pub fn timelines(tables: &[ResultTable], aggregate: &AggregateTable) -> Vec<Timeline> {
    tables
        .iter()
        .enumerate()
        .filter_map(|(index, table)| {
            let mut stamps: Vec<NaiveDateTime> = aggregate
                .rows_for_table(index)
                .map(|r| r.timestamp)
                .collect();
            if stamps.is_empty() {
                return None;
            }

            // Stable sort keeps file order for equal timestamps
            stamps.sort();

            Some(Timeline {
                label: format!("Container {}", table.container_id),
                points: stamps
                    .into_iter()
                    .enumerate()
                    .map(|(i, ts)| (ts, i + 1))
                    .collect(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResultRow;
    use chrono::{Duration, NaiveDate};
    use std::path::PathBuf;

    fn base_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn create_table(name: &str, container: &str, tasks: &[&str]) -> ResultTable {
        let rows = tasks
            .iter()
            .enumerate()
            .map(|(i, task)| ResultRow {
                task_id: TaskField::from_raw(task, "no_result"),
                container_id: container.to_string(),
                timestamp: base_time() + Duration::seconds(i as i64),
                line: i + 1,
            })
            .collect();
        ResultTable::new(PathBuf::from(format!("results/{name}.csv")), rows)
    }

    fn create_timed_table(container: &str, offsets_ms: &[i64]) -> ResultTable {
        let rows = offsets_ms
            .iter()
            .enumerate()
            .map(|(i, ms)| ResultRow {
                task_id: TaskField::Value(i.to_string()),
                container_id: container.to_string(),
                timestamp: base_time() + Duration::milliseconds(*ms),
                line: i + 1,
            })
            .collect();
        ResultTable::new(PathBuf::from(format!("{container}.csv")), rows)
    }

    #[test]
    fn test_merge_drops_sentinels() {
        let tables = vec![
            create_table("a", "a", &["1", "no_result", "2"]),
            create_table("b", "b", &["no_result", "3"]),
        ];

        let aggregate = merge_tables(&tables).unwrap();
        assert_eq!(aggregate.len(), 3);
        assert_eq!(aggregate.sentinel_rows, 2);
        assert_eq!(aggregate.table_count, 2);
        let ids: Vec<i64> = aggregate.rows.iter().map(|r| r.task_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_merge_rejects_non_numeric() {
        let tables = vec![create_table("a", "a", &["1", "oops"])];

        match merge_tables(&tables).unwrap_err() {
            AuditError::InvalidTaskId { line, value, .. } => {
                assert_eq!(line, 2);
                assert_eq!(value, "oops");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_task_id() {
        assert_eq!(parse_task_id("42"), Some(42));
        assert_eq!(parse_task_id(" 7 "), Some(7));
        assert_eq!(parse_task_id("-3"), Some(-3));
        assert_eq!(parse_task_id("42.0"), Some(42));
        assert_eq!(parse_task_id("42.5"), None);
        assert_eq!(parse_task_id("NaN"), None);
        assert_eq!(parse_task_id("abc"), None);
        assert_eq!(parse_task_id(""), None);
    }

    #[test]
    fn test_detects_shared_task() {
        let tables = vec![
            create_table("a", "container-a", &["1", "2", "3"]),
            create_table("b", "container-b", &["3", "4", "5"]),
        ];
        let aggregate = merge_tables(&tables).unwrap();

        let summary = detect_duplicates(&aggregate, 10, 5);
        assert_eq!(summary.total_valid, 6);
        assert_eq!(summary.unique_task_ids, 5);
        assert_eq!(summary.duplicate_task_ids, 1);
        assert_eq!(
            summary.top_duplicates,
            vec![DuplicateEntry {
                task_id: 3,
                count: 2
            }]
        );
        assert_eq!(
            summary.details,
            vec![DuplicateDetail {
                task_id: 3,
                containers: vec!["container-a".to_string(), "container-b".to_string()],
            }]
        );
        assert!(!summary.is_clean());
    }

    #[test]
    fn test_unique_tasks_are_clean() {
        let tables = vec![
            create_table("a", "a", &["1", "2"]),
            create_table("b", "b", &["3", "4"]),
        ];
        let aggregate = merge_tables(&tables).unwrap();

        let summary = detect_duplicates(&aggregate, 10, 5);
        assert!(summary.is_clean());
        assert!(summary.top_duplicates.is_empty());
        assert!(summary.details.is_empty());
        assert_eq!(summary.unique_task_ids, 4);
    }

    #[test]
    fn test_sentinels_never_count_as_duplicates() {
        let tables = vec![
            create_table("a", "a", &["no_result", "1", "no_result"]),
            create_table("b", "b", &["no_result", "2"]),
        ];
        let aggregate = merge_tables(&tables).unwrap();

        let summary = detect_duplicates(&aggregate, 10, 5);
        assert_eq!(summary.total_valid, 2);
        assert_eq!(summary.unique_task_ids, 2);
        assert!(summary.is_clean());
    }

    #[test]
    fn test_duplicate_count_matches_definition() {
        let tables = vec![
            create_table("a", "a", &["1", "1", "2", "3", "3", "3"]),
            create_table("b", "b", &["4", "2", "5", "6", "6"]),
        ];
        let aggregate = merge_tables(&tables).unwrap();

        let expected = task_counts(&aggregate)
            .iter()
            .filter(|(_, c)| *c > 1)
            .count();
        let summary = detect_duplicates(&aggregate, 10, 5);
        assert_eq!(summary.duplicate_task_ids, expected);
        assert_eq!(summary.duplicate_task_ids, 4);
    }

    #[test]
    fn test_top_duplicates_ordering_and_limits() {
        // 7 appears three times; 5 and 9 tie at two, 5 seen first
        let tables = vec![
            create_table("a", "a", &["5", "7", "9", "7"]),
            create_table("b", "b", &["9", "5", "7"]),
        ];
        let aggregate = merge_tables(&tables).unwrap();

        let summary = detect_duplicates(&aggregate, 2, 1);
        let top: Vec<(i64, usize)> = summary
            .top_duplicates
            .iter()
            .map(|e| (e.task_id, e.count))
            .collect();
        assert_eq!(top, vec![(7, 3), (5, 2)]);

        // Details follow first-appearance order, not frequency
        assert_eq!(summary.details.len(), 1);
        assert_eq!(summary.details[0].task_id, 5);
        assert_eq!(summary.details[0].containers, vec!["a", "b"]);
        assert_eq!(summary.duplicate_task_ids, 3);
    }

    #[test]
    fn test_rate_over_ten_seconds() {
        // 100 rows spread evenly across exactly 10 seconds
        let offsets: Vec<i64> = (0..100).map(|i| i * 10_000 / 99).collect();
        let tables = vec![create_timed_table("c1", &offsets)];
        let aggregate = merge_tables(&tables).unwrap();

        let stats = throughput_by_table(&tables, &aggregate);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].row_count, 100);
        assert_eq!(stats[0].duration_seconds, 10.0);
        assert_eq!(stats[0].rate, 10.0);
    }

    #[test]
    fn test_rate_zero_for_degenerate_span() {
        let tables = vec![create_timed_table("c1", &[0, 0, 0])];
        let aggregate = merge_tables(&tables).unwrap();

        let stats = throughput_by_table(&tables, &aggregate);
        assert_eq!(stats[0].duration_seconds, 0.0);
        assert_eq!(stats[0].rate, 0.0);
        assert_eq!(compute_rate(5, 0.0), 0.0);
        assert_eq!(compute_rate(5, -1.0), 0.0);
    }

    #[test]
    fn test_throughput_row_counts_sum_to_valid_rows() {
        let tables = vec![
            create_table("a", "a", &["1", "no_result", "2", "3"]),
            create_table("b", "b", &["no_result", "no_result"]),
            create_table("c", "c", &["4", "1"]),
        ];
        let aggregate = merge_tables(&tables).unwrap();

        let stats = throughput_by_table(&tables, &aggregate);
        let total: usize = stats.iter().map(|s| s.row_count).sum();
        assert_eq!(total, aggregate.len());
        assert_eq!(stats[1].row_count, 0);
        assert_eq!(stats[1].rate, 0.0);
    }

    #[test]
    fn test_span_seconds_ignores_order() {
        let t = base_time();
        let stamps = [t + Duration::seconds(5), t, t + Duration::milliseconds(7500)];
        assert_eq!(span_seconds(stamps.iter()), 7.5);
        assert_eq!(span_seconds(std::iter::empty()), 0.0);
    }

    #[test]
    fn test_timelines_sorted_and_cumulative() {
        let tables = vec![
            create_timed_table("late", &[3000, 1000, 2000]),
            create_table("idle", "idle", &["no_result"]),
        ];
        let aggregate = merge_tables(&tables).unwrap();

        let lines = timelines(&tables, &aggregate);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].label, "Container late");

        let counts: Vec<usize> = lines[0].points.iter().map(|(_, c)| *c).collect();
        assert_eq!(counts, vec![1, 2, 3]);
        assert!(lines[0].points.windows(2).all(|w| w[0].0 <= w[1].0));
    }
}
