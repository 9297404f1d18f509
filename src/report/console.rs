//! Plain-text console report.
//!
//! Each section is rendered to a `String` so `main` decides where it goes.

use crate::models::{DuplicateSummary, LoadedFile, ThroughputStat};

/// One informational line per loaded file.
pub fn render_load_line(file: &LoadedFile) -> String {
    format!("Loaded {} results from {}", file.rows, file.file_name)
}

/// Counts, then either the duplicate breakdown or the success line.
pub fn render_duplicate_section(summary: &DuplicateSummary) -> String {
    let mut lines = Vec::new();

    lines.push("Analysis Results:".to_string());
    lines.push(format!(
        "Total valid tasks processed: {}",
        summary.total_valid
    ));
    lines.push(format!(
        "Number of unique task IDs: {}",
        summary.unique_task_ids
    ));
    lines.push(format!(
        "Number of duplicate task IDs: {}",
        summary.duplicate_task_ids
    ));

    if summary.is_clean() {
        lines.push(String::new());
        lines.push(
            "SUCCESS: No duplicate task IDs found! Each task was processed exactly once."
                .to_string(),
        );
        return lines.join("\n");
    }

    lines.push(String::new());
    lines.push("WARNING: Duplicate task IDs found!".to_string());
    lines.push(format!(
        "Top {} duplicated task IDs:",
        summary.top_duplicates.len()
    ));
    for entry in &summary.top_duplicates {
        lines.push(format!(
            "Task ID {} was processed {} times",
            entry.task_id, entry.count
        ));
    }

    if !summary.details.is_empty() {
        lines.push(String::new());
        lines.push("Analyzing duplicates by container:".to_string());
        for detail in &summary.details {
            lines.push(format!(
                "Task ID {} was processed by: [{}]",
                detail.task_id,
                detail.containers.join(", ")
            ));
        }
    }

    lines.join("\n")
}

/// One line per container with its duration and rate.
pub fn render_throughput_line(stat: &ThroughputStat) -> String {
    format!(
        "Container {} processed {} queries in {:.2} seconds ({:.2} queries/second)",
        stat.container_id, stat.row_count, stat.duration_seconds, stat.rate
    )
}
