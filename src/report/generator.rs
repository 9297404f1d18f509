//! Persisted report generation.
//!
//! This module renders a completed [`Report`] as Markdown or JSON for
//! archiving next to the run's results.

use crate::models::{DuplicateSummary, Report, ReportMetadata, ThroughputStat};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# Task Audit Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_duplicates_section(&report.duplicates));
    output.push_str(&generate_throughput_section(&report.throughput));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Results Directory:** `{}`\n",
        metadata.results_dir
    ));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Files Loaded:** {}\n", metadata.files.len()));
    if metadata.sentinel_rows > 0 {
        section.push_str(&format!(
            "- **Sentinel Rows Skipped:** {}\n",
            metadata.sentinel_rows
        ));
    }
    if let Some(ref chart) = metadata.chart_path {
        section.push_str(&format!("- **Chart:** `{}`\n", chart));
    }
    section.push_str(&format!(
        "- **Analysis Duration:** {:.2}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    if !metadata.files.is_empty() {
        section.push_str("| File | Container | Rows |\n");
        section.push_str("|:---|:---|---:|\n");
        for file in &metadata.files {
            section.push_str(&format!(
                "| `{}` | {} | {} |\n",
                file.file_name, file.container_id, file.rows
            ));
        }
        section.push('\n');
    }

    section
}

/// Generate the duplicate analysis section.
fn generate_duplicates_section(summary: &DuplicateSummary) -> String {
    let mut section = String::new();

    section.push_str("## Duplicate Analysis\n\n");
    section.push_str("| Valid Tasks | Unique Task IDs | Duplicated Task IDs |\n");
    section.push_str("|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | **{}** |\n\n",
        summary.total_valid, summary.unique_task_ids, summary.duplicate_task_ids
    ));

    if summary.is_clean() {
        section.push_str("No duplicate task IDs found. Each task was processed exactly once.\n\n");
        return section;
    }

    section.push_str("### Most Duplicated Tasks\n\n");
    section.push_str("| Task ID | Times Processed |\n");
    section.push_str("|:---|:---:|\n");
    for entry in &summary.top_duplicates {
        section.push_str(&format!("| {} | {} |\n", entry.task_id, entry.count));
    }
    section.push('\n');

    if !summary.details.is_empty() {
        section.push_str("### Containers per Duplicate\n\n");
        for detail in &summary.details {
            section.push_str(&format!(
                "- **{}**: {}\n",
                detail.task_id,
                detail.containers.join(" → ")
            ));
        }
        section.push('\n');
    }

    section
}

/// Generate the throughput section.
fn generate_throughput_section(stats: &[ThroughputStat]) -> String {
    let mut section = String::new();

    section.push_str("## Throughput\n\n");

    if stats.is_empty() {
        section.push_str("No results files were loaded.\n\n");
        return section;
    }

    section.push_str("| Container | File | Tasks | Duration (s) | Tasks/s |\n");
    section.push_str("|:---|:---|---:|---:|---:|\n");
    for stat in stats {
        section.push_str(&format!(
            "| {} | `{}` | {} | {:.2} | {:.2} |\n",
            stat.container_id, stat.source_file, stat.row_count, stat.duration_seconds, stat.rate
        ));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by taskaudit*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
