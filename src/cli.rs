//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// taskaudit - duplicate and throughput auditor for task result logs
///
/// Reads every results table in a directory, checks that each task id was
/// processed exactly once, reports per-container throughput and renders a
/// cumulative processing chart.
///
/// Examples:
///   taskaudit
///   taskaudit --dir ./run-2024-06-01/results
///   taskaudit --report audit.json --format json --fail-on-duplicates
///   taskaudit --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory containing the results tables
    ///
    /// Defaults to ./results, or the value in .taskaudit.toml.
    #[arg(short, long, value_name = "DIR", env = "TASKAUDIT_DIR")]
    pub dir: Option<PathBuf>,

    /// Output path for the processing-rate chart
    ///
    /// Defaults to processing_rate.svg inside the results directory.
    #[arg(long, value_name = "FILE")]
    pub chart: Option<PathBuf>,

    /// Skip rendering the processing-rate chart
    #[arg(long)]
    pub no_chart: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .taskaudit.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// File extensions recognized as results tables (comma-separated)
    ///
    /// Example: --extensions csv,log
    #[arg(long, value_name = "EXTS", value_delimiter = ',')]
    pub extensions: Option<Vec<String>>,

    /// task_id value marking rows with no assigned task
    #[arg(long, value_name = "VALUE")]
    pub sentinel: Option<String>,

    /// Number of most-duplicated task ids to list
    #[arg(long, value_name = "COUNT")]
    pub top: Option<usize>,

    /// Number of duplicated task ids whose containers are listed
    #[arg(long, value_name = "COUNT")]
    pub detail: Option<usize>,

    /// Also write the full analysis to this file
    #[arg(short, long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Format of the --report file (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Exit with code 2 if any task id was processed more than once
    ///
    /// Useful for CI pipelines.
    #[arg(long)]
    pub fail_on_duplicates: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .taskaudit.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the persisted report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.no_chart && self.chart.is_some() {
            return Err("Cannot use both --chart and --no-chart".to_string());
        }

        if let Some(ref sentinel) = self.sentinel {
            if sentinel.is_empty() {
                return Err("Sentinel must not be empty".to_string());
            }
        }

        if let Some(ref extensions) = self.extensions {
            if extensions.iter().all(|e| e.trim().is_empty()) {
                return Err("At least one extension is required".to_string());
            }
        }

        if let Some(ref dir) = self.dir {
            if dir.exists() && !dir.is_dir() {
                return Err(format!("Results path is not a directory: {}", dir.display()));
            }
        }

        Ok(())
    }

}
