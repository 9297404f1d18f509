//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.taskaudit.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".taskaudit.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Duplicate analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Chart settings.
    #[serde(default)]
    pub chart: ChartConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory holding the results files.
    #[serde(default = "default_results_dir")]
    pub results_dir: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
            verbose: false,
        }
    }
}

fn default_results_dir() -> String {
    "./results".to_string()
}

/// Results file discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// File extensions recognized as results tables.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["csv".to_string()]
}

/// Duplicate detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Marker in `task_id` for rows with no assigned task.
    #[serde(default = "default_sentinel")]
    pub sentinel: String,

    /// Length of the most-duplicated list.
    #[serde(default = "default_top_duplicates")]
    pub top_duplicates: usize,

    /// Duplicated tasks whose container sequence is listed.
    #[serde(default = "default_detail_duplicates")]
    pub detail_duplicates: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sentinel: default_sentinel(),
            top_duplicates: default_top_duplicates(),
            detail_duplicates: default_detail_duplicates(),
        }
    }
}

fn default_sentinel() -> String {
    "no_result".to_string()
}

fn default_top_duplicates() -> usize {
    10
}

fn default_detail_duplicates() -> usize {
    5
}

/// Processing-rate chart settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Render the chart at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Output file name, relative to the results directory.
    #[serde(default = "default_chart_file")]
    pub file_name: String,

    /// Canvas width in pixels.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Canvas height in pixels.
    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file_name: default_chart_file(),
            width: default_width(),
            height: default_height(),
            title: default_title(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_chart_file() -> String {
    "processing_rate.svg".to_string()
}

fn default_width() -> u32 {
    1200
}

fn default_height() -> u32 {
    600
}

fn default_title() -> String {
    "Task Processing Rate Over Time".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load `.taskaudit.toml` from a directory.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only explicitly provided values override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.dir {
            self.general.results_dir = dir.display().to_string();
        }

        if let Some(ref extensions) = args.extensions {
            self.scanner.extensions = extensions.clone();
        }

        if let Some(ref sentinel) = args.sentinel {
            self.analysis.sentinel = sentinel.clone();
        }
        if let Some(top) = args.top {
            self.analysis.top_duplicates = top;
        }
        if let Some(detail) = args.detail {
            self.analysis.detail_duplicates = detail;
        }

        if args.no_chart {
            self.chart.enabled = false;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Log level after merging: `--quiet` wins, then `verbose` from either source.
    pub fn log_level(&self, quiet: bool) -> tracing::Level {
        if quiet {
            tracing::Level::ERROR
        } else if self.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Directory holding the results files.
    pub fn results_dir(&self) -> PathBuf {
        PathBuf::from(&self.general.results_dir)
    }

    /// Where the chart is written unless overridden on the command line.
    pub fn chart_path(&self) -> PathBuf {
        self.results_dir().join(&self.chart.file_name)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
