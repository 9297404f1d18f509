//! Results file discovery.
//!
//! Finds every results table directly inside the results directory whose
//! extension is recognized. Subdirectories are not descended into.

use crate::error::{AuditError, AuditResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Configuration for file scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File extensions to include (e.g., ["csv"])
    pub extensions: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["csv".to_string()],
        }
    }
}

impl From<&crate::config::ScannerConfig> for ScanConfig {
    fn from(config: &crate::config::ScannerConfig) -> Self {
        Self {
            extensions: config
                .extensions
                .iter()
                .map(|e| e.trim().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }
}

/// Scanner over a single results directory.
pub struct ResultScanner {
    config: ScanConfig,
    results_dir: PathBuf,
}

impl ResultScanner {
    /// Create a new scanner.
    pub fn new(results_dir: PathBuf, config: ScanConfig) -> Self {
        Self {
            config,
            results_dir,
        }
    }

    /// Return the matching files in file-name order.
    pub fn scan(&self) -> AuditResult<Vec<PathBuf>> {
        let metadata = fs::metadata(&self.results_dir).map_err(|source| AuditError::Io {
            path: self.results_dir.clone(),
            source,
        })?;

        if !metadata.is_dir() {
            return Err(AuditError::Io {
                path: self.results_dir.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "not a directory",
                ),
            });
        }

        let mut files = Vec::new();

        let walker = WalkDir::new(&self.results_dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(|e| AuditError::Io {
                path: e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.results_dir.clone()),
                source: e.into(),
            })?;

            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if hidden {
                continue;
            }

            if entry.file_type().is_file() && self.matches(entry.path()) {
                debug!("Found results file: {}", entry.path().display());
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }

    /// Check if a path has a recognized extension.
    pub fn matches(&self, path: &Path) -> bool {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        self.config.extensions.contains(&ext)
    }
}
