//! taskaudit - result log auditor for distributed task processing
//!
//! Loads the per-container results tables from a directory, verifies that
//! every task id was processed exactly once, reports per-container
//! throughput and renders a cumulative processing chart.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (I/O, parse, config)
//!   2 - Duplicates found and --fail-on-duplicates set

mod analysis;
mod chart;
mod cli;
mod config;
mod error;
mod loader;
mod models;
mod report;
mod scanner;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use error::AuditError;
use models::{LoadedFile, Report, ReportMetadata};
use report::console;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let config = match resolve_config(&args, Path::new(".")) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(config.log_level(args.quiet));

    info!("taskaudit v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Effective config: {:?}", config);

    match run_analysis(&args, &config) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            if e
                .downcast_ref::<AuditError>()
                .is_some_and(AuditError::is_parse_error)
            {
                eprintln!("   Check the task_id, container_id and timestamp columns of the file above.");
            }
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .taskaudit.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the results directory, sentinel, and chart.");
    Ok(())
}

/// Initialize logging at the merged verbosity level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the whole pipeline. Returns exit code (0 or 2).
fn run_analysis(args: &Args, config: &Config) -> Result<i32> {
    let start_time = Instant::now();

    let results_dir = config.results_dir();
    let sentinel = config.analysis.sentinel.clone();

    // Step 1: Discover and load the results tables
    let scan_config = scanner::ScanConfig::from(&config.scanner);
    let file_scanner = scanner::ResultScanner::new(results_dir.clone(), scan_config);
    let paths = file_scanner
        .scan()
        .with_context(|| format!("Failed to scan {}", results_dir.display()))?;

    if paths.is_empty() {
        warn!(
            "No results files with extensions {:?} in {}",
            config.scanner.extensions,
            results_dir.display()
        );
    }

    let tables = loader::load_tables(&paths, &sentinel, !args.quiet)?;

    let loaded: Vec<LoadedFile> = tables
        .iter()
        .map(|t| LoadedFile {
            file_name: t.file_name(),
            container_id: t.container_id.clone(),
            rows: t.rows.len(),
        })
        .collect();
    for file in &loaded {
        println!("{}", console::render_load_line(file));
    }

    // Step 2: Merge, filter and look for duplicates
    let aggregate = analysis::merge_tables(&tables)?;
    if aggregate.is_empty() {
        warn!("No valid task rows found across {} files", aggregate.table_count);
    }
    info!(
        "Skipped {} rows with task_id {:?}",
        aggregate.sentinel_rows, sentinel
    );

    let duplicates = analysis::detect_duplicates(
        &aggregate,
        config.analysis.top_duplicates,
        config.analysis.detail_duplicates,
    );
    println!("\n{}", console::render_duplicate_section(&duplicates));

    // Step 3: Chart
    let chart_path = if config.chart.enabled {
        let path = args.chart.clone().unwrap_or_else(|| config.chart_path());
        let timelines = analysis::timelines(&tables, &aggregate);
        chart::write_chart(&path, &timelines, &config.chart)?;
        println!(
            "\nCreated visualization of processing rates ({})",
            path.display()
        );
        Some(path)
    } else {
        debug!("Chart rendering disabled");
        None
    };

    // Step 4: Throughput
    let throughput = analysis::throughput_by_table(&tables, &aggregate);
    if !throughput.is_empty() {
        println!();
    }
    for stat in &throughput {
        println!("{}", console::render_throughput_line(stat));
    }

    // Step 5: Optional persisted report
    if let Some(ref report_path) = args.report {
        let report = Report {
            metadata: ReportMetadata {
                results_dir: results_dir.display().to_string(),
                analysis_date: Utc::now(),
                files: loaded,
                sentinel_rows: aggregate.sentinel_rows,
                chart_path: chart_path.map(|p| p.display().to_string()),
                duration_seconds: start_time.elapsed().as_secs_f64(),
            },
            duplicates: duplicates.clone(),
            throughput,
        };

        let output = match args.format {
            OutputFormat::Json => report::generate_json_report(&report)?,
            OutputFormat::Markdown => report::generate_markdown_report(&report),
        };

        std::fs::write(report_path, &output)
            .with_context(|| format!("Failed to write report to {}", report_path.display()))?;
        println!("\n📝 Report saved to: {}", report_path.display());
    }

    if args.fail_on_duplicates && !duplicates.is_clean() {
        eprintln!(
            "\n⛔ {} task IDs were processed more than once. Failing (exit code 2).",
            duplicates.duplicate_task_ids
        );
        return Ok(2);
    }

    Ok(0)
}

/// Load the config file and apply CLI overrides.
///
/// `base_dir` is where `.taskaudit.toml` is looked up when `--config` is not
/// given. A config file that exists but fails to parse is an error.
fn resolve_config(args: &Args, base_dir: &Path) -> Result<Config> {
    let mut config = match args.config {
        Some(ref config_path) => Config::load(config_path)?,
        None => Config::load_from_dir(base_dir)
            .with_context(|| format!("Failed to load {}", CONFIG_FILE_NAME))?
            .unwrap_or_default(),
    };

    config.merge_with_args(args);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn write_results(dir: &Path, name: &str, container: &str, tasks: &[&str]) {
        let mut content = String::from("task_id,container_id,timestamp\n");
        for (i, task) in tasks.iter().enumerate() {
            content.push_str(&format!(
                "{},{},2024-01-01 00:00:{:02}\n",
                task, container, i
            ));
        }
        std::fs::write(dir.join(name), content).unwrap();
    }

    fn args_for(temp: &TempDir, extra: &[&str]) -> Args {
        let config = temp.path().join("empty.toml");
        std::fs::write(&config, "").unwrap();

        let dir = temp.path().join("results");
        let mut argv = vec![
            "taskaudit".to_string(),
            "--quiet".to_string(),
            "--dir".to_string(),
            dir.display().to_string(),
            "--config".to_string(),
            config.display().to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        Args::try_parse_from(argv).unwrap()
    }

    fn run(temp: &TempDir, args: &Args) -> Result<i32> {
        let config = resolve_config(args, temp.path())?;
        run_analysis(args, &config)
    }

    #[test]
    fn test_run_reports_duplicates() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("results");
        std::fs::create_dir(&dir).unwrap();
        write_results(&dir, "a.csv", "a", &["1", "2", "no_result", "3"]);
        write_results(&dir, "b.csv", "b", &["3", "4", "5"]);

        let report_path = temp.path().join("report.json");
        let report_arg = report_path.display().to_string();
        let args = args_for(
            &temp,
            &["--report", &report_arg, "--format", "json", "--fail-on-duplicates"],
        );

        assert_eq!(run(&temp, &args).unwrap(), 2);
        assert!(dir.join("processing_rate.svg").exists());

        let json = std::fs::read_to_string(&report_path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["duplicates"]["total_valid"], 6);
        assert_eq!(value["duplicates"]["duplicate_task_ids"], 1);
        assert_eq!(value["duplicates"]["top_duplicates"][0]["task_id"], 3);
        assert_eq!(value["metadata"]["sentinel_rows"], 1);
    }

    #[test]
    fn test_run_clean_without_chart() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("results");
        std::fs::create_dir(&dir).unwrap();
        write_results(&dir, "a.csv", "a", &["1", "2"]);
        write_results(&dir, "b.csv", "b", &["3"]);

        let args = args_for(&temp, &["--no-chart", "--fail-on-duplicates"]);

        assert_eq!(run(&temp, &args).unwrap(), 0);
        assert!(!dir.join("processing_rate.svg").exists());
    }

    #[test]
    fn test_run_aborts_on_bad_task_id() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("results");
        std::fs::create_dir(&dir).unwrap();
        write_results(&dir, "a.csv", "a", &["1", "two"]);

        let args = args_for(&temp, &[]);
        let err = run(&temp, &args).unwrap_err();
        assert!(format!("{:#}", err).contains("two"));
    }

    #[test]
    fn test_run_missing_directory() {
        let temp = TempDir::new().unwrap();
        let args = args_for(&temp, &[]);
        assert!(run(&temp, &args).is_err());
    }

    #[test]
    fn test_broken_default_config_is_fatal() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("results");
        std::fs::create_dir(&dir).unwrap();
        write_results(&dir, "a.csv", "a", &["1"]);
        std::fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            "[general]\nresults_dir = \"custom\"\n[analysis\n",
        )
        .unwrap();

        let args = Args::try_parse_from(["taskaudit", "--quiet"]).unwrap();
        let err = resolve_config(&args, temp.path()).unwrap_err();
        assert!(format!("{:#}", err).contains(CONFIG_FILE_NAME));
        assert!(run(&temp, &args).is_err());
    }

    #[test]
    fn test_default_config_selects_results_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("custom");
        std::fs::create_dir(&dir).unwrap();
        write_results(&dir, "a.csv", "a", &["1", "skip", "2"]);
        std::fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            format!(
                "[general]\nresults_dir = {:?}\nverbose = true\n\n[analysis]\nsentinel = \"skip\"\n",
                dir.display().to_string()
            ),
        )
        .unwrap();

        let args = Args::try_parse_from(["taskaudit", "--no-chart"]).unwrap();
        let config = resolve_config(&args, temp.path()).unwrap();
        assert_eq!(config.results_dir(), dir);
        assert_eq!(config.log_level(args.quiet), tracing::Level::DEBUG);
        assert_eq!(run_analysis(&args, &config).unwrap(), 0);
    }
}
