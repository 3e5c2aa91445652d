//! neoscope - near-earth-object statistics from the NASA NeoWs API
//!
//! A CLI tool that fetches paginated asteroid records, flattens them into
//! a table, and writes summary statistics, charts and a text report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error, or no usable data was fetched

mod analysis;
mod clean;
mod cli;
mod config;
mod fetch;
mod models;
mod report;

use analysis::Summary;
use anyhow::{Context, Result};
use chrono::Local;
use cli::Args;
use config::{Config, CONFIG_FILE_NAME};
use fetch::{FetchOptions, NeoClient};
use models::{ReportMetadata, RunReport};
use report::charts;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

const JSON_SUMMARY: &str = "asteroid_analysis_summary.json";

#[tokio::main]
async fn main() -> Result<()> {
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

    // Load configuration first; it can raise the log level
    let (config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    info!("neoscope v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    source.log();

    match run(config, &args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .neoscope.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE_NAME);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Set api_key there or export NASA_API_KEY to avoid DEMO_KEY rate limits.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Where the configuration came from. Loading happens before logging is
/// set up, so this is logged afterwards.
enum ConfigSource {
    Explicit(PathBuf),
    DefaultFile,
    BuiltIn,
    BrokenDefault(String),
}

impl ConfigSource {
    fn log(&self) {
        match self {
            ConfigSource::Explicit(path) => info!("Loaded config from: {}", path.display()),
            ConfigSource::DefaultFile => info!("Loaded default config from {}", CONFIG_FILE_NAME),
            ConfigSource::BuiltIn => debug!("No config file found, using defaults"),
            ConfigSource::BrokenDefault(e) => warn!("Failed to load config: {}", e),
        }
    }
}

/// Load configuration from file or use defaults, then apply CLI overrides.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    let (mut config, source) = if let Some(ref config_path) = args.config {
        // An explicit path must load
        (Config::load(config_path)?, ConfigSource::Explicit(config_path.clone()))
    } else {
        match Config::load_default() {
            Ok(Some(config)) => (config, ConfigSource::DefaultFile),
            Ok(None) => (Config::default(), ConfigSource::BuiltIn),
            Err(e) => (Config::default(), ConfigSource::BrokenDefault(format!("{:#}", e))),
        }
    };

    config.merge_with_args(args);
    Ok((config, source))
}

/// Validate the resolved configuration and run the pipeline. Returns the exit code.
async fn run(config: Config, args: &Args) -> Result<i32> {
    config.validate()?;

    let mut stdout = std::io::stdout();
    let mut console = Console {
        out: &mut stdout,
        quiet: args.quiet,
    };
    run_pipeline(&config, &mut console).await
}

/// User-facing progress output. A quiet console writes nothing.
struct Console<'a> {
    out: &'a mut dyn Write,
    quiet: bool,
}

macro_rules! status {
    ($console:expr, $($arg:tt)*) => {
        if !$console.quiet {
            let _ = writeln!($console.out, $($arg)*);
        }
    };
}

/// Fetch, clean, aggregate and report. Returns 0 on success, 1 when there
/// was nothing to analyze.
///
/// Fatal messages always go to stderr, even in quiet runs.
async fn run_pipeline(config: &Config, console: &mut Console<'_>) -> Result<i32> {
    let start_time = Instant::now();
    let mut run = RunReport::new(Local::now());

    // Step 1: Fetch raw records
    status!(console, "🌌 Fetching near-earth objects from {}", config.api.base_url);
    let client = NeoClient::new(FetchOptions {
        show_progress: !console.quiet,
        ..FetchOptions::from(&config.api)
    })?;
    let fetched = client.fetch_all().await;
    run.pages = fetched.pages;
    run.records_fetched = fetched.records.len();

    if fetched.records.is_empty() {
        eprintln!("\n❌ No data fetched! Check your network connection and API key.");
        print_skips(&run);
        return Ok(1);
    }
    status!(
        console,
        "   {} records from {}/{} pages",
        run.records_fetched,
        run.pages_ok(),
        run.pages.len()
    );

    // Step 2: Clean
    status!(console, "🧹 Cleaning records...");
    let cleaned = clean::clean_records(&fetched.records);
    run.rows_cleaned = cleaned.table.len();
    run.record_skips = cleaned.skipped;
    run.approach_ordering_anomalies = cleaned.ordering_anomalies;
    let table = cleaned.table;

    if table.is_empty() {
        eprintln!("\n❌ None of the fetched records could be cleaned.");
        print_skips(&run);
        return Ok(1);
    }
    status!(console, "   {} objects ready for analysis", table.len());

    // Step 3: Aggregate
    let summary = Summary::from_table(&table, config.output.top_n);

    let out_dir = config.output.directory.as_path();
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

    // Step 4: Charts
    if config.output.charts {
        status!(console, "🎨 Rendering charts...");
        render_charts(&mut run, out_dir, &table, &summary, config.output.largest_chart_n);
    } else {
        debug!("Charts disabled");
    }

    // Step 5: Reports
    status!(console, "\n{}\n", report::generate_console_summary(&summary));

    let metadata = ReportMetadata {
        generated_at: Local::now(),
        source: config.api.base_url.clone(),
        pages_requested: run.pages.len(),
        pages_ok: run.pages_ok(),
        records_fetched: run.records_fetched,
        records_skipped: run.record_skips.len(),
    };
    let report_path = report::write_text_report(out_dir, &summary, &metadata)?;
    info!("Report written to {}", report_path.display());
    run.written.push(report_path.display().to_string());

    if config.output.json_summary {
        let result = report::generate_json_summary(&summary).and_then(|json| {
            std::fs::write(out_dir.join(JSON_SUMMARY), json)
                .with_context(|| format!("Failed to write {}", JSON_SUMMARY))
        });
        record_step(&mut run, JSON_SUMMARY, result.map_err(|e| format!("{:#}", e)));
    }

    let skips = report::generate_skip_summary(&run);
    if !skips.is_empty() {
        status!(console, "{}\n", skips);
    }

    status!(
        console,
        "✅ Done in {:.1}s. Files in {}:",
        start_time.elapsed().as_secs_f64(),
        out_dir.display()
    );
    for file in &run.written {
        status!(console, "   • {}", file);
    }
    status!(
        console,
        "\n📈 {} objects analyzed, {} potentially hazardous.",
        summary.total, summary.hazardous_count
    );

    Ok(0)
}

/// Render every chart, recording failures without stopping.
fn render_charts(
    run: &mut RunReport,
    out_dir: &Path,
    table: &models::CleanedTable,
    summary: &Summary,
    largest_n: usize,
) {
    let result = charts::render_size_distribution(&out_dir.join(charts::SIZE_DISTRIBUTION), table, summary);
    record_step(run, charts::SIZE_DISTRIBUTION, result.map_err(|e| e.to_string()));

    let result = charts::render_hazard_distribution(&out_dir.join(charts::HAZARD_DISTRIBUTION), table, summary);
    record_step(run, charts::HAZARD_DISTRIBUTION, result.map_err(|e| e.to_string()));

    let result = charts::render_largest(&out_dir.join(charts::LARGEST_OBJECTS), table, largest_n);
    record_step(run, charts::LARGEST_OBJECTS, result.map_err(|e| e.to_string()));

    if summary.hazardous_count > 0 {
        let result = charts::render_hazardous(&out_dir.join(charts::HAZARDOUS_OBJECTS), table, summary);
        record_step(run, charts::HAZARDOUS_OBJECTS, result.map_err(|e| e.to_string()));
    } else {
        warn!("No hazardous objects found; skipping {}", charts::HAZARDOUS_OBJECTS);
    }

    let result = report::write_interactive_plot(out_dir, table);
    record_step(run, report::INTERACTIVE_PLOT, result.map_err(|e| format!("{:#}", e)));
}

fn record_step(run: &mut RunReport, artifact: &str, result: Result<(), String>) {
    match result {
        Ok(()) => debug!("Wrote {}", artifact),
        Err(ref e) => warn!("Could not write {}: {}", artifact, e),
    }
    run.record_render(artifact, result);
}

/// Print the skip summary before a fatal exit.
fn print_skips(run: &RunReport) {
    let skips = report::generate_skip_summary(run);
    if !skips.is_empty() {
        eprintln!("{}\n", skips);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::client::tests::serve;
    use serde_json::json;

    fn neo(id: &str, min: f64, max: f64, hazardous: bool) -> serde_json::Value {
        json!({
            "id": id,
            "name": format!("({})", id),
            "absolute_magnitude_h": 20.1,
            "estimated_diameter": {
                "kilometers": { "estimated_diameter_min": min, "estimated_diameter_max": max }
            },
            "is_potentially_hazardous_asteroid": hazardous,
            "close_approach_data": [{
                "close_approach_date": "2023-07-14",
                "miss_distance": { "kilometers": "5412345.12" },
                "relative_velocity": { "kilometers_per_hour": "45000.5" }
            }]
        })
    }

    fn console(out: &mut Vec<u8>, quiet: bool) -> Console<'_> {
        Console { out, quiet }
    }

    fn test_config(base_url: String, out_dir: &Path) -> Config {
        let mut config = Config::default();
        config.api.base_url = base_url;
        config.api.api_key = "test-key".to_string();
        config.api.page_count = 2;
        config.api.timeout_seconds = 5;
        config.output.directory = out_dir.to_path_buf();
        config.output.charts = false;
        config
    }

    #[tokio::test]
    async fn test_zero_data_halts_without_outputs() {
        let base = serve(vec![]).await;
        let tmp = tempfile::TempDir::new().unwrap();
        let out_dir = tmp.path().join("out");

        let mut out = Vec::new();
        let code = run_pipeline(&test_config(base, &out_dir), &mut console(&mut out, false))
            .await
            .unwrap();

        assert_eq!(code, 1);
        assert!(!out_dir.exists());
    }

    #[tokio::test]
    async fn test_pipeline_writes_report() {
        let page0 = json!({ "near_earth_objects": [neo("1", 0.2, 0.4, false), neo("2", 1.0, 3.0, true)] });
        let page1 = json!({ "near_earth_objects": [{ "id": "broken" }, neo("3", 0.01, 0.03, false)] });
        let base = serve(vec![(200, page0.to_string()), (200, page1.to_string())]).await;

        let tmp = tempfile::TempDir::new().unwrap();
        let out_dir = tmp.path().join("out");
        let mut config = test_config(base, &out_dir);
        config.output.json_summary = true;

        let mut out = Vec::new();
        let code = run_pipeline(&config, &mut console(&mut out, false)).await.unwrap();
        assert_eq!(code, 0);

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("NEAR-EARTH OBJECT ANALYSIS - SUMMARY"));
        assert!(printed.contains("record broken"));
        assert!(printed.contains(JSON_SUMMARY));

        let reports: Vec<_> = std::fs::read_dir(&out_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| name.starts_with("asteroid_analysis_report_") && name.ends_with(".txt"))
            .collect();
        assert_eq!(reports.len(), 1);

        let content = std::fs::read_to_string(out_dir.join(&reports[0])).unwrap();
        assert!(content.contains("Objects analyzed: 3"));
        assert!(content.contains("Records fetched: 4 (1 skipped while cleaning)"));
        assert!(content.contains(" 1. (2)"));

        let json = std::fs::read_to_string(out_dir.join(JSON_SUMMARY)).unwrap();
        assert!(json.contains("\"hazardous_count\": 1"));
        assert!(!out_dir.join(charts::SIZE_DISTRIBUTION).exists());
    }

    #[tokio::test]
    async fn test_quiet_run_prints_nothing() {
        let page0 = json!({ "near_earth_objects": [neo("1", 0.2, 0.4, false), { "id": "broken" }] });
        let base = serve(vec![(200, page0.to_string())]).await;

        let tmp = tempfile::TempDir::new().unwrap();
        let out_dir = tmp.path().join("out");

        let mut out = Vec::new();
        let code = run_pipeline(&test_config(base, &out_dir), &mut console(&mut out, true))
            .await
            .unwrap();

        assert_eq!(code, 0);
        assert!(out.is_empty());
        assert!(out_dir.exists());
    }

    #[test]
    fn test_config_file_verbose_enables_debug_logging() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[general]\nverbose = true\n").unwrap();

        let mut args = crate::cli::tests::make_args();
        args.config = Some(path.clone());

        let (config, source) = load_config(&args).unwrap();
        assert!(matches!(source, ConfigSource::Explicit(ref p) if *p == path));
        assert_eq!(args.log_level(config.general.verbose), tracing::Level::DEBUG);

        args.quiet = true;
        assert_eq!(args.log_level(config.general.verbose), tracing::Level::ERROR);
    }
}
