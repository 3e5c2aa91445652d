//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation. Most options are optional so that values from
//! `.neoscope.toml` are only overridden when given explicitly.

use clap::Parser;
use std::path::PathBuf;

/// neoscope - near-earth-object statistics from the NASA NeoWs API
///
/// Fetches paginated asteroid records, cleans them into a table,
/// computes size and hazard statistics, and writes charts plus a report.
///
/// Examples:
///   neoscope
///   neoscope --api-key $NASA_API_KEY --pages 25 -o ./neo
///   neoscope --no-charts --json
///   neoscope --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// NeoWs API key
    ///
    /// Defaults to the public DEMO_KEY, which is heavily rate limited.
    #[arg(long, value_name = "KEY", env = "NASA_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the NeoWs REST API
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Number of browse pages to fetch
    #[arg(long, value_name = "COUNT")]
    pub pages: Option<u32>,

    /// Records per page
    #[arg(long, value_name = "SIZE")]
    pub page_size: Option<u32>,

    /// Per-page request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Directory for charts and reports
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .neoscope.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of objects in the ranked top list
    #[arg(long, value_name = "N")]
    pub top: Option<usize>,

    /// Skip PNG charts and the interactive plot
    #[arg(long)]
    pub no_charts: bool,

    /// Also write the aggregate summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .neoscope.toml configuration file
    #[arg(long)]
    pub init_config: bool,
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

        if let Some(ref url) = self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Base URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.pages == Some(0) {
            return Err("Page count must be at least 1".to_string());
        }

        if self.page_size == Some(0) {
            return Err("Page size must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.top == Some(0) {
            return Err("--top must be at least 1".to_string());
        }

        if let Some(ref dir) = self.output_dir {
            if dir.exists() && !dir.is_dir() {
                return Err(format!(
                    "Output path is not a directory: {}",
                    dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is `[general] verbose` from the config file; `-q`
    /// still wins over it.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
