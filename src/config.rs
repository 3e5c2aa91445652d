//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.neoscope.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = ".neoscope.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// NeoWs API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// NeoWs API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the NeoWs REST API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key sent as the `api_key` query parameter.
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// Number of browse pages to request.
    #[serde(default = "default_page_count")]
    pub page_count: u32,

    /// Records per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Per-page request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: default_api_key(),
            page_count: default_page_count(),
            page_size: default_page_size(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.nasa.gov/neo/rest/v1".to_string()
}

fn default_api_key() -> String {
    "DEMO_KEY".to_string()
}

fn default_page_count() -> u32 {
    10
}

fn default_page_size() -> u32 {
    20
}

fn default_timeout() -> u64 {
    10
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory that receives charts and reports.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Rows in the ranked top list of the text report.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Bars in the "largest asteroids" chart.
    #[serde(default = "default_largest_chart_n")]
    pub largest_chart_n: usize,

    /// Render PNG charts and the interactive plot.
    #[serde(default = "default_true")]
    pub charts: bool,

    /// Also write the aggregate summary as JSON.
    #[serde(default)]
    pub json_summary: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            top_n: default_top_n(),
            largest_chart_n: default_largest_chart_n(),
            charts: true,
            json_summary: false,
        }
    }
}

fn default_directory() -> PathBuf {
    PathBuf::from("neoscope_output")
}

fn default_top_n() -> usize {
    10
}

fn default_largest_chart_n() -> usize {
    15
}

fn default_true() -> bool {
    true
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

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref base_url) = args.base_url {
            self.api.base_url = base_url.clone();
        }
        if let Some(ref api_key) = args.api_key {
            self.api.api_key = api_key.clone();
        }
        if let Some(pages) = args.pages {
            self.api.page_count = pages;
        }
        if let Some(page_size) = args.page_size {
            self.api.page_size = page_size;
        }
        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = timeout;
        }

        if let Some(ref dir) = args.output_dir {
            self.output.directory = dir.clone();
        }
        if let Some(top) = args.top {
            self.output.top_n = top;
        }

        // Flags always override
        if args.no_charts {
            self.output.charts = false;
        }
        if args.json {
            self.output.json_summary = true;
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check values that the CLI validation cannot see (they may come from the file).
    pub fn validate(&self) -> Result<()> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            anyhow::bail!("API base URL must start with 'http://' or 'https://'");
        }
        if self.api.api_key.trim().is_empty() {
            anyhow::bail!("API key must not be empty");
        }
        if self.api.page_count == 0 {
            anyhow::bail!("Page count must be at least 1");
        }
        if self.api.page_size == 0 {
            anyhow::bail!("Page size must be at least 1");
        }
        if self.api.timeout_seconds == 0 {
            anyhow::bail!("Timeout must be at least 1 second");
        }
        if self.output.top_n == 0 || self.output.largest_chart_n == 0 {
            anyhow::bail!("Ranking sizes must be at least 1");
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tests::make_args;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.page_count, 10);
        assert_eq!(config.api.page_size, 20);
        assert_eq!(config.api.timeout_seconds, 10);
        assert_eq!(config.api.api_key, "DEMO_KEY");
        assert_eq!(config.output.top_n, 10);
        assert!(config.output.charts);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true

[api]
api_key = "abc123"
page_count = 3

[output]
directory = "out"
json_summary = true
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.api.api_key, "abc123");
        assert_eq!(config.api.page_count, 3);
        assert_eq!(config.api.page_size, 20);
        assert_eq!(config.output.directory, PathBuf::from("out"));
        assert!(config.output.json_summary);
        assert!(config.output.charts);
    }

    #[test]
    fn test_merge_only_overrides_explicit_args() {
        let mut config: Config = toml::from_str("[api]\npage_count = 4\napi_key = \"file\"").unwrap();

        let mut args = make_args();
        args.page_size = Some(5);
        args.no_charts = true;
        config.merge_with_args(&args);

        assert_eq!(config.api.page_count, 4);
        assert_eq!(config.api.api_key, "file");
        assert_eq!(config.api.page_size, 5);
        assert!(!config.output.charts);

        args.api_key = Some("cli".to_string());
        config.merge_with_args(&args);
        assert_eq!(config.api.api_key, "cli");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.api.page_count = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.api.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.api.api_key = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[output]"));
    }
}
