//! Paginated client for the NeoWs `browse` endpoint.
//!
//! Pages are requested strictly one after another. A page that fails for
//! any reason is recorded and skipped; the run moves on to the next page.

use crate::config::ApiConfig;
use crate::models::{PageReport, RawRecord};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Longest error body kept from a failed response.
const MAX_ERROR_BODY: usize = 200;

/// Why a single page was skipped.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("cannot connect to {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response is not valid JSON: {0}")]
    Malformed(String),

    #[error("response has no `near_earth_objects` array")]
    MissingRecords,
}

/// Settings for one fetch run.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub base_url: String,
    pub api_key: String,
    pub page_count: u32,
    pub page_size: u32,
    pub timeout: Duration,
    pub show_progress: bool,
}

impl From<&ApiConfig> for FetchOptions {
    fn from(config: &ApiConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            page_count: config.page_count,
            page_size: config.page_size,
            timeout: Duration::from_secs(config.timeout_seconds),
            show_progress: true,
        }
    }
}

/// Records from every page that succeeded, plus a report per page.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub records: Vec<RawRecord>,
    pub pages: Vec<PageReport>,
}

/// HTTP client for the browse endpoint.
pub struct NeoClient {
    http: reqwest::Client,
    options: FetchOptions,
}

impl NeoClient {
    pub fn new(options: FetchOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .user_agent(concat!("neoscope/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { http, options })
    }

    fn browse_url(&self) -> String {
        format!("{}/neo/browse", self.options.base_url)
    }

    /// Fetch pages `0..page_count` in order.
    ///
    /// Never fails as a whole: an empty `records` list means no page succeeded.
    pub async fn fetch_all(&self) -> FetchOutcome {
        let total = self.options.page_count;
        info!(
            "Fetching {} pages of {} records from {}",
            total,
            self.options.page_size,
            self.browse_url()
        );

        let progress = if self.options.show_progress {
            let pb = ProgressBar::new(u64::from(total));
            pb.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pages {msg}",
                )
                .map(|style| style.progress_chars("#>-"))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut outcome = FetchOutcome::default();

        for page in 0..total {
            match self.fetch_page(page).await {
                Ok(records) => {
                    debug!("Page {}/{}: {} records", page + 1, total, records.len());
                    outcome.pages.push(PageReport {
                        page,
                        records: Some(records.len()),
                        error: None,
                    });
                    outcome.records.extend(records);
                }
                Err(e) => {
                    warn!("Skipping page {}/{}: {}", page + 1, total, e);
                    outcome.pages.push(PageReport {
                        page,
                        records: None,
                        error: Some(e.to_string()),
                    });
                }
            }
            progress.set_message(format!("({} records)", outcome.records.len()));
            progress.inc(1);
        }

        progress.finish_and_clear();
        info!(
            "Fetched {} records from {}/{} pages",
            outcome.records.len(),
            outcome.pages.iter().filter(|p| p.error.is_none()).count(),
            total
        );

        outcome
    }

    /// Fetch a single zero-based page.
    pub async fn fetch_page(&self, page: u32) -> Result<Vec<RawRecord>, FetchError> {
        let response = self
            .http
            .get(self.browse_url())
            .query(&[
                ("page", page.to_string()),
                ("size", self.options.page_size.to_string()),
                ("api_key", self.options.api_key.clone()),
            ])
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        parse_page(&body)
    }

    /// Turn a transport error into a skip reason. The URL carries the API
    /// key, so it is stripped before the error is rendered.
    fn classify(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout(self.options.timeout.as_secs())
        } else if error.is_connect() {
            FetchError::Connect(self.options.base_url.clone())
        } else {
            FetchError::Request(error.without_url().to_string())
        }
    }
}

/// Extract the record array from a browse response body.
pub fn parse_page(body: &str) -> Result<Vec<RawRecord>, FetchError> {
    let mut json: Value =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

    match json.get_mut("near_earth_objects").map(Value::take) {
        Some(Value::Array(records)) => Ok(records),
        _ => Err(FetchError::MissingRecords),
    }
}
