//! Data models for the NEO pipeline.
//!
//! This module contains the core data structures shared by the fetcher,
//! the cleaner and the reporters: cleaned rows, size categories and the
//! run-level report of everything that was skipped along the way.

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A record exactly as returned by the NeoWs API.
pub type RawRecord = serde_json::Value;

/// Size category of an object, by average diameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeCategory {
    /// Below 0.1 km
    VerySmall,
    /// 0.1 km up to 0.5 km
    Small,
    /// 0.5 km up to 1 km
    Medium,
    /// 1 km up to 5 km
    Large,
    /// 5 km and above
    VeryLarge,
}

impl SizeCategory {
    /// All categories, smallest first.
    pub const ALL: [SizeCategory; 5] = [
        SizeCategory::VerySmall,
        SizeCategory::Small,
        SizeCategory::Medium,
        SizeCategory::Large,
        SizeCategory::VeryLarge,
    ];

    /// Bucket an average diameter (km) into its right-open range.
    pub fn from_diameter(avg_km: f64) -> Self {
        if avg_km < 0.1 {
            SizeCategory::VerySmall
        } else if avg_km < 0.5 {
            SizeCategory::Small
        } else if avg_km < 1.0 {
            SizeCategory::Medium
        } else if avg_km < 5.0 {
            SizeCategory::Large
        } else {
            SizeCategory::VeryLarge
        }
    }

    /// Range label used in charts and reports.
    pub fn range_label(&self) -> &'static str {
        match self {
            SizeCategory::VerySmall => "<0.1 km",
            SizeCategory::Small => "0.1-0.5 km",
            SizeCategory::Medium => "0.5-1 km",
            SizeCategory::Large => "1-5 km",
            SizeCategory::VeryLarge => ">=5 km",
        }
    }
}

impl fmt::Display for SizeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeCategory::VerySmall => write!(f, "Very small"),
            SizeCategory::Small => write!(f, "Small"),
            SizeCategory::Medium => write!(f, "Medium"),
            SizeCategory::Large => write!(f, "Large"),
            SizeCategory::VeryLarge => write!(f, "Very large"),
        }
    }
}

/// Estimated diameter bounds in kilometers.
///
/// The average is derived once in [`Diameter::new`]; there is no way to
/// change any of the three values afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Diameter {
    min_km: f64,
    max_km: f64,
    avg_km: f64,
}

impl Diameter {
    pub fn new(min_km: f64, max_km: f64) -> Self {
        Self {
            min_km,
            max_km,
            avg_km: (min_km + max_km) / 2.0,
        }
    }

    pub fn min_km(&self) -> f64 {
        self.min_km
    }

    pub fn max_km(&self) -> f64 {
        self.max_km
    }

    pub fn avg_km(&self) -> f64 {
        self.avg_km
    }

    pub fn category(&self) -> SizeCategory {
        SizeCategory::from_diameter(self.avg_km)
    }
}

/// The close approach picked to represent an object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Approach {
    pub date: NaiveDate,
    pub miss_distance_km: f64,
    pub relative_velocity_kmh: f64,
}

/// One flattened, fully parsed NEO record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanedRow {
    pub id: String,
    pub name: String,
    pub diameter: Diameter,
    pub is_hazardous: bool,
    pub absolute_magnitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nasa_jpl_url: Option<String>,
    pub close_approach_count: usize,
    /// Present only when the record listed at least one close approach.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_approach: Option<Approach>,
}

impl CleanedRow {
    /// Shorthand for the average diameter in km.
    pub fn avg_km(&self) -> f64 {
        self.diameter.avg_km()
    }

    /// Short hazard marker used in reports.
    pub fn hazard_label(&self) -> &'static str {
        if self.is_hazardous {
            "🔴 HAZARDOUS"
        } else {
            "🟢 SAFE"
        }
    }
}

/// The cleaned rows of a run, in fetch order.
///
/// Built once from the raw records and never modified afterwards.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanedTable {
    rows: Vec<CleanedRow>,
}

impl CleanedTable {
    pub fn from_rows(rows: Vec<CleanedRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[CleanedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn hazardous(&self) -> impl Iterator<Item = &CleanedRow> {
        self.rows.iter().filter(|r| r.is_hazardous)
    }

    pub fn non_hazardous(&self) -> impl Iterator<Item = &CleanedRow> {
        self.rows.iter().filter(|r| !r.is_hazardous)
    }
}

/// The result of one page request.
#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
    /// Zero-based page index.
    pub page: u32,
    /// Number of records the page contributed, if it succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<usize>,
    /// Why the page was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A raw record that the cleaner dropped.
#[derive(Debug, Clone, Serialize)]
pub struct RecordSkip {
    /// Position in the fetched sequence.
    pub index: usize,
    /// Record name when available, otherwise its id or "unknown".
    pub label: String,
    pub reason: String,
}

/// An output artifact that could not be produced.
#[derive(Debug, Clone, Serialize)]
pub struct RenderFailure {
    pub artifact: String,
    pub reason: String,
}

/// Metadata printed at the top of the text report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// When the report was generated.
    pub generated_at: DateTime<Local>,
    /// API the records came from.
    pub source: String,
    pub pages_requested: usize,
    pub pages_ok: usize,
    pub records_fetched: usize,
    pub records_skipped: usize,
}

/// Everything that happened during a run that did not abort it.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Local>,
    pub pages: Vec<PageReport>,
    pub records_fetched: usize,
    pub rows_cleaned: usize,
    pub record_skips: Vec<RecordSkip>,
    pub approach_ordering_anomalies: usize,
    pub render_failures: Vec<RenderFailure>,
    pub written: Vec<String>,
}

impl RunReport {
    pub fn new(started_at: DateTime<Local>) -> Self {
        Self {
            started_at,
            pages: Vec::new(),
            records_fetched: 0,
            rows_cleaned: 0,
            record_skips: Vec::new(),
            approach_ordering_anomalies: 0,
            render_failures: Vec::new(),
            written: Vec::new(),
        }
    }

    pub fn pages_ok(&self) -> usize {
        self.pages.iter().filter(|p| p.error.is_none()).count()
    }

    pub fn pages_failed(&self) -> usize {
        self.pages.len() - self.pages_ok()
    }

    /// Record the outcome of a single render step.
    pub fn record_render(&mut self, artifact: &str, result: Result<(), String>) {
        match result {
            Ok(()) => self.written.push(artifact.to_string()),
            Err(reason) => self.render_failures.push(RenderFailure {
                artifact: artifact.to_string(),
                reason,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diameter_average_is_midpoint() {
        let d = Diameter::new(0.2, 0.4);
        assert!((d.avg_km() - 0.3).abs() < 1e-12);
        assert_eq!(d.min_km(), 0.2);
        assert_eq!(d.max_km(), 0.4);
    }

    #[test]
    fn test_size_category_boundaries_are_right_open() {
        assert_eq!(SizeCategory::from_diameter(0.0), SizeCategory::VerySmall);
        assert_eq!(SizeCategory::from_diameter(0.0999), SizeCategory::VerySmall);
        assert_eq!(SizeCategory::from_diameter(0.1), SizeCategory::Small);
        assert_eq!(SizeCategory::from_diameter(0.5), SizeCategory::Medium);
        assert_eq!(SizeCategory::from_diameter(1.0), SizeCategory::Large);
        assert_eq!(SizeCategory::from_diameter(4.999), SizeCategory::Large);
        assert_eq!(SizeCategory::from_diameter(5.0), SizeCategory::VeryLarge);
        assert_eq!(SizeCategory::from_diameter(250.0), SizeCategory::VeryLarge);
    }

    #[test]
    fn test_size_category_ordering() {
        assert!(SizeCategory::VerySmall < SizeCategory::Small);
        assert!(SizeCategory::Large < SizeCategory::VeryLarge);
        assert_eq!(SizeCategory::ALL.len(), 5);
    }

    #[test]
    fn test_run_report_counts() {
        let mut report = RunReport::new(Local::now());
        report.pages.push(PageReport {
            page: 0,
            records: Some(20),
            error: None,
        });
        report.pages.push(PageReport {
            page: 1,
            records: None,
            error: Some("request timed out".to_string()),
        });

        assert_eq!(report.pages_ok(), 1);
        assert_eq!(report.pages_failed(), 1);

        report.record_render("a.png", Ok(()));
        report.record_render("b.html", Err("disk full".to_string()));
        assert_eq!(report.written, vec!["a.png"]);
        assert_eq!(report.render_failures.len(), 1);
        assert_eq!(report.render_failures[0].artifact, "b.html");
    }
}
