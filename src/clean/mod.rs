//! Record cleaning.
//!
//! Projects raw NeoWs records into [`CleanedRow`]s. A record that cannot be
//! fully parsed is dropped with a reason; it never aborts the batch.

use crate::models::{Approach, CleanedRow, CleanedTable, Diameter, RawRecord, RecordSkip};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Why a single record was dropped.
#[derive(Debug, Error)]
pub enum CleanError {
    #[error("{0}")]
    Shape(#[from] serde_json::Error),

    #[error("invalid diameter bounds (min {min}, max {max})")]
    Diameter { min: f64, max: f64 },

    #[error("invalid close approach: {0}")]
    Approach(String),
}

#[derive(Debug, Deserialize)]
struct NeoRecord {
    id: String,
    name: String,
    estimated_diameter: EstimatedDiameter,
    is_potentially_hazardous_asteroid: bool,
    absolute_magnitude_h: f64,
    #[serde(default)]
    nasa_jpl_url: Option<String>,
    #[serde(default)]
    close_approach_data: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct EstimatedDiameter {
    kilometers: DiameterBounds,
}

#[derive(Debug, Deserialize)]
struct DiameterBounds {
    estimated_diameter_min: f64,
    estimated_diameter_max: f64,
}

#[derive(Debug, Deserialize)]
struct CloseApproach {
    close_approach_date: String,
    miss_distance: MissDistance,
    relative_velocity: RelativeVelocity,
}

#[derive(Debug, Deserialize)]
struct MissDistance {
    kilometers: Numeric,
}

#[derive(Debug, Deserialize)]
struct RelativeVelocity {
    kilometers_per_hour: Numeric,
}

/// NeoWs sends approach figures as strings; plain numbers are accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn parse(&self, field: &str) -> Result<f64, CleanError> {
        let value = match self {
            Numeric::Number(n) => *n,
            Numeric::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| CleanError::Approach(format!("{} {:?}: {}", field, s, e)))?,
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(CleanError::Approach(format!("{} is not finite", field)))
        }
    }
}

/// Output of the cleaning stage.
#[derive(Debug, Default)]
pub struct CleanOutcome {
    pub table: CleanedTable,
    pub skipped: Vec<RecordSkip>,
    /// Rows whose first listed approach is not the most recent one.
    pub ordering_anomalies: usize,
}

/// Clean every record, preserving input order minus dropped records.
pub fn clean_records(records: &[RawRecord]) -> CleanOutcome {
    let mut rows = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();
    let mut ordering_anomalies = 0;

    for (index, raw) in records.iter().enumerate() {
        match clean_record(raw) {
            Ok(row) => {
                if !first_approach_is_latest(raw) {
                    debug!(
                        "{}: first close approach is not the most recent one",
                        row.name
                    );
                    ordering_anomalies += 1;
                }
                rows.push(row);
            }
            Err(e) => {
                let label = record_label(raw);
                warn!("Skipping record {}: {}", label, e);
                skipped.push(RecordSkip {
                    index,
                    label,
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "Cleaned {} of {} records ({} skipped)",
        rows.len(),
        records.len(),
        skipped.len()
    );

    CleanOutcome {
        table: CleanedTable::from_rows(rows),
        skipped,
        ordering_anomalies,
    }
}

/// Clean a single raw record.
pub fn clean_record(raw: &RawRecord) -> Result<CleanedRow, CleanError> {
    let record = NeoRecord::deserialize(raw)?;

    let bounds = &record.estimated_diameter.kilometers;
    let (min, max) = (bounds.estimated_diameter_min, bounds.estimated_diameter_max);
    if !min.is_finite() || !max.is_finite() || min < 0.0 || min > max {
        return Err(CleanError::Diameter { min, max });
    }

    let approaches = record.close_approach_data.unwrap_or_default();
    let latest_approach = match approaches.first() {
        Some(first) => Some(parse_approach(first)?),
        None => None,
    };

    Ok(CleanedRow {
        id: record.id,
        name: record.name,
        diameter: Diameter::new(min, max),
        is_hazardous: record.is_potentially_hazardous_asteroid,
        absolute_magnitude: record.absolute_magnitude_h,
        nasa_jpl_url: record.nasa_jpl_url,
        close_approach_count: approaches.len(),
        latest_approach,
    })
}

fn parse_approach(value: &Value) -> Result<Approach, CleanError> {
    let approach =
        CloseApproach::deserialize(value).map_err(|e| CleanError::Approach(e.to_string()))?;

    let date = NaiveDate::parse_from_str(&approach.close_approach_date, DATE_FORMAT).map_err(
        |e| {
            CleanError::Approach(format!(
                "close_approach_date {:?}: {}",
                approach.close_approach_date, e
            ))
        },
    )?;

    Ok(Approach {
        date,
        miss_distance_km: approach.miss_distance.kilometers.parse("miss_distance")?,
        relative_velocity_kmh: approach
            .relative_velocity
            .kilometers_per_hour
            .parse("relative_velocity")?,
    })
}

/// True unless a later list entry has a more recent date than the first one.
fn first_approach_is_latest(raw: &RawRecord) -> bool {
    let dates: Vec<NaiveDate> = raw
        .get("close_approach_data")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|a| a.get("close_approach_date").and_then(Value::as_str))
                .filter_map(|d| NaiveDate::parse_from_str(d, DATE_FORMAT).ok())
                .collect()
        })
        .unwrap_or_default();

    match dates.split_first() {
        Some((first, rest)) => rest.iter().all(|d| d <= first),
        None => true,
    }
}

fn record_label(raw: &RawRecord) -> String {
    raw.get("name")
        .and_then(Value::as_str)
        .or_else(|| raw.get("id").and_then(Value::as_str))
        .unwrap_or("unknown")
        .to_string()
}
