//! Aggregation and statistics over the cleaned table.
//!
//! Every function here is a read-only view of the rows; nothing feeds back
//! into the table.

use crate::models::{CleanedRow, CleanedTable, SizeCategory};
use serde::Serialize;
use std::collections::HashMap;

/// Descriptive statistics of average diameter (km).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiameterStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

impl DiameterStats {
    /// Compute statistics, or `None` for an empty set.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let count = values.len();
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let median = if count % 2 == 0 {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        } else {
            sorted[count / 2]
        };

        Some(Self {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            mean: sorted.iter().sum::<f64>() / count as f64,
            median,
        })
    }

    /// Statistics of the average diameter of the given rows.
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a CleanedRow>) -> Option<Self> {
        let values: Vec<f64> = rows.into_iter().map(CleanedRow::avg_km).collect();
        Self::from_values(&values)
    }
}

/// Count and share of one size category.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryShare {
    pub category: SizeCategory,
    pub count: usize,
    pub percentage: f64,
}

/// Bucket rows into the five size categories, smallest first.
pub fn size_categories(rows: &[CleanedRow]) -> Vec<CategoryShare> {
    let mut counts: HashMap<SizeCategory, usize> = HashMap::new();
    for row in rows {
        *counts.entry(row.diameter.category()).or_default() += 1;
    }

    let total = rows.len();
    SizeCategory::ALL
        .iter()
        .map(|&category| {
            let count = counts.get(&category).copied().unwrap_or(0);
            let percentage = if total == 0 {
                0.0
            } else {
                count as f64 / total as f64 * 100.0
            };
            CategoryShare {
                category,
                count,
                percentage,
            }
        })
        .collect()
}

/// Close approach totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ApproachStats {
    pub total_approaches: usize,
    pub objects_with_approaches: usize,
    pub mean_per_object: f64,
}

pub fn approach_stats(rows: &[CleanedRow]) -> ApproachStats {
    let total_approaches: usize = rows.iter().map(|r| r.close_approach_count).sum();
    ApproachStats {
        total_approaches,
        objects_with_approaches: rows.iter().filter(|r| r.close_approach_count > 0).count(),
        mean_per_object: if rows.is_empty() {
            0.0
        } else {
            total_approaches as f64 / rows.len() as f64
        },
    }
}

/// The `n` largest rows by average diameter, largest first.
///
/// The sort is stable: equal diameters keep their table order.
pub fn largest<'a>(rows: impl IntoIterator<Item = &'a CleanedRow>, n: usize) -> Vec<&'a CleanedRow> {
    let mut ranked: Vec<&CleanedRow> = rows.into_iter().collect();
    ranked.sort_by(|a, b| b.avg_km().total_cmp(&a.avg_km()));
    ranked.truncate(n);
    ranked
}

/// One equal-width histogram bin; `upper` is exclusive except for the last bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Split `values` into `bins` equal-width bins spanning their min..max.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    // A single distinct value still needs a visible bar.
    let (bins, width) = if max > min {
        (bins, (max - min) / bins as f64)
    } else {
        (1, if min > 0.0 { min * 0.1 } else { 1e-3 })
    };

    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: min + width * i as f64,
            upper: min + width * (i + 1) as f64,
            count,
        })
        .collect()
}

/// Count `values` into the bin edges of an existing histogram.
///
/// Used to overlay subsets on a shared x axis. Values outside the template
/// range land in the nearest end bin.
pub fn histogram_like(template: &[HistogramBin], values: &[f64]) -> Vec<HistogramBin> {
    let mut bins: Vec<HistogramBin> = template
        .iter()
        .map(|b| HistogramBin { count: 0, ..*b })
        .collect();
    if bins.is_empty() {
        return bins;
    }

    let last = bins.len() - 1;
    for &v in values {
        let idx = bins
            .iter()
            .position(|b| v < b.upper)
            .unwrap_or(last);
        bins[idx].count += 1;
    }
    bins
}

/// How many objects have each close-approach count, most common first.
///
/// Returns `(approach_count, objects)` pairs, at most `limit` of them.
pub fn approach_frequency<'a>(
    rows: impl IntoIterator<Item = &'a CleanedRow>,
    limit: usize,
) -> Vec<(usize, usize)> {
    let mut freq: HashMap<usize, usize> = HashMap::new();
    for row in rows {
        *freq.entry(row.close_approach_count).or_default() += 1;
    }

    let mut pairs: Vec<(usize, usize)> = freq.into_iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    pairs.truncate(limit);
    pairs
}

/// Everything the reporters need, computed once from the table.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub total: usize,
    pub hazardous_count: usize,
    pub non_hazardous_count: usize,
    pub overall: Option<DiameterStats>,
    /// `None` when no hazardous objects were found.
    pub hazardous: Option<DiameterStats>,
    pub non_hazardous: Option<DiameterStats>,
    pub size_categories: Vec<CategoryShare>,
    pub approaches: ApproachStats,
    pub largest: Vec<CleanedRow>,
    pub largest_hazardous: Vec<CleanedRow>,
}

impl Summary {
    pub fn from_table(table: &CleanedTable, top_n: usize) -> Self {
        let rows = table.rows();
        let hazardous_count = table.hazardous().count();

        Self {
            total: rows.len(),
            hazardous_count,
            non_hazardous_count: rows.len() - hazardous_count,
            overall: DiameterStats::from_rows(rows),
            hazardous: DiameterStats::from_rows(table.hazardous()),
            non_hazardous: DiameterStats::from_rows(table.non_hazardous()),
            size_categories: size_categories(rows),
            approaches: approach_stats(rows),
            largest: largest(rows, top_n).into_iter().cloned().collect(),
            largest_hazardous: largest(table.hazardous(), top_n)
                .into_iter()
                .cloned()
                .collect(),
        }
    }
}
