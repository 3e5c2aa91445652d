//! Text report generation.
//!
//! This module renders the console summary, the persisted plain-text
//! report and the optional JSON summary.

use crate::analysis::{DiameterStats, Summary};
use crate::models::{CleanedRow, ReportMetadata, RunReport};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Width of the name column in ranked lists.
const NAME_WIDTH: usize = 20;

/// Text report file name for a generation time.
pub fn report_file_name(at: &DateTime<Local>) -> String {
    format!("asteroid_analysis_report_{}.txt", at.format("%Y%m%d_%H%M%S"))
}

/// Generate the complete text report.
pub fn generate_text_report(summary: &Summary, metadata: &ReportMetadata) -> String {
    let mut output = String::new();

    output.push_str("NASA NEAR-EARTH OBJECT ANALYSIS REPORT\n");
    output.push_str(&"=".repeat(50));
    output.push_str("\n\n");

    output.push_str(&generate_metadata_section(summary, metadata));
    output.push_str(&generate_statistics_section(summary));
    output.push_str(&generate_ranking_section(summary));

    output.push_str(&format!(
        "\nReport file: {}\n",
        report_file_name(&metadata.generated_at)
    ));

    output
}

/// Generate the metadata block.
fn generate_metadata_section(summary: &Summary, metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str(&format!(
        "Report date: {}\n",
        metadata.generated_at.format("%d.%m.%Y %H:%M")
    ));
    section.push_str(&format!("Source: {}\n", metadata.source));
    section.push_str(&format!(
        "Pages fetched: {}/{}\n",
        metadata.pages_ok, metadata.pages_requested
    ));
    section.push_str(&format!(
        "Records fetched: {} ({} skipped while cleaning)\n",
        metadata.records_fetched, metadata.records_skipped
    ));
    section.push_str(&format!("Objects analyzed: {}\n\n", summary.total));

    section
}

/// Generate the summary statistics block.
fn generate_statistics_section(summary: &Summary) -> String {
    let mut section = String::new();

    section.push_str("SUMMARY STATISTICS:\n");
    section.push_str(&format!(
        "- Hazardous objects: {}\n",
        summary.hazardous_count
    ));
    section.push_str(&format!(
        "- Non-hazardous objects: {}\n",
        summary.non_hazardous_count
    ));
    section.push_str(&stats_lines("All objects", summary.overall.as_ref()));
    section.push_str(&stats_lines("Hazardous", summary.hazardous.as_ref()));
    section.push_str(&stats_lines("Non-hazardous", summary.non_hazardous.as_ref()));

    section.push_str("- Size categories:\n");
    for share in &summary.size_categories {
        section.push_str(&format!(
            "    {:<11} ({:>10}): {:>5} ({:5.1}%)\n",
            share.category.to_string(),
            share.category.range_label(),
            share.count,
            share.percentage
        ));
    }

    section.push_str(&format!(
        "- Close approaches: {} total, {} objects with at least one, {:.1} per object\n\n",
        summary.approaches.total_approaches,
        summary.approaches.objects_with_approaches,
        summary.approaches.mean_per_object
    ));

    section
}

fn stats_lines(label: &str, stats: Option<&DiameterStats>) -> String {
    match stats {
        Some(s) => format!(
            "- {} diameter (km): min {:.4}, max {:.2}, mean {:.2}, median {:.2} (n={})\n",
            label, s.min, s.max, s.mean, s.median, s.count
        ),
        None => format!("- {} diameter (km): n/a\n", label),
    }
}

/// Generate the ranked top list with fixed-width columns.
fn generate_ranking_section(summary: &Summary) -> String {
    ranked_list(
        &format!("TOP {} LARGEST OBJECTS:", summary.largest.len()),
        &summary.largest,
    )
}

fn ranked_list(title: &str, rows: &[CleanedRow]) -> String {
    let mut section = String::new();

    section.push_str(title);
    section.push('\n');
    for (i, row) in rows.iter().enumerate() {
        section.push_str(&format!(
            "{:2}. {:<width$} - {:6.2} km - {}\n",
            i + 1,
            fit_width(&row.name, NAME_WIDTH),
            row.avg_km(),
            row.hazard_label(),
            width = NAME_WIDTH
        ));
    }

    section
}

/// Truncate a name to at most `width` characters.
fn fit_width(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        name.to_string()
    } else {
        let mut short: String = name.chars().take(width - 1).collect();
        short.push('…');
        short
    }
}

/// Generate the console summary printed after the charts.
pub fn generate_console_summary(summary: &Summary) -> String {
    let mut lines = Vec::new();

    lines.push("=".repeat(50));
    lines.push("📊 NEAR-EARTH OBJECT ANALYSIS - SUMMARY".to_string());
    lines.push("=".repeat(50));
    lines.push(format!("📈 Total objects: {}", summary.total));
    lines.push(format!("🔴 Hazardous: {}", summary.hazardous_count));
    lines.push(format!("🟢 Non-hazardous: {}", summary.non_hazardous_count));

    lines.push(String::new());
    lines.push("📏 Size statistics:".to_string());
    match summary.overall {
        Some(s) => {
            lines.push(format!("   • Smallest: {:.4} km", s.min));
            lines.push(format!("   • Largest: {:.2} km", s.max));
            lines.push(format!("   • Mean diameter: {:.2} km", s.mean));
            lines.push(format!("   • Median diameter: {:.2} km", s.median));
        }
        None => lines.push("   • n/a".to_string()),
    }

    lines.push(String::new());
    lines.push("⚠️  Hazardous objects:".to_string());
    match summary.hazardous {
        Some(s) => {
            lines.push(format!("   • Mean diameter: {:.2} km", s.mean));
            lines.push(format!("   • Largest hazardous: {:.2} km", s.max));
            lines.push(format!("   • Smallest hazardous: {:.4} km", s.min));
        }
        None => lines.push("   • None found".to_string()),
    }

    lines.push(String::new());
    lines.push("🌍 Close approaches:".to_string());
    lines.push(format!(
        "   • Recorded approaches: {}",
        summary.approaches.total_approaches
    ));
    lines.push(format!(
        "   • Mean approaches per object: {:.1}",
        summary.approaches.mean_per_object
    ));

    lines.push(String::new());
    lines.push("📊 Size categories:".to_string());
    for share in &summary.size_categories {
        lines.push(format!(
            "   • {} ({}): {} objects ({:.1}%)",
            share.category,
            share.category.range_label(),
            share.count,
            share.percentage
        ));
    }

    lines.push(String::new());
    lines.push(generate_ranking_section(summary));

    if !summary.largest_hazardous.is_empty() {
        lines.push(ranked_list(
            &format!(
                "TOP {} LARGEST HAZARDOUS OBJECTS:",
                summary.largest_hazardous.len()
            ),
            &summary.largest_hazardous,
        ));
    }

    lines.join("\n")
}

/// Describe what was skipped during the run; empty when nothing was.
pub fn generate_skip_summary(run: &RunReport) -> String {
    let mut lines = Vec::new();

    for page in run.pages.iter().filter(|p| p.error.is_some()) {
        lines.push(format!(
            "   - page {}: {}",
            page.page + 1,
            page.error.as_deref().unwrap_or_default()
        ));
    }
    for skip in &run.record_skips {
        lines.push(format!("   - record {}: {}", skip.label, skip.reason));
    }
    for failure in &run.render_failures {
        lines.push(format!("   - {}: {}", failure.artifact, failure.reason));
    }
    if run.approach_ordering_anomalies > 0 {
        lines.push(format!(
            "   - {} objects list an older close approach first; the first entry was used",
            run.approach_ordering_anomalies
        ));
    }

    if lines.is_empty() {
        return String::new();
    }

    let mut header = vec![format!(
        "⚠️  Skipped: {} pages, {} records, {} outputs",
        run.pages_failed(),
        run.record_skips.len(),
        run.render_failures.len()
    )];
    header.append(&mut lines);
    header.join("\n")
}

/// Write the text report into `dir`, returning its path.
pub fn write_text_report(
    dir: &Path,
    summary: &Summary,
    metadata: &ReportMetadata,
) -> Result<PathBuf> {
    let path = dir.join(report_file_name(&metadata.generated_at));
    let content = generate_text_report(summary, metadata);

    let file = File::create(&path)
        .with_context(|| format!("Failed to create report {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(content.as_bytes())
        .and_then(|_| writer.flush())
        .with_context(|| format!("Failed to write report {}", path.display()))?;

    Ok(path)
}

/// Generate the JSON summary.
pub fn generate_json_summary(summary: &Summary) -> Result<String> {
    serde_json::to_string_pretty(summary).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CleanedRow, CleanedTable, Diameter, PageReport, RecordSkip};
    use chrono::TimeZone;

    fn row(name: &str, min: f64, max: f64, hazardous: bool) -> CleanedRow {
        CleanedRow {
            id: name.to_string(),
            name: name.to_string(),
            diameter: Diameter::new(min, max),
            is_hazardous: hazardous,
            absolute_magnitude: 18.0,
            nasa_jpl_url: None,
            close_approach_count: 2,
            latest_approach: None,
        }
    }

    fn metadata() -> ReportMetadata {
        ReportMetadata {
            generated_at: Local.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap(),
            source: "https://api.nasa.gov/neo/rest/v1".to_string(),
            pages_requested: 10,
            pages_ok: 9,
            records_fetched: 180,
            records_skipped: 1,
        }
    }

    fn summary(rows: Vec<CleanedRow>) -> Summary {
        Summary::from_table(&CleanedTable::from_rows(rows), 10)
    }

    #[test]
    fn test_report_file_name_embeds_timestamp() {
        assert_eq!(
            report_file_name(&metadata().generated_at),
            "asteroid_analysis_report_20240506_070809.txt"
        );
    }

    #[test]
    fn test_generate_text_report() {
        let s = summary(vec![
            row("433 Eros (A898 PA)", 20.0, 40.0, false),
            row("(2010 AB)", 0.1, 0.3, true),
        ]);
        let report = generate_text_report(&s, &metadata());

        assert!(report.starts_with("NASA NEAR-EARTH OBJECT ANALYSIS REPORT\n"));
        assert!(report.contains("Report date: 06.05.2024 07:08"));
        assert!(report.contains("Pages fetched: 9/10"));
        assert!(report.contains("Objects analyzed: 2"));
        assert!(report.contains("SUMMARY STATISTICS:"));
        assert!(report.contains("- Hazardous objects: 1"));
        assert!(report.contains("TOP 2 LARGEST OBJECTS:"));
        assert!(report.contains(" 1. 433 Eros (A898 PA)   -  30.00 km - 🟢 SAFE"));
        assert!(report.contains(" 2. (2010 AB)            -   0.20 km - 🔴 HAZARDOUS"));
        assert!(report.contains("Report file: asteroid_analysis_report_20240506_070809.txt"));
    }

    #[test]
    fn test_report_marks_missing_hazardous_stats() {
        let s = summary(vec![row("a", 0.1, 0.2, false)]);
        let report = generate_text_report(&s, &metadata());
        assert!(report.contains("- Hazardous diameter (km): n/a"));

        let console = generate_console_summary(&s);
        assert!(console.contains("None found"));
        assert!(!console.contains("LARGEST HAZARDOUS"));
    }

    #[test]
    fn test_console_summary_ranks_hazardous_objects() {
        let s = summary(vec![
            row("(2001 AA)", 0.1, 0.3, true),
            row("(2002 BB)", 4.0, 6.0, false),
            row("(2003 CC)", 1.0, 3.0, true),
        ]);
        let console = generate_console_summary(&s);

        assert!(console.contains("TOP 3 LARGEST OBJECTS:"));
        let section = console
            .split("TOP 2 LARGEST HAZARDOUS OBJECTS:\n")
            .nth(1)
            .unwrap();
        let lines: Vec<&str> = section.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(" 1. (2003 CC)"));
        assert!(lines[1].starts_with(" 2. (2001 AA)"));
    }

    #[test]
    fn test_long_names_keep_column_width() {
        let name = "a very long object designation exceeding the column";
        let fitted = fit_width(name, NAME_WIDTH);
        assert_eq!(fitted.chars().count(), NAME_WIDTH);
        assert_eq!(fit_width("short", NAME_WIDTH), "short");
    }

    #[test]
    fn test_skip_summary() {
        let mut run = RunReport::new(Local::now());
        assert!(generate_skip_summary(&run).is_empty());

        run.pages.push(PageReport {
            page: 2,
            records: None,
            error: Some("request timed out after 10s".to_string()),
        });
        run.record_skips.push(RecordSkip {
            index: 4,
            label: "(2001 XY)".to_string(),
            reason: "missing field `estimated_diameter`".to_string(),
        });

        let text = generate_skip_summary(&run);
        assert!(text.contains("1 pages, 1 records, 0 outputs"));
        assert!(text.contains("page 3: request timed out"));
        assert!(text.contains("(2001 XY)"));
    }

    #[test]
    fn test_write_text_report() {
        let dir = tempfile::TempDir::new().unwrap();
        let s = summary(vec![row("a", 0.1, 0.2, true)]);

        let path = write_text_report(dir.path(), &s, &metadata()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Objects analyzed: 1"));
        assert!(path.ends_with("asteroid_analysis_report_20240506_070809.txt"));
    }

    #[test]
    fn test_generate_json_summary() {
        let s = summary(vec![row("a", 0.1, 0.2, true)]);
        let json = generate_json_summary(&s).unwrap();
        assert!(json.contains("\"size_categories\""));
        assert!(json.contains("\"hazardous_count\": 1"));
        assert!(json.contains("\"non_hazardous\": null"));
    }
}
