//! Static PNG charts.
//!
//! Each public function renders one image file. Failures are returned to
//! the caller, which records them and carries on with the other outputs.

use crate::analysis::{approach_frequency, histogram, histogram_like, largest, HistogramBin, Summary};
use crate::models::{CleanedRow, CleanedTable};
use plotters::coord::ranged1d::{IntoSegmentedCoord, SegmentValue};
use plotters::coord::Shift;
use plotters::data::Quartiles;
use plotters::element::Boxplot;
use plotters::prelude::*;
use std::error::Error;
use std::path::Path;

pub const SIZE_DISTRIBUTION: &str = "size_distribution.png";
pub const HAZARD_DISTRIBUTION: &str = "hazard_distribution.png";
pub const LARGEST_OBJECTS: &str = "largest_asteroids.png";
pub const HAZARDOUS_OBJECTS: &str = "hazardous_asteroids.png";

type DrawResult = Result<(), Box<dyn Error>>;
type Panel<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

const FONT: &str = "sans-serif";
const CANVAS: (u32, u32) = (1600, 1200);
const WIDE_CANVAS: (u32, u32) = (1800, 900);

const HAZARD_COLOR: RGBColor = RGBColor(231, 76, 60);
const SAFE_COLOR: RGBColor = RGBColor(46, 204, 113);
const NEUTRAL_COLOR: RGBColor = RGBColor(52, 152, 219);
const ACCENT_COLOR: RGBColor = RGBColor(243, 156, 18);

fn hazard_color(row: &CleanedRow) -> RGBColor {
    if row.is_hazardous {
        HAZARD_COLOR
    } else {
        NEUTRAL_COLOR
    }
}

fn diameters<'a>(rows: impl IntoIterator<Item = &'a CleanedRow>) -> Vec<f64> {
    rows.into_iter().map(CleanedRow::avg_km).collect()
}

/// Histogram, box plot, hazardous vs safe overlay, size categories.
pub fn render_size_distribution(path: &Path, table: &CleanedTable, summary: &Summary) -> DrawResult {
    let root = BitMapBackend::new(path, CANVAS).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((2, 2));

    let all = diameters(table.rows());
    draw_histogram(&panels[0], "Size distribution", &histogram(&all, 30), NEUTRAL_COLOR)?;

    draw_boxplot(&panels[1], "Size spread and outliers", &all)?;

    let shared = histogram(&all, 20);
    draw_overlay(
        &panels[2],
        "Hazardous vs safe sizes",
        &histogram_like(&shared, &diameters(table.hazardous())),
        &histogram_like(&shared, &diameters(table.non_hazardous())),
    )?;

    let bars: Vec<(String, usize, RGBColor)> = summary
        .size_categories
        .iter()
        .map(|s| (s.category.range_label().to_string(), s.count, NEUTRAL_COLOR))
        .collect();
    draw_count_bars(&panels[3], "Size categories", &bars)?;

    root.present()?;
    Ok(())
}

/// Hazardous vs safe counts and the hazardous size histogram.
pub fn render_hazard_distribution(path: &Path, table: &CleanedTable, summary: &Summary) -> DrawResult {
    let root = BitMapBackend::new(path, WIDE_CANVAS).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((1, 2));

    let bars = vec![
        ("Safe".to_string(), summary.non_hazardous_count, SAFE_COLOR),
        ("Hazardous".to_string(), summary.hazardous_count, HAZARD_COLOR),
    ];
    draw_count_bars(&panels[0], "Hazardous vs safe objects", &bars)?;

    if summary.hazardous_count > 0 {
        let bins = histogram(&diameters(table.hazardous()), 20);
        draw_histogram(&panels[1], "Hazardous size distribution", &bins, HAZARD_COLOR)?;
    } else {
        draw_message(&panels[1], "No hazardous objects found")?;
    }

    root.present()?;
    Ok(())
}

/// The largest `n` objects colored by hazard, and the hazard split above 1 km.
pub fn render_largest(path: &Path, table: &CleanedTable, n: usize) -> DrawResult {
    let root = BitMapBackend::new(path, WIDE_CANVAS).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((1, 2));

    let top = largest(table.rows(), n);
    draw_ranked_bars(
        &panels[0],
        &format!("Largest {} objects (red: hazardous)", top.len()),
        &top,
    )?;

    let large: Vec<&CleanedRow> = table.rows().iter().filter(|r| r.avg_km() >= 1.0).collect();
    if large.is_empty() {
        draw_message(&panels[1], "No objects of 1 km or more")?;
    } else {
        let hazardous = large.iter().filter(|r| r.is_hazardous).count();
        let bars = vec![
            ("Safe".to_string(), large.len() - hazardous, NEUTRAL_COLOR),
            ("Hazardous".to_string(), hazardous, HAZARD_COLOR),
        ];
        draw_count_bars(&panels[1], "Hazard split of objects >= 1 km", &bars)?;
    }

    root.present()?;
    Ok(())
}

/// Detail views of the hazardous subset. Callers skip this when it is empty.
///
/// The ranking panel shows `summary.largest_hazardous`.
pub fn render_hazardous(path: &Path, table: &CleanedTable, summary: &Summary) -> DrawResult {
    let hazardous: Vec<&CleanedRow> = table.hazardous().collect();

    let root = BitMapBackend::new(path, CANVAS).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((2, 2));

    let bins = histogram(&diameters(hazardous.iter().copied()), 15);
    draw_histogram(&panels[0], "Hazardous size distribution", &bins, HAZARD_COLOR)?;

    let top: Vec<&CleanedRow> = summary.largest_hazardous.iter().collect();
    draw_ranked_bars(
        &panels[1],
        &format!("Largest {} hazardous objects", top.len()),
        &top,
    )?;

    draw_scatter(
        &panels[2],
        "Hazardous: magnitude vs diameter",
        hazardous.iter().copied(),
    )?;

    let bars: Vec<(String, usize, RGBColor)> = approach_frequency(hazardous.iter().copied(), 10)
        .into_iter()
        .map(|(approaches, objects)| (approaches.to_string(), objects, ACCENT_COLOR))
        .collect();
    draw_count_bars(&panels[3], "Close approaches per hazardous object", &bars)?;

    root.present()?;
    Ok(())
}

fn draw_histogram(area: &Panel<'_>, caption: &str, bins: &[HistogramBin], color: RGBColor) -> DrawResult {
    if bins.is_empty() {
        return draw_message(area, "No data");
    }

    let x_min = bins[0].lower;
    let x_max = bins[bins.len() - 1].upper;
    let y_max = bins.iter().map(|b| b.count).max().unwrap_or(0) as u32 + 1;

    let mut chart = ChartBuilder::on(area)
        .caption(caption, (FONT, 26))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(x_min..x_max, 0u32..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Average diameter (km)")
        .y_desc("Objects")
        .draw()?;

    chart.draw_series(bins.iter().map(|b| {
        Rectangle::new([(b.lower, 0), (b.upper, b.count as u32)], color.mix(0.7).filled())
    }))?;

    Ok(())
}

/// Vertical box plot with 1.5 IQR whiskers; points beyond them are drawn
/// as outliers.
fn draw_boxplot(area: &Panel<'_>, caption: &str, values: &[f64]) -> DrawResult {
    if values.is_empty() {
        return draw_message(area, "No data");
    }

    let quartiles = Quartiles::new(values);
    let [lower_fence, _, _, _, upper_fence] = quartiles.values();
    let outliers: Vec<f32> = values
        .iter()
        .map(|&v| v as f32)
        .filter(|&v| v < lower_fence || v > upper_fence)
        .collect();

    let (lo, hi) = values
        .iter()
        .map(|&v| v as f32)
        .chain([lower_fence, upper_fence])
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 0.5 };

    let mut chart = ChartBuilder::on(area)
        .caption(caption, (FONT, 26))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d((0..1).into_segmented(), (lo - pad)..(hi + pad))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(1)
        .x_label_formatter(&|v: &SegmentValue<i32>| segment_label(v, &["All objects"]))
        .y_desc("Average diameter (km)")
        .draw()?;

    chart.draw_series([Boxplot::new_vertical(SegmentValue::CenterOf(0), &quartiles)
        .width(80)
        .whisker_width(0.5)
        .style(NEUTRAL_COLOR)])?;

    chart.draw_series(outliers.iter().map(|&v| {
        Circle::new((SegmentValue::CenterOf(0), v), 3, HAZARD_COLOR.mix(0.6).filled())
    }))?;

    Ok(())
}

fn draw_overlay(
    area: &Panel<'_>,
    caption: &str,
    hazardous: &[HistogramBin],
    safe: &[HistogramBin],
) -> DrawResult {
    if safe.is_empty() {
        return draw_message(area, "No data");
    }

    let x_min = safe[0].lower;
    let x_max = safe[safe.len() - 1].upper;
    let y_max = hazardous
        .iter()
        .chain(safe.iter())
        .map(|b| b.count)
        .max()
        .unwrap_or(0) as u32
        + 1;

    let mut chart = ChartBuilder::on(area)
        .caption(caption, (FONT, 26))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(x_min..x_max, 0u32..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Average diameter (km)")
        .y_desc("Objects")
        .draw()?;

    chart
        .draw_series(safe.iter().map(|b| {
            Rectangle::new([(b.lower, 0), (b.upper, b.count as u32)], SAFE_COLOR.mix(0.6).filled())
        }))?
        .label("Safe")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], SAFE_COLOR.filled()));

    chart
        .draw_series(hazardous.iter().map(|b| {
            Rectangle::new([(b.lower, 0), (b.upper, b.count as u32)], HAZARD_COLOR.mix(0.6).filled())
        }))?
        .label("Hazardous")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], HAZARD_COLOR.filled()));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    Ok(())
}

/// Vertical bars, one per `(label, count, color)`.
fn draw_count_bars(area: &Panel<'_>, caption: &str, bars: &[(String, usize, RGBColor)]) -> DrawResult {
    if bars.is_empty() {
        return draw_message(area, "No data");
    }

    let n = bars.len() as i32;
    let y_max = bars.iter().map(|b| b.1).max().unwrap_or(0) as u32 + 1;
    let labels: Vec<&str> = bars.iter().map(|b| b.0.as_str()).collect();

    let mut chart = ChartBuilder::on(area)
        .caption(caption, (FONT, 26))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d((0..n).into_segmented(), 0u32..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len())
        .x_label_formatter(&|v: &SegmentValue<i32>| segment_label(v, &labels))
        .y_desc("Objects")
        .draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(i, (_, count, color))| {
        let i = i as i32;
        Rectangle::new(
            [(SegmentValue::Exact(i), 0), (SegmentValue::Exact(i + 1), *count as u32)],
            color.mix(0.8).filled(),
        )
    }))?;

    Ok(())
}

/// Horizontal bars by average diameter, first row at the top.
fn draw_ranked_bars(area: &Panel<'_>, caption: &str, rows: &[&CleanedRow]) -> DrawResult {
    if rows.is_empty() {
        return draw_message(area, "No data");
    }

    let n = rows.len() as i32;
    let x_max = rows.iter().map(|r| r.avg_km()).fold(0.0, f64::max) * 1.1;
    let x_max = if x_max > 0.0 { x_max } else { 1.0 };
    // Slot 0 is the bottom of the chart, so the ranking is drawn in reverse.
    let labels: Vec<&str> = rows.iter().rev().map(|r| r.name.as_str()).collect();

    let mut chart = ChartBuilder::on(area)
        .caption(caption, (FONT, 26))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(220)
        .build_cartesian_2d(0f64..x_max, (0..n).into_segmented())?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(rows.len())
        .y_label_formatter(&|v: &SegmentValue<i32>| segment_label(v, &labels))
        .x_desc("Average diameter (km)")
        .draw()?;

    chart.draw_series(rows.iter().enumerate().map(|(i, row)| {
        let slot = n - 1 - i as i32;
        Rectangle::new(
            [(0.0, SegmentValue::Exact(slot)), (row.avg_km(), SegmentValue::Exact(slot + 1))],
            hazard_color(row).mix(0.75).filled(),
        )
    }))?;

    Ok(())
}

fn draw_scatter<'a>(
    area: &Panel<'_>,
    caption: &str,
    rows: impl IntoIterator<Item = &'a CleanedRow>,
) -> DrawResult {
    let points: Vec<(f64, f64, RGBColor)> = rows
        .into_iter()
        .map(|r| (r.absolute_magnitude, r.avg_km(), hazard_color(r)))
        .collect();
    if points.is_empty() {
        return draw_message(area, "No data");
    }

    let (mut x_min, mut x_max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.0), hi.max(p.0)));
    if x_max - x_min < 1.0 {
        x_min -= 0.5;
        x_max += 0.5;
    }
    let y_max = points.iter().map(|p| p.1).fold(0.0, f64::max) * 1.1;
    let y_max = if y_max > 0.0 { y_max } else { 1.0 };

    let mut chart = ChartBuilder::on(area)
        .caption(caption, (FONT, 26))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(x_min..x_max, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Absolute magnitude (H)")
        .y_desc("Average diameter (km)")
        .draw()?;

    chart.draw_series(
        points
            .iter()
            .map(|&(x, y, color)| Circle::new((x, y), 4, color.mix(0.6).filled())),
    )?;

    Ok(())
}

fn draw_message(area: &Panel<'_>, message: &str) -> DrawResult {
    let (width, height) = area.dim_in_pixel();
    let x = (width / 2) as i32 - (message.len() as i32 * 6);
    let y = (height / 2) as i32;
    area.draw(&Text::new(message.to_string(), (x, y), (FONT, 28).into_font()))?;
    Ok(())
}

/// Label for the center of a segment; boundaries stay blank.
fn segment_label(value: &SegmentValue<i32>, labels: &[&str]) -> String {
    match value {
        SegmentValue::CenterOf(i) => labels
            .get(*i as usize)
            .map(|s| s.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Diameter;
    use tempfile::TempDir;

    fn row(id: usize, avg: f64, hazardous: bool, approaches: usize) -> CleanedRow {
        CleanedRow {
            id: id.to_string(),
            name: format!("({} AB{})", 2000 + id, id),
            diameter: Diameter::new(avg * 0.8, avg * 1.2),
            is_hazardous: hazardous,
            absolute_magnitude: 17.0 + id as f64 * 0.4,
            nasa_jpl_url: None,
            close_approach_count: approaches,
            latest_approach: None,
        }
    }

    fn mixed_table() -> CleanedTable {
        let sizes = [0.05, 0.08, 0.2, 0.35, 0.45, 0.6, 0.9, 1.4, 2.5, 4.0, 7.5, 30.0];
        CleanedTable::from_rows(
            sizes
                .iter()
                .enumerate()
                .map(|(i, &avg)| row(i, avg, i % 3 == 0, 1 + i % 4))
                .collect(),
        )
    }

    fn assert_png(path: &Path) {
        let bytes = std::fs::read(path).unwrap();
        assert!(bytes.len() > 1000);
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_render_all_charts() {
        let dir = TempDir::new().unwrap();
        let table = mixed_table();
        let summary = Summary::from_table(&table, 10);

        let path = dir.path().join(SIZE_DISTRIBUTION);
        render_size_distribution(&path, &table, &summary).unwrap();
        assert_png(&path);

        let path = dir.path().join(HAZARD_DISTRIBUTION);
        render_hazard_distribution(&path, &table, &summary).unwrap();
        assert_png(&path);

        let path = dir.path().join(LARGEST_OBJECTS);
        render_largest(&path, &table, 15).unwrap();
        assert_png(&path);

        let path = dir.path().join(HAZARDOUS_OBJECTS);
        render_hazardous(&path, &table, &summary).unwrap();
        assert_png(&path);
    }

    #[test]
    fn test_render_without_hazardous_or_large_objects() {
        let dir = TempDir::new().unwrap();
        let table = CleanedTable::from_rows(vec![
            row(1, 0.05, false, 1),
            row(2, 0.3, false, 2),
            row(3, 0.7, false, 0),
        ]);
        let summary = Summary::from_table(&table, 10);
        assert_eq!(summary.hazardous_count, 0);

        let path = dir.path().join(HAZARD_DISTRIBUTION);
        render_hazard_distribution(&path, &table, &summary).unwrap();
        assert_png(&path);

        let path = dir.path().join(LARGEST_OBJECTS);
        render_largest(&path, &table, 15).unwrap();
        assert_png(&path);
    }

    #[test]
    fn test_render_single_object() {
        let dir = TempDir::new().unwrap();
        let table = CleanedTable::from_rows(vec![row(1, 1.5, true, 3)]);
        let summary = Summary::from_table(&table, 10);

        let path = dir.path().join(SIZE_DISTRIBUTION);
        render_size_distribution(&path, &table, &summary).unwrap();
        assert_png(&path);

        let path = dir.path().join(HAZARDOUS_OBJECTS);
        render_hazardous(&path, &table, &summary).unwrap();
        assert_png(&path);
    }

    #[test]
    fn test_segment_label() {
        let labels = ["a", "b"];
        assert_eq!(segment_label(&SegmentValue::CenterOf(1), &labels), "b");
        assert_eq!(segment_label(&SegmentValue::CenterOf(5), &labels), "");
        assert_eq!(segment_label(&SegmentValue::Exact(0), &labels), "");
    }
}
