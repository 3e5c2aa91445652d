//! Interactive HTML scatter plot.
//!
//! Writes a self-contained page that loads Plotly.js from its CDN and
//! plots absolute magnitude against average diameter, one trace per
//! hazard class.

use crate::models::{CleanedRow, CleanedTable};
use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::path::Path;

pub const INTERACTIVE_PLOT: &str = "interactive_asteroid_plot.html";

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// Marker size range in pixels.
const MIN_MARKER: f64 = 6.0;
const MAX_MARKER: f64 = 40.0;

fn trace<'a>(name: &str, color: &str, rows: impl Iterator<Item = &'a CleanedRow>, max_km: f64) -> Value {
    let rows: Vec<&CleanedRow> = rows.collect();

    json!({
        "type": "scatter",
        "mode": "markers",
        "name": name,
        "x": rows.iter().map(|r| r.absolute_magnitude).collect::<Vec<_>>(),
        "y": rows.iter().map(|r| r.avg_km()).collect::<Vec<_>>(),
        "text": rows.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        "customdata": rows
            .iter()
            .map(|r| [r.diameter.min_km(), r.diameter.max_km()])
            .collect::<Vec<_>>(),
        "hovertemplate": "%{text}<br>H: %{x:.2f}<br>Diameter: %{y:.3f} km (%{customdata[0]:.3f}-%{customdata[1]:.3f})<extra></extra>",
        "marker": {
            "color": color,
            "opacity": 0.7,
            "size": rows.iter().map(|r| marker_size(r.avg_km(), max_km)).collect::<Vec<_>>(),
        },
    })
}

/// Scale a diameter into a marker size, by area.
fn marker_size(avg_km: f64, max_km: f64) -> f64 {
    if max_km <= 0.0 {
        return MIN_MARKER;
    }
    MIN_MARKER + (MAX_MARKER - MIN_MARKER) * (avg_km / max_km).clamp(0.0, 1.0).sqrt()
}

/// Build the Plotly figure (`data` and `layout`) for the table.
pub fn build_figure(table: &CleanedTable) -> Value {
    let max_km = table
        .rows()
        .iter()
        .map(CleanedRow::avg_km)
        .fold(0.0, f64::max);

    json!({
        "data": [
            trace("Safe", "blue", table.non_hazardous(), max_km),
            trace("Hazardous", "red", table.hazardous(), max_km),
        ],
        "layout": {
            "title": { "text": "Near-earth objects: size vs brightness" },
            "xaxis": { "title": { "text": "Absolute magnitude (H)" } },
            "yaxis": { "title": { "text": "Average diameter (km)" } },
            "legend": { "title": { "text": "Potentially hazardous?" } },
            "hovermode": "closest",
        },
    })
}

/// Serialize a value for embedding in an inline `<script>` block.
///
/// Object names come from the API, so every `<` is written as a JSON
/// unicode escape and no name can close or open a tag.
fn script_json(value: &Value) -> serde_json::Result<String> {
    Ok(serde_json::to_string(value)?.replace('<', "\\u003c"))
}

/// Render the complete HTML page.
pub fn generate_html(table: &CleanedTable) -> Result<String> {
    let figure = build_figure(table);
    let data = script_json(&figure["data"]).context("Failed to serialize plot data")?;
    let layout = script_json(&figure["layout"]).context("Failed to serialize plot layout")?;

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Near-earth objects: size vs brightness</title>
<script src="{cdn}"></script>
</head>
<body>
<div id="plot" style="width:100%;height:90vh;"></div>
<script>
Plotly.newPlot("plot", {data}, {layout}, {{"responsive": true}});
</script>
</body>
</html>
"#,
        cdn = PLOTLY_CDN,
        data = data,
        layout = layout
    ))
}

/// Write the interactive plot into `dir`.
pub fn write_interactive_plot(dir: &Path, table: &CleanedTable) -> Result<()> {
    let path = dir.join(INTERACTIVE_PLOT);
    let html = generate_html(table)?;
    std::fs::write(&path, html).with_context(|| format!("Failed to write {}", path.display()))
}
