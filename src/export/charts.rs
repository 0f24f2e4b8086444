// src/export/charts.rs
//
// Chart documents are Vega-Lite specifications; any Vega-Lite renderer turns
// them into the heatmap and scatter images.

use anyhow::{Context, Result};
use log::{debug, info};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

use crate::analysis::CorrelationMatrix;
use crate::models::{DetailRow, FeatureKind, WorkingSet};

const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

/// Finite values as JSON numbers, everything else as `null`.
fn number_or_null(value: f64) -> Value {
    if value.is_finite() {
        json!(value)
    } else {
        Value::Null
    }
}

/// Heatmap of the correlation matrix with every cell annotated to 2 decimals.
pub fn correlation_heatmap(matrix: &CorrelationMatrix) -> Value {
    let mut cells = Vec::with_capacity(matrix.features.len() * matrix.features.len());
    for (i, row_kind) in matrix.features.iter().enumerate() {
        for (j, col_kind) in matrix.features.iter().enumerate() {
            let r = matrix.values[[i, j]];
            let label = if r.is_finite() {
                format!("{:.2}", r)
            } else {
                String::new()
            };
            cells.push(json!({
                "row": row_kind.column_name(),
                "column": col_kind.column_name(),
                "correlation": number_or_null(r),
                "label": label,
            }));
        }
    }
    let order: Vec<&str> = matrix.features.iter().map(|k| k.column_name()).collect();

    json!({
        "$schema": VEGA_LITE_SCHEMA,
        "title": "Correlation Heatmap",
        "width": 400,
        "height": 400,
        "data": { "values": cells },
        "encoding": {
            "x": { "field": "column", "type": "nominal", "sort": order, "title": null },
            "y": { "field": "row", "type": "nominal", "sort": order, "title": null }
        },
        "layer": [
            {
                "mark": "rect",
                "encoding": {
                    "color": {
                        "field": "correlation",
                        "type": "quantitative",
                        "scale": { "scheme": "blueorange", "domain": [-1, 1] }
                    }
                }
            },
            {
                "mark": { "type": "text" },
                "encoding": { "text": { "field": "label", "type": "nominal" } }
            }
        ]
    })
}

/// Danceability against popularity, coloured by artist when that column
/// exists. `None` unless both danceability and popularity are available.
pub fn danceability_popularity_scatter(working: &WorkingSet) -> Option<Value> {
    let popularity_idx = working.column_index("popularity")?;
    let danceability = working.feature_column(FeatureKind::Danceability)?;
    let artist_idx = working.column_index("artist");

    let points: Vec<Value> = working
        .records
        .iter()
        .zip(danceability.iter())
        .map(|(record, dance)| {
            let popularity = record
                .get(popularity_idx)
                .and_then(|p| p.trim().parse::<f64>().ok())
                .map(number_or_null)
                .unwrap_or(Value::Null);
            let mut point = json!({
                "danceability": number_or_null(*dance),
                "popularity": popularity,
            });
            if let Some(idx) = artist_idx {
                point["artist"] = json!(record.get(idx));
            }
            point
        })
        .collect();

    let mut encoding = json!({
        "x": { "field": "danceability", "type": "quantitative" },
        "y": { "field": "popularity", "type": "quantitative" }
    });
    if artist_idx.is_some() {
        encoding["color"] = json!({ "field": "artist", "type": "nominal" });
    }
    debug!("Danceability/popularity scatter with {} points", points.len());

    Some(json!({
        "$schema": VEGA_LITE_SCHEMA,
        "title": "Danceability vs Popularity",
        "width": 500,
        "height": 400,
        "data": { "values": points },
        "mark": { "type": "point", "filled": true },
        "encoding": encoding
    }))
}

/// 2-D projection of every record, coloured by group id.
pub fn projection_scatter(rows: &[DetailRow]) -> Value {
    let points: Vec<Value> = rows
        .iter()
        .map(|row| {
            json!({
                "pc1": number_or_null(row.pc1),
                "pc2": number_or_null(row.pc2),
                "cluster": row.cluster,
                "cluster_name": row.name,
            })
        })
        .collect();

    json!({
        "$schema": VEGA_LITE_SCHEMA,
        "title": "K-Means Clusters (PCA 2D)",
        "width": 500,
        "height": 400,
        "data": { "values": points },
        "mark": { "type": "circle", "size": 120 },
        "encoding": {
            "x": { "field": "pc1", "type": "quantitative" },
            "y": { "field": "pc2", "type": "quantitative" },
            "color": { "field": "cluster", "type": "nominal", "scale": { "scheme": "tableau10" } },
            "tooltip": [
                { "field": "cluster", "type": "nominal" },
                { "field": "cluster_name", "type": "nominal" }
            ]
        }
    })
}

pub fn write_chart(path: &Path, chart: &Value) -> Result<()> {
    let body = serde_json::to_string_pretty(chart).context("Failed to serialize chart")?;
    fs::write(path, body).with_context(|| format!("Failed to write chart {}", path.display()))?;
    info!("Saved chart to {}", path.display());
    Ok(())
}
