// src/input/loader.rs

use log::{debug, info, warn};
use ndarray::Array2;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::errors::PipelineError;
use crate::models::{FeatureSet, TrackRecord, WorkingSet};

/// Loads a CSV table from disk and reduces it to the working set.
///
/// Arguments:
/// * `path` - Location of the input table. Must exist.
///
/// Returns:
/// The cleaned `WorkingSet`, an `Input` error when the file is missing or has
/// fewer than two feature columns, or a `Data` error when no complete record remains.
pub fn load_working_set(path: &Path) -> Result<WorkingSet, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::input(format!(
            "input file not found: {}",
            path.display()
        )));
    }
    let file = File::open(path).map_err(|e| {
        PipelineError::input(format!("failed to open {}: {}", path.display(), e))
    })?;
    info!("Loading tracks from {}", path.display());
    read_working_set(file)
}

/// Reads a CSV table from any reader and reduces it to the working set:
/// feature selection, exact-duplicate removal (first occurrence kept), then
/// removal of rows with a missing or non-numeric selected feature.
///
/// Short rows are padded with empty cells; long rows are cut to the header.
pub fn read_working_set<R: Read>(reader: R) -> Result<WorkingSet, PipelineError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let header: Vec<String> = csv_reader
        .headers()
        .map_err(|e| PipelineError::input(format!("failed to read header: {}", e)))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let features = FeatureSet::from_header(&header).ok_or_else(|| {
        PipelineError::input(format!(
            "need at least {} of danceability, energy, valence, tempo; header has {:?}",
            FeatureSet::MIN_FEATURES,
            header
        ))
    })?;
    info!("Selected features: {:?}", features.column_names());

    let feature_columns: Vec<usize> = features
        .kinds()
        .iter()
        .filter_map(|kind| header.iter().position(|h| h == kind.column_name()))
        .collect();

    let mut seen: HashSet<Vec<CellKey>> = HashSet::new();
    let mut records = Vec::new();
    let mut values: Vec<f64> = Vec::new();
    let mut loaded_rows = 0usize;
    let mut duplicate_rows = 0usize;
    let mut incomplete_rows = 0usize;

    for (line, result) in csv_reader.records().enumerate() {
        let row = result.map_err(|e| {
            PipelineError::input(format!("malformed row {}: {}", line + 2, e))
        })?;
        loaded_rows += 1;

        let mut cells: Vec<String> = row.iter().take(header.len()).map(|c| c.to_string()).collect();
        if cells.len() < header.len() {
            cells.resize(header.len(), String::new());
        }
        if !seen.insert(row_key(&cells, &feature_columns)) {
            duplicate_rows += 1;
            continue;
        }

        let parsed: Option<Vec<f64>> = feature_columns
            .iter()
            .map(|&col| cells.get(col).and_then(|c| parse_feature(c)))
            .collect();
        let Some(parsed) = parsed else {
            incomplete_rows += 1;
            debug!("Dropping row {}: missing feature value", line + 2);
            continue;
        };

        values.extend(parsed);
        records.push(TrackRecord {
            fields: cells
                .into_iter()
                .map(|c| if c.trim().is_empty() { None } else { Some(c) })
                .collect(),
        });
    }

    if duplicate_rows > 0 {
        info!("Removed {} duplicate rows", duplicate_rows);
    }
    if incomplete_rows > 0 {
        warn!(
            "Removed {} rows with missing values in {:?}",
            incomplete_rows,
            features.column_names()
        );
    }

    if records.is_empty() {
        return Err(PipelineError::data(format!(
            "no records remain after removing rows with missing values in {:?} ({} rows loaded)",
            features.column_names(),
            loaded_rows
        )));
    }

    let raw = Array2::from_shape_vec((records.len(), features.len()), values)
        .map_err(|e| PipelineError::data(format!("feature matrix shape mismatch: {}", e)))?;

    info!(
        "Working set: {} of {} loaded rows ({} features)",
        records.len(),
        loaded_rows,
        features.len()
    );

    Ok(WorkingSet {
        header,
        features,
        records,
        raw,
        loaded_rows,
        duplicate_rows,
        incomplete_rows,
    })
}

/// Duplicate-detection key for one cell. Feature cells compare by parsed
/// value so `0.5` and `0.50` collide; every other cell compares as text.
#[derive(Debug, PartialEq, Eq, Hash)]
enum CellKey {
    Number(u64),
    Text(String),
}

fn row_key(cells: &[String], feature_columns: &[usize]) -> Vec<CellKey> {
    cells
        .iter()
        .enumerate()
        .map(|(col, cell)| {
            let number = if feature_columns.contains(&col) {
                // -0.0 and 0.0 are the same value
                parse_feature(cell).map(|v| (v + 0.0).to_bits())
            } else {
                None
            };
            match number {
                Some(bits) => CellKey::Number(bits),
                None => CellKey::Text(cell.trim().to_string()),
            }
        })
        .collect()
}

fn parse_feature(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeatureKind;
    use std::io::{Cursor, Write};

    #[test]
    fn test_duplicates_and_missing_values_are_dropped() {
        let csv = "track_name,artist,danceability,energy,valence\n\
                   a,x,0.5,0.6,0.7\n\
                   a,x,0.5,0.6,0.7\n\
                   b,y,,0.2,0.3\n\
                   c,z,0.9,NaN,0.1\n\
                   d,,0.1,0.2,0.3\n";
        let working = read_working_set(Cursor::new(csv)).unwrap();

        assert_eq!(working.loaded_rows, 5);
        assert_eq!(working.duplicate_rows, 1);
        assert_eq!(working.incomplete_rows, 2);
        assert_eq!(working.len(), 2);
        assert_eq!(working.raw.shape(), &[2, 3]);
        assert_eq!(working.raw[[1, 0]], 0.1);
        // empty optional cell is kept as None
        assert_eq!(working.records[1].get(1), None);
        assert_eq!(working.records[0].get(0), Some("a"));
    }

    #[test]
    fn test_short_row_is_dropped_as_incomplete() {
        let csv = "track_name,danceability,energy,tempo\n\
                   a,0.5,0.6,120\n\
                   b,0.1,0.2,90\n\
                   c,0.3,0.4\n";
        let working = read_working_set(Cursor::new(csv)).unwrap();

        assert_eq!(working.loaded_rows, 3);
        assert_eq!(working.incomplete_rows, 1);
        assert_eq!(working.len(), 2);
        assert_eq!(working.raw[[1, 2]], 90.0);
    }

    #[test]
    fn test_short_row_keeps_base_columns_aligned() {
        let csv = "danceability,energy,track_name,artist\n\
                   0.5,0.6,a,x\n\
                   0.1,0.2,b\n";
        let working = read_working_set(Cursor::new(csv)).unwrap();

        assert_eq!(working.len(), 2);
        assert_eq!(working.records[1].fields.len(), 4);
        assert_eq!(working.records[1].get(2), Some("b"));
        assert_eq!(working.records[1].get(3), None);
    }

    #[test]
    fn test_duplicates_compare_feature_values_numerically() {
        let csv = "track_name,danceability,energy\n\
                   a,0.5,0.6\n\
                   a,0.50,0.600\n\
                   A,0.5,0.6\n";
        let working = read_working_set(Cursor::new(csv)).unwrap();

        assert_eq!(working.duplicate_rows, 1);
        assert_eq!(working.len(), 2);
    }

    #[test]
    fn test_single_feature_column_is_an_input_error() {
        let csv = "track_name,energy\nfoo,0.4\n";
        let err = read_working_set(Cursor::new(csv)).unwrap_err();
        assert!(matches!(err, PipelineError::Input(_)));
    }

    #[test]
    fn test_all_rows_incomplete_is_a_data_error() {
        let csv = "energy,tempo\n,120\n0.5,\n";
        let err = read_working_set(Cursor::new(csv)).unwrap_err();
        assert!(matches!(err, PipelineError::Data(_)));
    }

    #[test]
    fn test_missing_file_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_working_set(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, PipelineError::Input(_)));
    }

    #[test]
    fn test_loads_from_disk_without_optional_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "tempo,valence").unwrap();
        writeln!(file, "120.5,0.3").unwrap();
        writeln!(file, "98,0.8").unwrap();
        drop(file);

        let working = load_working_set(&path).unwrap();
        assert_eq!(
            working.features.kinds(),
            &[FeatureKind::Valence, FeatureKind::Tempo]
        );
        assert!(working.base_columns().is_empty());
        assert_eq!(working.raw[[0, 1]], 120.5);
    }
}
