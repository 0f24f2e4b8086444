// src/export/tables.rs

use anyhow::{Context, Result};
use log::info;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::models::{ClusterProfile, DetailRow, FeatureSet};

/// Writes the per-group summary: `cluster, <features…>, count, cluster_name`,
/// means rounded to 3 decimals, one row per group in id order.
pub fn write_profile_csv<W: Write>(
    writer: W,
    features: &FeatureSet,
    profiles: &[ClusterProfile],
) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec!["cluster".to_string()];
    header.extend(features.column_names().iter().map(|c| c.to_string()));
    header.push("count".to_string());
    header.push("cluster_name".to_string());
    csv_writer
        .write_record(&header)
        .context("Failed to write profile header")?;

    let mut ordered: Vec<&ClusterProfile> = profiles.iter().collect();
    ordered.sort_by_key(|p| p.cluster);
    for profile in ordered {
        let mut record = vec![profile.cluster.to_string()];
        record.extend(
            profile
                .rounded_means()
                .iter()
                .map(|(_, mean)| mean.to_string()),
        );
        record.push(profile.count.to_string());
        record.push(profile.name.label().to_string());
        csv_writer
            .write_record(&record)
            .with_context(|| format!("Failed to write profile row for cluster {}", profile.cluster))?;
    }
    csv_writer.flush().context("Failed to flush profile table")?;
    Ok(())
}

/// Writes the per-record detail table: present base columns, raw features,
/// `cluster`, `cluster_name`. Empty base cells are written as empty fields.
pub fn write_detail_csv<W: Write>(
    writer: W,
    base_columns: &[&str],
    features: &FeatureSet,
    rows: &[DetailRow],
) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header: Vec<String> = base_columns.iter().map(|c| c.to_string()).collect();
    header.extend(features.column_names().iter().map(|c| c.to_string()));
    header.push("cluster".to_string());
    header.push("cluster_name".to_string());
    csv_writer
        .write_record(&header)
        .context("Failed to write detail header")?;

    for (i, row) in rows.iter().enumerate() {
        let mut record: Vec<String> = row
            .base
            .iter()
            .map(|cell| cell.clone().unwrap_or_default())
            .collect();
        record.extend(row.features.iter().map(|v| v.to_string()));
        record.push(row.cluster.to_string());
        record.push(row.name.label().to_string());
        csv_writer
            .write_record(&record)
            .with_context(|| format!("Failed to write detail row {}", i))?;
    }
    csv_writer.flush().context("Failed to flush detail table")?;
    Ok(())
}

pub fn save_profile_csv(path: &Path, features: &FeatureSet, profiles: &[ClusterProfile]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_profile_csv(file, features, profiles)?;
    info!("Saved cluster profile table to {}", path.display());
    Ok(())
}

pub fn save_detail_csv(
    path: &Path,
    base_columns: &[&str],
    features: &FeatureSet,
    rows: &[DetailRow],
) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_detail_csv(file, base_columns, features, rows)?;
    info!("Saved {} clustered records to {}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClusterName, FeatureKind};

    fn features() -> FeatureSet {
        FeatureSet::new(vec![FeatureKind::Energy, FeatureKind::Danceability]).unwrap()
    }

    #[test]
    fn test_profile_rows_are_sorted_and_rounded() {
        let profiles = vec![
            ClusterProfile {
                cluster: 1,
                means: vec![(FeatureKind::Danceability, 0.81234), (FeatureKind::Energy, 0.9)],
                count: 3,
                name: ClusterName::HighEnergyDance,
            },
            ClusterProfile {
                cluster: 0,
                means: vec![(FeatureKind::Danceability, 0.1), (FeatureKind::Energy, 0.2)],
                count: 2,
                name: ClusterName::MixedBalanced,
            },
        ];
        let mut buffer = Vec::new();
        write_profile_csv(&mut buffer, &features(), &profiles).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "cluster,danceability,energy,count,cluster_name");
        assert_eq!(lines[1], "0,0.1,0.2,2,Mixed / Balanced");
        assert_eq!(lines[2], "1,0.812,0.9,3,High-Energy Dance");
    }

    #[test]
    fn test_detail_table_without_optional_columns() {
        let rows = vec![DetailRow {
            base: vec![Some("Song".to_string()), None],
            features: vec![0.5, 0.25],
            cluster: 2,
            name: ClusterName::FastEnergetic,
            pc1: 0.0,
            pc2: 0.0,
        }];
        let mut buffer = Vec::new();
        write_detail_csv(&mut buffer, &["track_name", "artist"], &features(), &rows).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "track_name,artist,danceability,energy,cluster,cluster_name");
        assert_eq!(lines[1], "Song,,0.5,0.25,2,Fast & Energetic");
    }

    #[test]
    fn test_save_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.csv");
        save_profile_csv(&path, &features(), &[]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim(), "cluster,danceability,energy,count,cluster_name");
    }
}
