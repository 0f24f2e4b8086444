// src/export/store.rs

use anyhow::{bail, Context, Result};
use bb8::Pool;
use bb8_postgres::PostgresConnectionManager;
use log::{debug, error, info};
use std::time::Duration;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Config, NoTls, Transaction};

use crate::models::stats_models::PipelineStats;
use crate::models::{DetailRow, FeatureSet};

pub type PgPool = Pool<PostgresConnectionManager<NoTls>>;

pub const RUNS_TABLE: &str = "track_cluster_runs";
const INSERT_BATCH_SIZE: usize = 500;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Connection settings from the `POSTGRES_*` variables.
fn build_pg_config() -> Config {
    let host = env_or("POSTGRES_HOST", "127.0.0.1");
    let port = env_or("POSTGRES_PORT", "5432").parse::<u16>().unwrap_or(5432);
    let dbname = env_or("POSTGRES_DB", "track_analysis");
    let user = env_or("POSTGRES_USER", "postgres");
    let password = env_or("POSTGRES_PASSWORD", "");
    info!("DB Config: Host={}, Port={}, DB={}, User={}", host, port, dbname, user);

    let mut config = Config::new();
    config
        .host(&host)
        .port(port)
        .dbname(&dbname)
        .user(&user)
        .password(&password)
        .application_name("track_clustering")
        .connect_timeout(Duration::from_secs(10));
    config
}

/// Opens a small pool and checks it with a trivial query. One run needs at
/// most one connection at a time.
pub async fn connect() -> Result<PgPool> {
    let manager = PostgresConnectionManager::new(build_pg_config(), NoTls);
    let pool = Pool::builder()
        .max_size(2)
        .connection_timeout(Duration::from_secs(15))
        .build(manager)
        .await
        .context("Failed to build database connection pool")?;

    {
        let conn = pool
            .get()
            .await
            .context("Failed to get test connection from pool")?;
        conn.query_one("SELECT 1", &[])
            .await
            .context("Test query 'SELECT 1' failed")?;
    }
    info!("Connected to PostgreSQL");
    Ok(pool)
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !valid_start
        || name.len() > 63
        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        bail!("'{}' is not a valid table name", name);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Double,
    Integer,
}

impl ColumnType {
    fn sql(self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Integer => "INTEGER",
        }
    }
}

/// Column layout of the detail table for the columns present in this run.
pub fn table_columns(base_columns: &[&str], features: &FeatureSet) -> Vec<(String, ColumnType)> {
    let mut columns: Vec<(String, ColumnType)> = base_columns
        .iter()
        .map(|name| (name.to_string(), base_column_type(name)))
        .collect();
    columns.extend(
        features
            .column_names()
            .into_iter()
            .map(|name| (name.to_string(), ColumnType::Double)),
    );
    columns.push(("cluster".to_string(), ColumnType::Integer));
    columns.push(("cluster_name".to_string(), ColumnType::Text));
    columns.push(("pc1".to_string(), ColumnType::Double));
    columns.push(("pc2".to_string(), ColumnType::Double));
    columns
}

fn base_column_type(name: &str) -> ColumnType {
    match name {
        "year" | "popularity" => ColumnType::Double,
        _ => ColumnType::Text,
    }
}

pub fn create_table_sql(table: &str, columns: &[(String, ColumnType)]) -> String {
    let definitions: Vec<String> = columns
        .iter()
        .map(|(name, ty)| format!("{} {}", name, ty.sql()))
        .collect();
    format!("CREATE TABLE {} ({})", table, definitions.join(", "))
}

/// Multi-row insert with `$n` placeholders for `row_count` rows.
pub fn insert_sql(table: &str, columns: &[(String, ColumnType)], row_count: usize) -> String {
    let width = columns.len();
    let names: Vec<&str> = columns.iter().map(|(name, _)| name.as_str()).collect();
    let values: Vec<String> = (0..row_count)
        .map(|row| {
            let placeholders: Vec<String> = (1..=width)
                .map(|col| format!("${}", row * width + col))
                .collect();
            format!("({})", placeholders.join(", "))
        })
        .collect();
    format!(
        "INSERT INTO {} ({}) VALUES {}",
        table,
        names.join(", "),
        values.join(", ")
    )
}

fn row_params(
    row: &DetailRow,
    base_types: &[ColumnType],
    params: &mut Vec<Box<dyn ToSql + Sync + Send>>,
) {
    for (cell, ty) in row.base.iter().zip(base_types.iter()) {
        match ty {
            ColumnType::Double => {
                let value: Option<f64> = cell
                    .as_deref()
                    .and_then(|v| v.trim().parse::<f64>().ok())
                    .filter(|v| v.is_finite());
                params.push(Box::new(value));
            }
            _ => params.push(Box::new(cell.clone())),
        }
    }
    for value in &row.features {
        params.push(Box::new(*value));
    }
    params.push(Box::new(row.cluster as i32));
    params.push(Box::new(row.name.label().to_string()));
    params.push(Box::new(row.pc1));
    params.push(Box::new(row.pc2));
}

/// Replaces `table` with the detail rows of this run. Nothing is visible to
/// other sessions until the caller commits `transaction`.
///
/// Arguments:
/// * `transaction` - Open transaction the run's writes share.
/// * `table` - Target table; dropped and recreated.
/// * `base_columns` - Identifying columns present in `rows`.
/// * `features` - Feature layout of `rows`.
/// * `rows` - Detail rows in working-set order.
///
/// Returns:
/// The number of inserted rows.
pub async fn save_detail_rows(
    transaction: &Transaction<'_>,
    table: &str,
    base_columns: &[&str],
    features: &FeatureSet,
    rows: &[DetailRow],
) -> Result<usize> {
    validate_identifier(table)?;
    let columns = table_columns(base_columns, features);
    let base_types: Vec<ColumnType> = base_columns.iter().map(|c| base_column_type(c)).collect();

    transaction
        .batch_execute(&format!(
            "DROP TABLE IF EXISTS {}; {};",
            table,
            create_table_sql(table, &columns)
        ))
        .await
        .with_context(|| format!("Failed to recreate table {}", table))?;

    let mut inserted = 0usize;
    for chunk in rows.chunks(INSERT_BATCH_SIZE) {
        let mut params: Vec<Box<dyn ToSql + Sync + Send>> =
            Vec::with_capacity(chunk.len() * columns.len());
        for row in chunk {
            row_params(row, &base_types, &mut params);
        }
        let params_slice: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let sql = insert_sql(table, &columns, chunk.len());
        debug!("Inserting batch of {} rows ({} parameters)", chunk.len(), params_slice.len());
        inserted += transaction
            .execute(sql.as_str(), params_slice.as_slice())
            .await
            .map_err(|e| {
                error!("Batch insert SQL error: {}", e);
                e
            })
            .context("Failed to insert detail rows")? as usize;
    }

    info!("Wrote {} rows to table {} (uncommitted)", inserted, table);
    Ok(inserted)
}

fn run_history_sql() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id TEXT PRIMARY KEY,
            run_timestamp TIMESTAMP NOT NULL,
            description TEXT,
            input_path TEXT NOT NULL,
            table_name TEXT NOT NULL,
            selected_k INTEGER NOT NULL,
            silhouette DOUBLE PRECISION NOT NULL,
            working_rows BIGINT NOT NULL,
            total_processing_time DOUBLE PRECISION NOT NULL
        )",
        RUNS_TABLE
    )
}

/// Appends one row describing this run to the run-history table, inside the
/// same transaction as the detail rows.
pub async fn record_run(
    transaction: &Transaction<'_>,
    stats: &PipelineStats,
    table: &str,
) -> Result<()> {
    transaction
        .batch_execute(&run_history_sql())
        .await
        .context("Failed to create run history table")?;

    let insert = format!(
        "INSERT INTO {} (id, run_timestamp, description, input_path, table_name, selected_k,
            silhouette, working_rows, total_processing_time)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        RUNS_TABLE
    );
    transaction
        .execute(
            insert.as_str(),
            &[
                &stats.run_id,
                &stats.run_timestamp,
                &stats.description,
                &stats.input_path,
                &table,
                &(stats.selected_k as i32),
                &stats.silhouette,
                &(stats.working_rows as i64),
                &stats.total_processing_time,
            ],
        )
        .await
        .context("Failed to insert run history record")?;

    info!("Recorded run {} in {}", stats.run_id, RUNS_TABLE);
    Ok(())
}

/// Tracks per cluster name, ordered by name.
pub async fn query_cluster_counts(pool: &PgPool, table: &str) -> Result<Vec<(String, i64)>> {
    validate_identifier(table)?;
    let conn = pool
        .get()
        .await
        .context("Failed to get DB connection for query_cluster_counts")?;
    let rows = conn
        .query(
            format!(
                "SELECT cluster_name, COUNT(*) AS n_tracks FROM {} GROUP BY cluster_name ORDER BY cluster_name",
                table
            )
            .as_str(),
            &[],
        )
        .await
        .context("Failed to query cluster counts")?;

    Ok(rows
        .iter()
        .map(|row| (row.get::<_, String>("cluster_name"), row.get::<_, i64>("n_tracks")))
        .collect())
}

/// Top `limit` artists by average popularity.
pub async fn query_top_artists(
    pool: &PgPool,
    table: &str,
    limit: i64,
) -> Result<Vec<(Option<String>, Option<f64>)>> {
    validate_identifier(table)?;
    let conn = pool
        .get()
        .await
        .context("Failed to get DB connection for query_top_artists")?;
    let rows = conn
        .query(
            format!(
                "SELECT artist, AVG(popularity) AS avg_pop FROM {} GROUP BY artist
                 ORDER BY avg_pop DESC NULLS LAST LIMIT $1",
                table
            )
            .as_str(),
            &[&limit],
        )
        .await
        .context("Failed to query top artists")?;

    Ok(rows
        .iter()
        .map(|row| {
            (
                row.get::<_, Option<String>>("artist"),
                row.get::<_, Option<f64>>("avg_pop"),
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeatureKind;

    fn features() -> FeatureSet {
        FeatureSet::new(vec![FeatureKind::Energy, FeatureKind::Tempo]).unwrap()
    }

    #[test]
    fn test_identifier_validation() {
        assert!(validate_identifier("track_clusters").is_ok());
        assert!(validate_identifier("_t2").is_ok());
        assert!(validate_identifier("2tracks").is_err());
        assert!(validate_identifier("tracks; DROP TABLE x").is_err());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_table_columns_follow_present_base_columns() {
        let columns = table_columns(&["artist", "popularity"], &features());
        let names: Vec<&str> = columns.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec!["artist", "popularity", "energy", "tempo", "cluster", "cluster_name", "pc1", "pc2"]
        );
        assert_eq!(columns[0].1, ColumnType::Text);
        assert_eq!(columns[1].1, ColumnType::Double);
        assert_eq!(columns[4].1, ColumnType::Integer);

        let sql = create_table_sql("t", &columns[..3]);
        assert_eq!(sql, "CREATE TABLE t (artist TEXT, popularity DOUBLE PRECISION, energy DOUBLE PRECISION)");
    }

    #[test]
    fn test_run_history_is_created_once() {
        let sql = run_history_sql();
        assert!(sql.starts_with(&format!("CREATE TABLE IF NOT EXISTS {} (", RUNS_TABLE)));
        assert!(sql.contains("selected_k INTEGER NOT NULL"));
    }

    #[test]
    fn test_insert_placeholders_are_numbered_per_row() {
        let columns = vec![
            ("a".to_string(), ColumnType::Text),
            ("b".to_string(), ColumnType::Double),
        ];
        assert_eq!(
            insert_sql("t", &columns, 2),
            "INSERT INTO t (a, b) VALUES ($1, $2), ($3, $4)"
        );
    }

    #[test]
    fn test_row_params_match_column_count() {
        use crate::models::ClusterName;
        let row = DetailRow {
            base: vec![Some("x".to_string()), Some("not a number".to_string())],
            features: vec![0.4, 120.0],
            cluster: 1,
            name: ClusterName::Groovy,
            pc1: 0.1,
            pc2: 0.2,
        };
        let base_types = vec![ColumnType::Text, ColumnType::Double];
        let mut params: Vec<Box<dyn ToSql + Sync + Send>> = Vec::new();
        row_params(&row, &base_types, &mut params);
        assert_eq!(params.len(), table_columns(&["artist", "popularity"], &features()).len());
    }
}
