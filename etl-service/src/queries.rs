use std::{
    fs,
    path::{Path, PathBuf},
};

use meter_client::db::{NamedQuery, ANALYTICS_QUERIES};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow},
    Column, Executor, Row, ValueRef,
};

use crate::{observability::SharedReporter, pipeline::PipelineError};

const STAGE: &str = "queries";

/// Outcome of one pass over the analytical query set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySummary {
    /// False when the database file was absent and nothing ran.
    pub database_found: bool,
    pub exported: Vec<PathBuf>,
    /// (query name, error message)
    pub failed: Vec<(String, String)>,
}

/// Executes the fixed analytical queries and writes each result set to
/// `<out_dir>/<name>.csv`. A failing query is reported and skipped.
pub struct QueryRunner {
    db_path: PathBuf,
    out_dir: PathBuf,
    reporter: SharedReporter,
}

impl QueryRunner {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(db_path: P, out_dir: Q, reporter: SharedReporter) -> Self {
        Self {
            db_path: db_path.into(),
            out_dir: out_dir.into(),
            reporter,
        }
    }

    pub async fn run_all(&self) -> QuerySummary {
        self.run(ANALYTICS_QUERIES).await
    }

    pub async fn run(&self, queries: &[NamedQuery]) -> QuerySummary {
        let mut summary = QuerySummary::default();
        if !self.db_path.is_file() {
            self.reporter.error(
                STAGE,
                &format!("database not found: {}", self.db_path.display()),
            );
            return summary;
        }
        summary.database_found = true;

        let pool = match self.open().await {
            Ok(pool) => pool,
            Err(e) => {
                self.reporter.error(STAGE, &e.to_string());
                summary
                    .failed
                    .extend(queries.iter().map(|q| (q.name.to_string(), e.to_string())));
                return summary;
            }
        };

        if let Err(e) = fs::create_dir_all(&self.out_dir) {
            self.reporter.error(
                STAGE,
                &format!("failed to create {}: {e}", self.out_dir.display()),
            );
        }

        for query in queries {
            let path = self.out_dir.join(format!("{}.csv", query.name));
            match export_query(&pool, query, &path).await {
                Ok(rows) => {
                    metrics::counter!("analytics_queries_exported_total").increment(1);
                    self.reporter.info(
                        STAGE,
                        &format!("query {} wrote {rows} rows to {}", query.name, path.display()),
                    );
                    summary.exported.push(path);
                }
                Err(e) => {
                    metrics::counter!("analytics_query_failures_total").increment(1);
                    self.reporter
                        .error(STAGE, &format!("query {} failed: {e}", query.name));
                    summary.failed.push((query.name.to_string(), e.to_string()));
                }
            }
        }

        pool.close().await;
        summary
    }

    async fn open(&self) -> Result<SqlitePool, PipelineError> {
        let options = SqliteConnectOptions::new()
            .filename(&self.db_path)
            .read_only(true);
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| {
                PipelineError::Query(format!("failed to open {}: {e}", self.db_path.display()))
            })
    }
}

async fn export_query(pool: &SqlitePool, query: &NamedQuery, path: &Path) -> Result<usize, PipelineError> {
    let rows: Vec<SqliteRow> = sqlx::query(query.sql)
        .fetch_all(pool)
        .await
        .map_err(|e| PipelineError::Query(e.to_string()))?;

    let header: Vec<String> = match rows.first() {
        Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
        None => match pool.describe(query.sql).await {
            Ok(described) => described
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            Err(e) => {
                tracing::warn!(query = query.name, error = %e, "could not describe empty result");
                Vec::new()
            }
        },
    };

    let sink_err = |e: csv::Error| PipelineError::Sink(format!("{}: {e}", path.display()));
    let mut wtr = csv::Writer::from_path(path).map_err(sink_err)?;
    if !header.is_empty() {
        wtr.write_record(&header).map_err(sink_err)?;
    }
    for row in &rows {
        let record: Vec<String> = (0..row.len()).map(|i| cell_text(row, i)).collect();
        wtr.write_record(&record).map_err(sink_err)?;
    }
    wtr.flush()
        .map_err(|e| PipelineError::Sink(format!("{}: {e}", path.display())))?;

    Ok(rows.len())
}

/// Render a dynamically typed SQLite value as a CSV field.
fn cell_text(row: &SqliteRow, idx: usize) -> String {
    match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return String::new(),
        Ok(_) => {}
        Err(_) => return String::new(),
    }
    if let Ok(v) = row.try_get::<i64, _>(idx) {
        return v.to_string();
    }
    if let Ok(v) = row.try_get::<f64, _>(idx) {
        return v.to_string();
    }
    if let Ok(v) = row.try_get::<String, _>(idx) {
        return v;
    }
    row.try_get::<Vec<u8>, _>(idx)
        .map(|bytes| bytes.iter().map(|b| format!("{b:02x}")).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::MemoryReporter;
    use std::sync::Arc;

    async fn seed(path: &Path) {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        for sql in [
            "CREATE TABLE meter_daily (ext_dev_ref TEXT, date_local TEXT, total_kwh REAL, note TEXT)",
            "INSERT INTO meter_daily VALUES ('dev-1', '2024-06-15', 1.5, 'a'), ('dev-1', '2024-06-16', 2.0, NULL), ('dev-2', '2025-01-01', 4, 'b')",
        ] {
            sqlx::query(sql).execute(&pool).await.unwrap();
        }
        pool.close().await;
    }

    const QUERIES: &[NamedQuery] = &[
        NamedQuery {
            name: "per_year",
            sql: "SELECT CAST(strftime('%Y', date_local) AS INTEGER) AS year, SUM(total_kwh) AS kwh, MAX(note) AS note FROM meter_daily GROUP BY year ORDER BY year",
        },
        NamedQuery {
            name: "broken",
            sql: "SELECT * FROM missing_table",
        },
        NamedQuery {
            name: "nothing",
            sql: "SELECT ext_dev_ref, total_kwh FROM meter_daily WHERE total_kwh > 100",
        },
    ];

    #[tokio::test]
    async fn failing_query_does_not_stop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("etl.sqlite");
        seed(&db).await;

        let reporter = Arc::new(MemoryReporter::new());
        let runner = QueryRunner::new(&db, dir.path().join("sql"), reporter.clone());
        let summary = runner.run(QUERIES).await;

        assert!(summary.database_found);
        assert_eq!(summary.exported.len(), 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "broken");

        let per_year = fs::read_to_string(dir.path().join("sql/per_year.csv")).unwrap();
        assert_eq!(per_year, "year,kwh,note\n2024,3.5,a\n2025,4,b\n");

        let nothing = fs::read_to_string(dir.path().join("sql/nothing.csv")).unwrap();
        assert_eq!(nothing, "ext_dev_ref,total_kwh\n");
    }

    #[tokio::test]
    async fn missing_database_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = Arc::new(MemoryReporter::new());
        let runner = QueryRunner::new(
            dir.path().join("absent.sqlite"),
            dir.path().join("sql"),
            reporter.clone(),
        );

        let summary = runner.run_all().await;
        assert!(!summary.database_found);
        assert!(summary.exported.is_empty());
        assert!(!dir.path().join("sql").exists());
        assert_eq!(reporter.count(crate::observability::Severity::Error), 1);
    }
}
