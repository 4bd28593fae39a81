use std::{fs, path::Path};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    QueryBuilder, Sqlite,
};

use crate::pipeline::{Cell, Column, PipelineError, Sink, TableRow};

/// Bound parameters per statement stay below SQLite's variable limit.
const MAX_BIND_PARAMS: usize = 32_000;

/// Columns that get a lookup index whenever a table carries them.
const INDEXED_COLUMNS: [(&str, &str); 3] = [
    ("ext_dev_ref", "dev"),
    ("date_local", "date"),
    ("timestamp_local", "ts"),
];

/// Replaces whole tables in a single-file SQLite store.
pub struct SqliteSink {
    pool: SqlitePool,
    batch_size: usize,
}

impl SqliteSink {
    pub fn new(pool: SqlitePool, batch_size: usize) -> Self {
        Self {
            pool,
            batch_size: batch_size.max(1),
        }
    }

    /// Open (creating if needed) the database file behind a one-connection pool.
    pub async fn connect(path: &Path, batch_size: usize) -> Result<Self, PipelineError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                PipelineError::Sink(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| {
                PipelineError::Sink(format!("failed to open {}: {e}", path.display()))
            })?;

        Ok(Self::new(pool, batch_size))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Drop, recreate and fill `table`, then rebuild its indexes, in one
    /// transaction. Returns the number of rows written.
    ///
    /// With no rows the table is still recreated, so a rerun never leaves the
    /// previous run's rows behind.
    pub async fn write_table<T: TableRow>(
        &self,
        table: &str,
        columns: &[Column],
        rows: &[T],
    ) -> Result<u64, PipelineError> {
        if columns.is_empty() {
            return Err(PipelineError::Sink(format!("table {table} has no columns")));
        }
        if rows.is_empty() {
            tracing::warn!(table, "table is empty, replacing with an empty table");
        }

        self.replace_table(table, columns, rows)
            .await
            .map_err(|e| PipelineError::Sink(format!("failed to write table {table}: {e}")))?;

        let written = rows.len() as u64;
        metrics::counter!("sqlite_rows_written_total", "table" => table.to_string())
            .increment(written);
        tracing::info!(table, rows = written, "table written");
        Ok(written)
    }

    async fn replace_table<T: TableRow>(
        &self,
        table: &str,
        columns: &[Column],
        rows: &[T],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote(table)))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&create_table_sql(table, columns))
            .execute(&mut *tx)
            .await?;

        let per_statement = self.batch_size.min(MAX_BIND_PARAMS / columns.len()).max(1);
        for chunk in rows.chunks(per_statement) {
            let cells: Vec<Vec<Cell>> = chunk.iter().map(TableRow::cells).collect();
            let mut builder = QueryBuilder::<Sqlite>::new(insert_prefix(table, columns));
            builder.push_values(cells, |mut b, row| {
                for cell in row {
                    match cell {
                        Cell::Null => b.push_bind(None::<String>),
                        Cell::Integer(v) => b.push_bind(v),
                        Cell::Real(v) => b.push_bind(v),
                        Cell::Text(s) => b.push_bind(s),
                    };
                }
            });
            builder.build().execute(&mut *tx).await?;
        }

        for sql in index_sql(table, columns) {
            sqlx::query(&sql).execute(&mut *tx).await?;
        }

        tx.commit().await
    }

    /// (Re)create `view` as a plain alias of `table`.
    pub async fn create_view(&self, view: &str, table: &str) -> Result<(), PipelineError> {
        let run = async {
            let mut tx = self.pool.begin().await?;
            sqlx::query(&format!("DROP VIEW IF EXISTS {}", quote(view)))
                .execute(&mut *tx)
                .await?;
            sqlx::query(&format!(
                "CREATE VIEW {} AS SELECT * FROM {}",
                quote(view),
                quote(table)
            ))
            .execute(&mut *tx)
            .await?;
            tx.commit().await
        };
        run.await
            .map_err(|e: sqlx::Error| PipelineError::Sink(format!("failed to create view {view}: {e}")))?;
        tracing::info!(view, table, "view created");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait::async_trait]
impl<T> Sink<T> for SqliteSink
where
    T: TableRow + Sync,
{
    async fn write(&self, name: &str, columns: &[Column], rows: &[T]) -> Result<u64, PipelineError> {
        self.write_table(name, columns, rows).await
    }
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn create_table_sql(table: &str, columns: &[Column]) -> String {
    let defs: Vec<String> = columns
        .iter()
        .map(|c| format!("{} {}", quote(&c.name), c.kind.sql_type()))
        .collect();
    format!("CREATE TABLE {} ({})", quote(table), defs.join(", "))
}

fn insert_prefix(table: &str, columns: &[Column]) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote(&c.name)).collect();
    format!("INSERT INTO {} ({}) ", quote(table), names.join(", "))
}

fn index_sql(table: &str, columns: &[Column]) -> Vec<String> {
    INDEXED_COLUMNS
        .iter()
        .filter(|(col, _)| columns.iter().any(|c| c.name == *col))
        .map(|(col, suffix)| {
            format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                quote(&format!("idx_{table}_{suffix}")),
                quote(table),
                quote(col)
            )
        })
        .collect()
}
