use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::pipeline::{Cell, Column, PipelineError, Sink, TableRow};

/// Writes whole tables as `<dir>/<name>.csv`, replacing any previous file.
///
/// Nulls are empty fields and flags are 0/1. An empty table is written as
/// its header line.
#[derive(Debug, Clone)]
pub struct CsvExporter {
    dir: PathBuf,
}

impl CsvExporter {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.csv"))
    }

    pub fn write_table<T: TableRow>(
        &self,
        name: &str,
        columns: &[Column],
        rows: &[T],
    ) -> Result<PathBuf, PipelineError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            PipelineError::Sink(format!("failed to create {}: {e}", self.dir.display()))
        })?;
        let path = self.path_for(name);
        write_rows(&path, columns, rows)?;

        metrics::counter!("csv_exports_total").increment(1);
        tracing::info!(path = %path.display(), rows = rows.len(), "csv export written");
        Ok(path)
    }
}

fn write_rows<T: TableRow>(path: &Path, columns: &[Column], rows: &[T]) -> Result<(), PipelineError> {
    let sink_err = |e: csv::Error| PipelineError::Sink(format!("{}: {e}", path.display()));

    let mut wtr = csv::Writer::from_path(path).map_err(sink_err)?;
    wtr.write_record(columns.iter().map(|c| c.name.as_str()))
        .map_err(sink_err)?;
    for row in rows {
        wtr.write_record(row.cells().iter().map(Cell::to_string))
            .map_err(sink_err)?;
    }
    wtr.flush()
        .map_err(|e| PipelineError::Sink(format!("{}: {e}", path.display())))
}

#[async_trait::async_trait]
impl<T> Sink<T> for CsvExporter
where
    T: TableRow + Sync,
{
    async fn write(&self, name: &str, columns: &[Column], rows: &[T]) -> Result<u64, PipelineError> {
        self.write_table(name, columns, rows)?;
        Ok(rows.len() as u64)
    }
}
