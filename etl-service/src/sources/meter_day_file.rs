use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use chrono_tz::Tz;
use meter_client::domain::{DateInput, MeterDayRecord};
use serde_json::{Map, Value};

use super::meter_day_parquet;
use crate::{
    observability::SharedReporter,
    pipeline::{PipelineError, Source},
};

pub(crate) const STAGE: &str = "source";

/// Columns every input partition must carry. `resolution` is optional.
pub const REQUIRED_COLUMNS: [&str; 4] = ["client_id", "ext_dev_ref", "date", "energy_consumption"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionFormat {
    Parquet,
    Ndjson,
}

impl PartitionFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "parquet" | "pq" => Some(Self::Parquet),
            "ndjson" | "jsonl" => Some(Self::Ndjson),
            _ => None,
        }
    }
}

/// Loads every meter-day partition matching a glob pattern into one table.
///
/// Rows are neither validated nor deduplicated here; the expander rejects
/// malformed arrays and dates. Partitions without a required column are a
/// contract violation and fail the load.
///
/// `tz` gives the calendar date of instants stored as UTC-adjusted Parquet
/// timestamps.
pub struct MeterDayFileSource {
    pattern: String,
    tz: Tz,
    reporter: SharedReporter,
}

impl MeterDayFileSource {
    pub fn new(pattern: impl Into<String>, tz: Tz, reporter: SharedReporter) -> Self {
        Self {
            pattern: pattern.into(),
            tz,
            reporter,
        }
    }

    /// Matching files in sorted order.
    pub fn partitions(&self) -> Result<Vec<PathBuf>, PipelineError> {
        let entries = glob::glob(&self.pattern).map_err(|e| {
            PipelineError::Source(format!("invalid input pattern '{}': {e}", self.pattern))
        })?;

        let mut files = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => self
                    .reporter
                    .warn(STAGE, &format!("skipping unreadable path: {e}")),
            }
        }
        files.sort();
        Ok(files)
    }
}

impl Source<MeterDayRecord> for MeterDayFileSource {
    fn load(&self) -> Result<Vec<MeterDayRecord>, PipelineError> {
        let files = self.partitions()?;
        if files.is_empty() {
            self.reporter.warn(
                STAGE,
                &format!("no input partitions found for pattern: {}", self.pattern),
            );
            return Ok(Vec::new());
        }

        let mut rows = Vec::new();
        for path in &files {
            let part = match PartitionFormat::from_path(path) {
                Some(PartitionFormat::Parquet) => meter_day_parquet::read_partition(path, self.tz)?,
                Some(PartitionFormat::Ndjson) => read_ndjson_partition(path, &*self.reporter)?,
                None => {
                    self.reporter.warn(
                        STAGE,
                        &format!("skipping {}: unsupported partition format", path.display()),
                    );
                    continue;
                }
            };
            self.reporter.info(
                STAGE,
                &format!("read {} rows from {}", part.len(), path.display()),
            );
            rows.extend(part);
        }

        metrics::counter!("source_rows_read_total").increment(rows.len() as u64);
        self.reporter
            .info(STAGE, &format!("total rows read: {}", rows.len()));
        Ok(rows)
    }
}

fn read_ndjson_partition(
    path: &Path,
    reporter: &dyn crate::observability::Reporter,
) -> Result<Vec<MeterDayRecord>, PipelineError> {
    let file = File::open(path)
        .map_err(|e| PipelineError::Source(format!("failed to open {}: {e}", path.display())))?;

    let mut rows = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| {
            PipelineError::Source(format!("failed to read {}: {e}", path.display()))
        })?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&line) {
            Ok(Value::Object(obj)) => rows.push(json_record(&obj)?),
            Ok(_) => reporter.warn(
                STAGE,
                &format!("{}:{}: expected a JSON object, line skipped", path.display(), idx + 1),
            ),
            Err(e) => {
                metrics::counter!("source_parse_errors_total").increment(1);
                reporter.warn(
                    STAGE,
                    &format!("{}:{}: invalid JSON, line skipped: {e}", path.display(), idx + 1),
                );
            }
        }
    }
    Ok(rows)
}

pub(crate) fn json_record(obj: &Map<String, Value>) -> Result<MeterDayRecord, PipelineError> {
    let field = |name: &'static str| {
        obj.get(name)
            .ok_or_else(|| PipelineError::missing_column(STAGE, name))
    };

    Ok(MeterDayRecord {
        client_id: json_text(field("client_id")?),
        ext_dev_ref: json_text(field("ext_dev_ref")?),
        date: DateInput::Text(json_text(field("date")?)),
        resolution: obj
            .get("resolution")
            .filter(|v| !v.is_null())
            .map(json_text),
        energy_consumption: json_readings(field("energy_consumption")?),
    })
}

fn json_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// `None` unless the value is an array made only of numbers.
fn json_readings(value: &Value) -> Option<Vec<f64>> {
    value.as_array()?.iter().map(Value::as_f64).collect()
}
