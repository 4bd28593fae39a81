use std::{fs::File, path::PathBuf};

use chrono::NaiveDate;
use csv::StringRecord;
use meter_client::domain::{HourlyRecord, TimestampInput};

use crate::{
    observability::SharedReporter,
    pipeline::{PipelineError, Source},
};

const STAGE: &str = "hourly_csv_source";

/// Columns an exported hourly table must carry to be replayed.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "client_id",
    "ext_dev_ref",
    "date_local",
    "hour",
    "timestamp_local",
    "consumption_kwh",
];

/// Replays a previously exported `meter_hourly_raw.csv`.
///
/// Expected header columns (by name):
/// - client_id
/// - ext_dev_ref
/// - resolution (optional)
/// - date_local (YYYY-MM-DD)
/// - hour
/// - timestamp_local (read as text, normalized by the feature stage)
/// - timestamp_utc (optional)
/// - consumption_kwh
pub struct HourlyCsvFileSource {
    path: PathBuf,
    reporter: SharedReporter,
}

impl HourlyCsvFileSource {
    pub fn new<P: Into<PathBuf>>(path: P, reporter: SharedReporter) -> Self {
        Self {
            path: path.into(),
            reporter,
        }
    }
}

fn parse_optional_string(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn record_to_hourly(record: &StringRecord, headers: &StringRecord) -> Result<HourlyRecord, String> {
    let get = |name: &str| -> &str {
        headers
            .iter()
            .position(|h| h == name)
            .and_then(|idx| record.get(idx))
            .unwrap_or("")
    };

    let date_str = get("date_local");
    let date_local = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
        .map_err(|e| format!("invalid date_local '{date_str}': {e}"))?;

    let hour_str = get("hour");
    let hour: u32 = hour_str
        .trim()
        .parse()
        .map_err(|e| format!("invalid hour '{hour_str}': {e}"))?;

    let kwh_str = get("consumption_kwh");
    let consumption_kwh: f64 = kwh_str
        .trim()
        .parse()
        .map_err(|e| format!("invalid consumption_kwh '{kwh_str}': {e}"))?;

    Ok(HourlyRecord {
        client_id: get("client_id").to_string(),
        ext_dev_ref: get("ext_dev_ref").to_string(),
        resolution: parse_optional_string(get("resolution")),
        date_local,
        hour,
        timestamp_local: TimestampInput::Text(get("timestamp_local").to_string()),
        timestamp_utc: get("timestamp_utc").to_string(),
        consumption_kwh,
    })
}

impl Source<HourlyRecord> for HourlyCsvFileSource {
    fn load(&self) -> Result<Vec<HourlyRecord>, PipelineError> {
        let file = File::open(&self.path).map_err(|e| {
            PipelineError::Source(format!("failed to open {}: {e}", self.path.display()))
        })?;
        let mut rdr = csv::Reader::from_reader(file);
        let headers = rdr
            .headers()
            .map_err(|e| PipelineError::Source(format!("failed to read CSV headers: {e}")))?
            .clone();

        if let Some(missing) = REQUIRED_COLUMNS
            .iter()
            .find(|c| !headers.iter().any(|h| h == **c))
        {
            return Err(PipelineError::missing_column(STAGE, *missing));
        }

        let mut rows = Vec::new();
        for (idx, result) in rdr.records().enumerate() {
            let record = result
                .map_err(|e| PipelineError::Source(format!("failed to read CSV record: {e}")))?;

            match record_to_hourly(&record, &headers) {
                Ok(row) => rows.push(row),
                Err(reason) => {
                    metrics::counter!("hourly_csv_parse_errors_total").increment(1);
                    self.reporter
                        .warn(STAGE, &format!("skipping record {}: {reason}", idx + 1));
                }
            }
        }

        self.reporter.info(
            STAGE,
            &format!("read {} hourly rows from {}", rows.len(), self.path.display()),
        );
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::MemoryReporter;
    use std::{io::Write, sync::Arc};

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn reads_exported_hourly_rows() {
        let f = write_csv(
            "client_id,ext_dev_ref,resolution,date_local,hour,timestamp_local,timestamp_utc,consumption_kwh\n\
             c-1,dev-1,PT1H,2024-06-15,0,2024-06-15T00:00:00+03:00,2024-06-14T21:00:00+00:00,0.5\n\
             c-1,dev-1,,2024-06-15,1,2024-06-15T01:00:00+03:00,2024-06-14T22:00:00+00:00,1.25\n",
        );
        let rows = HourlyCsvFileSource::new(f.path(), Arc::new(MemoryReporter::new()))
            .load()
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].resolution.as_deref(), Some("PT1H"));
        assert_eq!(rows[1].resolution, None);
        assert_eq!(rows[1].hour, 1);
        assert_eq!(rows[1].consumption_kwh, 1.25);
        assert_eq!(
            rows[0].timestamp_local,
            TimestampInput::Text("2024-06-15T00:00:00+03:00".to_string())
        );
    }

    #[test]
    fn bad_values_are_skipped_and_reported() {
        let f = write_csv(
            "client_id,ext_dev_ref,date_local,hour,timestamp_local,consumption_kwh\n\
             c-1,dev-1,2024-06-15,0,2024-06-15 00:00:00,abc\n\
             c-1,dev-1,2024-06-15,1,2024-06-15 01:00:00,2\n",
        );
        let reporter = Arc::new(MemoryReporter::new());
        let rows = HourlyCsvFileSource::new(f.path(), reporter.clone())
            .load()
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp_utc, "");
        assert_eq!(reporter.warnings_for(STAGE).len(), 1);
    }

    #[test]
    fn missing_header_is_fatal() {
        let f = write_csv("client_id,ext_dev_ref,date_local,hour,consumption_kwh\n");
        let err = HourlyCsvFileSource::new(f.path(), Arc::new(MemoryReporter::new()))
            .load()
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingColumn { ref column, .. } if column == "timestamp_local"
        ));
    }
}
