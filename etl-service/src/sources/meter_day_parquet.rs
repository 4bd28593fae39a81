use std::{fs::File, path::Path};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use meter_client::domain::{DateInput, MeterDayRecord};
use parquet::{
    basic::{ConvertedType, LogicalType, TimeUnit},
    file::reader::{FileReader, SerializedFileReader},
    record::{Field, Row},
    schema::types::Type,
};

use super::meter_day_file::{REQUIRED_COLUMNS, STAGE};
use crate::pipeline::PipelineError;

/// Days between 0001-01-01 (CE day 1) and the Unix epoch.
const UNIX_EPOCH_CE_DAYS: i32 = 719_163;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EpochUnit {
    Millis,
    Micros,
    Nanos,
}

impl EpochUnit {
    fn per_second(self) -> i64 {
        match self {
            Self::Millis => 1_000,
            Self::Micros => 1_000_000,
            Self::Nanos => 1_000_000_000,
        }
    }
}

/// How the `date` column stores its values, read from the file schema.
///
/// The record API only decodes millisecond and microsecond timestamps that
/// carry a legacy converted type; nanosecond timestamps arrive as plain
/// longs and are recognised through the logical type here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct DateEncoding {
    unit: Option<EpochUnit>,
    utc_adjusted: bool,
}

impl DateEncoding {
    fn of(field: &Type) -> Self {
        let info = field.get_basic_info();
        if let Some(LogicalType::Timestamp {
            is_adjusted_to_u_t_c: is_adjusted_to_utc,
            unit,
        }) = info.logical_type()
        {
            #[allow(unreachable_patterns)]
            let unit = match unit {
                TimeUnit::MILLIS(_) => Some(EpochUnit::Millis),
                TimeUnit::MICROS(_) => Some(EpochUnit::Micros),
                TimeUnit::NANOS(_) => Some(EpochUnit::Nanos),
                _ => None,
            };
            return Self {
                unit,
                utc_adjusted: is_adjusted_to_utc,
            };
        }
        // Legacy converted timestamps are UTC instants.
        match info.converted_type() {
            ConvertedType::TIMESTAMP_MILLIS => Self {
                unit: Some(EpochUnit::Millis),
                utc_adjusted: true,
            },
            ConvertedType::TIMESTAMP_MICROS => Self {
                unit: Some(EpochUnit::Micros),
                utc_adjusted: true,
            },
            _ => Self::default(),
        }
    }
}

/// Read one Parquet partition with the record API.
///
/// Dates stored as UTC-adjusted timestamps take their calendar date in `tz`;
/// local (non-adjusted) timestamps keep their wall-clock date.
pub fn read_partition(path: &Path, tz: Tz) -> Result<Vec<MeterDayRecord>, PipelineError> {
    let file = File::open(path)
        .map_err(|e| PipelineError::Source(format!("failed to open {}: {e}", path.display())))?;
    let reader = SerializedFileReader::new(file).map_err(|e| {
        PipelineError::Source(format!("failed to read parquet footer of {}: {e}", path.display()))
    })?;

    let schema = reader.metadata().file_metadata().schema();
    let fields = schema.get_fields();
    let present: Vec<&str> = fields.iter().map(|f| f.name()).collect();
    if let Some(missing) = REQUIRED_COLUMNS.iter().find(|c| !present.contains(*c)) {
        return Err(PipelineError::missing_column(STAGE, *missing));
    }
    let encoding = fields
        .iter()
        .find(|f| f.name() == "date")
        .map(|f| DateEncoding::of(f))
        .unwrap_or_default();

    let rows = reader.get_row_iter(None).map_err(|e| {
        PipelineError::Source(format!("failed to iterate {}: {e}", path.display()))
    })?;

    let mut out = Vec::with_capacity(reader.metadata().file_metadata().num_rows().max(0) as usize);
    for row in rows {
        let row = row.map_err(|e| {
            PipelineError::Source(format!("failed to decode row in {}: {e}", path.display()))
        })?;
        out.push(row_to_record(&row, encoding, tz));
    }
    Ok(out)
}

fn row_to_record(row: &Row, encoding: DateEncoding, tz: Tz) -> MeterDayRecord {
    let mut record = MeterDayRecord {
        client_id: String::new(),
        ext_dev_ref: String::new(),
        date: DateInput::Text(String::new()),
        resolution: None,
        energy_consumption: None,
    };

    for (name, field) in row.get_column_iter() {
        match name.as_str() {
            "client_id" => record.client_id = field_text(field),
            "ext_dev_ref" => record.ext_dev_ref = field_text(field),
            "date" => record.date = field_date(field, encoding, tz),
            "resolution" => {
                record.resolution = match field {
                    Field::Null => None,
                    other => Some(field_text(other)),
                }
            }
            "energy_consumption" => record.energy_consumption = field_readings(field),
            _ => {}
        }
    }
    record
}

fn field_text(field: &Field) -> String {
    match field {
        Field::Str(s) => s.clone(),
        Field::Null => String::new(),
        other => other.to_string(),
    }
}

fn field_date(field: &Field, encoding: DateEncoding, tz: Tz) -> DateInput {
    let instant = match (field, encoding.unit) {
        (Field::Date(days), _) => {
            return days
                .checked_add(UNIX_EPOCH_CE_DAYS)
                .and_then(NaiveDate::from_num_days_from_ce_opt)
                .map(DateInput::Date)
                .unwrap_or_else(|| DateInput::Text(field_text(field)));
        }
        (Field::TimestampMillis(v), _) => from_epoch(*v, EpochUnit::Millis),
        (Field::TimestampMicros(v), _) => from_epoch(*v, EpochUnit::Micros),
        (Field::Long(v), Some(unit)) => from_epoch(*v, unit),
        _ => None,
    };
    match instant {
        Some(t) if encoding.utc_adjusted => DateInput::Date(t.with_timezone(&tz).date_naive()),
        Some(t) => DateInput::Timestamp(t.naive_utc()),
        None => DateInput::Text(field_text(field)),
    }
}

fn from_epoch(value: i64, unit: EpochUnit) -> Option<DateTime<Utc>> {
    let per_second = unit.per_second();
    let nanos = value.rem_euclid(per_second) * (1_000_000_000 / per_second);
    DateTime::from_timestamp(value.div_euclid(per_second), nanos as u32)
}

/// `None` for anything but a list made only of numbers.
fn field_readings(field: &Field) -> Option<Vec<f64>> {
    let Field::ListInternal(list) = field else {
        return None;
    };
    list.elements().iter().map(field_number).collect()
}

fn field_number(field: &Field) -> Option<f64> {
    match field {
        Field::Double(v) => Some(*v),
        Field::Float(v) => Some(f64::from(*v)),
        Field::Byte(v) => Some(f64::from(*v)),
        Field::Short(v) => Some(f64::from(*v)),
        Field::Int(v) => Some(f64::from(*v)),
        Field::Long(v) => Some(*v as f64),
        Field::UByte(v) => Some(f64::from(*v)),
        Field::UShort(v) => Some(f64::from(*v)),
        Field::UInt(v) => Some(f64::from(*v)),
        Field::ULong(v) => Some(*v as f64),
        _ => None,
    }
}
