use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;

use super::timestamp::TimestampInput;

/// One expanded hourly reading.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyRecord {
    pub client_id: String,
    pub ext_dev_ref: String,
    pub resolution: Option<String>,
    pub date_local: NaiveDate,
    pub hour: u32,
    pub timestamp_local: TimestampInput,
    /// RFC 3339 rendering of the same instant in UTC; passed through as-is.
    pub timestamp_utc: String,
    pub consumption_kwh: f64,
}

/// Consumption of the same device `hours` samples earlier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagValue {
    pub hours: u32,
    pub value: Option<f64>,
}

/// Trailing statistics over the samples strictly preceding a reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingStats {
    pub window_hours: u32,
    /// `None` for the first sample of a device.
    pub mean: Option<f64>,
    /// 0 whenever the deviation is undefined.
    pub std: f64,
}

/// Hourly reading with calendar, lag and rolling features attached.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyFeatureRecord {
    pub client_id: String,
    pub ext_dev_ref: String,
    pub resolution: Option<String>,
    /// Re-derived from `timestamp`.
    pub date_local: NaiveDate,
    /// Re-derived from `timestamp`.
    pub hour: u32,
    pub timestamp_local: String,
    pub timestamp_utc: String,
    pub consumption_kwh: f64,
    pub timestamp: DateTime<Tz>,
    /// 0 = Monday.
    pub day_of_week: u32,
    pub is_weekend: bool,
    pub month: u32,
    pub year: i32,
    pub lags: Vec<LagValue>,
    pub rolling: RollingStats,
}

impl HourlyFeatureRecord {
    pub fn lag(&self, hours: u32) -> Option<f64> {
        self.lags
            .iter()
            .find(|l| l.hours == hours)
            .and_then(|l| l.value)
    }
}
