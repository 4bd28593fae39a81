use chrono::{NaiveDate, NaiveDateTime};

/// Number of hourly readings carried by one meter-day record.
pub const HOURS_PER_DAY: usize = 24;

/// Calendar date as it arrives from an input partition.
///
/// Partitions written by different producers store the day either as a typed
/// date, as a timestamp at (or near) midnight, or as plain text.
#[derive(Debug, Clone, PartialEq)]
pub enum DateInput {
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Text(String),
}

impl DateInput {
    /// Resolve to a calendar date. Text accepts `YYYY-MM-DD` optionally
    /// followed by a time part (`2024-06-15T00:00:00`, `2024-06-15 00:00`).
    pub fn resolve(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            Self::Timestamp(ts) => Some(ts.date()),
            Self::Text(s) => {
                let s = s.trim();
                let day = s.get(..10).unwrap_or(s);
                NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
            }
        }
    }
}

impl std::fmt::Display for DateInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Date(d) => write!(f, "{d}"),
            Self::Timestamp(ts) => write!(f, "{ts}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One input row: 24 hourly readings of a device for one local calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterDayRecord {
    pub client_id: String,
    pub ext_dev_ref: String,
    pub date: DateInput,
    pub resolution: Option<String>,
    /// `None` when the stored value was not a numeric list at all.
    pub energy_consumption: Option<Vec<f64>>,
}

impl MeterDayRecord {
    /// The readings when they form a complete day, `None` otherwise.
    pub fn hourly_readings(&self) -> Option<&[f64]> {
        self.energy_consumption
            .as_deref()
            .filter(|values| values.len() == HOURS_PER_DAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(values: Option<Vec<f64>>) -> MeterDayRecord {
        MeterDayRecord {
            client_id: "c-1".to_string(),
            ext_dev_ref: "dev-1".to_string(),
            date: DateInput::Text("2024-06-15".to_string()),
            resolution: Some("PT1H".to_string()),
            energy_consumption: values,
        }
    }

    #[test]
    fn date_input_resolves_all_shapes() {
        let expected = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(DateInput::Date(expected).resolve(), Some(expected));
        assert_eq!(
            DateInput::Timestamp(expected.and_hms_opt(0, 0, 0).unwrap()).resolve(),
            Some(expected)
        );
        assert_eq!(DateInput::Text("2024-06-15".into()).resolve(), Some(expected));
        assert_eq!(
            DateInput::Text("2024-06-15T00:00:00".into()).resolve(),
            Some(expected)
        );
        assert_eq!(DateInput::Text("15/06/2024".into()).resolve(), None);
    }

    #[test]
    fn hourly_readings_requires_full_day() {
        assert!(record(Some(vec![1.0; 24])).hourly_readings().is_some());
        assert!(record(Some(vec![1.0; 23])).hourly_readings().is_none());
        assert!(record(Some(vec![1.0; 25])).hourly_readings().is_none());
        assert!(record(None).hourly_readings().is_none());
    }
}
