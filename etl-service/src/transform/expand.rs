use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use meter_client::domain::{
    timestamp::localize, HourlyRecord, MeterDayRecord, TimestampInput, HOURS_PER_DAY,
};

use crate::{
    observability::SharedReporter,
    pipeline::{PipelineError, Stage},
};

const STAGE: &str = "expand";

/// Turns meter-day arrays into timestamped hourly rows in the configured zone.
pub struct HourlyExpander {
    tz: Tz,
    reporter: SharedReporter,
}

impl HourlyExpander {
    pub fn new(tz: Tz, reporter: SharedReporter) -> Self {
        Self { tz, reporter }
    }

    /// Local midnight of `day`. An ambiguous midnight takes the earlier
    /// instant; a midnight inside a gap moves to the first hour after it.
    pub fn local_midnight(&self, day: NaiveDate) -> Option<DateTime<Tz>> {
        let midnight = day.and_time(NaiveTime::MIN);
        localize(self.tz, &midnight).or_else(|| localize(self.tz, &(midnight + Duration::hours(1))))
    }

    fn expand_one(&self, idx: usize, record: &MeterDayRecord, out: &mut Vec<HourlyRecord>) {
        let Some(readings) = record.hourly_readings() else {
            let len = record
                .energy_consumption
                .as_ref()
                .map(|v| v.len().to_string())
                .unwrap_or_else(|| "not an array".to_string());
            self.skip(idx, record, &format!("invalid array (length {len})"));
            return;
        };

        let Some(day) = record.date.resolve() else {
            self.skip(idx, record, "unparseable date");
            return;
        };

        let Some(midnight) = self.local_midnight(day) else {
            self.skip(idx, record, "local midnight does not exist");
            return;
        };

        for (hour, value) in readings.iter().enumerate() {
            let ts_local = midnight + Duration::hours(hour as i64);
            out.push(HourlyRecord {
                client_id: record.client_id.clone(),
                ext_dev_ref: record.ext_dev_ref.clone(),
                resolution: record.resolution.clone(),
                date_local: day,
                hour: hour as u32,
                timestamp_local: TimestampInput::Aware(ts_local.fixed_offset()),
                timestamp_utc: ts_local.with_timezone(&Utc).to_rfc3339(),
                consumption_kwh: *value,
            });
        }
    }

    fn skip(&self, idx: usize, record: &MeterDayRecord, reason: &str) {
        metrics::counter!("expand_rows_skipped_total").increment(1);
        self.reporter.warn(
            STAGE,
            &format!(
                "skipping row idx={idx} ext_dev_ref={} date={}: {reason}",
                record.ext_dev_ref, record.date
            ),
        );
    }
}

impl Stage<MeterDayRecord, HourlyRecord> for HourlyExpander {
    fn name(&self) -> &'static str {
        STAGE
    }

    fn apply(&self, input: &[MeterDayRecord]) -> Result<Vec<HourlyRecord>, PipelineError> {
        let mut rows = Vec::with_capacity(input.len() * HOURS_PER_DAY);
        for (idx, record) in input.iter().enumerate() {
            self.expand_one(idx, record, &mut rows);
        }

        if rows.is_empty() {
            self.reporter.warn(STAGE, "resulting hourly table is empty");
            return Ok(rows);
        }

        // Every local timestamp of the table shares the zone, so ordering by
        // instant equals ordering by local wall time.
        rows.sort_by(|a, b| {
            a.ext_dev_ref
                .cmp(&b.ext_dev_ref)
                .then_with(|| instant(&a.timestamp_local).cmp(&instant(&b.timestamp_local)))
        });
        self.reporter
            .info(STAGE, &format!("expanded into {} hourly rows", rows.len()));
        Ok(rows)
    }
}

fn instant(ts: &TimestampInput) -> Option<DateTime<Utc>> {
    match ts {
        TimestampInput::Aware(t) => Some(t.with_timezone(&Utc)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::{MemoryReporter, Severity};
    use chrono_tz::Europe::Vilnius;
    use meter_client::domain::DateInput;
    use std::sync::Arc;

    fn day_record(dev: &str, date: &str, values: Vec<f64>) -> MeterDayRecord {
        MeterDayRecord {
            client_id: "c-1".to_string(),
            ext_dev_ref: dev.to_string(),
            date: DateInput::Text(date.to_string()),
            resolution: Some("PT1H".to_string()),
            energy_consumption: Some(values),
        }
    }

    fn ramp() -> Vec<f64> {
        (0..24).map(f64::from).collect()
    }

    fn expander() -> (HourlyExpander, Arc<MemoryReporter>) {
        let reporter = Arc::new(MemoryReporter::new());
        (HourlyExpander::new(Vilnius, reporter.clone()), reporter)
    }

    #[test]
    fn expands_one_day_into_contiguous_hours() {
        let (expander, _) = expander();
        let rows = expander
            .apply(&[day_record("dev-1", "2024-06-15", ramp())])
            .unwrap();

        assert_eq!(rows.len(), 24);
        assert_eq!(rows[0].timestamp_local.to_string(), "2024-06-15T00:00:00+03:00");
        assert_eq!(rows[0].timestamp_utc, "2024-06-14T21:00:00+00:00");
        assert_eq!(rows[23].timestamp_local.to_string(), "2024-06-15T23:00:00+03:00");
        for (h, row) in rows.iter().enumerate() {
            assert_eq!(row.hour, h as u32);
            assert_eq!(row.consumption_kwh, h as f64);
            assert_eq!(row.date_local.to_string(), "2024-06-15");
        }
        let instants: Vec<_> = rows.iter().map(|r| instant(&r.timestamp_local).unwrap()).collect();
        assert!(instants.windows(2).all(|w| w[1] - w[0] == Duration::hours(1)));
    }

    #[test]
    fn wrong_length_rows_are_skipped_with_warning() {
        let (expander, reporter) = expander();
        let rows = expander
            .apply(&[
                day_record("dev-1", "2024-06-15", vec![1.0; 23]),
                day_record("dev-2", "2024-06-15", ramp()),
            ])
            .unwrap();

        assert_eq!(rows.len(), 24);
        assert!(rows.iter().all(|r| r.ext_dev_ref == "dev-2"));
        let warnings = reporter.warnings_for(STAGE);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("dev-1"));
        assert!(warnings[0].contains("2024-06-15"));
    }

    #[test]
    fn non_array_and_bad_date_rows_are_skipped() {
        let (expander, reporter) = expander();
        let mut not_array = day_record("dev-1", "2024-06-15", vec![]);
        not_array.energy_consumption = None;
        let bad_date = day_record("dev-1", "someday", ramp());

        let rows = expander.apply(&[not_array, bad_date]).unwrap();
        assert!(rows.is_empty());
        // two skips plus the empty-table warning
        assert_eq!(reporter.count(Severity::Warn), 3);
    }

    #[test]
    fn output_is_sorted_by_device_then_time() {
        let (expander, _) = expander();
        let rows = expander
            .apply(&[
                day_record("dev-b", "2024-06-16", ramp()),
                day_record("dev-a", "2024-06-16", ramp()),
                day_record("dev-b", "2024-06-15", ramp()),
            ])
            .unwrap();

        assert_eq!(rows.len(), 72);
        assert!(rows[..24].iter().all(|r| r.ext_dev_ref == "dev-a"));
        assert_eq!(rows[24].date_local.to_string(), "2024-06-15");
        assert_eq!(rows[48].date_local.to_string(), "2024-06-16");
    }

    #[test]
    fn spring_forward_day_stays_contiguous_in_absolute_time() {
        let (expander, _) = expander();
        let rows = expander
            .apply(&[day_record("dev-1", "2024-03-31", ramp())])
            .unwrap();

        assert_eq!(rows[0].timestamp_local.to_string(), "2024-03-31T00:00:00+02:00");
        assert_eq!(rows[3].timestamp_local.to_string(), "2024-03-31T04:00:00+03:00");
        assert_eq!(rows[23].timestamp_local.to_string(), "2024-04-01T00:00:00+03:00");
        assert_eq!(rows[23].hour, 23);
    }

    #[test]
    fn expansion_is_deterministic() {
        let (expander, _) = expander();
        let input = [
            day_record("dev-1", "2024-06-15", ramp()),
            day_record("dev-2", "2024-06-15", vec![0.5; 24]),
        ];
        assert_eq!(expander.apply(&input).unwrap(), expander.apply(&input).unwrap());
    }
}
