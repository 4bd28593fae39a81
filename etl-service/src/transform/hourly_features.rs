use chrono::{Datelike, Timelike, Weekday};
use chrono_tz::Tz;
use meter_client::domain::{HourlyFeatureRecord, HourlyRecord, LagValue, RollingStats};

use super::series::{shift, trailing_stats_excluding};
use crate::{
    observability::SharedReporter,
    pipeline::{PipelineError, Stage},
};

const STAGE: &str = "hourly_features";

/// Normalizes timestamps and attaches calendar, lag and rolling features.
pub struct HourlyFeatureStage {
    tz: Tz,
    lags: Vec<u32>,
    window_hours: u32,
    reporter: SharedReporter,
}

impl HourlyFeatureStage {
    pub fn new(tz: Tz, lags: Vec<u32>, window_hours: u32, reporter: SharedReporter) -> Self {
        Self {
            tz,
            lags,
            window_hours,
            reporter,
        }
    }

    fn with_calendar(&self, input: &[HourlyRecord]) -> Vec<HourlyFeatureRecord> {
        let mut dropped = 0usize;
        let rows: Vec<_> = input
            .iter()
            .filter_map(|r| {
                let Some(ts) = r.timestamp_local.to_zone(self.tz) else {
                    dropped += 1;
                    return None;
                };
                let weekday = ts.weekday();
                Some(HourlyFeatureRecord {
                    client_id: r.client_id.clone(),
                    ext_dev_ref: r.ext_dev_ref.clone(),
                    resolution: r.resolution.clone(),
                    date_local: ts.date_naive(),
                    hour: ts.hour(),
                    timestamp_local: r.timestamp_local.to_string(),
                    timestamp_utc: r.timestamp_utc.clone(),
                    consumption_kwh: r.consumption_kwh,
                    timestamp: ts,
                    day_of_week: weekday.num_days_from_monday(),
                    is_weekend: matches!(weekday, Weekday::Sat | Weekday::Sun),
                    month: ts.month(),
                    year: ts.year(),
                    lags: Vec::new(),
                    rolling: RollingStats {
                        window_hours: self.window_hours,
                        mean: None,
                        std: 0.0,
                    },
                })
            })
            .collect();

        if dropped > 0 {
            metrics::counter!("hourly_timestamps_dropped_total").increment(dropped as u64);
            self.reporter.warn(
                STAGE,
                &format!("{dropped} timestamp_local values could not be parsed and were dropped"),
            );
        }
        rows
    }
}

impl Stage<HourlyRecord, HourlyFeatureRecord> for HourlyFeatureStage {
    fn name(&self) -> &'static str {
        STAGE
    }

    fn apply(&self, input: &[HourlyRecord]) -> Result<Vec<HourlyFeatureRecord>, PipelineError> {
        let mut rows = self.with_calendar(input);

        // Lags and windows walk each device's own sequence in time order.
        rows.sort_by(|a, b| {
            a.ext_dev_ref
                .cmp(&b.ext_dev_ref)
                .then_with(|| a.timestamp.cmp(&b.timestamp))
        });

        for run in rows.chunk_by_mut(|a, b| a.ext_dev_ref == b.ext_dev_ref) {
            let values: Vec<f64> = run.iter().map(|r| r.consumption_kwh).collect();
            let lagged: Vec<(u32, Vec<Option<f64>>)> = self
                .lags
                .iter()
                .map(|&hours| (hours, shift(&values, hours as usize)))
                .collect();
            let stats = trailing_stats_excluding(&values, self.window_hours as usize);

            for (i, row) in run.iter_mut().enumerate() {
                row.lags = lagged
                    .iter()
                    .map(|(hours, shifted)| LagValue {
                        hours: *hours,
                        value: shifted[i],
                    })
                    .collect();
                let (mean, std) = stats[i];
                row.rolling = RollingStats {
                    window_hours: self.window_hours,
                    mean,
                    std,
                };
            }
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::MemoryReporter;
    use chrono::NaiveDate;
    use chrono_tz::Europe::Vilnius;
    use meter_client::domain::TimestampInput;
    use std::sync::Arc;

    fn hourly(dev: &str, ts: &str, kwh: f64) -> HourlyRecord {
        HourlyRecord {
            client_id: "c-1".to_string(),
            ext_dev_ref: dev.to_string(),
            resolution: None,
            date_local: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            hour: 99,
            timestamp_local: TimestampInput::Text(ts.to_string()),
            timestamp_utc: String::new(),
            consumption_kwh: kwh,
        }
    }

    fn stage(reporter: Arc<MemoryReporter>) -> HourlyFeatureStage {
        HourlyFeatureStage::new(Vilnius, vec![1, 24], 24, reporter)
    }

    fn series(dev: &str, n: usize) -> Vec<HourlyRecord> {
        (0..n)
            .map(|i| {
                let day = 1 + i / 24;
                let hour = i % 24;
                hourly(dev, &format!("2024-01-{day:02}T{hour:02}:00:00+02:00"), i as f64)
            })
            .collect()
    }

    #[test]
    fn calendar_features_come_from_normalized_timestamp() {
        let rows = stage(Arc::new(MemoryReporter::new()))
            .apply(&[hourly("dev-1", "2024-06-15T21:00:00Z", 1.0)])
            .unwrap();

        let row = &rows[0];
        assert_eq!(row.timestamp.to_rfc3339(), "2024-06-16T00:00:00+03:00");
        assert_eq!(row.hour, 0);
        assert_eq!(row.date_local.to_string(), "2024-06-16");
        assert_eq!(row.day_of_week, 6);
        assert!(row.is_weekend);
        assert_eq!((row.year, row.month), (2024, 6));
    }

    #[test]
    fn unparseable_timestamps_are_dropped_and_counted() {
        let reporter = Arc::new(MemoryReporter::new());
        let rows = stage(reporter.clone())
            .apply(&[
                hourly("dev-1", "2024-06-15T10:00:00", 1.0),
                hourly("dev-1", "garbage", 2.0),
                hourly("dev-1", "", 3.0),
            ])
            .unwrap();

        assert_eq!(rows.len(), 1);
        let warnings = reporter.warnings_for(STAGE);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("2 "));
    }

    #[test]
    fn lags_follow_each_device_sequence() {
        let mut input = series("dev-b", 30);
        input.extend(series("dev-a", 30));
        input.reverse();

        let rows = stage(Arc::new(MemoryReporter::new())).apply(&input).unwrap();
        assert_eq!(rows.len(), 60);

        for run in rows.chunk_by(|a, b| a.ext_dev_ref == b.ext_dev_ref) {
            assert_eq!(run[0].lag(1), None);
            for i in 1..run.len() {
                assert_eq!(run[i].lag(1), Some(run[i - 1].consumption_kwh));
            }
            assert_eq!(run[23].lag(24), None);
            assert_eq!(run[24].lag(24), Some(run[0].consumption_kwh));
        }
    }

    #[test]
    fn rolling_window_excludes_current_sample() {
        let rows = stage(Arc::new(MemoryReporter::new()))
            .apply(&series("dev-1", 30))
            .unwrap();

        assert_eq!(rows[0].rolling.mean, None);
        assert_eq!(rows[0].rolling.std, 0.0);
        assert_eq!(rows[1].rolling.mean, Some(0.0));
        assert_eq!(rows[1].rolling.std, 0.0);
        assert_eq!(rows[2].rolling.mean, Some(0.5));
        // samples 0..=23 precede row 24
        assert_eq!(rows[24].rolling.mean, Some(11.5));
        // samples 5..=28 precede row 29
        assert_eq!(rows[29].rolling.mean, Some(16.5));
        assert!((rows[29].rolling.std - 7.0710678118654755).abs() < 1e-9);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let rows = stage(Arc::new(MemoryReporter::new())).apply(&[]).unwrap();
        assert!(rows.is_empty());
    }
}
