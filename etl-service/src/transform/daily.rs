use std::collections::HashMap;

use meter_client::domain::{DailyAggregate, HourlyFeatureRecord};

use super::series::{cumulative_sum, mean, sample_std};
use crate::pipeline::{PipelineError, Stage};

const STAGE: &str = "daily_aggregate";

/// Hours counted as night consumption.
pub const NIGHT_HOURS: std::ops::RangeInclusive<u32> = 0..=6;
/// Hours counted as evening ("day") consumption.
pub const DAY_HOURS: std::ops::RangeInclusive<u32> = 18..=23;

const RATIO_EPSILON: f64 = 1e-6;

/// Collapses hourly rows into one row per (client, device, local date).
#[derive(Debug, Clone, Default)]
pub struct DailyAggregator;

impl DailyAggregator {
    pub fn new() -> Self {
        Self
    }

    fn aggregate_day(hours: &[&HourlyFeatureRecord]) -> DailyAggregate {
        let first = hours[0];
        let values: Vec<f64> = hours.iter().map(|r| r.consumption_kwh).collect();
        let total_kwh: f64 = values.iter().sum();
        let mean_kwh = mean(&values).unwrap_or(0.0);
        let max_kwh = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        // First maximum in time order wins ties.
        let peak = hours
            .iter()
            .fold(None::<&HourlyFeatureRecord>, |best, r| match best {
                Some(b) if b.consumption_kwh >= r.consumption_kwh => Some(b),
                _ => Some(*r),
            })
            .unwrap_or(first);

        let ratio = peak.consumption_kwh / mean_kwh;
        let sum_hours = |range: &std::ops::RangeInclusive<u32>| -> f64 {
            hours
                .iter()
                .filter(|r| range.contains(&r.hour))
                .map(|r| r.consumption_kwh)
                .sum()
        };

        DailyAggregate {
            client_id: first.client_id.clone(),
            ext_dev_ref: first.ext_dev_ref.clone(),
            date_local: first.date_local,
            total_kwh,
            mean_kwh,
            max_kwh,
            std_kwh: sample_std(&values),
            hourly_count: values.len(),
            peak_hour: peak.hour,
            peak_kwh: peak.consumption_kwh,
            peak_to_mean_ratio: if ratio.is_finite() { ratio } else { 0.0 },
            night_kwh: sum_hours(&NIGHT_HOURS),
            day_kwh: sum_hours(&DAY_HOURS),
            cumulative_total_kwh: 0.0,
            weekend_vs_weekday: 0.0,
        }
    }
}

impl Stage<HourlyFeatureRecord, DailyAggregate> for DailyAggregator {
    fn name(&self) -> &'static str {
        STAGE
    }

    fn apply(&self, input: &[HourlyFeatureRecord]) -> Result<Vec<DailyAggregate>, PipelineError> {
        let mut ordered: Vec<&HourlyFeatureRecord> = input.iter().collect();
        ordered.sort_by(|a, b| {
            a.ext_dev_ref
                .cmp(&b.ext_dev_ref)
                .then_with(|| a.timestamp.cmp(&b.timestamp))
        });

        let mut groups: HashMap<(&str, &str, chrono::NaiveDate), Vec<&HourlyFeatureRecord>> =
            HashMap::new();
        for r in ordered {
            groups
                .entry((r.client_id.as_str(), r.ext_dev_ref.as_str(), r.date_local))
                .or_default()
                .push(r);
        }

        let mut days: Vec<DailyAggregate> = groups
            .values()
            .map(|hours| Self::aggregate_day(hours))
            .collect();
        days.sort_by(|a, b| {
            (a.client_id.as_str(), a.ext_dev_ref.as_str(), a.date_local).cmp(&(
                b.client_id.as_str(),
                b.ext_dev_ref.as_str(),
                b.date_local,
            ))
        });

        for run in days.chunk_by_mut(|a, b| a.client_id == b.client_id && a.ext_dev_ref == b.ext_dev_ref) {
            let totals: Vec<f64> = run.iter().map(|d| d.total_kwh).collect();
            let device_mean = mean(&totals).unwrap_or(0.0);
            for (day, cumulative) in run.iter_mut().zip(cumulative_sum(&totals)) {
                day.cumulative_total_kwh = cumulative;
                day.weekend_vs_weekday = day.total_kwh / (device_mean + RATIO_EPSILON);
            }
        }

        Ok(days)
    }
}
