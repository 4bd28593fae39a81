use chrono::Datelike;
use meter_client::domain::{DailyRecord, MonthlyRecord};

use super::series::round6;
use crate::pipeline::{PipelineError, Stage};

const STAGE: &str = "monthly_aggregate";

/// Collapses daily rows into one row per (client, device, year, month).
#[derive(Debug, Clone, Default)]
pub struct MonthlyAggregator;

impl MonthlyAggregator {
    pub fn new() -> Self {
        Self
    }
}

impl Stage<DailyRecord, MonthlyRecord> for MonthlyAggregator {
    fn name(&self) -> &'static str {
        STAGE
    }

    fn apply(&self, input: &[DailyRecord]) -> Result<Vec<MonthlyRecord>, PipelineError> {
        let key = |d: &DailyRecord| {
            let a = &d.aggregate;
            (
                a.client_id.clone(),
                a.ext_dev_ref.clone(),
                a.date_local.year(),
                a.date_local.month(),
            )
        };

        let mut ordered: Vec<&DailyRecord> = input.iter().collect();
        ordered.sort_by_cached_key(|d| key(d));

        let months = ordered
            .chunk_by(|a, b| key(a) == key(b))
            .map(|days| {
                let (client_id, ext_dev_ref, year, month) = key(days[0]);
                let totals: Vec<f64> = days.iter().map(|d| d.aggregate.total_kwh).collect();
                let sum: f64 = totals.iter().sum();
                let max = totals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                MonthlyRecord {
                    client_id,
                    ext_dev_ref,
                    year,
                    month,
                    monthly_total_kwh: round6(sum),
                    monthly_mean_kwh: round6(sum / totals.len() as f64),
                    monthly_max_kwh: round6(max),
                    days_with_data: totals.len() as i64,
                }
            })
            .collect();

        Ok(months)
    }
}
