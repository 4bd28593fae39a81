use chrono::Datelike;
use meter_client::domain::{ConsumptionCategory, DailyAggregate, DailyRecord, RollingTotal, Season};

use super::{
    holidays::HolidayCalendar,
    series::{round6, trailing_mean_including},
};
use crate::pipeline::{PipelineError, Stage};

const STAGE: &str = "daily_enrich";

/// Adds calendar flags, trailing multi-day means and the consumption band.
pub struct DailyEnrichment {
    calendar: Box<dyn HolidayCalendar>,
    windows: Vec<u32>,
}

impl DailyEnrichment {
    pub fn new(calendar: Box<dyn HolidayCalendar>, windows: Vec<u32>) -> Self {
        Self { calendar, windows }
    }

    fn flags(&self, day: &DailyAggregate) -> DailyRecord {
        let month = day.date_local.month();
        DailyRecord {
            aggregate: day.clone(),
            month,
            season: Season::from_month(month),
            is_holiday: self.calendar.is_holiday(day.date_local),
            is_summer_vacation: matches!(month, 7 | 8),
            rolling_totals: Vec::new(),
            consumption_category: ConsumptionCategory::from_total(day.total_kwh),
            daily_load_similarity: None,
        }
    }
}

impl Stage<DailyAggregate, DailyRecord> for DailyEnrichment {
    fn name(&self) -> &'static str {
        STAGE
    }

    fn apply(&self, input: &[DailyAggregate]) -> Result<Vec<DailyRecord>, PipelineError> {
        let mut rows: Vec<DailyRecord> = input.iter().map(|d| self.flags(d)).collect();
        rows.sort_by(|a, b| {
            let (a, b) = (&a.aggregate, &b.aggregate);
            (a.client_id.as_str(), a.ext_dev_ref.as_str(), a.date_local).cmp(&(
                b.client_id.as_str(),
                b.ext_dev_ref.as_str(),
                b.date_local,
            ))
        });

        for run in rows.chunk_by_mut(|a, b| {
            a.aggregate.client_id == b.aggregate.client_id
                && a.aggregate.ext_dev_ref == b.aggregate.ext_dev_ref
        }) {
            let totals: Vec<f64> = run.iter().map(|d| d.aggregate.total_kwh).collect();
            let means: Vec<(u32, Vec<f64>)> = self
                .windows
                .iter()
                .map(|&w| (w, trailing_mean_including(&totals, w as usize)))
                .collect();
            for (i, row) in run.iter_mut().enumerate() {
                row.rolling_totals = means
                    .iter()
                    .map(|(w, m)| RollingTotal {
                        window_days: *w,
                        mean_total_kwh: round6(m[i]),
                    })
                    .collect();
            }
        }

        Ok(rows)
    }
}
