//! Flat-table shapes of the pipeline records, shared by the CSV and SQLite
//! writers.

use meter_client::domain::{
    DailyRecord, HourlyFeatureRecord, HourlyRecord, MonthlyRecord,
};

use crate::{
    config::FeatureConfig,
    pipeline::{Cell, Column, TableRow},
};

/// Column lists of every table the pipeline writes.
///
/// Lag, rolling-window and similarity columns depend on the feature
/// configuration, so the layout is fixed once per run and holds even when a
/// table ends up with no rows.
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    pub hourly: Vec<Column>,
    pub hourly_features: Vec<Column>,
    pub daily: Vec<Column>,
    pub monthly: Vec<Column>,
}

impl TableLayout {
    pub fn new(features: &FeatureConfig) -> Self {
        Self {
            hourly: hourly_columns(),
            hourly_features: hourly_feature_columns(
                &features.hourly_lags,
                features.rolling_window_hours,
            ),
            daily: daily_columns(&features.daily_rolling_windows, features.load_similarity),
            monthly: monthly_columns(),
        }
    }
}

pub fn hourly_columns() -> Vec<Column> {
    vec![
        Column::text("client_id"),
        Column::text("ext_dev_ref"),
        Column::text("resolution"),
        Column::text("date_local"),
        Column::integer("hour"),
        Column::text("timestamp_local"),
        Column::text("timestamp_utc"),
        Column::real("consumption_kwh"),
    ]
}

pub fn hourly_feature_columns(lags: &[u32], window_hours: u32) -> Vec<Column> {
    let mut cols = hourly_columns();
    cols.extend([
        Column::text("timestamp"),
        Column::integer("day_of_week"),
        Column::integer("is_weekend"),
        Column::integer("month"),
        Column::integer("year"),
    ]);
    cols.extend(lags.iter().map(|l| Column::real(format!("lag_{l}h"))));
    cols.push(Column::real(format!("rolling_mean_{window_hours}h")));
    cols.push(Column::real(format!("rolling_std_{window_hours}h")));
    cols
}

pub fn daily_columns(rolling_windows: &[u32], with_similarity: bool) -> Vec<Column> {
    let mut cols = vec![
        Column::text("client_id"),
        Column::text("ext_dev_ref"),
        Column::text("date_local"),
        Column::real("total_kwh"),
        Column::real("mean_kwh"),
        Column::real("max_kwh"),
        Column::real("std_kwh"),
        Column::integer("hourly_count"),
        Column::integer("peak_hour"),
        Column::real("peak_kwh"),
        Column::real("peak_to_mean_ratio"),
        Column::real("night_kwh"),
        Column::real("day_kwh"),
        Column::real("cumulative_total_kwh"),
        Column::real("weekend_vs_weekday"),
        Column::integer("month"),
        Column::text("season"),
        Column::integer("is_holiday"),
        Column::integer("is_summer_vacation"),
    ];
    cols.extend(
        rolling_windows
            .iter()
            .map(|w| Column::real(format!("rolling_{w}d_total_kwh"))),
    );
    cols.push(Column::text("consumption_category"));
    if with_similarity {
        cols.push(Column::real("daily_load_similarity"));
    }
    cols
}

pub fn monthly_columns() -> Vec<Column> {
    vec![
        Column::text("client_id"),
        Column::text("ext_dev_ref"),
        Column::integer("year"),
        Column::integer("month"),
        Column::real("monthly_total_kwh"),
        Column::real("monthly_mean_kwh"),
        Column::real("monthly_max_kwh"),
        Column::integer("days_with_data"),
    ]
}

impl TableRow for HourlyRecord {
    fn cells(&self) -> Vec<Cell> {
        vec![
            self.client_id.as_str().into(),
            self.ext_dev_ref.as_str().into(),
            Cell::opt_text(self.resolution.as_deref()),
            self.date_local.to_string().into(),
            self.hour.into(),
            self.timestamp_local.to_string().into(),
            self.timestamp_utc.as_str().into(),
            Cell::real(self.consumption_kwh),
        ]
    }
}

impl TableRow for HourlyFeatureRecord {
    fn cells(&self) -> Vec<Cell> {
        let mut cells = vec![
            self.client_id.as_str().into(),
            self.ext_dev_ref.as_str().into(),
            Cell::opt_text(self.resolution.as_deref()),
            self.date_local.to_string().into(),
            self.hour.into(),
            self.timestamp_local.as_str().into(),
            self.timestamp_utc.as_str().into(),
            Cell::real(self.consumption_kwh),
            self.timestamp.to_rfc3339().into(),
            self.day_of_week.into(),
            Cell::flag(self.is_weekend),
            self.month.into(),
            self.year.into(),
        ];
        cells.extend(self.lags.iter().map(|l| Cell::opt_real(l.value)));
        cells.push(Cell::opt_real(self.rolling.mean));
        cells.push(Cell::real(self.rolling.std));
        cells
    }
}

impl TableRow for DailyRecord {
    fn cells(&self) -> Vec<Cell> {
        let a = &self.aggregate;
        let mut cells = vec![
            a.client_id.as_str().into(),
            a.ext_dev_ref.as_str().into(),
            a.date_local.to_string().into(),
            Cell::real(a.total_kwh),
            Cell::real(a.mean_kwh),
            Cell::real(a.max_kwh),
            Cell::opt_real(a.std_kwh),
            Cell::Integer(a.hourly_count as i64),
            a.peak_hour.into(),
            Cell::real(a.peak_kwh),
            Cell::real(a.peak_to_mean_ratio),
            Cell::real(a.night_kwh),
            Cell::real(a.day_kwh),
            Cell::real(a.cumulative_total_kwh),
            Cell::real(a.weekend_vs_weekday),
            self.month.into(),
            self.season.as_str().into(),
            Cell::flag(self.is_holiday),
            Cell::flag(self.is_summer_vacation),
        ];
        cells.extend(self.rolling_totals.iter().map(|r| Cell::real(r.mean_total_kwh)));
        cells.push(Cell::opt_text(
            self.consumption_category.as_ref().map(|c| c.as_str()),
        ));
        if let Some(sim) = self.daily_load_similarity {
            cells.push(Cell::opt_real(sim.value));
        }
        cells
    }
}

impl TableRow for MonthlyRecord {
    fn cells(&self) -> Vec<Cell> {
        vec![
            self.client_id.as_str().into(),
            self.ext_dev_ref.as_str().into(),
            self.year.into(),
            self.month.into(),
            Cell::real(self.monthly_total_kwh),
            Cell::real(self.monthly_mean_kwh),
            Cell::real(self.monthly_max_kwh),
            self.days_with_data.into(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meter_client::domain::{
        ConsumptionCategory, DailyAggregate, LoadSimilarity, RollingTotal, Season,
    };

    fn daily(similarity: Option<LoadSimilarity>) -> DailyRecord {
        DailyRecord {
            aggregate: DailyAggregate {
                client_id: "c-1".to_string(),
                ext_dev_ref: "dev-1".to_string(),
                date_local: "2024-06-15".parse().unwrap(),
                total_kwh: 276.0,
                mean_kwh: 11.5,
                max_kwh: 23.0,
                std_kwh: None,
                hourly_count: 24,
                peak_hour: 23,
                peak_kwh: 23.0,
                peak_to_mean_ratio: 2.0,
                night_kwh: 21.0,
                day_kwh: 123.0,
                cumulative_total_kwh: 276.0,
                weekend_vs_weekday: 1.0,
            },
            month: 6,
            season: Season::Summer,
            is_holiday: false,
            is_summer_vacation: false,
            rolling_totals: vec![
                RollingTotal { window_days: 7, mean_total_kwh: 276.0 },
                RollingTotal { window_days: 30, mean_total_kwh: 276.0 },
            ],
            consumption_category: Some(ConsumptionCategory::High),
            daily_load_similarity: similarity,
        }
    }

    #[test]
    fn daily_columns_line_up_with_cells() {
        let plain = daily_columns(&[7, 30], false);
        let with_similarity = daily_columns(&[7, 30], true);
        assert_eq!(plain.len(), daily(None).cells().len());
        assert_eq!(
            with_similarity.len(),
            daily(Some(LoadSimilarity { value: None })).cells().len()
        );

        let names: Vec<String> = plain.into_iter().map(|c| c.name).collect();
        assert!(names.contains(&"rolling_7d_total_kwh".to_string()));
        assert!(names.contains(&"rolling_30d_total_kwh".to_string()));
        assert!(!names.contains(&"daily_load_similarity".to_string()));

        let cells = daily(None).cells();
        let std_idx = names.iter().position(|n| n == "std_kwh").unwrap();
        assert_eq!(cells[std_idx], Cell::Null);
        let cat_idx = names.iter().position(|n| n == "consumption_category").unwrap();
        assert_eq!(cells[cat_idx], Cell::from("high"));
    }

    #[test]
    fn similarity_column_comes_last() {
        let cols = daily_columns(&[7], true);
        assert_eq!(cols.last().unwrap().name, "daily_load_similarity");
        let row = daily(Some(LoadSimilarity { value: Some(0.5) }));
        assert_eq!(row.cells().last(), Some(&Cell::Real(0.5)));
    }

    #[test]
    fn feature_columns_follow_configured_lags_and_window() {
        let names: Vec<String> = hourly_feature_columns(&[1, 24], 12)
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names.len(), 8 + 5 + 2 + 2);
        assert_eq!(
            &names[13..],
            ["lag_1h", "lag_24h", "rolling_mean_12h", "rolling_std_12h"]
        );
    }

    #[test]
    fn monthly_row_shape() {
        let m = MonthlyRecord {
            client_id: "c-1".to_string(),
            ext_dev_ref: "dev-1".to_string(),
            year: 2024,
            month: 6,
            monthly_total_kwh: 30.5,
            monthly_mean_kwh: 15.25,
            monthly_max_kwh: 20.5,
            days_with_data: 2,
        };
        assert_eq!(monthly_columns().len(), m.cells().len());
        assert_eq!(m.cells()[3], Cell::Integer(6));
    }
}
