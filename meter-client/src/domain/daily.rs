use chrono::{Datelike, NaiveDate};

/// Per device-day rollup of hourly readings.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyAggregate {
    pub client_id: String,
    pub ext_dev_ref: String,
    pub date_local: NaiveDate,
    pub total_kwh: f64,
    pub mean_kwh: f64,
    pub max_kwh: f64,
    /// Sample deviation; `None` for a single-hour day.
    pub std_kwh: Option<f64>,
    pub hourly_count: usize,
    pub peak_hour: u32,
    pub peak_kwh: f64,
    pub peak_to_mean_ratio: f64,
    /// Hours 0-6.
    pub night_kwh: f64,
    /// Hours 18-23.
    pub day_kwh: f64,
    pub cumulative_total_kwh: f64,
    /// Day total over the device's mean day total.
    pub weekend_vs_weekday: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Self::Spring,
            6..=8 => Self::Summer,
            9..=11 => Self::Fall,
            _ => Self::Winter,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Winter => "winter",
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Fall => "fall",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConsumptionCategory {
    VeryLow,
    Low,
    Medium,
    High,
}

impl ConsumptionCategory {
    /// Right-inclusive bands `(-1, 5]`, `(5, 15]`, `(15, 50]`, `(50, inf)`.
    pub fn from_total(total_kwh: f64) -> Option<Self> {
        if total_kwh.is_nan() || total_kwh <= -1.0 {
            None
        } else if total_kwh <= 5.0 {
            Some(Self::VeryLow)
        } else if total_kwh <= 15.0 {
            Some(Self::Low)
        } else if total_kwh <= 50.0 {
            Some(Self::Medium)
        } else {
            Some(Self::High)
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryLow => "very_low",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Trailing mean of daily totals over `window_days` rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingTotal {
    pub window_days: u32,
    pub mean_total_kwh: f64,
}

/// Set once the load-shape stage ran for the table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadSimilarity {
    /// Cosine similarity with the previous day; `None` on a device's first day.
    pub value: Option<f64>,
}

/// Fully enriched device-day row, as persisted to `meter_daily`.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub aggregate: DailyAggregate,
    pub month: u32,
    pub season: Season,
    pub is_holiday: bool,
    pub is_summer_vacation: bool,
    pub rolling_totals: Vec<RollingTotal>,
    pub consumption_category: Option<ConsumptionCategory>,
    pub daily_load_similarity: Option<LoadSimilarity>,
}

impl DailyRecord {
    pub fn year(&self) -> i32 {
        self.aggregate.date_local.year()
    }

    pub fn rolling_total(&self, window_days: u32) -> Option<f64> {
        self.rolling_totals
            .iter()
            .find(|r| r.window_days == window_days)
            .map(|r| r.mean_total_kwh)
    }
}
