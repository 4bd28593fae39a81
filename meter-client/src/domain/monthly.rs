/// Per device-month rollup of daily totals.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct MonthlyRecord {
    pub client_id: String,
    pub ext_dev_ref: String,
    pub year: i32,
    pub month: u32,
    pub monthly_total_kwh: f64,
    pub monthly_mean_kwh: f64,
    pub monthly_max_kwh: f64,
    pub days_with_data: i64,
}
