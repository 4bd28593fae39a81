use anyhow::Result;
use sqlx::SqlitePool;

use crate::domain::MonthlyRecord;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DailyTotal {
    pub date_local: String,
    pub total_kwh: f64,
    pub cumulative_total_kwh: f64,
}

/// Monthly rollups of one meter, oldest first.
pub async fn monthly_for_device(pool: &SqlitePool, ext_dev_ref: &str) -> Result<Vec<MonthlyRecord>> {
    let rows = sqlx::query_as::<_, MonthlyRecord>(
        r#"
        SELECT
            client_id,
            ext_dev_ref,
            year,
            month,
            monthly_total_kwh,
            monthly_mean_kwh,
            monthly_max_kwh,
            days_with_data
        FROM meter_monthly
        WHERE ext_dev_ref = $1
        ORDER BY year, month
        "#,
    )
    .bind(ext_dev_ref)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Daily totals of one meter within `[start, end)` local dates (ISO text).
pub async fn daily_totals(
    pool: &SqlitePool,
    ext_dev_ref: &str,
    start: &str,
    end: &str,
) -> Result<Vec<DailyTotal>> {
    let rows = sqlx::query_as::<_, DailyTotal>(
        r#"
        SELECT date_local, total_kwh, cumulative_total_kwh
        FROM meter_daily
        WHERE ext_dev_ref = $1
          AND date_local >= $2
          AND date_local <  $3
        ORDER BY date_local
        "#,
    )
    .bind(ext_dev_ref)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Row count of a pipeline table or view.
pub async fn table_row_count(pool: &SqlitePool, table: &str) -> Result<i64> {
    // Identifiers cannot be bound; only pipeline-owned names reach here.
    let sql = format!("SELECT COUNT(*) FROM \"{}\"", table.replace('"', ""));
    let count: i64 = sqlx::query_scalar(&sql).fetch_one(pool).await?;
    Ok(count)
}
