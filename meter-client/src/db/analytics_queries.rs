/// A fixed analytical statement whose result set is exported under `name`.
#[derive(Debug, Clone, Copy)]
pub struct NamedQuery {
    pub name: &'static str,
    pub sql: &'static str,
}

/// The analytical query set run after every ETL pass, in export order.
pub const ANALYTICS_QUERIES: &[NamedQuery] = &[
    NamedQuery {
        name: "yearly_consumption",
        sql: r#"
        SELECT CAST(strftime('%Y', date_local) AS INTEGER) AS year,
               SUM(total_kwh) AS yearly_kwh
        FROM meter_daily
        GROUP BY year
        ORDER BY year
        "#,
    },
    NamedQuery {
        name: "top_meters_by_year",
        sql: r#"
        SELECT ext_dev_ref,
               CAST(strftime('%Y', date_local) AS INTEGER) AS year,
               SUM(total_kwh) AS yearly_kwh
        FROM meter_daily
        GROUP BY ext_dev_ref, year
        ORDER BY year DESC, yearly_kwh DESC
        LIMIT 100
        "#,
    },
    NamedQuery {
        name: "hourly_profile_avg",
        sql: r#"
        SELECT hour,
               AVG(consumption_kwh) AS avg_kwh,
               COUNT(*) AS samples
        FROM meter_hourly
        GROUP BY hour
        ORDER BY hour
        "#,
    },
    NamedQuery {
        name: "peak_hours_distribution",
        sql: r#"
        SELECT peak_hour,
               COUNT(*) AS occurrences,
               AVG(peak_kwh) AS avg_peak_kwh
        FROM meter_daily
        WHERE peak_hour IS NOT NULL
        GROUP BY peak_hour
        ORDER BY occurrences DESC
        "#,
    },
    NamedQuery {
        name: "holiday_vs_nonholiday",
        sql: r#"
        SELECT is_holiday,
               COUNT(*) AS days,
               AVG(total_kwh) AS avg_daily_kwh
        FROM meter_daily
        GROUP BY is_holiday
        ORDER BY is_holiday DESC
        "#,
    },
    NamedQuery {
        name: "vacation_effect",
        sql: r#"
        SELECT is_summer_vacation,
               COUNT(*) AS days,
               AVG(total_kwh) AS avg_daily_kwh
        FROM meter_daily
        GROUP BY is_summer_vacation
        ORDER BY is_summer_vacation DESC
        "#,
    },
    NamedQuery {
        name: "monthly_trends",
        sql: r#"
        SELECT year,
               month,
               SUM(monthly_total_kwh) AS total_kwh
        FROM meter_monthly
        GROUP BY year, month
        ORDER BY year, month
        "#,
    },
    NamedQuery {
        name: "consumption_categories",
        sql: r#"
        SELECT consumption_category,
               COUNT(*) AS cnt,
               AVG(total_kwh) AS avg_daily_kwh
        FROM meter_daily
        GROUP BY consumption_category
        ORDER BY cnt DESC
        "#,
    },
    // Meters whose average day is within 10% of the first meter's.
    NamedQuery {
        name: "similar_meters",
        sql: r#"
        WITH avg_per_meter AS (
            SELECT ext_dev_ref,
                   AVG(total_kwh) AS avg_daily_kwh
            FROM meter_daily
            GROUP BY ext_dev_ref
        ),
        target AS (
            SELECT avg_daily_kwh FROM avg_per_meter LIMIT 1
        )
        SELECT a.ext_dev_ref,
               a.avg_daily_kwh
        FROM avg_per_meter a, target
        WHERE a.avg_daily_kwh BETWEEN target.avg_daily_kwh * 0.9
                                  AND target.avg_daily_kwh * 1.1
        ORDER BY ABS(a.avg_daily_kwh - target.avg_daily_kwh) ASC
        LIMIT 50
        "#,
    },
    NamedQuery {
        name: "night_day_consumption",
        sql: r#"
        SELECT SUM(night_kwh) AS night_kwh,
               SUM(day_kwh) AS day_kwh
        FROM meter_daily
        "#,
    },
    NamedQuery {
        name: "peak_to_mean_outliers",
        sql: r#"
        SELECT *
        FROM meter_daily
        WHERE peak_to_mean_ratio > 2.5
        ORDER BY peak_to_mean_ratio DESC
        "#,
    },
];

pub fn find(name: &str) -> Option<&'static NamedQuery> {
    ANALYTICS_QUERIES.iter().find(|q| q.name == name)
}
