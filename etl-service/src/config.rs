use serde::Deserialize;
use std::{fs, path::PathBuf};

use chrono_tz::Tz;

use crate::transform::holidays::{self, HolidayCalendar};

const CONFIG_ENV: &str = "METER_ETL_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "meter-etl.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Partition selector, e.g. `data/*.parquet`.
    pub glob: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            glob: "data/*.parquet".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub sql_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("outputs"),
            sql_dir: PathBuf::from("outputs/sql"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub sqlite_path: PathBuf,
    pub batch_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("data/etl_db.sqlite"),
            batch_size: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// IANA zone name applied to every row.
    pub timezone: String,
    pub holiday_country: String,
    pub hourly_lags: Vec<u32>,
    pub rolling_window_hours: u32,
    pub daily_rolling_windows: Vec<u32>,
    pub load_similarity: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            timezone: "Europe/Vilnius".to_string(),
            holiday_country: "LT".to_string(),
            hourly_lags: vec![1, 24],
            rolling_window_hours: 24,
            daily_rolling_windows: vec![7, 30],
            load_similarity: false,
        }
    }
}

impl FeatureConfig {
    pub fn tz(&self) -> anyhow::Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("invalid features.timezone '{}': {e}", self.timezone))
    }

    pub fn holiday_calendar(&self) -> anyhow::Result<Box<dyn HolidayCalendar>> {
        holidays::for_country(&self.holiday_country).ok_or_else(|| {
            anyhow::anyhow!(
                "unsupported features.holiday_country '{}'",
                self.holiday_country
            )
        })
    }

    fn validate(&self) -> anyhow::Result<()> {
        self.tz()?;
        self.holiday_calendar()?;
        if self.rolling_window_hours == 0 {
            anyhow::bail!("features.rolling_window_hours must be positive");
        }
        if self.hourly_lags.contains(&0) || self.daily_rolling_windows.contains(&0) {
            anyhow::bail!("lags and rolling windows must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Prometheus text-format snapshot written at the end of a run.
    pub textfile_path: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub store: StoreConfig,
    pub features: FeatureConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let cfg = match env::var(CONFIG_ENV) {
            Ok(path) => Self::from_path(&path)?,
            Err(_) if fs::metadata(DEFAULT_CONFIG_PATH).is_ok() => {
                Self::from_path(DEFAULT_CONFIG_PATH)?
            }
            Err(_) => {
                tracing::info!("no {DEFAULT_CONFIG_PATH} found, using built-in defaults");
                Self::default()
            }
        };
        cfg.features.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: &str) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config {path}: {e}"))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        cfg.features.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = AppConfig::from_toml("").unwrap();
        assert_eq!(cfg.input.glob, "data/*.parquet");
        assert_eq!(cfg.features.hourly_lags, vec![1, 24]);
        assert_eq!(cfg.features.daily_rolling_windows, vec![7, 30]);
        assert_eq!(cfg.store.batch_size, 500);
        assert!(cfg.metrics.is_none());
        assert_eq!(cfg.features.tz().unwrap(), chrono_tz::Europe::Vilnius);
    }

    #[test]
    fn sections_override_defaults() {
        let cfg = AppConfig::from_toml(
            r#"
            [input]
            glob = "/data/meters/*.ndjson"

            [features]
            timezone = "UTC"
            holiday_country = "none"
            hourly_lags = [1, 2, 168]
            load_similarity = true

            [metrics]
            textfile_path = "/tmp/etl.prom"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.input.glob, "/data/meters/*.ndjson");
        assert_eq!(cfg.features.hourly_lags, vec![1, 2, 168]);
        assert_eq!(cfg.features.rolling_window_hours, 24);
        assert!(cfg.features.load_similarity);
        assert_eq!(cfg.metrics.unwrap().textfile_path, PathBuf::from("/tmp/etl.prom"));
    }

    #[test]
    fn invalid_timezone_is_rejected() {
        let err = AppConfig::from_toml("[features]\ntimezone = \"Mars/Olympus\"\n").unwrap_err();
        assert!(err.to_string().contains("Mars/Olympus"));
    }

    #[test]
    fn unknown_holiday_country_is_rejected() {
        assert!(AppConfig::from_toml("[features]\nholiday_country = \"XX\"\n").is_err());
    }
}
