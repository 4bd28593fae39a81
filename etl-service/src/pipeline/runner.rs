use std::path::PathBuf;

use chrono_tz::Tz;
use meter_client::domain::{HourlyRecord, MeterDayRecord};

use super::{run_stage, Column, PipelineError, Sink, Source, TableRow};
use crate::{
    config::AppConfig,
    observability::SharedReporter,
    sinks::{CsvExporter, SqliteSink, TableLayout},
    sources::MeterDayFileSource,
    transform::{
        DailyAggregator, DailyEnrichment, HourlyExpander, HourlyFeatureStage, LoadShapeSimilarity,
        MonthlyAggregator,
    },
};

const STAGE: &str = "pipeline";

pub const HOURLY_RAW_CSV: &str = "meter_hourly_raw";
pub const HOURLY_FEATURES_CSV: &str = "meter_hourly_features";
pub const DAILY_CSV: &str = "meter_daily_agg";
pub const MONTHLY_CSV: &str = "meter_monthly_agg";

pub const HOURLY_TABLE: &str = "meter_hourly";
pub const DAILY_TABLE: &str = "meter_daily";
pub const MONTHLY_TABLE: &str = "meter_monthly";
pub const DAILY_ROLLING_VIEW: &str = "meter_daily_rolling_7d";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EtlSummary {
    pub input_rows: usize,
    pub hourly_rows: usize,
    pub feature_rows: usize,
    pub daily_rows: usize,
    pub monthly_rows: usize,
    /// False when the database could not be opened; CSV exports still ran.
    pub store_available: bool,
    /// Export or persistence steps that failed and were skipped.
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EtlOutcome {
    /// The input selector matched nothing (or only empty partitions).
    NoInput,
    Completed(EtlSummary),
}

/// Runs every stage in order, materializing each table before the next.
///
/// Stage errors (missing columns) abort the run. Export and persistence
/// failures are reported, recorded in the summary and skipped.
pub struct EtlPipeline {
    source: Box<dyn Source<MeterDayRecord>>,
    expander: HourlyExpander,
    features: HourlyFeatureStage,
    daily: DailyAggregator,
    enrichment: DailyEnrichment,
    similarity: Option<LoadShapeSimilarity>,
    monthly: MonthlyAggregator,
    layout: TableLayout,
    csv: CsvExporter,
    sqlite_path: PathBuf,
    batch_size: usize,
    reporter: SharedReporter,
}

impl EtlPipeline {
    pub fn from_config(cfg: &AppConfig, reporter: SharedReporter) -> Result<Self, PipelineError> {
        let source = MeterDayFileSource::new(cfg.input.glob.clone(), zone(cfg)?, reporter.clone());
        Self::with_source(cfg, Box::new(source), reporter)
    }

    pub fn with_source(
        cfg: &AppConfig,
        source: Box<dyn Source<MeterDayRecord>>,
        reporter: SharedReporter,
    ) -> Result<Self, PipelineError> {
        let features = &cfg.features;
        let tz = zone(cfg)?;
        let calendar = features
            .holiday_calendar()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        Ok(Self {
            source,
            expander: HourlyExpander::new(tz, reporter.clone()),
            features: HourlyFeatureStage::new(
                tz,
                features.hourly_lags.clone(),
                features.rolling_window_hours,
                reporter.clone(),
            ),
            daily: DailyAggregator::new(),
            enrichment: DailyEnrichment::new(calendar, features.daily_rolling_windows.clone()),
            similarity: features.load_similarity.then(LoadShapeSimilarity::new),
            monthly: MonthlyAggregator::new(),
            layout: TableLayout::new(features),
            csv: CsvExporter::new(cfg.output.dir.clone()),
            sqlite_path: cfg.store.sqlite_path.clone(),
            batch_size: cfg.store.batch_size,
            reporter,
        })
    }

    pub async fn run(&self) -> Result<EtlOutcome, PipelineError> {
        let raw = self.source.load()?;
        if raw.is_empty() {
            self.reporter
                .error(STAGE, "no input records found, nothing to process");
            return Ok(EtlOutcome::NoInput);
        }

        let hourly = run_stage(&self.expander, &raw)?;
        let mut failures = Vec::new();
        self.export(HOURLY_RAW_CSV, &self.layout.hourly, &hourly, &mut failures)
            .await;

        let mut summary = self.run_from_hourly(&hourly).await?;
        summary.input_rows = raw.len();
        failures.append(&mut summary.failures);
        summary.failures = failures;
        Ok(EtlOutcome::Completed(summary))
    }

    /// Everything downstream of the expander: features, daily and monthly
    /// tables, their CSV exports and the database tables.
    pub async fn run_from_hourly(&self, hourly: &[HourlyRecord]) -> Result<EtlSummary, PipelineError> {
        let mut summary = EtlSummary {
            hourly_rows: hourly.len(),
            ..EtlSummary::default()
        };
        let store = self.open_store().await;
        summary.store_available = store.is_some();

        let features = run_stage(&self.features, hourly)?;
        summary.feature_rows = features.len();
        let columns = &self.layout.hourly_features;
        self.export(HOURLY_FEATURES_CSV, columns, &features, &mut summary.failures)
            .await;
        self.persist(store.as_ref(), HOURLY_TABLE, columns, &features, &mut summary.failures)
            .await;

        let aggregates = run_stage(&self.daily, &features)?;
        let mut daily = run_stage(&self.enrichment, &aggregates)?;
        if let Some(similarity) = &self.similarity {
            daily = similarity.apply(&features, &daily);
        }
        summary.daily_rows = daily.len();
        let columns = &self.layout.daily;
        self.export(DAILY_CSV, columns, &daily, &mut summary.failures)
            .await;
        let daily_written = self
            .persist(store.as_ref(), DAILY_TABLE, columns, &daily, &mut summary.failures)
            .await;
        if let (Some(store), true) = (store.as_ref(), daily_written) {
            if let Err(e) = store.create_view(DAILY_ROLLING_VIEW, DAILY_TABLE).await {
                self.reporter.error(STAGE, &e.to_string());
                summary.failures.push(DAILY_ROLLING_VIEW.to_string());
            }
        }

        let monthly = run_stage(&self.monthly, &daily)?;
        summary.monthly_rows = monthly.len();
        let columns = &self.layout.monthly;
        self.export(MONTHLY_CSV, columns, &monthly, &mut summary.failures)
            .await;
        self.persist(store.as_ref(), MONTHLY_TABLE, columns, &monthly, &mut summary.failures)
            .await;

        if let Some(store) = store {
            store.close().await;
        }
        self.reporter.info(
            STAGE,
            &format!(
                "run finished: hourly={} daily={} monthly={} failures={}",
                summary.feature_rows,
                summary.daily_rows,
                summary.monthly_rows,
                summary.failures.len()
            ),
        );
        Ok(summary)
    }

    async fn open_store(&self) -> Option<SqliteSink> {
        match SqliteSink::connect(&self.sqlite_path, self.batch_size).await {
            Ok(store) => Some(store),
            Err(e) => {
                self.reporter
                    .error(STAGE, &format!("database unavailable, skipping persistence: {e}"));
                None
            }
        }
    }

    async fn export<T: TableRow + Sync>(
        &self,
        name: &str,
        columns: &[Column],
        rows: &[T],
        failures: &mut Vec<String>,
    ) {
        if !self.deliver(&self.csv, name, columns, rows).await {
            failures.push(format!("{name}.csv"));
        }
    }

    /// True when the table now holds exactly `rows`.
    async fn persist<T: TableRow + Sync>(
        &self,
        store: Option<&SqliteSink>,
        table: &str,
        columns: &[Column],
        rows: &[T],
        failures: &mut Vec<String>,
    ) -> bool {
        let Some(store) = store else {
            return false;
        };
        let written = self.deliver(store, table, columns, rows).await;
        if !written {
            failures.push(table.to_string());
        }
        written
    }

    async fn deliver<T: TableRow + Sync>(
        &self,
        sink: &dyn Sink<T>,
        name: &str,
        columns: &[Column],
        rows: &[T],
    ) -> bool {
        match sink.write(name, columns, rows).await {
            Ok(_) => true,
            Err(e) => {
                self.reporter
                    .error(STAGE, &format!("writing {name} failed: {e}"));
                false
            }
        }
    }
}

fn zone(cfg: &AppConfig) -> Result<Tz, PipelineError> {
    cfg.features
        .tz()
        .map_err(|e| PipelineError::Config(e.to_string()))
}
