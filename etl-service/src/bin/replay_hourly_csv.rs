use anyhow::{bail, Result};
use meter_etl::{
    config::AppConfig,
    observability,
    pipeline::Source,
    sources::HourlyCsvFileSource,
    EtlPipeline,
};
use std::env;

/// Rebuild features, daily and monthly outputs from an exported
/// `meter_hourly_raw.csv` without re-reading the input partitions.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: replay_hourly_csv <meter_hourly_raw.csv>");
    }
    let file_path = &args[1];

    let cfg = AppConfig::load()?;
    let reporter = observability::tracing_reporter();

    let hourly = HourlyCsvFileSource::new(file_path, reporter.clone()).load()?;
    if hourly.is_empty() {
        bail!("{file_path} holds no hourly rows");
    }

    let summary = EtlPipeline::from_config(&cfg, reporter)?
        .run_from_hourly(&hourly)
        .await?;
    tracing::info!(
        hourly_rows = summary.feature_rows,
        daily_rows = summary.daily_rows,
        monthly_rows = summary.monthly_rows,
        failures = summary.failures.len(),
        "replay completed"
    );
    Ok(())
}
