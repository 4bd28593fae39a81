use anyhow::Result;
use meter_etl::{config::AppConfig, metrics_export, observability, service};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    // Recorder only when a snapshot destination is configured
    let metrics = match &cfg.metrics {
        Some(m) => Some((metrics_export::install()?, m.textfile_path.clone())),
        None => None,
    };

    let result = service::run_once(&cfg, observability::tracing_reporter()).await;

    if let Some((handle, path)) = &metrics {
        metrics_export::write_textfile(handle, path)?;
    }
    result?;
    Ok(())
}
