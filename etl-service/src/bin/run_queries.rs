use anyhow::{bail, Result};
use meter_etl::{config::AppConfig, observability, QueryRunner};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;
    let summary = QueryRunner::new(
        &cfg.store.sqlite_path,
        &cfg.output.sql_dir,
        observability::tracing_reporter(),
    )
    .run_all()
    .await;

    if !summary.database_found {
        bail!("database not found: {}", cfg.store.sqlite_path.display());
    }
    for (name, error) in &summary.failed {
        tracing::warn!(query = %name, %error, "query skipped");
    }
    tracing::info!(
        exported = summary.exported.len(),
        failed = summary.failed.len(),
        "analytical queries finished"
    );
    Ok(())
}
