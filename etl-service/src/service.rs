//! One invocation of the service: the ETL stages, then the analytical
//! queries.

use crate::{
    config::AppConfig,
    observability::SharedReporter,
    pipeline::{EtlOutcome, EtlPipeline, PipelineError},
    queries::{QueryRunner, QuerySummary},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReport {
    pub etl: EtlOutcome,
    pub queries: QuerySummary,
}

/// Run the pipeline and then every analytical query.
///
/// Missing input is not an error: the stages are skipped and the queries
/// run against whatever the store already holds. Only stage errors (such as
/// a partition without a required column) abort.
pub async fn run_once(cfg: &AppConfig, reporter: SharedReporter) -> Result<ServiceReport, PipelineError> {
    let etl = EtlPipeline::from_config(cfg, reporter.clone())?.run().await?;
    match &etl {
        EtlOutcome::NoInput => {
            tracing::warn!(glob = %cfg.input.glob, "no input records, etl stages skipped");
        }
        EtlOutcome::Completed(summary) => {
            tracing::info!(
                input_rows = summary.input_rows,
                hourly_rows = summary.hourly_rows,
                daily_rows = summary.daily_rows,
                monthly_rows = summary.monthly_rows,
                failures = summary.failures.len(),
                "etl completed"
            );
        }
    }

    let queries = QueryRunner::new(&cfg.store.sqlite_path, &cfg.output.sql_dir, reporter)
        .run_all()
        .await;
    tracing::info!(
        exported = queries.exported.len(),
        failed = queries.failed.len(),
        "analytical queries finished"
    );
    Ok(ServiceReport { etl, queries })
}
