use std::{fs, path::Path};

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the process-wide Prometheus recorder.
///
/// The ETL is a batch job, so instead of serving `/metrics` the caller keeps
/// the handle and dumps a snapshot with [`write_textfile`] when the run ends.
pub fn install() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus metrics recorder")
}

/// Write the current snapshot in Prometheus text format (textfile collector).
pub fn write_textfile(handle: &PrometheusHandle, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    // Write then rename so a collector never reads a partial file.
    let tmp = path.with_extension("prom.tmp");
    fs::write(&tmp, handle.render())
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("failed to move metrics to {}", path.display()))?;
    tracing::info!(path = %path.display(), "metrics snapshot written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_contains_recorded_counters() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            metrics::counter!("expand_rows_skipped_total").increment(2);
        });

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("textfile/meter_etl.prom");
        write_textfile(&handle, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("expand_rows_skipped_total 2"));
        assert!(!dir.path().join("textfile/meter_etl.prom.tmp").exists());
    }
}
