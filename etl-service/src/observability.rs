use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("meter_etl=info".parse().unwrap_or_else(|_| "info".parse().unwrap()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEvent {
    pub severity: Severity,
    pub stage: &'static str,
    pub message: String,
}

/// Reporting capability handed to each component at construction.
pub trait Reporter: Send + Sync {
    fn report(&self, severity: Severity, stage: &'static str, message: &str);

    fn info(&self, stage: &'static str, message: &str) {
        self.report(Severity::Info, stage, message);
    }

    fn warn(&self, stage: &'static str, message: &str) {
        self.report(Severity::Warn, stage, message);
    }

    fn error(&self, stage: &'static str, message: &str) {
        self.report(Severity::Error, stage, message);
    }
}

pub type SharedReporter = Arc<dyn Reporter>;

/// Forwards events to the installed `tracing` subscriber.
#[derive(Debug, Clone, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, severity: Severity, stage: &'static str, message: &str) {
        match severity {
            Severity::Info => tracing::info!(stage, "{message}"),
            Severity::Warn => tracing::warn!(stage, "{message}"),
            Severity::Error => tracing::error!(stage, "{message}"),
        }
    }
}

pub fn tracing_reporter() -> SharedReporter {
    Arc::new(TracingReporter)
}

/// Keeps events in memory, optionally forwarding them to another reporter.
#[derive(Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<ReportEvent>>,
    forward: Option<SharedReporter>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forwarding(to: SharedReporter) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            forward: Some(to),
        }
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.events()
            .iter()
            .filter(|e| e.severity == severity)
            .count()
    }

    pub fn warnings_for(&self, stage: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.severity == Severity::Warn && e.stage == stage)
            .map(|e| e.message)
            .collect()
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, severity: Severity, stage: &'static str, message: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push(ReportEvent {
                severity,
                stage,
                message: message.to_string(),
            });
        }
        if let Some(next) = &self.forward {
            next.report(severity, stage, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_reporter_records_and_forwards() {
        let sink = Arc::new(MemoryReporter::new());
        let front = MemoryReporter::forwarding(sink.clone());

        front.warn("expand", "skipping row");
        front.info("expand", "expanded 24 rows");

        assert_eq!(front.count(Severity::Warn), 1);
        assert_eq!(front.warnings_for("expand"), vec!["skipping row".to_string()]);
        assert_eq!(sink.events().len(), 2);
    }
}
