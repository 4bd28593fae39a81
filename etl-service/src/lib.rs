pub mod config;
pub mod metrics_export;
pub mod observability;
pub mod pipeline;
pub mod queries;
pub mod service;
pub mod sinks;
pub mod sources;
pub mod transform;

pub use pipeline::{EtlOutcome, EtlPipeline, EtlSummary};
pub use queries::{QueryRunner, QuerySummary};
pub use service::{run_once, ServiceReport};
