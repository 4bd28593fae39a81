pub mod runner;
pub mod table;

pub use runner::{EtlOutcome, EtlPipeline, EtlSummary};
pub use table::{Cell, Column, ColumnKind, TableRow};

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("source error: {0}")]
    Source(String),
    #[error("{stage}: missing required column '{column}'")]
    MissingColumn { stage: &'static str, column: String },
    #[error("sink error: {0}")]
    Sink(String),
    #[error("query error: {0}")]
    Query(String),
    #[error("config error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn missing_column(stage: &'static str, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            stage,
            column: column.into(),
        }
    }
}

/// Loads a complete input table.
pub trait Source<T>: Send + Sync {
    fn load(&self) -> Result<Vec<T>, PipelineError>;
}

/// Derives a new table from an input table; the input is never mutated.
pub trait Stage<I, O>: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, input: &[I]) -> Result<Vec<O>, PipelineError>;
}

/// Writes a complete table under `name`, replacing prior contents.
///
/// An empty `rows` still replaces the table, leaving only its columns.
/// Returns the number of rows written.
#[async_trait::async_trait]
pub trait Sink<T>: Send + Sync
where
    T: TableRow + Sync,
{
    async fn write(&self, name: &str, columns: &[Column], rows: &[T]) -> Result<u64, PipelineError>;
}

/// Run a stage with timing and row-count logging.
pub fn run_stage<I, O, S>(stage: &S, input: &[I]) -> Result<Vec<O>, PipelineError>
where
    S: Stage<I, O> + ?Sized,
{
    let started = std::time::Instant::now();
    let output = stage.apply(input)?;
    tracing::info!(
        stage = stage.name(),
        input_rows = input.len(),
        output_rows = output.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "stage finished"
    );
    Ok(output)
}
