//! Table-to-table stages of the meter pipeline.
//!
//! Expander -> hourly features -> daily aggregate -> daily enrichment
//! (-> load-shape similarity) -> monthly aggregate. Every stage returns a new
//! table and leaves its input untouched.

pub mod daily;
pub mod enrich;
pub mod expand;
pub mod holidays;
pub mod hourly_features;
pub mod monthly;
pub mod series;
pub mod similarity;

pub use daily::DailyAggregator;
pub use enrich::DailyEnrichment;
pub use expand::HourlyExpander;
pub use hourly_features::HourlyFeatureStage;
pub use monthly::MonthlyAggregator;
pub use similarity::LoadShapeSimilarity;
