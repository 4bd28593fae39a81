pub mod analytics_queries;
pub mod meter_queries;

pub use analytics_queries::{NamedQuery, ANALYTICS_QUERIES};
