pub mod hourly_csv_file;
pub mod meter_day_file;
pub mod meter_day_parquet;

pub use hourly_csv_file::HourlyCsvFileSource;
pub use meter_day_file::{MeterDayFileSource, PartitionFormat};
