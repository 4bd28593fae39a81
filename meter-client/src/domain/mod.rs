pub mod daily;
pub mod hourly;
pub mod meter_day;
pub mod monthly;
pub mod timestamp;

pub use daily::{
    ConsumptionCategory, DailyAggregate, DailyRecord, LoadSimilarity, RollingTotal, Season,
};
pub use hourly::{HourlyFeatureRecord, HourlyRecord, LagValue, RollingStats};
pub use meter_day::{DateInput, MeterDayRecord, HOURS_PER_DAY};
pub use monthly::MonthlyRecord;
pub use timestamp::TimestampInput;
