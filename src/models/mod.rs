pub mod cache;
pub mod chart;
pub mod series;

pub use cache::{CacheEntry, CacheStore, Clock, ManualClock, SystemClock};
pub use chart::{ChartDays, ChartRequest, ChartStyle, Rgb, Theme};
pub use series::{parse_series, TimeSeriesPoint};
