//! Domain data types shared by the query planners, the result shaper and
//! the nightly aggregation.

pub mod indicator;
pub mod query;
pub mod record;
pub mod row;

pub use indicator::{GroupBy, Indicator};
pub use query::{DateRange, StatsQuery};
pub use record::{DayOutcome, DayWindow, StatRecord};
pub use row::{DisplayKey, DisplayRow, ExportRow};
