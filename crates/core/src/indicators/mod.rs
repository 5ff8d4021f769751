//! Nightly indicator computation
//!
//! Indicators are named strategies keyed by indicator name; the scheduler
//! dispatches the whole registry once per day window and never needs to know
//! individual indicators.

pub mod accounts;
pub mod ports;
pub mod registry;

pub use accounts::ActivatedAccountsIndicator;
pub use ports::DayIndicator;
pub use registry::IndicatorRegistry;
