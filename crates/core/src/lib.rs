//! # Edumetrics Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces (traits) for the external collaborators: document
//!   store, search index, graph source
//! - The two query-planner adapters behind one `StatisticsService` contract
//! - The result shaper turning raw backend output into canonical rows
//! - The indicator registry and the nightly activated-accounts indicator
//!
//! ## Architecture Principles
//! - Only depends on `edumetrics-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Pure, testable query planning and shaping

pub mod indicators;
pub mod stats;

// Re-export specific items to avoid ambiguity
pub use indicators::accounts::ActivatedAccountsIndicator;
pub use indicators::ports::DayIndicator;
pub use indicators::registry::IndicatorRegistry;
pub use stats::document::DocumentStatisticsService;
pub use stats::ports::{DocumentStore, GraphSource, SearchIndex, StatisticsService};
pub use stats::search::SearchStatisticsService;
