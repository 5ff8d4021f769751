//! Shared test support
//!
//! In-memory backends for exercising the query planners without external
//! services.

pub mod store;

pub use store::InMemoryStatsStore;

/// Route test logs through tracing when `RUST_LOG` asks for them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
