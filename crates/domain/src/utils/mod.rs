//! Domain-level utilities

pub mod dates;
