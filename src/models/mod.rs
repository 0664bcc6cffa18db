//! Domain model types for the VRPTW search core.
//!
//! Provides the static, read-only problem data: clients with demands,
//! time windows, and release times, plus the instance that owns them
//! together with the distance matrix and fleet description.

mod client;
mod instance;

pub use client::{Client, TimeWindow};
pub use instance::Instance;

pub(crate) use instance::ANGLE_UNITS;
