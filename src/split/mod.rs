//! Giant-tour split decoding.
//!
//! - [`split`] — linear shortest-path decomposition of a giant tour into
//!   a fleet-bounded, capacity-penalized route partition

mod decoder;

pub use decoder::{split, SplitResult};
