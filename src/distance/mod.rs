//! Travel distance and time.
//!
//! One dense matrix serves both roles: the cost side reads entries as
//! distances, the time-window algebra as leg durations.

mod matrix;

pub use matrix::DistanceMatrix;
