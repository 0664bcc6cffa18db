//! Local-search improvement engine.
//!
//! - [`TimeWindowSegment`] — associative algebra over contiguous visit
//!   spans
//! - [`CircleSector`] — angular route bounds for route-pair pruning
//! - [`SearchSpace`] — the route/visit arena owned by one invocation
//! - [`NeighborLists`] — granular candidate neighbors per client
//! - Move operators and the [`OperatorRegistry`]
//! - [`LocalSearch`] — the sweep driver

mod driver;
mod moves;
mod neighborhood;
mod route;
mod sector;
mod segment;

pub use driver::{local_search, LocalSearch, SearchOutcome, SearchParams, SearchState};
pub use moves::{
    Exchange, NodeMove, OperatorRegistry, Relocate, RouteMove, SwapStar, TwoOptBetween,
    TwoOptWithin,
};
pub use neighborhood::{NeighborLists, NeighborParams};
pub use route::{NodeId, SearchSpace};
pub use sector::CircleSector;
pub use segment::TimeWindowSegment;
