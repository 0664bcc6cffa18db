//! Local move operators.
//!
//! Each operator exposes a side-effect-free `test` (does applying the
//! move strictly decrease penalized cost?) and a mutating `apply` (link
//! surgery only), valid immediately after a successful `test` on
//! unchanged routes. After `apply`, the caller must update every touched
//! route before evaluating further moves.
//!
//! Operators share a delta-cost pattern: compute the distance-only delta
//! of the rewiring first and bail out when both affected routes are
//! feasible and the distance alone does not improve; only then pay for
//! time-window segment merges and penalty deltas.
//!
//! - [`Relocate`] — move a chain of 1–3 visits after another visit,
//!   optionally reversed
//! - [`Exchange`] — swap two disjoint chains
//! - [`TwoOptWithin`] — intra-route segment reversal
//! - [`TwoOptBetween`] — inter-route tail exchange (2-opt*)
//! - [`SwapStar`] — route-pair exchange with free reinsertion points

mod exchange;
mod relocate;
mod swap_star;
mod two_opt;

pub use exchange::Exchange;
pub use relocate::Relocate;
pub use swap_star::SwapStar;
pub use two_opt::{TwoOptBetween, TwoOptWithin};

use super::route::{NodeId, SearchSpace};

/// Accept threshold: a move must improve by more than this.
pub(crate) const MIN_DELTA: f64 = -1e-10;

/// A move anchored on two visits.
///
/// `u` is always a client visit; `v` may be a client visit or the start
/// sentinel of an empty route (insertion that opens a route).
pub trait NodeMove {
    /// Operator name for diagnostics.
    fn name(&self) -> &'static str;

    /// Whether applying the move strictly decreases penalized cost.
    /// Performs no mutation. Degenerate candidates (overlapping chains,
    /// depot inside a chain, no-op rewirings) return `false`.
    fn test(&self, space: &SearchSpace, u: NodeId, v: NodeId) -> bool;

    /// Performs the structural mutation. Only valid immediately after a
    /// `test` returning `true` on identical arguments and unchanged
    /// routes.
    fn apply(&self, space: &mut SearchSpace, u: NodeId, v: NodeId);
}

/// A move anchored on a route pair.
///
/// `test` may plan the concrete move internally; `apply` executes the
/// plan and must follow a successful `test` immediately.
pub trait RouteMove {
    /// Operator name for diagnostics.
    fn name(&self) -> &'static str;

    /// Whether some strictly improving move exists between the routes.
    /// Performs no mutation of the routes.
    fn test(&mut self, space: &SearchSpace, r1: usize, r2: usize) -> bool;

    /// Executes the move planned by the last successful `test`.
    fn apply(&mut self, space: &mut SearchSpace, r1: usize, r2: usize);
}

/// Ordered operator collection. Registration order is the tie-break:
/// the first operator whose `test` accepts wins the anchor pair.
///
/// # Examples
///
/// ```
/// use vrptw_search::search::{OperatorRegistry, Relocate, TwoOptWithin};
///
/// let mut registry = OperatorRegistry::new();
/// registry.register_node(Box::new(Relocate::new(1)));
/// registry.register_node(Box::new(TwoOptWithin));
/// assert!(!registry.is_empty());
/// ```
#[derive(Default)]
pub struct OperatorRegistry {
    node_ops: Vec<Box<dyn NodeMove>>,
    route_ops: Vec<Box<dyn RouteMove>>,
}

impl OperatorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The full catalogue in its canonical order: relocations (longest
    /// chains last), chain exchanges, both 2-opt variants, then SWAP*.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register_node(Box::new(Relocate::new(1)));
        registry.register_node(Box::new(Relocate::new(2)));
        registry.register_node(Box::new(Relocate::reversed(2)));
        registry.register_node(Box::new(Relocate::new(3)));
        registry.register_node(Box::new(Relocate::reversed(3)));
        registry.register_node(Box::new(Exchange::new(1, 1)));
        registry.register_node(Box::new(Exchange::new(2, 1)));
        registry.register_node(Box::new(Exchange::new(2, 2)));
        registry.register_node(Box::new(TwoOptWithin));
        registry.register_node(Box::new(TwoOptBetween));
        registry.register_route(Box::new(SwapStar::new()));
        registry
    }

    /// Appends a node-level operator.
    pub fn register_node(&mut self, op: Box<dyn NodeMove>) {
        self.node_ops.push(op);
    }

    /// Appends a route-level operator.
    pub fn register_route(&mut self, op: Box<dyn RouteMove>) {
        self.route_ops.push(op);
    }

    /// Whether no operator is registered at all.
    pub fn is_empty(&self) -> bool {
        self.node_ops.is_empty() && self.route_ops.is_empty()
    }

    pub(crate) fn node_ops(&self) -> &[Box<dyn NodeMove>] {
        &self.node_ops
    }

    pub(crate) fn route_ops_mut(&mut self) -> &mut [Box<dyn RouteMove>] {
        &mut self.route_ops
    }
}
