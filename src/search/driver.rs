//! Local search driver.
//!
//! # Algorithm
//!
//! Runs sweeps over the clients in a freshly shuffled order. For each
//! client `u`, the anchors tried are `u`'s granular neighbors; the first
//! registered operator whose `test` accepts is applied, both touched
//! routes are recomputed and stamped with the move counter, and `u`'s
//! neighborhood is re-evaluated from scratch. A staleness filter skips
//! (client, neighbor) pairs whose routes have not changed since the
//! client's last turn, so sweeps after the first are near-linear.
//!
//! Moves that open an empty route are suppressed on the first sweep to
//! avoid runaway fleet growth. A second pass runs the route-pair
//! operators (SWAP*) over sector-overlapping pairs — on every sweep that
//! would otherwise terminate, and on other sweeps behind a random
//! intensification draw.
//!
//! The driver converges when a full sweep accepts no move, with a
//! minimum of two sweeps.

use log::{debug, trace};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::evaluation::{CostBreakdown, PenaltyWeights};
use crate::models::{Instance, ANGLE_UNITS};

use super::moves::OperatorRegistry;
use super::neighborhood::NeighborLists;
use super::route::SearchSpace;
use super::sector::CircleSector;

/// Driver tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    /// Minimum angular width a route's circle sector is grown to, in
    /// 65536ths of a circle.
    pub min_sector_width: i32,
    /// Slack allowed when testing sector overlap for route-pair moves.
    pub sector_overlap_tolerance: i32,
    /// Probability of running the route-pair pass on an improving sweep.
    pub intensify_probability: f64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            // 15 degrees.
            min_sector_width: ANGLE_UNITS / 24,
            sector_overlap_tolerance: 0,
            intensify_probability: 0.25,
        }
    }
}

/// Driver lifecycle, one pass per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    /// Route set imported, aggregates computed.
    Loaded,
    /// Sweeps in progress.
    Searching,
    /// A full sweep accepted no move.
    Converged,
}

/// Improved routes plus their cost breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Client-id sequences, ordered by angular barycenter.
    pub routes: Vec<Vec<usize>>,
    /// Cost of the returned route set.
    pub cost: CostBreakdown,
}

/// Local-search engine owning a private route/visit arena.
///
/// # Examples
///
/// ```
/// use rand::rngs::SmallRng;
/// use rand::SeedableRng;
/// use vrptw_search::distance::DistanceMatrix;
/// use vrptw_search::evaluation::PenaltyWeights;
/// use vrptw_search::models::{Client, Instance};
/// use vrptw_search::search::{
///     LocalSearch, NeighborLists, NeighborParams, OperatorRegistry, SearchParams,
/// };
///
/// let clients = vec![
///     Client::depot(0.0, 0.0),
///     Client::new(1, 1.0, 0.0, 10, 0.0),
///     Client::new(2, 2.0, 0.0, 10, 0.0),
///     Client::new(3, 3.0, 0.0, 10, 0.0),
/// ];
/// let dm = DistanceMatrix::from_clients(&clients);
/// let instance = Instance::new(clients, dm, 100, 2).unwrap();
/// let neighbors = NeighborLists::build(&instance, &NeighborParams::default());
///
/// let mut search = LocalSearch::new(
///     &instance,
///     PenaltyWeights::new(100, 10.0, 1.0),
///     &neighbors,
///     SearchParams::default(),
/// )
/// .unwrap();
/// let mut registry = OperatorRegistry::standard();
/// let mut rng = SmallRng::seed_from_u64(42);
/// let outcome = search
///     .run(&[vec![2, 1, 3]], &mut registry, &mut rng)
///     .unwrap();
/// assert!(outcome.cost.is_feasible());
/// ```
#[derive(Debug)]
pub struct LocalSearch<'a> {
    space: SearchSpace<'a>,
    neighbors: &'a NeighborLists,
    params: SearchParams,
    state: SearchState,
}

impl<'a> LocalSearch<'a> {
    /// Builds a searcher for `instance` under the given penalty weights.
    ///
    /// Fails fast on instances too small to search.
    pub fn new(
        instance: &'a Instance,
        weights: PenaltyWeights,
        neighbors: &'a NeighborLists,
        params: SearchParams,
    ) -> Result<Self, SearchError> {
        if instance.num_clients() < 2 {
            return Err(SearchError::InstanceTooSmall(instance.num_clients()));
        }
        Ok(Self {
            space: SearchSpace::new(instance, weights, params.min_sector_width),
            neighbors,
            params,
            state: SearchState::Loaded,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SearchState {
        self.state
    }

    /// Read-only view of the private arena (for cost assertions).
    pub fn space(&self) -> &SearchSpace<'a> {
        &self.space
    }

    /// Imports `routes`, improves them to a local optimum, and returns
    /// the result. The caller's route set is never mutated.
    pub fn run<R: Rng>(
        &mut self,
        routes: &[Vec<usize>],
        registry: &mut OperatorRegistry,
        rng: &mut R,
    ) -> Result<SearchOutcome, SearchError> {
        if registry.is_empty() {
            return Err(SearchError::NoOperators);
        }
        self.space.load(routes)?;
        self.state = SearchState::Loaded;

        let n = self.space.instance().num_clients();
        let neighbors = self.neighbors;
        let mut order: Vec<usize> = (1..=n).collect();
        let mut last_test: Vec<u64> = vec![0; n + 1];

        self.state = SearchState::Searching;
        let mut sweep: u32 = 0;
        let mut improved = true;
        while improved || sweep < 2 {
            improved = false;
            order.shuffle(rng);

            for &uc in &order {
                let u = self.space.node_of_client(uc);
                let last = last_test[uc];
                last_test[uc] = self.space.moves();

                'anchor: loop {
                    for &vc in neighbors.neighbors(uc) {
                        let v = self.space.node_of_client(vc);
                        let ru = self.space.visit(u).route;
                        let rv = self.space.visit(v).route;
                        if sweep > 0
                            && self.space.route(ru).last_modified <= last
                            && self.space.route(rv).last_modified <= last
                        {
                            continue;
                        }
                        for op in registry.node_ops() {
                            if op.test(&self.space, u, v) {
                                trace!("accept {} on ({uc}, {vc})", op.name());
                                self.space.bump_moves();
                                op.apply(&mut self.space, u, v);
                                self.space.update_route(ru)?;
                                if rv != ru {
                                    self.space.update_route(rv)?;
                                }
                                improved = true;
                                continue 'anchor;
                            }
                        }
                    }

                    // Route-opening moves, suppressed on the first sweep.
                    if sweep > 0 {
                        if let Some(re) = self.space.first_empty_route() {
                            let v = self.space.route(re).start;
                            let ru = self.space.visit(u).route;
                            for op in registry.node_ops() {
                                if op.test(&self.space, u, v) {
                                    trace!("accept {} on ({uc}, empty route {re})", op.name());
                                    self.space.bump_moves();
                                    op.apply(&mut self.space, u, v);
                                    self.space.update_route(ru)?;
                                    self.space.update_route(re)?;
                                    improved = true;
                                    continue 'anchor;
                                }
                            }
                        }
                    }
                    break;
                }
            }

            // Route-pair pass: always on a sweep that would otherwise
            // converge, probabilistically on improving sweeps.
            let intensify = !improved || rng.random_bool(self.params.intensify_probability);
            if intensify {
                improved |= self.route_pair_pass(registry, sweep)?;
            }

            debug!(
                "sweep {sweep}: cost {:.3}, {} moves so far",
                self.space.cost().penalized_cost(),
                self.space.moves()
            );
            sweep += 1;
        }

        self.state = SearchState::Converged;
        Ok(SearchOutcome {
            routes: self.space.export(),
            cost: self.space.cost(),
        })
    }

    /// Runs the route-pair operators over sector-overlapping pairs whose
    /// routes changed since their last pair test. Returns whether any
    /// move was accepted.
    fn route_pair_pass(
        &mut self,
        registry: &mut OperatorRegistry,
        sweep: u32,
    ) -> Result<bool, SearchError> {
        let mut improved = false;
        let num_routes = self.space.num_routes();
        for r1 in 0..num_routes {
            if self.space.route(r1).is_empty() {
                continue;
            }
            let last_tested = self.space.route(r1).last_tested_pair;
            let stamp = self.space.moves();
            self.space.mark_route_tested_pair(r1, stamp);

            for r2 in (r1 + 1)..num_routes {
                if self.space.route(r2).is_empty() {
                    continue;
                }
                if sweep > 0
                    && self.space.route(r1).last_modified <= last_tested
                    && self.space.route(r2).last_modified <= last_tested
                {
                    continue;
                }
                if !CircleSector::overlaps(
                    &self.space.route(r1).sector,
                    &self.space.route(r2).sector,
                    self.params.sector_overlap_tolerance,
                ) {
                    continue;
                }
                for op in registry.route_ops_mut() {
                    if op.test(&self.space, r1, r2) {
                        trace!("accept {} on routes ({r1}, {r2})", op.name());
                        self.space.bump_moves();
                        op.apply(&mut self.space, r1, r2);
                        self.space.update_route(r1)?;
                        self.space.update_route(r2)?;
                        improved = true;
                        break;
                    }
                }
            }
        }
        Ok(improved)
    }
}

/// One-call entry point: imports `routes`, improves them to a local
/// optimum under the given penalties, and returns the improved set.
pub fn local_search<R: Rng>(
    instance: &Instance,
    routes: &[Vec<usize>],
    weights: PenaltyWeights,
    neighbors: &NeighborLists,
    registry: &mut OperatorRegistry,
    params: &SearchParams,
    rng: &mut R,
) -> Result<SearchOutcome, SearchError> {
    let mut search = LocalSearch::new(instance, weights, neighbors, *params)?;
    search.run(routes, registry, rng)
}
