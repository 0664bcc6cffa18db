//! SWAP* route-pair operator.
//!
//! # Algorithm
//!
//! Exchanges one visit from each of two routes, where each visit is
//! reinserted at its own best position in the other route rather than
//! into the vacated slot. The quadratic (u, v) scan is made affordable
//! by caching, per route and per client, the three cheapest insertion
//! positions; the caches refresh lazily whenever a route's modification
//! counter advances, and an accepted move invalidates both routes'
//! caches because both counters advance.
//!
//! For each candidate pair, a fast filter combines the removal gains
//! with the cached insertion costs (plus an exact "replace the removed
//! visit in place" option); only the best surviving candidate pays for
//! exact time-window recomputation of the final chosen positions.
//!
//! # Reference
//!
//! Vidal, T. (2022). "Hybrid genetic search for the CVRP: Open-source
//! implementation and SWAP* neighborhood", *Computers & Operations
//! Research* 140, 105643.

use super::{RouteMove, MIN_DELTA};
use crate::search::route::{NodeId, SearchSpace};
use crate::search::segment::TimeWindowSegment;

/// Bounded top-3 structure over insertion positions, cheapest first.
#[derive(Debug, Clone, Default)]
struct ThreeBest {
    entries: [Option<(NodeId, f64)>; 3],
}

impl ThreeBest {
    fn cost(&self, i: usize) -> f64 {
        self.entries[i].map_or(f64::MAX, |(_, c)| c)
    }

    fn push(&mut self, node: NodeId, cost: f64) {
        if cost < self.cost(0) {
            self.entries[2] = self.entries[1].take();
            self.entries[1] = self.entries[0].take();
            self.entries[0] = Some((node, cost));
        } else if cost < self.cost(1) {
            self.entries[2] = self.entries[1].take();
            self.entries[1] = Some((node, cost));
        } else if cost < self.cost(2) {
            self.entries[2] = Some((node, cost));
        }
    }

    fn iter(&self) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.entries.iter().filter_map(|e| *e)
    }
}

/// The concrete exchange chosen by a successful `test`.
#[derive(Debug, Clone, Copy)]
struct PlannedSwap {
    u: NodeId,
    v: NodeId,
    /// Node in v's route after which u is spliced.
    u_dest: NodeId,
    /// Node in u's route after which v is spliced.
    v_dest: NodeId,
}

/// SWAP* exchange with cached top-3 insertion points per (route, client).
pub struct SwapStar {
    cache: Vec<Vec<ThreeBest>>,
    /// `moves + 1` at computation time; 0 = never computed. An entry is
    /// fresh while it exceeds the route's `last_modified`.
    computed_at: Vec<Vec<u64>>,
    planned: Option<PlannedSwap>,
}

impl Default for SwapStar {
    fn default() -> Self {
        Self::new()
    }
}

impl SwapStar {
    /// An operator with empty caches; they size themselves on first use.
    pub fn new() -> Self {
        Self {
            cache: Vec::new(),
            computed_at: Vec::new(),
            planned: None,
        }
    }

    fn ensure_sized(&mut self, space: &SearchSpace) {
        let routes = space.num_routes();
        let clients = space.instance().num_clients() + 1;
        if self.cache.len() != routes || self.cache.first().map_or(0, |c| c.len()) != clients {
            self.cache = vec![vec![ThreeBest::default(); clients]; routes];
            self.computed_at = vec![vec![0; clients]; routes];
        }
    }

    /// Lazily recomputes the top-3 insertion positions of `client` into
    /// route `target` (client currently lives elsewhere).
    fn refresh(&mut self, space: &SearchSpace, target: usize, client: usize) {
        let route = space.route(target);
        if self.computed_at[target][client] > route.last_modified {
            return;
        }
        let seg_c = space.visit(space.node_of_client(client)).tw;
        let weights = space.weights();
        let base_warp = weights.warp_penalty(route.tw.route_time_warp());

        let mut best = ThreeBest::default();
        let mut w = route.start;
        loop {
            let next_w = space.visit(w).next;
            let c = space.node_of_client(client);
            let dist = space.dist_nodes(w, c) + space.dist_nodes(c, next_w)
                - space.dist_nodes(w, next_w);
            let tw = space.merge3(
                space.visit(w).tw_before,
                seg_c,
                space.visit(next_w).tw_after,
            );
            let cost = dist + weights.warp_penalty(tw.route_time_warp()) - base_warp;
            best.push(w, cost);
            if next_w == route.end {
                break;
            }
            w = next_w;
        }
        self.cache[target][client] = best;
        self.computed_at[target][client] = space.moves() + 1;
    }

    /// Cost change of dropping `u` from its route (distance + warp).
    fn removal_cost(space: &SearchSpace, u: NodeId) -> f64 {
        let prev = space.visit(u).prev;
        let next = space.visit(u).next;
        let route = space.route(space.visit(u).route);
        let dist = space.dist_nodes(prev, next)
            - space.dist_nodes(prev, u)
            - space.dist_nodes(u, next);
        let tw = space.merge(space.visit(prev).tw_before, space.visit(next).tw_after);
        let weights = space.weights();
        dist + weights.warp_penalty(tw.route_time_warp())
            - weights.warp_penalty(route.tw.route_time_warp())
    }

    /// Best place for `client_node` inside `target`, assuming `removed`
    /// leaves that route. Mixes the exact replace-in-place option with
    /// the cached candidates that do not touch the removed visit.
    fn best_insert(
        &self,
        space: &SearchSpace,
        client_node: NodeId,
        target: usize,
        removed: NodeId,
    ) -> (NodeId, f64) {
        let prev_r = space.visit(removed).prev;
        let next_r = space.visit(removed).next;
        let route = space.route(target);
        let weights = space.weights();

        let dist = space.dist_nodes(prev_r, client_node) + space.dist_nodes(client_node, next_r)
            - space.dist_nodes(prev_r, next_r);
        let tw = space.merge3(
            space.visit(prev_r).tw_before,
            space.visit(client_node).tw,
            space.visit(next_r).tw_after,
        );
        let in_place = dist + weights.warp_penalty(tw.route_time_warp())
            - weights.warp_penalty(route.tw.route_time_warp());

        let mut best = (prev_r, in_place);
        let client = space.visit(client_node).client;
        for (w, cost) in self.cache[target][client].iter() {
            if w == removed || w == prev_r {
                continue;
            }
            if cost < best.1 {
                best = (w, cost);
            }
        }
        best
    }

    /// Exact segment of `route_idx` after removing `removed` and
    /// splicing `inserted` after `dest`.
    fn segment_after_swap(
        space: &SearchSpace,
        removed: NodeId,
        inserted: NodeId,
        dest: NodeId,
    ) -> TimeWindowSegment {
        let seg_c = space.visit(inserted).tw;
        let prev_r = space.visit(removed).prev;
        let next_r = space.visit(removed).next;
        if dest == prev_r {
            space.merge3(
                space.visit(prev_r).tw_before,
                seg_c,
                space.visit(next_r).tw_after,
            )
        } else if space.visit(dest).position < space.visit(prev_r).position {
            let mid = space.segment_between(space.visit(dest).next, prev_r);
            space.merge(
                space.merge3(space.visit(dest).tw_before, seg_c, mid),
                space.visit(next_r).tw_after,
            )
        } else {
            let mid = space.segment_between(next_r, dest);
            space.merge(
                space.merge3(space.visit(prev_r).tw_before, mid, seg_c),
                space.visit(space.visit(dest).next).tw_after,
            )
        }
    }

    fn exact_delta(space: &SearchSpace, plan: &PlannedSwap, r1: usize, r2: usize) -> f64 {
        let route1 = space.route(r1);
        let route2 = space.route(r2);
        let seg1 = Self::segment_after_swap(space, plan.u, plan.v, plan.v_dest);
        let seg2 = Self::segment_after_swap(space, plan.v, plan.u, plan.u_dest);

        let du = space.instance().client(space.visit(plan.u).client).demand();
        let dv = space.instance().client(space.visit(plan.v).client).demand();
        let weights = space.weights();

        seg1.distance() - route1.distance + seg2.distance() - route2.distance
            + weights.warp_penalty(seg1.route_time_warp())
            - weights.warp_penalty(route1.tw.route_time_warp())
            + weights.warp_penalty(seg2.route_time_warp())
            - weights.warp_penalty(route2.tw.route_time_warp())
            + weights.load_penalty(route1.load - du + dv)
            - weights.load_penalty(route1.load)
            + weights.load_penalty(route2.load - dv + du)
            - weights.load_penalty(route2.load)
    }
}

impl RouteMove for SwapStar {
    fn name(&self) -> &'static str {
        "swap*"
    }

    fn test(&mut self, space: &SearchSpace, r1: usize, r2: usize) -> bool {
        self.planned = None;
        if r1 == r2 || space.route(r1).is_empty() || space.route(r2).is_empty() {
            return false;
        }
        self.ensure_sized(space);

        let clients1 = space.route_clients(r1);
        let clients2 = space.route_clients(r2);
        for &c in &clients1 {
            self.refresh(space, r2, c);
        }
        for &c in &clients2 {
            self.refresh(space, r1, c);
        }

        let weights = space.weights();
        let load1 = space.route(r1).load;
        let load2 = space.route(r2).load;

        let mut best: Option<(f64, PlannedSwap)> = None;
        for &cu in &clients1 {
            let u = space.node_of_client(cu);
            let removal_u = Self::removal_cost(space, u);
            let du = space.instance().client(cu).demand();
            for &cv in &clients2 {
                let v = space.node_of_client(cv);
                let dv = space.instance().client(cv).demand();
                let load_delta = weights.load_penalty(load1 - du + dv)
                    - weights.load_penalty(load1)
                    + weights.load_penalty(load2 - dv + du)
                    - weights.load_penalty(load2);

                let (u_dest, ins_u) = self.best_insert(space, u, r2, v);
                let (v_dest, ins_v) = self.best_insert(space, v, r1, u);
                let removal_v = Self::removal_cost(space, v);
                let approx = removal_u + removal_v + ins_u + ins_v + load_delta;
                if best.as_ref().is_none_or(|(b, _)| approx < *b) {
                    best = Some((
                        approx,
                        PlannedSwap {
                            u,
                            v,
                            u_dest,
                            v_dest,
                        },
                    ));
                }
            }
        }

        let Some((approx, plan)) = best else {
            return false;
        };
        if approx >= 0.0 {
            return false;
        }
        let exact = Self::exact_delta(space, &plan, r1, r2);
        if exact < MIN_DELTA {
            self.planned = Some(plan);
            true
        } else {
            false
        }
    }

    fn apply(&mut self, space: &mut SearchSpace, _r1: usize, _r2: usize) {
        debug_assert!(self.planned.is_some(), "apply without a successful test");
        if let Some(plan) = self.planned.take() {
            space.insert_chain_after(plan.u, plan.u, plan.u_dest, false);
            space.insert_chain_after(plan.v, plan.v, plan.v_dest, false);
        }
    }
}
