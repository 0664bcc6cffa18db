//! Chain exchange operator.
//!
//! # Algorithm
//!
//! Swaps the chain of `take` consecutive visits starting at `u` with the
//! chain of `give` consecutive visits starting at `v`, within one route
//! or across two. Chains must be disjoint and depot-free. Adjacent
//! chains are handled for the single-visit swap (where the rewiring
//! degenerates) and rejected for longer chains.

use super::{NodeMove, MIN_DELTA};
use crate::search::route::{NodeId, SearchSpace};

/// Swap `take` visits at `u` with `give` visits at `v`.
#[derive(Debug, Clone, Copy)]
pub struct Exchange {
    take: usize,
    give: usize,
}

impl Exchange {
    /// A `take`-for-`give` chain swap. Both lengths must be 1..=3 and
    /// `take >= give` (the mirrored pair arises from swapped anchors).
    pub fn new(take: usize, give: usize) -> Self {
        assert!((1..=3).contains(&take) && (1..=3).contains(&give));
        assert!(take >= give, "normalize so the longer chain is at u");
        Self { take, give }
    }

    fn collect(space: &SearchSpace, start: NodeId, len: usize) -> Option<Vec<NodeId>> {
        let mut chain = Vec::with_capacity(len);
        let mut node = start;
        for i in 0..len {
            if i > 0 {
                node = space.visit(node).next;
            }
            if space.is_depot(node) {
                return None;
            }
            chain.push(node);
        }
        Some(chain)
    }

    fn internal_distance(space: &SearchSpace, chain: &[NodeId]) -> f64 {
        chain
            .windows(2)
            .map(|w| space.dist_nodes(w[0], w[1]))
            .sum()
    }

    fn chain_load(space: &SearchSpace, chain: &[NodeId]) -> i32 {
        let first = chain[0];
        let last = chain[chain.len() - 1];
        space.visit(last).cum_load - space.visit(space.visit(first).prev).cum_load
    }
}

impl NodeMove for Exchange {
    fn name(&self) -> &'static str {
        match (self.take, self.give) {
            (1, 1) => "exchange11",
            (2, 1) => "exchange21",
            (2, 2) => "exchange22",
            (3, 1) => "exchange31",
            (3, 2) => "exchange32",
            (3, 3) => "exchange33",
            _ => "exchange",
        }
    }

    fn test(&self, space: &SearchSpace, u: NodeId, v: NodeId) -> bool {
        if space.is_depot(u) || space.is_depot(v) {
            return false;
        }
        let Some(chain_u) = Self::collect(space, u, self.take) else {
            return false;
        };
        let Some(chain_v) = Self::collect(space, v, self.give) else {
            return false;
        };
        if chain_u.iter().any(|n| chain_v.contains(n)) {
            return false;
        }

        let last_u = chain_u[chain_u.len() - 1];
        let last_v = chain_v[chain_v.len() - 1];
        let prev_u = space.visit(u).prev;
        let prev_v = space.visit(v).prev;
        let next_u = space.visit(last_u).next;
        let next_v = space.visit(last_v).next;

        let u_before_v = next_u == v;
        let v_before_u = next_v == u;
        let adjacent = u_before_v || v_before_u;
        if adjacent && (self.take != 1 || self.give != 1) {
            return false;
        }

        let ru = space.visit(u).route;
        let rv = space.visit(v).route;
        let d = |a, b| space.dist_nodes(a, b);

        let dist_delta = if u_before_v {
            // prev_u, u, v, next_v  ->  prev_u, v, u, next_v
            d(prev_u, v) + d(v, u) + d(u, next_v) - d(prev_u, u) - d(u, v) - d(v, next_v)
        } else if v_before_u {
            d(prev_v, u) + d(u, v) + d(v, next_u) - d(prev_v, v) - d(v, u) - d(u, next_u)
        } else {
            let internal_u = Self::internal_distance(space, &chain_u);
            let internal_v = Self::internal_distance(space, &chain_v);
            let at_u_site =
                d(prev_u, v) + internal_v + d(last_v, next_u) - d(prev_u, u) - internal_u - d(last_u, next_u);
            let at_v_site =
                d(prev_v, u) + internal_u + d(last_u, next_v) - d(prev_v, v) - internal_v - d(last_v, next_v);
            at_u_site + at_v_site
        };

        if space.route(ru).is_feasible() && space.route(rv).is_feasible() && dist_delta >= MIN_DELTA
        {
            return false;
        }

        let weights = space.weights();
        if ru == rv {
            let new_tw = if adjacent {
                let (first, second) = if u_before_v { (u, v) } else { (v, u) };
                let before = space.visit(space.visit(first).prev).tw_before;
                let after = space.visit(space.visit(second).next).tw_after;
                space.merge(
                    space.merge3(before, space.visit(second).tw, space.visit(first).tw),
                    after,
                )
            } else {
                // Order the chains along the route.
                let (a_first, a_last, b_first, b_last) =
                    if space.visit(u).position < space.visit(v).position {
                        (u, last_u, v, last_v)
                    } else {
                        (v, last_v, u, last_u)
                    };
                let seg_a = space.segment_between(a_first, a_last);
                let seg_b = space.segment_between(b_first, b_last);
                let mid = space
                    .segment_between(space.visit(a_last).next, space.visit(b_first).prev);
                let head = space.visit(space.visit(a_first).prev).tw_before;
                let tail = space.visit(space.visit(b_last).next).tw_after;
                space.merge(
                    space.merge3(space.merge(head, seg_b), mid, seg_a),
                    tail,
                )
            };
            let delta = dist_delta + weights.warp_penalty(new_tw.route_time_warp())
                - weights.warp_penalty(space.route(ru).tw.route_time_warp());
            delta < MIN_DELTA
        } else {
            let seg_u = space.segment_between(u, last_u);
            let seg_v = space.segment_between(v, last_v);
            let new_ru_tw = space.merge3(
                space.visit(prev_u).tw_before,
                seg_v,
                space.visit(next_u).tw_after,
            );
            let new_rv_tw = space.merge3(
                space.visit(prev_v).tw_before,
                seg_u,
                space.visit(next_v).tw_after,
            );
            let load_u = Self::chain_load(space, &chain_u);
            let load_v = Self::chain_load(space, &chain_v);
            let route_u = space.route(ru);
            let route_v = space.route(rv);
            let delta = dist_delta
                + weights.load_penalty(route_u.load - load_u + load_v)
                - weights.load_penalty(route_u.load)
                + weights.load_penalty(route_v.load - load_v + load_u)
                - weights.load_penalty(route_v.load)
                + weights.warp_penalty(new_ru_tw.route_time_warp())
                - weights.warp_penalty(route_u.tw.route_time_warp())
                + weights.warp_penalty(new_rv_tw.route_time_warp())
                - weights.warp_penalty(route_v.tw.route_time_warp());
            delta < MIN_DELTA
        }
    }

    fn apply(&self, space: &mut SearchSpace, u: NodeId, v: NodeId) {
        let mut last_u = u;
        for _ in 1..self.take {
            last_u = space.visit(last_u).next;
        }
        let mut last_v = v;
        for _ in 1..self.give {
            last_v = space.visit(last_v).next;
        }
        let prev_u = space.visit(u).prev;
        let prev_v = space.visit(v).prev;

        if space.visit(last_u).next == v {
            space.insert_chain_after(v, last_v, prev_u, false);
        } else if space.visit(last_v).next == u {
            space.insert_chain_after(u, last_u, prev_v, false);
        } else {
            space.insert_chain_after(v, last_v, prev_u, false);
            space.insert_chain_after(u, last_u, prev_v, false);
        }
    }
}
