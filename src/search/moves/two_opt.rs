//! 2-opt operators.
//!
//! # Algorithm
//!
//! Within a route, [`TwoOptWithin`] removes edges `(u, next(u))` and
//! `(v, next(v))` and reconnects `u -> v` and `next(u) -> next(v)`,
//! reversing the span between them. The distance delta is O(1): the cost
//! of traversing the reversed span comes from the cumulative
//! reversal-distance field, so asymmetric matrices are handled without
//! walking the span. Time windows do require rebuilding the reversed
//! span's segment, visit by visit, but only for that span.
//!
//! Between routes, [`TwoOptBetween`] (2-opt*) exchanges the suffixes
//! after `u` and after `v`, splicing each tail onto the other route.
//!
//! # Reference
//!
//! Croes, G.A. (1958). "A method for solving traveling salesman
//! problems", *Operations Research* 6(6), 791-812.
//!
//! Potvin, J.-Y. & Rousseau, J.-M. (1995). "An Exchange Heuristic for
//! Routeing Problems with Time Windows", *JORS* 46(12), 1433-1446.

use super::{NodeMove, MIN_DELTA};
use crate::search::route::{NodeId, SearchSpace};

/// Intra-route segment reversal.
#[derive(Debug, Clone, Copy)]
pub struct TwoOptWithin;

impl NodeMove for TwoOptWithin {
    fn name(&self) -> &'static str {
        "2opt"
    }

    fn test(&self, space: &SearchSpace, u: NodeId, v: NodeId) -> bool {
        if space.is_depot(u) || space.is_depot(v) {
            return false;
        }
        let ru = space.visit(u).route;
        if ru != space.visit(v).route {
            return false;
        }
        // Anchors must be ordered and non-trivial: reversing a span of
        // zero or one visit changes nothing.
        if space.visit(u).position + 1 >= space.visit(v).position {
            return false;
        }
        let x = space.visit(u).next;
        let y = space.visit(v).next;

        let dist_delta = space.dist_nodes(u, v) + space.dist_nodes(x, y)
            - space.dist_nodes(u, x)
            - space.dist_nodes(v, y)
            + space.visit(v).cum_reversal
            - space.visit(x).cum_reversal;

        if space.route(ru).is_feasible() && dist_delta >= MIN_DELTA {
            return false;
        }

        // Rebuild the segment of the reversed span only.
        let mut seg = space.visit(u).tw_before;
        let mut node = v;
        while node != u {
            seg = space.merge(seg, space.visit(node).tw);
            node = space.visit(node).prev;
        }
        let new_tw = space.merge(seg, space.visit(y).tw_after);

        let weights = space.weights();
        let delta = dist_delta + weights.warp_penalty(new_tw.route_time_warp())
            - weights.warp_penalty(space.route(ru).tw.route_time_warp());
        delta < MIN_DELTA
    }

    fn apply(&self, space: &mut SearchSpace, u: NodeId, v: NodeId) {
        let x = space.visit(u).next;
        space.reverse_span(x, v);
    }
}

/// Inter-route tail exchange (2-opt*).
#[derive(Debug, Clone, Copy)]
pub struct TwoOptBetween;

impl NodeMove for TwoOptBetween {
    fn name(&self) -> &'static str {
        "2opt*"
    }

    fn test(&self, space: &SearchSpace, u: NodeId, v: NodeId) -> bool {
        if space.is_depot(u) {
            return false;
        }
        let ru = space.visit(u).route;
        let rv = space.visit(v).route;
        if ru == rv {
            return false;
        }
        let x = space.visit(u).next;
        let y = space.visit(v).next;

        let dist_delta = space.dist_nodes(u, y) + space.dist_nodes(v, x)
            - space.dist_nodes(u, x)
            - space.dist_nodes(v, y);

        let route_u = space.route(ru);
        let route_v = space.route(rv);
        if route_u.is_feasible() && route_v.is_feasible() && dist_delta >= MIN_DELTA {
            return false;
        }

        let new_ru_tw = space.merge(space.visit(u).tw_before, space.visit(y).tw_after);
        let new_rv_tw = space.merge(space.visit(v).tw_before, space.visit(x).tw_after);

        let tail_u = route_u.load - space.visit(u).cum_load;
        let tail_v = route_v.load - space.visit(v).cum_load;
        let new_load_u = space.visit(u).cum_load + tail_v;
        let new_load_v = space.visit(v).cum_load + tail_u;

        let weights = space.weights();
        let delta = dist_delta
            + weights.load_penalty(new_load_u)
            - weights.load_penalty(route_u.load)
            + weights.load_penalty(new_load_v)
            - weights.load_penalty(route_v.load)
            + weights.warp_penalty(new_ru_tw.route_time_warp())
            - weights.warp_penalty(route_u.tw.route_time_warp())
            + weights.warp_penalty(new_rv_tw.route_time_warp())
            - weights.warp_penalty(route_v.tw.route_time_warp());
        delta < MIN_DELTA
    }

    fn apply(&self, space: &mut SearchSpace, u: NodeId, v: NodeId) {
        space.swap_tails(u, v);
    }
}
