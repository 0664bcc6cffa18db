//! Chain relocation operator.
//!
//! # Algorithm
//!
//! Moves the chain of `len` consecutive visits starting at `u` so that it
//! directly follows `v`, in the same or a different route, optionally
//! reversing the chain. Rejects candidates where `v` lies inside the
//! chain or where the rewiring is a no-op (`v` is already the chain's
//! predecessor).
//!
//! The distance delta is O(1) from cached inter-client distances; the
//! time-window effect is evaluated by merging the precomputed prefix and
//! suffix segments around the affected spans, never by walking whole
//! routes.

use super::{NodeMove, MIN_DELTA};
use crate::search::route::{NodeId, SearchSpace};
use crate::search::segment::TimeWindowSegment;

/// Relocate a chain of `len ∈ {1, 2, 3}` visits, optionally reversed.
#[derive(Debug, Clone, Copy)]
pub struct Relocate {
    len: usize,
    reversed: bool,
}

impl Relocate {
    /// Forward relocation of a chain of `len` visits.
    pub fn new(len: usize) -> Self {
        assert!((1..=3).contains(&len), "chain length must be 1..=3");
        Self {
            len,
            reversed: false,
        }
    }

    /// Relocation that reverses the chain while moving it.
    pub fn reversed(len: usize) -> Self {
        assert!((2..=3).contains(&len), "reversed chains must be 2..=3");
        Self {
            len,
            reversed: true,
        }
    }

    /// Collects the chain of `len` visits starting at `u`. `None` when
    /// the chain would run into a depot sentinel or contain `v`.
    fn chain(&self, space: &SearchSpace, u: NodeId, v: NodeId) -> Option<Vec<NodeId>> {
        let mut chain = Vec::with_capacity(self.len);
        let mut node = u;
        for i in 0..self.len {
            if i > 0 {
                node = space.visit(node).next;
            }
            if space.is_depot(node) || node == v {
                return None;
            }
            chain.push(node);
        }
        Some(chain)
    }

    /// Merged segment of the chain in its post-move orientation.
    fn chain_segment(&self, space: &SearchSpace, chain: &[NodeId]) -> TimeWindowSegment {
        let mut seg = if self.reversed {
            space.visit(chain[chain.len() - 1]).tw
        } else {
            space.visit(chain[0]).tw
        };
        if self.reversed {
            for &id in chain.iter().rev().skip(1) {
                seg = space.merge(seg, space.visit(id).tw);
            }
        } else {
            for &id in chain.iter().skip(1) {
                seg = space.merge(seg, space.visit(id).tw);
            }
        }
        seg
    }

    /// Distance delta of unlinking the chain and splicing it after `v`.
    fn distance_delta(&self, space: &SearchSpace, chain: &[NodeId], v: NodeId) -> f64 {
        let first = chain[0];
        let last = chain[chain.len() - 1];
        let prev_u = space.visit(first).prev;
        let next_last = space.visit(last).next;
        let next_v = space.visit(v).next;

        let mut internal_fwd = 0.0;
        let mut internal_rev = 0.0;
        for w in chain.windows(2) {
            internal_fwd += space.dist_nodes(w[0], w[1]);
            internal_rev += space.dist_nodes(w[1], w[0]);
        }

        let removal = space.dist_nodes(prev_u, next_last)
            - space.dist_nodes(prev_u, first)
            - internal_fwd
            - space.dist_nodes(last, next_last);

        let (ins_first, ins_last, internal_new) = if self.reversed {
            (last, first, internal_rev)
        } else {
            (first, last, internal_fwd)
        };
        let insertion = space.dist_nodes(v, ins_first) + internal_new
            + space.dist_nodes(ins_last, next_v)
            - space.dist_nodes(v, next_v);

        removal + insertion
    }
}

impl NodeMove for Relocate {
    fn name(&self) -> &'static str {
        match (self.len, self.reversed) {
            (1, _) => "relocate1",
            (2, false) => "relocate2",
            (2, true) => "relocate2-rev",
            (3, false) => "relocate3",
            (3, true) => "relocate3-rev",
            _ => "relocate",
        }
    }

    fn test(&self, space: &SearchSpace, u: NodeId, v: NodeId) -> bool {
        if space.is_depot(u) {
            return false;
        }
        let Some(chain) = self.chain(space, u, v) else {
            return false;
        };
        let first = chain[0];
        let last = chain[chain.len() - 1];
        let prev_u = space.visit(first).prev;
        if v == prev_u {
            // Splicing after the chain's predecessor is a no-op.
            return false;
        }

        let ru = space.visit(u).route;
        let rv = space.visit(v).route;
        let dist_delta = self.distance_delta(space, &chain, v);
        let next_last = space.visit(last).next;
        let next_v = space.visit(v).next;

        if ru == rv {
            if space.route(ru).is_feasible() && dist_delta >= MIN_DELTA {
                return false;
            }
            let chain_seg = self.chain_segment(space, &chain);
            let pos_v = space.visit(v).position;
            let new_tw = if pos_v < space.visit(first).position {
                // ... v [chain] next_v ... prev_u next_last ...
                let mid = space.segment_between(next_v, prev_u);
                space.merge(
                    space.merge3(space.visit(v).tw_before, chain_seg, mid),
                    space.visit(next_last).tw_after,
                )
            } else {
                // ... prev_u next_last ... v [chain] next_v ...
                let mid = space.segment_between(next_last, v);
                space.merge(
                    space.merge3(space.visit(prev_u).tw_before, mid, chain_seg),
                    space.visit(next_v).tw_after,
                )
            };
            let weights = space.weights();
            let delta = dist_delta + weights.warp_penalty(new_tw.route_time_warp())
                - weights.warp_penalty(space.route(ru).tw.route_time_warp());
            delta < MIN_DELTA
        } else {
            if space.route(ru).is_feasible()
                && space.route(rv).is_feasible()
                && dist_delta >= MIN_DELTA
            {
                return false;
            }
            let chain_load = space.visit(last).cum_load - space.visit(prev_u).cum_load;
            let chain_seg = self.chain_segment(space, &chain);
            let new_ru_tw =
                space.merge(space.visit(prev_u).tw_before, space.visit(next_last).tw_after);
            let new_rv_tw = space.merge3(
                space.visit(v).tw_before,
                chain_seg,
                space.visit(next_v).tw_after,
            );
            let weights = space.weights();
            let route_u = space.route(ru);
            let route_v = space.route(rv);
            let delta = dist_delta
                + weights.load_penalty(route_u.load - chain_load)
                - weights.load_penalty(route_u.load)
                + weights.load_penalty(route_v.load + chain_load)
                - weights.load_penalty(route_v.load)
                + weights.warp_penalty(new_ru_tw.route_time_warp())
                - weights.warp_penalty(route_u.tw.route_time_warp())
                + weights.warp_penalty(new_rv_tw.route_time_warp())
                - weights.warp_penalty(route_v.tw.route_time_warp());
            delta < MIN_DELTA
        }
    }

    fn apply(&self, space: &mut SearchSpace, u: NodeId, v: NodeId) {
        let mut last = u;
        for _ in 1..self.len {
            last = space.visit(last).next;
        }
        space.insert_chain_after(u, last, v, self.reversed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::DistanceMatrix;
    use crate::evaluation::PenaltyWeights;
    use crate::models::{Client, Instance, TimeWindow};

    fn space_with<'a>(instance: &'a Instance, routes: &[Vec<usize>]) -> SearchSpace<'a> {
        let mut space = SearchSpace::new(instance, PenaltyWeights::new(instance.capacity(), 10.0, 1.0), 0);
        space.load(routes).expect("loads");
        space
    }

    fn line_instance(fleet: usize, capacity: i32) -> Instance {
        let clients = vec![
            Client::depot(0.0, 0.0),
            Client::new(1, 1.0, 0.0, 10, 0.0),
            Client::new(2, 2.0, 0.0, 10, 0.0),
            Client::new(3, 3.0, 0.0, 10, 0.0),
            Client::new(4, 4.0, 0.0, 10, 0.0),
            Client::new(5, 5.0, 0.0, 10, 0.0),
        ];
        let dm = DistanceMatrix::from_clients(&clients);
        Instance::new(clients, dm, capacity, fleet).expect("valid")
    }

    #[test]
    fn test_relocate_accepts_improving_cross_route_move() {
        // Client 2 stranded in route 1 among far clients; moving it next
        // to client 1 shortens total distance.
        let instance = line_instance(2, 100);
        let mut space = space_with(&instance, &[vec![1], vec![4, 2, 5]]);
        let op = Relocate::new(1);

        let before = space.cost().penalized_cost();
        assert!(op.test(&space, 2, 1));
        op.apply(&mut space, 2, 1);
        space.update_route(0).expect("route 0");
        space.update_route(1).expect("route 1");
        let after = space.cost().penalized_cost();
        assert!(after < before - 1e-10);
        assert_eq!(space.route_clients(0), vec![1, 2]);
        assert_eq!(space.route_clients(1), vec![4, 5]);
    }

    #[test]
    fn test_relocate_rejects_noop() {
        let instance = line_instance(1, 100);
        let space = space_with(&instance, &[vec![1, 2, 3, 4, 5]]);
        let op = Relocate::new(1);
        // Inserting 2 after its predecessor 1 is a no-op.
        assert!(!op.test(&space, 2, 1));
        // v inside the chain.
        let op2 = Relocate::new(2);
        assert!(!op2.test(&space, 2, 3));
    }

    #[test]
    fn test_relocate_rejects_depot_in_chain() {
        let instance = line_instance(2, 100);
        let space = space_with(&instance, &[vec![1, 2, 3, 4], vec![5]]);
        let op = Relocate::new(2);
        // Chain starting at 5 would swallow route 1's end sentinel.
        assert!(!op.test(&space, 5, 1));
    }

    #[test]
    fn test_relocate_within_route() {
        // Route visits 2,1,3: moving 2 between 1 and 3 restores the line
        // order and shortens the route from 8 to 6.
        let instance = line_instance(1, 100);
        let mut space = space_with(&instance, &[vec![2, 1, 3]]);
        let op = Relocate::new(1);

        assert!(op.test(&space, 2, 1));
        op.apply(&mut space, 2, 1);
        space.update_route(0).expect("updates");
        assert_eq!(space.route_clients(0), vec![1, 2, 3]);
        assert!((space.route(0).distance - 6.0).abs() < 1e-10);
    }

    #[test]
    fn test_relocate_moves_client_to_route_end() {
        // Triangle distances where moving client 2 behind client 3 is a
        // strict improvement: [1,2,3] becomes [1,3,2].
        let clients = vec![
            Client::depot(0.0, 0.0),
            Client::new(1, 0.0, 0.0, 5, 0.0),
            Client::new(2, 0.0, 0.0, 6, 0.0),
            Client::new(3, 0.0, 0.0, 7, 0.0),
        ];
        #[rustfmt::skip]
        let dm = DistanceMatrix::from_data(4, vec![
            0.0, 1.0, 1.0, 10.0,
            1.0, 0.0, 10.0, 1.0,
            1.0, 10.0, 0.0, 10.0,
            10.0, 1.0, 10.0, 0.0,
        ])
        .expect("valid");
        let instance = Instance::new(clients, dm, 100, 1).expect("valid");
        let mut space = space_with(&instance, &[vec![1, 2, 3]]);

        let op = Relocate::new(1);
        assert!(op.test(&space, 2, 3));
        op.apply(&mut space, 2, 3);
        space.update_route(0).expect("updates");
        assert_eq!(space.route_clients(0), vec![1, 3, 2]);
        assert_eq!(space.route(0).load, 18);
        // 0->1 + 1->3 + 3->2 + 2->0 = 1 + 1 + 10 + 1
        assert!((space.route(0).distance - 13.0).abs() < 1e-10);
    }

    #[test]
    fn test_relocate_chain_into_other_route() {
        let instance = line_instance(2, 30);
        // Route 0 overloaded (load 40 > 30); moving [2,3] out fixes it.
        let mut space = space_with(&instance, &[vec![1, 2, 3, 4], vec![5]]);
        assert!(!space.route(0).is_feasible());

        let op = Relocate::new(2);
        // Move chain [2,3] after 5? That lengthens distance but removes
        // the 10-weight overload penalty: must still be accepted.
        assert!(op.test(&space, 2, 5));
        op.apply(&mut space, 2, 5);
        space.update_route(0).expect("route 0");
        space.update_route(1).expect("route 1");
        assert_eq!(space.route_clients(0), vec![1, 4]);
        assert_eq!(space.route_clients(1), vec![5, 2, 3]);
        assert!(space.route(0).is_feasible());
        assert!(space.route(1).is_feasible());
    }

    #[test]
    fn test_relocate_reversed_chain() {
        let clients = vec![
            Client::depot(0.0, 0.0),
            Client::new(1, 10.0, 0.0, 5, 0.0),
            Client::new(2, 11.0, 0.0, 5, 0.0),
            Client::new(3, 12.0, 0.0, 5, 0.0),
            Client::new(4, 13.0, 0.0, 5, 0.0),
        ];
        let dm = DistanceMatrix::from_clients(&clients);
        let instance = Instance::new(clients, dm, 100, 1).expect("valid");
        // Route 4,2,1,3 costs 30; moving [2,1] reversed after 3 gives
        // 4,3,1,2 at cost 28.
        let mut space = space_with(&instance, &[vec![4, 2, 1, 3]]);
        let op = Relocate::reversed(2);
        assert!(op.test(&space, 2, 3));
        op.apply(&mut space, 2, 3);
        space.update_route(0).expect("updates");
        assert_eq!(space.route_clients(0), vec![4, 3, 1, 2]);
        assert!((space.route(0).distance - 28.0).abs() < 1e-10);
    }

    #[test]
    fn test_relocate_reversed_rejects_in_place_flip() {
        // v being the chain's predecessor is rejected even reversed;
        // in-place reversal belongs to 2-opt.
        let instance = line_instance(1, 100);
        let space = space_with(&instance, &[vec![1, 2, 3, 4, 5]]);
        let op = Relocate::reversed(2);
        assert!(!op.test(&space, 2, 1));
    }

    #[test]
    fn test_relocate_into_empty_route() {
        let instance = line_instance(2, 100);
        let space = space_with(&instance, &[vec![1, 2, 3, 4, 5]]);
        let empty_start = space.route(1).start;
        let op = Relocate::new(1);
        // Pure distance: opening a route for client 5 costs extra, so
        // the move is rejected while everything is feasible.
        assert!(!op.test(&space, 5, empty_start));

        // With an overloaded route the same move becomes improving.
        let instance2 = line_instance(2, 40);
        let mut space2 = space_with(&instance2, &[vec![1, 2, 3, 4, 5]]);
        let empty_start2 = space2.route(1).start;
        assert!(op.test(&space2, 5, empty_start2));
        op.apply(&mut space2, 5, empty_start2);
        space2.update_route(0).expect("route 0");
        space2.update_route(1).expect("route 1");
        assert_eq!(space2.route_clients(1), vec![5]);
    }

    #[test]
    fn test_relocate_respects_time_windows() {
        // Moving client 3 after client 1 improves distance but breaks
        // client 1's successor window badly enough to reject.
        let clients = vec![
            Client::depot(0.0, 0.0),
            Client::new(1, 1.0, 0.0, 5, 0.0)
                .with_time_window(TimeWindow::new(0.0, 100.0).expect("valid")),
            Client::new(2, 2.0, 0.0, 5, 10.0)
                .with_time_window(TimeWindow::new(0.0, 4.0).expect("valid")),
            Client::new(3, 1.5, 5.0, 5, 10.0),
        ];
        let dm = DistanceMatrix::from_clients(&clients);
        let instance = Instance::new(clients, dm, 100, 2).expect("valid");
        let weights = PenaltyWeights::new(100, 10.0, 100.0);
        let mut space = SearchSpace::new(&instance, weights, 0);
        space.load(&[vec![1, 2], vec![3]]).expect("loads");

        let op = Relocate::new(1);
        // Inserting 3 (10 units of service) between 1 and 2 pushes 2
        // past its due date of 4; the warp penalty dominates.
        assert!(!op.test(&space, 3, 1));
    }
}
