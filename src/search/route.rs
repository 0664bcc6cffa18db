//! Route and visit arena.
//!
//! # Design
//!
//! Visits live in a flat arena addressed by stable indices: slot `c` for
//! client `c` (1..=n), followed by one start-depot and one end-depot
//! sentinel per vehicle slot. `prev`/`next`/`route` are index fields, so
//! clearing and reusing routes can never dangle.
//!
//! Every aggregate — positions, cumulative load, reversal distances,
//! prefix/suffix time-window segments, jump shortcuts, sector,
//! barycenter — is recomputed by [`SearchSpace::update_route`] as a pure
//! function of the link structure. Operators mutate links only and must
//! never hand-patch aggregates.

use crate::error::SearchError;
use crate::evaluation::{CostBreakdown, PenaltyWeights};
use crate::models::Instance;

use super::sector::CircleSector;
use super::segment::TimeWindowSegment;

/// Index of a visit in the arena.
pub type NodeId = usize;

/// Positions at this stride cache a shortcut segment to the visit four
/// links ahead, so long-span segment queries skip most merges.
const JUMP_STRIDE: usize = 4;

/// Barycenter sentinel placing empty routes last in any angular order.
const EMPTY_ROUTE_ANGLE: f64 = 1.0e30;

/// A shortcut to the visit `JUMP_STRIDE` links ahead, with the merged
/// segment of the visits strictly between (and including) the target.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Jump {
    pub(crate) to: NodeId,
    pub(crate) segment: TimeWindowSegment,
}

/// One occurrence of a client (or a depot sentinel) inside a route.
#[derive(Debug, Clone)]
pub(crate) struct Visit {
    /// Client id; 0 for both depot sentinels.
    pub(crate) client: usize,
    /// Index of the owning route.
    pub(crate) route: usize,
    /// 0 for the start depot, 1-based for clients, size+1 for the end depot.
    pub(crate) position: usize,
    pub(crate) prev: NodeId,
    pub(crate) next: NodeId,
    /// Load up to and including this visit.
    pub(crate) cum_load: i32,
    /// Cost change if the prefix [depot..this] were traversed reversed.
    pub(crate) cum_reversal: f64,
    /// Segment of this visit alone.
    pub(crate) tw: TimeWindowSegment,
    /// Segment of [start depot .. this].
    pub(crate) tw_before: TimeWindowSegment,
    /// Segment of [this .. end depot].
    pub(crate) tw_after: TimeWindowSegment,
    pub(crate) jump: Option<Jump>,
}

/// A vehicle route: depot-bounded doubly linked visit sequence plus
/// aggregate state.
#[derive(Debug, Clone)]
pub(crate) struct Route {
    pub(crate) idx: usize,
    pub(crate) start: NodeId,
    pub(crate) end: NodeId,
    /// Number of client visits (sentinels excluded).
    pub(crate) size: usize,
    pub(crate) load: i32,
    pub(crate) distance: f64,
    /// Merged segment of the whole route, depot to depot.
    pub(crate) tw: TimeWindowSegment,
    /// Load penalty + time-warp penalty under the current weights.
    pub(crate) penalty: f64,
    pub(crate) sector: CircleSector,
    /// Polar angle of the clients' barycenter; empty routes sort last.
    pub(crate) barycenter_angle: f64,
    /// Move counter when this route last changed.
    pub(crate) last_modified: u64,
    /// Move counter when this route was last tested by a route-pair pass.
    pub(crate) last_tested_pair: u64,
}

impl Route {
    /// Whether the route currently violates neither capacity nor windows.
    pub(crate) fn is_feasible(&self) -> bool {
        self.penalty == 0.0
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// Private arena holding one local-search invocation's mutable state.
///
/// Created per call; never shared. The caller's route objects are copied
/// in by [`SearchSpace::load`] and copied out by [`SearchSpace::export`].
#[derive(Debug)]
pub struct SearchSpace<'a> {
    instance: &'a Instance,
    weights: PenaltyWeights,
    min_sector_width: i32,
    visits: Vec<Visit>,
    routes: Vec<Route>,
    moves: u64,
}

impl<'a> SearchSpace<'a> {
    /// Builds an arena with every client unassigned and one empty route
    /// per vehicle slot. Call [`SearchSpace::load`] before searching.
    pub fn new(instance: &'a Instance, weights: PenaltyWeights, min_sector_width: i32) -> Self {
        let n = instance.num_clients();
        let fleet = instance.num_vehicles();
        let depot_tw = TimeWindowSegment::single(instance.client(0));

        let mut visits = Vec::with_capacity(n + 1 + 2 * fleet);
        for c in 0..=n {
            let tw = if c == 0 {
                depot_tw
            } else {
                TimeWindowSegment::single(instance.client(c))
            };
            visits.push(Visit {
                client: c,
                route: 0,
                position: 0,
                prev: 0,
                next: 0,
                cum_load: 0,
                cum_reversal: 0.0,
                tw,
                tw_before: tw,
                tw_after: tw,
                jump: None,
            });
        }

        let mut routes = Vec::with_capacity(fleet);
        for r in 0..fleet {
            let start = n + 1 + 2 * r;
            let end = start + 1;
            // Sentinels point at each other, never outside the route.
            for _ in 0..2 {
                visits.push(Visit {
                    client: 0,
                    route: r,
                    position: 0,
                    prev: start,
                    next: end,
                    cum_load: 0,
                    cum_reversal: 0.0,
                    tw: depot_tw,
                    tw_before: depot_tw,
                    tw_after: depot_tw,
                    jump: None,
                });
            }
            routes.push(Route {
                idx: r,
                start,
                end,
                size: 0,
                load: 0,
                distance: 0.0,
                tw: depot_tw,
                penalty: 0.0,
                sector: CircleSector::default(),
                barycenter_angle: EMPTY_ROUTE_ANGLE,
                last_modified: 0,
                last_tested_pair: 0,
            });
        }

        Self {
            instance,
            weights,
            min_sector_width,
            visits,
            routes,
            moves: 0,
        }
    }

    /// Imports a route partition, copying the caller's sequences into the
    /// arena and computing all aggregates.
    ///
    /// Requires a partition: every client appears in exactly one route,
    /// and at most `fleet` routes are supplied.
    pub fn load(&mut self, routes_in: &[Vec<usize>]) -> Result<(), SearchError> {
        let n = self.instance.num_clients();
        if routes_in.len() > self.routes.len() {
            return Err(SearchError::TooManyRoutes {
                routes: routes_in.len(),
                fleet: self.routes.len(),
            });
        }

        let mut seen = vec![false; n + 1];
        for ids in routes_in {
            for &c in ids {
                if c == 0 || c > n || seen[c] {
                    return Err(SearchError::InvalidClient(c));
                }
                seen[c] = true;
            }
        }
        if let Some(missing) = (1..=n).find(|&c| !seen[c]) {
            return Err(SearchError::InvalidClient(missing));
        }

        for r in 0..self.routes.len() {
            let (start, end) = (self.routes[r].start, self.routes[r].end);
            let mut prev = start;
            if let Some(ids) = routes_in.get(r) {
                for &c in ids {
                    self.link(prev, c);
                    prev = c;
                }
            }
            self.link(prev, end);
            self.update_route(r)?;
        }
        Ok(())
    }

    /// Reads back the client-id sequences of all non-empty routes,
    /// ordered by the routes' angular barycenters.
    pub fn export(&self) -> Vec<Vec<usize>> {
        let mut keyed: Vec<(f64, Vec<usize>)> = self
            .routes
            .iter()
            .filter(|r| !r.is_empty())
            .map(|r| (r.barycenter_angle, self.route_clients(r.idx)))
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        keyed.into_iter().map(|(_, ids)| ids).collect()
    }

    /// Client ids of route `r`, in visit order.
    pub(crate) fn route_clients(&self, r: usize) -> Vec<usize> {
        let mut ids = Vec::with_capacity(self.routes[r].size);
        let mut node = self.visits[self.routes[r].start].next;
        while node != self.routes[r].end {
            ids.push(self.visits[node].client);
            node = self.visits[node].next;
        }
        ids
    }

    /// Aggregate cost of the current arena state, from cached aggregates.
    pub fn cost(&self) -> CostBreakdown {
        let mut distance = 0.0;
        let mut excess = 0;
        let mut warp = 0.0;
        for r in &self.routes {
            distance += r.distance;
            excess += (r.load - self.weights.capacity()).max(0);
            warp += r.tw.route_time_warp();
        }
        let penalized =
            distance + excess as f64 * self.weights.load_weight() + self.weights.warp_penalty(warp);
        CostBreakdown::new(distance, excess, warp, penalized)
    }

    /// Recomputes the cost from the raw link structure, bypassing every
    /// cached aggregate. Used to assert aggregate consistency.
    pub fn recompute_cost(&self) -> CostBreakdown {
        let dm = self.instance.distances();
        let mut distance = 0.0;
        let mut excess = 0;
        let mut warp = 0.0;
        for r in &self.routes {
            let mut seg = self.visits[r.start].tw;
            let mut load = 0;
            let mut node = self.visits[r.start].next;
            loop {
                seg = TimeWindowSegment::merge(dm, seg, self.visits[node].tw);
                load += self.instance.client(self.visits[node].client).demand();
                if node == r.end {
                    break;
                }
                node = self.visits[node].next;
            }
            distance += seg.distance();
            excess += (load - self.weights.capacity()).max(0);
            warp += seg.route_time_warp();
        }
        let penalized =
            distance + excess as f64 * self.weights.load_weight() + self.weights.warp_penalty(warp);
        CostBreakdown::new(distance, excess, warp, penalized)
    }

    /// Recomputes every aggregate of route `r` from its links: one
    /// forward walk, one backward walk, then the jump table, sector, and
    /// barycenter. The only source of truth after any mutation.
    ///
    /// Detects corrupt link structures (walk does not reach the end
    /// sentinel, or `prev`/`next` disagree) and reports them as fatal.
    pub(crate) fn update_route(&mut self, r: usize) -> Result<(), SearchError> {
        let dm = self.instance.distances();
        let (start, end) = (self.routes[r].start, self.routes[r].end);

        // Forward pass: positions, loads, reversal distances, prefixes.
        let mut order = Vec::with_capacity(self.routes[r].size + 2);
        {
            let v = &mut self.visits[start];
            v.route = r;
            v.position = 0;
            v.cum_load = 0;
            v.cum_reversal = 0.0;
            v.tw_before = v.tw;
        }
        order.push(start);
        let mut node = start;
        while node != end {
            let next = self.visits[node].next;
            if order.len() > self.visits.len() || self.visits[next].prev != node {
                return Err(SearchError::BrokenRouteLinks { route: r });
            }
            let c_prev = self.visits[node].client;
            let c = self.visits[next].client;
            let position = self.visits[node].position + 1;
            let cum_load = self.visits[node].cum_load + self.instance.client(c).demand();
            let cum_reversal =
                self.visits[node].cum_reversal + dm.get(c, c_prev) - dm.get(c_prev, c);
            let prefix =
                TimeWindowSegment::merge(dm, self.visits[node].tw_before, self.visits[next].tw);

            let v = &mut self.visits[next];
            v.route = r;
            v.position = position;
            v.cum_load = cum_load;
            v.cum_reversal = cum_reversal;
            v.tw_before = prefix;
            order.push(next);
            node = next;
        }

        // Backward pass: suffix segments.
        self.visits[end].tw_after = self.visits[end].tw;
        for i in (0..order.len() - 1).rev() {
            let suffix =
                TimeWindowSegment::merge(dm, self.visits[order[i]].tw, self.visits[order[i + 1]].tw_after);
            self.visits[order[i]].tw_after = suffix;
        }

        // Jump shortcuts at fixed strides.
        for &id in &order {
            self.visits[id].jump = None;
        }
        let mut anchor = 0;
        while anchor + JUMP_STRIDE < order.len() {
            let mut seg = self.visits[order[anchor + 1]].tw;
            for k in anchor + 2..=anchor + JUMP_STRIDE {
                seg = TimeWindowSegment::merge(dm, seg, self.visits[order[k]].tw);
            }
            self.visits[order[anchor]].jump = Some(Jump {
                to: order[anchor + JUMP_STRIDE],
                segment: seg,
            });
            anchor += JUMP_STRIDE;
        }

        // Route aggregates, assembled into locals first.
        let size = order.len() - 2;
        let load = self.visits[end].cum_load;
        let tw = self.visits[end].tw_before;
        let penalty = self.weights.route_penalty(load, tw.route_time_warp());
        let moves = self.moves;

        // Sector and barycenter over the client visits only.
        let (sector, barycenter_angle) = if size == 0 {
            (CircleSector::default(), EMPTY_ROUTE_ANGLE)
        } else {
            let mut sector = CircleSector::default();
            let mut sum_dx = 0.0;
            let mut sum_dy = 0.0;
            let depot = self.instance.client(0);
            for &id in &order[1..=size] {
                let c = self.instance.client(self.visits[id].client);
                sector.extend(self.instance.polar_angle(c.id()));
                sum_dx += c.x() - depot.x();
                sum_dy += c.y() - depot.y();
            }
            sector.grow_to_minimum(self.min_sector_width);
            let angle = (sum_dy / size as f64).atan2(sum_dx / size as f64);
            (sector, angle)
        };

        let route = &mut self.routes[r];
        route.size = size;
        route.load = load;
        route.tw = tw;
        route.distance = tw.distance();
        route.penalty = penalty;
        route.last_modified = moves;
        route.sector = sector;
        route.barycenter_angle = barycenter_angle;
        Ok(())
    }

    /// Merged segment of the span `[u, v]`, using jump shortcuts where
    /// available and falling back to node-by-node merging.
    ///
    /// `u` must precede `v` within one route (operators reject candidate
    /// positions that do not satisfy this before calling).
    pub(crate) fn segment_between(&self, u: NodeId, v: NodeId) -> TimeWindowSegment {
        debug_assert_eq!(self.visits[u].route, self.visits[v].route);
        debug_assert!(self.visits[u].position <= self.visits[v].position);
        let dm = self.instance.distances();
        let target = self.visits[v].position;
        let mut seg = self.visits[u].tw;
        let mut node = u;
        while node != v {
            if let Some(jump) = self.visits[node].jump {
                if self.visits[jump.to].position <= target {
                    seg = TimeWindowSegment::merge(dm, seg, jump.segment);
                    node = jump.to;
                    continue;
                }
            }
            node = self.visits[node].next;
            seg = TimeWindowSegment::merge(dm, seg, self.visits[node].tw);
        }
        seg
    }

    // ------------------------------------------------------------------
    // Link surgery. Aggregates go stale; callers must update_route on
    // every touched route afterwards.
    // ------------------------------------------------------------------

    fn link(&mut self, a: NodeId, b: NodeId) {
        self.visits[a].next = b;
        self.visits[b].prev = a;
    }

    /// Moves the chain `[first..last]` (inclusive, linked in order) to
    /// sit directly after `after`, optionally reversing it.
    pub(crate) fn insert_chain_after(
        &mut self,
        first: NodeId,
        last: NodeId,
        after: NodeId,
        reversed: bool,
    ) {
        let before = self.visits[first].prev;
        let after_chain = self.visits[last].next;
        self.link(before, after_chain);
        // Read the splice point only after unlinking, so reinsertion next
        // to the chain's old position stays well-formed.
        let target_next = self.visits[after].next;
        if !reversed {
            self.link(after, first);
            self.link(last, target_next);
        } else {
            let mut ids = vec![first];
            let mut node = first;
            while node != last {
                node = self.visits[node].next;
                ids.push(node);
            }
            self.link(after, last);
            for i in (1..ids.len()).rev() {
                self.link(ids[i], ids[i - 1]);
            }
            self.link(first, target_next);
        }
    }

    /// Reverses the span `[first..last]` in place.
    pub(crate) fn reverse_span(&mut self, first: NodeId, last: NodeId) {
        let before = self.visits[first].prev;
        let after = self.visits[last].next;
        let mut ids = vec![first];
        let mut node = first;
        while node != last {
            node = self.visits[node].next;
            ids.push(node);
        }
        self.link(before, last);
        for i in (1..ids.len()).rev() {
            self.link(ids[i], ids[i - 1]);
        }
        self.link(first, after);
    }

    /// Exchanges the suffixes after `u` and after `v` between their two
    /// routes (each route keeps its own end sentinel).
    pub(crate) fn swap_tails(&mut self, u: NodeId, v: NodeId) {
        let end_u = self.routes[self.visits[u].route].end;
        let end_v = self.routes[self.visits[v].route].end;
        let mut tail_u = Vec::new();
        let mut node = self.visits[u].next;
        while node != end_u {
            tail_u.push(node);
            node = self.visits[node].next;
        }
        let mut tail_v = Vec::new();
        node = self.visits[v].next;
        while node != end_v {
            tail_v.push(node);
            node = self.visits[node].next;
        }

        let mut prev = u;
        for &id in &tail_v {
            self.link(prev, id);
            prev = id;
        }
        self.link(prev, end_u);

        prev = v;
        for &id in &tail_u {
            self.link(prev, id);
            prev = id;
        }
        self.link(prev, end_v);
    }

    // ------------------------------------------------------------------
    // Accessors.
    // ------------------------------------------------------------------

    pub(crate) fn instance(&self) -> &Instance {
        self.instance
    }

    pub(crate) fn weights(&self) -> &PenaltyWeights {
        &self.weights
    }

    pub(crate) fn visit(&self, n: NodeId) -> &Visit {
        &self.visits[n]
    }

    pub(crate) fn route(&self, r: usize) -> &Route {
        &self.routes[r]
    }

    pub(crate) fn num_routes(&self) -> usize {
        self.routes.len()
    }

    /// Distance between the clients of two visits.
    pub(crate) fn dist_nodes(&self, a: NodeId, b: NodeId) -> f64 {
        self.instance
            .distance(self.visits[a].client, self.visits[b].client)
    }

    pub(crate) fn is_depot(&self, n: NodeId) -> bool {
        self.visits[n].client == 0
    }

    /// Arena id of a client's visit (clients occupy their own slots).
    pub(crate) fn node_of_client(&self, c: usize) -> NodeId {
        c
    }

    pub(crate) fn first_empty_route(&self) -> Option<usize> {
        self.routes.iter().position(|r| r.is_empty())
    }

    /// Monotone move counter; bumped once per accepted move.
    pub(crate) fn moves(&self) -> u64 {
        self.moves
    }

    pub(crate) fn bump_moves(&mut self) -> u64 {
        self.moves += 1;
        self.moves
    }

    pub(crate) fn mark_route_tested_pair(&mut self, r: usize, stamp: u64) {
        self.routes[r].last_tested_pair = stamp;
    }

    pub(crate) fn merge(&self, a: TimeWindowSegment, b: TimeWindowSegment) -> TimeWindowSegment {
        TimeWindowSegment::merge(self.instance.distances(), a, b)
    }

    pub(crate) fn merge3(
        &self,
        a: TimeWindowSegment,
        b: TimeWindowSegment,
        c: TimeWindowSegment,
    ) -> TimeWindowSegment {
        TimeWindowSegment::merge3(self.instance.distances(), a, b, c)
    }
}
