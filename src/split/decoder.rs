//! Giant-tour split decoder.
//!
//! # Algorithm
//!
//! Decomposes a giant tour (a permutation of all clients, depot
//! excluded) into an optimal partition of consecutive sub-sequences,
//! each served by one vehicle, under a linear penalty on load above
//! capacity. The partition is a shortest path in an auxiliary graph
//! whose node `j` is "the first `j` tour clients are served"; an edge
//! `(i, j)` is one route over clients `i+1..=j`.
//!
//! The naive O(n²) predecessor scan collapses to amortized O(n) with a
//! monotone deque of undominated predecessors: because the penalized
//! route cost is piecewise linear and convex in accumulated load, a
//! predecessor is discarded as soon as a later one is provably no worse
//! for every future endpoint. An unlimited-fleet pass runs first; only
//! when it uses too many vehicles does the layered limited-fleet pass
//! (one deque per vehicle count) run.
//!
//! # Reference
//!
//! Prins, C. (2004). "A simple and effective evolutionary algorithm for
//! the vehicle routing problem", *Computers & Operations Research*
//! 31(12), 1985-2002.
//!
//! Vidal, T. (2016). "Split algorithm in O(n) for the capacitated
//! vehicle routing problem", *Computers & Operations Research* 69,
//! 40-47.

use std::collections::VecDeque;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::models::Instance;

/// Tie-break guard for floating dominance comparisons.
const EPSILON: f64 = 1e-10;

/// Sentinel for unreachable shortest-path labels.
const UNREACHED: f64 = 1.0e30;

/// Result of splitting a giant tour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitResult {
    /// Routes as client-id sequences, in tour order.
    pub routes: Vec<Vec<usize>>,
    /// Distance plus weighted excess load.
    pub cost: f64,
    /// Total travel distance.
    pub distance: f64,
    /// Total load above capacity, summed over routes.
    pub excess_load: i32,
}

/// Prefix data over the tour, 1-indexed by tour position.
struct TourPrefix<'a> {
    instance: &'a Instance,
    tour: &'a [usize],
    /// sum_load[i]: demand of tour positions 1..=i.
    sum_load: Vec<i64>,
    /// sum_dist[i]: distance along the tour from position 1 to i.
    sum_dist: Vec<f64>,
    penalty: f64,
}

impl<'a> TourPrefix<'a> {
    fn new(instance: &'a Instance, tour: &'a [usize], penalty: f64) -> Self {
        let n = tour.len();
        let mut sum_load = vec![0i64; n + 1];
        let mut sum_dist = vec![0.0; n + 1];
        for i in 1..=n {
            sum_load[i] = sum_load[i - 1] + instance.client(tour[i - 1]).demand() as i64;
            if i > 1 {
                sum_dist[i] = sum_dist[i - 1] + instance.distance(tour[i - 2], tour[i - 1]);
            }
        }
        Self {
            instance,
            tour,
            sum_load,
            sum_dist,
            penalty,
        }
    }

    fn depot_out(&self, position: usize) -> f64 {
        self.instance.distance(0, self.tour[position - 1])
    }

    fn depot_back(&self, position: usize) -> f64 {
        self.instance.distance(self.tour[position - 1], 0)
    }

    /// Cost of one route over tour positions `i+1..=j`.
    fn route_cost(&self, i: usize, j: usize) -> f64 {
        let excess = (self.sum_load[j] - self.sum_load[i]
            - self.instance.capacity() as i64)
            .max(0) as f64;
        self.depot_out(i + 1) + self.sum_dist[j] - self.sum_dist[i + 1]
            + self.depot_back(j)
            + self.penalty * excess
    }

    fn propagate(&self, potential: &[f64], i: usize, j: usize) -> f64 {
        potential[i] + self.route_cost(i, j)
    }

    /// Whether predecessor `i` dominates the newer `j` for every future
    /// endpoint (the penalty term can only widen i's advantage).
    fn dominates(&self, potential: &[f64], i: usize, j: usize) -> bool {
        potential[j] + self.depot_out(j + 1)
            > potential[i] + self.depot_out(i + 1) + self.sum_dist[j + 1]
                - self.sum_dist[i + 1]
                + self.penalty * (self.sum_load[j] - self.sum_load[i]) as f64
    }

    /// Whether the newer `j` dominates predecessor `i` for every future
    /// endpoint; equal-cost predecessors count as dominated, so ties
    /// resolve toward later, simpler splits.
    fn dominates_right(&self, potential: &[f64], i: usize, j: usize) -> bool {
        potential[j] + self.depot_out(j + 1)
            < potential[i] + self.depot_out(i + 1) + self.sum_dist[j + 1] - self.sum_dist[i + 1]
                + EPSILON
    }
}

/// Splits `tour` into at most `max_vehicles` routes, minimizing distance
/// plus `penalty_capacity` per unit of load above capacity.
///
/// Deterministic and side-effect-free. Fatal errors cover malformed
/// tours and fleets that provably cannot carry the demand; an overloaded
/// but deliverable tour is returned with its excess priced, never
/// rejected.
///
/// # Examples
///
/// ```
/// use vrptw_search::models::{Client, Instance};
/// use vrptw_search::distance::DistanceMatrix;
/// use vrptw_search::split::split;
///
/// let clients = vec![
///     Client::depot(0.0, 0.0),
///     Client::new(1, 1.0, 0.0, 10, 0.0),
///     Client::new(2, 2.0, 0.0, 10, 0.0),
///     Client::new(3, 3.0, 0.0, 10, 0.0),
/// ];
/// let dm = DistanceMatrix::from_clients(&clients);
/// let instance = Instance::new(clients, dm, 30, 2).unwrap();
///
/// let result = split(&[1, 2, 3], &instance, 2, 100.0).unwrap();
/// assert_eq!(result.routes.len(), 1);
/// assert!((result.cost - 6.0).abs() < 1e-9);
/// ```
pub fn split(
    tour: &[usize],
    instance: &Instance,
    max_vehicles: usize,
    penalty_capacity: f64,
) -> Result<SplitResult, SearchError> {
    let n = tour.len();
    if n == 0 {
        return Ok(SplitResult {
            routes: vec![],
            cost: 0.0,
            distance: 0.0,
            excess_load: 0,
        });
    }

    let num_clients = instance.num_clients();
    let mut seen = vec![false; num_clients + 1];
    for &c in tour {
        if c == 0 || c > num_clients || seen[c] {
            return Err(SearchError::InvalidClient(c));
        }
        seen[c] = true;
    }

    let total_demand: i64 = tour
        .iter()
        .map(|&c| instance.client(c).demand() as i64)
        .sum();
    if max_vehicles == 0 || total_demand > instance.capacity() as i64 * max_vehicles as i64 {
        return Err(SearchError::FleetExhausted {
            max_vehicles,
            total_demand,
            capacity: instance.capacity(),
        });
    }

    let prefix = TourPrefix::new(instance, tour, penalty_capacity);

    let pred = split_unlimited(&prefix, n);
    let routes = backtrack(tour, &pred, n);
    if routes.len() <= max_vehicles {
        return Ok(assemble(instance, penalty_capacity, routes));
    }
    debug!(
        "unlimited split used {} routes, fleet allows {max_vehicles}; rerunning layered",
        routes.len()
    );

    let routes = split_limited(&prefix, n, max_vehicles)?;
    Ok(assemble(instance, penalty_capacity, routes))
}

/// Unlimited-fleet pass: one deque over all predecessors.
fn split_unlimited(prefix: &TourPrefix, n: usize) -> Vec<usize> {
    let mut potential = vec![UNREACHED; n + 1];
    let mut pred = vec![0usize; n + 1];
    potential[0] = 0.0;

    let mut queue: VecDeque<usize> = VecDeque::with_capacity(n + 1);
    queue.push_back(0);
    for j in 1..=n {
        let front = *queue.front().expect("deque never empties");
        potential[j] = prefix.propagate(&potential, front, j);
        pred[j] = front;

        if j < n {
            if !prefix.dominates(&potential, *queue.back().expect("non-empty"), j) {
                while let Some(&back) = queue.back() {
                    if prefix.dominates_right(&potential, back, j) {
                        queue.pop_back();
                    } else {
                        break;
                    }
                }
                queue.push_back(j);
            }
            while queue.len() > 1 {
                let front = queue[0];
                let second = queue[1];
                if prefix.propagate(&potential, front, j + 1)
                    > prefix.propagate(&potential, second, j + 1) - EPSILON
                {
                    queue.pop_front();
                } else {
                    break;
                }
            }
        }
    }
    pred
}

/// Limited-fleet pass: one shortest-path layer per vehicle, each with
/// its own predecessor deque over the previous layer's labels.
fn split_limited(
    prefix: &TourPrefix,
    n: usize,
    max_vehicles: usize,
) -> Result<Vec<Vec<usize>>, SearchError> {
    let layers = max_vehicles.min(n);
    let mut potential = vec![vec![UNREACHED; n + 1]; layers + 1];
    let mut pred = vec![vec![0usize; n + 1]; layers + 1];
    potential[0][0] = 0.0;

    for k in 0..layers {
        let (prev_layers, next_layers) = potential.split_at_mut(k + 1);
        let prev = &prev_layers[k];
        let next = &mut next_layers[0];

        let mut queue: VecDeque<usize> = VecDeque::with_capacity(n + 1);
        if prev[k] < UNREACHED {
            queue.push_back(k);
        }
        for j in (k + 1)..=n {
            let Some(&front) = queue.front() else {
                break;
            };
            next[j] = prefix.propagate(prev, front, j);
            pred[k + 1][j] = front;

            if j < n {
                // Candidate j carries layer-k cost prev[j].
                if prev[j] < UNREACHED {
                    let back = *queue.back().expect("non-empty");
                    if !prefix.dominates(prev, back, j) {
                        while let Some(&b) = queue.back() {
                            if prefix.dominates_right(prev, b, j) {
                                queue.pop_back();
                            } else {
                                break;
                            }
                        }
                        queue.push_back(j);
                    }
                }
                while queue.len() > 1 {
                    let front = queue[0];
                    let second = queue[1];
                    if prefix.propagate(prev, front, j + 1)
                        > prefix.propagate(prev, second, j + 1) - EPSILON
                    {
                        queue.pop_front();
                    } else {
                        break;
                    }
                }
            }
        }
    }

    // Best label over any admissible vehicle count.
    let best_k = (1..=layers)
        .filter(|&k| potential[k][n] < UNREACHED)
        .min_by(|&a, &b| potential[a][n].total_cmp(&potential[b][n]));
    let Some(best_k) = best_k else {
        return Err(SearchError::FleetExhausted {
            max_vehicles,
            total_demand: prefix.sum_load[n],
            capacity: prefix.instance.capacity(),
        });
    };

    let mut routes = Vec::with_capacity(best_k);
    let mut j = n;
    let mut k = best_k;
    while j > 0 {
        let i = pred[k][j];
        routes.push(prefix.tour[i..j].to_vec());
        j = i;
        k -= 1;
    }
    routes.reverse();
    Ok(routes)
}

fn backtrack(tour: &[usize], pred: &[usize], n: usize) -> Vec<Vec<usize>> {
    let mut routes = Vec::new();
    let mut j = n;
    while j > 0 {
        let i = pred[j];
        routes.push(tour[i..j].to_vec());
        j = i;
    }
    routes.reverse();
    routes
}

/// Prices the final partition from scratch.
fn assemble(instance: &Instance, penalty: f64, routes: Vec<Vec<usize>>) -> SplitResult {
    let mut distance = 0.0;
    let mut excess = 0i64;
    for route in &routes {
        let mut prev = 0;
        let mut load = 0i64;
        for &c in route {
            distance += instance.distance(prev, c);
            load += instance.client(c).demand() as i64;
            prev = c;
        }
        distance += instance.distance(prev, 0);
        excess += (load - instance.capacity() as i64).max(0);
    }
    SplitResult {
        cost: distance + penalty * excess as f64,
        distance,
        excess_load: excess as i32,
        routes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::DistanceMatrix;
    use crate::models::Client;

    fn line_instance(xs: &[f64], demands: &[i32], capacity: i32, fleet: usize) -> Instance {
        let mut clients = vec![Client::depot(0.0, 0.0)];
        for (i, (&x, &d)) in xs.iter().zip(demands).enumerate() {
            clients.push(Client::new(i + 1, x, 0.0, d, 0.0));
        }
        let dm = DistanceMatrix::from_clients(&clients);
        Instance::new(clients, dm, capacity, fleet).expect("valid")
    }

    /// Brute-force best partition into at most `max_parts` consecutive
    /// routes, by enumerating all compositions of the tour.
    fn brute_force(
        tour: &[usize],
        instance: &Instance,
        max_parts: usize,
        penalty: f64,
    ) -> f64 {
        let n = tour.len();
        let mut best = f64::INFINITY;
        // Bitmask b marks a route boundary after position i (1-based).
        for b in 0..(1u32 << (n - 1)) {
            let parts = b.count_ones() as usize + 1;
            if parts > max_parts {
                continue;
            }
            let mut cost = 0.0;
            let mut start = 0;
            for i in 0..n {
                let boundary = i == n - 1 || (b >> i) & 1 == 1;
                if boundary {
                    let route = &tour[start..=i];
                    let mut prev = 0;
                    let mut load = 0i64;
                    for &c in route {
                        cost += instance.distance(prev, c);
                        load += instance.client(c).demand() as i64;
                        prev = c;
                    }
                    cost += instance.distance(prev, 0);
                    cost += penalty * (load - instance.capacity() as i64).max(0) as f64;
                    start = i + 1;
                }
            }
            best = best.min(cost);
        }
        best
    }

    #[test]
    fn test_split_single_route_on_a_line() {
        // The worked example: clients at x = 10..50, one vehicle, all
        // demand fits; the single route costs exactly 100.
        let instance = line_instance(
            &[10.0, 20.0, 30.0, 40.0, 50.0],
            &[10, 10, 10, 10, 10],
            100,
            1,
        );
        let result = split(&[1, 2, 3, 4, 5], &instance, 1, 10.0).expect("splits");
        assert_eq!(result.routes, vec![vec![1, 2, 3, 4, 5]]);
        assert!((result.cost - 100.0).abs() < 1e-9);
        assert!((result.distance - 100.0).abs() < 1e-9);
        assert_eq!(result.excess_load, 0);
    }

    #[test]
    fn test_split_empty_tour() {
        let instance = line_instance(&[1.0], &[10], 100, 1);
        let result = split(&[], &instance, 1, 10.0).expect("splits");
        assert!(result.routes.is_empty());
        assert_eq!(result.cost, 0.0);
    }

    #[test]
    fn test_split_capacity_forces_partition() {
        let instance = line_instance(&[1.0, 2.0, 3.0], &[10, 10, 10], 20, 3);
        let result = split(&[1, 2, 3], &instance, 3, 1000.0).expect("splits");
        // Optimal: [1] + [2,3] = 2 + 6 = 8, no overload at this penalty.
        assert_eq!(result.routes, vec![vec![1], vec![2, 3]]);
        assert!((result.cost - 8.0).abs() < 1e-9);
        assert_eq!(result.excess_load, 0);
    }

    #[test]
    fn test_split_low_penalty_tolerates_overload() {
        // With a negligible penalty, one overloaded route beats paying
        // the return trips.
        let instance = line_instance(&[1.0, 2.0, 3.0], &[10, 10, 10], 20, 3);
        let result = split(&[1, 2, 3], &instance, 3, 0.01).expect("splits");
        assert_eq!(result.routes.len(), 1);
        assert_eq!(result.excess_load, 10);
        assert!((result.cost - (6.0 + 0.1)).abs() < 1e-9);
    }

    #[test]
    fn test_split_matches_brute_force_unlimited() {
        let instance = line_instance(
            &[3.0, 7.0, 1.0, 9.0, 4.0, 8.0, 2.0, 6.0],
            &[4, 9, 3, 7, 6, 2, 8, 5],
            15,
            8,
        );
        let tour = [3, 1, 7, 5, 2, 8, 4, 6];
        for penalty in [0.5, 5.0, 50.0] {
            let result = split(&tour, &instance, 8, penalty).expect("splits");
            let best = brute_force(&tour, &instance, 8, penalty);
            assert!(
                (result.cost - best).abs() < 1e-9,
                "penalty {penalty}: split {} vs brute force {best}",
                result.cost
            );
        }
    }

    #[test]
    fn test_split_matches_brute_force_limited_fleet() {
        let instance = line_instance(
            &[3.0, 7.0, 1.0, 9.0, 4.0, 8.0, 2.0],
            &[9, 9, 8, 9, 8, 9, 8],
            20,
            7,
        );
        let tour = [4, 2, 6, 1, 7, 3, 5];
        for max_vehicles in [3usize, 4] {
            let result = split(&tour, &instance, max_vehicles, 25.0).expect("splits");
            assert!(result.routes.len() <= max_vehicles);
            let best = brute_force(&tour, &instance, max_vehicles, 25.0);
            assert!(
                (result.cost - best).abs() < 1e-9,
                "fleet {max_vehicles}: split {} vs brute force {best}",
                result.cost
            );
        }
    }

    #[test]
    fn test_split_never_exceeds_fleet() {
        // No consecutive 2-way cut keeps both loads within capacity, so
        // the unlimited pass uses 3 routes; the fleet allows 2, and two
        // routes come back with priced overload.
        let instance = line_instance(&[1.0, 2.0, 3.0], &[20, 20, 20], 30, 2);
        let result = split(&[1, 2, 3], &instance, 2, 1.0).expect("splits");
        assert_eq!(result.routes.len(), 2);
        assert_eq!(result.routes, vec![vec![1], vec![2, 3]]);
        assert_eq!(result.excess_load, 10);
        assert!((result.cost - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_split_fleet_provably_insufficient() {
        let instance = line_instance(&[1.0, 2.0, 3.0], &[50, 50, 50], 50, 3);
        let result = split(&[1, 2, 3], &instance, 2, 10.0);
        assert_eq!(
            result.unwrap_err(),
            SearchError::FleetExhausted {
                max_vehicles: 2,
                total_demand: 150,
                capacity: 50,
            }
        );
    }

    #[test]
    fn test_split_rejects_malformed_tour() {
        let instance = line_instance(&[1.0, 2.0], &[5, 5], 100, 2);
        assert_eq!(
            split(&[1, 9], &instance, 2, 10.0).unwrap_err(),
            SearchError::InvalidClient(9)
        );
        assert_eq!(
            split(&[1, 1], &instance, 2, 10.0).unwrap_err(),
            SearchError::InvalidClient(1)
        );
        assert_eq!(
            split(&[0, 1], &instance, 2, 10.0).unwrap_err(),
            SearchError::InvalidClient(0)
        );
    }

    #[test]
    fn test_split_deterministic() {
        let instance = line_instance(
            &[3.0, 7.0, 1.0, 9.0, 4.0],
            &[4, 9, 3, 7, 6],
            15,
            5,
        );
        let tour = [3, 1, 5, 2, 4];
        let a = split(&tour, &instance, 5, 7.5).expect("splits");
        let b = split(&tour, &instance, 5, 7.5).expect("splits");
        assert_eq!(a.routes, b.routes);
        assert_eq!(a.cost, b.cost);
    }
}
