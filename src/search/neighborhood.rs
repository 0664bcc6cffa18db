//! Granular neighbor lists.
//!
//! # Algorithm
//!
//! For each client, precompute a size-bounded list of the most compatible
//! other clients, ordered by a proximity metric blending travel distance
//! with time-window mismatch: serving `j` right after `i` may force
//! waiting (j's window opens long after i can be left) or time warp (j's
//! window closes before i can be reached). Restricting move anchors to
//! these lists turns the quadratic neighborhood into a near-linear one.
//!
//! # Reference
//!
//! Toth, P. & Vigo, D. (2003). "The granular tabu search and its
//! application to the vehicle-routing problem", *INFORMS Journal on
//! Computing* 15(4), 333-346.

use crate::models::Instance;

/// Tuning knobs for [`NeighborLists::build`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborParams {
    /// Neighbors kept per client.
    pub size: usize,
    /// Weight on forced waiting time in the proximity metric.
    pub wait_weight: f64,
    /// Weight on forced time warp in the proximity metric.
    pub warp_weight: f64,
}

impl Default for NeighborParams {
    fn default() -> Self {
        Self {
            size: 40,
            wait_weight: 0.2,
            warp_weight: 1.0,
        }
    }
}

/// Per-client lists of nearby clients under the granular proximity
/// metric. Built once per instance; the collaborator may rebuild with a
/// larger `size` between local-search calls to widen the neighborhood.
///
/// # Examples
///
/// ```
/// use vrptw_search::models::{Client, Instance};
/// use vrptw_search::distance::DistanceMatrix;
/// use vrptw_search::search::{NeighborLists, NeighborParams};
///
/// let clients = vec![
///     Client::depot(0.0, 0.0),
///     Client::new(1, 1.0, 0.0, 10, 0.0),
///     Client::new(2, 2.0, 0.0, 10, 0.0),
///     Client::new(3, 50.0, 0.0, 10, 0.0),
/// ];
/// let dm = DistanceMatrix::from_clients(&clients);
/// let instance = Instance::new(clients, dm, 100, 2).unwrap();
///
/// let lists = NeighborLists::build(&instance, &NeighborParams { size: 1, ..Default::default() });
/// assert_eq!(lists.neighbors(1), &[2]);
/// ```
#[derive(Debug, Clone)]
pub struct NeighborLists {
    lists: Vec<Vec<usize>>,
}

impl NeighborLists {
    /// Builds the neighbor lists for all clients of `instance`.
    pub fn build(instance: &Instance, params: &NeighborParams) -> Self {
        let n = instance.num_clients();
        let mut lists = Vec::with_capacity(n + 1);
        lists.push(Vec::new()); // depot slot, unused

        for i in 1..=n {
            let mut scored: Vec<(f64, usize)> = (1..=n)
                .filter(|&j| j != i)
                .map(|j| (proximity(instance, params, i, j), j))
                .collect();
            scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            scored.truncate(params.size);
            lists.push(scored.into_iter().map(|(_, j)| j).collect());
        }
        Self { lists }
    }

    /// The precomputed neighbors of `client`, nearest first.
    pub fn neighbors(&self, client: usize) -> &[usize] {
        &self.lists[client]
    }

    /// Number of clients covered (excluding the depot).
    pub fn len(&self) -> usize {
        self.lists.len() - 1
    }

    /// Whether the lists cover no clients.
    pub fn is_empty(&self) -> bool {
        self.lists.len() <= 1
    }
}

/// Directed proximity of serving `j` directly after `i`: distance plus
/// weighted waiting and warp that the ordering would force.
fn proximity(instance: &Instance, params: &NeighborParams, i: usize, j: usize) -> f64 {
    let ci = instance.client(i);
    let cj = instance.client(j);
    let d = instance.distance(i, j);
    let wait = (cj.time_window().ready() - d - ci.time_window().due() - ci.service_duration())
        .max(0.0);
    let warp = (ci.time_window().ready() + ci.service_duration() + d - cj.time_window().due())
        .max(0.0);
    d + params.wait_weight * wait + params.warp_weight * warp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::DistanceMatrix;
    use crate::models::{Client, TimeWindow};

    fn build_instance(clients: Vec<Client>) -> Instance {
        let dm = DistanceMatrix::from_clients(&clients);
        Instance::new(clients, dm, 100, 2).expect("valid")
    }

    #[test]
    fn test_neighbors_by_distance() {
        let instance = build_instance(vec![
            Client::depot(0.0, 0.0),
            Client::new(1, 1.0, 0.0, 10, 0.0),
            Client::new(2, 2.0, 0.0, 10, 0.0),
            Client::new(3, 10.0, 0.0, 10, 0.0),
        ]);
        let lists = NeighborLists::build(&instance, &NeighborParams::default());
        assert_eq!(lists.neighbors(1), &[2, 3]);
        assert_eq!(lists.neighbors(3), &[2, 1]);
        assert_eq!(lists.len(), 3);
    }

    #[test]
    fn test_size_bound() {
        let instance = build_instance(vec![
            Client::depot(0.0, 0.0),
            Client::new(1, 1.0, 0.0, 10, 0.0),
            Client::new(2, 2.0, 0.0, 10, 0.0),
            Client::new(3, 3.0, 0.0, 10, 0.0),
            Client::new(4, 4.0, 0.0, 10, 0.0),
        ]);
        let params = NeighborParams {
            size: 2,
            ..Default::default()
        };
        let lists = NeighborLists::build(&instance, &params);
        for c in 1..=4 {
            assert_eq!(lists.neighbors(c).len(), 2);
        }
    }

    #[test]
    fn test_window_mismatch_demotes_neighbor() {
        // Client 2 is slightly nearer to 1 than client 3 is, but its
        // window closes before 1's opens, forcing warp.
        let instance = build_instance(vec![
            Client::depot(0.0, 0.0),
            Client::new(1, 0.0, 0.0, 10, 0.0)
                .with_time_window(TimeWindow::new(100.0, 200.0).expect("valid")),
            Client::new(2, 1.0, 0.0, 10, 0.0)
                .with_time_window(TimeWindow::new(0.0, 50.0).expect("valid")),
            Client::new(3, 1.5, 0.0, 10, 0.0)
                .with_time_window(TimeWindow::new(100.0, 300.0).expect("valid")),
        ]);
        let lists = NeighborLists::build(&instance, &NeighborParams::default());
        // Serving 2 after 1 forces at least 51 units of warp.
        assert_eq!(lists.neighbors(1), &[3, 2]);
    }

    #[test]
    fn test_rebuild_widens() {
        let instance = build_instance(vec![
            Client::depot(0.0, 0.0),
            Client::new(1, 1.0, 0.0, 10, 0.0),
            Client::new(2, 2.0, 0.0, 10, 0.0),
            Client::new(3, 3.0, 0.0, 10, 0.0),
        ]);
        let narrow = NeighborLists::build(
            &instance,
            &NeighborParams {
                size: 1,
                ..Default::default()
            },
        );
        let wide = NeighborLists::build(
            &instance,
            &NeighborParams {
                size: 2,
                ..Default::default()
            },
        );
        assert_eq!(narrow.neighbors(1).len(), 1);
        assert_eq!(wide.neighbors(1).len(), 2);
        // The narrow list is a prefix of the wide one.
        assert_eq!(narrow.neighbors(1), &wide.neighbors(1)[..1]);
    }
}
