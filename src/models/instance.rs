//! Problem instance owning all static data shared by the search.

use std::f64::consts::PI;

use crate::distance::DistanceMatrix;
use crate::error::SearchError;

use super::Client;

/// Angular resolution: polar angles are expressed in 65536ths of a circle.
pub(crate) const ANGLE_UNITS: i32 = 65536;

/// A VRPTW instance: depot + clients, distance matrix, and a homogeneous
/// fleet described by its size and per-vehicle capacity.
///
/// Owns everything the search reads but never writes: client data, the
/// distance matrix, and the precomputed polar angle of each client about
/// the depot (used by the circle-sector pruning).
///
/// # Examples
///
/// ```
/// use vrptw_search::models::{Client, Instance};
/// use vrptw_search::distance::DistanceMatrix;
///
/// let clients = vec![
///     Client::depot(0.0, 0.0),
///     Client::new(1, 1.0, 0.0, 10, 0.0),
///     Client::new(2, 0.0, 1.0, 10, 0.0),
/// ];
/// let dm = DistanceMatrix::from_clients(&clients);
/// let instance = Instance::new(clients, dm, 100, 2).unwrap();
/// assert_eq!(instance.num_clients(), 2);
/// assert_eq!(instance.capacity(), 100);
/// ```
#[derive(Debug, Clone)]
pub struct Instance {
    clients: Vec<Client>,
    distances: DistanceMatrix,
    capacity: i32,
    num_vehicles: usize,
    polar_angles: Vec<i32>,
}

impl Instance {
    /// Builds an instance, validating the client list against the matrix.
    ///
    /// Requirements: client 0 is the depot, client ids are contiguous and
    /// match their position, the matrix covers every location, capacity is
    /// positive, and the fleet is non-empty.
    pub fn new(
        clients: Vec<Client>,
        distances: DistanceMatrix,
        capacity: i32,
        num_vehicles: usize,
    ) -> Result<Self, SearchError> {
        if clients.is_empty() || clients[0].id() != 0 {
            return Err(SearchError::InvalidInstance(
                "client 0 must be the depot".into(),
            ));
        }
        for (i, c) in clients.iter().enumerate() {
            if c.id() != i {
                return Err(SearchError::InvalidInstance(format!(
                    "client at position {i} has id {}",
                    c.id()
                )));
            }
        }
        if distances.size() != clients.len() {
            return Err(SearchError::InvalidInstance(format!(
                "matrix covers {} locations, instance has {}",
                distances.size(),
                clients.len()
            )));
        }
        if capacity <= 0 {
            return Err(SearchError::InvalidInstance(
                "capacity must be positive".into(),
            ));
        }
        if num_vehicles == 0 {
            return Err(SearchError::InvalidInstance("fleet is empty".into()));
        }

        let depot = clients[0].clone();
        let polar_angles = clients
            .iter()
            .map(|c| polar_angle_about(&depot, c))
            .collect();

        Ok(Self {
            clients,
            distances,
            capacity,
            num_vehicles,
            polar_angles,
        })
    }

    /// All locations (index 0 = depot, 1..=n = clients).
    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    /// The client (or depot) with the given id.
    pub fn client(&self, id: usize) -> &Client {
        &self.clients[id]
    }

    /// Number of clients (excluding the depot).
    pub fn num_clients(&self) -> usize {
        self.clients.len() - 1
    }

    /// Per-vehicle capacity.
    pub fn capacity(&self) -> i32 {
        self.capacity
    }

    /// Fleet size (number of route slots).
    pub fn num_vehicles(&self) -> usize {
        self.num_vehicles
    }

    /// The distance matrix.
    pub fn distances(&self) -> &DistanceMatrix {
        &self.distances
    }

    /// Travel distance between two locations.
    pub fn distance(&self, from: usize, to: usize) -> f64 {
        self.distances.get(from, to)
    }

    /// Polar angle of a client about the depot, in 65536ths of a circle.
    pub fn polar_angle(&self, id: usize) -> i32 {
        self.polar_angles[id]
    }

    /// Sum of all client demands.
    pub fn total_demand(&self) -> i64 {
        self.clients[1..].iter().map(|c| c.demand() as i64).sum()
    }
}

/// Maps a client's bearing from the depot onto `[0, 65536)`.
fn polar_angle_about(depot: &Client, client: &Client) -> i32 {
    let dx = client.x() - depot.x();
    let dy = client.y() - depot.y();
    let turns = dy.atan2(dx) / (2.0 * PI);
    ((turns * ANGLE_UNITS as f64) as i32).rem_euclid(ANGLE_UNITS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_clients() -> Vec<Client> {
        vec![
            Client::depot(0.0, 0.0),
            Client::new(1, 1.0, 0.0, 10, 0.0),
            Client::new(2, 0.0, 1.0, 20, 0.0),
            Client::new(3, -1.0, 0.0, 30, 0.0),
            Client::new(4, 0.0, -1.0, 40, 0.0),
        ]
    }

    #[test]
    fn test_instance_valid() {
        let clients = square_clients();
        let dm = DistanceMatrix::from_clients(&clients);
        let instance = Instance::new(clients, dm, 100, 3).expect("valid");
        assert_eq!(instance.num_clients(), 4);
        assert_eq!(instance.num_vehicles(), 3);
        assert_eq!(instance.total_demand(), 100);
    }

    #[test]
    fn test_instance_rejects_bad_depot() {
        let clients = vec![Client::new(1, 0.0, 0.0, 0, 0.0)];
        let dm = DistanceMatrix::new(1);
        assert!(Instance::new(clients, dm, 100, 1).is_err());
    }

    #[test]
    fn test_instance_rejects_gapped_ids() {
        let clients = vec![Client::depot(0.0, 0.0), Client::new(2, 1.0, 0.0, 5, 0.0)];
        let dm = DistanceMatrix::new(2);
        assert!(Instance::new(clients, dm, 100, 1).is_err());
    }

    #[test]
    fn test_instance_rejects_matrix_mismatch() {
        let clients = square_clients();
        let dm = DistanceMatrix::new(3);
        assert!(Instance::new(clients, dm, 100, 1).is_err());
    }

    #[test]
    fn test_instance_rejects_empty_fleet() {
        let clients = square_clients();
        let dm = DistanceMatrix::from_clients(&clients);
        assert!(Instance::new(clients.clone(), dm.clone(), 100, 0).is_err());
        assert!(Instance::new(clients, dm, 0, 2).is_err());
    }

    #[test]
    fn test_polar_angles_quadrants() {
        let clients = square_clients();
        let dm = DistanceMatrix::from_clients(&clients);
        let instance = Instance::new(clients, dm, 100, 3).expect("valid");
        // East, north, west, south in 65536ths of a circle.
        assert_eq!(instance.polar_angle(1), 0);
        assert_eq!(instance.polar_angle(2), ANGLE_UNITS / 4);
        assert_eq!(instance.polar_angle(3), ANGLE_UNITS / 2);
        assert_eq!(instance.polar_angle(4), 3 * ANGLE_UNITS / 4);
    }
}
