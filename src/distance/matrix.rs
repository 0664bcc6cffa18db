//! Dense travel matrix.

use crate::models::Client;

/// A dense n×n travel matrix in row-major order.
///
/// Entry `(from, to)` is both the travel distance and the travel time of
/// the directed leg (speed = 1): the time-window algebra reads it as a
/// duration, the cost evaluation as a distance. Entries need not be
/// symmetric; the search tracks per-visit reversal deltas so 2-opt stays
/// exact on asymmetric inputs.
///
/// # Examples
///
/// ```
/// use vrptw_search::models::Client;
/// use vrptw_search::distance::DistanceMatrix;
///
/// let clients = vec![
///     Client::depot(0.0, 0.0),
///     Client::new(1, 3.0, 4.0, 10, 5.0),
///     Client::new(2, 6.0, 8.0, 20, 5.0),
/// ];
/// let dm = DistanceMatrix::from_clients(&clients);
/// assert!((dm.get(0, 1) - 5.0).abs() < 1e-10);
/// assert_eq!(dm.size(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    entries: Vec<f64>,
    n: usize,
}

impl DistanceMatrix {
    /// An all-zero matrix over `n` locations.
    pub fn new(n: usize) -> Self {
        Self {
            entries: vec![0.0; n * n],
            n,
        }
    }

    /// Euclidean matrix over the clients' coordinates (symmetric).
    pub fn from_clients(clients: &[Client]) -> Self {
        let n = clients.len();
        let mut dm = Self::new(n);
        for (i, a) in clients.iter().enumerate() {
            for (j, b) in clients.iter().enumerate().skip(i + 1) {
                let d = a.distance_to(b);
                dm.set(i, j, d);
                dm.set(j, i, d);
            }
        }
        dm
    }

    /// Wraps an explicit row-major grid of `n * n` entries.
    ///
    /// Returns `None` when the grid length does not match.
    pub fn from_data(n: usize, entries: Vec<f64>) -> Option<Self> {
        (entries.len() == n * n).then_some(Self { entries, n })
    }

    #[inline]
    fn index(&self, from: usize, to: usize) -> usize {
        from * self.n + to
    }

    /// Travel distance (and time) of the directed leg `from -> to`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    #[inline]
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.entries[self.index(from, to)]
    }

    /// Overwrites the directed leg `from -> to`.
    pub fn set(&mut self, from: usize, to: usize, distance: f64) {
        let idx = self.index(from, to);
        self.entries[idx] = distance;
    }

    /// Number of locations covered.
    pub fn size(&self) -> usize {
        self.n
    }

    /// Whether every leg matches its reverse within `tol`.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        (0..self.n).all(|i| {
            (i + 1..self.n).all(|j| (self.get(i, j) - self.get(j, i)).abs() <= tol)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Vec<Client> {
        vec![
            Client::depot(0.0, 0.0),
            Client::new(1, 3.0, 4.0, 10, 5.0),
            Client::new(2, 0.0, 8.0, 20, 5.0),
        ]
    }

    #[test]
    fn test_euclidean_legs() {
        let dm = DistanceMatrix::from_clients(&triangle());
        assert_eq!(dm.size(), 3);
        assert!((dm.get(0, 1) - 5.0).abs() < 1e-10);
        assert!((dm.get(0, 2) - 8.0).abs() < 1e-10);
        assert!((dm.get(1, 2) - 5.0).abs() < 1e-10);
        assert_eq!(dm.get(2, 2), 0.0);
        assert!(dm.is_symmetric(1e-10));
    }

    #[test]
    fn test_explicit_grid() {
        let dm = DistanceMatrix::from_data(2, vec![0.0, 5.0, 7.0, 0.0]).expect("valid");
        assert_eq!(dm.get(0, 1), 5.0);
        assert_eq!(dm.get(1, 0), 7.0);
        assert!(!dm.is_symmetric(1e-10));
    }

    #[test]
    fn test_grid_length_checked() {
        assert!(DistanceMatrix::from_data(2, vec![0.0, 1.0, 2.0]).is_none());
        assert!(DistanceMatrix::from_data(0, vec![]).is_some());
    }

    #[test]
    fn test_set_is_directed() {
        let mut dm = DistanceMatrix::new(3);
        dm.set(0, 1, 42.0);
        assert_eq!(dm.get(0, 1), 42.0);
        assert_eq!(dm.get(1, 0), 0.0);
        assert!(!dm.is_symmetric(1e-10));
    }
}
