//! Error types for the search core.
//!
//! Errors here are precondition or invariant violations only. An infeasible
//! solution (capacity or time-window violations after convergence) is not an
//! error; it is reported through the cost breakdown and left to the caller
//! to interpret.

use thiserror::Error;

/// Fatal conditions raised by the split decoder and the local search.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    /// The caller supplied no move operators.
    #[error("no move operators registered")]
    NoOperators,

    /// The instance is too small to search (fewer than two clients).
    #[error("instance has {0} clients, need at least 2")]
    InstanceTooSmall(usize),

    /// A client id outside `1..=n`, or one that appears more than once.
    #[error("invalid client id {0} in input routes or tour")]
    InvalidClient(usize),

    /// More input routes than vehicle slots.
    #[error("{routes} routes supplied but fleet size is {fleet}")]
    TooManyRoutes {
        /// Routes in the caller's solution.
        routes: usize,
        /// Vehicle slots available.
        fleet: usize,
    },

    /// Instance construction failed validation.
    #[error("invalid instance: {0}")]
    InvalidInstance(String),

    /// Split cannot serve the tour within the allowed fleet.
    #[error("fleet of {max_vehicles} vehicles cannot serve total demand {total_demand} (capacity {capacity})")]
    FleetExhausted {
        /// Maximum number of routes allowed.
        max_vehicles: usize,
        /// Sum of all client demands in the tour.
        total_demand: i64,
        /// Per-vehicle capacity.
        capacity: i32,
    },

    /// A route's linked visit structure is corrupt. Indicates a bug in a
    /// move's `apply`, not a recoverable runtime condition.
    #[error("broken visit links in route {route}")]
    BrokenRouteLinks {
        /// Index of the corrupt route.
        route: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = SearchError::NoOperators;
        assert_eq!(e.to_string(), "no move operators registered");

        let e = SearchError::FleetExhausted {
            max_vehicles: 2,
            total_demand: 500,
            capacity: 100,
        };
        assert!(e.to_string().contains("2 vehicles"));
        assert!(e.to_string().contains("500"));
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(
            SearchError::BrokenRouteLinks { route: 3 },
            SearchError::BrokenRouteLinks { route: 3 }
        );
        assert_ne!(
            SearchError::BrokenRouteLinks { route: 3 },
            SearchError::BrokenRouteLinks { route: 4 }
        );
    }
}
