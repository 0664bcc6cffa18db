//! Cost breakdown reported back to the caller.

use serde::{Deserialize, Serialize};

/// Feasibility tolerance on accumulated time warp.
const WARP_TOL: f64 = 1e-9;

/// The cost components of a route set.
///
/// Infeasibility is not an error anywhere in this crate; it is advisory
/// information carried here, for the caller to interpret (e.g. to retry
/// with amplified penalties).
///
/// # Examples
///
/// ```
/// use vrptw_search::evaluation::CostBreakdown;
///
/// let cost = CostBreakdown::new(120.0, 0, 0.0, 120.0);
/// assert!(cost.is_feasible());
/// assert_eq!(cost.penalized_cost(), 120.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    distance: f64,
    excess_load: i32,
    time_warp: f64,
    penalized_cost: f64,
}

impl CostBreakdown {
    /// Assembles a breakdown from its components.
    pub fn new(distance: f64, excess_load: i32, time_warp: f64, penalized_cost: f64) -> Self {
        Self {
            distance,
            excess_load,
            time_warp,
            penalized_cost,
        }
    }

    /// Total travel distance.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Total load above capacity, summed over routes.
    pub fn excess_load(&self) -> i32 {
        self.excess_load
    }

    /// Total time warp, summed over routes.
    pub fn time_warp(&self) -> f64 {
        self.time_warp
    }

    /// Distance plus weighted violations.
    pub fn penalized_cost(&self) -> f64 {
        self.penalized_cost
    }

    /// Whether the route set satisfies capacity and time windows.
    pub fn is_feasible(&self) -> bool {
        self.excess_load == 0 && self.time_warp <= WARP_TOL
    }
}
