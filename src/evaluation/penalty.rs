//! Penalized cost evaluation for capacity and time-window violations.

/// Penalty weights applied to excess load and time warp.
///
/// Supplied by the caller per local-search invocation and immutable for
/// its duration. Both mappings are pure and O(1); they sit on the hot
/// path of every delta-cost computation.
///
/// # Examples
///
/// ```
/// use vrptw_search::evaluation::PenaltyWeights;
///
/// let w = PenaltyWeights::new(100, 2.0, 1.0);
/// assert_eq!(w.load_penalty(120), 40.0); // 20 excess * 2.0
/// assert_eq!(w.load_penalty(80), 0.0);
/// assert_eq!(w.warp_penalty(5.0), 5.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PenaltyWeights {
    capacity: i32,
    load_weight: f64,
    warp_weight: f64,
}

impl PenaltyWeights {
    /// Creates penalty weights for the given vehicle capacity.
    pub fn new(capacity: i32, load_weight: f64, warp_weight: f64) -> Self {
        Self {
            capacity,
            load_weight,
            warp_weight,
        }
    }

    /// Vehicle capacity the load penalty is measured against.
    pub fn capacity(&self) -> i32 {
        self.capacity
    }

    /// Per-unit weight on excess load.
    pub fn load_weight(&self) -> f64 {
        self.load_weight
    }

    /// Per-unit weight on time warp.
    pub fn warp_weight(&self) -> f64 {
        self.warp_weight
    }

    /// Penalty for a route carrying `load`: `max(load - capacity, 0) * w`.
    pub fn load_penalty(&self, load: i32) -> f64 {
        (load - self.capacity).max(0) as f64 * self.load_weight
    }

    /// Penalty for `warp` units of time warp.
    pub fn warp_penalty(&self, warp: f64) -> f64 {
        warp * self.warp_weight
    }

    /// Combined penalty of a route with the given load and time warp.
    pub fn route_penalty(&self, load: i32, warp: f64) -> f64 {
        self.load_penalty(load) + self.warp_penalty(warp)
    }
}
