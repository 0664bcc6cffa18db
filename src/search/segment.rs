//! Time-window segment algebra.
//!
//! # Algorithm
//!
//! A [`TimeWindowSegment`] summarizes a contiguous run of visits by its
//! total duration, accumulated time warp, and the `[earliest, latest]`
//! interval of feasible start times. Two adjacent runs combine with
//! [`TimeWindowSegment::merge`], an associative operation: arriving after
//! a window closes does not fail, it "warps" time back to the window's
//! due date and records the lost amount. This relaxation keeps every
//! sequence evaluable in O(1) once its segment is known.
//!
//! Segments are immutable; larger spans are derived exclusively by
//! merging smaller ones.
//!
//! # Reference
//!
//! Nagata, Y., Bräysy, O. & Dullaert, W. (2010). "A penalty-based edge
//! assembly memetic algorithm for the vehicle routing problem with time
//! windows", *Computers & Operations Research* 37(4), 724-737.
//!
//! Vidal, T., Crainic, T.G., Gendreau, M. & Prins, C. (2013). "A hybrid
//! genetic algorithm with adaptive diversity management for a large class
//! of vehicle routing problems with time-windows", *Computers & Operations
//! Research* 40(1), 475-489.

use crate::distance::DistanceMatrix;
use crate::models::Client;

/// Immutable summary of a contiguous visit sequence.
///
/// `earliest`/`latest` bound the start times of the whole block that
/// avoid any waiting before the first visit; starting outside the bounds
/// costs waiting time (below `earliest`) or time warp (above `latest`).
///
/// # Examples
///
/// ```
/// use vrptw_search::models::{Client, TimeWindow};
/// use vrptw_search::distance::DistanceMatrix;
/// use vrptw_search::search::TimeWindowSegment;
///
/// let clients = vec![
///     Client::depot(0.0, 0.0),
///     Client::new(1, 5.0, 0.0, 10, 2.0).with_time_window(TimeWindow::new(0.0, 20.0).unwrap()),
/// ];
/// let dm = DistanceMatrix::from_clients(&clients);
///
/// let depot = TimeWindowSegment::single(&clients[0]);
/// let visit = TimeWindowSegment::single(&clients[1]);
/// let merged = TimeWindowSegment::merge(&dm, depot, visit);
/// assert_eq!(merged.time_warp(), 0.0);
/// assert_eq!(merged.distance(), 5.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindowSegment {
    first: usize,
    last: usize,
    duration: f64,
    time_warp: f64,
    earliest: f64,
    latest: f64,
    distance: f64,
    latest_release: f64,
}

impl TimeWindowSegment {
    /// Base segment for a single visit to `client`.
    pub fn single(client: &Client) -> Self {
        let tw = client.time_window();
        Self {
            first: client.id(),
            last: client.id(),
            duration: client.service_duration(),
            time_warp: 0.0,
            earliest: tw.ready(),
            latest: tw.due(),
            distance: 0.0,
            latest_release: client.release_time(),
        }
    }

    /// Combines segment `a` immediately followed by segment `b`.
    ///
    /// Associative and side-effect-free. Any shortfall against `b`'s
    /// window becomes added waiting (duration) or time warp; a merge
    /// never fails.
    pub fn merge(distances: &DistanceMatrix, a: Self, b: Self) -> Self {
        let edge = distances.get(a.last, b.first);
        let delta = a.duration - a.time_warp + edge;
        let wait = (b.earliest - delta - a.latest).max(0.0);
        let warp = (a.earliest + delta - b.latest).max(0.0);
        Self {
            first: a.first,
            last: b.last,
            duration: a.duration + b.duration + edge + wait,
            time_warp: a.time_warp + b.time_warp + warp,
            earliest: (b.earliest - delta).max(a.earliest) - wait,
            latest: (b.latest - delta).min(a.latest) + warp,
            distance: a.distance + edge + b.distance,
            latest_release: a.latest_release.max(b.latest_release),
        }
    }

    /// Merges three adjacent segments left to right.
    pub fn merge3(distances: &DistanceMatrix, a: Self, b: Self, c: Self) -> Self {
        Self::merge(distances, Self::merge(distances, a, b), c)
    }

    /// Folds an ordered list of adjacent segments into one.
    ///
    /// Returns `None` on an empty list.
    pub fn merge_all(distances: &DistanceMatrix, segments: &[Self]) -> Option<Self> {
        let (&head, rest) = segments.split_first()?;
        Some(
            rest.iter()
                .fold(head, |acc, &s| Self::merge(distances, acc, s)),
        )
    }

    /// First client of the span.
    pub fn first(&self) -> usize {
        self.first
    }

    /// Last client of the span.
    pub fn last(&self) -> usize {
        self.last
    }

    /// Total duration (travel + service + forced waiting).
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Accumulated time warp inside the span.
    pub fn time_warp(&self) -> f64 {
        self.time_warp
    }

    /// Earliest feasible start of the span.
    pub fn earliest(&self) -> f64 {
        self.earliest
    }

    /// Latest feasible start of the span.
    pub fn latest(&self) -> f64 {
        self.latest
    }

    /// Net travel distance of the span.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Latest release time among the span's clients.
    pub fn latest_release(&self) -> f64 {
        self.latest_release
    }

    /// Time warp of the span as a full route: starting is delayed until
    /// the latest release, and any shortfall against the latest feasible
    /// start adds warp.
    pub fn route_time_warp(&self) -> f64 {
        self.time_warp + (self.latest_release - self.latest).max(0.0)
    }

    /// Whether the span can run without any time warp.
    pub fn is_warp_free(&self) -> bool {
        self.route_time_warp() == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeWindow;
    use proptest::prelude::*;

    fn client(id: usize, x: f64, ready: f64, due: f64, service: f64) -> Client {
        Client::new(id, x, 0.0, 0, service)
            .with_time_window(TimeWindow::new(ready, due).expect("valid"))
    }

    fn line(clients: &[Client]) -> DistanceMatrix {
        DistanceMatrix::from_clients(clients)
    }

    #[test]
    fn test_single_reflects_client() {
        let c = client(1, 4.0, 10.0, 30.0, 5.0);
        let seg = TimeWindowSegment::single(&c);
        assert_eq!(seg.first(), 1);
        assert_eq!(seg.last(), 1);
        assert_eq!(seg.duration(), 5.0);
        assert_eq!(seg.earliest(), 10.0);
        assert_eq!(seg.latest(), 30.0);
        assert_eq!(seg.time_warp(), 0.0);
    }

    #[test]
    fn test_merge_no_violation() {
        // depot at 0, client at x=5 with a wide window
        let clients = vec![Client::depot(0.0, 0.0), client(1, 5.0, 0.0, 100.0, 2.0)];
        let dm = line(&clients);
        let merged = TimeWindowSegment::merge(
            &dm,
            TimeWindowSegment::single(&clients[0]),
            TimeWindowSegment::single(&clients[1]),
        );
        assert_eq!(merged.time_warp(), 0.0);
        assert_eq!(merged.distance(), 5.0);
        // travel 5 + service 2
        assert_eq!(merged.duration(), 7.0);
    }

    #[test]
    fn test_merge_forces_waiting() {
        // Window opens at 20; arriving at 5 forces 15 of waiting.
        let clients = vec![Client::depot(0.0, 0.0), client(1, 5.0, 20.0, 100.0, 0.0)];
        let dm = line(&clients);
        let merged = TimeWindowSegment::merge(
            &dm,
            TimeWindowSegment::single(&clients[0]),
            TimeWindowSegment::single(&clients[1]),
        );
        assert_eq!(merged.time_warp(), 0.0);
        // Duration includes the wait when starting as late as possible is
        // not enough: block can start at 15 to avoid waiting entirely.
        assert_eq!(merged.earliest(), 15.0);
    }

    #[test]
    fn test_merge_records_warp() {
        // Window closes at 3 but travel alone takes 5: 2 units of warp.
        let clients = vec![Client::depot(0.0, 0.0), client(1, 5.0, 0.0, 3.0, 0.0)];
        let dm = line(&clients);
        let merged = TimeWindowSegment::merge(
            &dm,
            TimeWindowSegment::single(&clients[0]),
            TimeWindowSegment::single(&clients[1]),
        );
        assert_eq!(merged.time_warp(), 2.0);
        assert!(!merged.is_warp_free());
    }

    #[test]
    fn test_merge_chain_matches_simulation() {
        // depot -> c1 -> c2 with waits; forward simulation cross-check.
        let clients = vec![
            Client::depot(0.0, 0.0),
            client(1, 1.0, 10.0, 20.0, 2.0),
            client(2, 2.0, 14.0, 30.0, 2.0),
        ];
        let dm = line(&clients);
        let seg = TimeWindowSegment::merge3(
            &dm,
            TimeWindowSegment::single(&clients[0]),
            TimeWindowSegment::single(&clients[1]),
            TimeWindowSegment::single(&clients[2]),
        );
        // Start at 0: arrive c1 at 1, wait to 10, serve to 12, arrive c2
        // at 13, wait to 14, serve to 16. No warp anywhere.
        assert_eq!(seg.time_warp(), 0.0);
        assert_eq!(seg.distance(), 2.0);
    }

    #[test]
    fn test_route_time_warp_includes_release() {
        let c = client(1, 0.0, 0.0, 10.0, 0.0).with_release_time(25.0);
        let seg = TimeWindowSegment::single(&c);
        // Route cannot start before 25 but must start by 10: 15 of warp.
        assert_eq!(seg.route_time_warp(), 15.0);
    }

    #[test]
    fn test_merge_all() {
        let clients = vec![
            Client::depot(0.0, 0.0),
            client(1, 1.0, 0.0, 100.0, 0.0),
            client(2, 2.0, 0.0, 100.0, 0.0),
        ];
        let dm = line(&clients);
        let singles: Vec<_> = clients
            .iter()
            .map(TimeWindowSegment::single)
            .collect();
        let folded = TimeWindowSegment::merge_all(&dm, &singles).expect("non-empty");
        let manual = TimeWindowSegment::merge3(&dm, singles[0], singles[1], singles[2]);
        assert_eq!(folded, manual);
        assert!(TimeWindowSegment::merge_all(&dm, &[]).is_none());
    }

    proptest! {
        /// merge is associative: (a·b)·c == a·(b·c) on every field that
        /// defines the algebra.
        #[test]
        fn prop_merge_associative(
            xs in proptest::collection::vec(0.0f64..100.0, 3),
            readies in proptest::collection::vec(0.0f64..50.0, 3),
            widths in proptest::collection::vec(0.0f64..60.0, 3),
            services in proptest::collection::vec(0.0f64..10.0, 3),
        ) {
            let clients: Vec<Client> = (0..3)
                .map(|i| {
                    client(
                        i,
                        xs[i],
                        readies[i],
                        readies[i] + widths[i],
                        services[i],
                    )
                })
                .collect();
            let dm = DistanceMatrix::from_clients(&clients);
            let a = TimeWindowSegment::single(&clients[0]);
            let b = TimeWindowSegment::single(&clients[1]);
            let c = TimeWindowSegment::single(&clients[2]);

            let left = TimeWindowSegment::merge(&dm, TimeWindowSegment::merge(&dm, a, b), c);
            let right = TimeWindowSegment::merge(&dm, a, TimeWindowSegment::merge(&dm, b, c));

            prop_assert!((left.duration() - right.duration()).abs() < 1e-6);
            prop_assert!((left.time_warp() - right.time_warp()).abs() < 1e-6);
            prop_assert!((left.earliest() - right.earliest()).abs() < 1e-6);
            prop_assert!((left.latest() - right.latest()).abs() < 1e-6);
            prop_assert!((left.distance() - right.distance()).abs() < 1e-6);
            prop_assert_eq!(left.first(), right.first());
            prop_assert_eq!(left.last(), right.last());
        }
    }
}
