//! # vrptw-search
//!
//! Local-search improvement core for the capacitated vehicle routing
//! problem with time windows: the route/visit model, the time-window
//! feasibility algebra, granular-neighborhood move operators (relocate,
//! exchange, 2-opt, SWAP*), and the Split decoder turning giant tours
//! into cost-evaluated route sets.
//!
//! The surrounding metaheuristic — population management, crossover,
//! penalty adaptation, instance parsing — is a collaborator concern.
//! This crate consumes an initial solution plus penalty weights, and
//! either decodes a giant tour ([`split::split`]) or improves a route
//! set in place to a local optimum ([`search::LocalSearch`]).
//!
//! ## Modules
//!
//! - [`models`] — Clients, time windows, and the problem instance
//! - [`distance`] — Distance and travel time matrix
//! - [`evaluation`] — Penalty weights and cost breakdowns
//! - [`search`] — Route/visit arena, move operators, and the driver
//! - [`split`] — Giant-tour split decoder
//! - [`error`] — Fatal precondition and invariant errors

pub mod distance;
pub mod error;
pub mod evaluation;
pub mod models;
pub mod search;
pub mod split;
