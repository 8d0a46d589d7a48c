#![deny(unsafe_code, missing_docs, non_snake_case)]
#![warn(dead_code, unused_results, unreachable_pub)]

//! Route recomputation for enemies whose walkable topology changed.
//!
//! [`solve`] runs a four-neighbour A* with a Manhattan heuristic. The
//! [`PathfindingService`] wraps it in a request/response channel that either
//! runs on a worker thread or inline; callers observe identical responses in
//! both modes.

mod astar;
mod service;

pub use astar::{find_route, solve, WalkGrid};
pub use service::{Mode, PathResponse, PathfindingService, RequestId};
