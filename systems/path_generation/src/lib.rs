#![deny(unsafe_code, missing_docs, non_snake_case)]
#![warn(dead_code, unused_results, unreachable_pub)]

//! Procedural route generation.
//!
//! The generator carves a single winding route between two cells of the
//! playable rectangle. Several seeded attempts run; attempts that dead-end are
//! discarded and the best surviving candidate wins. When nothing survives the
//! generator falls back to a direct L-shaped connector, so generation never
//! fails.

mod carve;
mod route;

use grid_defence_core::{CellCoord, CellRect};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

pub use route::{is_overlap_free, RouteMetrics};

const RNG_STREAM_ATTEMPT: &str = "path-attempt";

/// Tunables for route carving.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upper bound on direction changes.
    pub max_turns: u32,
    /// Shortest straight run, in moves. One run may be shorter.
    pub min_segment: u32,
    /// Longest run sampled while wandering.
    pub max_segment: u32,
    /// Carving attempts before giving up.
    pub attempts: u32,
    /// Successful candidates to collect before choosing.
    pub candidates: u32,
    /// Manhattan distance below which the endpoints are joined directly.
    pub min_endpoint_distance: u32,
    /// Chance per step of trying a staircase or detour.
    pub pattern_probability: f64,
    /// Chance of turning toward the exit rather than away from it.
    pub toward_exit_bias: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_turns: 16,
            min_segment: 4,
            max_segment: 10,
            attempts: 60,
            candidates: 5,
            min_endpoint_distance: 8,
            pattern_probability: 0.25,
            toward_exit_bias: 0.65,
        }
    }
}

impl Config {
    /// Fewest turns an accepted route may have: 60% of the budget, rounded up.
    #[must_use]
    pub fn min_turns(&self) -> u32 {
        (self.max_turns * 3 + 4) / 5
    }

    pub(crate) fn pattern_probability(&self) -> f64 {
        clamp_probability(self.pattern_probability)
    }

    pub(crate) fn toward_exit_bias(&self) -> f64 {
        clamp_probability(self.toward_exit_bias)
    }
}

fn clamp_probability(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Where to carve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathRequest {
    /// Playable rectangle the route must stay inside.
    pub bounds: CellRect,
    /// First cell of the route.
    pub entry: CellCoord,
    /// Last cell of the route.
    pub exit: CellCoord,
}

/// Outcome of route generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedPath {
    /// Cells from entry to exit. Crossing cells appear twice.
    pub route: Vec<CellCoord>,
    /// Direction changes along the route.
    pub turns: u32,
    /// Whether the direct connector was used.
    pub fallback: bool,
}

/// Seeded route generator.
#[derive(Clone, Debug, Default)]
pub struct PathGenerator {
    config: Config,
}

impl PathGenerator {
    /// Creates a generator with the provided tunables.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Tunables in use.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Generates a route. Identical requests and seeds yield identical routes.
    #[must_use]
    pub fn generate(&self, request: &PathRequest, seed: u64) -> GeneratedPath {
        let PathRequest {
            bounds,
            entry,
            exit,
        } = *request;

        if entry == exit || !bounds.contains(entry) || !bounds.contains(exit) {
            warn!(?entry, ?exit, "route endpoints unusable, joining directly");
            return direct_connector(entry, exit);
        }
        if entry.manhattan_distance(exit) < self.config.min_endpoint_distance {
            warn!(?entry, ?exit, "route endpoints too close, joining directly");
            return direct_connector(entry, exit);
        }

        let mut candidates: Vec<(f32, Vec<CellCoord>, u32)> = Vec::new();
        for attempt in 0..self.config.attempts {
            if candidates.len() >= self.config.candidates.max(1) as usize {
                break;
            }

            let rng = ChaCha8Rng::seed_from_u64(derive_attempt_seed(seed, attempt));
            let Some(route) = carve::Carver::new(&self.config, bounds, entry, exit, rng).carve()
            else {
                continue;
            };
            let Some(metrics) = RouteMetrics::measure(&route) else {
                continue;
            };
            if !self.accepts(&route, &metrics, bounds) {
                continue;
            }

            let score = score(&metrics);
            debug!(
                attempt,
                turns = metrics.turns,
                length = metrics.length,
                score,
                "route candidate accepted"
            );
            candidates.push((score, route, metrics.turns));
        }

        match candidates
            .into_iter()
            .max_by(|left, right| left.0.total_cmp(&right.0))
        {
            Some((_, route, turns)) => GeneratedPath {
                route,
                turns,
                fallback: false,
            },
            None => {
                warn!(
                    attempts = self.config.attempts,
                    "no route reached the turn budget, joining directly"
                );
                direct_connector(entry, exit)
            }
        }
    }

    fn accepts(&self, route: &[CellCoord], metrics: &RouteMetrics, bounds: CellRect) -> bool {
        metrics.turns >= self.config.min_turns()
            && metrics.turns <= self.config.max_turns
            && metrics.short_segments(self.config.min_segment) <= 1
            && route.iter().all(|cell| bounds.contains(*cell))
            && is_overlap_free(route)
    }
}

fn score(metrics: &RouteMetrics) -> f32 {
    metrics.turns as f32 * 10.0 + metrics.length as f32 * 0.1 + metrics.length_deviation() * 2.0
}

/// Joins the endpoints with a horizontal leg followed by a vertical leg.
fn direct_connector(entry: CellCoord, exit: CellCoord) -> GeneratedPath {
    let mut route = vec![entry];
    let mut cursor = entry;

    while cursor.column() != exit.column() {
        let column = if cursor.column() < exit.column() {
            cursor.column() + 1
        } else {
            cursor.column() - 1
        };
        cursor = CellCoord::new(column, cursor.row());
        route.push(cursor);
    }
    while cursor.row() != exit.row() {
        let row = if cursor.row() < exit.row() {
            cursor.row() + 1
        } else {
            cursor.row() - 1
        };
        cursor = CellCoord::new(cursor.column(), row);
        route.push(cursor);
    }

    let turns = RouteMetrics::measure(&route).map_or(0, |metrics| metrics.turns);
    GeneratedPath {
        route,
        turns,
        fallback: true,
    }
}

fn derive_attempt_seed(seed: u64, attempt: u32) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(RNG_STREAM_ATTEMPT.as_bytes());
    hasher.update(attempt.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
