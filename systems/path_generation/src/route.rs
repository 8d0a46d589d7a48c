//! Geometric measurements over finished routes.

use std::collections::HashMap;

use grid_defence_core::{Axis, CellCoord, Direction};

/// Shape summary of a route.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteMetrics {
    /// Number of direction changes.
    pub turns: u32,
    /// Number of cells, counting revisited crossing cells twice.
    pub length: usize,
    /// Number of moves in each maximal straight run, in route order.
    pub segments: Vec<u32>,
}

impl RouteMetrics {
    /// Measures a route. Returns `None` when two consecutive cells are not
    /// orthogonal neighbours.
    #[must_use]
    pub fn measure(route: &[CellCoord]) -> Option<Self> {
        let mut segments: Vec<u32> = Vec::new();
        let mut heading: Option<Direction> = None;

        for pair in route.windows(2) {
            let direction = Direction::between(pair[0], pair[1])?;
            if heading == Some(direction) {
                if let Some(run) = segments.last_mut() {
                    *run += 1;
                }
            } else {
                segments.push(1);
            }
            heading = Some(direction);
        }

        Some(Self {
            turns: segments.len().saturating_sub(1) as u32,
            length: route.len(),
            segments,
        })
    }

    /// Number of straight runs shorter than `minimum` moves.
    #[must_use]
    pub fn short_segments(&self, minimum: u32) -> usize {
        self.segments.iter().filter(|run| **run < minimum).count()
    }

    /// Population standard deviation of the run lengths.
    #[must_use]
    pub fn length_deviation(&self) -> f32 {
        if self.segments.is_empty() {
            return 0.0;
        }
        let count = self.segments.len() as f32;
        let mean = self.segments.iter().map(|run| *run as f32).sum::<f32>() / count;
        let variance = self
            .segments
            .iter()
            .map(|run| {
                let offset = *run as f32 - mean;
                offset * offset
            })
            .sum::<f32>()
            / count;
        variance.sqrt()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Visit {
    Straight(Axis),
    Turn,
}

/// Reports whether every revisited cell is a perpendicular crossing of two
/// straight passes.
///
/// Endpoints and corners may be visited exactly once. A cell crossed twice
/// must be passed straight through along different axes both times.
#[must_use]
pub fn is_overlap_free(route: &[CellCoord]) -> bool {
    let mut visits: HashMap<CellCoord, Vec<Visit>> = HashMap::new();

    for (index, cell) in route.iter().enumerate() {
        let incoming = index
            .checked_sub(1)
            .and_then(|previous| Direction::between(route[previous], *cell));
        let outgoing = route
            .get(index + 1)
            .and_then(|next| Direction::between(*cell, *next));

        let visit = match (incoming, outgoing) {
            (Some(arriving), Some(leaving)) if arriving == leaving => {
                Visit::Straight(arriving.axis())
            }
            _ => Visit::Turn,
        };
        visits.entry(*cell).or_default().push(visit);
    }

    visits.values().all(|cell_visits| match cell_visits.as_slice() {
        [_] => true,
        [Visit::Straight(first), Visit::Straight(second)] => first != second,
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(start: CellCoord, moves: &[(Direction, u32)]) -> Vec<CellCoord> {
        let mut route = vec![start];
        let mut cursor = start;
        for (direction, count) in moves {
            for _ in 0..*count {
                cursor = cursor.step(*direction).expect("test walk stays on grid");
                route.push(cursor);
            }
        }
        route
    }

    #[test]
    fn measure_counts_turns_and_runs() {
        let route = walk(
            CellCoord::new(0, 0),
            &[
                (Direction::East, 4),
                (Direction::South, 5),
                (Direction::East, 2),
            ],
        );
        let metrics = RouteMetrics::measure(&route).expect("adjacent route");

        assert_eq!(metrics.turns, 2);
        assert_eq!(metrics.segments, vec![4, 5, 2]);
        assert_eq!(metrics.short_segments(4), 1);
        assert_eq!(metrics.length, 12);
    }

    #[test]
    fn measure_rejects_gaps() {
        let route = vec![CellCoord::new(0, 0), CellCoord::new(2, 0)];
        assert_eq!(RouteMetrics::measure(&route), None);
    }

    #[test]
    fn perpendicular_crossing_is_allowed() {
        let route = walk(
            CellCoord::new(0, 2),
            &[
                (Direction::East, 4),
                (Direction::North, 2),
                (Direction::West, 2),
                (Direction::South, 4),
            ],
        );
        assert!(route.contains(&CellCoord::new(2, 2)));
        assert!(is_overlap_free(&route));
    }

    #[test]
    fn parallel_overlap_is_rejected() {
        let route = walk(
            CellCoord::new(0, 0),
            &[
                (Direction::East, 4),
                (Direction::South, 1),
                (Direction::West, 2),
                (Direction::North, 1),
                (Direction::East, 3),
            ],
        );
        assert!(!is_overlap_free(&route));
    }

    #[test]
    fn revisiting_a_corner_is_rejected() {
        let route = walk(
            CellCoord::new(0, 0),
            &[
                (Direction::East, 2),
                (Direction::South, 2),
                (Direction::West, 1),
                (Direction::North, 2),
                (Direction::East, 1),
            ],
        );
        assert!(!is_overlap_free(&route));
    }
}
