//! A single greedy carving attempt.
//!
//! The carver walks from the entry in straight segments that alternate axes,
//! occasionally committing a multi-segment pattern, and once the turn target
//! is within reach tries to close onto the exit with a straight or L-shaped
//! connector. Any dead end abandons the attempt.

use std::collections::HashMap;

use grid_defence_core::{Axis, CellCoord, CellRect, Direction};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::Config;

type Segment = (Direction, u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CellUse {
    Straight(Axis),
    Corner,
    Crossed,
}

pub(crate) struct Carver<'a> {
    config: &'a Config,
    bounds: CellRect,
    entry: CellCoord,
    exit: CellCoord,
    main_axis: Axis,
    rng: ChaCha8Rng,
    route: Vec<CellCoord>,
    uses: HashMap<CellCoord, CellUse>,
    heading: Option<Direction>,
    runs: Vec<u32>,
    turns: u32,
}

impl<'a> Carver<'a> {
    pub(crate) fn new(
        config: &'a Config,
        bounds: CellRect,
        entry: CellCoord,
        exit: CellCoord,
        rng: ChaCha8Rng,
    ) -> Self {
        let mut uses = HashMap::new();
        let _ = uses.insert(entry, CellUse::Corner);
        let main_axis =
            if entry.column().abs_diff(exit.column()) >= entry.row().abs_diff(exit.row()) {
                Axis::Horizontal
            } else {
                Axis::Vertical
            };

        Self {
            config,
            bounds,
            entry,
            exit,
            main_axis,
            rng,
            route: vec![entry],
            uses,
            heading: None,
            runs: Vec::new(),
            turns: 0,
        }
    }

    /// Runs the attempt to completion, yielding the route on success.
    pub(crate) fn carve(mut self) -> Option<Vec<CellCoord>> {
        let min_turns = self.config.min_turns();
        let max_turns = self.config.max_turns;
        let target = self.rng.gen_range(min_turns..=max_turns);
        let budget = max_turns as usize * 3 + 8;

        for _ in 0..budget {
            let homing = self.turns + 2 >= target;
            if homing {
                if self.try_close(min_turns, max_turns) {
                    return Some(self.route);
                }
                if self.turns >= max_turns {
                    return None;
                }
            } else if self.heading.is_some()
                && self.rng.gen_bool(self.config.pattern_probability())
                && self.try_pattern(target)
            {
                continue;
            }

            if !self.wander(homing, target) {
                return None;
            }
        }

        None
    }

    fn cursor(&self) -> CellCoord {
        self.route.last().copied().unwrap_or(self.entry)
    }

    /// Cells left to the exit along `direction`, or zero when moving that way
    /// does not approach it.
    fn toward_exit(&self, direction: Direction) -> u32 {
        let cursor = self.cursor();
        match direction {
            Direction::East => self.exit.column().saturating_sub(cursor.column()),
            Direction::West => cursor.column().saturating_sub(self.exit.column()),
            Direction::South => self.exit.row().saturating_sub(cursor.row()),
            Direction::North => cursor.row().saturating_sub(self.exit.row()),
        }
    }

    fn main_direction(&self) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|direction| direction.axis() == self.main_axis && self.toward_exit(*direction) > 0)
    }

    fn side_direction(&mut self, forward: Direction) -> Direction {
        let sides: Vec<Direction> = Direction::ALL
            .into_iter()
            .filter(|direction| direction.axis() != forward.axis())
            .collect();
        if let Some(toward) = sides.iter().find(|side| self.toward_exit(**side) > 0) {
            return *toward;
        }
        if self.rng.gen_bool(0.5) {
            sides[0]
        } else {
            sides[1]
        }
    }

    fn candidate_directions(&mut self, homing: bool) -> Vec<Direction> {
        let options: Vec<Direction> = match self.heading {
            None => Direction::ALL.to_vec(),
            Some(heading) => Direction::ALL
                .into_iter()
                .filter(|direction| direction.axis() != heading.axis())
                .collect(),
        };

        let (mut toward, mut away): (Vec<Direction>, Vec<Direction>) = options
            .into_iter()
            .partition(|direction| self.toward_exit(*direction) > 0);
        toward.sort_by_key(|direction| direction.axis() != self.main_axis);

        if toward.is_empty() {
            if self.rng.gen_bool(0.5) {
                away.reverse();
            }
            return away;
        }

        let bias = if homing {
            1.0
        } else {
            self.config.toward_exit_bias()
        };
        if self.rng.gen_bool(bias) {
            toward.extend(away);
            toward
        } else {
            away.extend(toward);
            away
        }
    }

    fn upper_length(&self, direction: Direction, homing: bool, target: u32) -> u32 {
        let min_segment = self.config.min_segment;
        let max_segment = self.config.max_segment.max(min_segment);
        let distance = self.toward_exit(direction);

        if distance == 0 {
            return min_segment.max(max_segment / 2);
        }
        if homing {
            return distance.max(min_segment);
        }
        if direction.axis() != self.main_axis {
            return max_segment;
        }

        let remaining = (target.saturating_sub(self.turns) / 2).max(1);
        (distance / remaining + 2)
            .clamp(min_segment, max_segment)
            .min(distance)
    }

    fn wander(&mut self, homing: bool, target: u32) -> bool {
        let min_segment = self.config.min_segment.max(1);

        for direction in self.candidate_directions(homing) {
            let upper = self.upper_length(direction, homing, target);
            let lengths: Vec<u32> = (min_segment..=upper)
                .filter(|length| self.plan(&[(direction, *length)], false).is_some())
                .collect();
            if lengths.is_empty() {
                continue;
            }

            let preferred = homing.then(|| self.toward_exit(direction));
            let length = self.pick_length(&lengths, preferred);
            let segment = [(direction, length)];
            if let Some(planned) = self.plan(&segment, false) {
                self.commit(&segment, planned);
                return true;
            }
        }

        false
    }

    fn pick_length(&mut self, lengths: &[u32], preferred: Option<u32>) -> u32 {
        if let Some(preferred) = preferred.filter(|length| lengths.contains(length)) {
            return preferred;
        }

        let mut length = lengths[self.rng.gen_range(0..lengths.len())];
        if let Some(previous) = self.runs.last().copied() {
            if length.abs_diff(previous) < 2 {
                let distinct: Vec<u32> = lengths
                    .iter()
                    .copied()
                    .filter(|candidate| candidate.abs_diff(previous) >= 2)
                    .collect();
                if !distinct.is_empty() {
                    length = distinct[self.rng.gen_range(0..distinct.len())];
                }
            }
        }
        length
    }

    fn try_pattern(&mut self, target: u32) -> bool {
        let (Some(heading), Some(forward)) = (self.heading, self.main_direction()) else {
            return false;
        };

        let segments = if self.rng.gen_bool(0.5) {
            self.staircase(heading, forward)
        } else {
            self.detour(heading, forward)
        };
        let Some(segments) = segments else {
            return false;
        };
        if self.turns + segments.len() as u32 + 2 > target {
            return false;
        }

        match self.plan(&segments, false) {
            Some(planned) => {
                self.commit(&segments, planned);
                true
            }
            None => false,
        }
    }

    /// Two to four alternating steps toward the exit.
    fn staircase(&mut self, heading: Direction, forward: Direction) -> Option<Vec<Segment>> {
        let side = self.side_direction(forward);
        let steps = self.rng.gen_range(2..=4_u32);
        let low = self.config.min_segment.max(4);
        let order = if heading.axis() == forward.axis() {
            [side, forward]
        } else {
            [forward, side]
        };

        let segments: Vec<Segment> = (0..steps * 2)
            .map(|index| (order[index as usize % 2], self.rng.gen_range(low..=low + 1)))
            .collect();

        let advance: u32 = segments
            .iter()
            .filter(|(direction, _)| *direction == forward)
            .map(|(_, length)| *length)
            .sum();
        (advance < self.toward_exit(forward)).then_some(segments)
    }

    /// A wide rectangular excursion: out, forward, back.
    fn detour(&mut self, heading: Direction, forward: Direction) -> Option<Vec<Segment>> {
        if heading != forward {
            return None;
        }

        let min_segment = self.config.min_segment.max(1);
        let side = if self.rng.gen_bool(0.5) {
            Direction::ALL[(heading as usize + 1) % 4]
        } else {
            Direction::ALL[(heading as usize + 3) % 4]
        };
        let reach = self.rng.gen_range(min_segment.max(4)..=min_segment.max(8));
        let along = self.rng.gen_range(min_segment..=min_segment + 3);
        if along >= self.toward_exit(forward) {
            return None;
        }

        Some(vec![(side, reach), (forward, along), (side.opposite(), reach)])
    }

    fn try_close(&mut self, min_turns: u32, max_turns: u32) -> bool {
        let cursor = self.cursor();
        let horizontal = match cursor.column().cmp(&self.exit.column()) {
            std::cmp::Ordering::Less => Some((Direction::East, self.exit.column() - cursor.column())),
            std::cmp::Ordering::Greater => {
                Some((Direction::West, cursor.column() - self.exit.column()))
            }
            std::cmp::Ordering::Equal => None,
        };
        let vertical = match cursor.row().cmp(&self.exit.row()) {
            std::cmp::Ordering::Less => Some((Direction::South, self.exit.row() - cursor.row())),
            std::cmp::Ordering::Greater => Some((Direction::North, cursor.row() - self.exit.row())),
            std::cmp::Ordering::Equal => None,
        };

        let options: Vec<Vec<Segment>> = match (horizontal, vertical) {
            (Some(h), Some(v)) => {
                if self.rng.gen_bool(0.5) {
                    vec![vec![h, v], vec![v, h]]
                } else {
                    vec![vec![v, h], vec![h, v]]
                }
            }
            (Some(h), None) => vec![vec![h]],
            (None, Some(v)) => vec![vec![v]],
            (None, None) => return false,
        };

        for segments in options {
            let (turns, short) = self.outcome(&segments);
            if turns < min_turns || turns > max_turns || short > 1 {
                continue;
            }
            if let Some(planned) = self.plan(&segments, true) {
                self.commit(&segments, planned);
                return true;
            }
        }

        false
    }

    /// Turn count and number of short runs the route would have after
    /// appending `segments`.
    fn outcome(&self, segments: &[Segment]) -> (u32, usize) {
        let mut runs = self.runs.clone();
        let mut heading = self.heading;
        let mut turns = self.turns;
        for &(direction, length) in segments {
            extend_runs(&mut runs, &mut heading, &mut turns, direction, length);
        }
        let short = runs
            .iter()
            .filter(|run| **run < self.config.min_segment)
            .count();
        (turns, short)
    }

    /// Walks `segments` from the cursor without mutating state, returning the
    /// cells and their resolved uses when every cell is legal.
    fn plan(&self, segments: &[Segment], ends_at_exit: bool) -> Option<Vec<(CellCoord, CellUse)>> {
        let mut cursor = self.cursor();
        let mut previous = self.heading;
        let mut trial: HashMap<CellCoord, CellUse> = HashMap::new();
        let mut planned = Vec::new();

        for (index, &(direction, length)) in segments.iter().enumerate() {
            if length == 0 {
                return None;
            }
            if let Some(previous) = previous {
                if direction == previous.opposite() || (index > 0 && direction == previous) {
                    return None;
                }
            }
            let last_segment = index + 1 == segments.len();

            for step in 1..=length {
                cursor = cursor.step(direction)?;
                if !self.bounds.contains(cursor) || cursor == self.entry {
                    return None;
                }
                let final_cell = last_segment && step == length;
                if (cursor == self.exit) != (ends_at_exit && final_cell) {
                    return None;
                }

                let wanted = if step == length {
                    CellUse::Corner
                } else {
                    CellUse::Straight(direction.axis())
                };
                let existing = trial
                    .get(&cursor)
                    .or_else(|| self.uses.get(&cursor))
                    .copied();
                let resolved = match (existing, wanted) {
                    (None, wanted) => wanted,
                    (Some(CellUse::Straight(old)), CellUse::Straight(new)) if old != new => {
                        CellUse::Crossed
                    }
                    _ => return None,
                };
                let _ = trial.insert(cursor, resolved);
                planned.push((cursor, resolved));
            }
            previous = Some(direction);
        }

        Some(planned)
    }

    fn commit(&mut self, segments: &[Segment], planned: Vec<(CellCoord, CellUse)>) {
        for &(direction, length) in segments {
            extend_runs(
                &mut self.runs,
                &mut self.heading,
                &mut self.turns,
                direction,
                length,
            );
        }
        for (cell, usage) in planned {
            self.route.push(cell);
            let _ = self.uses.insert(cell, usage);
        }
    }
}

fn extend_runs(
    runs: &mut Vec<u32>,
    heading: &mut Option<Direction>,
    turns: &mut u32,
    direction: Direction,
    length: u32,
) {
    if *heading == Some(direction) {
        if let Some(run) = runs.last_mut() {
            *run += length;
        }
    } else {
        if heading.is_some() {
            *turns += 1;
        }
        runs.push(length);
    }
    *heading = Some(direction);
}
