//! Enemy state and route following.

use std::{sync::Arc, time::Duration};

use glam::Vec2;
use grid_defence_core::{CellCoord, EnemyId, EnemyKind, EnemySnapshot};

/// Result of moving an enemy for one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Movement {
    Moving,
    Arrived,
}

#[derive(Clone, Debug)]
pub(crate) struct Enemy {
    pub(crate) kind: EnemyKind,
    pub(crate) hp: f32,
    pub(crate) max_hp: f32,
    pub(crate) position: Vec2,
    /// Multiplier set by slowing towers; reset after every movement step.
    pub(crate) speed_multiplier: f32,
    /// Summed ward reduction from nearby guardians.
    pub(crate) ward: f32,
    /// Multiplier on incoming damage derived from `ward`.
    pub(crate) damage_taken: f32,
    pub(crate) rerouted: bool,
    route: Arc<Vec<CellCoord>>,
    route_index: usize,
    fraction: f32,
    progress_offset: f32,
}

impl Enemy {
    pub(crate) fn spawn(kind: EnemyKind, hp_scale: f32, route: Arc<Vec<CellCoord>>, rerouted: bool) -> Self {
        let max_hp = kind.stats().hp * hp_scale.max(0.0);
        let position = route.first().map_or(Vec2::ZERO, |cell| cell.center());
        Self {
            kind,
            hp: max_hp,
            max_hp,
            position,
            speed_multiplier: 1.0,
            ward: 0.0,
            damage_taken: 1.0,
            rerouted,
            route,
            route_index: 0,
            fraction: 0.0,
            progress_offset: 0.0,
        }
    }

    /// Distance travelled along the route: index plus fractional progress,
    /// carried across reroutes so it never decreases.
    pub(crate) fn progress(&self) -> f32 {
        self.progress_offset + self.route_index as f32 + self.fraction
    }

    /// Cell a recomputed route should start from: the cell the enemy is
    /// walking into when it may still enter it, otherwise the cell it left.
    pub(crate) fn reroute_origin(
        &self,
        passable: impl Fn(CellCoord) -> bool,
    ) -> Option<CellCoord> {
        let from = self.route.get(self.route_index).copied();
        match self.route.get(self.route_index + 1) {
            Some(to) if self.fraction > 0.0 && passable(*to) => Some(*to),
            _ => from,
        }
    }

    /// Cells the enemy has not reached yet.
    pub(crate) fn upcoming(&self) -> &[CellCoord] {
        self.route.get(self.route_index + 1..).unwrap_or(&[])
    }

    /// Splices `route` onto the segment the enemy is currently walking.
    ///
    /// The enemy keeps its position and its progress. When `route` passes
    /// through neither end of the current segment the enemy has moved on since
    /// the route was requested; nothing changes and `false` is returned.
    pub(crate) fn assign_route(&mut self, route: &[CellCoord]) -> bool {
        let Some(from) = self.route.get(self.route_index).copied() else {
            return false;
        };
        let to = self.route.get(self.route_index + 1).copied();
        let find = |cell: CellCoord| route.iter().position(|step| *step == cell);

        let (spliced, fraction): (Vec<CellCoord>, f32) = match to {
            Some(to) if self.fraction > 0.0 => {
                if let Some(index) = find(to) {
                    let cells = std::iter::once(from).chain(route[index..].iter().copied());
                    (cells.collect(), self.fraction)
                } else if let Some(index) = find(from) {
                    let cells = std::iter::once(to).chain(route[index..].iter().copied());
                    (cells.collect(), 1.0 - self.fraction)
                } else {
                    return false;
                }
            }
            _ => match find(from) {
                Some(index) => (route[index..].to_vec(), 0.0),
                None => return false,
            },
        };

        self.progress_offset = self.progress() - fraction;
        self.route = Arc::new(spliced);
        self.route_index = 0;
        self.fraction = fraction;
        self.rerouted = true;
        true
    }

    /// Walks along the route. The enemy waits in place rather than step
    /// towards a cell `passable` rejects.
    pub(crate) fn advance(
        &mut self,
        dt: Duration,
        passable: impl Fn(CellCoord) -> bool,
    ) -> Movement {
        let mut budget = self.kind.stats().speed * self.speed_multiplier.max(0.0) * dt.as_secs_f32();

        loop {
            let (Some(from), Some(to)) = (
                self.route.get(self.route_index),
                self.route.get(self.route_index + 1),
            ) else {
                return Movement::Arrived;
            };
            if !passable(*to) {
                return Movement::Moving;
            }
            let (from, to) = (from.center(), to.center());
            let length = from.distance(to).max(f32::EPSILON);
            let remaining = (1.0 - self.fraction) * length;

            if budget < remaining {
                self.fraction += budget / length;
                self.position = from.lerp(to, self.fraction);
                return Movement::Moving;
            }

            budget -= remaining;
            self.route_index += 1;
            self.fraction = 0.0;
            self.position = to;
            if self.route_index + 1 >= self.route.len() {
                return Movement::Arrived;
            }
        }
    }

    pub(crate) fn snapshot(&self, id: EnemyId) -> EnemySnapshot {
        EnemySnapshot {
            id,
            kind: self.kind,
            hp: self.hp,
            max_hp: self.max_hp,
            position: self.position,
            progress: self.progress(),
        }
    }
}
