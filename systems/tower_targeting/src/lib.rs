#![deny(unsafe_code, missing_docs, non_snake_case)]
#![warn(dead_code, unused_results, unreachable_pub)]

//! Pure system that folds auras into tower stats and selects targets.
//!
//! Aura contributions are looked up through the tower index and summed before
//! clamping, so the result does not depend on the order towers are visited.
//! Targets are every enemy within effective range, furthest along the route
//! first, so towers prioritise imminent leaks over proximity.

use std::cmp::Ordering;

use glam::Vec2;
use grid_defence_core::{
    AuraEffect, AuraTotals, EnemyId, EnemyView, FiringMode, TowerEngagement, TowerId,
    TowerSnapshot, TowerView, MAX_QUERY_RADIUS,
};
use grid_defence_spatial_index::SpatialIndex;

/// Tower targeting system that reuses scratch buffers to avoid repeated allocations.
#[derive(Debug, Default)]
pub struct TowerTargeting {
    tower_workspace: Vec<(TowerId, Vec2)>,
    enemy_workspace: Vec<(EnemyId, Vec2)>,
    candidates: Vec<Candidate>,
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    enemy: EnemyId,
    progress: f32,
}

impl TowerTargeting {
    /// Creates a new tower targeting system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes one engagement per tower, in tower identifier order.
    ///
    /// The output buffer is cleared before populating it. Support and blocking
    /// towers receive an engagement with no targets so their folded stats stay
    /// observable.
    pub fn handle(
        &mut self,
        towers: &TowerView,
        enemies: &EnemyView,
        tower_index: &SpatialIndex<TowerId>,
        enemy_index: &SpatialIndex<EnemyId>,
        out: &mut Vec<TowerEngagement>,
    ) {
        out.clear();

        for tower in towers.iter() {
            let totals = self.aura_totals(tower, towers, tower_index);
            let stats = totals.apply(&tower.stats());
            let mut targets = Vec::new();

            if targets_enemies(stats.mode) && stats.range > 0.0 && !enemies.is_empty() {
                self.select_targets(tower.position(), stats.range, enemies, enemy_index);
                targets.extend(self.candidates.iter().map(|candidate| candidate.enemy));
            }

            out.push(TowerEngagement {
                tower: tower.id,
                ready_in: tower.ready_in,
                stats,
                targets,
            });
        }
    }

    /// Sums every tower aura covering `tower`. A tower never buffs itself.
    fn aura_totals(
        &mut self,
        tower: &TowerSnapshot,
        towers: &TowerView,
        tower_index: &SpatialIndex<TowerId>,
    ) -> AuraTotals {
        let position = tower.position();
        self.tower_workspace.clear();
        tower_index.query_within(position, MAX_QUERY_RADIUS, &mut self.tower_workspace);

        let mut totals = AuraTotals::default();
        for (neighbor, neighbor_position) in self.tower_workspace.iter().copied() {
            if neighbor == tower.id {
                continue;
            }
            let Some(source) = towers.get(neighbor) else {
                continue;
            };
            let source_stats = source.stats();
            let Some(effect) = source_stats.aura else {
                continue;
            };
            if matches!(effect, AuraEffect::GoldYield(_)) {
                continue;
            }
            let reach = source_stats.range;
            if neighbor_position.distance_squared(position) <= reach * reach {
                totals.add(effect);
            }
        }
        totals
    }

    fn select_targets(
        &mut self,
        position: Vec2,
        range: f32,
        enemies: &EnemyView,
        enemy_index: &SpatialIndex<EnemyId>,
    ) {
        self.enemy_workspace.clear();
        self.candidates.clear();
        enemy_index.query_within(position, range, &mut self.enemy_workspace);

        let range_squared = range * range;
        for (enemy, _) in self.enemy_workspace.iter().copied() {
            let Some(snapshot) = enemies.get(enemy) else {
                continue;
            };
            if snapshot.position.distance_squared(position) > range_squared {
                continue;
            }
            self.candidates.push(Candidate {
                enemy,
                progress: snapshot.progress,
            });
        }

        self.candidates.sort_by(precedence);
    }
}

fn targets_enemies(mode: FiringMode) -> bool {
    !matches!(mode, FiringMode::Support | FiringMode::Blocking)
}

/// Furthest progress first; equal progress falls back to the older handle.
fn precedence(left: &Candidate, right: &Candidate) -> Ordering {
    right
        .progress
        .total_cmp(&left.progress)
        .then(left.enemy.cmp(&right.enemy))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use grid_defence_core::{CellCoord, EnemyKind, EnemySnapshot, TowerKind};
    use grid_defence_spatial_index::DEFAULT_BUCKET_SIZE;

    fn tower(id: u32, kind: TowerKind, cell: (u32, u32)) -> TowerSnapshot {
        TowerSnapshot {
            id: TowerId::new(id),
            kind,
            cell: CellCoord::new(cell.0, cell.1),
            level: 1,
            kills: 0,
            invested: kind.build_cost(),
            ready_in: Duration::ZERO,
        }
    }

    fn enemy(index: u32, position: (f32, f32), progress: f32) -> EnemySnapshot {
        EnemySnapshot {
            id: EnemyId::new(index, 0),
            kind: EnemyKind::Grunt,
            hp: 110.0,
            max_hp: 110.0,
            position: Vec2::new(position.0, position.1),
            progress,
        }
    }

    struct Fixture {
        towers: TowerView,
        enemies: EnemyView,
        tower_index: SpatialIndex<TowerId>,
        enemy_index: SpatialIndex<EnemyId>,
    }

    impl Fixture {
        fn new(towers: Vec<TowerSnapshot>, enemies: Vec<EnemySnapshot>) -> Self {
            let mut tower_index = SpatialIndex::new(32.0, 32.0, DEFAULT_BUCKET_SIZE);
            for snapshot in &towers {
                tower_index.insert(snapshot.id, snapshot.position());
            }
            let mut enemy_index = SpatialIndex::new(32.0, 32.0, DEFAULT_BUCKET_SIZE);
            for snapshot in &enemies {
                enemy_index.insert(snapshot.id, snapshot.position);
            }
            Self {
                towers: TowerView::from_snapshots(towers),
                enemies: EnemyView::from_snapshots(enemies),
                tower_index,
                enemy_index,
            }
        }

        fn run(&self) -> Vec<TowerEngagement> {
            let mut out = Vec::new();
            TowerTargeting::new().handle(
                &self.towers,
                &self.enemies,
                &self.tower_index,
                &self.enemy_index,
                &mut out,
            );
            out
        }
    }

    #[test]
    fn furthest_progressed_enemy_in_range_comes_first() {
        let fixture = Fixture::new(
            vec![tower(0, TowerKind::Arrow, (5, 5))],
            vec![
                enemy(0, (6.5, 5.5), 3.0),
                enemy(1, (4.5, 6.5), 7.5),
                enemy(2, (20.5, 20.5), 40.0),
            ],
        );

        let engagements = fixture.run();
        assert_eq!(engagements.len(), 1);
        assert_eq!(
            engagements[0].targets,
            vec![EnemyId::new(1, 0), EnemyId::new(0, 0)]
        );
    }

    #[test]
    fn range_uses_squared_distance_inclusively() {
        let fixture = Fixture::new(
            vec![tower(0, TowerKind::Arrow, (5, 5))],
            vec![enemy(0, (9.0, 5.5), 1.0), enemy(1, (9.1, 5.5), 2.0)],
        );

        assert_eq!(fixture.run()[0].targets, vec![EnemyId::new(0, 0)]);
    }

    #[test]
    fn equal_progress_prefers_older_handle() {
        let fixture = Fixture::new(
            vec![tower(0, TowerKind::Arrow, (5, 5))],
            vec![enemy(3, (6.5, 5.5), 2.0), enemy(1, (4.5, 5.5), 2.0)],
        );

        assert_eq!(
            fixture.run()[0].targets,
            vec![EnemyId::new(1, 0), EnemyId::new(3, 0)]
        );
    }

    #[test]
    fn auras_stack_from_neighbours_but_not_self() {
        let fixture = Fixture::new(
            vec![
                tower(0, TowerKind::Arrow, (5, 5)),
                tower(1, TowerKind::Amplifier, (6, 5)),
                tower(2, TowerKind::Amplifier, (4, 5)),
                tower(3, TowerKind::Beacon, (5, 6)),
            ],
            Vec::new(),
        );

        let engagements = fixture.run();
        let arrow = &engagements[0];
        assert!((arrow.stats.damage - 15.0).abs() < 1e-4);
        assert!((arrow.stats.range - 4.25).abs() < 1e-4);

        let amplifier = &engagements[1];
        assert!(amplifier.targets.is_empty());
        assert!((amplifier.stats.range - 3.25).abs() < 1e-4, "beacon reaches amplifier");
    }

    #[test]
    fn aura_order_does_not_matter() {
        let forward = Fixture::new(
            vec![
                tower(0, TowerKind::Tesla, (5, 5)),
                tower(1, TowerKind::Overclock, (6, 5)),
                tower(2, TowerKind::Conductor, (4, 5)),
            ],
            Vec::new(),
        );
        let reversed = Fixture::new(
            vec![
                tower(0, TowerKind::Tesla, (5, 5)),
                tower(1, TowerKind::Conductor, (4, 5)),
                tower(2, TowerKind::Overclock, (6, 5)),
            ],
            Vec::new(),
        );

        let left = forward.run()[0].stats;
        let right = reversed.run()[0].stats;
        assert_eq!(left, right);
        assert_eq!(left.chain.map(|chain| chain.jumps), Some(4));
        assert!((left.interval - 1.5 * 0.85).abs() < 1e-4);
    }

    #[test]
    fn support_towers_never_target() {
        let fixture = Fixture::new(
            vec![tower(0, TowerKind::Treasury, (5, 5))],
            vec![enemy(0, (5.5, 5.5), 1.0)],
        );

        assert!(fixture.run()[0].targets.is_empty());
    }
}
