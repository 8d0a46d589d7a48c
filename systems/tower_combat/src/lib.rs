#![deny(unsafe_code, missing_docs, non_snake_case)]
#![warn(dead_code, unused_results, unreachable_pub)]

//! Pure system that turns tower engagements into world commands.

use std::time::Duration;

use grid_defence_core::{Command, EffectiveStats, EnemyId, FiringMode, Shot, TowerEngagement};

/// Tower combat system that queues firing commands for ready towers.
#[derive(Debug, Default)]
pub struct TowerCombat {
    scratch: Vec<Command>,
}

impl TowerCombat {
    /// Creates a new tower combat system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits the commands each tower's firing mode calls for this tick.
    ///
    /// Periodic modes fire only when the tower's cooldown has elapsed.
    /// Continuous beams and slows act on every tick.
    pub fn handle(&mut self, engagements: &[TowerEngagement], dt: Duration, out: &mut Vec<Command>) {
        self.scratch.clear();

        for engagement in engagements {
            let Some(&primary) = engagement.targets.first() else {
                continue;
            };
            let stats = &engagement.stats;

            match stats.mode {
                FiringMode::Continuous => self.scratch.push(Command::ApplyBeam {
                    tower: engagement.tower,
                    enemy: primary,
                    amount: stats.damage * dt.as_secs_f32(),
                }),
                FiringMode::Slow => {
                    let multiplier = stats.slow_multiplier.unwrap_or(1.0);
                    self.scratch
                        .extend(engagement.targets.iter().map(|&enemy| Command::SlowEnemy {
                            enemy,
                            multiplier,
                        }));
                }
                FiringMode::Single | FiringMode::Chain => {
                    self.fire(engagement, &engagement.targets[..1]);
                }
                FiringMode::Multi { count } => {
                    let volley = engagement.targets.len().min(usize::from(count));
                    self.fire(engagement, &engagement.targets[..volley]);
                }
                FiringMode::Broadcast => self.fire(engagement, &engagement.targets),
                FiringMode::Support | FiringMode::Blocking => {}
            }
        }

        if self.scratch.is_empty() {
            return;
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }

    fn fire(&mut self, engagement: &TowerEngagement, targets: &[EnemyId]) {
        if !engagement.ready_in.is_zero() || targets.is_empty() {
            return;
        }

        let stats = &engagement.stats;
        self.scratch.push(Command::FireProjectiles {
            tower: engagement.tower,
            shots: targets.iter().map(|&target| shot(stats, target)).collect(),
            interval: Duration::from_secs_f32(stats.interval.max(0.0)),
        });
    }
}

fn shot(stats: &EffectiveStats, target: EnemyId) -> Shot {
    Shot {
        target,
        damage: stats.damage,
        speed: stats.projectile_speed,
        splash_radius: stats.splash_radius,
        chain: stats.chain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_defence_core::{AuraTotals, ChainSpec, TowerId, TowerKind};

    fn engagement(kind: TowerKind, ready_in: Duration, targets: &[u32]) -> TowerEngagement {
        TowerEngagement {
            tower: TowerId::new(1),
            ready_in,
            stats: AuraTotals::default().apply(&kind.stats_at(1)),
            targets: targets.iter().map(|&index| EnemyId::new(index, 0)).collect(),
        }
    }

    fn run(engagements: &[TowerEngagement]) -> Vec<Command> {
        let mut out = Vec::new();
        TowerCombat::new().handle(engagements, Duration::from_millis(100), &mut out);
        out
    }

    fn shot_targets(command: &Command) -> Vec<u32> {
        match command {
            Command::FireProjectiles { shots, .. } => {
                shots.iter().map(|shot| shot.target.index()).collect()
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn single_target_fires_at_the_first_target_once_ready() {
        let out = run(&[engagement(TowerKind::Arrow, Duration::ZERO, &[4, 2])]);

        assert_eq!(out.len(), 1);
        assert_eq!(shot_targets(&out[0]), vec![4]);
        let Command::FireProjectiles { interval, .. } = &out[0] else {
            unreachable!();
        };
        assert_eq!(*interval, Duration::from_secs_f32(0.8));
    }

    #[test]
    fn cooling_towers_hold_fire() {
        let out = run(&[engagement(
            TowerKind::Arrow,
            Duration::from_millis(250),
            &[4],
        )]);

        assert!(out.is_empty());
    }

    #[test]
    fn multishot_covers_up_to_its_count() {
        let out = run(&[
            engagement(TowerKind::Multishot, Duration::ZERO, &[1, 2, 3, 4, 5]),
            engagement(TowerKind::Multishot, Duration::ZERO, &[7, 8]),
        ]);

        assert_eq!(shot_targets(&out[0]), vec![1, 2, 3]);
        assert_eq!(shot_targets(&out[1]), vec![7, 8]);
    }

    #[test]
    fn broadcast_fires_at_every_target() {
        let out = run(&[engagement(TowerKind::Nova, Duration::ZERO, &[1, 2, 3, 4, 5])]);
        assert_eq!(shot_targets(&out[0]), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn chain_shots_carry_chain_parameters() {
        let out = run(&[engagement(TowerKind::Tesla, Duration::ZERO, &[9, 3])]);
        let Command::FireProjectiles { shots, .. } = &out[0] else {
            panic!("expected a volley");
        };
        assert_eq!(shots.len(), 1);
        assert_eq!(
            shots[0].chain,
            Some(ChainSpec {
                jumps: 3,
                radius: 2.5
            })
        );
    }

    #[test]
    fn beams_scale_with_tick_length_and_ignore_cooldown() {
        let out = run(&[engagement(
            TowerKind::Laser,
            Duration::from_secs(5),
            &[6, 1],
        )]);

        assert_eq!(out.len(), 1);
        let Command::ApplyBeam { enemy, amount, .. } = out[0] else {
            panic!("expected a beam");
        };
        assert_eq!(enemy, EnemyId::new(6, 0));
        assert!((amount - 3.0).abs() < 1e-5);
    }

    #[test]
    fn slow_towers_touch_every_target() {
        let out = run(&[engagement(TowerKind::Frost, Duration::ZERO, &[1, 2])]);
        assert_eq!(
            out,
            vec![
                Command::SlowEnemy {
                    enemy: EnemyId::new(1, 0),
                    multiplier: 0.6,
                },
                Command::SlowEnemy {
                    enemy: EnemyId::new(2, 0),
                    multiplier: 0.6,
                },
            ]
        );
    }

    #[test]
    fn towers_without_targets_or_attacks_stay_silent() {
        let out = run(&[
            engagement(TowerKind::Arrow, Duration::ZERO, &[]),
            engagement(TowerKind::Amplifier, Duration::ZERO, &[1]),
            engagement(TowerKind::Barricade, Duration::ZERO, &[1]),
        ]);
        assert!(out.is_empty());
    }
}
