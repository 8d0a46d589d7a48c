//! Projectile flight, impact resolution, and enemy death handling.

use std::time::Duration;

use glam::Vec2;
use grid_defence_core::{
    damage_taken_multiplier, AuraEffect, AuraTotals, ChainSpec, EnemyId, Event, ProjectileId,
    Shot, TowerId, CHAIN_DAMAGE_FALLOFF, CHAIN_HOP_DELAY, MAX_QUERY_RADIUS,
    SPLASH_DAMAGE_FRACTION,
};
use tracing::debug;

use crate::World;

/// Most enemies a single chain may strike, primary included.
pub(crate) const MAX_CHAIN_HITS: usize = 8;

/// Extra query radius covering enemy movement since the last index rebuild.
const INDEX_MARGIN: f32 = 0.5;

#[derive(Clone, Copy, Debug)]
pub(crate) struct ChainState {
    remaining: u32,
    radius: f32,
    hit: [Option<EnemyId>; MAX_CHAIN_HITS],
    hits: usize,
}

impl ChainState {
    fn new(spec: ChainSpec) -> Self {
        Self {
            remaining: spec.jumps.min(MAX_CHAIN_HITS as u32 - 1),
            radius: spec.radius,
            hit: [None; MAX_CHAIN_HITS],
            hits: 0,
        }
    }

    fn record(&mut self, enemy: EnemyId) {
        if self.hits < MAX_CHAIN_HITS {
            self.hit[self.hits] = Some(enemy);
            self.hits += 1;
        }
    }

    fn was_hit(&self, enemy: EnemyId) -> bool {
        self.hit[..self.hits].contains(&Some(enemy))
    }
}

/// Pooled projectile. Targets are held by handle and checked for liveness at
/// every use.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Projectile {
    pub(crate) tower: TowerId,
    pub(crate) target: EnemyId,
    pub(crate) position: Vec2,
    destination: Vec2,
    speed: f32,
    damage: f32,
    splash_radius: Option<f32>,
    chain: Option<ChainState>,
    /// Remaining display time while the projectile is a chain hop.
    pub(crate) hop: Option<Duration>,
}

impl World {
    /// Launches projectiles from a tower. Shots aimed at dead enemies are
    /// skipped.
    pub(crate) fn fire(
        &mut self,
        tower: TowerId,
        shots: Vec<Shot>,
        interval: Duration,
        out: &mut Vec<Event>,
    ) {
        let Some(state) = self.towers.get_mut(tower) else {
            return;
        };
        state.ready_in = interval;
        let origin = state.cell.center();

        for shot in shots {
            let Some(target) = self.enemies.get(shot.target) else {
                continue;
            };
            let projectile = Projectile {
                tower,
                target: shot.target,
                position: origin,
                destination: target.position,
                speed: shot.speed.max(f32::EPSILON),
                damage: shot.damage,
                splash_radius: shot.splash_radius,
                chain: shot.chain.map(ChainState::new),
                hop: None,
            };
            let projectile_id = self.projectiles.insert(projectile);
            out.push(Event::ProjectileFired {
                projectile: projectile_id,
                tower,
                target: shot.target,
            });
        }
    }

    pub(crate) fn advance_projectiles(&mut self, dt: Duration, out: &mut Vec<Event>) {
        let mut ids = std::mem::take(&mut self.scratch_projectiles);
        ids.clear();
        self.projectiles.collect_ids(&mut ids);
        for id in ids.iter().copied() {
            self.advance_projectile(id, dt, out);
        }
        self.scratch_projectiles = ids;
    }

    fn advance_projectile(&mut self, id: ProjectileId, dt: Duration, out: &mut Vec<Event>) {
        let Some(projectile) = self.projectiles.get_mut(id) else {
            return;
        };

        if let Some(hop) = projectile.hop {
            let left = hop.saturating_sub(dt);
            if !left.is_zero() {
                projectile.hop = Some(left);
                return;
            }
            projectile.hop = None;
        } else if self.enemies.contains(projectile.target) {
            let step = projectile.speed * dt.as_secs_f32();
            let offset = projectile.destination - projectile.position;
            let distance = offset.length();
            if distance > step {
                projectile.position += offset / distance * step;
                return;
            }
            projectile.position = projectile.destination;
        }

        self.resolve_impact(id, out);
    }

    /// Applies direct, splash, and chain effects, then either turns the
    /// projectile into the next chain hop or releases it to the pool.
    fn resolve_impact(&mut self, id: ProjectileId, out: &mut Vec<Event>) {
        let Some(projectile) = self.projectiles.get(id).copied() else {
            return;
        };
        let impact = projectile.position;
        let struck_at = self.enemies.get(projectile.target).map(|enemy| enemy.position);

        self.damage_enemy(projectile.target, projectile.damage, Some(projectile.tower), out);

        if let Some(radius) = projectile.splash_radius {
            self.splash(
                impact,
                radius,
                projectile.damage * SPLASH_DAMAGE_FRACTION,
                projectile.target,
                projectile.tower,
                out,
            );
        }

        if let (Some(mut chain), Some(origin)) = (projectile.chain, struck_at) {
            chain.record(projectile.target);
            if chain.remaining > 0 {
                if let Some((next, position)) = self.nearest_unhit(origin, &chain) {
                    chain.remaining -= 1;
                    let damage = projectile.damage * CHAIN_DAMAGE_FALLOFF;
                    if let Some(hop) = self.projectiles.get_mut(id) {
                        hop.target = next;
                        hop.position = position;
                        hop.destination = position;
                        hop.damage = damage;
                        hop.splash_radius = None;
                        hop.chain = Some(chain);
                        hop.hop = Some(CHAIN_HOP_DELAY);
                    }
                    out.push(Event::ChainHopped {
                        target: next,
                        damage,
                    });
                    return;
                }
            }
        }

        let _ = self.projectiles.remove(id);
    }

    fn nearest_unhit(&mut self, origin: Vec2, chain: &ChainState) -> Option<(EnemyId, Vec2)> {
        let mut nearby = std::mem::take(&mut self.scratch_hits);
        self.enemies_near(origin, chain.radius, &mut nearby);

        let nearest = nearby
            .iter()
            .copied()
            .filter(|(enemy, _)| !chain.was_hit(*enemy))
            .min_by(|left, right| {
                left.1
                    .distance_squared(origin)
                    .total_cmp(&right.1.distance_squared(origin))
                    .then(left.0.cmp(&right.0))
            });

        self.scratch_hits = nearby;
        nearest
    }

    /// Live enemies within `radius` of `center`, with their current positions.
    ///
    /// The enemy index is rebuilt once per tick, so it is queried with a
    /// margin covering one tick of movement and filtered against live state.
    fn enemies_near(&self, center: Vec2, radius: f32, out: &mut Vec<(EnemyId, Vec2)>) {
        out.clear();
        self.enemy_index
            .query_within(center, radius + INDEX_MARGIN, out);
        let radius_squared = radius * radius;
        out.retain_mut(|(id, position)| match self.enemies.get(*id) {
            Some(enemy) if enemy.position.distance_squared(center) <= radius_squared => {
                *position = enemy.position;
                true
            }
            _ => false,
        });
    }

    fn splash(
        &mut self,
        impact: Vec2,
        radius: f32,
        amount: f32,
        exclude: EnemyId,
        tower: TowerId,
        out: &mut Vec<Event>,
    ) {
        let mut nearby = std::mem::take(&mut self.scratch_hits);
        self.enemies_near(impact, radius, &mut nearby);
        for (enemy, _) in nearby.iter().copied() {
            if enemy != exclude {
                self.damage_enemy(enemy, amount, Some(tower), out);
            }
        }
        self.scratch_hits = nearby;
    }

    /// Deals nominal damage scaled by the enemy's ward multiplier. Dead enemies
    /// are removed immediately.
    pub(crate) fn damage_enemy(
        &mut self,
        id: EnemyId,
        nominal: f32,
        tower: Option<TowerId>,
        out: &mut Vec<Event>,
    ) {
        let Some(enemy) = self.enemies.get_mut(id) else {
            return;
        };
        let amount = nominal * enemy.damage_taken;
        enemy.hp -= amount;
        out.push(Event::EnemyDamaged { enemy: id, amount });

        if enemy.hp <= 0.0 {
            self.kill(id, tower, out);
        }
    }

    fn kill(&mut self, id: EnemyId, tower: Option<TowerId>, out: &mut Vec<Event>) {
        let Some(enemy) = self.enemies.remove(id) else {
            return;
        };
        let base = enemy.kind.stats().reward;
        let reward = (base as f32 * self.gold_multiplier_at(enemy.position)).floor() as u32;
        self.gold = self.gold.saturating_add(reward);
        self.score = self.score.saturating_add(u64::from(base));

        let credited = tower.and_then(|tower| self.towers.get_mut(tower));
        let credited = credited.map(|state| {
            state.kills += 1;
            state.id
        });

        debug!(?id, kind = ?enemy.kind, reward, "enemy killed");
        out.push(Event::EnemyKilled {
            enemy: id,
            kind: enemy.kind,
            tower: credited,
            reward,
        });
    }

    /// Aggregate gold multiplier from every gold aura covering `position`.
    pub(crate) fn gold_multiplier_at(&mut self, position: Vec2) -> f32 {
        let mut nearby = std::mem::take(&mut self.scratch_towers);
        nearby.clear();
        self.tower_index
            .query_within(position, MAX_QUERY_RADIUS, &mut nearby);

        let mut totals = AuraTotals::default();
        for (tower, tower_position) in nearby.iter().copied() {
            let Some(state) = self.towers.get(tower) else {
                continue;
            };
            let stats = state.kind.stats_at(state.level);
            if let Some(effect @ AuraEffect::GoldYield(_)) = stats.aura {
                if tower_position.distance_squared(position) <= stats.range * stats.range {
                    totals.add(effect);
                }
            }
        }
        self.scratch_towers = nearby;
        totals.gold_multiplier()
    }

    /// Recomputes each enemy's incoming-damage multiplier from nearby wards.
    pub(crate) fn refresh_wards(&mut self) {
        let mut guardians = std::mem::take(&mut self.scratch_hits);
        guardians.clear();
        for (id, enemy) in self.enemies.iter_mut() {
            enemy.ward = 0.0;
            if enemy.kind.stats().ward.is_some() {
                guardians.push((id, enemy.position));
            }
        }

        let mut nearby = std::mem::take(&mut self.scratch_warded);
        for (guardian, position) in guardians.iter().copied() {
            let Some(ward) = self
                .enemies
                .get(guardian)
                .and_then(|enemy| enemy.kind.stats().ward)
            else {
                continue;
            };
            self.enemies_near(position, ward.radius, &mut nearby);
            for (other, _) in nearby.iter().copied() {
                if other == guardian {
                    continue;
                }
                if let Some(enemy) = self.enemies.get_mut(other) {
                    enemy.ward += ward.reduction;
                }
            }
        }

        for (_, enemy) in self.enemies.iter_mut() {
            enemy.damage_taken = damage_taken_multiplier(enemy.ward);
        }
        self.scratch_hits = guardians;
        self.scratch_warded = nearby;
    }
}
