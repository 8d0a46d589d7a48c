#![deny(unsafe_code, missing_docs, non_snake_case)]
#![warn(dead_code, unused_results, unreachable_pub)]

//! Authoritative world state management for Grid Defence.
//!
//! The world owns the grid, the towers, the live enemies and the pooled
//! projectiles. It changes only through [`apply`]; systems observe it through
//! the read-only functions in [`query`].

use std::{sync::Arc, time::Duration};

use glam::Vec2;
use grid_defence_core::{
    CellCoord, CellKind, Command, EnemyId, Event, ProjectileId, RejectionReason,
    RouteSubject, ScheduledSpawn, SessionStatus, TowerId, TowerKind, WavePlan, MIN_TOWER_LEVEL,
};
use grid_defence_spatial_index::{SpatialIndex, DEFAULT_BUCKET_SIZE};
use tracing::{debug, info};

mod combat;
mod enemies;
mod grid;
mod pool;
mod towers;
mod waves;

pub use grid::{derive_cells, GridModel, BUILDABLE_RADIUS, MAX_GRID_SIDE};

use combat::Projectile;
use enemies::{Enemy, Movement};
use pool::Pool;
use towers::TowerRegistry;
use waves::{WaveState, WAVE_SCORE_PER_WAVE};

/// Gold and lives a session starts with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Economy {
    /// Gold available for building and upgrading.
    pub gold: u32,
    /// Lives left before the session ends.
    pub lives: u32,
}

impl Default for Economy {
    fn default() -> Self {
        Self {
            gold: 250,
            lives: 20,
        }
    }
}

/// Persistent description of a tower, free of transient combat state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TowerRecord {
    /// Kind of tower.
    pub kind: TowerKind,
    /// Cell the tower occupies.
    pub cell: CellCoord,
    /// Current level.
    pub level: u8,
    /// Enemies finished off by the tower.
    pub kills: u32,
    /// Gold spent on construction and upgrades.
    pub invested: u32,
}

/// Represents the authoritative Grid Defence world state.
#[derive(Debug)]
pub struct World {
    grid: GridModel,
    route: Arc<Vec<CellCoord>>,
    spawn_route: Arc<Vec<CellCoord>>,
    spawn_rerouted: bool,
    towers: TowerRegistry,
    enemies: Pool<Enemy, EnemyId>,
    projectiles: Pool<Projectile, ProjectileId>,
    tower_index: SpatialIndex<TowerId>,
    enemy_index: SpatialIndex<EnemyId>,
    waves: WaveState,
    gold: u32,
    lives: u32,
    score: u64,
    status: SessionStatus,
    elapsed: Duration,
    scratch_enemies: Vec<EnemyId>,
    scratch_projectiles: Vec<ProjectileId>,
    scratch_hits: Vec<(EnemyId, Vec2)>,
    scratch_warded: Vec<(EnemyId, Vec2)>,
    scratch_towers: Vec<(TowerId, Vec2)>,
    scratch_spawns: Vec<ScheduledSpawn>,
}

impl World {
    /// Creates a fresh session on the provided grid and static route.
    #[must_use]
    pub fn new(grid: GridModel, route: Vec<CellCoord>, economy: Economy) -> Self {
        let width = grid.columns() as f32;
        let height = grid.rows() as f32;
        let route = Arc::new(route);

        Self {
            spawn_route: Arc::clone(&route),
            route,
            spawn_rerouted: false,
            towers: TowerRegistry::new(),
            enemies: Pool::new(),
            projectiles: Pool::new(),
            tower_index: SpatialIndex::new(width, height, DEFAULT_BUCKET_SIZE),
            enemy_index: SpatialIndex::new(width, height, DEFAULT_BUCKET_SIZE),
            waves: WaveState::default(),
            gold: economy.gold,
            lives: economy.lives,
            score: 0,
            status: SessionStatus::Running,
            elapsed: Duration::ZERO,
            scratch_enemies: Vec::new(),
            scratch_projectiles: Vec::new(),
            scratch_hits: Vec::new(),
            scratch_warded: Vec::new(),
            scratch_towers: Vec::new(),
            scratch_spawns: Vec::new(),
            grid,
        }
    }

    /// Rebuilds a session from persisted data.
    ///
    /// Cooldowns, targets, indexes, enemies and projectiles start fresh.
    #[must_use]
    pub fn restore(
        grid: GridModel,
        route: Vec<CellCoord>,
        economy: Economy,
        score: u64,
        waves_completed: u32,
        towers: &[TowerRecord],
    ) -> Self {
        let mut world = Self::new(grid, route, economy);
        world.score = score;
        world.waves = WaveState::restored(waves_completed);
        for record in towers {
            let _ = world.towers.insert(
                record.kind,
                record.cell,
                record.level,
                record.kills,
                record.invested,
            );
        }
        world.rebuild_tower_index();
        world
    }

    fn ensure_running(&self) -> Result<(), RejectionReason> {
        match self.status {
            SessionStatus::Running => Ok(()),
            SessionStatus::GameOver => Err(RejectionReason::GameOver),
        }
    }

    fn spend(&mut self, cost: u32) -> Result<(), RejectionReason> {
        if self.gold < cost {
            return Err(RejectionReason::InsufficientGold {
                required: cost,
                available: self.gold,
            });
        }
        self.gold -= cost;
        Ok(())
    }

    fn is_route_endpoint(&self, cell: CellCoord) -> bool {
        self.route.first() == Some(&cell) || self.route.last() == Some(&cell)
    }

    fn build_tower(
        &mut self,
        kind: TowerKind,
        cell: CellCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), RejectionReason> {
        self.ensure_running()?;
        let cell_kind = self.grid.kind(cell).ok_or(RejectionReason::OutOfBounds)?;
        let placeable = if kind.blocks_route() {
            cell_kind == CellKind::Path && !self.is_route_endpoint(cell)
        } else {
            cell_kind == CellKind::Buildable
        };
        if !placeable {
            return Err(RejectionReason::NotBuildable);
        }
        if self.towers.is_occupied(cell) {
            return Err(RejectionReason::Occupied);
        }
        let cost = kind.build_cost();
        self.spend(cost)?;

        let tower = self.towers.insert(kind, cell, MIN_TOWER_LEVEL, 0, cost);
        self.rebuild_tower_index();
        debug!(?tower, ?kind, ?cell, cost, "tower built");
        out_events.push(Event::TowerBuilt {
            tower,
            kind,
            cell,
            cost,
        });
        out_events.push(Event::TopologyChanged {
            cell,
            blocked: true,
        });
        Ok(())
    }

    fn upgrade_tower(
        &mut self,
        cell: CellCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), RejectionReason> {
        self.ensure_running()?;
        let (kind, level) = self
            .towers
            .at(cell)
            .map(|tower| (tower.kind, tower.level))
            .ok_or(RejectionReason::NoTower)?;
        let cost = kind.upgrade_cost(level).ok_or(RejectionReason::MaxLevel)?;
        self.spend(cost)?;

        let Some(tower) = self.towers.at_mut(cell) else {
            return Err(RejectionReason::NoTower);
        };
        tower.level += 1;
        tower.invested += cost;
        debug!(tower = ?tower.id, level = tower.level, cost, "tower upgraded");
        out_events.push(Event::TowerUpgraded {
            tower: tower.id,
            level: tower.level,
            cost,
        });
        Ok(())
    }

    fn sell_tower(
        &mut self,
        cell: CellCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), RejectionReason> {
        self.ensure_running()?;
        let tower = self.towers.remove_at(cell).ok_or(RejectionReason::NoTower)?;
        let refund = tower.refund();
        self.gold = self.gold.saturating_add(refund);
        self.rebuild_tower_index();

        if tower.kind.blocks_route() && self.towers.count_kind(TowerKind::Barricade) == 0 {
            self.spawn_route = Arc::clone(&self.route);
            self.spawn_rerouted = false;
        }

        debug!(tower = ?tower.id, ?cell, refund, "tower sold");
        out_events.push(Event::TowerSold {
            tower: tower.id,
            cell,
            refund,
        });
        out_events.push(Event::TopologyChanged {
            cell,
            blocked: false,
        });
        Ok(())
    }

    fn start_wave(
        &mut self,
        plan: WavePlan,
        out_events: &mut Vec<Event>,
    ) -> Result<(), RejectionReason> {
        self.ensure_running()?;
        if self.waves.is_active() {
            return Err(RejectionReason::WaveInProgress);
        }
        let wave = plan.wave();
        let enemies = self.waves.start(plan);
        info!(wave, enemies, "wave started");
        out_events.push(Event::WaveStarted { wave, enemies });
        Ok(())
    }

    fn assign_route(
        &mut self,
        subject: RouteSubject,
        route: Vec<CellCoord>,
        out_events: &mut Vec<Event>,
    ) {
        if route.is_empty() {
            return;
        }
        match subject {
            RouteSubject::Spawn => {
                self.spawn_route = Arc::new(route);
                self.spawn_rerouted = true;
            }
            RouteSubject::Enemy(id) => {
                let Some(enemy) = self.enemies.get_mut(id) else {
                    return;
                };
                if !enemy.assign_route(&route) {
                    debug!(?id, "route no longer meets the enemy");
                    out_events.push(Event::RouteDiscarded { enemy: id });
                }
            }
        }
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if self.status == SessionStatus::GameOver {
            return;
        }
        self.elapsed = self.elapsed.saturating_add(dt);
        out_events.push(Event::TimeAdvanced { dt });

        for tower in self.towers.iter_mut() {
            tower.ready_in = tower.ready_in.saturating_sub(dt);
        }

        self.advance_projectiles(dt, out_events);
        if !self.move_enemies(dt, out_events) {
            return;
        }
        self.release_spawns(dt, out_events);
        self.rebuild_enemy_index();
        self.rebuild_tower_index();
        self.refresh_wards();

        if let Some(bonus) = self.waves.try_complete(self.enemies.len()) {
            let wave = self.waves.current;
            self.gold = self.gold.saturating_add(bonus);
            self.score = self
                .score
                .saturating_add(WAVE_SCORE_PER_WAVE * u64::from(wave));
            info!(wave, bonus, "wave completed");
            out_events.push(Event::WaveCompleted { wave, bonus });
        }
    }

    /// Moves every enemy, resolving leaks. Returns `false` once the session
    /// ends.
    fn move_enemies(&mut self, dt: Duration, out_events: &mut Vec<Event>) -> bool {
        let mut ids = std::mem::take(&mut self.scratch_enemies);
        ids.clear();
        self.enemies.collect_ids(&mut ids);

        let mut running = true;
        for id in ids.iter().copied() {
            let Some(enemy) = self.enemies.get_mut(id) else {
                continue;
            };
            let movement = enemy.advance(dt, |cell| walkable(&self.grid, &self.towers, cell));
            enemy.speed_multiplier = 1.0;
            if movement == Movement::Moving {
                continue;
            }

            let Some(enemy) = self.enemies.remove(id) else {
                continue;
            };
            self.lives = self.lives.saturating_sub(enemy.kind.stats().lives_cost);
            debug!(?id, kind = ?enemy.kind, lives = self.lives, "enemy leaked");
            out_events.push(Event::EnemyLeaked {
                enemy: id,
                lives: self.lives,
            });

            if self.lives == 0 {
                self.status = SessionStatus::GameOver;
                info!(score = self.score, wave = self.waves.current, "game over");
                out_events.push(Event::GameOver);
                running = false;
                break;
            }
        }

        self.scratch_enemies = ids;
        running
    }

    fn release_spawns(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let mut due = std::mem::take(&mut self.scratch_spawns);
        due.clear();
        self.waves.release_due(dt, &mut due);
        for spawn in due.iter() {
            let enemy = Enemy::spawn(
                spawn.kind,
                spawn.hp_scale,
                Arc::clone(&self.spawn_route),
                self.spawn_rerouted,
            );
            let id = self.enemies.insert(enemy);
            out_events.push(Event::EnemySpawned {
                enemy: id,
                kind: spawn.kind,
            });
        }
        self.scratch_spawns = due;
    }

    fn rebuild_enemy_index(&mut self) {
        self.enemy_index.clear();
        for (id, enemy) in self.enemies.iter() {
            self.enemy_index.insert(id, enemy.position);
        }
    }

    fn rebuild_tower_index(&mut self) {
        self.tower_index.clear();
        for tower in self.towers.iter() {
            self.tower_index.insert(tower.id, tower.cell.center());
        }
    }
}

/// Reports whether enemies may walk through the cell.
fn walkable(grid: &GridModel, towers: &TowerRegistry, cell: CellCoord) -> bool {
    grid.kind(cell).is_some_and(|kind| kind.is_walkable()) && !towers.is_occupied(cell)
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Rejected requests leave the world untouched and report
/// [`Event::CommandRejected`].
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    let result = match command {
        Command::Tick { dt } => {
            world.tick(dt, out_events);
            Ok(())
        }
        Command::BuildTower { kind, cell } => world.build_tower(kind, cell, out_events),
        Command::UpgradeTower { cell } => world.upgrade_tower(cell, out_events),
        Command::SellTower { cell } => world.sell_tower(cell, out_events),
        Command::StartWave { plan } => world.start_wave(plan, out_events),
        Command::AssignRoute { subject, route } => {
            world.assign_route(subject, route, out_events);
            Ok(())
        }
        Command::SlowEnemy { enemy, multiplier } => {
            if let Some(enemy) = world.enemies.get_mut(enemy) {
                enemy.speed_multiplier = multiplier;
            }
            Ok(())
        }
        Command::FireProjectiles {
            tower,
            shots,
            interval,
        } => {
            if world.status == SessionStatus::Running {
                world.fire(tower, shots, interval, out_events);
            }
            Ok(())
        }
        Command::ApplyBeam {
            tower,
            enemy,
            amount,
        } => {
            if world.status == SessionStatus::Running {
                world.damage_enemy(enemy, amount, Some(tower), out_events);
            }
            Ok(())
        }
    };

    if let Err(reason) = result {
        debug!(%reason, "command rejected");
        out_events.push(Event::CommandRejected { reason });
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use super::{walkable, GridModel, TowerRecord, World};
    use grid_defence_core::{
        CellCoord, EnemyId, EnemySnapshot, EnemyView, FrameSnapshot, ProjectileSnapshot,
        RouteSubject, SessionStatus, TowerId, TowerSnapshot, TowerView,
    };
    use grid_defence_spatial_index::SpatialIndex;

    /// Provides read-only access to the cell grid.
    #[must_use]
    pub fn grid(world: &World) -> &GridModel {
        &world.grid
    }

    /// Static route from entry to exit.
    #[must_use]
    pub fn route(world: &World) -> &[CellCoord] {
        &world.route
    }

    /// Route newly spawned enemies follow; differs from [`route`] while a
    /// barricade forces a detour.
    #[must_use]
    pub fn spawn_route(world: &World) -> &[CellCoord] {
        &world.spawn_route
    }

    /// First cell of the static route.
    #[must_use]
    pub fn entry(world: &World) -> Option<CellCoord> {
        world.route.first().copied()
    }

    /// Last cell of the static route.
    #[must_use]
    pub fn exit(world: &World) -> Option<CellCoord> {
        world.route.last().copied()
    }

    /// Gold currently held.
    #[must_use]
    pub fn gold(world: &World) -> u32 {
        world.gold
    }

    /// Lives remaining.
    #[must_use]
    pub fn lives(world: &World) -> u32 {
        world.lives
    }

    /// Score accumulated over the session.
    #[must_use]
    pub fn score(world: &World) -> u64 {
        world.score
    }

    /// Number of the most recently started wave.
    #[must_use]
    pub fn wave(world: &World) -> u32 {
        world.waves.current
    }

    /// Number of the last wave that completed.
    #[must_use]
    pub fn waves_completed(world: &World) -> u32 {
        world.waves.completed
    }

    /// Whether the session is running or over.
    #[must_use]
    pub fn status(world: &World) -> SessionStatus {
        world.status
    }

    /// Simulated time processed so far.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.elapsed
    }

    /// Reports whether a wave is still spawning or has live enemies.
    #[must_use]
    pub fn wave_in_progress(world: &World) -> bool {
        world.waves.is_active()
    }

    /// Spawns still waiting in the active wave's queue.
    #[must_use]
    pub fn queued_spawns(world: &World) -> usize {
        world.waves.queued()
    }

    /// Captures a read-only view of every tower.
    #[must_use]
    pub fn tower_view(world: &World) -> TowerView {
        TowerView::from_snapshots(world.towers.iter().map(|tower| tower.snapshot()).collect())
    }

    /// Captures a read-only view of every live enemy.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        EnemyView::from_snapshots(enemy_snapshots(world))
    }

    fn enemy_snapshots(world: &World) -> Vec<EnemySnapshot> {
        world
            .enemies
            .iter()
            .map(|(id, enemy)| enemy.snapshot(id))
            .collect()
    }

    /// Tower index rebuilt on every tick and tower change.
    #[must_use]
    pub fn tower_index(world: &World) -> &SpatialIndex<TowerId> {
        &world.tower_index
    }

    /// Enemy index rebuilt on every tick.
    #[must_use]
    pub fn enemy_index(world: &World) -> &SpatialIndex<EnemyId> {
        &world.enemy_index
    }

    /// Snapshot of the tower on the provided cell, if any.
    #[must_use]
    pub fn tower_at(world: &World, cell: CellCoord) -> Option<TowerSnapshot> {
        world.towers.at(cell).map(|tower| tower.snapshot())
    }

    /// Reports whether the enemy handle still refers to a live enemy.
    #[must_use]
    pub fn enemy_alive(world: &World, enemy: EnemyId) -> bool {
        world.enemies.contains(enemy)
    }

    /// Cell a recomputed route for the enemy should start from, or `None`
    /// when the enemy is gone.
    #[must_use]
    pub fn reroute_origin(world: &World, enemy: EnemyId) -> Option<CellCoord> {
        world
            .enemies
            .get(enemy)?
            .reroute_origin(|cell| walkable(&world.grid, &world.towers, cell))
    }

    /// Reports whether enemies may currently walk across the cell.
    ///
    /// Path and buildable cells are walkable unless a structure stands on
    /// them.
    #[must_use]
    pub fn is_walkable(world: &World, cell: CellCoord) -> bool {
        walkable(&world.grid, &world.towers, cell)
    }

    /// Routes that must be recomputed after the cell's walkability changed,
    /// paired with the cell each recomputation starts from.
    ///
    /// Blocking a cell affects the spawn route and every enemy whose remaining
    /// route crosses it. Unblocking affects routes that were already detoured,
    /// since they may now have a shorter way to the exit.
    #[must_use]
    pub fn reroute_subjects(
        world: &World,
        cell: CellCoord,
        blocked: bool,
    ) -> Vec<(RouteSubject, CellCoord)> {
        let mut subjects = Vec::new();

        let spawn_affected = if blocked {
            world.spawn_route.contains(&cell)
        } else {
            world.spawn_rerouted
        };
        if let (true, Some(start)) = (spawn_affected, world.route.first()) {
            subjects.push((RouteSubject::Spawn, *start));
        }

        for (id, enemy) in world.enemies.iter() {
            let affected = if blocked {
                enemy.upcoming().contains(&cell)
            } else {
                enemy.rerouted
            };
            let passable = |cell| walkable(&world.grid, &world.towers, cell);
            if let (true, Some(start)) = (affected, enemy.reroute_origin(passable)) {
                subjects.push((RouteSubject::Enemy(id), start));
            }
        }

        subjects
    }

    /// Number of projectiles in flight or waiting on a chain hop.
    #[must_use]
    pub fn projectile_count(world: &World) -> usize {
        world.projectiles.len()
    }

    /// Number of projectile slots the pool has ever allocated.
    #[must_use]
    pub fn projectile_capacity(world: &World) -> usize {
        world.projectiles.capacity()
    }

    /// Persistent tower records in identifier order.
    #[must_use]
    pub fn towers_for_save(world: &World) -> Vec<TowerRecord> {
        world
            .towers
            .iter()
            .map(|tower| TowerRecord {
                kind: tower.kind,
                cell: tower.cell,
                level: tower.level,
                kills: tower.kills,
                invested: tower.invested,
            })
            .collect()
    }

    /// Owned copy of everything a renderer draws.
    #[must_use]
    pub fn frame_snapshot(world: &World) -> FrameSnapshot {
        let mut enemies = enemy_snapshots(world);
        enemies.sort_by_key(|snapshot| snapshot.id);
        let mut projectiles: Vec<ProjectileSnapshot> = world
            .projectiles
            .iter()
            .map(|(id, projectile)| ProjectileSnapshot {
                id,
                position: projectile.position,
                hopping: projectile.hop.is_some(),
            })
            .collect();
        projectiles.sort_by_key(|snapshot| snapshot.id);

        FrameSnapshot {
            columns: world.grid.columns(),
            rows: world.grid.rows(),
            cells: world.grid.cells().to_vec(),
            route: world.route.to_vec(),
            towers: tower_view(world).into_vec(),
            enemies,
            projectiles,
            gold: world.gold,
            lives: world.lives,
            score: world.score,
            wave: world.waves.current,
        }
    }
}
