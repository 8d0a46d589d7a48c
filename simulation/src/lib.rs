#![deny(unsafe_code, missing_docs, non_snake_case)]
#![warn(dead_code, unused_results, unreachable_pub)]

//! Session aggregate that drives the Grid Defence world.
//!
//! [`Simulation`] owns the world, the pure systems, the route recomputation
//! service and the fixed-timestep clock. Input calls mutate synchronously and
//! report rejections as values. Every logical tick polls finished route
//! requests, advances the world, runs targeting and combat, and queues A*
//! requests for routes invalidated by structural changes.

mod clock;
mod config;
pub mod persistence;

use std::{collections::HashMap, sync::Arc, time::Duration};

use grid_defence_core::{
    CellCoord, Command, Event, FrameSnapshot, RejectionReason, RouteSubject, SessionStatus,
    TowerEngagement, TowerId, TowerKind, FIXED_TICK, SELL_REFUND_PERCENT,
};
use grid_defence_system_path_generation::{self as path_generation, PathGenerator, PathRequest};
use grid_defence_system_pathfinding::{PathResponse, PathfindingService, RequestId, WalkGrid};
use grid_defence_system_tower_combat::TowerCombat;
use grid_defence_system_tower_targeting::TowerTargeting;
use grid_defence_system_wave_generation::WaveDirector;
use grid_defence_world::{self as world, query, Economy, GridModel, TowerRecord, World};
use persistence::{LoadError, SavedTower, SessionSnapshot};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

pub use clock::{SimulationClock, MAX_BACKLOG_TICKS, MAX_SPEED, MIN_SPEED};
pub use config::{SimulationConfig, MAX_PADDING, MAX_PLAYABLE_SIDE, MIN_PLAYABLE_SIDE};

/// Direction changes added to the turn budget at every difficulty milestone.
pub const TURN_BUDGET_STEP: u32 = 2;
/// Completed waves between difficulty milestones.
pub const WAVES_PER_MILESTONE: u32 = 5;
/// Turn budget beyond which difficulty stops growing.
pub const TURN_BUDGET_CAP: u32 = 32;

const RNG_STREAM_LEVEL: &str = "level-layout";

/// A running session: world state plus everything that advances it.
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    world: World,
    clock: SimulationClock,
    director: WaveDirector,
    targeting: TowerTargeting,
    combat: TowerCombat,
    pathfinding: PathfindingService,
    requests: HashMap<RequestId, RouteSubject>,
    latest: HashMap<RouteSubject, RequestId>,
    level: u32,
    engagements: Vec<TowerEngagement>,
    commands: Vec<Command>,
    responses: Vec<PathResponse>,
    events: Vec<Event>,
}

impl Simulation {
    /// Starts a session on a freshly generated level.
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        let (grid, route) = generate_level(&config, 0, config.path.max_turns);
        let world = World::new(grid, route, config.economy());
        Self::assemble(config, world, 0)
    }

    /// Resumes a session from a save string.
    pub fn restore(config: SimulationConfig, save: &str) -> Result<Self, LoadError> {
        let snapshot = SessionSnapshot::decode(save)?;
        let grid = snapshot.validate()?;
        let records: Vec<TowerRecord> = snapshot.towers.iter().copied().map(Into::into).collect();
        let world = World::restore(
            grid,
            snapshot.route,
            Economy {
                gold: snapshot.gold,
                lives: snapshot.lives,
            },
            snapshot.score,
            snapshot.waves_completed,
            &records,
        );

        let mut simulation = Self::assemble(config, world, snapshot.level);
        for record in records.iter().filter(|record| record.kind.blocks_route()) {
            simulation.reroute(record.cell, true);
        }
        info!(
            towers = records.len(),
            waves_completed = snapshot.waves_completed,
            "session restored"
        );
        Ok(simulation)
    }

    /// Resumes from `save` when it is present and readable, otherwise starts a
    /// fresh level.
    #[must_use]
    pub fn restore_or_generate(config: SimulationConfig, save: Option<&str>) -> Self {
        let Some(save) = save else {
            return Self::new(config);
        };
        match Self::restore(config.clone(), save) {
            Ok(simulation) => simulation,
            Err(error) => {
                warn!(%error, "discarding unreadable save, generating a fresh level");
                Self::new(config)
            }
        }
    }

    fn assemble(config: SimulationConfig, world: World, level: u32) -> Self {
        Self {
            clock: SimulationClock::new(FIXED_TICK),
            director: WaveDirector::new(config.waves, config.seed),
            targeting: TowerTargeting::new(),
            combat: TowerCombat::new(),
            pathfinding: PathfindingService::new(config.pathfinding),
            requests: HashMap::new(),
            latest: HashMap::new(),
            level,
            engagements: Vec::new(),
            commands: Vec::new(),
            responses: Vec::new(),
            events: Vec::new(),
            world,
            config,
        }
    }

    /// Configuration the session was started with.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Read-only access to the world for [`query`] functions.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Fixed-timestep clock.
    #[must_use]
    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    /// Whether the session still accepts ticks.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        query::status(&self.world)
    }

    /// Levels generated before the current one.
    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Route requests submitted and not yet applied.
    #[must_use]
    pub fn pending_routes(&self) -> usize {
        self.requests.len()
    }

    /// Turn budget the next generated level uses.
    #[must_use]
    pub fn turn_budget(&self) -> u32 {
        turn_budget(
            self.config.path.max_turns,
            query::waves_completed(&self.world),
        )
    }

    /// Owned copy of everything a renderer draws.
    #[must_use]
    pub fn snapshot(&self) -> FrameSnapshot {
        query::frame_snapshot(&self.world)
    }

    /// Events emitted since the last drain.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Takes the events emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Constructs a tower of `kind` on `cell`.
    pub fn build_tower(
        &mut self,
        kind: TowerKind,
        cell: CellCoord,
    ) -> Result<TowerId, RejectionReason> {
        let first = self.submit(Command::BuildTower { kind, cell })?;
        self.events[first..]
            .iter()
            .find_map(|event| match event {
                Event::TowerBuilt { tower, .. } => Some(*tower),
                _ => None,
            })
            .ok_or(RejectionReason::NotBuildable)
    }

    /// Raises the level of the tower on `cell` and returns the new level.
    pub fn upgrade_tower(&mut self, cell: CellCoord) -> Result<u8, RejectionReason> {
        let first = self.submit(Command::UpgradeTower { cell })?;
        self.events[first..]
            .iter()
            .find_map(|event| match event {
                Event::TowerUpgraded { level, .. } => Some(*level),
                _ => None,
            })
            .ok_or(RejectionReason::NoTower)
    }

    /// Sells the tower on `cell` and returns the refund.
    pub fn sell_tower(&mut self, cell: CellCoord) -> Result<u32, RejectionReason> {
        let first = self.submit(Command::SellTower { cell })?;
        self.events[first..]
            .iter()
            .find_map(|event| match event {
                Event::TowerSold { refund, .. } => Some(*refund),
                _ => None,
            })
            .ok_or(RejectionReason::NoTower)
    }

    /// Queues the next wave and returns its number.
    pub fn start_wave(&mut self) -> Result<u32, RejectionReason> {
        let wave = query::waves_completed(&self.world) + 1;
        let plan = self.director.plan(wave);
        let _ = self.submit(Command::StartWave { plan })?;
        Ok(wave)
    }

    /// Changes the speed multiplier. Only `1..=4` is accepted.
    pub fn set_speed(&mut self, speed: u8) -> Result<(), RejectionReason> {
        self.clock.set_speed(speed)
    }

    /// Flips the pause flag and returns whether the session is now paused.
    pub fn toggle_pause(&mut self) -> bool {
        let paused = self.clock.toggle_pause();
        debug!(paused, "pause toggled");
        paused
    }

    /// Feeds real elapsed time and runs every logical tick that became due.
    ///
    /// Returns the number of ticks run. Nothing runs while paused or after
    /// the game is over.
    pub fn advance(&mut self, real: Duration) -> u32 {
        if self.status() == SessionStatus::GameOver {
            return 0;
        }

        let due = self.clock.advance(real);
        let mut ran = 0;
        while ran < due {
            self.run_tick();
            ran += 1;
            if self.status() == SessionStatus::GameOver {
                self.clock.discard_backlog();
                break;
            }
        }
        ran
    }

    /// Runs exactly one logical tick regardless of the clock. Returns `false`
    /// once the game is over.
    pub fn step(&mut self) -> bool {
        if self.status() == SessionStatus::GameOver {
            return false;
        }
        self.run_tick();
        true
    }

    /// Abandons the session and starts over from the configuration.
    pub fn reset(&mut self) {
        info!(seed = self.config.seed, "session reset");
        *self = Self::new(self.config.clone());
    }

    /// Replaces the level with a newly generated one at the current
    /// difficulty.
    ///
    /// Towers are sold at the usual refund; enemies, projectiles and pending
    /// route requests are discarded. Gold, lives, score and wave count carry
    /// over.
    pub fn regenerate_level(&mut self) -> Result<(), RejectionReason> {
        if self.status() == SessionStatus::GameOver {
            return Err(RejectionReason::GameOver);
        }

        let refund: u32 = query::towers_for_save(&self.world)
            .iter()
            .map(|tower| tower.invested * SELL_REFUND_PERCENT / 100)
            .sum();
        let level = self.level + 1;
        let (grid, route) = generate_level(&self.config, level, self.turn_budget());
        let economy = Economy {
            gold: query::gold(&self.world).saturating_add(refund),
            lives: query::lives(&self.world),
        };
        self.world = World::restore(
            grid,
            route,
            economy,
            query::score(&self.world),
            query::waves_completed(&self.world),
            &[],
        );
        self.level = level;
        self.requests.clear();
        self.latest.clear();
        Ok(())
    }

    /// Persistent state of the session.
    #[must_use]
    pub fn session_snapshot(&self) -> SessionSnapshot {
        let grid = query::grid(&self.world);
        SessionSnapshot {
            columns: grid.columns(),
            rows: grid.rows(),
            playable: grid.playable(),
            cells: grid.playable_cells(),
            route: query::route(&self.world).to_vec(),
            towers: query::towers_for_save(&self.world)
                .into_iter()
                .map(SavedTower::from)
                .collect(),
            gold: query::gold(&self.world),
            lives: query::lives(&self.world),
            score: query::score(&self.world),
            waves_completed: query::waves_completed(&self.world),
            level: self.level,
        }
    }

    /// Encodes the session into a single-line save string.
    pub fn save(&self) -> Result<String, serde_json::Error> {
        self.session_snapshot().encode()
    }

    fn submit(&mut self, command: Command) -> Result<usize, RejectionReason> {
        let first = self.events.len();
        world::apply(&mut self.world, command, &mut self.events);
        let rejection = self.events[first..].iter().find_map(|event| match event {
            Event::CommandRejected { reason } => Some(*reason),
            _ => None,
        });
        if let Some(reason) = rejection {
            return Err(reason);
        }
        self.react(first);
        Ok(first)
    }

    fn run_tick(&mut self) {
        let first = self.events.len();
        self.apply_route_responses();

        let dt = self.clock.tick();
        world::apply(&mut self.world, Command::Tick { dt }, &mut self.events);

        let towers = query::tower_view(&self.world);
        let enemies = query::enemy_view(&self.world);
        self.targeting.handle(
            &towers,
            &enemies,
            query::tower_index(&self.world),
            query::enemy_index(&self.world),
            &mut self.engagements,
        );
        self.commands.clear();
        self.combat.handle(&self.engagements, dt, &mut self.commands);
        for command in self.commands.drain(..) {
            world::apply(&mut self.world, command, &mut self.events);
        }

        self.react(first);
    }

    fn react(&mut self, first: usize) {
        let mut changes = Vec::new();
        let mut discarded = Vec::new();
        for event in &self.events[first..] {
            match *event {
                Event::TopologyChanged { cell, blocked } => changes.push((cell, blocked)),
                Event::RouteDiscarded { enemy } => discarded.push(enemy),
                Event::WaveCompleted { wave, .. } if wave % WAVES_PER_MILESTONE == 0 => {
                    info!(wave, turn_budget = self.turn_budget(), "difficulty raised");
                }
                _ => {}
            }
        }

        for (cell, blocked) in changes {
            self.reroute(cell, blocked);
        }

        let retries: Vec<(RouteSubject, CellCoord)> = discarded
            .into_iter()
            .filter(|enemy| !self.latest.contains_key(&RouteSubject::Enemy(*enemy)))
            .filter_map(|enemy| {
                query::reroute_origin(&self.world, enemy)
                    .map(|start| (RouteSubject::Enemy(enemy), start))
            })
            .collect();
        if !retries.is_empty() {
            debug!(routes = retries.len(), "requesting routes again for enemies that moved on");
            self.request_routes(retries);
        }
    }

    fn reroute(&mut self, cell: CellCoord, blocked: bool) {
        let subjects = query::reroute_subjects(&self.world, cell, blocked);
        if subjects.is_empty() {
            return;
        }
        debug!(?cell, blocked, routes = subjects.len(), "queueing route recomputation");
        self.request_routes(subjects);
    }

    fn request_routes(&mut self, subjects: Vec<(RouteSubject, CellCoord)>) {
        let Some(goal) = query::exit(&self.world) else {
            return;
        };
        let grid = query::grid(&self.world);
        let walkable = Arc::new(WalkGrid::from_fn(grid.columns(), grid.rows(), |candidate| {
            query::is_walkable(&self.world, candidate)
        }));

        for (subject, start) in subjects {
            let id = self.pathfinding.submit(Arc::clone(&walkable), start, goal);
            let _ = self.requests.insert(id, subject);
            if let Some(previous) = self.latest.insert(subject, id) {
                let _ = self.requests.remove(&previous);
            }
        }
    }

    fn apply_route_responses(&mut self) {
        self.responses.clear();
        self.pathfinding.poll(&mut self.responses);

        for response in self.responses.drain(..) {
            let Some(subject) = self.requests.remove(&response.id) else {
                warn!(request = response.id.get(), "dropping superseded route response");
                continue;
            };
            let _ = self.latest.remove(&subject);

            if let RouteSubject::Enemy(enemy) = subject {
                if !query::enemy_alive(&self.world, enemy) {
                    warn!(?enemy, "dropping route for an enemy that is gone");
                    continue;
                }
            }
            if !response.reached {
                warn!(?subject, "exit unreachable, heading straight for it");
            }
            world::apply(
                &mut self.world,
                Command::AssignRoute {
                    subject,
                    route: response.route,
                },
                &mut self.events,
            );
        }
    }
}

fn generate_level(
    config: &SimulationConfig,
    level: u32,
    max_turns: u32,
) -> (GridModel, Vec<CellCoord>) {
    let playable = config.playable();
    let (columns, rows) = config.grid_size();
    let (entry, exit) = config.endpoints();
    let generator = PathGenerator::new(path_generation::Config {
        max_turns,
        ..config.path
    });
    let generated = generator.generate(
        &PathRequest {
            bounds: playable,
            entry,
            exit,
        },
        derive_level_seed(config.seed, level),
    );
    info!(
        level,
        turns = generated.turns,
        cells = generated.route.len(),
        fallback = generated.fallback,
        "level generated"
    );

    let grid = GridModel::from_route(columns, rows, playable, &generated.route);
    (grid, generated.route)
}

fn turn_budget(base: u32, waves_completed: u32) -> u32 {
    let milestones = waves_completed / WAVES_PER_MILESTONE;
    base.saturating_add(TURN_BUDGET_STEP.saturating_mul(milestones))
        .min(base.max(TURN_BUDGET_CAP))
}

fn derive_level_seed(seed: u64, level: u32) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(RNG_STREAM_LEVEL.as_bytes());
    hasher.update(level.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
