#![deny(unsafe_code, missing_docs, non_snake_case)]
#![warn(dead_code, unused_results, unreachable_pub)]

//! Core contracts shared across the Grid Defence engine.
//!
//! This crate defines the message surface that connects the simulation
//! aggregate, the authoritative world, and pure systems. Callers submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to deterministically. Systems consume event streams,
//! query immutable snapshots, and respond exclusively with new command batches.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

mod aura;
mod stats;

pub use aura::{
    damage_taken_multiplier, AuraEffect, AuraTotals, EffectiveStats, CHAIN_BONUS_CAP,
    DAMAGE_BONUS_CAP, DAMAGE_TAKEN_FLOOR, FIRE_INTERVAL_FLOOR, GOLD_BONUS_CAP, RANGE_BONUS_CAP,
};
pub use stats::{ChainSpec, EnemyKind, EnemyStats, FiringMode, TowerKind, TowerStats, WardSpec};

/// Lowest level a freshly built tower starts at.
pub const MIN_TOWER_LEVEL: u8 = 1;
/// Highest level a tower may be upgraded to.
pub const MAX_TOWER_LEVEL: u8 = 3;
/// Share of the total invested cost refunded when a tower is sold.
pub const SELL_REFUND_PERCENT: u32 = 70;
/// Fraction of direct damage dealt to every other enemy inside a splash radius.
pub const SPLASH_DAMAGE_FRACTION: f32 = 0.5;
/// Damage carried from one chain hop to the next.
pub const CHAIN_DAMAGE_FALLOFF: f32 = 0.7;
/// Simulated time a chain hop stays visible before it resolves.
pub const CHAIN_HOP_DELAY: Duration = Duration::from_millis(100);
/// Largest radius any tower, aura, splash or chain query may use, in cells.
pub const MAX_QUERY_RADIUS: f32 = 6.5;
/// Duration of a single fixed logical tick (~16.67 ms).
pub const FIXED_TICK: Duration = Duration::from_nanos(16_666_667);

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// World-space centre of the cell. One cell spans one world unit.
    #[must_use]
    pub fn center(self) -> Vec2 {
        Vec2::new(self.column as f32 + 0.5, self.row as f32 + 0.5)
    }

    /// Neighbouring cell in the provided direction, if it does not underflow.
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<CellCoord> {
        match direction {
            Direction::North => self.row.checked_sub(1).map(|row| Self::new(self.column, row)),
            Direction::East => self.column.checked_add(1).map(|column| Self::new(column, self.row)),
            Direction::South => self.row.checked_add(1).map(|row| Self::new(self.column, row)),
            Direction::West => self
                .column
                .checked_sub(1)
                .map(|column| Self::new(column, self.row)),
        }
    }
}

/// Cardinal movement directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// All four directions in clockwise order.
    pub const ALL: [Direction; 4] = [Self::North, Self::East, Self::South, Self::West];

    /// Direction of a single orthogonal step from `from` to `to`.
    #[must_use]
    pub fn between(from: CellCoord, to: CellCoord) -> Option<Self> {
        let column_diff = from.column().abs_diff(to.column());
        let row_diff = from.row().abs_diff(to.row());

        if column_diff + row_diff != 1 {
            return None;
        }

        if column_diff == 1 {
            if to.column() > from.column() {
                Some(Self::East)
            } else {
                Some(Self::West)
            }
        } else if to.row() > from.row() {
            Some(Self::South)
        } else {
            Some(Self::North)
        }
    }

    /// Axis the direction travels along.
    #[must_use]
    pub const fn axis(self) -> Axis {
        match self {
            Self::East | Self::West => Axis::Horizontal,
            Self::North | Self::South => Axis::Vertical,
        }
    }

    /// Direction pointing the opposite way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }
}

/// Axis of travel along the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Travel along a row (east/west).
    Horizontal,
    /// Travel along a column (north/south).
    Vertical,
}

impl Axis {
    /// The other axis.
    #[must_use]
    pub const fn perpendicular(self) -> Self {
        match self {
            Self::Horizontal => Self::Vertical,
            Self::Vertical => Self::Horizontal,
        }
    }
}

/// Axis-aligned rectangle expressed in cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRect {
    origin: CellCoord,
    size: CellRectSize,
}

impl CellRect {
    /// Constructs a rectangle from an origin cell and size.
    #[must_use]
    pub const fn from_origin_and_size(origin: CellCoord, size: CellRectSize) -> Self {
        Self { origin, size }
    }

    /// Upper-left cell that anchors the rectangle.
    #[must_use]
    pub const fn origin(&self) -> CellCoord {
        self.origin
    }

    /// Dimensions of the rectangle measured in whole cells.
    #[must_use]
    pub const fn size(&self) -> CellRectSize {
        self.size
    }

    /// Exclusive upper bound on columns covered by the rectangle, saturating
    /// at `u32::MAX`.
    #[must_use]
    pub const fn end_column(&self) -> u32 {
        self.origin.column().saturating_add(self.size.width())
    }

    /// Exclusive upper bound on rows covered by the rectangle, saturating at
    /// `u32::MAX`.
    #[must_use]
    pub const fn end_row(&self) -> u32 {
        self.origin.row().saturating_add(self.size.height())
    }

    /// Reports whether the cell lies inside the rectangle.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() >= self.origin.column()
            && cell.column() < self.end_column()
            && cell.row() >= self.origin.row()
            && cell.row() < self.end_row()
    }
}

/// Size of a [`CellRect`] measured in whole cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRectSize {
    width: u32,
    height: u32,
}

impl CellRectSize {
    /// Creates a new size descriptor with explicit dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width of the rectangle in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the rectangle in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }
}

/// Classification of a single grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    /// Inside the playable area but neither path nor buildable.
    Blocked,
    /// Towers may be constructed here.
    Buildable,
    /// Part of the enemy route.
    Path,
    /// Padding outside the playable area.
    Decorative,
}

impl CellKind {
    /// Reports whether enemies may walk across the cell when nothing blocks it.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        matches!(self, Self::Path | Self::Buildable)
    }
}

/// Unique identifier assigned to a tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TowerId(u32);

impl TowerId {
    /// Creates a new tower identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the tower identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Generational handle to an enemy slot.
///
/// A handle stays valid only while the slot holds the same generation, so a
/// projectile aimed at an enemy that died and whose slot was reused never hits
/// the newcomer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnemyId {
    index: u32,
    generation: u32,
}

impl EnemyId {
    /// Creates a handle from its slot index and generation.
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index inside the enemy arena.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Generation the handle was issued for.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

/// Generational handle to a pooled projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectileId {
    index: u32,
    generation: u32,
}

impl ProjectileId {
    /// Creates a handle from its slot index and generation.
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index inside the projectile pool.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Generation the handle was issued for.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

/// Whether the session still accepts ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// Normal play.
    Running,
    /// Lives reached zero; nothing advances until the session is reset.
    GameOver,
}

/// Reasons a request may be rejected. State is left unchanged on rejection.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum RejectionReason {
    /// The cell lies outside the grid.
    #[error("cell lies outside the grid")]
    OutOfBounds,
    /// The cell cannot host the requested structure.
    #[error("cell is not buildable")]
    NotBuildable,
    /// Another tower already occupies the cell.
    #[error("cell is already occupied")]
    Occupied,
    /// No tower stands on the cell.
    #[error("no tower on the cell")]
    NoTower,
    /// The player cannot afford the request.
    #[error("insufficient gold: {required} required, {available} available")]
    InsufficientGold {
        /// Gold the request costs.
        required: u32,
        /// Gold currently held.
        available: u32,
    },
    /// The tower is already at its maximum level.
    #[error("tower is already at max level")]
    MaxLevel,
    /// A wave is still spawning or has live enemies.
    #[error("a wave is already in progress")]
    WaveInProgress,
    /// The session ended and must be reset first.
    #[error("game over")]
    GameOver,
    /// The requested speed multiplier is not supported.
    #[error("unsupported speed multiplier")]
    InvalidSpeed,
}

/// Which route a pathfinding result belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RouteSubject {
    /// The route newly spawned enemies follow.
    Spawn,
    /// A live enemy's personal route.
    Enemy(EnemyId),
}

/// Projectile launch parameters decided by the combat system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shot {
    /// Enemy the projectile is aimed at.
    pub target: EnemyId,
    /// Nominal direct damage.
    pub damage: f32,
    /// Travel speed in cells per second.
    pub speed: f32,
    /// Splash radius for area damage, if the kind carries one.
    pub splash_radius: Option<f32>,
    /// Chain parameters, if the projectile hops after impact.
    pub chain: Option<ChainSpec>,
}

/// A single scheduled spawn inside a wave.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduledSpawn {
    /// Kind of enemy to spawn.
    pub kind: EnemyKind,
    /// Simulation time after the wave start at which the enemy appears.
    pub at: Duration,
    /// Hit point multiplier applied on top of the kind's base hit points.
    pub hp_scale: f32,
}

/// Ordered spawn queue for one wave. Spawn times never decrease.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct WavePlan {
    wave: u32,
    spawns: Vec<ScheduledSpawn>,
}

impl WavePlan {
    /// Creates a plan, sorting spawns by time so the queue stays non-decreasing.
    #[must_use]
    pub fn new(wave: u32, mut spawns: Vec<ScheduledSpawn>) -> Self {
        spawns.sort_by_key(|spawn| spawn.at);
        Self { wave, spawns }
    }

    /// Wave number the plan belongs to.
    #[must_use]
    pub const fn wave(&self) -> u32 {
        self.wave
    }

    /// Scheduled spawns in non-decreasing time order.
    #[must_use]
    pub fn spawns(&self) -> &[ScheduledSpawn] {
        &self.spawns
    }

    /// Consumes the plan, yielding the spawns.
    #[must_use]
    pub fn into_spawns(self) -> Vec<ScheduledSpawn> {
        self.spawns
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by one fixed tick.
    Tick {
        /// Simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Constructs a tower on the provided cell.
    BuildTower {
        /// Kind of tower to construct.
        kind: TowerKind,
        /// Target cell.
        cell: CellCoord,
    },
    /// Raises the level of the tower on the provided cell.
    UpgradeTower {
        /// Cell holding the tower.
        cell: CellCoord,
    },
    /// Removes the tower on the provided cell and refunds part of its cost.
    SellTower {
        /// Cell holding the tower.
        cell: CellCoord,
    },
    /// Loads the spawn queue of a new wave.
    StartWave {
        /// Wave composition and schedule.
        plan: WavePlan,
    },
    /// Replaces a route after pathfinding completes.
    AssignRoute {
        /// Route owner.
        subject: RouteSubject,
        /// Cells from the owner's current cell to the exit.
        route: Vec<CellCoord>,
    },
    /// Sets the transient speed multiplier of an enemy for the next movement step.
    SlowEnemy {
        /// Enemy to slow.
        enemy: EnemyId,
        /// Multiplier applied to the enemy's speed.
        multiplier: f32,
    },
    /// Launches projectiles from a tower and restarts its cooldown.
    FireProjectiles {
        /// Tower firing.
        tower: TowerId,
        /// Projectiles to launch.
        shots: Vec<Shot>,
        /// Cooldown before the tower may fire again.
        interval: Duration,
    },
    /// Applies continuous beam damage for the current tick.
    ApplyBeam {
        /// Tower emitting the beam.
        tower: TowerId,
        /// Enemy under the beam.
        enemy: EnemyId,
        /// Nominal damage for this tick.
        amount: f32,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a tower was constructed.
    TowerBuilt {
        /// Identifier allocated to the tower.
        tower: TowerId,
        /// Kind of tower.
        kind: TowerKind,
        /// Cell the tower occupies.
        cell: CellCoord,
        /// Gold spent.
        cost: u32,
    },
    /// Confirms that a tower gained a level.
    TowerUpgraded {
        /// Identifier of the tower.
        tower: TowerId,
        /// Level after the upgrade.
        level: u8,
        /// Gold spent.
        cost: u32,
    },
    /// Confirms that a tower was sold.
    TowerSold {
        /// Identifier of the removed tower.
        tower: TowerId,
        /// Cell the tower occupied.
        cell: CellCoord,
        /// Gold returned to the player.
        refund: u32,
    },
    /// Reports that a request was rejected without changing state.
    CommandRejected {
        /// Specific reason the request failed.
        reason: RejectionReason,
    },
    /// Walkable topology changed; affected routes must be recomputed.
    TopologyChanged {
        /// Cell whose walkability flipped.
        cell: CellCoord,
        /// Whether the cell became blocked (`true`) or walkable again.
        blocked: bool,
    },
    /// Reports that a recomputed route no longer meets the enemy where it
    /// stands and was not applied.
    RouteDiscarded {
        /// Enemy that kept its previous route.
        enemy: EnemyId,
    },
    /// Confirms that a wave's spawn queue was loaded.
    WaveStarted {
        /// Wave number.
        wave: u32,
        /// Number of enemies queued.
        enemies: usize,
    },
    /// Confirms that a wave finished spawning and every enemy is gone.
    WaveCompleted {
        /// Wave number that completed.
        wave: u32,
        /// Gold granted for completing the wave.
        bonus: u32,
    },
    /// Confirms that an enemy entered the route.
    EnemySpawned {
        /// Handle of the new enemy.
        enemy: EnemyId,
        /// Kind of enemy.
        kind: EnemyKind,
    },
    /// Confirms that a projectile left a tower.
    ProjectileFired {
        /// Handle of the pooled projectile.
        projectile: ProjectileId,
        /// Tower that fired it.
        tower: TowerId,
        /// Enemy it was aimed at.
        target: EnemyId,
    },
    /// Reports a chain hop jumping to a new enemy.
    ChainHopped {
        /// Enemy struck by the hop.
        target: EnemyId,
        /// Nominal damage of the hop.
        damage: f32,
    },
    /// Reports damage landing on an enemy.
    EnemyDamaged {
        /// Enemy struck.
        enemy: EnemyId,
        /// Damage dealt after incoming-damage reduction.
        amount: f32,
    },
    /// Reports that an enemy died.
    EnemyKilled {
        /// Handle of the dead enemy.
        enemy: EnemyId,
        /// Kind of enemy.
        kind: EnemyKind,
        /// Tower credited with the kill, if any.
        tower: Option<TowerId>,
        /// Gold granted.
        reward: u32,
    },
    /// Reports that an enemy reached the exit.
    EnemyLeaked {
        /// Handle of the enemy.
        enemy: EnemyId,
        /// Lives remaining afterwards.
        lives: u32,
    },
    /// Reports that lives reached zero.
    GameOver,
}

/// Immutable representation of a single tower's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerSnapshot {
    /// Identifier allocated to the tower by the world.
    pub id: TowerId,
    /// Kind of tower that was constructed.
    pub kind: TowerKind,
    /// Cell the tower occupies.
    pub cell: CellCoord,
    /// Current level.
    pub level: u8,
    /// Enemies this tower finished off.
    pub kills: u32,
    /// Gold spent on construction and upgrades.
    pub invested: u32,
    /// Simulated time left before the tower may fire again.
    pub ready_in: Duration,
}

impl TowerSnapshot {
    /// World-space centre of the tower.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.cell.center()
    }

    /// Level-scaled stats before auras.
    #[must_use]
    pub fn stats(&self) -> TowerStats {
        self.kind.stats_at(self.level)
    }
}

/// Read-only snapshot describing all towers.
#[derive(Clone, Debug, Default)]
pub struct TowerView {
    snapshots: Vec<TowerSnapshot>,
}

impl TowerView {
    /// Creates a new tower view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TowerSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured tower snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &TowerSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up a tower by identifier.
    #[must_use]
    pub fn get(&self, id: TowerId) -> Option<&TowerSnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<TowerSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single enemy's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Handle of the enemy.
    pub id: EnemyId,
    /// Kind of enemy.
    pub kind: EnemyKind,
    /// Remaining hit points.
    pub hp: f32,
    /// Hit points at spawn.
    pub max_hp: f32,
    /// World-space position.
    pub position: Vec2,
    /// Distance travelled along the route: route index plus fractional progress.
    pub progress: f32,
}

/// Read-only snapshot describing all live enemies.
#[derive(Clone, Debug, Default)]
pub struct EnemyView {
    snapshots: Vec<EnemySnapshot>,
}

impl EnemyView {
    /// Creates a new enemy view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EnemySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured enemy snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.snapshots.iter()
    }

    /// Looks up an enemy by handle.
    #[must_use]
    pub fn get(&self, id: EnemyId) -> Option<&EnemySnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of enemies captured.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether no enemies were captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Effective stats and in-range targets of one tower for the current tick.
#[derive(Clone, Debug, PartialEq)]
pub struct TowerEngagement {
    /// Tower the engagement belongs to.
    pub tower: TowerId,
    /// Simulated time left before the tower may fire again.
    pub ready_in: Duration,
    /// Level-scaled stats with auras folded in.
    pub stats: EffectiveStats,
    /// Enemies within effective range, furthest progressed first.
    pub targets: Vec<EnemyId>,
}

/// Owned copy of a projectile for renderers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectileSnapshot {
    /// Handle of the projectile.
    pub id: ProjectileId,
    /// World-space position.
    pub position: Vec2,
    /// Whether the projectile is a chain hop waiting to resolve.
    pub hopping: bool,
}

/// Everything a renderer needs to draw one frame. Never fed back into the world.
#[derive(Clone, Debug, Default)]
pub struct FrameSnapshot {
    /// Grid width in cells.
    pub columns: u32,
    /// Grid height in cells.
    pub rows: u32,
    /// Cell kinds in row-major order.
    pub cells: Vec<CellKind>,
    /// Static route from entry to exit.
    pub route: Vec<CellCoord>,
    /// Towers in identifier order.
    pub towers: Vec<TowerSnapshot>,
    /// Live enemies in handle order.
    pub enemies: Vec<EnemySnapshot>,
    /// Live projectiles in handle order.
    pub projectiles: Vec<ProjectileSnapshot>,
    /// Gold held.
    pub gold: u32,
    /// Lives remaining.
    pub lives: u32,
    /// Score accumulated.
    pub score: u64,
    /// Current wave number.
    pub wave: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = CellCoord::new(1, 1);
        let destination = CellCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    #[test]
    fn direction_between_requires_single_orthogonal_step() {
        let origin = CellCoord::new(3, 3);
        assert_eq!(
            Direction::between(origin, CellCoord::new(4, 3)),
            Some(Direction::East)
        );
        assert_eq!(
            Direction::between(origin, CellCoord::new(3, 2)),
            Some(Direction::North)
        );
        assert_eq!(Direction::between(origin, CellCoord::new(4, 4)), None);
        assert_eq!(Direction::between(origin, origin), None);
    }

    #[test]
    fn step_refuses_to_underflow() {
        assert_eq!(CellCoord::new(0, 0).step(Direction::West), None);
        assert_eq!(CellCoord::new(0, 0).step(Direction::North), None);
        assert_eq!(
            CellCoord::new(0, 0).step(Direction::South),
            Some(CellCoord::new(0, 1))
        );
    }

    #[test]
    fn rect_contains_respects_exclusive_bounds() {
        let rect =
            CellRect::from_origin_and_size(CellCoord::new(2, 3), CellRectSize::new(4, 2));
        assert!(rect.contains(CellCoord::new(2, 3)));
        assert!(rect.contains(CellCoord::new(5, 4)));
        assert!(!rect.contains(CellCoord::new(6, 4)));
        assert!(!rect.contains(CellCoord::new(5, 5)));
        assert!(!rect.contains(CellCoord::new(1, 3)));
    }

    #[test]
    fn wave_plan_sorts_spawns_by_time() {
        let plan = WavePlan::new(
            1,
            vec![
                ScheduledSpawn {
                    kind: EnemyKind::Grunt,
                    at: Duration::from_secs(2),
                    hp_scale: 1.0,
                },
                ScheduledSpawn {
                    kind: EnemyKind::Scout,
                    at: Duration::from_secs(1),
                    hp_scale: 1.0,
                },
            ],
        );

        let times: Vec<_> = plan.spawns().iter().map(|spawn| spawn.at).collect();
        assert_eq!(times, vec![Duration::from_secs(1), Duration::from_secs(2)]);
    }

    #[test]
    fn rect_bounds_saturate_instead_of_wrapping() {
        let rect = CellRect::from_origin_and_size(
            CellCoord::new(u32::MAX, u32::MAX - 1),
            CellRectSize::new(4, 4),
        );
        assert_eq!(rect.end_column(), u32::MAX);
        assert_eq!(rect.end_row(), u32::MAX);
        assert!(!rect.contains(CellCoord::new(0, 0)));
        assert!(!rect.contains(CellCoord::new(u32::MAX - 1, u32::MAX - 1)));
    }

    #[test]
    fn rejection_reason_renders_gold_shortfall() {
        let reason = RejectionReason::InsufficientGold {
            required: 60,
            available: 20,
        };
        assert_eq!(
            reason.to_string(),
            "insufficient gold: 60 required, 20 available"
        );
    }
}
