//! Single-line session save format.
//!
//! A save reads `grid:v1:<columns>x<rows>:<payload>` where the payload is
//! unpadded base64 over JSON. Only the playable cells, the static route, the
//! towers and the economy are stored. Cooldowns, targets, indexes, enemies and
//! projectiles are rebuilt on load.

use std::collections::HashSet;

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use grid_defence_core::{CellCoord, CellKind, CellRect, TowerKind, MAX_TOWER_LEVEL, MIN_TOWER_LEVEL};
use grid_defence_world::{GridModel, TowerRecord, MAX_GRID_SIDE};
use serde::{Deserialize, Serialize};

const SNAPSHOT_DOMAIN: &str = "grid";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded snapshot payload.
pub const SNAPSHOT_HEADER: &str = "grid:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Persistent state of a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Grid width including padding. Carried in the header, not the payload.
    #[serde(skip)]
    pub columns: u32,
    /// Grid height including padding.
    #[serde(skip)]
    pub rows: u32,
    /// Playable rectangle.
    pub playable: CellRect,
    /// Playable cells in row-major order.
    pub cells: Vec<CellKind>,
    /// Static route from entry to exit.
    pub route: Vec<CellCoord>,
    /// Towers in identifier order.
    pub towers: Vec<SavedTower>,
    /// Gold held.
    pub gold: u32,
    /// Lives remaining.
    pub lives: u32,
    /// Score accumulated.
    pub score: u64,
    /// Waves finished so far.
    pub waves_completed: u32,
    /// Levels generated before this one in the session.
    pub level: u32,
}

/// Tower entry of a save.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedTower {
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

impl From<TowerRecord> for SavedTower {
    fn from(record: TowerRecord) -> Self {
        Self {
            kind: record.kind,
            cell: record.cell,
            level: record.level,
            kills: record.kills,
            invested: record.invested,
        }
    }
}

impl From<SavedTower> for TowerRecord {
    fn from(tower: SavedTower) -> Self {
        Self {
            kind: tower.kind,
            cell: tower.cell,
            level: tower.level,
            kills: tower.kills,
            invested: tower.invested,
        }
    }
}

/// Reasons a save string could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The provided string was empty or contained only whitespace.
    #[error("save payload was empty")]
    EmptyPayload,
    /// The prefix segment was missing.
    #[error("save string is missing the prefix")]
    MissingPrefix,
    /// The version segment was missing.
    #[error("save string is missing the version")]
    MissingVersion,
    /// The grid dimensions were missing.
    #[error("save string is missing the grid dimensions")]
    MissingDimensions,
    /// The payload segment was missing.
    #[error("save string is missing the payload")]
    MissingPayload,
    /// The prefix segment was not recognised.
    #[error("save prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The version segment was not recognised.
    #[error("save version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed.
    #[error("could not parse grid dimensions '{0}'")]
    InvalidDimensions(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode save payload: {0}")]
    InvalidEncoding(#[source] base64::DecodeError),
    /// The decoded payload could not be deserialised.
    #[error("could not parse save payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
    /// The playable cells do not fit the grid dimensions.
    #[error("playable cells do not match the grid dimensions")]
    InvalidGrid,
    /// No lives were left.
    #[error("save has no lives left")]
    NoLives,
    /// The route was empty.
    #[error("route is empty")]
    EmptyRoute,
    /// Two consecutive route cells were not neighbours.
    #[error("route breaks between steps {index} and {}", index + 1)]
    DisconnectedRoute {
        /// Position of the first cell of the broken pair.
        index: usize,
    },
    /// A route cell was not marked as path.
    #[error("route cell {cell:?} is not a path cell")]
    RouteOffPath {
        /// Offending cell.
        cell: CellCoord,
    },
    /// A tower level was outside `1..=3`.
    #[error("tower at {cell:?} has invalid level {level}")]
    TowerLevel {
        /// Tower cell.
        cell: CellCoord,
        /// Stored level.
        level: u8,
    },
    /// A tower stands where its kind may not be placed.
    #[error("tower at {cell:?} cannot stand there")]
    TowerPlacement {
        /// Tower cell.
        cell: CellCoord,
    },
    /// Two towers share a cell.
    #[error("more than one tower at {cell:?}")]
    DuplicateTower {
        /// Shared cell.
        cell: CellCoord,
    },
}

impl SessionSnapshot {
    /// Encodes the snapshot into a single-line string.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        let encoded = STANDARD_NO_PAD.encode(json);
        Ok(format!(
            "{SNAPSHOT_HEADER}:{}x{}:{encoded}",
            self.columns, self.rows
        ))
    }

    /// Parses a snapshot. The result still needs [`SessionSnapshot::validate`].
    pub fn decode(value: &str) -> Result<Self, LoadError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LoadError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(LoadError::MissingPrefix)?;
        let version = parts.next().ok_or(LoadError::MissingVersion)?;
        let dimensions = parts.next().ok_or(LoadError::MissingDimensions)?;
        let payload = parts.next().ok_or(LoadError::MissingPayload)?;

        if domain != SNAPSHOT_DOMAIN {
            return Err(LoadError::InvalidPrefix(domain.to_owned()));
        }
        if version != SNAPSHOT_VERSION {
            return Err(LoadError::UnsupportedVersion(version.to_owned()));
        }

        let (columns, rows) = parse_dimensions(dimensions)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(LoadError::InvalidEncoding)?;
        let mut snapshot: SessionSnapshot =
            serde_json::from_slice(&bytes).map_err(LoadError::InvalidPayload)?;
        snapshot.columns = columns;
        snapshot.rows = rows;
        Ok(snapshot)
    }

    /// Checks the snapshot for internal consistency and rebuilds its grid.
    pub fn validate(&self) -> Result<GridModel, LoadError> {
        let grid =
            GridModel::from_playable_cells(self.columns, self.rows, self.playable, &self.cells)
                .ok_or(LoadError::InvalidGrid)?;
        if self.lives == 0 {
            return Err(LoadError::NoLives);
        }

        if self.route.is_empty() {
            return Err(LoadError::EmptyRoute);
        }
        for cell in &self.route {
            if grid.kind(*cell) != Some(CellKind::Path) {
                return Err(LoadError::RouteOffPath { cell: *cell });
            }
        }
        if let Some(index) = self
            .route
            .windows(2)
            .position(|pair| pair[0].manhattan_distance(pair[1]) != 1)
        {
            return Err(LoadError::DisconnectedRoute { index });
        }

        let endpoints = [self.route.first(), self.route.last()];
        let mut occupied = HashSet::new();
        for tower in &self.towers {
            if !(MIN_TOWER_LEVEL..=MAX_TOWER_LEVEL).contains(&tower.level) {
                return Err(LoadError::TowerLevel {
                    cell: tower.cell,
                    level: tower.level,
                });
            }
            let placeable = match grid.kind(tower.cell) {
                Some(CellKind::Path) => {
                    tower.kind.blocks_route() && !endpoints.contains(&Some(&tower.cell))
                }
                Some(CellKind::Buildable) => !tower.kind.blocks_route(),
                _ => false,
            };
            if !placeable {
                return Err(LoadError::TowerPlacement { cell: tower.cell });
            }
            if !occupied.insert(tower.cell) {
                return Err(LoadError::DuplicateTower { cell: tower.cell });
            }
        }

        Ok(grid)
    }
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), LoadError> {
    let (columns, rows) = dimensions
        .split_once(['x', 'X'])
        .ok_or_else(|| LoadError::InvalidDimensions(dimensions.to_owned()))?;

    let columns = columns
        .trim()
        .parse::<u32>()
        .map_err(|_| LoadError::InvalidDimensions(dimensions.to_owned()))?;
    let rows = rows
        .trim()
        .parse::<u32>()
        .map_err(|_| LoadError::InvalidDimensions(dimensions.to_owned()))?;

    let side = 1..=MAX_GRID_SIDE;
    if !side.contains(&columns) || !side.contains(&rows) {
        return Err(LoadError::InvalidDimensions(dimensions.to_owned()));
    }

    Ok((columns, rows))
}
