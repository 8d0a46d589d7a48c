//! Session configuration.

use grid_defence_core::{CellCoord, CellRect, CellRectSize};
use grid_defence_system_path_generation as path_generation;
use grid_defence_system_pathfinding::Mode;
use grid_defence_system_wave_generation as wave_generation;
use grid_defence_world::{Economy, MAX_GRID_SIDE};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Smallest playable side length a level is generated on.
pub const MIN_PLAYABLE_SIDE: u32 = 8;
/// Largest playable side; larger configured sizes are clamped.
pub const MAX_PLAYABLE_SIDE: u32 = MAX_GRID_SIDE / 2;
/// Largest decorative padding on each side.
pub const MAX_PADDING: u32 = MAX_GRID_SIDE / 4;

/// Everything needed to start a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for level layout and wave spawn order.
    pub seed: u64,
    /// Playable width in cells.
    pub columns: u32,
    /// Playable height in cells.
    pub rows: u32,
    /// Decorative cells surrounding the playable rectangle on every side.
    pub padding: u32,
    /// Route entry in grid coordinates. Defaults to the middle of the left edge.
    pub entry: Option<CellCoord>,
    /// Route exit in grid coordinates. Defaults to the middle of the right edge.
    pub exit: Option<CellCoord>,
    /// Route carving tunables.
    pub path: path_generation::Config,
    /// Gold the session starts with.
    pub gold: u32,
    /// Lives the session starts with.
    pub lives: u32,
    /// Where route recomputation runs.
    pub pathfinding: Mode,
    /// Wave composition tunables.
    pub waves: wave_generation::Config,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let economy = Economy::default();
        Self {
            seed: 0x00c0_ffee,
            columns: 64,
            rows: 64,
            padding: 2,
            entry: None,
            exit: None,
            path: path_generation::Config::default(),
            gold: economy.gold,
            lives: economy.lives,
            pathfinding: Mode::default(),
            waves: wave_generation::Config::default(),
        }
    }
}

impl SimulationConfig {
    /// Playable rectangle inside the padding.
    #[must_use]
    pub fn playable(&self) -> CellRect {
        CellRect::from_origin_and_size(
            CellCoord::new(self.padding(), self.padding()),
            CellRectSize::new(
                self.columns.clamp(MIN_PLAYABLE_SIDE, MAX_PLAYABLE_SIDE),
                self.rows.clamp(MIN_PLAYABLE_SIDE, MAX_PLAYABLE_SIDE),
            ),
        )
    }

    /// Full grid size including padding.
    #[must_use]
    pub fn grid_size(&self) -> (u32, u32) {
        let playable = self.playable();
        (
            playable.end_column() + self.padding(),
            playable.end_row() + self.padding(),
        )
    }

    fn padding(&self) -> u32 {
        self.padding.min(MAX_PADDING)
    }

    /// Starting gold and lives.
    #[must_use]
    pub fn economy(&self) -> Economy {
        Economy {
            gold: self.gold,
            lives: self.lives.max(1),
        }
    }

    /// Entry and exit cells, falling back to the defaults when a configured
    /// cell lies outside the playable rectangle or both coincide.
    #[must_use]
    pub fn endpoints(&self) -> (CellCoord, CellCoord) {
        let playable = self.playable();
        let middle = playable.origin().row() + playable.size().height() / 2;
        let default_entry = CellCoord::new(playable.origin().column(), middle);
        let default_exit = CellCoord::new(playable.end_column() - 1, middle);

        let entry = self.entry.unwrap_or(default_entry);
        let exit = self.exit.unwrap_or(default_exit);
        if entry == exit || !playable.contains(entry) || !playable.contains(exit) {
            warn!(?entry, ?exit, "configured endpoints unusable, using defaults");
            return (default_entry, default_exit);
        }
        (entry, exit)
    }
}
