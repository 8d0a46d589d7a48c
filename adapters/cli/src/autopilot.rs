//! Scripted player for headless runs.

use std::collections::HashSet;

use grid_defence_core::{
    CellCoord, CellKind, FiringMode, FrameSnapshot, SessionStatus, TowerKind, FIXED_TICK,
    MAX_TOWER_LEVEL,
};
use grid_defence_simulation::Simulation;
use grid_defence_world::query;
use tracing::{debug, info, warn};

/// Kinds the autopilot cycles through when building.
const BUILD_ORDER: [TowerKind; 8] = [
    TowerKind::Arrow,
    TowerKind::Cannon,
    TowerKind::Frost,
    TowerKind::Tesla,
    TowerKind::Arrow,
    TowerKind::Laser,
    TowerKind::Amplifier,
    TowerKind::Multishot,
];

/// Frames after which a wave is abandoned, as a guard against stalled waves.
const MAX_FRAMES_PER_WAVE: u32 = 60 * 60 * 10;

/// Outcome of a headless run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Report {
    pub(crate) waves_completed: u32,
    pub(crate) ticks: u64,
    pub(crate) gold: u32,
    pub(crate) lives: u32,
    pub(crate) score: u64,
    pub(crate) towers: usize,
    pub(crate) status: SessionStatus,
}

/// Plays up to `waves` waves, spending gold before each one.
///
/// Real time is fed one fixed tick per frame, so the speed multiplier decides
/// how many logical ticks each frame runs. `after_wave` sees the session once
/// each wave is over.
pub(crate) fn play(
    simulation: &mut Simulation,
    waves: u32,
    mut after_wave: impl FnMut(&Simulation),
) -> Report {
    let mut ticks = 0_u64;

    for _ in 0..waves {
        let built = fortify(simulation);
        let wave = match simulation.start_wave() {
            Ok(wave) => wave,
            Err(reason) => {
                warn!(%reason, "wave not started");
                break;
            }
        };
        info!(wave, built, "autopilot started wave");

        let mut frames = 0;
        while query::wave_in_progress(simulation.world())
            && simulation.status() == SessionStatus::Running
            && frames < MAX_FRAMES_PER_WAVE
        {
            ticks += u64::from(simulation.advance(FIXED_TICK));
            frames += 1;
        }
        if frames == MAX_FRAMES_PER_WAVE {
            warn!(wave, "wave did not finish in time, stopping");
            break;
        }

        after_wave(simulation);
        if simulation.status() == SessionStatus::GameOver {
            break;
        }
    }

    let world = simulation.world();
    Report {
        waves_completed: query::waves_completed(world),
        ticks,
        gold: query::gold(world),
        lives: query::lives(world),
        score: query::score(world),
        towers: query::tower_view(world).iter().count(),
        status: simulation.status(),
    }
}

/// Builds and upgrades towers until the gold runs out. Returns the number of
/// towers built.
pub(crate) fn fortify(simulation: &mut Simulation) -> usize {
    let mut built = 0;
    loop {
        let snapshot = simulation.snapshot();
        let kind = BUILD_ORDER[snapshot.towers.len() % BUILD_ORDER.len()];
        if kind.build_cost() > snapshot.gold {
            break;
        }
        let Some(site) = best_site(&snapshot, kind) else {
            break;
        };
        match simulation.build_tower(kind, site) {
            Ok(_) => built += 1,
            Err(reason) => {
                debug!(%reason, ?site, ?kind, "autopilot build refused");
                break;
            }
        }
    }

    let mut towers = simulation.snapshot().towers;
    towers.sort_by(|left, right| right.kills.cmp(&left.kills).then(left.id.cmp(&right.id)));
    for tower in towers.iter().filter(|tower| tower.level < MAX_TOWER_LEVEL) {
        let Some(cost) = tower.kind.upgrade_cost(tower.level) else {
            continue;
        };
        if cost > query::gold(simulation.world()) {
            break;
        }
        if let Err(reason) = simulation.upgrade_tower(tower.cell) {
            debug!(%reason, cell = ?tower.cell, "autopilot upgrade refused");
        }
    }

    built
}

/// Free buildable cell covering the most route cells, or for support kinds the
/// most towers. Ties go to the first cell in row-major order.
fn best_site(snapshot: &FrameSnapshot, kind: TowerKind) -> Option<CellCoord> {
    let stats = kind.stats_at(1);
    let reach = stats.range * stats.range;
    let occupied: HashSet<CellCoord> = snapshot.towers.iter().map(|tower| tower.cell).collect();
    let columns = snapshot.columns.max(1);

    let mut best: Option<(usize, CellCoord)> = None;
    for (offset, cell_kind) in snapshot.cells.iter().enumerate() {
        if *cell_kind != CellKind::Buildable {
            continue;
        }
        let offset = offset as u32;
        let cell = CellCoord::new(offset % columns, offset / columns);
        if occupied.contains(&cell) {
            continue;
        }

        let center = cell.center();
        let coverage = if stats.mode == FiringMode::Support {
            snapshot
                .towers
                .iter()
                .filter(|tower| tower.position().distance_squared(center) <= reach)
                .count()
        } else {
            snapshot
                .route
                .iter()
                .filter(|step| step.center().distance_squared(center) <= reach)
                .count()
        };
        if coverage > best.map_or(0, |(score, _)| score) {
            best = Some((coverage, cell));
        }
    }

    best.map(|(_, cell)| cell)
}
