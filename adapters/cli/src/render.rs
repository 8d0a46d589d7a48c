//! Text rendering of frame snapshots.

use std::fmt::Write as _;

use grid_defence_core::{CellCoord, CellKind, FrameSnapshot};

const ENTRY_GLYPH: char = 'S';
const EXIT_GLYPH: char = 'E';
const PROJECTILE_GLYPH: char = '*';

fn cell_glyph(kind: CellKind) -> char {
    match kind {
        CellKind::Decorative => ' ',
        CellKind::Blocked => '.',
        CellKind::Buildable => '+',
        CellKind::Path => '=',
    }
}

/// Draws the snapshot one character per cell, followed by a status line.
///
/// Towers are drawn over enemies, enemies over projectiles, and projectiles
/// over the route endpoints and terrain.
pub(crate) fn ascii(snapshot: &FrameSnapshot) -> String {
    let columns = snapshot.columns as usize;
    let rows = snapshot.rows as usize;
    let mut canvas: Vec<char> = snapshot.cells.iter().copied().map(cell_glyph).collect();
    canvas.resize(columns * rows, ' ');

    let mut plot = |cell: CellCoord, glyph: char| {
        let (column, row) = (cell.column() as usize, cell.row() as usize);
        if column < columns && row < rows {
            canvas[row * columns + column] = glyph;
        }
    };

    if let Some(entry) = snapshot.route.first() {
        plot(*entry, ENTRY_GLYPH);
    }
    if let Some(exit) = snapshot.route.last() {
        plot(*exit, EXIT_GLYPH);
    }
    for projectile in &snapshot.projectiles {
        if let Some(cell) = world_to_cell(projectile.position.x, projectile.position.y) {
            plot(cell, PROJECTILE_GLYPH);
        }
    }
    for enemy in &snapshot.enemies {
        if let Some(cell) = world_to_cell(enemy.position.x, enemy.position.y) {
            plot(cell, enemy.kind.glyph());
        }
    }
    for tower in &snapshot.towers {
        plot(tower.cell, tower.kind.glyph());
    }

    let mut out = String::with_capacity((columns + 1) * rows + 64);
    for line in canvas.chunks(columns.max(1)) {
        out.extend(line.iter().copied());
        out.truncate(out.trim_end_matches(' ').len());
        out.push('\n');
    }
    let _ = writeln!(
        out,
        "wave {}  gold {}  lives {}  score {}  enemies {}",
        snapshot.wave,
        snapshot.gold,
        snapshot.lives,
        snapshot.score,
        snapshot.enemies.len()
    );
    out
}

fn world_to_cell(x: f32, y: f32) -> Option<CellCoord> {
    if !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 {
        return None;
    }
    Some(CellCoord::new(x.floor() as u32, y.floor() as u32))
}
