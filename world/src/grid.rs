//! Cell classification for a level.

use grid_defence_core::{CellCoord, CellKind, CellRect};

/// Manhattan distance from the route within which cells become buildable.
pub const BUILDABLE_RADIUS: u32 = 2;

/// Longest side, in cells, a grid may have.
pub const MAX_GRID_SIDE: u32 = 4096;

/// Cell grid with a distinguished playable rectangle.
///
/// Cells outside the playable rectangle are decorative padding. Inside it,
/// route cells are [`CellKind::Path`], cells near the route are
/// [`CellKind::Buildable`] and everything else is [`CellKind::Blocked`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridModel {
    columns: u32,
    rows: u32,
    playable: CellRect,
    cells: Vec<CellKind>,
}

impl GridModel {
    /// Builds the grid by classifying every cell against a fixed route.
    #[must_use]
    pub fn from_route(columns: u32, rows: u32, playable: CellRect, route: &[CellCoord]) -> Self {
        Self {
            columns,
            rows,
            playable,
            cells: derive_cells(columns, rows, playable, route),
        }
    }

    /// Rebuilds a grid from the playable region's cells in row-major order.
    ///
    /// Returns `None` when the cell count does not match the playable
    /// rectangle, the rectangle does not fit the grid, or a side exceeds
    /// [`MAX_GRID_SIDE`].
    #[must_use]
    pub fn from_playable_cells(
        columns: u32,
        rows: u32,
        playable: CellRect,
        playable_cells: &[CellKind],
    ) -> Option<Self> {
        if columns > MAX_GRID_SIDE || rows > MAX_GRID_SIDE {
            return None;
        }
        let size = playable.size();
        let end_column = playable.origin().column().checked_add(size.width())?;
        let end_row = playable.origin().row().checked_add(size.height())?;
        if end_column > columns || end_row > rows {
            return None;
        }
        if playable_cells.len() != size.width() as usize * size.height() as usize {
            return None;
        }
        if playable_cells.contains(&CellKind::Decorative) {
            return None;
        }

        let mut cells = vec![CellKind::Decorative; columns as usize * rows as usize];
        for (offset, kind) in playable_cells.iter().enumerate() {
            let column = playable.origin().column() + (offset as u32 % size.width());
            let row = playable.origin().row() + (offset as u32 / size.width());
            cells[row as usize * columns as usize + column as usize] = *kind;
        }

        Some(Self {
            columns,
            rows,
            playable,
            cells,
        })
    }

    /// Grid width in cells, including padding.
    #[must_use]
    pub fn columns(&self) -> u32 {
        self.columns
    }

    /// Grid height in cells, including padding.
    #[must_use]
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Playable rectangle.
    #[must_use]
    pub fn playable(&self) -> CellRect {
        self.playable
    }

    /// Every cell in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[CellKind] {
        &self.cells
    }

    /// Cells of the playable rectangle in row-major order.
    #[must_use]
    pub fn playable_cells(&self) -> Vec<CellKind> {
        let mut cells = Vec::with_capacity(
            self.playable.size().width() as usize * self.playable.size().height() as usize,
        );
        for row in self.playable.origin().row()..self.playable.end_row() {
            for column in self.playable.origin().column()..self.playable.end_column() {
                cells.push(self.cells[self.offset(column, row)]);
            }
        }
        cells
    }

    /// Kind of the cell, or `None` outside the grid.
    #[must_use]
    pub fn kind(&self, cell: CellCoord) -> Option<CellKind> {
        self.contains(cell)
            .then(|| self.cells[self.offset(cell.column(), cell.row())])
    }

    /// Reports whether the cell lies on the grid.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    fn offset(&self, column: u32, row: u32) -> usize {
        row as usize * self.columns as usize + column as usize
    }
}

/// Classifies every cell of a grid against a route.
///
/// Route cells take precedence over buildable marking, and the result
/// depends on nothing but the arguments.
#[must_use]
pub fn derive_cells(
    columns: u32,
    rows: u32,
    playable: CellRect,
    route: &[CellCoord],
) -> Vec<CellKind> {
    let offset = |cell: CellCoord| cell.row() as usize * columns as usize + cell.column() as usize;
    let mut cells = vec![CellKind::Decorative; columns as usize * rows as usize];

    for row in playable.origin().row()..playable.end_row().min(rows) {
        for column in playable.origin().column()..playable.end_column().min(columns) {
            cells[offset(CellCoord::new(column, row))] = CellKind::Blocked;
        }
    }

    for cell in route {
        if playable.contains(*cell) && cell.column() < columns && cell.row() < rows {
            cells[offset(*cell)] = CellKind::Path;
        }
    }

    let radius = BUILDABLE_RADIUS as i64;
    for cell in route {
        for dy in -radius..=radius {
            let span = radius - dy.abs();
            for dx in -span..=span {
                let column = i64::from(cell.column()) + dx;
                let row = i64::from(cell.row()) + dy;
                if column < 0 || row < 0 {
                    continue;
                }
                let neighbor = CellCoord::new(column as u32, row as u32);
                if !playable.contains(neighbor) || neighbor.column() >= columns || neighbor.row() >= rows {
                    continue;
                }
                let index = offset(neighbor);
                if cells[index] == CellKind::Blocked {
                    cells[index] = CellKind::Buildable;
                }
            }
        }
    }

    cells
}
