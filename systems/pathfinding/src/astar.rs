//! Grid A* over a walkability mask.

use std::{cmp::Reverse, collections::BinaryHeap};

use grid_defence_core::CellCoord;

/// Dense walkability mask in row-major order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalkGrid {
    columns: u32,
    rows: u32,
    walkable: Vec<bool>,
}

impl WalkGrid {
    /// Builds a mask by evaluating `is_walkable` for every cell.
    #[must_use]
    pub fn from_fn(columns: u32, rows: u32, mut is_walkable: impl FnMut(CellCoord) -> bool) -> Self {
        let mut walkable = Vec::with_capacity(columns as usize * rows as usize);
        for row in 0..rows {
            for column in 0..columns {
                walkable.push(is_walkable(CellCoord::new(column, row)));
            }
        }
        Self {
            columns,
            rows,
            walkable,
        }
    }

    /// Grid width in cells.
    #[must_use]
    pub fn columns(&self) -> u32 {
        self.columns
    }

    /// Grid height in cells.
    #[must_use]
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Reports whether the cell exists and may be walked on.
    #[must_use]
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .and_then(|index| self.walkable.get(index).copied())
            .unwrap_or(false)
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() >= self.columns || cell.row() >= self.rows {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        row.checked_mul(self.columns as usize)?.checked_add(column)
    }

    fn coord(&self, index: usize) -> CellCoord {
        let columns = self.columns as usize;
        CellCoord::new((index % columns) as u32, (index / columns) as u32)
    }
}

/// Shortest four-neighbour route from `start` to `goal`.
///
/// The start cell is always expanded, even when it is no longer walkable, so an
/// enemy standing on a freshly blocked cell can still leave it. Returns `None`
/// when the goal is unreachable.
#[must_use]
pub fn solve(grid: &WalkGrid, start: CellCoord, goal: CellCoord) -> Option<Vec<CellCoord>> {
    let start_index = grid.index(start)?;
    let goal_index = grid.index(goal)?;
    if start_index == goal_index {
        return Some(vec![start]);
    }
    if !grid.is_walkable(goal) {
        return None;
    }

    let cell_count = grid.walkable.len();
    let mut best_cost = vec![u32::MAX; cell_count];
    let mut came_from = vec![usize::MAX; cell_count];
    let mut open: BinaryHeap<Reverse<(u32, u32, usize)>> = BinaryHeap::new();

    best_cost[start_index] = 0;
    open.push(Reverse((start.manhattan_distance(goal), 0, start_index)));

    while let Some(Reverse((_, cost, index))) = open.pop() {
        if index == goal_index {
            return Some(reconstruct(grid, &came_from, goal_index));
        }
        if cost > best_cost[index] {
            continue;
        }

        let cell = grid.coord(index);
        for neighbor in neighbors(cell, grid.columns, grid.rows) {
            if !grid.is_walkable(neighbor) {
                continue;
            }
            let Some(neighbor_index) = grid.index(neighbor) else {
                continue;
            };

            let next_cost = cost + 1;
            if next_cost >= best_cost[neighbor_index] {
                continue;
            }
            best_cost[neighbor_index] = next_cost;
            came_from[neighbor_index] = index;
            open.push(Reverse((
                next_cost + neighbor.manhattan_distance(goal),
                next_cost,
                neighbor_index,
            )));
        }
    }

    None
}

/// Like [`solve`], but degrades to the two-point line `[start, goal]` when no
/// route exists so callers always have something to follow.
#[must_use]
pub fn find_route(grid: &WalkGrid, start: CellCoord, goal: CellCoord) -> Vec<CellCoord> {
    solve(grid, start, goal).unwrap_or_else(|| vec![start, goal])
}

fn reconstruct(grid: &WalkGrid, came_from: &[usize], goal_index: usize) -> Vec<CellCoord> {
    let mut indices = vec![goal_index];
    let mut current = goal_index;
    while let Some(&previous) = came_from.get(current) {
        if previous == usize::MAX {
            break;
        }
        indices.push(previous);
        current = previous;
    }
    indices.reverse();
    indices.into_iter().map(|index| grid.coord(index)).collect()
}

fn neighbors(cell: CellCoord, width: u32, height: u32) -> impl Iterator<Item = CellCoord> {
    let mut candidates = [None; 4];
    let mut count = 0;

    if let Some(row) = cell.row().checked_sub(1) {
        candidates[count] = Some(CellCoord::new(cell.column(), row));
        count += 1;
    }
    if cell.column() + 1 < width {
        candidates[count] = Some(CellCoord::new(cell.column() + 1, cell.row()));
        count += 1;
    }
    if cell.row() + 1 < height {
        candidates[count] = Some(CellCoord::new(cell.column(), cell.row() + 1));
        count += 1;
    }
    if let Some(column) = cell.column().checked_sub(1) {
        candidates[count] = Some(CellCoord::new(column, cell.row()));
    }

    candidates.into_iter().flatten()
}
