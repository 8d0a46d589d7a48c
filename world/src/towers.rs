//! Authoritative tower state management utilities.

use std::{collections::BTreeMap, time::Duration};

use grid_defence_core::{CellCoord, TowerId, TowerKind, TowerSnapshot, MIN_TOWER_LEVEL, SELL_REFUND_PERCENT};

/// State of a tower stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct TowerState {
    pub(crate) id: TowerId,
    pub(crate) kind: TowerKind,
    pub(crate) cell: CellCoord,
    pub(crate) level: u8,
    pub(crate) kills: u32,
    pub(crate) invested: u32,
    pub(crate) ready_in: Duration,
}

impl TowerState {
    pub(crate) fn snapshot(&self) -> TowerSnapshot {
        TowerSnapshot {
            id: self.id,
            kind: self.kind,
            cell: self.cell,
            level: self.level,
            kills: self.kills,
            invested: self.invested,
            ready_in: self.ready_in,
        }
    }

    /// Gold returned when the tower is sold.
    pub(crate) fn refund(&self) -> u32 {
        self.invested * SELL_REFUND_PERCENT / 100
    }
}

/// Registry that stores towers and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct TowerRegistry {
    entries: BTreeMap<TowerId, TowerState>,
    by_cell: BTreeMap<CellCoord, TowerId>,
    next_tower_id: TowerId,
}

impl TowerRegistry {
    /// Creates an empty tower registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            by_cell: BTreeMap::new(),
            next_tower_id: TowerId::new(0),
        }
    }

    pub(crate) fn insert(
        &mut self,
        kind: TowerKind,
        cell: CellCoord,
        level: u8,
        kills: u32,
        invested: u32,
    ) -> TowerId {
        let id = self.next_tower_id;
        self.next_tower_id = TowerId::new(id.get() + 1);
        let _ = self.by_cell.insert(cell, id);
        let _ = self.entries.insert(
            id,
            TowerState {
                id,
                kind,
                cell,
                level: level.max(MIN_TOWER_LEVEL),
                kills,
                invested,
                ready_in: Duration::ZERO,
            },
        );
        id
    }

    pub(crate) fn remove_at(&mut self, cell: CellCoord) -> Option<TowerState> {
        let id = self.by_cell.remove(&cell)?;
        self.entries.remove(&id)
    }

    pub(crate) fn at(&self, cell: CellCoord) -> Option<&TowerState> {
        self.by_cell.get(&cell).and_then(|id| self.entries.get(id))
    }

    pub(crate) fn at_mut(&mut self, cell: CellCoord) -> Option<&mut TowerState> {
        let id = *self.by_cell.get(&cell)?;
        self.entries.get_mut(&id)
    }

    pub(crate) fn get(&self, id: TowerId) -> Option<&TowerState> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: TowerId) -> Option<&mut TowerState> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn is_occupied(&self, cell: CellCoord) -> bool {
        self.by_cell.contains_key(&cell)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &TowerState> {
        self.entries.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut TowerState> {
        self.entries.values_mut()
    }

    pub(crate) fn count_kind(&self, kind: TowerKind) -> usize {
        self.entries.values().filter(|tower| tower.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_allocates_sequential_identifiers() {
        let mut registry = TowerRegistry::new();
        let first = registry.insert(TowerKind::Arrow, CellCoord::new(1, 1), 1, 0, 60);
        let second = registry.insert(TowerKind::Frost, CellCoord::new(2, 1), 1, 0, 80);

        assert_eq!(first, TowerId::new(0));
        assert_eq!(second, TowerId::new(1));
        assert_eq!(registry.iter().count(), 2);
        assert!(registry.is_occupied(CellCoord::new(2, 1)));
    }

    #[test]
    fn removing_frees_the_cell() {
        let mut registry = TowerRegistry::new();
        let _ = registry.insert(TowerKind::Arrow, CellCoord::new(4, 4), 1, 0, 60);

        let removed = registry.remove_at(CellCoord::new(4, 4)).expect("tower present");
        assert_eq!(removed.kind, TowerKind::Arrow);
        assert!(!registry.is_occupied(CellCoord::new(4, 4)));
        assert!(registry.get(removed.id).is_none());
    }

    #[test]
    fn refund_rounds_down() {
        let state = TowerState {
            id: TowerId::new(0),
            kind: TowerKind::Arrow,
            cell: CellCoord::new(0, 0),
            level: 2,
            kills: 0,
            invested: 125,
            ready_in: Duration::ZERO,
        };
        assert_eq!(state.refund(), 87);
    }
}
