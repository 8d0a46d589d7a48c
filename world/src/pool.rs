//! Generational slot storage shared by enemies and projectiles.
//!
//! Released slots are recycled with a bumped generation, so storage is reused
//! once the pool has grown to its working size and stale handles never alias
//! a newer occupant.

use grid_defence_core::{EnemyId, ProjectileId};

/// Handle types that address a pool slot.
pub(crate) trait SlotId: Copy {
    fn from_parts(index: u32, generation: u32) -> Self;
    fn index(&self) -> u32;
    fn generation(&self) -> u32;
}

impl SlotId for EnemyId {
    fn from_parts(index: u32, generation: u32) -> Self {
        EnemyId::new(index, generation)
    }

    fn index(&self) -> u32 {
        EnemyId::index(self)
    }

    fn generation(&self) -> u32 {
        EnemyId::generation(self)
    }
}

impl SlotId for ProjectileId {
    fn from_parts(index: u32, generation: u32) -> Self {
        ProjectileId::new(index, generation)
    }

    fn index(&self) -> u32 {
        ProjectileId::index(self)
    }

    fn generation(&self) -> u32 {
        ProjectileId::generation(self)
    }
}

#[derive(Clone, Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

#[derive(Clone, Debug)]
pub(crate) struct Pool<T, I> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
    _id: std::marker::PhantomData<I>,
}

impl<T, I: SlotId> Pool<T, I> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            _id: std::marker::PhantomData,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Number of slots ever allocated.
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn insert(&mut self, value: T) -> I {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return I::from_parts(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        I::from_parts(index, 0)
    }

    pub(crate) fn get(&self, id: I) -> Option<&T> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.value.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: I) -> Option<&mut T> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.value.as_mut())
    }

    pub(crate) fn contains(&self, id: I) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn remove(&mut self, id: I) -> Option<T> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        self.len -= 1;
        Some(value)
    }

    /// Live entries in slot order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (I::from_parts(index as u32, slot.generation), value))
        })
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (I, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.value
                .as_mut()
                .map(|value| (I::from_parts(index as u32, generation), value))
        })
    }

    /// Appends live handles in slot order to `out`.
    pub(crate) fn collect_ids(&self, out: &mut Vec<I>) {
        out.extend(self.iter().map(|(id, _)| id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_slots_are_reused_with_new_generation() {
        let mut pool: Pool<&str, ProjectileId> = Pool::new();
        let first = pool.insert("a");
        assert_eq!(pool.remove(first), Some("a"));

        let second = pool.insert("b");
        assert_eq!(second.index(), first.index());
        assert_ne!(second.generation(), first.generation());
        assert_eq!(pool.capacity(), 1);
    }

    #[test]
    fn stale_handles_do_not_alias_new_occupants() {
        let mut pool: Pool<u32, EnemyId> = Pool::new();
        let stale = pool.insert(1);
        let _ = pool.remove(stale);
        let fresh = pool.insert(2);

        assert_eq!(pool.get(stale), None);
        assert_eq!(pool.get(fresh), Some(&2));
        assert_eq!(pool.remove(stale), None);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn iteration_follows_slot_order() {
        let mut pool: Pool<char, EnemyId> = Pool::new();
        let a = pool.insert('a');
        let _ = pool.insert('b');
        let _ = pool.remove(a);
        let _ = pool.insert('c');

        let values: Vec<char> = pool.iter().map(|(_, value)| *value).collect();
        assert_eq!(values, vec!['c', 'b']);
    }
}
