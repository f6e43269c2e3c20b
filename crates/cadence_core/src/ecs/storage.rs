// storage.rs - Sparse-set component pools
//
// Each component type gets one pool. Values are packed densely for
// iteration; a sparse table maps entity slot -> dense row. Removal is a
// swap-remove, so dense rows move but entity slots never do.

use crate::ecs::{Component, ComponentMeta};
use std::any::Any;

const EMPTY: u32 = u32::MAX;

/// Storage for every instance of one component type.
pub struct ComponentPool<T: Component> {
    dense: Vec<T>,
    owners: Vec<u32>,
    sparse: Vec<u32>,
}

impl<T: Component> ComponentPool<T> {
    pub fn new() -> Self {
        Self {
            dense: Vec::new(),
            owners: Vec::new(),
            sparse: Vec::new(),
        }
    }

    /// Insert or replace the component for `slot`, returning the previous value.
    pub fn insert(&mut self, slot: u32, value: T) -> Option<T> {
        if let Some(row) = self.row_of(slot) {
            return Some(std::mem::replace(&mut self.dense[row], value));
        }
        let idx = slot as usize;
        if idx >= self.sparse.len() {
            self.sparse.resize(idx + 1, EMPTY);
        }
        self.sparse[idx] = self.dense.len() as u32;
        self.dense.push(value);
        self.owners.push(slot);
        None
    }

    pub fn remove(&mut self, slot: u32) -> Option<T> {
        let row = self.row_of(slot)?;
        let last_owner = *self.owners.last()?;
        self.sparse[last_owner as usize] = row as u32;
        self.sparse[slot as usize] = EMPTY;
        self.owners.swap_remove(row);
        Some(self.dense.swap_remove(row))
    }

    pub fn get(&self, slot: u32) -> Option<&T> {
        self.row_of(slot).map(|row| &self.dense[row])
    }

    pub fn get_mut(&mut self, slot: u32) -> Option<&mut T> {
        self.row_of(slot).map(move |row| &mut self.dense[row])
    }

    /// Entity slots owning a value, in dense order.
    pub fn owners(&self) -> &[u32] {
        &self.owners
    }

    pub fn values(&self) -> &[T] {
        &self.dense
    }

    #[inline]
    fn row_of(&self, slot: u32) -> Option<usize> {
        match self.sparse.get(slot as usize) {
            Some(&row) if row != EMPTY => Some(row as usize),
            _ => None,
        }
    }
}

impl<T: Component> Default for ComponentPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased view of a pool, used for joins and bulk removal.
pub trait ErasedPool: Any {
    fn meta(&self) -> ComponentMeta;
    fn contains(&self, slot: u32) -> bool;
    fn remove_slot(&mut self, slot: u32) -> bool;
    fn owner_slots(&self) -> &[u32];
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedPool for ComponentPool<T> {
    fn meta(&self) -> ComponentMeta {
        T::meta()
    }

    fn contains(&self, slot: u32) -> bool {
        self.row_of(slot).is_some()
    }

    fn remove_slot(&mut self, slot: u32) -> bool {
        self.remove(slot).is_some()
    }

    fn owner_slots(&self) -> &[u32] {
        &self.owners
    }

    fn len(&self) -> usize {
        self.dense.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define_component;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Score(u32);
    define_component!(Score, 900, "Score");

    #[test]
    fn swap_remove_keeps_lookup_consistent() {
        let mut pool = ComponentPool::<Score>::new();
        pool.insert(3, Score(30));
        pool.insert(7, Score(70));
        pool.insert(1, Score(10));

        assert_eq!(pool.remove(3), Some(Score(30)));
        // slot 1 moved into row 0
        assert_eq!(pool.get(1), Some(&Score(10)));
        assert_eq!(pool.get(7), Some(&Score(70)));
        assert_eq!(pool.get(3), None);
        assert_eq!(pool.len(), 2);

        assert_eq!(pool.remove(1), Some(Score(10)));
        assert_eq!(pool.remove(7), Some(Score(70)));
        assert!(ErasedPool::is_empty(&pool));
        assert_eq!(pool.remove(7), None);
    }

    #[test]
    fn insert_replaces_existing_value() {
        let mut pool = ComponentPool::<Score>::new();
        assert_eq!(pool.insert(2, Score(1)), None);
        assert_eq!(pool.insert(2, Score(5)), Some(Score(1)));
        assert_eq!(pool.owners(), &[2]);
        if let Some(score) = pool.get_mut(2) {
            score.0 += 1;
        }
        assert_eq!(pool.values(), &[Score(6)]);
    }
}
