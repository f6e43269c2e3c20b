// world.rs - ECS World with entity management and iteration

use crate::ecs::entity::SlotBits;
use crate::ecs::storage::{ComponentPool, ErasedPool};
use crate::ecs::{Component, ComponentId, Entity};
use std::collections::HashMap;
use thiserror::Error;

/// Errors returned by fallible world operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WorldError {
    #[error("entity {0} is not alive")]
    DeadEntity(Entity),

    #[error("component id {id} is already used by another type (adding {name})")]
    ComponentIdClash { id: ComponentId, name: &'static str },
}

/// The main ECS world containing all entities and components.
///
/// Entity slots live in an arena; a slot is only recycled (with a bumped
/// generation) during [`World::flush_destroyed`], so live indices never
/// shift while systems are iterating.
pub struct World {
    generations: Vec<u32>,
    alive: SlotBits,
    pending: SlotBits,
    pending_list: Vec<Entity>,
    free: Vec<u32>,
    pools: HashMap<ComponentId, Box<dyn ErasedPool>>,
}

impl World {
    /// Create a new empty world.
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            alive: SlotBits::default(),
            pending: SlotBits::default(),
            pending_list: Vec::new(),
            free: Vec::new(),
            pools: HashMap::new(),
        }
    }

    /// Allocate a fresh entity with no components.
    pub fn create_entity(&mut self) -> Entity {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.generations.push(0);
                (self.generations.len() - 1) as u32
            }
        };
        self.alive.set(index);
        Entity::new(index, self.generations[index as usize])
    }

    /// True while the handle refers to a live entity (including one that is
    /// marked for destruction but not yet flushed).
    pub fn entity_exists(&self, entity: Entity) -> bool {
        self.generations
            .get(entity.index() as usize)
            .is_some_and(|&generation| generation == entity.generation())
            && self.alive.contains(entity.index())
    }

    pub fn is_pending_destroy(&self, entity: Entity) -> bool {
        self.entity_exists(entity) && self.pending.contains(entity.index())
    }

    /// Attach a component, replacing and returning any previous instance.
    pub fn add_component<T: Component>(
        &mut self,
        entity: Entity,
        component: T,
    ) -> Result<Option<T>, WorldError> {
        if !self.entity_exists(entity) {
            return Err(WorldError::DeadEntity(entity));
        }
        Ok(self.pool_mut_or_insert::<T>()?.insert(entity.index(), component))
    }

    /// Get an immutable reference to a component.
    ///
    /// Returns None if the entity is stale or doesn't have the component.
    pub fn get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        if !self.entity_exists(entity) {
            return None;
        }
        self.pool::<T>()?.get(entity.index())
    }

    /// Get a mutable reference to a component.
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.entity_exists(entity) {
            return None;
        }
        self.pool_mut::<T>()?.get_mut(entity.index())
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.get_component::<T>(entity).is_some()
    }

    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Option<T> {
        if !self.entity_exists(entity) {
            return None;
        }
        self.pool_mut::<T>()?.remove(entity.index())
    }

    /// Mark an entity for destruction at the next flush.
    ///
    /// Returns false if the entity is stale or already marked.
    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        if !self.entity_exists(entity) || self.pending.contains(entity.index()) {
            return false;
        }
        self.pending.set(entity.index());
        self.pending_list.push(entity);
        true
    }

    /// Remove every entity marked for destruction from all pools in one
    /// step and recycle their slots. Returns how many were destroyed.
    pub fn flush_destroyed(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending_list);
        let mut destroyed = 0;
        for entity in pending {
            if !self.entity_exists(entity) {
                continue;
            }
            let index = entity.index();
            for pool in self.pools.values_mut() {
                pool.remove_slot(index);
            }
            self.pending.clear(index);
            self.alive.clear(index);
            let generation = &mut self.generations[index as usize];
            *generation = generation.wrapping_add(1);
            self.free.push(index);
            destroyed += 1;
        }
        destroyed
    }

    /// Entities owning every listed component.
    ///
    /// Iteration is driven by the smallest involved pool, so the cost of a
    /// join is proportional to that pool. Missing components yield nothing.
    pub fn query(&self, components: &[ComponentId]) -> Query<'_> {
        let mut pools: Vec<&dyn ErasedPool> = Vec::with_capacity(components.len());
        for id in components {
            match self.pools.get(id) {
                Some(pool) => pools.push(pool.as_ref()),
                None => return Query::empty(self),
            }
        }
        let Some(driver) = pools
            .iter()
            .enumerate()
            .min_by_key(|(_, pool)| pool.len())
            .map(|(i, _)| i)
        else {
            return Query::empty(self);
        };
        let driver = pools.swap_remove(driver);
        Query {
            world: self,
            slots: driver.owner_slots(),
            filters: pools,
            cursor: 0,
        }
    }

    /// First entity owning `T`. Intended for singleton components.
    pub fn single<T: Component>(&self) -> Option<Entity> {
        self.query(&[T::ID]).next()
    }

    /// Number of live entities, including ones pending destruction.
    pub fn live_entity_count(&self) -> usize {
        self.alive.count()
    }

    pub fn component_count<T: Component>(&self) -> usize {
        self.pools.get(&T::ID).map_or(0, |pool| pool.len())
    }

    /// Destroy everything immediately. Old handles become stale.
    pub fn clear(&mut self) {
        for index in 0..self.generations.len() as u32 {
            if self.alive.contains(index) {
                self.generations[index as usize] = self.generations[index as usize].wrapping_add(1);
                self.free.push(index);
            }
        }
        self.alive.reset();
        self.pending.reset();
        self.pending_list.clear();
        self.pools.clear();
    }

    fn pool<T: Component>(&self) -> Option<&ComponentPool<T>> {
        let pool = self.pools.get(&T::ID)?.as_any().downcast_ref::<ComponentPool<T>>();
        debug_assert!(pool.is_some(), "component id {} reused by {}", T::ID, T::NAME);
        pool
    }

    fn pool_mut<T: Component>(&mut self) -> Option<&mut ComponentPool<T>> {
        self.pools
            .get_mut(&T::ID)?
            .as_any_mut()
            .downcast_mut::<ComponentPool<T>>()
    }

    fn pool_mut_or_insert<T: Component>(&mut self) -> Result<&mut ComponentPool<T>, WorldError> {
        self.pools
            .entry(T::ID)
            .or_insert_with(|| Box::new(ComponentPool::<T>::new()))
            .as_any_mut()
            .downcast_mut::<ComponentPool<T>>()
            .ok_or(WorldError::ComponentIdClash {
                id: T::ID,
                name: T::NAME,
            })
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy join over component pools. Created by [`World::query`].
pub struct Query<'w> {
    world: &'w World,
    slots: &'w [u32],
    filters: Vec<&'w dyn ErasedPool>,
    cursor: usize,
}

impl<'w> Query<'w> {
    fn empty(world: &'w World) -> Self {
        Self {
            world,
            slots: &[],
            filters: Vec::new(),
            cursor: 0,
        }
    }
}

impl Iterator for Query<'_> {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        while let Some(&slot) = self.slots.get(self.cursor) {
            self.cursor += 1;
            if self.filters.iter().all(|pool| pool.contains(slot)) {
                let generation = self.world.generations[slot as usize];
                return Some(Entity::new(slot, generation));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.slots.len().saturating_sub(self.cursor)))
    }
}
