//! # Entity-Component Registry
//!
//! A small sparse-set registry: entities are generational handles, each
//! component type gets its own `SparseSet`, and observers can subscribe to the
//! construction and destruction of any component type.
//!
//! ## Hooks
//!
//! Construct hooks run immediately after a component is attached, destroy hooks
//! immediately before it is detached, on the caller's stack. Hooks receive a
//! read-only view of the registry and the affected entity. A destroy hook must
//! not assume that the entity's other components are still attached:
//! `destroy` detaches components one at a time, so only the hook of the first
//! detached component sees the full set.
//!
//! Subscribing returns a `Connection`; the subscription stays active until the
//! connection is passed to [`Registry::disconnect`].

use std::{
    any::{type_name, TypeId},
    collections::HashMap,
    rc::Rc,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use storage::{ErasedStorage, SparseSet};

pub mod entity;
pub mod snapshot;
pub mod storage;

pub use entity::Entity;

/// Anything that can be attached to an entity.
pub trait Component: 'static {}

impl<T: 'static> Component for T {}

/// Observer invoked by the registry on component construction or destruction.
pub type Hook = Rc<dyn Fn(&Registry, Entity)>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("entity {0} is not alive")]
    DeadEntity(Entity),

    #[error("storage registered for component {0} holds a different type")]
    StorageMismatch(&'static str),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
enum HookKind {
    Construct,
    Destroy,
}

/// Handle to an active hook subscription.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Connection {
    component: TypeId,
    kind: HookKind,
    id: u64,
}

#[derive(Default)]
struct Hooks {
    construct: Vec<(u64, Hook)>,
    destroy: Vec<(u64, Hook)>,
}

impl Hooks {
    fn list_mut(&mut self, kind: HookKind) -> &mut Vec<(u64, Hook)> {
        match kind {
            HookKind::Construct => &mut self.construct,
            HookKind::Destroy => &mut self.destroy,
        }
    }
}

/// Liveness record of one entity index, as written to snapshots.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySlot {
    pub generation: u32,
    pub alive: bool,
}

pub struct Registry {
    slots: Vec<EntitySlot>,
    free: Vec<u32>,
    live: usize,
    storages: HashMap<TypeId, Box<dyn ErasedStorage>>,
    hooks: HashMap<TypeId, Hooks>,
    next_connection: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            storages: HashMap::new(),
            hooks: HashMap::new(),
            next_connection: 0,
        }
    }

    /// Creates an entity with no components, recycling a destroyed index if one is free.
    ///
    /// # Panics
    /// Panics when all `u32::MAX` entity indices are in use.
    pub fn create(&mut self) -> Entity {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.alive = true;
            return Entity::new(index, slot.generation);
        }

        assert!(
            self.slots.len() < u32::MAX as usize,
            "entity index space exhausted"
        );
        let index = self.slots.len() as u32;
        self.slots.push(EntitySlot {
            generation: 0,
            alive: true,
        });
        Entity::new(index, 0)
    }

    /// Detaches every component of `entity` and releases its index.
    ///
    /// Returns `false` if the entity was already dead.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }

        let attached: Vec<TypeId> = self
            .storages
            .iter()
            .filter(|(_, storage)| storage.contains(entity))
            .map(|(type_id, _)| *type_id)
            .collect();
        for type_id in attached {
            self.detach(type_id, entity);
        }

        let slot = &mut self.slots[entity.index() as usize];
        slot.alive = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(entity.index());
        self.live -= 1;
        true
    }

    /// Destroys every live entity, firing destroy hooks along the way.
    pub fn clear(&mut self) {
        let alive: Vec<Entity> = self.entities().collect();
        for entity in alive {
            self.destroy(entity);
        }
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.slots
            .get(entity.index() as usize)
            .is_some_and(|slot| slot.alive && slot.generation == entity.generation())
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterates over live entities in index order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.alive)
            .map(|(index, slot)| Entity::new(index as u32, slot.generation))
    }

    /// Attaches `value` to `entity`, then runs the construct hooks of `T`.
    ///
    /// An existing `T` on the entity is detached first (running its destroy
    /// hooks), so observers always see a destroy/construct pair.
    pub fn insert<T: Component>(&mut self, entity: Entity, value: T) -> Result<(), RegistryError> {
        if !self.is_alive(entity) {
            return Err(RegistryError::DeadEntity(entity));
        }

        let type_id = TypeId::of::<T>();
        if self.has::<T>(entity) {
            self.detach(type_id, entity);
        }
        self.storage_mut::<T>()?.insert(entity, value);
        self.fire(type_id, HookKind::Construct, entity);
        Ok(())
    }

    /// Runs the destroy hooks of `T`, then detaches and returns the component.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> Option<T> {
        if !self.has::<T>(entity) {
            return None;
        }
        self.fire(TypeId::of::<T>(), HookKind::Destroy, entity);
        self.storage_mut::<T>().ok()?.remove(entity)
    }

    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.storage::<T>()?.get(entity)
    }

    /// Mutable access to a component. Hooks are not notified of in-place edits.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.storages
            .get_mut(&TypeId::of::<T>())?
            .as_any_mut()
            .downcast_mut::<SparseSet<T>>()?
            .get_mut(entity)
    }

    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.storage::<T>().is_some_and(|s| s.contains(entity))
    }

    pub fn has_both<A: Component, B: Component>(&self, entity: Entity) -> bool {
        self.has::<A>(entity) && self.has::<B>(entity)
    }

    /// Number of entities carrying a `T`.
    pub fn count<T: Component>(&self) -> usize {
        self.storage::<T>().map_or(0, SparseSet::len)
    }

    /// Iterates over every entity carrying a `T`.
    pub fn view<T: Component>(&self) -> impl Iterator<Item = (Entity, &T)> + '_ {
        self.storage::<T>().into_iter().flat_map(SparseSet::iter)
    }

    /// Iterates over every entity carrying both an `A` and a `B`, in the
    /// storage order of `A`.
    pub fn view2<A: Component, B: Component>(
        &self,
    ) -> impl Iterator<Item = (Entity, &A, &B)> + '_ {
        let second = self.storage::<B>();
        self.view::<A>()
            .filter_map(move |(entity, a)| second?.get(entity).map(|b| (entity, a, b)))
    }

    pub fn storage<T: Component>(&self) -> Option<&SparseSet<T>> {
        self.storages
            .get(&TypeId::of::<T>())?
            .as_any()
            .downcast_ref::<SparseSet<T>>()
    }

    /// Subscribes `hook` to every construction of a `T`.
    pub fn on_construct<T: Component>(
        &mut self,
        hook: impl Fn(&Registry, Entity) + 'static,
    ) -> Connection {
        self.connect(TypeId::of::<T>(), HookKind::Construct, Rc::new(hook))
    }

    /// Subscribes `hook` to every destruction of a `T`.
    pub fn on_destroy<T: Component>(
        &mut self,
        hook: impl Fn(&Registry, Entity) + 'static,
    ) -> Connection {
        self.connect(TypeId::of::<T>(), HookKind::Destroy, Rc::new(hook))
    }

    /// Releases a subscription. Returns `false` if it was already released.
    pub fn disconnect(&mut self, connection: Connection) -> bool {
        let Some(hooks) = self.hooks.get_mut(&connection.component) else {
            return false;
        };
        let list = hooks.list_mut(connection.kind);
        let before = list.len();
        list.retain(|(id, _)| *id != connection.id);
        list.len() != before
    }

    /// Number of active subscriptions across all component types.
    pub fn connection_count(&self) -> usize {
        self.hooks
            .values()
            .map(|hooks| hooks.construct.len() + hooks.destroy.len())
            .sum()
    }

    pub(crate) fn slots(&self) -> &[EntitySlot] {
        &self.slots
    }

    /// Replaces the entity table with `slots`, dropping every component.
    ///
    /// Existing entities are destroyed first, so observers see them go.
    pub(crate) fn restore_slots(&mut self, slots: Vec<EntitySlot>) {
        self.clear();
        for storage in self.storages.values_mut() {
            storage.clear();
        }

        self.free = slots
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, slot)| !slot.alive)
            .map(|(index, _)| index as u32)
            .collect();
        self.live = slots.iter().filter(|slot| slot.alive).count();
        self.slots = slots;
    }

    fn connect(&mut self, component: TypeId, kind: HookKind, hook: Hook) -> Connection {
        let id = self.next_connection;
        self.next_connection += 1;
        self.hooks
            .entry(component)
            .or_default()
            .list_mut(kind)
            .push((id, hook));
        Connection {
            component,
            kind,
            id,
        }
    }

    fn fire(&self, component: TypeId, kind: HookKind, entity: Entity) {
        let Some(hooks) = self.hooks.get(&component) else {
            return;
        };
        let list = match kind {
            HookKind::Construct => &hooks.construct,
            HookKind::Destroy => &hooks.destroy,
        };
        for (_, hook) in list {
            hook(self, entity);
        }
    }

    fn detach(&mut self, component: TypeId, entity: Entity) {
        self.fire(component, HookKind::Destroy, entity);
        if let Some(storage) = self.storages.get_mut(&component) {
            storage.remove_entity(entity);
        }
    }

    fn storage_mut<T: Component>(&mut self) -> Result<&mut SparseSet<T>, RegistryError> {
        self.storages
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(SparseSet::<T>::new()))
            .as_any_mut()
            .downcast_mut::<SparseSet<T>>()
            .ok_or(RegistryError::StorageMismatch(type_name::<T>()))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
