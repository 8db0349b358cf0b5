//! Sparse-set component storage.
//!
//! Components of one type live in a dense array next to the entities that own
//! them; a sparse array maps entity indices to dense positions. Insertion,
//! removal and lookup are O(1), and iteration walks the dense array.

use std::any::Any;

use super::entity::Entity;

pub struct SparseSet<T> {
    sparse: Vec<Option<usize>>,
    entities: Vec<Entity>,
    data: Vec<T>,
}

impl<T> SparseSet<T> {
    pub fn new() -> Self {
        Self {
            sparse: Vec::new(),
            entities: Vec::new(),
            data: Vec::new(),
        }
    }

    fn dense_index(&self, entity: Entity) -> Option<usize> {
        let dense = (*self.sparse.get(entity.index() as usize)?)?;
        (self.entities[dense] == entity).then_some(dense)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.dense_index(entity).is_some()
    }

    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.dense_index(entity).map(|dense| &self.data[dense])
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.dense_index(entity).map(|dense| &mut self.data[dense])
    }

    /// Inserts a component. The entity must not already own one.
    pub fn insert(&mut self, entity: Entity, value: T) {
        let index = entity.index() as usize;
        if index >= self.sparse.len() {
            self.sparse.resize(index + 1, None);
        }
        self.sparse[index] = Some(self.entities.len());
        self.entities.push(entity);
        self.data.push(value);
    }

    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let dense = self.dense_index(entity)?;
        self.sparse[entity.index() as usize] = None;
        self.entities.swap_remove(dense);
        let value = self.data.swap_remove(dense);
        if let Some(moved) = self.entities.get(dense) {
            self.sparse[moved.index() as usize] = Some(dense);
        }
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.entities.iter().copied().zip(self.data.iter())
    }

    pub fn clear(&mut self) {
        self.sparse.clear();
        self.entities.clear();
        self.data.clear();
    }
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased view of a `SparseSet`, so the registry can hold storages of
/// every component type in one map.
pub(crate) trait ErasedStorage {
    fn contains(&self, entity: Entity) -> bool;
    fn remove_entity(&mut self, entity: Entity) -> bool;
    fn clear(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> ErasedStorage for SparseSet<T> {
    fn contains(&self, entity: Entity) -> bool {
        SparseSet::contains(self, entity)
    }

    fn remove_entity(&mut self, entity: Entity) -> bool {
        self.remove(entity).is_some()
    }

    fn clear(&mut self) {
        SparseSet::clear(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
