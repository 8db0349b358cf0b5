//! CPU-side instance arrays, one pair per block type.
//!
//! Each block type owns a `models` and a `normals` array of equal length, one
//! slot per entity carrying both a `Position` and that `BlockType`. Slots are an
//! unordered set over a backing array: removal swaps the last slot into the
//! hole, so render order says nothing about insertion order. Callers should
//! address slots by index only for the duration of one operation.

use std::collections::HashMap;

use cgmath::Matrix4;

use crate::engine_state::{
    registry::Entity,
    voxels::{
        block::{block_type::BlockType, BlockTypeMap},
        components::Position,
    },
};

use super::instance::{InstanceModel, InstanceNormal};

/// Outcome of removing an entity's slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Removal {
    /// The last slot was moved into `index`; that slot changed contents.
    Moved(usize),
    /// The removed slot was the last one; the arrays only shrank.
    Popped,
}

#[derive(Default)]
struct TypeInstances {
    models: Vec<InstanceModel>,
    normals: Vec<InstanceNormal>,
    /// Entity occupying each slot, parallel to `models`.
    owners: Vec<Entity>,
    /// Back-reference from entity to its slot.
    slots: HashMap<Entity, usize>,
}

impl TypeInstances {
    fn push(&mut self, entity: Entity, position: Position) -> Option<usize> {
        if self.slots.contains_key(&entity) {
            return None;
        }
        let index = self.models.len();
        self.models
            .push(InstanceModel::from_translation(position.to_vec3()));
        self.normals.push(InstanceNormal::identity());
        self.owners.push(entity);
        self.slots.insert(entity, index);
        Some(index)
    }

    fn swap_remove(&mut self, entity: Entity) -> Option<Removal> {
        let index = self.slots.remove(&entity)?;
        let last = self.models.len() - 1;
        self.models.swap_remove(index);
        self.normals.swap_remove(index);
        self.owners.swap_remove(index);

        if index == last {
            return Some(Removal::Popped);
        }
        let moved = self.owners[index];
        self.slots.insert(moved, index);
        Some(Removal::Moved(index))
    }

    fn reset(&mut self) {
        self.models.clear();
        self.models.shrink_to_fit();
        self.normals.clear();
        self.normals.shrink_to_fit();
        self.owners.clear();
        self.owners.shrink_to_fit();
        self.slots.clear();
    }
}

#[derive(Default)]
pub struct InstanceMirror {
    types: BlockTypeMap<TypeInstances>,
}

impl InstanceMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a slot for `entity`. Returns the new slot index, or `None` if
    /// the entity already has a slot of this type.
    pub fn insert(
        &mut self,
        entity: Entity,
        block_type: BlockType,
        position: Position,
    ) -> Option<usize> {
        self.types[block_type].push(entity, position)
    }

    /// Swap-and-pop removal of `entity`'s slot. Returns `None` if the entity has
    /// no slot of this type.
    pub fn remove(&mut self, entity: Entity, block_type: BlockType) -> Option<Removal> {
        self.types[block_type].swap_remove(entity)
    }

    /// Empties every array and releases its backing storage.
    pub fn clear(&mut self) {
        for (_, instances) in self.types.iter_mut() {
            instances.reset();
        }
    }

    /// Rebuilds every array from scratch, appending in iteration order.
    pub fn rebuild<'a>(
        &mut self,
        entities: impl IntoIterator<Item = (Entity, &'a Position, &'a BlockType)>,
    ) {
        self.clear();
        for (entity, position, block_type) in entities {
            self.types[*block_type].push(entity, *position);
        }
    }

    /// Recomputes every normal matrix against `view`.
    pub fn update_normals(&mut self, view: &Matrix4<f32>) {
        for (_, instances) in self.types.iter_mut() {
            for (normal, model) in instances.normals.iter_mut().zip(&instances.models) {
                *normal = InstanceNormal::from_model_view(view, model);
            }
        }
    }

    pub fn len(&self, block_type: BlockType) -> usize {
        self.types[block_type].models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.iter().all(|(_, instances)| instances.models.is_empty())
    }

    pub fn slot_of(&self, entity: Entity, block_type: BlockType) -> Option<usize> {
        self.types[block_type].slots.get(&entity).copied()
    }

    pub fn owner_of(&self, block_type: BlockType, index: usize) -> Option<Entity> {
        self.types[block_type].owners.get(index).copied()
    }

    /// The model array of `block_type`, including its spare capacity.
    pub fn models(&self, block_type: BlockType) -> &Vec<InstanceModel> {
        &self.types[block_type].models
    }

    /// The normal array of `block_type`, including its spare capacity.
    pub fn normals(&self, block_type: BlockType) -> &Vec<InstanceNormal> {
        &self.types[block_type].normals
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use cgmath::Vector3;

    use super::*;
    use crate::engine_state::registry::Registry;

    fn entities(n: usize) -> Vec<Entity> {
        let mut registry = Registry::new();
        (0..n).map(|_| registry.create()).collect()
    }

    fn translations(mirror: &InstanceMirror, block_type: BlockType) -> Vec<[i32; 3]> {
        mirror
            .models(block_type)
            .iter()
            .map(|m| {
                let t = m.translation() * 2.0;
                [t.x as i32, t.y as i32, t.z as i32]
            })
            .collect()
    }

    #[test]
    fn insert_appends_identity_normals() {
        let mut mirror = InstanceMirror::new();
        let [a, b] = entities(2)[..] else { unreachable!() };

        assert_eq!(mirror.insert(a, BlockType::Grass, Position::new(0.5, 1.5, 0.5)), Some(0));
        assert_eq!(mirror.insert(b, BlockType::Grass, Position::new(1.5, 1.5, 0.5)), Some(1));
        assert_eq!(mirror.insert(a, BlockType::Grass, Position::new(9.0, 9.0, 9.0)), None);

        assert_eq!(mirror.len(BlockType::Grass), 2);
        assert_eq!(mirror.normals(BlockType::Grass)[1], InstanceNormal::identity());
        assert_eq!(
            mirror.models(BlockType::Grass)[1].translation(),
            Vector3::new(1.5, 1.5, 0.5)
        );
    }

    #[test]
    fn removing_middle_slot_moves_last_into_it() {
        let mut mirror = InstanceMirror::new();
        let ids = entities(4);
        for (i, entity) in ids.iter().enumerate() {
            mirror.insert(*entity, BlockType::Dirt, Position::new(i as f32 + 0.5, 0.5, 0.5));
        }
        let before: HashSet<_> = translations(&mirror, BlockType::Dirt).into_iter().collect();

        assert_eq!(mirror.remove(ids[1], BlockType::Dirt), Some(Removal::Moved(1)));

        assert_eq!(mirror.len(BlockType::Dirt), 3);
        assert_eq!(mirror.owner_of(BlockType::Dirt, 1), Some(ids[3]));
        assert_eq!(mirror.slot_of(ids[3], BlockType::Dirt), Some(1));
        let after: HashSet<_> = translations(&mirror, BlockType::Dirt).into_iter().collect();
        let mut expected = before;
        expected.remove(&[3, 1, 1]);
        assert_eq!(after, expected);
    }

    #[test]
    fn removing_last_slot_pops() {
        let mut mirror = InstanceMirror::new();
        let [a, b] = entities(2)[..] else { unreachable!() };
        mirror.insert(a, BlockType::Dirt, Position::new(0.5, 0.5, 0.5));
        mirror.insert(b, BlockType::Dirt, Position::new(1.5, 0.5, 0.5));

        assert_eq!(mirror.remove(b, BlockType::Dirt), Some(Removal::Popped));
        assert_eq!(mirror.remove(b, BlockType::Dirt), None);
        assert_eq!(mirror.slot_of(a, BlockType::Dirt), Some(0));
    }

    #[test]
    fn shared_positions_remove_the_right_entity() {
        let mut mirror = InstanceMirror::new();
        let [a, b, c] = entities(3)[..] else { unreachable!() };
        let same = Position::new(0.5, 0.5, 0.5);
        mirror.insert(a, BlockType::Cobblestone, same);
        mirror.insert(b, BlockType::Cobblestone, same);
        mirror.insert(c, BlockType::Cobblestone, Position::new(2.5, 0.5, 0.5));

        mirror.remove(b, BlockType::Cobblestone);

        assert_eq!(mirror.slot_of(a, BlockType::Cobblestone), Some(0));
        assert_eq!(mirror.slot_of(c, BlockType::Cobblestone), Some(1));
        assert_eq!(mirror.slot_of(b, BlockType::Cobblestone), None);
    }

    #[test]
    fn rebuild_releases_capacity_of_empty_types() {
        let mut mirror = InstanceMirror::new();
        let [a] = entities(1)[..] else { unreachable!() };
        mirror.insert(a, BlockType::Grass, Position::new(0.5, 0.5, 0.5));

        mirror.rebuild(std::iter::empty());

        assert!(mirror.is_empty());
        assert_eq!(mirror.models(BlockType::Grass).capacity(), 0);
        assert_eq!(mirror.normals(BlockType::Grass).capacity(), 0);
    }

    #[test]
    fn update_normals_touches_every_slot() {
        let mut mirror = InstanceMirror::new();
        let ids = entities(3);
        for entity in &ids {
            mirror.insert(*entity, BlockType::Grass, Position::new(0.5, 0.5, 0.5));
        }

        let view = Matrix4::from_nonuniform_scale(2.0, 2.0, 2.0);
        mirror.update_normals(&view);

        for normal in mirror.normals(BlockType::Grass) {
            assert!((normal.columns[0][0] - 0.5).abs() < 1e-6);
        }
    }
}
