//! # Instancing Module
//!
//! Keeps the per-block-type instance arrays and their device buffers in step
//! with the registry.
//!
//! ## Joint construct/destruct
//!
//! A block is mirrored once it carries both a `Position` and a `BlockType`.
//! `subscribe` hooks `on_joint_construct` to the construction of either
//! component and `on_joint_destruct` to the destruction of either; each handler
//! checks for the pair itself. That way the construct hook acts on whichever
//! half arrives last, and the destruct hook acts on whichever half leaves first.
//!
//! Hooks capture a clone of the `StResource` holding the `InstanceSync`, never a
//! reference to its owner.

use cgmath::Matrix4;
use log::{error, warn};

use crate::core::StResource;

use super::{
    buffer_state::{
        BufferAllocator, BufferAnalytics, BufferUpdate, DeviceBuffer, SyncedBuffer,
    },
    registry::{Connection, Entity, Registry},
    voxels::{
        block::{block_type::BlockType, BlockTypeMap},
        components::Position,
    },
};

pub mod instance;
pub mod mirror;

pub use instance::{InstanceModel, InstanceNormal};
pub use mirror::{InstanceMirror, Removal};

/// Device buffers backing one block type's instance arrays.
pub struct InstanceBuffers<B: DeviceBuffer> {
    pub models: SyncedBuffer<B>,
    pub normals: SyncedBuffer<B>,
}

impl<B: DeviceBuffer> InstanceBuffers<B> {
    fn new<A: BufferAllocator<Buffer = B>>(allocator: &A, block_type: BlockType) -> Self {
        let (models, normals) = match block_type {
            BlockType::Grass => ("grass instance models", "grass instance normals"),
            BlockType::Dirt => ("dirt instance models", "dirt instance normals"),
            BlockType::Cobblestone => ("cobblestone instance models", "cobblestone instance normals"),
        };
        Self {
            models: SyncedBuffer::new::<InstanceModel, _>(allocator, models),
            normals: SyncedBuffer::new::<InstanceNormal, _>(allocator, normals),
        }
    }
}

/// Instance mirror plus the device buffers that follow it.
pub struct InstanceSync<B: DeviceBuffer> {
    mirror: InstanceMirror,
    buffers: BlockTypeMap<InstanceBuffers<B>>,
}

impl<B: DeviceBuffer> InstanceSync<B> {
    /// Creates empty arrays with one-element buffers for every block type.
    pub fn new<A: BufferAllocator<Buffer = B>>(allocator: &A) -> Self {
        Self {
            mirror: InstanceMirror::new(),
            buffers: BlockTypeMap::from_fn(|block_type| InstanceBuffers::new(allocator, block_type)),
        }
    }

    /// Mirrors `entity` if it now carries both a `Position` and a `BlockType`.
    pub fn on_joint_construct(&mut self, registry: &Registry, entity: Entity) {
        let (Some(position), Some(block_type)) = (
            registry.get::<Position>(entity),
            registry.get::<BlockType>(entity),
        ) else {
            return;
        };

        match self.mirror.insert(entity, *block_type, *position) {
            Some(index) => {
                self.sync(*block_type, BufferUpdate::Element(index));
            }
            None => warn!("{} is already mirrored as {:?}", entity, block_type),
        }
    }

    /// Drops `entity` from the mirror if it still carries both components.
    pub fn on_joint_destruct(&mut self, registry: &Registry, entity: Entity) {
        if !registry.has::<Position>(entity) {
            return;
        }
        let Some(&block_type) = registry.get::<BlockType>(entity) else {
            return;
        };

        match self.mirror.remove(entity, block_type) {
            Some(Removal::Moved(index)) => {
                self.sync(block_type, BufferUpdate::Element(index));
            }
            Some(Removal::Popped) => {
                self.sync(block_type, BufferUpdate::Shrink);
            }
            None => error!(
                "Instance mirror diverged from registry: {} ({:?}) has no instance slot",
                entity, block_type
            ),
        }
    }

    /// Rebuilds every array from the registry and reallocates every buffer.
    pub fn rebuild_all(&mut self, registry: &Registry) {
        self.mirror.rebuild(registry.view2::<Position, BlockType>());
        for block_type in BlockType::ALL {
            self.sync(block_type, BufferUpdate::Rebuild);
        }
    }

    /// Recomputes the normal matrices against `view` and uploads each normals
    /// array over its full length.
    pub fn update_normals(&mut self, view: &Matrix4<f32>) {
        self.mirror.update_normals(view);
        for (block_type, buffers) in self.buffers.iter_mut() {
            buffers.normals.write_all(self.mirror.normals(block_type));
        }
    }

    /// Number of instances to draw for `block_type`.
    pub fn num_objects(&self, block_type: BlockType) -> usize {
        let models = self.mirror.models(block_type).len();
        let normals = self.mirror.normals(block_type).len();
        if models != normals {
            error!(
                "{:?} has {} model matrices but {} normal matrices",
                block_type, models, normals
            );
        }
        models
    }

    pub fn mirror(&self) -> &InstanceMirror {
        &self.mirror
    }

    pub fn buffers(&self, block_type: BlockType) -> &InstanceBuffers<B> {
        &self.buffers[block_type]
    }

    /// Analytics of the model and normal buffers of `block_type`, in that order.
    pub fn analytics(&self, block_type: BlockType) -> (BufferAnalytics, BufferAnalytics) {
        let buffers = &self.buffers[block_type];
        (buffers.models.analytics(), buffers.normals.analytics())
    }

    fn sync(&mut self, block_type: BlockType, update: BufferUpdate) {
        let buffers = &mut self.buffers[block_type];
        let models = buffers.models.sync(self.mirror.models(block_type), update);
        let normals = buffers.normals.sync(self.mirror.normals(block_type), update);
        if models != normals {
            error!(
                "{:?} model and normal buffers diverged: {:?} vs {:?}",
                block_type, models, normals
            );
        }
    }
}

/// Connects the joint construct/destruct handlers of `instances` to `registry`.
pub fn subscribe<B: DeviceBuffer + 'static>(
    registry: &mut Registry,
    instances: &StResource<InstanceSync<B>>,
) -> Vec<Connection> {
    let construct = |instances: StResource<InstanceSync<B>>| {
        move |registry: &Registry, entity: Entity| {
            instances.get_mut().on_joint_construct(registry, entity)
        }
    };
    let destruct = |instances: StResource<InstanceSync<B>>| {
        move |registry: &Registry, entity: Entity| {
            instances.get_mut().on_joint_destruct(registry, entity)
        }
    };

    vec![
        registry.on_construct::<Position>(construct(instances.clone())),
        registry.on_construct::<BlockType>(construct(instances.clone())),
        registry.on_destroy::<Position>(destruct(instances.clone())),
        registry.on_destroy::<BlockType>(destruct(instances.clone())),
    ]
}
