//! # Engine State Module
//!
//! The terrain store and everything it is built from.
//!
//! ## Key Components
//!
//! * `TerrainStore` - Owns the registry, the instance arrays and their device buffers
//! * `registry` - Entities, components and construct/destroy hooks
//! * `voxels` - Block types, components and terrain generation
//! * `instancing` - The CPU instance arrays and their synchronization with the device
//! * `buffer_state` - Device buffer sizing and upload policy
//! * `persistence` - Save files
//! * `rendering` - wgpu buffers, vertex layouts and headless device creation
//!
//! ## Lifecycle
//!
//! On creation the store restores the saved world, or generates fresh terrain
//! when there is none, then rebuilds every instance array and buffer in one
//! pass and subscribes to the registry. From then on every registry edit of a
//! `Position`/`BlockType` pair updates the instance arrays and buffers before
//! the edit returns. Dropping a non-empty store saves it.

use std::{cell::Ref, io::ErrorKind};

use cgmath::Matrix4;
use log::{error, info, warn};
use thiserror::Error;

use crate::{
    config::{ConfigError, StoreConfig},
    core::StResource,
};

use buffer_state::{BufferAllocator, BufferAnalytics};
use instancing::{InstanceModel, InstanceSync};
use persistence::{load_world, save_world};
use registry::{snapshot::PersistenceError, Connection, Entity, Registry, RegistryError};
use rendering::WgpuAllocator;
use voxels::{block::block_type::BlockType, components::Position, terrain::TerrainBuilder};

pub mod buffer_state;
pub mod instancing;
pub mod persistence;
pub mod registry;
pub mod rendering;
pub mod voxels;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// A procedurally generated terrain whose blocks are drawn with GPU instancing.
///
/// # Examples
///
/// ```no_run
/// use voxel_instancing::{
///     config::StoreConfig,
///     engine_state::{buffer_state::HostAllocator, voxels::block::block_type::BlockType, TerrainStore},
/// };
///
/// let store = TerrainStore::new(&HostAllocator, StoreConfig::default())?;
/// println!("{} grass blocks", store.num_objects(BlockType::Grass));
/// # Ok::<(), voxel_instancing::engine_state::StoreError>(())
/// ```
pub struct TerrainStore<A: BufferAllocator> {
    registry: Registry,
    instances: StResource<InstanceSync<A::Buffer>>,
    connections: Vec<Connection>,
    config: StoreConfig,
}

impl<A: BufferAllocator> TerrainStore<A> {
    /// Creates a store, restoring the world saved at `config.save_path` or
    /// generating a new one.
    ///
    /// # Arguments
    ///
    /// * `allocator` - Creates the instance buffers
    /// * `config` - Save location and terrain shape
    pub fn new(allocator: &A, config: StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;

        let mut store = Self {
            registry: Registry::new(),
            instances: StResource::new(InstanceSync::new(allocator)),
            connections: Vec::new(),
            config,
        };

        let loaded = match load_world(&mut store.registry, &store.config.save_path) {
            Ok(loaded) => loaded,
            Err(err) => {
                warn!(
                    "Discarding unreadable save {}: {}",
                    store.config.save_path.display(),
                    err
                );
                false
            }
        };
        if !loaded {
            TerrainBuilder::new(&store.config.terrain).generate(&mut store.registry)?;
        }
        store.rebuild_instances();
        store.connect();

        Ok(store)
    }

    /// Deletes the save file and replaces the world with freshly generated terrain.
    ///
    /// Generation and the following rebuild run with the hooks disconnected.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.config.save_path) {
            Ok(()) => info!("Deleted {}", self.config.save_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(
                "Failed to delete {}: {}",
                self.config.save_path.display(),
                err
            ),
        }

        self.disconnect();
        let generated = TerrainBuilder::new(&self.config.terrain).generate(&mut self.registry);
        self.rebuild_instances();
        self.connect();

        let blocks = generated?;
        info!("World reset with {} blocks", blocks);
        Ok(())
    }

    /// Subscribes the instance arrays to the registry. Existing subscriptions
    /// are released first.
    pub fn connect(&mut self) {
        self.disconnect();
        self.connections = instancing::subscribe(&mut self.registry, &self.instances);
    }

    /// Releases every registry subscription of the store.
    pub fn disconnect(&mut self) {
        for connection in self.connections.drain(..) {
            self.registry.disconnect(connection);
        }
    }

    pub fn is_connected(&self) -> bool {
        !self.connections.is_empty()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Mutable access to the registry. While connected, edits of `Position`
    /// and `BlockType` reach the instance arrays before the edit returns.
    /// In-place edits through `Registry::get_mut` do not.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Creates a block entity at `position`.
    pub fn place_block(
        &mut self,
        position: Position,
        block_type: BlockType,
    ) -> Result<Entity, StoreError> {
        let entity = self.registry.create();
        self.registry.insert(entity, position)?;
        self.registry.insert(entity, block_type)?;
        Ok(entity)
    }

    /// Destroys a block entity. Returns `false` if it was already gone.
    pub fn remove_block(&mut self, entity: Entity) -> bool {
        self.registry.destroy(entity)
    }

    /// Number of instances to draw for `block_type`.
    pub fn num_objects(&self, block_type: BlockType) -> usize {
        self.instances.get().num_objects(block_type)
    }

    /// Refreshes every normal matrix for this frame's `view` and uploads them.
    /// Call once per frame, before drawing.
    pub fn update_normal_mats(&mut self, view: &Matrix4<f32>) {
        self.instances.get_mut().update_normals(view);
    }

    /// Rebuilds every instance array and buffer from the registry.
    pub fn rebuild_instances(&mut self) {
        self.instances.get_mut().rebuild_all(&self.registry);
    }

    /// Writes the registry to the configured save path.
    pub fn save(&self) -> Result<(), PersistenceError> {
        save_world(&self.registry, &self.config.save_path)
    }

    /// Replaces the registry with the configured save file and rebuilds the
    /// instance arrays. Returns `Ok(false)` if there is no save file.
    pub fn load(&mut self) -> Result<bool, StoreError> {
        self.disconnect();
        let loaded = load_world(&mut self.registry, &self.config.save_path);
        self.rebuild_instances();
        self.connect();
        Ok(loaded?)
    }

    /// Read access to the instance arrays and their buffers.
    pub fn instances(&self) -> Ref<'_, InstanceSync<A::Buffer>> {
        self.instances.get()
    }

    /// Copy of the model matrices currently mirrored for `block_type`.
    pub fn models(&self, block_type: BlockType) -> Vec<InstanceModel> {
        self.instances.get().mirror().models(block_type).clone()
    }

    /// Analytics of the model and normal buffers of `block_type`.
    pub fn buffer_analytics(&self, block_type: BlockType) -> (BufferAnalytics, BufferAnalytics) {
        self.instances.get().analytics(block_type)
    }
}

impl TerrainStore<WgpuAllocator> {
    /// Binds the model and normal buffers of `block_type` to the vertex buffer
    /// slots `first_slot` and `first_slot + 1`.
    ///
    /// The pipeline must lay the slots out with `InstanceLayout`.
    pub fn bind_instancing(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        first_slot: u32,
        block_type: BlockType,
    ) {
        let instances = self.instances.get();
        let buffers = instances.buffers(block_type);
        pass.set_vertex_buffer(first_slot, buffers.models.buffer().raw().slice(..));
        pass.set_vertex_buffer(first_slot + 1, buffers.normals.buffer().raw().slice(..));
    }
}

impl<A: BufferAllocator> Drop for TerrainStore<A> {
    fn drop(&mut self) {
        self.disconnect();
        if self.registry.is_empty() {
            return;
        }
        if let Err(err) = self.save() {
            error!(
                "Failed to save world to {}: {}",
                self.config.save_path.display(),
                err
            );
        }
    }
}
