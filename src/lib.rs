//! # Voxel Instancing
//!
//! A procedurally generated voxel terrain kept in an entity-component registry
//! and drawn with GPU instancing.
//!
//! ## Key Modules
//!
//! * `config` - Store and terrain settings, loadable from JSON
//! * `core` - Single-threaded shared-ownership primitives
//! * `engine_state` - The terrain store: registry, terrain generation, instance
//!   arrays, device buffers and save files
//!
//! ## Architecture
//!
//! Each block is an entity carrying a `Position` and a `BlockType`. The store
//! keeps, per block type, an array of model matrices and an array of normal
//! matrices with one slot per block, and a pair of device buffers that follow
//! those arrays. Registry hooks keep all three in step on every edit; the
//! device buffers are only reallocated when the arrays themselves reallocate.
//!
//! ## Usage
//!
//! ```no_run
//! fn main() {
//!     voxel_instancing::run();
//! }
//! ```

use cgmath::{Matrix4, Point3, Vector3};
use log::{error, info, warn};

use config::StoreConfig;
use engine_state::{
    buffer_state::{BufferAllocator, HostAllocator},
    rendering::{headless, WgpuAllocator},
    voxels::block::block_type::BlockType,
    StoreError, TerrainStore,
};

pub mod config;
pub mod core;
pub mod engine_state;

/// Runs one headless session: restores or generates the world, refreshes the
/// normal matrices for a single frame and saves the world on the way out.
///
/// The first command-line argument, if present, is a JSON config file.
/// Logging is controlled by `RUST_LOG`.
pub fn run() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized");

    let config = match std::env::args().nth(1) {
        Some(path) => match StoreConfig::from_json_file(&path) {
            Ok(config) => config,
            Err(err) => {
                error!("{}", err);
                return;
            }
        },
        None => StoreConfig::default(),
    };

    let result = match headless::request_device() {
        Some((device, queue)) => run_session(&WgpuAllocator::new(device, queue), config),
        None => {
            warn!("Falling back to host memory instance buffers");
            run_session(&HostAllocator, config)
        }
    };

    if let Err(err) = result {
        error!("Session failed: {}", err);
    }
}

fn run_session<A: BufferAllocator>(allocator: &A, config: StoreConfig) -> Result<(), StoreError> {
    let mut store = TerrainStore::new(allocator, config)?;

    let view = Matrix4::look_at_rh(
        Point3::new(12.0, 20.0, 12.0),
        Point3::new(0.0, 8.0, 0.0),
        Vector3::unit_y(),
    );
    store.update_normal_mats(&view);

    for block_type in BlockType::ALL {
        let (models, normals) = store.buffer_analytics(block_type);
        info!(
            "{:?}: {} instances, {} + {} bytes allocated",
            block_type,
            store.num_objects(block_type),
            models.allocated_memory,
            normals.allocated_memory
        );
    }

    Ok(())
}
