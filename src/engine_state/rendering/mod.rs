//! Rendering glue for the instance buffers.
//!
//! This module holds everything that touches wgpu directly: the device-buffer
//! backend used by `buffer_state`, the per-instance vertex layouts a render
//! pipeline needs to read the instance arrays, and headless device creation.

pub mod headless;
pub mod instance_buffers;
pub mod instance_layout;

pub use instance_buffers::{WgpuAllocator, WgpuBuffer};
pub use instance_layout::InstanceLayout;
