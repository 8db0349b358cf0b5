//! # Voxel Terrain
//!
//! The data a terrain block is made of and the code that generates it.
//!
//! ## Architecture
//!
//! * **Block**: the closed set of block types and the per-type map
//! * **Components**: `Position` and `BoundingVolume`, attached to entities next to a `BlockType`
//! * **Height noise**: the seeded height field
//! * **Terrain**: fills a registry with block columns sampled from the height field

pub mod block;
pub mod components;
pub mod height_noise;
pub mod terrain;
