//! # Terrain Components
//!
//! Plain data records attached to terrain entities. `Position` and `BlockType`
//! always travel together on a terrain block; `BoundingVolume` is optional and
//! is not mirrored into the instancing arrays.

use cgmath::Vector3;
use serde::{Deserialize, Serialize};

/// World-space center of a block.
#[derive(Copy, Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_vec3(self) -> Vector3<f32> {
        Vector3::new(self.x, self.y, self.z)
    }
}

/// Axis-aligned box relative to the entity's position.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingVolume {
    /// Offset of the box center from the entity position.
    pub offset: [f32; 3],
    /// Half extents along each axis.
    pub extents: [f32; 3],
}

impl BoundingVolume {
    pub fn new(offset: [f32; 3], extents: [f32; 3]) -> Self {
        Self { offset, extents }
    }

    /// The volume of a single unit block centered on its position.
    pub fn unit_block() -> Self {
        Self::new([0.0; 3], [super::block::BLOCK_HALF_LENGTH; 3])
    }
}

