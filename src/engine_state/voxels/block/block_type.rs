//! # Block Type Module
//!
//! This module defines the closed set of block types a terrain entity can carry.
//! Block types double as indices into the per-type instancing arrays, so the
//! conversion from raw integers is always validated.

use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};

use super::BlockTypeSize;

/// Enumerates all possible block types in the voxel world.
///
/// The discriminants are dense and start at zero; `BlockType::COUNT` is the
/// exclusive upper bound and is never a valid block type itself.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, FromPrimitive, Serialize, Deserialize,
)]
pub enum BlockType {
    /// The surface block of every terrain column.
    Grass,

    /// Fill below the surface of a column.
    Dirt,

    /// Stone blocks placed by runtime edits.
    Cobblestone,
}

impl BlockType {
    /// Number of real block types. Doubles as the size of every per-type array.
    pub const COUNT: usize = 3;

    /// Every block type, in index order.
    pub const ALL: [BlockType; Self::COUNT] =
        [BlockType::Grass, BlockType::Dirt, BlockType::Cobblestone];

    /// The index of this block type in per-type arrays.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Converts a `BlockTypeSize` to a `BlockType`.
    ///
    /// Returns `None` for values at or above `BlockType::COUNT`, which is how
    /// a malformed component is kept from indexing past the per-type arrays.
    pub fn from_int(btype: BlockTypeSize) -> Option<Self> {
        num::FromPrimitive::from_u8(btype)
    }

    /// The block type as its compact integer representation.
    pub fn as_int(self) -> BlockTypeSize {
        self as BlockTypeSize
    }

    /// Generates a random block type.
    ///
    pub fn random() -> Self {
        Self::ALL[fastrand::usize(..Self::COUNT)]
    }
}

impl TryFrom<BlockTypeSize> for BlockType {
    type Error = BlockTypeSize;

    fn try_from(value: BlockTypeSize) -> Result<Self, Self::Error> {
        Self::from_int(value).ok_or(value)
    }
}

impl From<BlockType> for BlockTypeSize {
    fn from(block_type: BlockType) -> Self {
        block_type.as_int()
    }
}
