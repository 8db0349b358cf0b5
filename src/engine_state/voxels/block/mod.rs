//! # Block Module
//!
//! Block type definitions and the fixed-size per-type map used by the
//! instancing code.

use std::ops::{Index, IndexMut};

use block_type::BlockType;

pub mod block_type;

/// The underlying integer type used to represent block types in memory.
pub type BlockTypeSize = u8;

/// Half the edge length of a block. Block centers sit on half-integer
/// coordinates so that block faces meet on whole numbers.
pub const BLOCK_HALF_LENGTH: f32 = 0.5;

/// One value per block type, indexed by `BlockType`.
///
/// Backed by a plain array of `BlockType::COUNT` slots, so indexing with a
/// `BlockType` can never go out of bounds.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockTypeMap<T> {
    slots: [T; BlockType::COUNT],
}

impl<T> BlockTypeMap<T> {
    /// Builds a map by calling `f` once per block type, in index order.
    pub fn from_fn(mut f: impl FnMut(BlockType) -> T) -> Self {
        Self {
            slots: std::array::from_fn(|i| f(BlockType::ALL[i])),
        }
    }

    /// Iterates over `(block type, value)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (BlockType, &T)> {
        BlockType::ALL.into_iter().zip(self.slots.iter())
    }

    /// Mutable counterpart of [`BlockTypeMap::iter`].
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BlockType, &mut T)> {
        BlockType::ALL.into_iter().zip(self.slots.iter_mut())
    }
}

impl<T: Default> Default for BlockTypeMap<T> {
    fn default() -> Self {
        Self::from_fn(|_| T::default())
    }
}

impl<T> Index<BlockType> for BlockTypeMap<T> {
    type Output = T;

    fn index(&self, block_type: BlockType) -> &T {
        &self.slots[block_type.index()]
    }
}

impl<T> IndexMut<BlockType> for BlockTypeMap<T> {
    fn index_mut(&mut self, block_type: BlockType) -> &mut T {
        &mut self.slots[block_type.index()]
    }
}
