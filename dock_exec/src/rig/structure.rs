//! Target structure interface
//!
//! The structure being built is observed, never commanded. Whatever provides it (the game grid,
//! a scanner, or [`crate::sim::SimStructure`]) implements [`Structure`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::Rig;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Handle to one block of the target structure.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u64);

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Classification of one cell of a welder's footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FootprintCell {
    /// A block exists in the cell.
    Occupied(BlockId),

    /// The cell is empty but inside the structure's bounds, a block may still appear there.
    EmptyInBounds,

    /// The cell lies outside of the structure.
    OutOfBounds,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

pub trait Structure {
    /// Map a cell in the grid of the actuator carrying the welder of `pair` into the structure's
    /// grid, given the current physical state of the rig.
    fn carrier_to_structure(&self, rig: &Rig, pair: usize, cell: Vector3<i32>) -> Vector3<i32>;

    /// Classify a cell of the structure's grid.
    fn classify(&self, cell: Vector3<i32>) -> FootprintCell;

    /// Build level of a block, from 0 (just placed) to 1 (fully built).
    fn build_level(&self, block: BlockId) -> f64;

    /// True if the block is fully built.
    fn is_fully_built(&self, block: BlockId) -> bool {
        self.build_level(block) >= 1.0
    }
}
