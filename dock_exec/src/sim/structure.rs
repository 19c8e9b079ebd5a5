//! # Simulated structure
//!
//! A bounded box of integer cells holding blocks, each with a build level, plus the set of
//! planned cells which welders fill in.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::{HashMap, HashSet};

use log::debug;
use nalgebra::Vector3;
use serde::Serialize;

use super::{params::StructureParams, SimError};
use crate::rig::{ActuatorId, BlockId, FootprintCell, Rig, Structure};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SimStructure {
    /// Inclusive bounds, `None` if the structure occupies no space at all.
    bounds: Option<(Vector3<i32>, Vector3<i32>)>,

    /// Units: meters
    block_length_m: f64,

    blocks: HashMap<BlockId, SimBlock>,
    cells: HashMap<Vector3<i32>, BlockId>,
    planned: HashSet<Vector3<i32>>,

    next_id: u64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SimBlock {
    pub cell: [i32; 3],
    pub build_level: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimStructure {
    /// A structure with no cells, every cell is out of bounds.
    pub fn empty() -> Self {
        Self {
            bounds: None,
            block_length_m: crate::BLOCK_LENGTH_M,
            blocks: HashMap::new(),
            cells: HashMap::new(),
            planned: HashSet::new(),
            next_id: 0,
        }
    }

    /// An empty structure spanning `min` to `max` inclusive.
    pub fn new(min: Vector3<i32>, max: Vector3<i32>, block_length_m: f64) -> Self {
        Self {
            bounds: Some((min, max)),
            block_length_m,
            ..Self::empty()
        }
    }

    pub fn from_params(params: &StructureParams, block_length_m: f64) -> Result<Self, SimError> {
        let min = Vector3::from(params.min);
        let max = Vector3::from(params.max);

        if min.iter().zip(max.iter()).any(|(lo, hi)| lo > hi) {
            return Err(SimError::InvalidBounds(params.min, params.max));
        }

        let mut structure = Self::new(min, max, block_length_m);

        for b in params.blocks.iter() {
            let cell = structure.checked_cell(b.cell)?;
            if structure.cells.contains_key(&cell) {
                return Err(SimError::DuplicateBlock(b.cell));
            }
            structure.add_block(cell, b.build_level);
        }

        for p in params.planned.iter() {
            let cell = structure.checked_cell(*p)?;
            structure.plan(cell);
        }

        Ok(structure)
    }

    /// Place a block, replacing any block already in the cell.
    pub fn add_block(&mut self, cell: Vector3<i32>, build_level: f64) -> BlockId {
        let id = BlockId(self.next_id);
        self.next_id += 1;

        if let Some(old) = self.cells.insert(cell, id) {
            self.blocks.remove(&old);
        }
        self.blocks.insert(
            id,
            SimBlock {
                cell: cell.into(),
                build_level: build_level.max(0.0).min(1.0),
            },
        );

        id
    }

    pub fn set_build_level(&mut self, block: BlockId, build_level: f64) {
        if let Some(b) = self.blocks.get_mut(&block) {
            b.build_level = build_level.max(0.0).min(1.0);
        }
    }

    /// Mark a cell as wanted by the blueprint.
    pub fn plan(&mut self, cell: Vector3<i32>) {
        self.planned.insert(cell);
    }

    pub fn block_at(&self, cell: Vector3<i32>) -> Option<BlockId> {
        self.cells.get(&cell).copied()
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn blocks(&self) -> impl Iterator<Item = &SimBlock> {
        self.blocks.values()
    }

    /// Weld a cell for `amount` of build level.
    ///
    /// An existing block is built up, a planned but empty cell receives a fresh block, anything
    /// else is left untouched.
    pub fn weld(&mut self, cell: Vector3<i32>, amount: f64) {
        match self.block_at(cell) {
            Some(id) => {
                let level = self.build_level(id) + amount;
                self.set_build_level(id, level);
            }
            None => {
                if self.planned.contains(&cell) && self.in_bounds(cell) {
                    let id = self.add_block(cell, 0.0);
                    debug!("sim: block {:?} spawned at {:?}", id, cell);
                }
            }
        }
    }

    fn in_bounds(&self, cell: Vector3<i32>) -> bool {
        match self.bounds {
            Some((min, max)) => (0..3).all(|i| cell[i] >= min[i] && cell[i] <= max[i]),
            None => false,
        }
    }

    fn checked_cell(&self, cell: [i32; 3]) -> Result<Vector3<i32>, SimError> {
        let v = Vector3::from(cell);
        if self.in_bounds(v) {
            Ok(v)
        } else {
            Err(SimError::CellOutOfBounds(cell))
        }
    }
}

impl Structure for SimStructure {
    /// Every welder is carried by the whole actuator chain, the combined extension shifts the
    /// welder forward by a whole number of blocks.
    fn carrier_to_structure(&self, rig: &Rig, pair: usize, cell: Vector3<i32>) -> Vector3<i32> {
        let extension_m: f64 = [ActuatorId::Back, ActuatorId::Middle, ActuatorId::Front(pair)]
            .iter()
            .filter_map(|id| rig.actuator(*id).ok())
            .map(|a| a.position_m)
            .sum();

        let blocks = (extension_m / self.block_length_m).round() as i32;

        cell + rig.frame.forward() * blocks
    }

    fn classify(&self, cell: Vector3<i32>) -> FootprintCell {
        match self.block_at(cell) {
            Some(id) => FootprintCell::Occupied(id),
            None if self.in_bounds(cell) => FootprintCell::EmptyInBounds,
            None => FootprintCell::OutOfBounds,
        }
    }

    fn build_level(&self, block: BlockId) -> f64 {
        self.blocks.get(&block).map(|b| b.build_level).unwrap_or(0.0)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
