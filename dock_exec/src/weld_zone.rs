//! # Weld zone tracking
//!
//! A welder builds everything within a fixed footprint in front of it: the 3x3 ring of cells one
//! cell ahead of its tip (centre included) plus the cell two ahead. The [`WeldZoneTracker`]
//! classifies that footprint once when constructed and is then polled once per tick until the
//! zone is considered complete:
//!
//! - every occupied cell is tracked until its block is fully built,
//! - every empty cell inside the structure adds [`crate::DECAY_TICKS_PER_EMPTY_CELL`] ticks to a
//!   shared decay budget, the time allowed for a block to appear there and be built.
//!
//! The tracker is only valid for the welder position it was built at, a new one must be built
//! whenever the welder moves.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::{
    rig::{BlockId, FootprintCell, Rig, RigError, RigFrame, Structure},
    step::StepStatus,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of cells in a welder footprint.
pub const FOOTPRINT_LEN: usize = 10;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Tracks the build completion of one welder's footprint.
#[derive(Debug, Clone)]
pub struct WeldZoneTracker {
    pair: usize,

    /// Blocks that existed in the footprint when the tracker was built.
    tracked: Vec<BlockId>,

    /// Ticks still to wait for blocks to appear in empty cells.
    decay_ticks: u32,
}

/// Snapshot of a tracker's progress, for the status output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeldZoneReport {
    pub pair: usize,
    pub num_tracked: usize,
    pub decay_ticks: u32,
    pub avg_build_level: f64,
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Footprint of a welder whose forward-most cell is `tip`, in the grid of the welder's carrier.
pub fn weld_footprint(frame: &RigFrame, tip: Vector3<i32>) -> [Vector3<i32>; FOOTPRINT_LEN] {
    let front = tip + frame.forward();

    [
        front,
        front + frame.forward(),
        front + frame.right(),
        front + frame.right() + frame.up(),
        front + frame.right() + frame.down(),
        front + frame.left(),
        front + frame.left() + frame.up(),
        front + frame.left() + frame.down(),
        front + frame.up(),
        front + frame.down(),
    ]
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl WeldZoneTracker {
    /// Build a tracker for the welder of `pair` at the rig's current position.
    pub fn new(
        rig: &Rig,
        structure: &dyn Structure,
        pair: usize,
        decay_ticks_per_empty_cell: u32,
    ) -> Result<Self, RigError> {
        let welder = rig.welder(pair)?;

        let cells = weld_footprint(&rig.frame, welder.tip)
            .iter()
            .map(|c| structure.classify(structure.carrier_to_structure(rig, pair, *c)))
            .collect::<Vec<_>>();

        Ok(Self::from_cells(pair, cells, decay_ticks_per_empty_cell))
    }

    /// Build a tracker from an already classified footprint.
    pub fn from_cells<I>(pair: usize, cells: I, decay_ticks_per_empty_cell: u32) -> Self
    where
        I: IntoIterator<Item = FootprintCell>,
    {
        let mut tracked = Vec::new();
        let mut decay_ticks = 0;

        for cell in cells {
            match cell {
                FootprintCell::Occupied(b) => tracked.push(b),
                FootprintCell::EmptyInBounds => decay_ticks += decay_ticks_per_empty_cell,
                FootprintCell::OutOfBounds => (),
            }
        }

        debug!(
            "weld zone {}: tracking {} blocks, decay budget {} ticks",
            pair,
            tracked.len(),
            decay_ticks
        );

        Self {
            pair,
            tracked,
            decay_ticks,
        }
    }

    /// Poll the zone, spending one tick of the decay budget.
    ///
    /// Done once the budget is exhausted and every tracked block is fully built.
    pub fn poll(&mut self, structure: &dyn Structure) -> StepStatus {
        self.decay_ticks = self.decay_ticks.saturating_sub(1);

        let all_built = self.tracked.iter().all(|b| structure.is_fully_built(*b));

        debug!(
            "weld zone {}: known blocks: {}, left ticks: {}, avg build level: {:.3}",
            self.pair,
            self.tracked.len(),
            self.decay_ticks,
            self.avg_build_level(structure)
        );

        StepStatus::from_done(all_built && self.decay_ticks == 0)
    }

    pub fn pair(&self) -> usize {
        self.pair
    }

    pub fn num_tracked(&self) -> usize {
        self.tracked.len()
    }

    pub fn decay_ticks(&self) -> u32 {
        self.decay_ticks
    }

    /// Mean build level of the tracked blocks, 1 if none are tracked.
    pub fn avg_build_level(&self, structure: &dyn Structure) -> f64 {
        if self.tracked.is_empty() {
            return 1.0;
        }

        self.tracked
            .iter()
            .map(|b| structure.build_level(*b))
            .sum::<f64>()
            / self.tracked.len() as f64
    }

    pub fn report(&self, structure: &dyn Structure) -> WeldZoneReport {
        WeldZoneReport {
            pair: self.pair,
            num_tracked: self.num_tracked(),
            decay_ticks: self.decay_ticks,
            avg_build_level: self.avg_build_level(structure),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::rig::{Actuator, Welder};
    use crate::sim::SimStructure;
    use crate::DECAY_TICKS_PER_EMPTY_CELL;
    use std::collections::HashSet;

    #[test]
    fn test_footprint_shape() {
        let frame = RigFrame::default();
        let fp = weld_footprint(&frame, Vector3::new(0, 0, 0));

        let unique: HashSet<_> = fp.iter().cloned().collect();
        assert_eq!(unique.len(), FOOTPRINT_LEN);

        // One ring one cell ahead, plus one cell two ahead
        assert_eq!(fp.iter().filter(|c| c.x == 1).count(), 9);
        assert!(fp.contains(&Vector3::new(2, 0, 0)));
        assert!(fp.iter().all(|c| c.y.abs() <= 1 && c.z.abs() <= 1));
        assert!(!fp.contains(&Vector3::new(0, 0, 0)));
    }

    #[test]
    fn test_empty_zone_decay() {
        let structure = SimStructure::empty();
        let mut t = WeldZoneTracker::from_cells(
            0,
            vec![FootprintCell::EmptyInBounds; 10],
            DECAY_TICKS_PER_EMPTY_CELL,
        );

        assert_eq!(t.decay_ticks(), 100);
        assert_eq!(t.num_tracked(), 0);

        for _ in 1..100 {
            assert_eq!(t.poll(&structure), StepStatus::NotDone);
        }
        assert_eq!(t.poll(&structure), StepStatus::Done);
        assert_eq!(t.decay_ticks(), 0);
    }

    #[test]
    fn test_out_of_bounds_zone_is_immediately_done() {
        let structure = SimStructure::empty();
        let mut t = WeldZoneTracker::from_cells(1, vec![FootprintCell::OutOfBounds; 10], 10);

        assert_eq!(t.decay_ticks(), 0);
        assert_eq!(t.poll(&structure), StepStatus::Done);
        assert_eq!(t.report(&structure).avg_build_level, 1.0);
    }

    #[test]
    fn test_tracks_block_build() {
        let mut structure = SimStructure::empty();
        let b = structure.add_block(Vector3::new(5, 0, 0), 0.5);

        let mut t = WeldZoneTracker::from_cells(
            0,
            vec![FootprintCell::Occupied(b), FootprintCell::EmptyInBounds],
            2,
        );

        assert_eq!(t.poll(&structure), StepStatus::NotDone);
        assert_eq!(t.poll(&structure), StepStatus::NotDone);
        assert_eq!(t.decay_ticks(), 0);
        assert_eq!(t.avg_build_level(&structure), 0.5);

        structure.set_build_level(b, 1.0);
        assert_eq!(t.poll(&structure), StepStatus::Done);
    }

    #[test]
    fn test_new_classifies_footprint() {
        let mut rig = Rig::new(RigFrame::default());
        rig.frontend.push(Actuator::new("front 0", 1.0, 0.0, 5.0));
        rig.welders.push(Some(Welder::new("welder 0", Vector3::new(0, 0, 0))));

        // Bounds cover x in 0..=1 only, so the cell two ahead is out of bounds
        let mut structure = SimStructure::new(Vector3::new(0, -1, -1), Vector3::new(1, 1, 1), 2.5);
        structure.add_block(Vector3::new(1, 0, 0), 0.0);
        structure.add_block(Vector3::new(1, 1, 1), 1.0);

        let t = WeldZoneTracker::new(&rig, &structure, 0, 10).unwrap();
        assert_eq!(t.num_tracked(), 2);
        assert_eq!(t.decay_ticks(), 70);

        rig.welders[0] = None;
        assert_eq!(
            WeldZoneTracker::new(&rig, &structure, 0, 10).unwrap_err(),
            RigError::MissingWelder(0)
        );
    }
}
