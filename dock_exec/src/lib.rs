//! # Engidock library.
//!
//! Cooperative sequencing of the telescoping welding rig: three chained linear actuator stages,
//! one welder per front actuator and a docking safety harness. Every operation is a [`step::Step`]
//! which performs at most one tick's worth of mutation on the [`rig::Rig`] each time it is
//! stepped, the executable steps the top-level [`dock_mgr::DockMgr`] once per control cycle.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Rig data model - actuators, welders, connectors and the rig frame
pub mod rig;

/// Cooperative step abstraction plus sequential and parallel composition
pub mod step;

/// Extend and retract operations on single actuators
pub mod motion;

/// Welder footprint classification and build completion tracking
pub mod weld_zone;

/// Docking safety harness lock and release
pub mod harness;

/// Frontend weld-and-retract cycle over all actuator/welder pairs
pub mod welding_cycle;

/// Top-level reset and extend-and-weld sequences, plus request handling
pub mod dock_mgr;

/// Simulated rig and target structure, used by the executable and the tests
pub mod sim;

/// Executable parameters
pub mod params;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Length of one structure block, the increment by which actuators are stepped back while
/// welding.
///
/// Units: meters
pub const BLOCK_LENGTH_M: f64 = 2.5;

/// Position change below which an actuator is considered stationary.
///
/// Units: meters
pub const POSITION_EPS_M: f64 = 1e-5;

/// Ticks reserved for every empty but reachable cell in a welder footprint, approximating the
/// time for a new block to appear and be fully built.
pub const DECAY_TICKS_PER_EMPTY_CELL: u32 = 10;
