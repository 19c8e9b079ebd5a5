//! # Simulation parameters
//!
//! Layout of the simulated rig and of the structure in front of it, loaded from `sim.toml`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::rig::{ActuatorId, FrameAxes};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    /// Axes of the rig frame.
    pub frame: FrameAxes,

    /// Outermost structural actuator.
    pub back: Option<ActuatorParams>,

    /// Structural actuator carried by the back actuator.
    pub middle: Option<ActuatorParams>,

    /// Frontend actuator/welder pairs, all carried by the middle actuator.
    pub frontend: Vec<PairParams>,

    /// Actuators pushing the harness connectors out.
    pub harness: Vec<ActuatorParams>,

    /// Number of harness connectors.
    pub num_connectors: usize,

    /// Rate at which an enabled welder raises the build level of a block in reach.
    ///
    /// Units: 1/second
    pub weld_rate_per_s: f64,

    /// The structure being built.
    pub structure: StructureParams,

    /// Obstructions limiting the extension of individual actuators.
    #[serde(default)]
    pub obstructions: Vec<Obstruction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActuatorParams {
    pub name: String,

    /// Units: meters/second
    pub max_velocity_ms: f64,

    /// Units: meters
    pub lowest_m: f64,

    /// Units: meters
    pub highest_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairParams {
    pub actuator: ActuatorParams,

    pub welder_name: String,

    /// Tip of the welder in the grid of its actuator.
    pub welder_tip: [i32; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureParams {
    /// Lowest corner of the structure's bounding box, inclusive.
    pub min: [i32; 3],

    /// Highest corner of the structure's bounding box, inclusive.
    pub max: [i32; 3],

    /// Blocks already in place at startup.
    #[serde(default)]
    pub blocks: Vec<BlockParams>,

    /// Cells the structure's blueprint wants filled, which welders will spawn blocks into.
    #[serde(default)]
    pub planned: Vec<[i32; 3]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockParams {
    pub cell: [i32; 3],
    pub build_level: f64,
}

/// A physical stop preventing an actuator from extending past `max_extent_m`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstruction {
    pub actuator: ActuatorId,

    /// Units: meters
    pub max_extent_m: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ActuatorParams {
    pub fn new(name: &str, max_velocity_ms: f64, lowest_m: f64, highest_m: f64) -> Self {
        Self {
            name: String::from(name),
            max_velocity_ms,
            lowest_m,
            highest_m,
        }
    }
}

impl Default for SimParams {
    /// A small rig: two 5 m structural stages, two frontend pairs side by side and a two
    /// connector harness, in front of an empty two lane blueprint. The blueprint starts one
    /// block ahead of the stowed reach of the welders.
    fn default() -> Self {
        let frontend = (0..2)
            .map(|i| PairParams {
                actuator: ActuatorParams::new(&format!("front {}", i), 2.5, 0.0, 5.0),
                welder_name: format!("welder {}", i),
                welder_tip: [0, 2 * i, 0],
            })
            .collect();

        let planned = (2..=8)
            .flat_map(|x| vec![[x, 0, 0], [x, 2, 0]])
            .collect();

        Self {
            frame: FrameAxes {
                forward: [1, 0, 0],
                right: [0, 1, 0],
                up: [0, 0, 1],
            },
            back: Some(ActuatorParams::new("back", 2.5, 0.0, 5.0)),
            middle: Some(ActuatorParams::new("middle", 2.5, 0.0, 5.0)),
            frontend,
            harness: vec![
                ActuatorParams::new("harness 0", 2.5, 0.0, 1.0),
                ActuatorParams::new("harness 1", 2.5, 0.0, 1.0),
            ],
            num_connectors: 2,
            weld_rate_per_s: 1.0,
            structure: StructureParams {
                min: [0, -1, -1],
                max: [8, 3, 1],
                blocks: Vec::new(),
                planned,
            },
            obstructions: Vec::new(),
        }
    }
}
