//! # Rig module
//!
//! The [`Rig`] is the single context object threaded through every step. It is owned by the
//! manager, persisted between ticks by the executable, and is the only place commands to the
//! hardware (velocities, limits, enable flags) are written. Physical state (positions, connector
//! status) is written by whatever drives the hardware between ticks, see [`crate::sim`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod actuator;
mod frame;
mod structure;
mod tools;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::HashMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

pub use actuator::*;
pub use frame::*;
pub use structure::*;
pub use tools::*;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The rig context.
#[derive(Debug, Clone)]
pub struct Rig {
    /// Frontend actuators, each carrying the welder with the same index.
    pub frontend: Vec<Actuator>,

    /// The middle structural actuator.
    pub middle: Option<Actuator>,

    /// The back (innermost) structural actuator.
    pub back: Option<Actuator>,

    /// Welders, paired by index with `frontend`. `None` if no welder could be bound to the pair.
    pub welders: Vec<Option<Welder>>,

    /// Actuators pushing the docking connectors out to the target structure.
    pub harness_actuators: Vec<Actuator>,

    /// The docking connectors of the safety harness.
    pub connectors: Vec<Connector>,

    /// Local coordinate frame of the rig.
    pub frame: RigFrame,

    /// Transient motion tracking records, one per actuator currently being extended or
    /// retracted.
    pub(crate) motion: HashMap<ActuatorId, MotionProgress>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Identifies one actuator of the rig.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActuatorId {
    Back,
    Middle,
    Front(usize),
    Harness(usize),
}

/// Errors raised when a required device is missing from the rig.
///
/// These are precondition violations: they are never retried and abort the whole run.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RigError {
    #[error("Required actuator {0} is not present on the rig")]
    MissingActuator(ActuatorId),

    #[error("No welder is bound to frontend pair {0}")]
    MissingWelder(usize),

    #[error("The rig has no frontend actuator/welder pairs")]
    NoFrontend,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Rig {
    /// Create an empty rig with the given frame.
    pub fn new(frame: RigFrame) -> Self {
        Self {
            frontend: Vec::new(),
            middle: None,
            back: None,
            welders: Vec::new(),
            harness_actuators: Vec::new(),
            connectors: Vec::new(),
            frame,
            motion: HashMap::new(),
        }
    }

    /// Number of frontend actuator/welder pairs.
    pub fn num_pairs(&self) -> usize {
        self.frontend.len()
    }

    /// Get an actuator by ID.
    pub fn actuator(&self, id: ActuatorId) -> Result<&Actuator, RigError> {
        let act = match id {
            ActuatorId::Back => self.back.as_ref(),
            ActuatorId::Middle => self.middle.as_ref(),
            ActuatorId::Front(i) => self.frontend.get(i),
            ActuatorId::Harness(i) => self.harness_actuators.get(i),
        };

        act.ok_or(RigError::MissingActuator(id))
    }

    /// Get a mutable reference to an actuator by ID.
    pub fn actuator_mut(&mut self, id: ActuatorId) -> Result<&mut Actuator, RigError> {
        let act = match id {
            ActuatorId::Back => self.back.as_mut(),
            ActuatorId::Middle => self.middle.as_mut(),
            ActuatorId::Front(i) => self.frontend.get_mut(i),
            ActuatorId::Harness(i) => self.harness_actuators.get_mut(i),
        };

        act.ok_or(RigError::MissingActuator(id))
    }

    /// Get the welder of the given frontend pair.
    pub fn welder(&self, pair: usize) -> Result<&Welder, RigError> {
        self.welders
            .get(pair)
            .and_then(|w| w.as_ref())
            .ok_or(RigError::MissingWelder(pair))
    }

    /// Get a mutable reference to the welder of the given frontend pair.
    pub fn welder_mut(&mut self, pair: usize) -> Result<&mut Welder, RigError> {
        self.welders
            .get_mut(pair)
            .and_then(|w| w.as_mut())
            .ok_or(RigError::MissingWelder(pair))
    }

    /// Check that every frontend actuator has a welder bound to it.
    pub fn check_pairs(&self) -> Result<(), RigError> {
        if self.frontend.is_empty() {
            return Err(RigError::NoFrontend);
        }

        for i in 0..self.num_pairs() {
            self.welder(i)?;
        }

        Ok(())
    }

    /// Enable or disable every welder present on the rig.
    pub fn set_welders_enabled(&mut self, enabled: bool) {
        for w in self.welders.iter_mut().flatten() {
            w.enabled = enabled;
        }
    }

    /// IDs of all actuators present on the rig, innermost first.
    pub fn actuator_ids(&self) -> Vec<ActuatorId> {
        let mut ids = Vec::new();

        if self.back.is_some() {
            ids.push(ActuatorId::Back);
        }
        if self.middle.is_some() {
            ids.push(ActuatorId::Middle);
        }
        ids.extend((0..self.frontend.len()).map(ActuatorId::Front));
        ids.extend((0..self.harness_actuators.len()).map(ActuatorId::Harness));

        ids
    }

    /// The motion tracking record of an actuator, if it is currently being driven by an extend
    /// or retract operation.
    pub fn motion_progress(&self, id: ActuatorId) -> Option<&MotionProgress> {
        self.motion.get(&id)
    }
}

impl Display for ActuatorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActuatorId::Back => write!(f, "back"),
            ActuatorId::Middle => write!(f, "middle"),
            ActuatorId::Front(i) => write!(f, "front[{}]", i),
            ActuatorId::Harness(i) => write!(f, "harness[{}]", i),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
