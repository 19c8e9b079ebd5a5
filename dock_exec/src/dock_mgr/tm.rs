//! # Docking telemetry
//!
//! Snapshot of the docking manager and of the rig it drives, produced once per cycle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::RequestState;
use crate::rig::{ActuatorId, ConnectorStatus, Rig};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockTm {
    /// Number of periodic cycles the manager has run.
    pub cycle: u64,

    pub state: RequestState,

    /// True if a weld is held while a reset runs.
    pub weld_paused: bool,

    pub actuators: Vec<ActuatorTm>,

    /// Enable state of each welder, `None` for unbound pairs.
    pub welders_enabled: Vec<Option<bool>>,

    pub connectors: Vec<ConnectorStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActuatorTm {
    pub id: ActuatorId,
    pub position_m: f64,
    pub velocity_ms: f64,
    pub min_limit_m: f64,
    pub max_limit_m: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DockTm {
    pub(super) fn new(cycle: u64, state: RequestState, weld_paused: bool, rig: &Rig) -> Self {
        let actuators = rig
            .actuator_ids()
            .into_iter()
            .filter_map(|id| {
                rig.actuator(id).ok().map(|a| ActuatorTm {
                    id,
                    position_m: a.position_m,
                    velocity_ms: a.velocity_ms,
                    min_limit_m: a.min_limit_m,
                    max_limit_m: a.max_limit_m,
                })
            })
            .collect();

        Self {
            cycle,
            state,
            weld_paused,
            actuators,
            welders_enabled: rig
                .welders
                .iter()
                .map(|w| w.as_ref().map(|w| w.enabled))
                .collect(),
            connectors: rig.connectors.iter().map(|c| c.status).collect(),
        }
    }
}
