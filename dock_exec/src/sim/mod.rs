//! # Simulated rig
//!
//! Stands in for the physical rig and the target structure. Once per cycle, after the docking
//! manager has set its demands, [`SimRig::advance`] moves every actuator according to its
//! velocity and limits, updates connector lock states and lets enabled welders build the
//! structure.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;
mod structure;

pub use params::*;
pub use structure::*;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::convert::TryFrom;

use log::{debug, trace};
use nalgebra::Vector3;

use crate::{
    rig::{
        Actuator, ActuatorId, Connector, ConnectorStatus, FrameError, Rig, RigFrame, Structure,
        Welder,
    },
    weld_zone::weld_footprint,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
pub struct SimRig {
    params: SimParams,

    pub structure: SimStructure,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SimError {
    #[error("Invalid rig frame: {0}")]
    InvalidFrame(FrameError),

    #[error("The rig must have at least one frontend pair")]
    NoFrontend,

    #[error("Actuator {0} has its lowest position ({1} m) above its highest ({2} m)")]
    InvalidActuatorRange(String, f64, f64),

    #[error("Structure bounds {0:?} to {1:?} are inverted")]
    InvalidBounds([i32; 3], [i32; 3]),

    #[error("Cell {0:?} is outside the structure bounds")]
    CellOutOfBounds([i32; 3]),

    #[error("More than one block placed at {0:?}")]
    DuplicateBlock([i32; 3]),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimRig {
    pub fn new(params: SimParams, block_length_m: f64) -> Result<Self, SimError> {
        RigFrame::try_from(params.frame).map_err(SimError::InvalidFrame)?;

        if params.frontend.is_empty() {
            return Err(SimError::NoFrontend);
        }

        let all_actuators = params
            .back
            .iter()
            .chain(params.middle.iter())
            .chain(params.frontend.iter().map(|p| &p.actuator))
            .chain(params.harness.iter());
        for a in all_actuators {
            if a.lowest_m > a.highest_m {
                return Err(SimError::InvalidActuatorRange(
                    a.name.clone(),
                    a.lowest_m,
                    a.highest_m,
                ));
            }
        }

        let structure = SimStructure::from_params(&params.structure, block_length_m)?;

        Ok(Self { params, structure })
    }

    /// Build the rig described by the parameters, with every actuator at its lowest position.
    pub fn build_rig(&self) -> Result<Rig, SimError> {
        let frame = RigFrame::try_from(self.params.frame).map_err(SimError::InvalidFrame)?;
        let mut rig = Rig::new(frame);

        let actuator = |p: &ActuatorParams| {
            Actuator::new(&p.name, p.max_velocity_ms, p.lowest_m, p.highest_m)
        };

        rig.back = self.params.back.as_ref().map(actuator);
        rig.middle = self.params.middle.as_ref().map(actuator);

        for pair in self.params.frontend.iter() {
            rig.frontend.push(actuator(&pair.actuator));
            rig.welders.push(Some(Welder::new(
                &pair.welder_name,
                Vector3::from(pair.welder_tip),
            )));
        }

        rig.harness_actuators = self.params.harness.iter().map(actuator).collect();
        rig.connectors = (0..self.params.num_connectors)
            .map(|i| Connector::new(&format!("connector {}", i)))
            .collect();

        Ok(rig)
    }

    /// Advance the simulation by `dt_s` seconds.
    pub fn advance(&mut self, rig: &mut Rig, dt_s: f64) {
        for id in rig.actuator_ids() {
            let obstruction_m = self
                .params
                .obstructions
                .iter()
                .filter(|o| o.actuator == id)
                .map(|o| o.max_extent_m)
                .fold(None, |acc: Option<f64>, m| Some(acc.map_or(m, |a| a.min(m))));

            if let Ok(act) = rig.actuator_mut(id) {
                move_actuator(act, obstruction_m, dt_s);
                trace!("sim: {} at {:.5} m", id, act.position_m);
            }
        }

        let harness_out = rig
            .harness_actuators
            .iter()
            .all(|a| a.position_m >= a.max_limit_m);
        for c in rig.connectors.iter_mut() {
            c.status = connector_status(c, harness_out);
        }

        let amount = self.params.weld_rate_per_s * dt_s;
        for pair in 0..rig.num_pairs() {
            let tip = match rig.welder(pair) {
                Ok(w) if w.enabled => w.tip,
                _ => continue,
            };

            for cell in weld_footprint(&rig.frame, tip).iter() {
                let target = self.structure.carrier_to_structure(rig, pair, *cell);
                self.structure.weld(target, amount);
            }
        }

        debug!(
            "sim: {} blocks, {} connectors locked",
            self.structure.num_blocks(),
            rig.connectors.iter().filter(|c| c.is_connected()).count()
        );
    }

    /// Limit the extension of an actuator, as if something were in its way.
    pub fn add_obstruction(&mut self, actuator: ActuatorId, max_extent_m: f64) {
        self.params.obstructions.push(Obstruction {
            actuator,
            max_extent_m,
        });
    }

    pub fn clear_obstructions(&mut self) {
        self.params.obstructions.clear();
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Move an actuator toward the soft limit in the direction of travel.
///
/// An actuator already at or past the limit it is moving toward stays where it is.
fn move_actuator(act: &mut Actuator, obstruction_m: Option<f64>, dt_s: f64) {
    let lower_m = act.min_limit_m.max(act.lowest_m);
    let mut upper_m = act.max_limit_m.min(act.highest_m);
    if let Some(o) = obstruction_m {
        upper_m = upper_m.min(o);
    }

    let pos_m = act.position_m;
    let target_m = pos_m + act.velocity_ms * dt_s;

    if act.velocity_ms > 0.0 && pos_m < upper_m {
        act.position_m = target_m.min(upper_m);
    } else if act.velocity_ms < 0.0 && pos_m > lower_m {
        act.position_m = target_m.max(lower_m);
    }
}

fn connector_status(c: &Connector, harness_out: bool) -> ConnectorStatus {
    match (c.enabled, harness_out, c.connect_requested) {
        (true, true, true) => ConnectorStatus::Connected,
        (true, true, false) => ConnectorStatus::Connectable,
        _ => ConnectorStatus::Unconnected,
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_build_rig() {
        let sim = SimRig::new(SimParams::default(), crate::BLOCK_LENGTH_M).unwrap();
        let rig = sim.build_rig().unwrap();

        assert_eq!(rig.num_pairs(), 2);
        assert!(rig.check_pairs().is_ok());
        assert_eq!(rig.harness_actuators.len(), 2);
        assert_eq!(rig.connectors.len(), 2);
        assert!(rig.back.as_ref().unwrap().is_at_lowest());
    }

    #[test]
    fn test_params_file() {
        let params: SimParams =
            util::params::from_toml_str(include_str!("../../../params/sim.toml")).unwrap();
        let sim = SimRig::new(params, crate::BLOCK_LENGTH_M).unwrap();
        let rig = sim.build_rig().unwrap();

        assert_eq!(rig.num_pairs(), 2);
        assert_eq!(rig.welder(1).unwrap().tip, Vector3::new(0, 2, 0));
        assert_eq!(sim.structure.num_blocks(), 1);
    }

    #[test]
    fn test_bad_params() {
        let mut params = SimParams::default();
        params.frame.right = [1, 0, 0];
        assert!(matches!(
            SimRig::new(params, 2.5),
            Err(SimError::InvalidFrame(_))
        ));

        let mut params = SimParams::default();
        params.frontend.clear();
        assert_eq!(SimRig::new(params, 2.5).unwrap_err(), SimError::NoFrontend);

        let mut params = SimParams::default();
        params.harness[1].lowest_m = 2.0;
        assert!(matches!(
            SimRig::new(params, 2.5),
            Err(SimError::InvalidActuatorRange(_, _, _))
        ));
    }

    #[test]
    fn test_move_actuator() {
        let mut a = Actuator::new("a", 1.0, 0.0, 2.0);

        a.velocity_ms = 1.0;
        move_actuator(&mut a, None, 0.5);
        assert_eq!(a.position_m, 0.5);
        move_actuator(&mut a, Some(0.8), 0.5);
        assert_eq!(a.position_m, 0.8);
        move_actuator(&mut a, Some(0.8), 0.5);
        assert_eq!(a.position_m, 0.8);

        // Soft limit clamp is exact
        a.velocity_ms = -1.0;
        a.min_limit_m = 0.3;
        move_actuator(&mut a, None, 1.0);
        assert_eq!(a.position_m, 0.3);

        // Past a limit the actuator is moving toward, it stays put
        a.min_limit_m = 0.5;
        move_actuator(&mut a, None, 1.0);
        assert_eq!(a.position_m, 0.3);
    }

    #[test]
    fn test_connectors() {
        let mut sim = SimRig::new(SimParams::default(), 2.5).unwrap();
        let mut rig = sim.build_rig().unwrap();

        for c in rig.connectors.iter_mut() {
            c.enabled = true;
        }
        sim.advance(&mut rig, 0.1);
        assert!(rig
            .connectors
            .iter()
            .all(|c| c.status == ConnectorStatus::Unconnected));

        for a in rig.harness_actuators.iter_mut() {
            a.position_m = a.max_limit_m;
        }
        sim.advance(&mut rig, 0.1);
        assert!(rig
            .connectors
            .iter()
            .all(|c| c.status == ConnectorStatus::Connectable));

        rig.connectors[0].connect();
        sim.advance(&mut rig, 0.1);
        assert!(rig.connectors[0].is_connected());
        assert!(!rig.connectors[1].is_connected());

        rig.connectors[0].enabled = false;
        sim.advance(&mut rig, 0.1);
        assert_eq!(rig.connectors[0].status, ConnectorStatus::Unconnected);
    }

    #[test]
    fn test_welding_spawns_blocks() {
        let mut sim = SimRig::new(SimParams::default(), 2.5).unwrap();
        let mut rig = sim.build_rig().unwrap();

        sim.advance(&mut rig, 0.1);
        assert_eq!(sim.structure.num_blocks(), 0);

        // Welder 0 at rest reaches planned cell (2, 0, 0)
        rig.welder_mut(0).unwrap().enabled = true;
        sim.advance(&mut rig, 0.5);
        assert_eq!(sim.structure.num_blocks(), 1);

        sim.advance(&mut rig, 0.5);
        sim.advance(&mut rig, 0.5);
        assert!(sim.structure.blocks().all(|b| b.build_level == 1.0));
    }
}
