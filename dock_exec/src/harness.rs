//! # Docking safety harness
//!
//! The harness locks the rig to the target structure while the frontend welds. It is made of a
//! set of connectors pushed out by a set of harness actuators.
//!
//! Ordering is the only thing keeping the harness safe:
//! - [`HarnessExtend`] arms the connectors, drives the actuators out to their max limit and only
//!   then requests the lock.
//! - [`HarnessRetract`] disables every connector on its first tick, and only starts pulling the
//!   actuators in on the next.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};

use crate::{
    rig::{Rig, RigError, Structure},
    step::{Step, StepStatus},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Extend and engage the harness.
#[derive(Debug)]
pub struct HarnessExtend {
    phase: ExtendPhase,
    rate_ms: f64,
    require_lock: bool,
}

/// Release and retract the harness.
#[derive(Debug)]
pub struct HarnessRetract {
    phase: RetractPhase,
    rate_ms: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtendPhase {
    ArmConnectors,
    Drive,
    Engaged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetractPhase {
    DisableConnectors,
    Drive,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl HarnessExtend {
    /// Create a new extension.
    ///
    /// If `require_lock` is set the extension only completes once every connector reports a
    /// lock, otherwise it completes on the tick after the lock was requested.
    pub fn new(rate_ms: f64, require_lock: bool) -> Self {
        Self {
            phase: ExtendPhase::ArmConnectors,
            rate_ms,
            require_lock,
        }
    }
}

impl Step for HarnessExtend {
    fn step(&mut self, rig: &mut Rig, _structure: &dyn Structure) -> Result<StepStatus, RigError> {
        // Connectors released under us, start over from arming
        if self.phase != ExtendPhase::ArmConnectors && !connectors_armed(rig) {
            warn!("safety harness: connectors released while extending, re-arming");
            self.phase = ExtendPhase::ArmConnectors;
        }

        match self.phase {
            ExtendPhase::ArmConnectors => {
                for c in rig.connectors.iter_mut() {
                    c.enabled = true;
                }
                debug!("safety harness: {} connectors armed", rig.connectors.len());
                self.phase = ExtendPhase::Drive;
                Ok(StepStatus::NotDone)
            }
            ExtendPhase::Drive => {
                for a in rig.harness_actuators.iter_mut() {
                    a.velocity_ms = self.rate_ms;
                }

                if !harness_out(rig) {
                    debug!("safety harness: extending");
                    return Ok(StepStatus::NotDone);
                }

                for c in rig.connectors.iter_mut() {
                    c.connect();
                }
                info!("safety harness: extended, lock requested");
                self.phase = ExtendPhase::Engaged;
                Ok(StepStatus::NotDone)
            }
            ExtendPhase::Engaged => {
                if !harness_out(rig) {
                    warn!("safety harness: no longer extended, driving out again");
                    self.phase = ExtendPhase::Drive;
                    return Ok(StepStatus::NotDone);
                }

                if self.require_lock {
                    let num_unlocked = rig.connectors.iter().filter(|c| !c.is_connected()).count();
                    if num_unlocked > 0 {
                        warn!("safety harness: waiting on {} connectors to lock", num_unlocked);
                        for c in rig.connectors.iter_mut().filter(|c| !c.is_connected()) {
                            c.connect();
                        }
                        return Ok(StepStatus::NotDone);
                    }
                }

                Ok(StepStatus::Done)
            }
        }
    }
}

impl HarnessRetract {
    pub fn new(rate_ms: f64) -> Self {
        Self {
            phase: RetractPhase::DisableConnectors,
            rate_ms,
        }
    }
}

impl Step for HarnessRetract {
    fn step(&mut self, rig: &mut Rig, _structure: &dyn Structure) -> Result<StepStatus, RigError> {
        match self.phase {
            RetractPhase::DisableConnectors => {
                for c in rig.connectors.iter_mut() {
                    c.enabled = false;
                    c.connect_requested = false;
                }
                debug!("safety harness: connectors released");
                self.phase = RetractPhase::Drive;
                Ok(StepStatus::NotDone)
            }
            RetractPhase::Drive => {
                for a in rig.harness_actuators.iter_mut() {
                    a.velocity_ms = -self.rate_ms;
                }

                if rig
                    .harness_actuators
                    .iter()
                    .any(|a| a.position_m != a.min_limit_m)
                {
                    debug!("safety harness: retracting");
                    return Ok(StepStatus::NotDone);
                }

                info!("safety harness: retracted");
                Ok(StepStatus::Done)
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// True if the harness is out with every connector armed and asked to lock. With `require_lock`
/// every connector must also report the lock.
pub fn is_engaged(rig: &Rig, require_lock: bool) -> bool {
    harness_out(rig)
        && rig.connectors.iter().all(|c| c.enabled && c.connect_requested)
        && (!require_lock || rig.connectors.iter().all(|c| c.is_connected()))
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn connectors_armed(rig: &Rig) -> bool {
    rig.connectors.iter().all(|c| c.enabled)
}

fn harness_out(rig: &Rig) -> bool {
    rig.harness_actuators
        .iter()
        .all(|a| a.position_m == a.max_limit_m)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::rig::{Actuator, Connector, ConnectorStatus, RigFrame};
    use crate::sim::SimStructure;

    fn harness_rig() -> Rig {
        let mut rig = Rig::new(RigFrame::default());
        for i in 0..2 {
            rig.harness_actuators
                .push(Actuator::new(&format!("harness {}", i), 2.5, 0.0, 2.0));
            rig.connectors.push(Connector::new(&format!("connector {}", i)));
        }
        rig
    }

    fn set_harness_positions(rig: &mut Rig, pos_m: f64) {
        for a in rig.harness_actuators.iter_mut() {
            a.position_m = pos_m;
        }
    }

    #[test]
    fn test_extend_order() {
        let mut rig = harness_rig();
        let structure = SimStructure::empty();
        let mut ext = HarnessExtend::new(2.5, false);

        // Tick 1: connectors armed, nothing moves
        assert_eq!(ext.step(&mut rig, &structure), Ok(StepStatus::NotDone));
        assert!(rig.connectors.iter().all(|c| c.enabled && !c.connect_requested));
        assert!(rig.harness_actuators.iter().all(|a| a.velocity_ms == 0.0));

        // Tick 2: driving out, no lock requested yet
        assert_eq!(ext.step(&mut rig, &structure), Ok(StepStatus::NotDone));
        assert!(rig.harness_actuators.iter().all(|a| a.velocity_ms == 2.5));
        assert!(rig.connectors.iter().all(|c| !c.connect_requested));

        // Only one actuator out, still driving
        rig.harness_actuators[0].position_m = 2.0;
        assert_eq!(ext.step(&mut rig, &structure), Ok(StepStatus::NotDone));
        assert!(rig.connectors.iter().all(|c| !c.connect_requested));

        // All out, lock requested, done on the next tick regardless of lock state
        set_harness_positions(&mut rig, 2.0);
        assert_eq!(ext.step(&mut rig, &structure), Ok(StepStatus::NotDone));
        assert!(rig.connectors.iter().all(|c| c.connect_requested));
        assert_eq!(ext.step(&mut rig, &structure), Ok(StepStatus::Done));
    }

    #[test]
    fn test_extend_requiring_lock() {
        let mut rig = harness_rig();
        let structure = SimStructure::empty();
        let mut ext = HarnessExtend::new(2.5, true);

        set_harness_positions(&mut rig, 2.0);
        ext.step(&mut rig, &structure).unwrap();
        ext.step(&mut rig, &structure).unwrap();

        assert_eq!(ext.step(&mut rig, &structure), Ok(StepStatus::NotDone));
        rig.connectors[0].status = ConnectorStatus::Connected;
        assert_eq!(ext.step(&mut rig, &structure), Ok(StepStatus::NotDone));
        rig.connectors[1].status = ConnectorStatus::Connected;
        assert_eq!(ext.step(&mut rig, &structure), Ok(StepStatus::Done));
    }

    #[test]
    fn test_retract_disables_connectors_before_moving() {
        let mut rig = harness_rig();
        let structure = SimStructure::empty();
        set_harness_positions(&mut rig, 2.0);
        for c in rig.connectors.iter_mut() {
            c.enabled = true;
            c.connect();
            c.status = ConnectorStatus::Connected;
        }
        for a in rig.harness_actuators.iter_mut() {
            a.velocity_ms = 2.5;
        }

        let mut ret = HarnessRetract::new(2.5);

        // Tick 1: every connector disabled, no velocity changed
        assert_eq!(ret.step(&mut rig, &structure), Ok(StepStatus::NotDone));
        assert!(rig.connectors.iter().all(|c| !c.enabled && !c.connect_requested));
        assert!(rig.harness_actuators.iter().all(|a| a.velocity_ms == 2.5));

        // Tick 2: pulling in
        assert_eq!(ret.step(&mut rig, &structure), Ok(StepStatus::NotDone));
        assert!(rig.harness_actuators.iter().all(|a| a.velocity_ms == -2.5));
        assert!(rig.connectors.iter().all(|c| !c.enabled));

        set_harness_positions(&mut rig, 0.0);
        assert_eq!(ret.step(&mut rig, &structure), Ok(StepStatus::Done));
    }

    #[test]
    fn test_extend_rearms_released_connectors() {
        let mut rig = harness_rig();
        let structure = SimStructure::empty();
        let mut ext = HarnessExtend::new(2.5, true);

        // Armed and driving out
        ext.step(&mut rig, &structure).unwrap();
        ext.step(&mut rig, &structure).unwrap();
        set_harness_positions(&mut rig, 1.0);

        // Something else releases the harness and pulls it in
        let mut ret = HarnessRetract::new(2.5);
        ret.step(&mut rig, &structure).unwrap();
        ret.step(&mut rig, &structure).unwrap();
        set_harness_positions(&mut rig, 0.0);

        // Connectors are armed again before anything else happens
        assert_eq!(ext.step(&mut rig, &structure), Ok(StepStatus::NotDone));
        assert!(rig.connectors.iter().all(|c| c.enabled && !c.connect_requested));
        assert!(rig.harness_actuators.iter().all(|a| a.velocity_ms == -2.5));

        assert_eq!(ext.step(&mut rig, &structure), Ok(StepStatus::NotDone));
        assert!(rig.harness_actuators.iter().all(|a| a.velocity_ms == 2.5));
        assert!(rig.connectors.iter().all(|c| !c.connect_requested));

        set_harness_positions(&mut rig, 2.0);
        assert_eq!(ext.step(&mut rig, &structure), Ok(StepStatus::NotDone));
        assert!(rig.connectors.iter().all(|c| c.enabled && c.connect_requested));
        assert!(!is_engaged(&rig, true));
        assert!(is_engaged(&rig, false));

        for c in rig.connectors.iter_mut() {
            c.status = ConnectorStatus::Connected;
        }
        assert!(is_engaged(&rig, true));
        assert_eq!(ext.step(&mut rig, &structure), Ok(StepStatus::Done));
    }

    #[test]
    fn test_engaged_harness_pulled_in() {
        let mut rig = harness_rig();
        let structure = SimStructure::empty();
        let mut ext = HarnessExtend::new(2.5, false);

        set_harness_positions(&mut rig, 2.0);
        ext.step(&mut rig, &structure).unwrap();
        ext.step(&mut rig, &structure).unwrap();
        assert!(rig.connectors.iter().all(|c| c.connect_requested));

        // Pulled in while waiting to report done, drives out again
        set_harness_positions(&mut rig, 1.0);
        assert_eq!(ext.step(&mut rig, &structure), Ok(StepStatus::NotDone));
        assert!(!is_engaged(&rig, false));
        assert_eq!(ext.step(&mut rig, &structure), Ok(StepStatus::NotDone));

        set_harness_positions(&mut rig, 2.0);
        assert_eq!(ext.step(&mut rig, &structure), Ok(StepStatus::NotDone));
        assert_eq!(ext.step(&mut rig, &structure), Ok(StepStatus::Done));
    }
}
