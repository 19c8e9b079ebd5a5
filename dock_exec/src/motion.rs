//! # Motion control
//!
//! Drives a single actuator to one end of its travel.
//!
//! Both operations arm on their first tick: velocity at full speed in the required direction,
//! soft limits opened to the whole physical range and the starting position recorded in the
//! rig's motion table. No completion check is made on the arming tick, as no motion can have been
//! observed yet.
//!
//! - [`Extend`] completes once two consecutive samples are within the epsilon of each other. An
//!   actuator stopped by an obstruction is therefore considered extended.
//! - [`Retract`] completes only once the position is exactly the lowest physical bound.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info};

use crate::{
    rig::{ActuatorId, MotionProgress, Rig, RigError, Structure},
    step::{Step, StepStatus},
    POSITION_EPS_M,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Extend an actuator until it stops moving.
#[derive(Debug)]
pub struct Extend {
    id: ActuatorId,
    position_eps_m: f64,
    armed: bool,
}

/// Retract an actuator until it bottoms out.
#[derive(Debug)]
pub struct Retract {
    id: ActuatorId,
    position_eps_m: f64,
    armed: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Extend {
    pub fn new(id: ActuatorId) -> Self {
        Self::with_eps(id, POSITION_EPS_M)
    }

    pub fn with_eps(id: ActuatorId, position_eps_m: f64) -> Self {
        Self {
            id,
            position_eps_m,
            armed: false,
        }
    }
}

impl Step for Extend {
    fn step(&mut self, rig: &mut Rig, _structure: &dyn Structure) -> Result<StepStatus, RigError> {
        if !self.armed {
            arm(rig, self.id, 1.0, self.position_eps_m)?;
            self.armed = true;
            return Ok(StepStatus::NotDone);
        }

        let pos_m = rig.actuator(self.id)?.position_m;
        let eps = self.position_eps_m;
        let progress = rig
            .motion
            .entry(self.id)
            .or_insert_with(|| MotionProgress::new(pos_m, eps));

        if progress.position_changed(pos_m) {
            debug!(
                "extending: {}, position: {:.5} m, prev pos: {:.5} m",
                self.id,
                pos_m,
                progress.prev_position_m()
            );
            progress.change_position(pos_m);
            return Ok(StepStatus::NotDone);
        }

        rig.motion.remove(&self.id);
        rig.actuator_mut(self.id)?.velocity_ms = 0.0;

        info!("{} extended, stable at {:.5} m", self.id, pos_m);

        Ok(StepStatus::Done)
    }
}

impl Retract {
    pub fn new(id: ActuatorId) -> Self {
        Self::with_eps(id, POSITION_EPS_M)
    }

    pub fn with_eps(id: ActuatorId, position_eps_m: f64) -> Self {
        Self {
            id,
            position_eps_m,
            armed: false,
        }
    }
}

impl Step for Retract {
    fn step(&mut self, rig: &mut Rig, _structure: &dyn Structure) -> Result<StepStatus, RigError> {
        if !self.armed {
            arm(rig, self.id, -1.0, self.position_eps_m)?;
            self.armed = true;
            return Ok(StepStatus::NotDone);
        }

        let act = rig.actuator(self.id)?;
        let (pos_m, lowest_m) = (act.position_m, act.lowest_m);

        if pos_m != lowest_m {
            let eps = self.position_eps_m;
            let progress = rig
                .motion
                .entry(self.id)
                .or_insert_with(|| MotionProgress::new(pos_m, eps));

            debug!(
                "retracting: {}, position: {:.5} m, prev pos: {:.5} m",
                self.id,
                pos_m,
                progress.prev_position_m()
            );
            progress.change_position(pos_m);
            return Ok(StepStatus::NotDone);
        }

        rig.motion.remove(&self.id);
        rig.actuator_mut(self.id)?.velocity_ms = 0.0;

        info!("{} retracted", self.id);

        Ok(StepStatus::Done)
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Arm an actuator for travel in the direction of `sign`, recording its starting position.
fn arm(rig: &mut Rig, id: ActuatorId, sign: f64, position_eps_m: f64) -> Result<(), RigError> {
    let act = rig.actuator_mut(id)?;
    act.velocity_ms = sign * act.max_velocity_ms;
    act.set_full_range();
    let start_m = act.position_m;
    let velocity_ms = act.velocity_ms;

    rig.motion
        .insert(id, MotionProgress::new(start_m, position_eps_m));

    debug!("{} armed at {:.5} m, velocity {:.3} m/s", id, start_m, velocity_ms);

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
