//! # Docking sequences
//!
//! The two top-level sequences run by the docking manager:
//!
//! - Reset: bring every actuator of the rig back to its lowest position, harness first.
//! - Extend and weld: extend the structural stages, then repeat weld passes of the frontend,
//!   stepping one structural stage back by one block between passes, until both structural
//!   stages are fully in.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};

use super::DockParams;
use crate::{
    harness::{self, HarnessExtend, HarnessRetract},
    motion::{Extend, Retract},
    rig::{ActuatorId, Rig, RigError, Structure},
    step::{Action, Parallel, Sequence, Step, StepStatus},
    welding_cycle::WeldingCycle,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Repeated weld passes with the harness engaged, stepping the structural stages in between.
#[derive(Debug)]
pub struct WeldLoop {
    phase: LoopPhase,
    params: DockParams,
    num_passes: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
enum LoopPhase {
    Start,

    /// Decide whether another pass is needed
    Check,

    HarnessExtend(HarnessExtend),

    Weld(WeldingCycle),

    HarnessRetract(HarnessRetract),

    /// Pick the stage to step back and demand the step
    Advance,

    /// Wait for the stepped stage to reach its new position
    Reposition(ActuatorId),

    Done,
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Sequence returning the whole rig to its stowed position.
pub fn reset_sequence(params: &DockParams) -> Sequence {
    let eps = params.position_eps_m;

    Sequence::new("reset")
        .then(Action::new("disable welders", disable_welders))
        .then(HarnessRetract::new(params.harness_rate_ms))
        .then(RetractFrontend::new(eps))
        .then(Retract::with_eps(ActuatorId::Middle, eps))
        .then(Retract::with_eps(ActuatorId::Back, eps))
}

/// Sequence extending the rig and welding the structure in front of it.
pub fn extend_and_weld_sequence(params: &DockParams) -> Sequence {
    let eps = params.position_eps_m;

    Sequence::new("extend and weld")
        .then(Action::new("disable welders", disable_welders))
        .then(Extend::with_eps(ActuatorId::Back, eps))
        .then(Extend::with_eps(ActuatorId::Middle, eps))
        .then(WeldLoop::new(params))
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl WeldLoop {
    pub fn new(params: &DockParams) -> Self {
        Self {
            phase: LoopPhase::Start,
            params: params.clone(),
            num_passes: 0,
        }
    }

    /// Number of complete weld passes so far.
    pub fn num_passes(&self) -> usize {
        self.num_passes
    }

    /// True if both structural stages are fully in.
    fn is_stowed(rig: &Rig) -> Result<bool, RigError> {
        Ok(rig.actuator(ActuatorId::Middle)?.is_at_lowest()
            && rig.actuator(ActuatorId::Back)?.is_at_lowest())
    }

    /// Drop the current pass without counting it.
    fn abandon_pass(&self, rig: &mut Rig, reason: &str) -> LoopPhase {
        rig.set_welders_enabled(false);
        warn!("Weld loop: pass {} abandoned, {}", self.num_passes + 1, reason);
        LoopPhase::Check
    }

    /// Pin a structural stage where it currently is.
    fn hold(rig: &mut Rig, id: ActuatorId) -> Result<(), RigError> {
        let act = rig.actuator_mut(id)?;
        act.min_limit_m = act.position_m;
        act.velocity_ms = -act.max_velocity_ms;
        Ok(())
    }
}

impl Step for WeldLoop {
    fn step(&mut self, rig: &mut Rig, structure: &dyn Structure) -> Result<StepStatus, RigError> {
        let phase = std::mem::replace(&mut self.phase, LoopPhase::Done);

        self.phase = match phase {
            LoopPhase::Start => {
                Self::hold(rig, ActuatorId::Middle)?;
                Self::hold(rig, ActuatorId::Back)?;
                LoopPhase::Check
            }
            LoopPhase::Check => {
                if Self::is_stowed(rig)? {
                    info!("Weld loop: complete after {} passes", self.num_passes);
                    LoopPhase::Done
                } else {
                    info!("Weld loop: pass {}, engaging harness", self.num_passes + 1);
                    LoopPhase::HarnessExtend(HarnessExtend::new(
                        self.params.harness_rate_ms,
                        self.params.require_harness_lock,
                    ))
                }
            }
            // A pass only starts with the stages out, finding them in means the rig was stowed
            // from under the pass
            LoopPhase::HarnessExtend(_) | LoopPhase::Weld(_) if Self::is_stowed(rig)? => {
                self.abandon_pass(rig, "rig stowed")
            }
            LoopPhase::HarnessExtend(mut ext) => match ext.step(rig, structure)? {
                StepStatus::Done => LoopPhase::Weld(WeldingCycle::new(&self.params)),
                StepStatus::NotDone => LoopPhase::HarnessExtend(ext),
            },
            LoopPhase::Weld(_)
                if !harness::is_engaged(rig, self.params.require_harness_lock) =>
            {
                self.abandon_pass(rig, "harness disengaged")
            }
            LoopPhase::Weld(mut cycle) => match cycle.step(rig, structure)? {
                StepStatus::Done => {
                    self.num_passes += 1;
                    LoopPhase::HarnessRetract(HarnessRetract::new(self.params.harness_rate_ms))
                }
                StepStatus::NotDone => LoopPhase::Weld(cycle),
            },
            LoopPhase::HarnessRetract(mut ret) => match ret.step(rig, structure)? {
                StepStatus::Done => LoopPhase::Advance,
                StepStatus::NotDone => LoopPhase::HarnessRetract(ret),
            },
            LoopPhase::Advance => {
                // Middle is used up first, then back
                let id = if rig.actuator(ActuatorId::Middle)?.is_at_lowest() {
                    ActuatorId::Back
                } else {
                    ActuatorId::Middle
                };

                let block_length_m = self.params.block_length_m;
                let act = rig.actuator_mut(id)?;
                act.min_limit_m = (act.position_m - block_length_m).max(act.lowest_m);
                act.velocity_ms = -act.max_velocity_ms;

                info!("Weld loop: stepping {} back to {:.5} m", id, act.min_limit_m);

                LoopPhase::Reposition(id)
            }
            LoopPhase::Reposition(id) => {
                let act = rig.actuator(id)?;
                if (act.position_m - act.min_limit_m).abs() < self.params.position_eps_m {
                    LoopPhase::Check
                } else {
                    debug!("Weld loop: {} repositioning, at {:.5} m", id, act.position_m);
                    LoopPhase::Reposition(id)
                }
            }
            LoopPhase::Done => LoopPhase::Done,
        };

        Ok(StepStatus::from_done(matches!(self.phase, LoopPhase::Done)))
    }
}

/// Retract every frontend actuator in parallel.
///
/// The set of pairs is only known once the rig is seen, so the parallel composite is built on
/// the first tick.
#[derive(Debug)]
struct RetractFrontend {
    position_eps_m: f64,
    retract: Option<Parallel>,
}

impl RetractFrontend {
    fn new(position_eps_m: f64) -> Self {
        Self {
            position_eps_m,
            retract: None,
        }
    }
}

impl Step for RetractFrontend {
    fn step(&mut self, rig: &mut Rig, structure: &dyn Structure) -> Result<StepStatus, RigError> {
        if rig.frontend.is_empty() {
            return Err(RigError::NoFrontend);
        }

        let eps = self.position_eps_m;
        let num_pairs = rig.num_pairs();

        self.retract
            .get_or_insert_with(|| {
                (0..num_pairs)
                    .map(|i| Retract::with_eps(ActuatorId::Front(i), eps))
                    .collect()
            })
            .step(rig, structure)
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn disable_welders(rig: &mut Rig) -> Result<(), RigError> {
    rig.set_welders_enabled(false);
    Ok(())
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
