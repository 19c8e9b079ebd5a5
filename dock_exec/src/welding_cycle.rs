//! # Welding cycle
//!
//! One full weld pass of the frontend. Every actuator/welder pair is first extended in parallel,
//! then walked backwards one block at a time. At each stop the pair's [`WeldZoneTracker`] is
//! polled once per tick, the welder stays on until the zone reports complete, after which the
//! actuator steps back by one block length and a fresh tracker is armed at the new stop.
//!
//! Pairs are independent of each other: a pair still welding never holds back a pair which has
//! finished its zone. The cycle is done once every pair has reached the lowest position of its
//! actuator.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info};

use crate::{
    dock_mgr::DockParams,
    motion::Extend,
    rig::{ActuatorId, Rig, RigError, Structure},
    step::{Parallel, Step, StepStatus},
    weld_zone::WeldZoneTracker,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Extend the frontend, then weld while stepping every pair back to its lowest position.
#[derive(Debug)]
pub struct WeldingCycle {
    phase: CyclePhase,

    block_length_m: f64,
    position_eps_m: f64,
    decay_ticks_per_empty_cell: u32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
enum CyclePhase {
    Start,

    /// All frontend actuators extending in parallel
    Extend(Parallel),

    /// Frontend extended, pinning every actuator where it stopped
    Hold,

    /// Per-pair weld and step back
    Weld(Vec<PairState>),

    Done,
}

/// Progress of a single actuator/welder pair through the weld phase.
#[derive(Debug)]
enum PairState {
    /// Stationary, welding the zone in reach
    Welding(WeldZoneTracker),

    /// Stepping back to the next stop, welder off
    Repositioning,

    /// Reached its lowest position
    Finished,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl WeldingCycle {
    pub fn new(params: &DockParams) -> Self {
        Self {
            phase: CyclePhase::Start,
            block_length_m: params.block_length_m,
            position_eps_m: params.position_eps_m,
            decay_ticks_per_empty_cell: params.decay_ticks_per_empty_cell,
        }
    }

    /// Number of pairs which have completed their pass, or `None` if the weld phase has not been
    /// reached yet.
    pub fn num_finished(&self) -> Option<usize> {
        match &self.phase {
            CyclePhase::Weld(pairs) => Some(
                pairs
                    .iter()
                    .filter(|p| matches!(p, PairState::Finished))
                    .count(),
            ),
            _ => None,
        }
    }

    fn new_tracker(
        &self,
        rig: &Rig,
        structure: &dyn Structure,
        pair: usize,
    ) -> Result<WeldZoneTracker, RigError> {
        WeldZoneTracker::new(rig, structure, pair, self.decay_ticks_per_empty_cell)
    }

    /// Advance one pair through the weld phase.
    fn step_pair(
        &self,
        rig: &mut Rig,
        structure: &dyn Structure,
        pair: usize,
        state: PairState,
    ) -> Result<PairState, RigError> {
        let id = ActuatorId::Front(pair);

        let mut tracker = match state {
            PairState::Finished => return Ok(PairState::Finished),
            PairState::Repositioning => {
                let act = rig.actuator(id)?;
                if (act.position_m - act.min_limit_m).abs() >= self.position_eps_m {
                    debug!("{} repositioning, at {:.5} m", id, act.position_m);
                    return Ok(PairState::Repositioning);
                }

                if act.is_at_lowest() {
                    info!("{} weld pass complete", id);
                    return Ok(PairState::Finished);
                }

                // New stop reached, the zone in reach has changed
                self.new_tracker(rig, structure, pair)?
            }
            PairState::Welding(tracker) => tracker,
        };

        match tracker.poll(structure) {
            StepStatus::NotDone => {
                rig.welder_mut(pair)?.enabled = true;

                let act = rig.actuator_mut(id)?;
                act.min_limit_m = act.position_m;

                Ok(PairState::Welding(tracker))
            }
            StepStatus::Done => {
                rig.welder_mut(pair)?.enabled = false;

                let act = rig.actuator_mut(id)?;
                act.min_limit_m = (act.position_m - self.block_length_m).max(act.lowest_m);
                act.velocity_ms = -act.max_velocity_ms;

                info!(
                    "{} zone complete ({:?}), stepping back to {:.5} m",
                    id,
                    tracker.report(structure),
                    act.min_limit_m
                );

                Ok(PairState::Repositioning)
            }
        }
    }
}

impl Step for WeldingCycle {
    fn step(&mut self, rig: &mut Rig, structure: &dyn Structure) -> Result<StepStatus, RigError> {
        let phase = std::mem::replace(&mut self.phase, CyclePhase::Done);

        self.phase = match phase {
            CyclePhase::Start => {
                rig.check_pairs()?;
                rig.set_welders_enabled(false);

                info!("Welding cycle: extending {} frontend pairs", rig.num_pairs());

                let mut extend: Parallel = (0..rig.num_pairs())
                    .map(|i| Extend::with_eps(ActuatorId::Front(i), self.position_eps_m))
                    .collect();

                match extend.step(rig, structure)? {
                    StepStatus::Done => CyclePhase::Hold,
                    StepStatus::NotDone => CyclePhase::Extend(extend),
                }
            }
            CyclePhase::Extend(mut extend) => match extend.step(rig, structure)? {
                StepStatus::Done => CyclePhase::Hold,
                StepStatus::NotDone => CyclePhase::Extend(extend),
            },
            CyclePhase::Hold => {
                let mut pairs = Vec::with_capacity(rig.num_pairs());

                for pair in 0..rig.num_pairs() {
                    let act = rig.actuator_mut(ActuatorId::Front(pair))?;
                    act.min_limit_m = act.position_m;
                    act.velocity_ms = -act.max_velocity_ms;

                    pairs.push(PairState::Welding(self.new_tracker(rig, structure, pair)?));
                }

                info!("Welding cycle: frontend extended, welding");

                CyclePhase::Weld(pairs)
            }
            CyclePhase::Weld(pairs) => {
                let mut next = Vec::with_capacity(pairs.len());

                for (pair, state) in pairs.into_iter().enumerate() {
                    next.push(self.step_pair(rig, structure, pair, state)?);
                }

                if next.iter().all(|p| matches!(p, PairState::Finished)) {
                    rig.set_welders_enabled(false);
                    info!("Welding cycle: complete");
                    CyclePhase::Done
                } else {
                    CyclePhase::Weld(next)
                }
            }
            CyclePhase::Done => CyclePhase::Done,
        };

        Ok(StepStatus::from_done(matches!(self.phase, CyclePhase::Done)))
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
