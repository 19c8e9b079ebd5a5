//! # Docking manager
//!
//! Top-level request state machine of the rig. Two sequences can exist at once, a reset and an
//! extend-and-weld, each created when a request for it is accepted and dropped once it reports
//! done:
//!
//! - `Idle` - Neither sequence exists.
//! - `Resetting` - A reset is running. A weld which was running when the reset was accepted is
//!   held, untouched, and resumes where it left off once the reset completes.
//! - `Welding` - An extend-and-weld is running.
//!
//! Requests arrive as [`Trigger::Command`]s and only change which sequences exist, sequences are
//! only stepped by [`Trigger::Periodic`] calls.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;
mod sequences;
pub mod tm;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt::Display;

use log::{info, warn};
use serde::{Deserialize, Serialize};

pub use self::{
    params::DockParams,
    sequences::{extend_and_weld_sequence, reset_sequence, WeldLoop},
    tm::DockTm,
};
use crate::{
    rig::{Rig, RigError, Structure},
    step::{Sequence, Step},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Docking Manager
#[derive(Debug)]
pub struct DockMgr {
    /// Parameters of the manager and all its sequences.
    pub params: DockParams,

    /// Active reset, if any.
    reset: Option<Sequence>,

    /// Active or paused extend-and-weld, if any.
    weld: Option<Sequence>,

    /// Number of periodic triggers handled.
    cycle: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DockMgrError {
    #[error("Failed to load DockParams: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Invalid DockParams: {0}")]
    InvalidParams(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestState {
    Idle,
    Resetting,
    Welding,
}

/// A request made to the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockCmd {
    /// Stow the whole rig
    Reset,

    /// Extend the rig and weld
    Weld,
}

/// Reason the manager is being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A user command, handled as a request
    Command(DockCmd),

    /// The fixed-period control tick
    Periodic,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DockMgr {
    /// Create the manager from the parameter file at `params_path`, relative to the parameters
    /// directory.
    pub fn init(params_path: &str) -> Result<Self, DockMgrError> {
        let params: DockParams =
            util::params::load(params_path).map_err(DockMgrError::ParamLoadError)?;
        params.validate()?;

        Ok(Self::new(params))
    }

    pub fn new(params: DockParams) -> Self {
        Self {
            params,
            reset: None,
            weld: None,
            cycle: 0,
        }
    }

    pub fn state(&self) -> RequestState {
        if self.reset.is_some() {
            RequestState::Resetting
        } else if self.weld.is_some() {
            RequestState::Welding
        } else {
            RequestState::Idle
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state() == RequestState::Idle
    }

    /// True if a weld is being held by a running reset.
    pub fn is_weld_paused(&self) -> bool {
        self.reset.is_some() && self.weld.is_some()
    }

    /// Handle one trigger.
    ///
    /// Precondition violations raised by the running sequence are returned as is, the manager
    /// makes no attempt to recover from them.
    pub fn step(
        &mut self,
        trigger: Trigger,
        rig: &mut Rig,
        structure: &dyn Structure,
    ) -> Result<RequestState, RigError> {
        match trigger {
            Trigger::Command(cmd) => self.request(cmd),
            Trigger::Periodic => {
                self.cycle += 1;

                if let Some(reset) = self.reset.as_mut() {
                    if reset.step(rig, structure)?.is_done() {
                        self.reset = None;
                        info!("DockMgr: reset complete");
                        if self.weld.is_some() {
                            info!("DockMgr: resuming paused weld");
                        }
                    }
                } else if let Some(weld) = self.weld.as_mut() {
                    if weld.step(rig, structure)?.is_done() {
                        self.weld = None;
                        info!("DockMgr: extend and weld complete");
                    }
                }
            }
        }

        Ok(self.state())
    }

    /// Telemetry snapshot of the manager and the rig.
    pub fn get_tm(&self, rig: &Rig) -> DockTm {
        DockTm::new(self.cycle, self.state(), self.is_weld_paused(), rig)
    }

    fn request(&mut self, cmd: DockCmd) {
        match cmd {
            DockCmd::Reset => {
                if self.reset.is_some() {
                    warn!("DockMgr: reset already in progress, request ignored");
                    return;
                }

                if self.weld.is_some() && !self.params.pause_weld_on_reset {
                    self.weld = None;
                    warn!("DockMgr: weld in progress abandoned");
                } else if self.weld.is_some() {
                    info!("DockMgr: weld in progress paused");
                }

                self.reset = Some(reset_sequence(&self.params));
                info!("DockMgr: reset accepted");
            }
            DockCmd::Weld => {
                if self.reset.is_some() || self.weld.is_some() {
                    warn!(
                        "DockMgr: cannot start a weld while {}, request ignored",
                        self.state()
                    );
                    return;
                }

                self.weld = Some(extend_and_weld_sequence(&self.params));
                info!("DockMgr: extend and weld accepted");
            }
        }
    }
}

impl DockCmd {
    /// Interpret a command token. `"reset"` requests a reset, any other token, including an
    /// empty one, requests a weld.
    pub fn from_token(token: &str) -> Self {
        match token.trim() {
            "reset" => DockCmd::Reset,
            _ => DockCmd::Weld,
        }
    }
}

impl Display for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestState::Idle => write!(f, "idle"),
            RequestState::Resetting => write!(f, "resetting"),
            RequestState::Welding => write!(f, "welding"),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::rig::ActuatorId;
    use crate::sim::{SimParams, SimRig};

    const DT_S: f64 = 0.1;

    fn setup(params: DockParams) -> (DockMgr, SimRig, Rig) {
        let sim = SimRig::new(SimParams::default(), params.block_length_m).unwrap();
        let rig = sim.build_rig().unwrap();
        (DockMgr::new(params), sim, rig)
    }

    fn tick(mgr: &mut DockMgr, sim: &mut SimRig, rig: &mut Rig) -> RequestState {
        let state = mgr.step(Trigger::Periodic, rig, &sim.structure).unwrap();
        sim.advance(rig, DT_S);
        state
    }

    fn command(mgr: &mut DockMgr, sim: &SimRig, rig: &mut Rig, token: &str) -> RequestState {
        mgr.step(Trigger::Command(DockCmd::from_token(token)), rig, &sim.structure)
            .unwrap()
    }

    /// Welders may only be on with every connector locked.
    fn assert_welders_locked(rig: &Rig) {
        if rig.welders.iter().flatten().any(|w| w.enabled) {
            assert!(
                rig.connectors.iter().all(|c| c.is_connected()),
                "welding without the harness locked"
            );
        }
    }

    /// Run until idle, checking the welders never run unlocked. Returns the number of ticks.
    fn run_to_idle(mgr: &mut DockMgr, sim: &mut SimRig, rig: &mut Rig, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while tick(mgr, sim, rig) != RequestState::Idle {
            assert_welders_locked(rig);
            ticks += 1;
            assert!(ticks < max_ticks, "not idle after {} ticks", max_ticks);
        }
        ticks
    }

    /// Start a weld, send a reset once `pause_when` holds and run until idle.
    fn pause_weld_when<F>(params: DockParams, pause_when: F) -> (DockMgr, SimRig, Rig)
    where
        F: Fn(&Rig) -> bool,
    {
        let (mut mgr, mut sim, mut rig) = setup(params);

        command(&mut mgr, &sim, &mut rig, "");
        let mut ticks = 0;
        while !pause_when(&rig) {
            assert_eq!(tick(&mut mgr, &mut sim, &mut rig), RequestState::Welding);
            assert_welders_locked(&rig);
            ticks += 1;
            assert!(ticks < 20_000);
        }

        assert_eq!(command(&mut mgr, &sim, &mut rig, "reset"), RequestState::Resetting);
        assert!(mgr.is_weld_paused());

        run_to_idle(&mut mgr, &mut sim, &mut rig, 50_000);

        for id in rig.actuator_ids() {
            assert!(rig.actuator(id).unwrap().is_at_lowest(), "{} not in", id);
        }
        assert!(rig.welders.iter().flatten().all(|w| !w.enabled));

        (mgr, sim, rig)
    }

    fn harness_driving_out(rig: &Rig) -> bool {
        rig.connectors.iter().all(|c| c.enabled)
            && rig
                .harness_actuators
                .iter()
                .all(|a| a.velocity_ms > 0.0 && a.position_m < a.max_limit_m)
    }

    #[test]
    fn test_from_token() {
        assert_eq!(DockCmd::from_token("reset"), DockCmd::Reset);
        assert_eq!(DockCmd::from_token(" reset "), DockCmd::Reset);
        assert_eq!(DockCmd::from_token(""), DockCmd::Weld);
        assert_eq!(DockCmd::from_token("weld"), DockCmd::Weld);
        assert_eq!(DockCmd::from_token("RESET"), DockCmd::Weld);
    }

    #[test]
    fn test_reset_then_weld() {
        let (mut mgr, mut sim, mut rig) = setup(DockParams::default());
        for a in rig.frontend.iter_mut() {
            a.position_m = 4.0;
        }
        rig.back.as_mut().unwrap().position_m = 1.0;

        assert_eq!(tick(&mut mgr, &mut sim, &mut rig), RequestState::Idle);

        // Requests are acted on at once, but nothing moves until the next periodic tick
        assert_eq!(command(&mut mgr, &sim, &mut rig, "reset"), RequestState::Resetting);
        assert_eq!(rig.back.as_ref().unwrap().velocity_ms, 0.0);

        // Duplicate and weld requests are ignored while resetting
        assert_eq!(command(&mut mgr, &sim, &mut rig, "reset"), RequestState::Resetting);
        assert_eq!(command(&mut mgr, &sim, &mut rig, ""), RequestState::Resetting);
        assert!(!mgr.is_weld_paused());

        let mut ticks = 0;
        while tick(&mut mgr, &mut sim, &mut rig) == RequestState::Resetting {
            ticks += 1;
            assert!(ticks < 1000);
        }
        assert!(mgr.is_idle());
        for id in rig.actuator_ids() {
            assert!(rig.actuator(id).unwrap().is_at_lowest(), "{} not in", id);
        }

        assert_eq!(command(&mut mgr, &sim, &mut rig, "weld"), RequestState::Welding);
        assert_eq!(command(&mut mgr, &sim, &mut rig, "weld"), RequestState::Welding);

        let mut ticks = 0;
        while tick(&mut mgr, &mut sim, &mut rig) == RequestState::Welding {
            ticks += 1;
            assert!(ticks < 20_000);
        }
        assert!(mgr.is_idle());
        assert_eq!(sim.structure.num_blocks(), 14);

        let tm = mgr.get_tm(&rig);
        assert_eq!(tm.state, RequestState::Idle);
        assert_eq!(tm.actuators.len(), 6);
        assert_eq!(tm.welders_enabled, vec![Some(false), Some(false)]);
    }

    #[test]
    fn test_weld_paused_by_reset() {
        let (mut mgr, mut sim, mut rig) = setup(DockParams::default());

        command(&mut mgr, &sim, &mut rig, "");
        for _ in 0..30 {
            tick(&mut mgr, &mut sim, &mut rig);
        }
        let back_m = rig.back.as_ref().unwrap().position_m;
        assert!(back_m > 0.0);

        assert_eq!(command(&mut mgr, &sim, &mut rig, "reset"), RequestState::Resetting);
        assert!(mgr.is_weld_paused());
        assert!(mgr.get_tm(&rig).weld_paused);

        let mut ticks = 0;
        while tick(&mut mgr, &mut sim, &mut rig) == RequestState::Resetting {
            ticks += 1;
            assert!(ticks < 1000);
        }

        // Weld picks back up once the rig is stowed
        assert!(rig.back.as_ref().unwrap().is_at_lowest());
        assert_eq!(mgr.state(), RequestState::Welding);
        assert!(!mgr.is_weld_paused());

        let mut ticks = 0;
        while tick(&mut mgr, &mut sim, &mut rig) == RequestState::Welding {
            ticks += 1;
            assert!(ticks < 20_000);
        }
        assert!(mgr.is_idle());
    }

    #[test]
    fn test_weld_paused_while_harness_extends() {
        for require_lock in [false, true].iter() {
            let params = DockParams {
                require_harness_lock: *require_lock,
                ..DockParams::default()
            };

            let (mgr, _, rig) = pause_weld_when(params, harness_driving_out);

            assert!(mgr.is_idle());
            assert!(rig.connectors.iter().all(|c| !c.enabled));
        }
    }

    #[test]
    fn test_weld_paused_while_welding() {
        let (mgr, sim, _) =
            pause_weld_when(DockParams::default(), |rig| {
                rig.welders.iter().flatten().any(|w| w.enabled)
            });

        assert!(mgr.is_idle());
        assert!(sim.structure.num_blocks() > 0);
    }

    #[test]
    fn test_weld_paused_while_repositioning() {
        let (mgr, _, _) = pause_weld_when(DockParams::default(), |rig| {
            let middle = rig.middle.as_ref().unwrap();
            middle.velocity_ms < 0.0 && middle.position_m - middle.min_limit_m > 1e-3
        });

        assert!(mgr.is_idle());
    }

    #[test]
    fn test_obstructed_extension() {
        let (mut mgr, mut sim, mut rig) = setup(DockParams::default());
        sim.add_obstruction(ActuatorId::Middle, 3.0);
        sim.add_obstruction(ActuatorId::Front(0), 4.0);

        let mut max_middle_m = 0.0f64;
        let mut max_front_m = 0.0f64;

        command(&mut mgr, &sim, &mut rig, "");
        let mut ticks = 0;
        while tick(&mut mgr, &mut sim, &mut rig) != RequestState::Idle {
            assert_welders_locked(&rig);
            max_middle_m = max_middle_m.max(rig.middle.as_ref().unwrap().position_m);
            max_front_m = max_front_m.max(rig.frontend[0].position_m);
            ticks += 1;
            assert!(ticks < 20_000);
        }

        // Stopped short by the obstructions, and the weld still ran to the end
        assert_eq!(max_middle_m, 3.0);
        assert_eq!(max_front_m, 4.0);
        assert_eq!(rig.frontend[1].max_limit_m, 5.0);
        assert!(rig.middle.as_ref().unwrap().is_at_lowest());
        assert!(rig.back.as_ref().unwrap().is_at_lowest());
        assert!(sim.structure.num_blocks() > 0);

        sim.clear_obstructions();
        command(&mut mgr, &sim, &mut rig, "");
        let mut max_middle_m = 0.0f64;
        let mut ticks = 0;
        while tick(&mut mgr, &mut sim, &mut rig) != RequestState::Idle {
            max_middle_m = max_middle_m.max(rig.middle.as_ref().unwrap().position_m);
            ticks += 1;
            assert!(ticks < 20_000);
        }
        assert_eq!(max_middle_m, 5.0);
    }

    #[test]
    fn test_init_rejects_bad_params() {
        for (block_length_m, position_eps_m) in [(0.0, 1e-5), (-2.5, 1e-5), (2.5, 0.0)].iter() {
            let params = DockParams {
                block_length_m: *block_length_m,
                position_eps_m: *position_eps_m,
                ..DockParams::default()
            };
            assert!(matches!(
                params.validate(),
                Err(DockMgrError::InvalidParams(_))
            ));
        }
        assert!(DockParams::default().validate().is_ok());
    }

    #[test]
    fn test_weld_discarded_by_reset() {
        let (mut mgr, mut sim, mut rig) = setup(DockParams {
            pause_weld_on_reset: false,
            ..DockParams::default()
        });

        command(&mut mgr, &sim, &mut rig, "");
        for _ in 0..30 {
            tick(&mut mgr, &mut sim, &mut rig);
        }

        command(&mut mgr, &sim, &mut rig, "reset");
        assert!(!mgr.is_weld_paused());

        let mut ticks = 0;
        while tick(&mut mgr, &mut sim, &mut rig) == RequestState::Resetting {
            ticks += 1;
            assert!(ticks < 1000);
        }
        assert!(mgr.is_idle());
    }

    #[test]
    fn test_precondition_violation() {
        let (mut mgr, sim, mut rig) = setup(DockParams::default());
        rig.back = None;

        command(&mut mgr, &sim, &mut rig, "reset");

        let mut result = Ok(RequestState::Resetting);
        for _ in 0..1000 {
            result = mgr.step(Trigger::Periodic, &mut rig, &sim.structure);
            if result.is_err() {
                break;
            }
        }
        assert_eq!(
            result,
            Err(RigError::MissingActuator(crate::rig::ActuatorId::Back))
        );
    }
}
