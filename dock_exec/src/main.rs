//! Main dock-side executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Build the simulated rig and the docking manager
//!     - Main loop:
//!         - Command acquisition, from a script or from stdin
//!         - Command handling by the docking manager
//!         - Periodic docking manager processing
//!         - Simulated rig update
//!         - Telemetry
//!
//! # Usage
//!
//! `dock_exec [script]`
//!
//! With a script, commands are read from the script at their scheduled times and the executable
//! stops once the script is exhausted and the rig is idle. Without, one command is read per line
//! of stdin and the executable stops once stdin is closed and the rig is idle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::env;
use std::io::{self, BufRead};
use std::str::FromStr;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

// Internal
use dock_lib::{
    dock_mgr::{DockCmd, DockMgr, DockTm, RequestState, Trigger},
    params::DockExecParams,
    sim::{SimParams, SimRig},
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    raise_error,
    script_interpreter::{PendingCmds, ScriptInterpreter},
    session::Session,
};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Various sources for the commands incoming to the exec.
enum CmdSource {
    Script(ScriptInterpreter),
    Stdin(Receiver<String>),
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- LOAD EXEC PARAMETERS ----

    // Exec parameters are needed before the session exists, as they locate it
    let exec_params: DockExecParams =
        util::params::load("dock_exec.toml").wrap_err("Could not load exec params")?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("dock_exec", &exec_params.sessions_dir)
        .wrap_err("Failed to create the session")?;

    // Initialise logger
    let log_level = LevelFilter::from_str(&exec_params.log_level)
        .map_err(|_| eyre!("Invalid log level \"{}\"", exec_params.log_level))?;
    logger_init(log_level, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Engidock Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- INITIALISE COMMAND SOURCE ----

    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    let mut cmd_source = match args.len() {
        2 => {
            info!("Loading script from \"{}\"", &args[1]);

            let si = ScriptInterpreter::new(&args[1]).wrap_err("Failed to load script")?;

            info!(
                "Loaded script lasts {:.02} s and contains {} commands\n",
                si.get_duration(),
                si.get_num_cmds()
            );

            CmdSource::Script(si)
        }
        1 => {
            info!("No script provided, commands will be read from stdin\n");
            CmdSource::Stdin(spawn_stdin_reader())
        }
        n => {
            return Err(eyre!(
                "Expected either zero or one argument, found {}",
                n - 1
            ))
        }
    };

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut dock_mgr = DockMgr::init(&exec_params.dock_params_file)
        .wrap_err("Failed to initialise DockMgr")?;
    info!("DockMgr init complete");

    let sim_params: SimParams =
        util::params::load(&exec_params.sim_params_file).wrap_err("Could not load sim params")?;
    let mut sim = SimRig::new(sim_params, dock_mgr.params.block_length_m)
        .wrap_err("Failed to initialise the simulated rig")?;
    let mut rig = sim.build_rig().wrap_err("Failed to build the rig")?;
    info!(
        "Simulated rig built with {} frontend pairs, {} harness actuators",
        rig.num_pairs(),
        rig.harness_actuators.len()
    );

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);
    let mut num_consec_cycle_overruns = 0u64;
    let mut tm_history: Vec<DockTm> = Vec::new();
    let mut last_state = RequestState::Idle;

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // ---- COMMAND PROCESSING ----

        let (tokens, source_done) = match cmd_source {
            CmdSource::Script(ref mut si) => match si.get_pending_cmds() {
                PendingCmds::None => (Vec::new(), false),
                PendingCmds::Some(tokens) => (tokens, false),
                PendingCmds::EndOfScript => (Vec::new(), true),
            },
            CmdSource::Stdin(ref rx) => {
                let mut tokens = Vec::new();
                let mut closed = false;
                loop {
                    match rx.try_recv() {
                        Ok(t) => tokens.push(t),
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => {
                            closed = true;
                            break;
                        }
                    }
                }
                (tokens, closed)
            }
        };

        for token in tokens {
            let cmd = DockCmd::from_token(&token);
            info!("Command \"{}\" received: {:?}", token.trim(), cmd);

            dock_mgr
                .step(Trigger::Command(cmd), &mut rig, &sim.structure)
                .wrap_err("DockMgr failed to handle a command")?;
        }

        // ---- DOCKING PROCESSING ----

        let state = dock_mgr
            .step(Trigger::Periodic, &mut rig, &sim.structure)
            .wrap_err("Docking sequence aborted")?;

        // ---- SIMULATION ----

        sim.advance(&mut rig, exec_params.cycle_period_s);

        // ---- TELEMETRY ----

        let tm = dock_mgr.get_tm(&rig);
        if state != last_state {
            info!("DockMgr state change: {} -> {}", last_state, state);
            tm_history.push(tm.clone());
            last_state = state;
        }
        match serde_json::to_string(&tm) {
            Ok(s) => debug!("TM: {}", s),
            Err(e) => warn!("Could not serialise telemetry: {}", e),
        }

        if source_done && dock_mgr.is_idle() {
            info!("Command source exhausted and rig idle");
            tm_history.push(tm);
            break;
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => {
                num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
                );
                num_consec_cycle_overruns += 1;

                if num_consec_cycle_overruns > exec_params.max_consec_overruns {
                    raise_error!(
                        "More than {} consecutive cycle overruns!",
                        exec_params.max_consec_overruns
                    );
                }
            }
        }
    }

    // ---- SHUTDOWN ----

    session
        .save_json("dock_tm.json", &tm_history)
        .wrap_err("Failed to save telemetry")?;
    info!(
        "{} telemetry records saved, structure has {} blocks",
        tm_history.len(),
        sim.structure.num_blocks()
    );

    info!("End of execution");

    Ok(())
}

/// Spawn a thread forwarding every line of stdin as a command token.
///
/// The channel disconnects once stdin is closed.
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    warn!("Could not read from stdin: {}", e);
                    break;
                }
            };

            if tx.send(line).is_err() {
                break;
            }
        }
    });

    rx
}
