//! # Dock Executable Parameters
//!
//! This module provides parameters for the dock executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockExecParams {
    /// Target period of one control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Minimum level of records to log, one of `info`, `debug` or `trace`.
    pub log_level: String,

    /// Directory, relative to the software root, in which sessions are created.
    pub sessions_dir: String,

    /// Parameter file of the docking manager.
    pub dock_params_file: String,

    /// Parameter file of the simulated rig.
    pub sim_params_file: String,

    /// Number of consecutive cycle overruns after which the executable gives up.
    pub max_consec_overruns: u64,
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_params_file() {
        let p: DockExecParams =
            util::params::from_toml_str(include_str!("../../params/dock_exec.toml")).unwrap();

        assert_eq!(p.cycle_period_s, 0.1);
        assert!(p.log_level.parse::<log::LevelFilter>().is_ok());
    }
}
