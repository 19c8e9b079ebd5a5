//! # Docking Manager Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::DockMgrError;
use crate::{BLOCK_LENGTH_M, DECAY_TICKS_PER_EMPTY_CELL, POSITION_EPS_M};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the docking manager, loaded from `dock.toml`.
///
/// Every field is optional in the file, missing fields take the value given by `Default`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DockParams {
    /// Increment by which actuators are stepped back between weld passes.
    ///
    /// Units: meters
    pub block_length_m: f64,

    /// Position change below which an actuator is considered stationary.
    ///
    /// Units: meters
    pub position_eps_m: f64,

    /// Ticks added to a weld zone's decay budget for each empty cell in reach.
    pub decay_ticks_per_empty_cell: u32,

    /// Speed at which the harness actuators are driven.
    ///
    /// Units: meters/second
    pub harness_rate_ms: f64,

    /// If true the harness is only considered engaged once every connector reports a lock.
    pub require_harness_lock: bool,

    /// If true a weld interrupted by a reset is resumed afterwards, otherwise it is dropped.
    pub pause_weld_on_reset: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for DockParams {
    fn default() -> Self {
        Self {
            block_length_m: BLOCK_LENGTH_M,
            position_eps_m: POSITION_EPS_M,
            decay_ticks_per_empty_cell: DECAY_TICKS_PER_EMPTY_CELL,
            harness_rate_ms: BLOCK_LENGTH_M,
            require_harness_lock: false,
            pause_weld_on_reset: true,
        }
    }
}

impl DockParams {
    /// Reject values which would stop the sequences from ever completing.
    pub fn validate(&self) -> Result<(), DockMgrError> {
        let positive = [
            ("block_length_m", self.block_length_m),
            ("position_eps_m", self.position_eps_m),
            ("harness_rate_ms", self.harness_rate_ms),
        ];

        for (name, value) in positive.iter() {
            if !(*value > 0.0) {
                return Err(DockMgrError::InvalidParams(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_file() {
        let p: DockParams = util::params::from_toml_str(
            "require_harness_lock = true\nharness_rate_ms = 1.0\n",
        )
        .unwrap();

        assert!(p.require_harness_lock);
        assert_eq!(p.harness_rate_ms, 1.0);
        assert_eq!(p.block_length_m, BLOCK_LENGTH_M);
        assert_eq!(p.decay_ticks_per_empty_cell, DECAY_TICKS_PER_EMPTY_CELL);
        assert!(p.pause_weld_on_reset);
    }

    #[test]
    fn test_params_file() {
        let p: DockParams =
            util::params::from_toml_str(include_str!("../../../params/dock.toml")).unwrap();

        assert_eq!(p.block_length_m, BLOCK_LENGTH_M);
        assert_eq!(p.position_eps_m, POSITION_EPS_M);
        assert!(!p.require_harness_lock);
        assert!(p.validate().is_ok());
    }
}
