//! Linear actuator model and per-actuator motion tracking

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A linear actuator.
///
/// The soft limits (`min_limit_m`, `max_limit_m`) are commanded, the hard bounds (`lowest_m`,
/// `highest_m`) are physical and never change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actuator {
    /// Name the actuator was bound by.
    pub name: String,

    /// Commanded velocity.
    ///
    /// Units: meters/second
    pub velocity_ms: f64,

    /// Maximum speed the actuator can be driven at.
    ///
    /// Units: meters/second
    pub max_velocity_ms: f64,

    /// Commanded lower soft limit.
    ///
    /// Units: meters
    pub min_limit_m: f64,

    /// Commanded upper soft limit.
    ///
    /// Units: meters
    pub max_limit_m: f64,

    /// Lowest physical position.
    ///
    /// Units: meters
    pub lowest_m: f64,

    /// Highest physical position.
    ///
    /// Units: meters
    pub highest_m: f64,

    /// Current measured position.
    ///
    /// Units: meters
    pub position_m: f64,
}

/// Transient record used while an actuator is being extended or retracted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionProgress {
    prev_position_m: f64,
    position_eps_m: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Actuator {
    /// Create a new stationary actuator at its lowest position, with the soft limits covering
    /// the whole physical range.
    pub fn new(name: &str, max_velocity_ms: f64, lowest_m: f64, highest_m: f64) -> Self {
        Self {
            name: String::from(name),
            velocity_ms: 0.0,
            max_velocity_ms,
            min_limit_m: lowest_m,
            max_limit_m: highest_m,
            lowest_m,
            highest_m,
            position_m: lowest_m,
        }
    }

    /// Open the soft limits up to the full physical range.
    pub fn set_full_range(&mut self) {
        self.min_limit_m = self.lowest_m;
        self.max_limit_m = self.highest_m;
    }

    /// True if the actuator is exactly at its lowest physical position.
    pub fn is_at_lowest(&self) -> bool {
        self.position_m == self.lowest_m
    }
}

impl MotionProgress {
    pub fn new(position_m: f64, position_eps_m: f64) -> Self {
        Self {
            prev_position_m: position_m,
            position_eps_m,
        }
    }

    /// True if `new_pos_m` differs from the last sampled position by at least the epsilon.
    pub fn position_changed(&self, new_pos_m: f64) -> bool {
        (new_pos_m - self.prev_position_m).abs() >= self.position_eps_m
    }

    /// Record a new sampled position.
    pub fn change_position(&mut self, new_pos_m: f64) {
        self.prev_position_m = new_pos_m;
    }

    pub fn prev_position_m(&self) -> f64 {
        self.prev_position_m
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
