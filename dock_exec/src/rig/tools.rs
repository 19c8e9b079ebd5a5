//! Welders and docking connectors

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A welder mounted on the top of a frontend actuator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Welder {
    pub name: String,

    pub enabled: bool,

    /// The welder's forward-most cell, in the grid of the actuator carrying it.
    pub tip: Vector3<i32>,
}

/// A docking connector of the safety harness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    pub name: String,

    /// Armed connectors may lock when requested, disabled connectors never lock.
    pub enabled: bool,

    /// Set when a lock has been requested, cleared when the connector is disabled.
    pub connect_requested: bool,

    /// Last reported status.
    pub status: ConnectorStatus,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectorStatus {
    Unconnected,
    Connectable,
    Connected,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Welder {
    pub fn new(name: &str, tip: Vector3<i32>) -> Self {
        Self {
            name: String::from(name),
            enabled: false,
            tip,
        }
    }
}

impl Connector {
    pub fn new(name: &str) -> Self {
        Self {
            name: String::from(name),
            enabled: false,
            connect_requested: false,
            status: ConnectorStatus::Unconnected,
        }
    }

    /// Request the connector locks onto whatever is in front of it.
    pub fn connect(&mut self) {
        self.connect_requested = true;
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectorStatus::Connected
    }
}
