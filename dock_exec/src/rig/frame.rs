//! Local coordinate frame of the rig

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Orthonormal axes of the rig in its integer grid coordinates.
///
/// Each axis is an axis-aligned unit vector. The frame is immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FrameAxes", into = "FrameAxes")]
pub struct RigFrame {
    forward: Vector3<i32>,
    right: Vector3<i32>,
    up: Vector3<i32>,
}

/// Unchecked axes, as found in parameter files.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FrameAxes {
    pub forward: [i32; 3],
    pub right: [i32; 3],
    pub up: [i32; 3],
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FrameError {
    #[error("The {0} axis ({1:?}) is not an axis-aligned unit vector")]
    NotUnit(&'static str, [i32; 3]),

    #[error("The {0} and {1} axes are not orthogonal")]
    NotOrthogonal(&'static str, &'static str),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RigFrame {
    /// Build a frame from its forward, right and up axes.
    pub fn new(
        forward: Vector3<i32>,
        right: Vector3<i32>,
        up: Vector3<i32>,
    ) -> Result<Self, FrameError> {
        check_unit("forward", &forward)?;
        check_unit("right", &right)?;
        check_unit("up", &up)?;

        if forward.dot(&right) != 0 {
            return Err(FrameError::NotOrthogonal("forward", "right"));
        }
        if forward.dot(&up) != 0 {
            return Err(FrameError::NotOrthogonal("forward", "up"));
        }
        if right.dot(&up) != 0 {
            return Err(FrameError::NotOrthogonal("right", "up"));
        }

        Ok(Self { forward, right, up })
    }

    pub fn forward(&self) -> Vector3<i32> {
        self.forward
    }

    pub fn back(&self) -> Vector3<i32> {
        -self.forward
    }

    pub fn right(&self) -> Vector3<i32> {
        self.right
    }

    pub fn left(&self) -> Vector3<i32> {
        -self.right
    }

    pub fn up(&self) -> Vector3<i32> {
        self.up
    }

    pub fn down(&self) -> Vector3<i32> {
        -self.up
    }
}

impl Default for RigFrame {
    /// Forward along +X, right along +Y, up along +Z.
    fn default() -> Self {
        Self {
            forward: Vector3::x(),
            right: Vector3::y(),
            up: Vector3::z(),
        }
    }
}

impl std::convert::TryFrom<FrameAxes> for RigFrame {
    type Error = FrameError;

    fn try_from(axes: FrameAxes) -> Result<Self, Self::Error> {
        RigFrame::new(
            Vector3::from(axes.forward),
            Vector3::from(axes.right),
            Vector3::from(axes.up),
        )
    }
}

impl From<RigFrame> for FrameAxes {
    fn from(frame: RigFrame) -> Self {
        Self {
            forward: frame.forward.into(),
            right: frame.right.into(),
            up: frame.up.into(),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn check_unit(name: &'static str, v: &Vector3<i32>) -> Result<(), FrameError> {
    let num_nonzero = v.iter().filter(|c| **c != 0).count();
    let magn: i32 = v.iter().map(|c| c.abs()).sum();

    if num_nonzero == 1 && magn == 1 {
        Ok(())
    } else {
        Err(FrameError::NotUnit(name, [v.x, v.y, v.z]))
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
