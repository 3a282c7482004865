//! Common types shared across the rover core

use serde::{Deserialize, Serialize};

/// A coarse occupancy-grid cell coordinate
pub type GridCell = (i32, i32);

/// Robot pose in the world frame: x and y in millimeters, heading in degrees.
///
/// The heading is kept in [-180, 180]. World coordinates follow the map
/// convention of the SLAM backend: the origin is the map corner and a map of
/// `size_meters` spans `size_meters * 1000` millimeters on each axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Pose {
            x,
            y,
            theta: normalize_degrees(theta),
        }
    }

    /// Pose at the map origin, facing along +x
    pub fn origin() -> Self {
        Pose {
            x: 0.0,
            y: 0.0,
            theta: 0.0,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Pose::origin()
    }
}

/// Wrap an angle in degrees into [-180, 180]
pub fn normalize_degrees(mut degrees: f64) -> f64 {
    while degrees > 180.0 {
        degrees -= 360.0;
    }
    while degrees < -180.0 {
        degrees += 360.0;
    }
    degrees
}
