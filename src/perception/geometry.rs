//! Coordinate-frame conversions between the world, the robot, and the map
//!
//! The world frame is continuous and measured in millimeters; the map frame
//! is the integer pixel grid of the SLAM map buffer. Both conversions are
//! pure and total: callers are responsible for bounds checks, so a world
//! point outside the mapped area simply produces an out-of-range pixel
//! coordinate.

use nalgebra::{Isometry2, Point2, Vector2};

use crate::common::Pose;
use crate::perception::scan::Scan;

/// Fixed scale relation between the world and the map pixel grid
#[derive(Debug, Clone, Copy)]
pub struct MapGeometry {
    size_pixels: usize,
    size_meters: f64,
}

impl MapGeometry {
    pub fn new(size_pixels: usize, size_meters: f64) -> Self {
        MapGeometry {
            size_pixels,
            size_meters,
        }
    }

    pub fn size_pixels(&self) -> usize {
        self.size_pixels
    }

    /// Side of the map in millimeters
    pub fn extent_mm(&self) -> f64 {
        self.size_meters * 1000.0
    }

    /// Millimeters covered by one map pixel
    pub fn scale(&self) -> f64 {
        self.extent_mm() / self.size_pixels as f64
    }

    /// World millimeters to map pixel coordinates
    pub fn world_to_map(&self, x: f64, y: f64) -> (i32, i32) {
        let scale = self.scale();
        ((x / scale).floor() as i32, (y / scale).floor() as i32)
    }

    /// Center of a map pixel in world millimeters
    pub fn map_to_world(&self, gx: i32, gy: i32) -> (f64, f64) {
        let scale = self.scale();
        ((gx as f64 + 0.5) * scale, (gy as f64 + 0.5) * scale)
    }
}

/// Project a scan into Cartesian points in the robot frame.
///
/// Bins holding the zero sentinel carry no return and are skipped, so the
/// output can be shorter than the scan. Retained points keep ascending bin
/// order. Distances stay in millimeters.
pub fn polar_to_cartesian(scan: &Scan) -> Vec<Point2<f64>> {
    let degrees_per_bin = 360.0 / scan.len() as f64;

    scan.distances()
        .iter()
        .enumerate()
        .filter(|(_, &distance)| distance > 0.0)
        .map(|(bin, &distance)| {
            let angle = (bin as f64 * degrees_per_bin).to_radians();
            Point2::new(distance * angle.cos(), distance * angle.sin())
        })
        .collect()
}

/// Rigid 2D transform of robot-frame points into the world frame: rotation
/// by the pose heading followed by translation to the pose position.
pub fn transform_points(points: &[Point2<f64>], pose: &Pose) -> Vec<Point2<f64>> {
    let transform = Isometry2::new(Vector2::new(pose.x, pose.y), pose.theta.to_radians());
    points.iter().map(|p| transform * p).collect()
}
