//! Distance-to-obstacle field used as the scan-matching cost surface
//!
//! The field is derived from one immutable map snapshot: the snapshot is
//! thresholded into an obstacle mask, then a two-pass chamfer transform
//! propagates the distance to the nearest obstacle into every cell. Poses
//! whose scan points land on low field values explain the map well.

use crate::slam::state::MapSnapshot;

const ORTHOGONAL_STEP: f32 = 1.0;
const DIAGONAL_STEP: f32 = std::f32::consts::SQRT_2;

/// Per-pixel distance to the nearest obstacle, in map pixels
#[derive(Debug, Clone)]
pub struct DistanceField {
    size: usize,
    cells: Vec<f32>,
}

impl DistanceField {
    /// Build the field from a map snapshot. Bytes below `obstacle_threshold`
    /// are obstacles and get distance 0.
    pub fn build(map: &MapSnapshot, obstacle_threshold: u8) -> Self {
        let size = map.size();
        let bytes = map.bytes();
        let mut cells = vec![f32::INFINITY; size * size];

        for (cell, &byte) in cells.iter_mut().zip(bytes) {
            if byte < obstacle_threshold {
                *cell = 0.0;
            }
        }

        // Forward pass: distances flow from the top-left
        for y in 0..size {
            for x in 0..size {
                let i = y * size + x;
                let mut best = cells[i];
                if x > 0 {
                    best = best.min(cells[i - 1] + ORTHOGONAL_STEP);
                }
                if y > 0 {
                    best = best.min(cells[i - size] + ORTHOGONAL_STEP);
                    if x > 0 {
                        best = best.min(cells[i - size - 1] + DIAGONAL_STEP);
                    }
                    if x + 1 < size {
                        best = best.min(cells[i - size + 1] + DIAGONAL_STEP);
                    }
                }
                cells[i] = best;
            }
        }

        // Backward pass: distances flow from the bottom-right
        for y in (0..size).rev() {
            for x in (0..size).rev() {
                let i = y * size + x;
                let mut best = cells[i];
                if x + 1 < size {
                    best = best.min(cells[i + 1] + ORTHOGONAL_STEP);
                }
                if y + 1 < size {
                    best = best.min(cells[i + size] + ORTHOGONAL_STEP);
                    if x + 1 < size {
                        best = best.min(cells[i + size + 1] + DIAGONAL_STEP);
                    }
                    if x > 0 {
                        best = best.min(cells[i + size - 1] + DIAGONAL_STEP);
                    }
                }
                cells[i] = best;
            }
        }

        DistanceField { size, cells }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Field value at a pixel, or `None` outside the map
    pub fn get(&self, x: i32, y: i32) -> Option<f32> {
        if x < 0 || y < 0 || x as usize >= self.size || y as usize >= self.size {
            return None;
        }
        Some(self.cells[y as usize * self.size + x as usize])
    }

    /// Matching cost of a projected point set: the mean squared field value
    /// over the points that land inside the map. Points outside the map are
    /// excluded rather than penalized, so poses near the map edge are not
    /// biased against. A point set entirely outside the map has no defined
    /// cost and returns infinity.
    pub fn cost<I>(&self, cells: I) -> f64
    where
        I: IntoIterator<Item = (i32, i32)>,
    {
        let mut sum = 0.0_f64;
        let mut count = 0usize;

        for (x, y) in cells {
            if let Some(distance) = self.get(x, y) {
                sum += (distance as f64) * (distance as f64);
                count += 1;
            }
        }

        if count == 0 {
            f64::INFINITY
        } else {
            sum / count as f64
        }
    }
}
