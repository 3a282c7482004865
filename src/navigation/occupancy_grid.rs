//! Coarse traversability grid derived from the fine-grained map
//!
//! The SLAM map is far too fine for path search, so it is downsampled into
//! blocks of `density` pixels per side and each block is classified from
//! its median byte. The median shrugs off a minority of outlier pixels in
//! a block that has otherwise settled, which neither the mean nor a
//! mode-of-unique-values does.

use serde::{Deserialize, Serialize};

use crate::common::GridCell;
use crate::slam::state::MapSnapshot;

/// Byte level the SLAM backend writes for unexplored space
const UNEXPLORED_LEVEL: f64 = 127.0;
/// Byte level the SLAM backend converges to for open space
const OPEN_LEVEL: f64 = 255.0;

/// Classification of one coarse grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellState {
    Traversable,
    Blocked,
    Unexplored,
}

/// Downsampled traversability grid over one immutable map snapshot
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    size: usize,
    density: usize,
    cells: Vec<CellState>,
}

impl OccupancyGrid {
    /// Classify every `density`-pixel block of the snapshot
    pub fn build(map: &MapSnapshot, density: usize, epsilon: f64) -> Self {
        let map_size = map.size();
        let size = (map_size as f64 / density as f64 + 0.5) as usize;
        let mut cells = Vec::with_capacity(size * size);

        let mut block = Vec::with_capacity(density * density);
        for gy in 0..size {
            for gx in 0..size {
                block.clear();
                let x_end = ((gx + 1) * density).min(map_size);
                let y_end = ((gy + 1) * density).min(map_size);
                for my in gy * density..y_end {
                    for mx in gx * density..x_end {
                        block.push(map.at(mx, my));
                    }
                }
                cells.push(classify(&mut block, epsilon));
            }
        }

        OccupancyGrid {
            size,
            density,
            cells,
        }
    }

    /// Side length in cells
    pub fn size(&self) -> usize {
        self.size
    }

    /// Map pixels per cell side
    pub fn density(&self) -> usize {
        self.density
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.size && (y as usize) < self.size
    }

    /// Cell classification. Anything outside the grid is `Blocked`:
    /// unknown locations are never passable, unlike unexplored map space
    /// which merely has not been seen yet.
    pub fn cell(&self, x: i32, y: i32) -> CellState {
        if !self.in_bounds(x, y) {
            return CellState::Blocked;
        }
        self.cells[y as usize * self.size + x as usize]
    }

    /// Frontier cells count as traversable: they are explorable space, not
    /// known obstacles.
    pub fn is_traversable(&self, x: i32, y: i32) -> bool {
        matches!(
            self.cell(x, y),
            CellState::Traversable | CellState::Unexplored
        )
    }

    /// Center of a cell's pixel block in map pixel coordinates, for
    /// converting a route back into motion targets
    pub fn cell_to_map(&self, cell: GridCell) -> (f64, f64) {
        let half = self.density as f64 / 2.0;
        (
            cell.0 as f64 * self.density as f64 + half,
            cell.1 as f64 * self.density as f64 + half,
        )
    }
}

/// Median-based block classification. Scrambles the block buffer.
fn classify(block: &mut [u8], epsilon: f64) -> CellState {
    let median = median_byte(block);
    if (median - UNEXPLORED_LEVEL).abs() < epsilon {
        CellState::Unexplored
    } else if (median - OPEN_LEVEL).abs() < epsilon {
        CellState::Traversable
    } else {
        CellState::Blocked
    }
}

fn median_byte(values: &mut [u8]) -> f64 {
    debug_assert!(!values.is_empty());
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid] as f64
    } else {
        (values[mid - 1] as f64 + values[mid] as f64) / 2.0
    }
}
