//! Configuration for the rover core
//!
//! Every calibration constant in the stack lives here with a default tuned
//! for the reference platform (A2 lidar, 30 m map at 3000 px). Deployments
//! override them through a YAML file.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A persisted map whose byte length does not match the configured map
    /// dimensions. Fatal: a partial or resized load would silently corrupt
    /// every derived product (distance field, occupancy grid).
    #[error("map file holds {actual} bytes, expected {expected}")]
    MapSizeMismatch { expected: usize, actual: usize },
}

/// Top-level configuration for all rover components
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoverConfig {
    pub map: MapConfig,
    pub scan: ScanConfig,
    pub localizer: LocalizerConfig,
    pub grid: GridConfig,
    pub actuator: ActuatorConfig,
}

impl RoverConfig {
    /// Load configuration from a YAML file, falling back to defaults for
    /// any key the file omits.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }
}

/// Dimensions of the SLAM map buffer
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Side of the square map in pixels
    pub size_pixels: usize,
    /// Side of the square map in meters
    pub size_meters: f64,
}

impl MapConfig {
    /// Total byte length of a flat map buffer
    pub fn pixel_count(&self) -> usize {
        self.size_pixels * self.size_pixels
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            size_pixels: 3000,
            size_meters: 30.0,
        }
    }
}

/// Scan intake parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Number of angular bins in one 360 degree revolution
    pub bins: usize,
    /// Samples weaker than this are discarded before bucketing
    pub min_strength: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            bins: 400,
            min_strength: 10,
        }
    }
}

/// Relocalization parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalizerConfig {
    /// Number of sample-optimize-rotate rounds per relocalization attempt
    pub rounds: usize,
    /// Candidate poses stay at least this far from the map edge, in mm
    pub border_mm: f64,
    /// Map bytes below this value are obstacles when building the
    /// distance field
    pub obstacle_threshold: u8,
    pub search: SearchConfig,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        LocalizerConfig {
            rounds: 10,
            border_mm: 500.0,
            obstacle_threshold: 64,
            search: SearchConfig::default(),
        }
    }
}

/// Differential-evolution search parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub population: usize,
    pub max_generations: usize,
    /// Mutation scale factor, usually called F
    pub differential_weight: f64,
    /// Crossover probability, usually called CR
    pub crossover_probability: f64,
    /// Relative convergence tolerance on the population energy spread
    pub tolerance: f64,
    /// Absolute convergence tolerance, for cost surfaces whose minimum
    /// sits at or near zero
    pub absolute_tolerance: f64,
    /// Fixed RNG seed; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            population: 45,
            max_generations: 150,
            differential_weight: 0.8,
            crossover_probability: 0.9,
            tolerance: 0.01,
            absolute_tolerance: 1e-8,
            seed: None,
        }
    }
}

/// Coarse traversability grid parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Map pixels per grid cell side
    pub density: usize,
    /// Tolerance around the reference byte levels when classifying a block
    pub epsilon: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            density: 16,
            epsilon: 20.0,
        }
    }
}

/// Open-loop motion timing for the drive platform
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ActuatorConfig {
    /// Seconds of forward drive per meter of travel
    pub secs_per_meter: f64,
    /// Fixed spin-up overhead added to every forward move, in seconds
    pub secs_offset: f64,
    /// Seconds for one full in-place rotation
    pub secs_per_rotation: f64,
    /// Capacity of the motion command queue
    pub queue_depth: usize,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        ActuatorConfig {
            secs_per_meter: 3.304,
            secs_offset: 0.04311,
            secs_per_rotation: 2.760,
            queue_depth: 16,
        }
    }
}
