//! Range-scan intake
//!
//! The scanning collaborator streams frames of raw (angle, distance,
//! strength) samples. Intake buckets each frame into a fixed number of
//! angular bins and publishes the result to a shared latest-scan slot that
//! the SLAM loop and the localizer read from.

use log::debug;
use tokio::sync::{mpsc, watch};

use crate::config::ScanConfig;
use crate::slam::state::SharedScan;

/// One raw measurement from the scanner
#[derive(Debug, Clone, Copy)]
pub struct ScanSample {
    /// Bearing in degrees, [0, 360)
    pub angle: f64,
    /// Range in millimeters
    pub distance: f64,
    /// Return signal strength reported by the sensor
    pub strength: u32,
}

/// A complete revolution worth of raw samples
#[derive(Debug, Clone)]
pub struct ScanFrame {
    pub timestamp_us: u64,
    pub samples: Vec<ScanSample>,
}

/// A bucketed 360 degree scan: one distance per angular bin, in
/// millimeters, with 0 marking a bin that saw no return.
#[derive(Debug, Clone, PartialEq)]
pub struct Scan {
    bins: Vec<f64>,
}

impl Scan {
    /// An all-empty scan with the given bin count
    pub fn empty(bins: usize) -> Self {
        Scan {
            bins: vec![0.0; bins],
        }
    }

    /// Wrap pre-bucketed distances. Used by the SLAM backend boundary and
    /// in tests.
    pub fn from_distances(bins: Vec<f64>) -> Self {
        Scan { bins }
    }

    /// Bucket one raw frame into angular bins.
    ///
    /// Samples weaker than `min_strength` are dropped. When several samples
    /// land in the same bin the last one wins, matching the sensor's
    /// sweep order.
    pub fn from_frame(frame: &ScanFrame, config: &ScanConfig) -> Self {
        let degrees_per_bin = 360.0 / config.bins as f64;
        let mut bins = vec![0.0; config.bins];

        for sample in &frame.samples {
            if sample.strength < config.min_strength {
                continue;
            }
            let bin = (sample.angle / degrees_per_bin) as usize % config.bins;
            bins[bin] = sample.distance;
        }

        Scan { bins }
    }

    /// Number of angular bins
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Distances per bin, 0 = no return
    pub fn distances(&self) -> &[f64] {
        &self.bins
    }

    /// Number of bins holding an actual return
    pub fn return_count(&self) -> usize {
        self.bins.iter().filter(|&&d| d > 0.0).count()
    }
}

/// Drain scanner frames into the shared latest-scan slot until the channel
/// closes or shutdown is signalled. Each frame fully replaces the slot;
/// readers that need consistency take their own snapshot.
pub async fn run_scan_intake(
    mut frames: mpsc::Receiver<ScanFrame>,
    slot: SharedScan,
    config: ScanConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            frame = frames.recv() => {
                let Some(frame) = frame else { break };
                let scan = Scan::from_frame(&frame, &config);
                debug!(
                    "scan frame at {}us: {} returns in {} bins",
                    frame.timestamp_us,
                    scan.return_count(),
                    scan.len()
                );
                slot.publish(scan);
            }
        }
    }
}
