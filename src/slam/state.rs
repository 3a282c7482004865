//! Shared state between the scanning feed, the SLAM loop, and its readers
//!
//! All sharing follows a copy-on-read discipline: writers replace whole
//! values under a lock, readers clone a snapshot out and work on the clone.
//! Nothing ever holds a lock across an expensive computation, and builders
//! of derived products (distance field, occupancy grid) never alias the
//! live buffer.

use std::sync::{Arc, RwLock};

use crate::common::Pose;
use crate::perception::scan::Scan;

/// An immutable square byte-map copy taken from the live buffer.
///
/// Byte convention follows the SLAM backend: high values trend open, low
/// values trend obstacle, and the mid level (127) marks unexplored space.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSnapshot {
    bytes: Vec<u8>,
    size: usize,
}

impl MapSnapshot {
    /// Wrap a flat byte buffer. Returns `None` when the length is not a
    /// perfect square.
    pub fn new(bytes: Vec<u8>) -> Option<Self> {
        let size = (bytes.len() as f64).sqrt() as usize;
        if size * size != bytes.len() {
            return None;
        }
        Some(MapSnapshot { bytes, size })
    }

    /// Side length in pixels
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Byte at a pixel; callers guarantee bounds
    pub fn at(&self, x: usize, y: usize) -> u8 {
        self.bytes[y * self.size + x]
    }
}

/// Latest-scan slot. The feed overwrites it continuously; readers take the
/// most recent complete scan or find the slot empty at startup.
#[derive(Debug, Clone, Default)]
pub struct SharedScan {
    slot: Arc<RwLock<Option<Scan>>>,
}

impl SharedScan {
    pub fn new() -> Self {
        SharedScan::default()
    }

    /// Replace the slot with a newer scan
    pub fn publish(&self, scan: Scan) {
        *self.slot.write().expect("scan slot poisoned") = Some(scan);
    }

    /// Clone out the most recent scan, if any arrived yet
    pub fn snapshot(&self) -> Option<Scan> {
        self.slot.read().expect("scan slot poisoned").clone()
    }
}

/// Current pose estimate, written by the SLAM loop in steady state
#[derive(Debug, Clone, Default)]
pub struct SharedPose {
    slot: Arc<RwLock<Pose>>,
}

impl SharedPose {
    pub fn new() -> Self {
        SharedPose::default()
    }

    pub fn store(&self, pose: Pose) {
        *self.slot.write().expect("pose slot poisoned") = pose;
    }

    pub fn get(&self) -> Pose {
        *self.slot.read().expect("pose slot poisoned")
    }
}

/// The live occupancy byte-map, owned by the SLAM loop
#[derive(Debug, Clone)]
pub struct SharedMap {
    buffer: Arc<RwLock<Vec<u8>>>,
    size: usize,
}

impl SharedMap {
    /// An unexplored map: every byte at the mid level
    pub fn unexplored(size_pixels: usize) -> Self {
        SharedMap {
            buffer: Arc::new(RwLock::new(vec![127u8; size_pixels * size_pixels])),
            size: size_pixels,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Copy the live buffer into an immutable snapshot. The SLAM loop may
    /// keep mutating the live buffer while the snapshot is consumed.
    pub fn snapshot(&self) -> MapSnapshot {
        let bytes = self.buffer.read().expect("map buffer poisoned").clone();
        MapSnapshot {
            bytes,
            size: self.size,
        }
    }

    /// Let the SLAM backend rewrite the live buffer in place
    pub fn update_with<F>(&self, writer: F)
    where
        F: FnOnce(&mut [u8]),
    {
        let mut buffer = self.buffer.write().expect("map buffer poisoned");
        writer(&mut buffer);
    }

    /// Replace the whole buffer, e.g. from a persisted map. The new
    /// contents must match the configured dimensions exactly.
    pub fn replace(&self, bytes: Vec<u8>) -> Result<(), crate::config::ConfigError> {
        let expected = self.size * self.size;
        if bytes.len() != expected {
            return Err(crate::config::ConfigError::MapSizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        *self.buffer.write().expect("map buffer poisoned") = bytes;
        Ok(())
    }
}
