//! Boundary to the incremental SLAM backend
//!
//! The scan-to-map fusion algorithm itself lives outside this crate; here
//! is its contract and the loop that drives it. The loop is the sole
//! writer of the shared map buffer and, in steady state, of the shared
//! pose. Everyone else reads through snapshots.

pub mod persistence;
pub mod state;

use std::time::Duration;

use log::debug;
use tokio::sync::watch;

use crate::common::Pose;
use crate::perception::scan::Scan;
use self::state::{SharedMap, SharedPose, SharedScan};

/// Contract of the external incremental fusion algorithm
pub trait SlamAlgorithm: Send {
    /// Fuse one scan into the internal map and pose estimate
    fn update(&mut self, scan: &Scan);

    /// Current pose estimate
    fn pose(&self) -> Pose;

    /// Override the pose estimate, used to seed a relocalized pose before
    /// steady-state fusion starts
    fn seed_pose(&mut self, pose: Pose);

    /// Render the internal map into a flat byte buffer of the shared
    /// map's dimensions
    fn render_map(&self, buffer: &mut [u8]);
}

/// Steady-state fusion loop.
///
/// Each iteration takes the most recent complete scan, feeds it to the
/// algorithm, and publishes the updated pose and map. An absent or empty
/// scan (nothing arrived yet, or the sensor saw no returns) skips the
/// iteration instead of disturbing the estimate. Exits promptly when the
/// shutdown signal is raised.
pub async fn run_slam_loop<A>(
    mut algorithm: A,
    scans: SharedScan,
    pose: SharedPose,
    map: SharedMap,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) where
    A: SlamAlgorithm,
{
    loop {
        if *shutdown.borrow() {
            break;
        }

        match scans.snapshot() {
            Some(scan) if scan.return_count() > 0 => {
                algorithm.update(&scan);
                pose.store(algorithm.pose());
                map.update_with(|buffer| algorithm.render_map(buffer));
            }
            _ => debug!("no usable scan yet, skipping fusion step"),
        }

        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Walks its pose forward on every update and paints the map with the
    /// update count
    struct CountingSlam {
        updates: u32,
        pose: Pose,
    }

    impl CountingSlam {
        fn new() -> Self {
            CountingSlam {
                updates: 0,
                pose: Pose::origin(),
            }
        }
    }

    impl SlamAlgorithm for CountingSlam {
        fn update(&mut self, _scan: &Scan) {
            self.updates += 1;
            self.pose.x += 1.0;
        }

        fn pose(&self) -> Pose {
            self.pose
        }

        fn seed_pose(&mut self, pose: Pose) {
            self.pose = pose;
        }

        fn render_map(&self, buffer: &mut [u8]) {
            buffer.fill(self.updates as u8);
        }
    }

    #[tokio::test]
    async fn loop_publishes_pose_and_map_then_exits_on_shutdown() {
        let scans = SharedScan::new();
        let pose = SharedPose::new();
        let map = SharedMap::unexplored(4);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        scans.publish(Scan::from_distances(vec![100.0, 0.0, 200.0, 0.0]));

        // a relocalized pose seeds the backend before steady state begins
        let mut algorithm = CountingSlam::new();
        algorithm.seed_pose(Pose::new(500.0, 0.0, 0.0));

        let task = tokio::spawn(run_slam_loop(
            algorithm,
            scans.clone(),
            pose.clone(),
            map.clone(),
            Duration::from_millis(1),
            shutdown_rx,
        ));

        // wait until at least one fusion step has been published
        while pose.get().x < 501.0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        // estimates continue from the seeded pose, not from the origin
        assert!(pose.get().x >= 501.0);
        assert!(map.snapshot().at(0, 0) >= 1);
    }

    #[tokio::test]
    async fn empty_scans_do_not_reach_the_algorithm() {
        let scans = SharedScan::new();
        let pose = SharedPose::new();
        let map = SharedMap::unexplored(4);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // slot populated, but with a scan that saw nothing
        scans.publish(Scan::empty(4));

        let task = tokio::spawn(run_slam_loop(
            CountingSlam::new(),
            scans,
            pose.clone(),
            map.clone(),
            Duration::from_millis(1),
            shutdown_rx,
        ));

        tokio::time::sleep(Duration::from_millis(10)).await;
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        assert_eq!(pose.get(), Pose::origin());
        assert_eq!(map.snapshot().at(0, 0), 127);
    }
}
