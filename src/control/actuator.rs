//! Motion command queue and dispatcher
//!
//! Producers enqueue rotate/move commands and can await their physical
//! completion. A single dispatcher task drains the queue in FIFO order and
//! executes each command as a timed open-loop motion: start the platform,
//! sleep for the calibrated duration, stop the platform. The trailing stop
//! runs on every exit path, including a drive fault mid-command and
//! shutdown mid-sleep, so the platform never coasts.

use std::time::Duration;

use log::{debug, warn};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::config::ActuatorConfig;
use crate::control::drive::{DriveCommand, DriveLink};

/// A motion request understood by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionCommand {
    /// Rotate in place; positive degrees turn left, negative turn right
    Rotate { degrees: f64 },
    /// Drive straight ahead for a distance in millimeters
    Move { distance_mm: f64 },
}

/// Errors surfaced to command producers
#[derive(Debug, Error)]
pub enum ActuatorError {
    /// The dispatcher is gone, usually because shutdown already ran
    #[error("actuator command queue is closed")]
    QueueClosed,
}

/// Maps distances and angles to open-loop motion durations
#[derive(Debug, Clone, Copy)]
pub struct Calibration {
    secs_per_meter: f64,
    secs_offset: f64,
    secs_per_rotation: f64,
}

impl Calibration {
    pub fn new(config: &ActuatorConfig) -> Self {
        Calibration {
            secs_per_meter: config.secs_per_meter,
            secs_offset: config.secs_offset,
            secs_per_rotation: config.secs_per_rotation,
        }
    }

    /// Drive time for a straight move of `distance_mm`
    pub fn travel_time(&self, distance_mm: f64) -> Duration {
        let seconds = (distance_mm / 1000.0) * self.secs_per_meter + self.secs_offset;
        Duration::from_secs_f64(seconds.max(0.0))
    }

    /// Drive time for an in-place turn of `degrees` (magnitude)
    pub fn turn_time(&self, degrees: f64) -> Duration {
        let seconds = degrees.abs() * self.secs_per_rotation / 360.0;
        Duration::from_secs_f64(seconds)
    }
}

struct QueuedCommand {
    command: MotionCommand,
    done: oneshot::Sender<()>,
}

/// Producer-side handle to the motion queue
#[derive(Clone)]
pub struct ActuatorHandle {
    queue: mpsc::Sender<QueuedCommand>,
}

impl ActuatorHandle {
    /// Rotate in place and resolve once the motion physically completed
    pub async fn rotate(&self, degrees: f64) -> Result<(), ActuatorError> {
        self.submit(MotionCommand::Rotate { degrees }).await
    }

    /// Drive forward and resolve once the motion physically completed
    pub async fn move_forward(&self, distance_mm: f64) -> Result<(), ActuatorError> {
        self.submit(MotionCommand::Move { distance_mm }).await
    }

    async fn submit(&self, command: MotionCommand) -> Result<(), ActuatorError> {
        let (done, completed) = oneshot::channel();
        self.queue
            .send(QueuedCommand { command, done })
            .await
            .map_err(|_| ActuatorError::QueueClosed)?;
        completed.await.map_err(|_| ActuatorError::QueueClosed)
    }
}

/// Start the dispatcher task. Returns the producer handle and the task
/// handle for joining at shutdown.
pub fn spawn_dispatcher<L>(
    drive: L,
    calibration: Calibration,
    queue_depth: usize,
    shutdown: watch::Receiver<bool>,
) -> (ActuatorHandle, JoinHandle<()>)
where
    L: DriveLink + 'static,
{
    let (tx, rx) = mpsc::channel(queue_depth.max(1));
    let task = tokio::spawn(run_dispatcher(rx, drive, calibration, shutdown));
    (ActuatorHandle { queue: tx }, task)
}

async fn run_dispatcher<L>(
    mut queue: mpsc::Receiver<QueuedCommand>,
    drive: L,
    calibration: Calibration,
    mut shutdown: watch::Receiver<bool>,
) where
    L: DriveLink,
{
    // separate receiver for interrupting a motion already in progress
    let mut motion_shutdown = shutdown.clone();

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                // a dropped sender means the application is tearing down
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            queued = queue.recv() => {
                let Some(queued) = queued else { break };
                execute(&drive, &calibration, queued, &mut motion_shutdown).await;
            }
        }
    }

    // Shutdown path: the platform must never be left coasting.
    if let Err(fault) = drive.send(DriveCommand::Stop) {
        warn!("stop on dispatcher exit failed: {fault}");
    }
}

/// Run one command to completion. The trailing stop is unconditional: it
/// runs after a finished motion, after a drive fault, and after a shutdown
/// signal that interrupts the sleep.
async fn execute<L>(
    drive: &L,
    calibration: &Calibration,
    queued: QueuedCommand,
    shutdown: &mut watch::Receiver<bool>,
) where
    L: DriveLink,
{
    let (start, duration) = match queued.command {
        MotionCommand::Move { distance_mm } => {
            (DriveCommand::Forward, calibration.travel_time(distance_mm))
        }
        MotionCommand::Rotate { degrees } => {
            let direction = if degrees > 0.0 {
                DriveCommand::TurnLeft
            } else {
                DriveCommand::TurnRight
            };
            (direction, calibration.turn_time(degrees))
        }
    };

    debug!("executing {:?} for {:?}", queued.command, duration);

    match drive.send(start) {
        Ok(()) => {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {}
                _ = shutdown.changed() => {
                    debug!("shutdown interrupted {:?} mid-motion", queued.command);
                }
            }
        }
        Err(fault) => warn!("drive rejected {:?}: {fault}", queued.command),
    }

    if let Err(fault) = drive.send(DriveCommand::Stop) {
        warn!("trailing stop failed: {fault}");
    }

    // Receiver may have given up waiting; completion is best-effort.
    let _ = queued.done.send(());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::drive::DriveFault;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingDrive {
        commands: Arc<Mutex<Vec<DriveCommand>>>,
    }

    impl RecordingDrive {
        fn recorded(&self) -> Vec<DriveCommand> {
            self.commands.lock().unwrap().clone()
        }
    }

    impl DriveLink for RecordingDrive {
        fn send(&self, command: DriveCommand) -> Result<(), DriveFault> {
            self.commands.lock().unwrap().push(command);
            Ok(())
        }
    }

    fn fast_calibration() -> Calibration {
        Calibration::new(&ActuatorConfig {
            secs_per_meter: 0.001,
            secs_offset: 0.0,
            secs_per_rotation: 0.001,
            queue_depth: 4,
        })
    }

    #[test]
    fn travel_time_is_linear_in_distance() {
        let cal = Calibration::new(&ActuatorConfig::default());
        let one_meter = cal.travel_time(1000.0).as_secs_f64();
        assert!((one_meter - 3.34711).abs() < 1e-6);
    }

    #[test]
    fn turn_time_scales_with_the_rotation_fraction() {
        let cal = Calibration::new(&ActuatorConfig::default());
        let quarter = cal.turn_time(90.0).as_secs_f64();
        assert!((quarter - 0.690).abs() < 1e-9);
        // direction does not change the duration
        assert_eq!(cal.turn_time(-90.0), cal.turn_time(90.0));
    }

    #[tokio::test]
    async fn commands_run_in_fifo_order_with_trailing_stops() {
        let drive = RecordingDrive::default();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (handle, task) =
            spawn_dispatcher(drive.clone(), fast_calibration(), 4, shutdown_rx);

        handle.rotate(90.0).await.unwrap();
        handle.move_forward(100.0).await.unwrap();
        handle.rotate(-45.0).await.unwrap();
        drop(handle);
        task.await.unwrap();

        assert_eq!(
            drive.recorded(),
            vec![
                DriveCommand::TurnLeft,
                DriveCommand::Stop,
                DriveCommand::Forward,
                DriveCommand::Stop,
                DriveCommand::TurnRight,
                DriveCommand::Stop,
                // dispatcher exit issues one final stop
                DriveCommand::Stop,
            ]
        );
    }

    #[tokio::test]
    async fn shutdown_stops_the_platform() {
        let drive = RecordingDrive::default();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (handle, task) =
            spawn_dispatcher(drive.clone(), fast_calibration(), 4, shutdown_rx);

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        assert_eq!(drive.recorded(), vec![DriveCommand::Stop]);
        // the queue is gone, producers see a closed-queue error
        assert!(matches!(
            handle.rotate(10.0).await,
            Err(ActuatorError::QueueClosed)
        ));
    }

    #[tokio::test]
    async fn faulted_start_still_sends_stop() {
        struct FailFirst {
            drive: RecordingDrive,
            failed: Arc<Mutex<bool>>,
        }
        impl DriveLink for FailFirst {
            fn send(&self, command: DriveCommand) -> Result<(), DriveFault> {
                let mut failed = self.failed.lock().unwrap();
                if !*failed {
                    *failed = true;
                    return Err(DriveFault("link down".into()));
                }
                self.drive.send(command)
            }
        }

        let recording = RecordingDrive::default();
        let drive = FailFirst {
            drive: recording.clone(),
            failed: Arc::new(Mutex::new(false)),
        };
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (handle, task) = spawn_dispatcher(drive, fast_calibration(), 4, shutdown_rx);

        // first send (Forward) faults; trailing stop must still go out
        handle.move_forward(50.0).await.unwrap();
        drop(handle);
        task.await.unwrap();

        assert_eq!(
            recording.recorded(),
            vec![DriveCommand::Stop, DriveCommand::Stop]
        );
    }
}
