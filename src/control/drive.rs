//! Discrete command protocol spoken to the drive platform
//!
//! The platform understands four commands and nothing else; all motion
//! shaping happens on our side through timing. The transport behind the
//! trait (HTTP bridge on the reference platform) is out of scope here.

use thiserror::Error;

/// The four commands the drive platform accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveCommand {
    Forward,
    TurnLeft,
    TurnRight,
    Stop,
}

/// Failure to deliver a command to the platform
#[derive(Debug, Error)]
#[error("drive link fault: {0}")]
pub struct DriveFault(pub String);

/// Transport seam to the physical drive platform
pub trait DriveLink: Send + Sync {
    fn send(&self, command: DriveCommand) -> Result<(), DriveFault>;
}
