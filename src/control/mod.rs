//! Control module for the rover
pub mod actuator;
pub mod drive;

use std::any::Any;

use log::info;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use self::actuator::{ActuatorHandle, Calibration, spawn_dispatcher};
use self::drive::DriveLink;
use crate::config::ActuatorConfig;
use crate::lifecycle::{LifecycleNode, LifecycleNodeBase, State};

/// Control stack: owns the motion command dispatcher for the drive platform
pub struct ControlStack {
    base: LifecycleNodeBase,
    config: ActuatorConfig,
    handle: ActuatorHandle,
    dispatcher: Option<JoinHandle<()>>,
}

impl ControlStack {
    /// Wire the dispatcher to a drive link and start draining commands
    pub fn new<L>(drive: L, config: ActuatorConfig, shutdown: watch::Receiver<bool>) -> Self
    where
        L: DriveLink + 'static,
    {
        let calibration = Calibration::new(&config);
        let (handle, dispatcher) =
            spawn_dispatcher(drive, calibration, config.queue_depth, shutdown);

        ControlStack {
            base: LifecycleNodeBase::new("control_stack"),
            config,
            handle,
            dispatcher: Some(dispatcher),
        }
    }

    /// Handle for enqueueing motion commands
    pub fn actuator(&self) -> ActuatorHandle {
        self.handle.clone()
    }

    /// Join the dispatcher after the shutdown signal has been raised
    pub async fn join(&mut self) {
        if let Some(task) = self.dispatcher.take() {
            let _ = task.await;
        }
    }
}

impl LifecycleNode for ControlStack {
    fn on_configure(&mut self) -> Result<(), String> {
        if self.config.secs_per_meter <= 0.0 || self.config.secs_per_rotation <= 0.0 {
            return Err("actuator timing constants must be positive".to_string());
        }
        info!("configuring control stack");
        self.base.transition(State::Inactive)
    }

    fn on_activate(&mut self) -> Result<(), String> {
        info!("activating control stack");
        self.base.transition(State::Active)
    }

    fn on_deactivate(&mut self) -> Result<(), String> {
        info!("deactivating control stack");
        self.base.transition(State::Inactive)
    }

    fn on_cleanup(&mut self) -> Result<(), String> {
        info!("cleaning up control stack");
        self.base.transition(State::Unconfigured)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
