//! Perception module for the rover
pub mod distance_field;
pub mod geometry;
pub mod localizer;
pub mod optimizer;
pub mod scan;

use std::any::Any;

use log::info;

use self::geometry::MapGeometry;
use self::localizer::{LocalizationError, Localizer};
use crate::common::Pose;
use crate::config::{LocalizerConfig, MapConfig};
use crate::control::actuator::ActuatorHandle;
use crate::lifecycle::{LifecycleNode, LifecycleNodeBase, State};
use crate::slam::state::{MapSnapshot, SharedPose, SharedScan};

/// Perception stack: pose estimation and pose recovery
pub struct PerceptionStack {
    base: LifecycleNodeBase,
    geometry: MapGeometry,
    localizer: Localizer,
    scans: SharedScan,
    pose: SharedPose,
}

impl PerceptionStack {
    pub fn new(
        map_config: &MapConfig,
        localizer_config: LocalizerConfig,
        scans: SharedScan,
        pose: SharedPose,
    ) -> Self {
        let geometry = MapGeometry::new(map_config.size_pixels, map_config.size_meters);
        PerceptionStack {
            base: LifecycleNodeBase::new("perception_stack"),
            geometry,
            localizer: Localizer::new(localizer_config, geometry),
            scans,
            pose,
        }
    }

    /// Current pose estimate
    pub fn pose(&self) -> Pose {
        self.pose.get()
    }

    /// Frame geometry of the map this stack perceives against
    pub fn geometry(&self) -> MapGeometry {
        self.geometry
    }

    /// Recover the rover pose on a loaded map and store it as the current
    /// estimate. The caller seeds the SLAM backend with the returned pose
    /// before starting steady-state fusion.
    pub async fn relocalize(
        &self,
        map: &MapSnapshot,
        actuator: &ActuatorHandle,
    ) -> Result<Pose, LocalizationError> {
        let pose = self.localizer.relocalize(&self.scans, map, actuator).await?;
        self.pose.store(pose);
        Ok(pose)
    }
}

impl LifecycleNode for PerceptionStack {
    fn on_configure(&mut self) -> Result<(), String> {
        info!("configuring perception stack");
        self.base.transition(State::Inactive)
    }

    fn on_activate(&mut self) -> Result<(), String> {
        info!("activating perception stack");
        self.base.transition(State::Active)
    }

    fn on_deactivate(&mut self) -> Result<(), String> {
        info!("deactivating perception stack");
        self.base.transition(State::Inactive)
    }

    fn on_cleanup(&mut self) -> Result<(), String> {
        info!("cleaning up perception stack");
        self.base.transition(State::Unconfigured)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
