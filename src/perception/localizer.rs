//! Pose recovery against a previously saved map
//!
//! When the rover boots with a known map but no idea where it stands, the
//! localizer searches the full (x, y, heading) space for the pose that best
//! explains the live scan. A single scan rarely disambiguates a symmetric
//! room, so the attempt runs a fixed number of rounds and physically
//! rotates the platform between them: every round sees a different slice
//! of the environment.

use log::{debug, info};
use thiserror::Error;

use crate::common::Pose;
use crate::config::LocalizerConfig;
use crate::control::actuator::ActuatorHandle;
use crate::perception::distance_field::DistanceField;
use crate::perception::geometry::{polar_to_cartesian, transform_points, MapGeometry};
use crate::perception::optimizer::DifferentialEvolution;
use crate::slam::state::{MapSnapshot, SharedScan};

/// Ways a relocalization attempt can fail.
///
/// None of these may be papered over with a default pose: a wrong initial
/// pose poisons every map update the SLAM loop makes afterwards.
#[derive(Debug, Error)]
pub enum LocalizationError {
    /// The live scan had no returns at all, so there is no geometry to
    /// match against the map
    #[error("scan holds no returns")]
    EmptyScan,

    /// Every round completed without the search converging
    #[error("no pose found after {rounds} rounds")]
    Exhausted { rounds: usize },

    /// The actuator went away mid-attempt, e.g. during shutdown
    #[error("actuator unavailable during relocalization")]
    ActuatorUnavailable,
}

/// Global pose search over a saved map
pub struct Localizer {
    config: LocalizerConfig,
    geometry: MapGeometry,
}

impl Localizer {
    pub fn new(config: LocalizerConfig, geometry: MapGeometry) -> Self {
        Localizer { config, geometry }
    }

    /// Recover the rover pose on `map` from live scans.
    ///
    /// Runs the configured number of rounds. Each round snapshots the live
    /// scan, searches pose space against the map's distance field, and then
    /// rotates the platform by 360/rounds degrees, waiting for the rotation
    /// to finish before sampling again. Rounds whose search fails are
    /// skipped; the pose of the last successful round wins. An initial scan
    /// without returns aborts before the platform is asked to move.
    pub async fn relocalize(
        &self,
        scans: &SharedScan,
        map: &MapSnapshot,
        actuator: &ActuatorHandle,
    ) -> Result<Pose, LocalizationError> {
        let first_scan = scans
            .snapshot()
            .filter(|scan| scan.return_count() > 0)
            .ok_or(LocalizationError::EmptyScan)?;

        let field = DistanceField::build(map, self.config.obstacle_threshold);
        let search = DifferentialEvolution::new(self.config.search.clone());
        let bounds = self.search_bounds();
        let rounds = self.config.rounds.max(1);
        let step_degrees = 360.0 / rounds as f64;

        let mut best: Option<Pose> = None;

        for round in 0..rounds {
            let scan = if round == 0 {
                Some(first_scan.clone())
            } else {
                scans.snapshot().filter(|scan| scan.return_count() > 0)
            };

            match scan {
                Some(scan) => {
                    let points = polar_to_cartesian(&scan);
                    let result = search.minimize(&bounds, |candidate| {
                        let pose = Pose::new(candidate[0], candidate[1], candidate[2]);
                        let cells = transform_points(&points, &pose)
                            .into_iter()
                            .map(|p| self.geometry.world_to_map(p.x, p.y));
                        field.cost(cells)
                    });

                    match result {
                        Ok(minimum) => {
                            let pose =
                                Pose::new(minimum.point[0], minimum.point[1], minimum.point[2]);
                            debug!(
                                "round {round}: pose ({:.0}, {:.0}, {:.1}) cost {:.3} after {} generations",
                                pose.x, pose.y, pose.theta, minimum.cost, minimum.generations
                            );
                            best = Some(pose);
                        }
                        Err(err) => debug!("round {round}: search failed: {err}"),
                    }
                }
                None => debug!("round {round}: no usable scan, skipping"),
            }

            // Active sensing: turn before the next sample. The rotation must
            // physically finish before the next scan is trusted.
            if round + 1 < rounds {
                actuator
                    .rotate(step_degrees)
                    .await
                    .map_err(|_| LocalizationError::ActuatorUnavailable)?;
            }
        }

        match best {
            Some(pose) => {
                info!(
                    "relocalized at ({:.0}mm, {:.0}mm, {:.1}deg)",
                    pose.x, pose.y, pose.theta
                );
                Ok(pose)
            }
            None => Err(LocalizationError::Exhausted { rounds }),
        }
    }

    /// Box bounds of the pose search: positions keep the border margin away
    /// from the map edge, headings cover the full circle.
    fn search_bounds(&self) -> [(f64, f64); 3] {
        let extent = self.geometry.extent_mm();
        let border = self.config.border_mm;
        [
            (border, extent - border),
            (border, extent - border),
            (-180.0, 180.0),
        ]
    }
}
