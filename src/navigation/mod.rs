//! Navigation module for the rover
pub mod occupancy_grid;
pub mod planner;

use std::any::Any;

use log::{debug, info};

use self::occupancy_grid::OccupancyGrid;
use self::planner::{BreadthFirstPlanner, Route, RouteError, RoutePlanner};
use crate::common::GridCell;
use crate::config::GridConfig;
use crate::lifecycle::{LifecycleNode, LifecycleNodeBase, State};
use crate::slam::state::MapSnapshot;

/// Navigation stack: traversability grids and route search over them
pub struct NavigationStack {
    base: LifecycleNodeBase,
    config: GridConfig,
    planner: Box<dyn RoutePlanner>,
}

impl NavigationStack {
    pub fn new(config: GridConfig) -> Self {
        NavigationStack {
            base: LifecycleNodeBase::new("navigation_stack"),
            config,
            planner: Box::new(BreadthFirstPlanner),
        }
    }

    /// Swap in a different route-search algorithm
    pub fn with_planner<P: RoutePlanner + 'static>(mut self, planner: P) -> Self {
        self.planner = Box::new(planner);
        self
    }

    /// Downsample one immutable map snapshot into a traversability grid.
    /// The grid outlives the snapshot and later map updates never touch it.
    pub fn build_grid(&self, map: &MapSnapshot) -> OccupancyGrid {
        let grid = OccupancyGrid::build(map, self.config.density, self.config.epsilon);
        debug!(
            "built {0}x{0} grid at {1} pixels per cell",
            grid.size(),
            grid.density()
        );
        grid
    }

    /// Search a route between two grid cells
    pub fn find_route(
        &self,
        grid: &OccupancyGrid,
        start: GridCell,
        goal: GridCell,
    ) -> Result<Route, RouteError> {
        let route = self.planner.find_route(grid, start, goal)?;
        debug!(
            "route from {:?} to {:?} in {} moves",
            start,
            goal,
            route.len()
        );
        Ok(route)
    }

    /// Convert a route into map-pixel waypoints for motion execution
    pub fn route_to_map(&self, grid: &OccupancyGrid, route: &Route) -> Vec<(f64, f64)> {
        route.iter().map(|&cell| grid.cell_to_map(cell)).collect()
    }
}

impl LifecycleNode for NavigationStack {
    fn on_configure(&mut self) -> Result<(), String> {
        if self.config.density == 0 {
            return Err("grid density must be at least one pixel per cell".to_string());
        }
        info!("configuring navigation stack");
        self.base.transition(State::Inactive)
    }

    fn on_activate(&mut self) -> Result<(), String> {
        info!("activating navigation stack");
        self.base.transition(State::Active)
    }

    fn on_deactivate(&mut self) -> Result<(), String> {
        info!("deactivating navigation stack");
        self.base.transition(State::Inactive)
    }

    fn on_cleanup(&mut self) -> Result<(), String> {
        info!("cleaning up navigation stack");
        self.base.transition(State::Unconfigured)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_and_route_through_the_stack() {
        let stack = NavigationStack::new(GridConfig {
            density: 1,
            epsilon: 20.0,
        });
        let map = MapSnapshot::new(vec![255u8; 25]).unwrap();
        let grid = stack.build_grid(&map);

        let route = stack.find_route(&grid, (0, 0), (4, 4)).unwrap();
        assert_eq!(route.len(), 8);

        let waypoints = stack.route_to_map(&grid, &route);
        assert_eq!(waypoints.len(), 8);
        assert_eq!(waypoints.last(), Some(&(4.5, 4.5)));
    }

    #[test]
    fn zero_density_fails_configuration() {
        let mut stack = NavigationStack::new(GridConfig {
            density: 0,
            epsilon: 20.0,
        });
        assert!(stack.on_configure().is_err());
    }
}
