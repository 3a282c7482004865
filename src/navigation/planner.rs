//! Route search over the coarse traversability grid

use std::collections::{HashMap, VecDeque};

use thiserror::Error;

use crate::common::GridCell;
use crate::navigation::occupancy_grid::OccupancyGrid;

/// An ordered sequence of cells from just after the start to the goal
pub type Route = Vec<GridCell>;

/// Route search failures.
///
/// Invalid endpoints are the caller's mistake and are reported separately
/// from an honest "no path exists under current map knowledge", so callers
/// can tell a bad request from an incomplete map.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("start cell is out of bounds or not traversable")]
    InvalidStart,

    #[error("goal cell is out of bounds or not traversable")]
    InvalidGoal,

    #[error("no traversable route between start and goal")]
    NoRoute,
}

/// Seam for route-search algorithms
pub trait RoutePlanner: Send + Sync {
    fn find_route(
        &self,
        grid: &OccupancyGrid,
        start: GridCell,
        goal: GridCell,
    ) -> Result<Route, RouteError>;
}

/// Breadth-first route search.
///
/// On an unweighted 4-connected grid, breadth-first search returns a
/// shortest route by cell count. That property is part of the contract:
/// downstream motion budgets assume routes carry no detours.
pub struct BreadthFirstPlanner;

/// Neighbor expansion order. Fixed so that equal-length alternatives
/// always tie-break the same way.
const NEIGHBOR_ORDER: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, 1), (0, -1)];

impl RoutePlanner for BreadthFirstPlanner {
    fn find_route(
        &self,
        grid: &OccupancyGrid,
        start: GridCell,
        goal: GridCell,
    ) -> Result<Route, RouteError> {
        if !grid.is_traversable(start.0, start.1) {
            return Err(RouteError::InvalidStart);
        }
        if !grid.is_traversable(goal.0, goal.1) {
            return Err(RouteError::InvalidGoal);
        }

        let mut frontier = VecDeque::new();
        frontier.push_back(start);
        let mut came_from: HashMap<GridCell, GridCell> = HashMap::new();
        came_from.insert(start, start);

        'search: while let Some(current) = frontier.pop_front() {
            for (dx, dy) in NEIGHBOR_ORDER {
                let next = (current.0 + dx, current.1 + dy);
                if came_from.contains_key(&next) || !grid.is_traversable(next.0, next.1) {
                    continue;
                }
                came_from.insert(next, current);
                if next == goal {
                    break 'search;
                }
                frontier.push_back(next);
            }
        }

        if !came_from.contains_key(&goal) {
            return Err(RouteError::NoRoute);
        }

        // Walk parents back from the goal; the start itself is not part of
        // the route, which is a list of moves away from it.
        let mut route = Vec::new();
        let mut current = goal;
        while current != start {
            route.push(current);
            current = came_from[&current];
        }
        route.reverse();
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::occupancy_grid::CellState;
    use crate::slam::state::MapSnapshot;

    /// Build a grid from a character picture: '.' open, '#' obstacle,
    /// '?' unexplored. One map pixel per grid cell keeps the pictures
    /// readable.
    fn grid_from(picture: &[&str]) -> OccupancyGrid {
        let size = picture.len();
        let mut bytes = vec![0u8; size * size];
        for (y, row) in picture.iter().enumerate() {
            assert_eq!(row.len(), size);
            for (x, ch) in row.chars().enumerate() {
                bytes[y * size + x] = match ch {
                    '.' => 255,
                    '?' => 127,
                    '#' => 0,
                    _ => panic!("unknown cell {ch}"),
                };
            }
        }
        OccupancyGrid::build(&MapSnapshot::new(bytes).unwrap(), 1, 20.0)
    }

    #[test]
    fn open_grid_route_is_manhattan_optimal() {
        let grid = grid_from(&[".....", ".....", ".....", ".....", "....."]);
        let route = BreadthFirstPlanner
            .find_route(&grid, (0, 0), (4, 4))
            .unwrap();

        assert_eq!(route.len(), 8);
        assert_eq!(*route.last().unwrap(), (4, 4));
        assert!(!route.contains(&(0, 0)));

        // every step moves to a 4-connected neighbor
        let mut previous = (0, 0);
        for &cell in &route {
            let step = (cell.0 - previous.0).abs() + (cell.1 - previous.1).abs();
            assert_eq!(step, 1);
            previous = cell;
        }
    }

    #[test]
    fn route_threads_through_a_gap() {
        let grid = grid_from(&[
            ".....", //
            "####.", //
            ".....", //
            ".####", //
            ".....",
        ]);
        let route = BreadthFirstPlanner
            .find_route(&grid, (0, 0), (4, 4))
            .unwrap();

        assert_eq!(*route.last().unwrap(), (4, 4));
        // forced through both gaps
        assert!(route.contains(&(4, 1)));
        assert!(route.contains(&(0, 3)));
    }

    #[test]
    fn blocked_start_is_a_distinct_failure() {
        let grid = grid_from(&["#....", ".....", ".....", ".....", "....."]);
        assert_eq!(grid.cell(0, 0), CellState::Blocked);

        let result = BreadthFirstPlanner.find_route(&grid, (0, 0), (4, 4));
        assert_eq!(result, Err(RouteError::InvalidStart));
    }

    #[test]
    fn out_of_bounds_goal_is_a_distinct_failure() {
        let grid = grid_from(&["...", "...", "..."]);
        let result = BreadthFirstPlanner.find_route(&grid, (0, 0), (7, 7));
        assert_eq!(result, Err(RouteError::InvalidGoal));
    }

    #[test]
    fn walled_off_goal_reports_no_route() {
        let grid = grid_from(&[
            ".....", //
            "...##", //
            "...#.", //
            "...##", //
            ".....",
        ]);
        let result = BreadthFirstPlanner.find_route(&grid, (0, 0), (4, 2));
        assert_eq!(result, Err(RouteError::NoRoute));
    }

    #[test]
    fn unexplored_cells_are_routable_frontier() {
        let grid = grid_from(&["..?", "##?", "..?"]);
        let route = BreadthFirstPlanner
            .find_route(&grid, (0, 0), (0, 2))
            .unwrap();
        // the only way around the wall runs through the unexplored column
        assert!(route.contains(&(2, 1)));
    }

    #[test]
    fn start_equal_to_goal_yields_an_empty_route() {
        let grid = grid_from(&["...", "...", "..."]);
        let route = BreadthFirstPlanner
            .find_route(&grid, (1, 1), (1, 1))
            .unwrap();
        assert!(route.is_empty());
    }
}
