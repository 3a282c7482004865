use anyhow::Result;
use tokio::sync::watch;

use rover_core::config::RoverConfig;
use rover_core::control::drive::{DriveCommand, DriveFault, DriveLink};
use rover_core::control::ControlStack;
use rover_core::navigation::NavigationStack;
use rover_core::slam::state::MapSnapshot;
use rover_core::RoverCore;

/// Drive link that only reports what it would do
struct LoggingDrive;

impl DriveLink for LoggingDrive {
    fn send(&self, command: DriveCommand) -> Result<(), DriveFault> {
        println!("drive <- {:?}", command);
        Ok(())
    }
}

/// A small synthetic map: an explored room with a dividing wall, inside
/// unexplored surroundings.
fn synthetic_map(size: usize) -> MapSnapshot {
    let mut bytes = vec![127u8; size * size];

    // explored open room
    for y in 8..size - 8 {
        for x in 8..size - 8 {
            bytes[y * size + x] = 255;
        }
    }
    // wall across most of the room, one grid cell thick
    for y in 8..size - 24 {
        for x in size / 2..size / 2 + 16 {
            bytes[y * size + x] = 0;
        }
    }

    MapSnapshot::new(bytes).unwrap()
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    println!("Initializing rover core...");

    let config = RoverConfig::default();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut core = RoverCore::new();
    core.register(NavigationStack::new(config.grid.clone()));
    let mut control = ControlStack::new(LoggingDrive, config.actuator.clone(), shutdown_rx);
    let actuator = control.actuator();
    core.register(control);

    core.init().map_err(anyhow::Error::msg)?;
    println!("Core initialized successfully!");

    // Plan a route across a synthetic map
    let map = synthetic_map(160);
    let nav = core
        .navigation_stack_mut()
        .expect("navigation stack registered");
    let grid = nav.build_grid(&map);
    println!("Grid is {0}x{0} cells", grid.size());

    match nav.find_route(&grid, (1, 1), (8, 8)) {
        Ok(route) => {
            println!("Planned route with {} moves", route.len());
            let route = nav.route_to_map(&grid, &route);
            println!("Waypoints in map pixels: {:?}", route);
        }
        Err(e) => println!("Route search failed: {}", e),
    }

    // Exercise the actuator queue: one left turn, executed as a timed
    // motion with a trailing stop
    actuator.rotate(36.0).await?;

    shutdown_tx.send(true).ok();
    if let Some(control) = core.control_stack_mut() {
        control.join().await;
    }

    core.shutdown().map_err(anyhow::Error::msg)?;
    println!("Core shutdown successfully!");
    Ok(())
}
