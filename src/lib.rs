pub mod common;
pub mod config;
pub mod control;
pub mod lifecycle;
pub mod navigation;
pub mod perception;
pub mod slam;

use crate::control::ControlStack;
use crate::lifecycle::LifecycleNode;
use crate::navigation::NavigationStack;
use crate::perception::PerceptionStack;

/// Core functionality for the rover: holds the component stacks and walks
/// them through their lifecycle together.
pub struct RoverCore {
    components: Vec<Box<dyn LifecycleNode>>,
}

impl RoverCore {
    /// Create a new instance of RoverCore
    pub fn new() -> Self {
        RoverCore {
            components: Vec::new(),
        }
    }

    /// Register a component with the core
    pub fn register<T: LifecycleNode + 'static>(&mut self, component: T) {
        self.components.push(Box::new(component));
    }

    /// Configure and activate all registered components, in registration
    /// order
    pub fn init(&mut self) -> Result<(), String> {
        for component in &mut self.components {
            component.on_configure()?;
            component.on_activate()?;
        }
        Ok(())
    }

    /// Deactivate and clean up all registered components
    pub fn shutdown(&mut self) -> Result<(), String> {
        for component in &mut self.components {
            component.on_deactivate()?;
            component.on_cleanup()?;
        }
        Ok(())
    }

    /// Get a reference to the navigation stack, if one was registered
    pub fn navigation_stack_mut(&mut self) -> Option<&mut NavigationStack> {
        self.components
            .iter_mut()
            .find_map(|component| component.as_any_mut().downcast_mut::<NavigationStack>())
    }

    /// Get a reference to the perception stack, if one was registered
    pub fn perception_stack_mut(&mut self) -> Option<&mut PerceptionStack> {
        self.components
            .iter_mut()
            .find_map(|component| component.as_any_mut().downcast_mut::<PerceptionStack>())
    }

    /// Get a reference to the control stack, if one was registered
    pub fn control_stack_mut(&mut self) -> Option<&mut ControlStack> {
        self.components
            .iter_mut()
            .find_map(|component| component.as_any_mut().downcast_mut::<ControlStack>())
    }
}

impl Default for RoverCore {
    fn default() -> Self {
        RoverCore::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;

    #[test]
    fn init_and_shutdown_walk_the_lifecycle() {
        let mut core = RoverCore::new();
        core.register(NavigationStack::new(GridConfig::default()));

        core.init().unwrap();
        assert!(core.navigation_stack_mut().is_some());
        core.shutdown().unwrap();
    }
}
