// formation_sim/src/lib.rs

use bevy::prelude::*;

// Import the plugins defined within the simulation crate.
use crate::simulation::core::simulation_setup::SimulationSetupPlugin;
use crate::simulation::plugins::assignment::AssignmentPlugin;
use crate::simulation::plugins::debugging::state_error::StateErrorDebugPlugin;
use crate::simulation::plugins::formation::FormationPlugin;
use crate::simulation::plugins::reporting::ReportingPlugin;

// This prelude is for convenience for other files WITHIN the formation_sim crate.
pub mod prelude;

// This module contains all the simulation-specific logic.
pub mod cli;
pub mod error;
pub mod simulation;

/// The main plugin that brings together all the simulation parts.
/// A binary only needs to add this one plugin to a headless Bevy App that
/// already carries a `ScenarioConfig` resource.
pub struct FormationSimulationPlugin;

impl Plugin for FormationSimulationPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            // Core setup (PRNG, states, schedule sets, tick budget).
            SimulationSetupPlugin,
            // Spawns the agents and drives the formation controller.
            FormationPlugin,
            // Plans the polygon assignment once at scene build.
            AssignmentPlugin,
            // Periodic residual logging.
            StateErrorDebugPlugin,
            // Writes the run report and exits the app.
            ReportingPlugin,
        ));
    }
}
