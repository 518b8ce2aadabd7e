// formation_sim/src/simulation/core/app_state.rs

use bevy::{ecs::schedule::SystemSet, prelude::Resource, prelude::States};

/// Defines the major phases of the application's lifecycle.
#[derive(States, Debug, Clone, Eq, PartialEq, Hash, Default)]
pub enum AppState {
    /// The initial state. Agents are spawned and the controller is built from the config.
    #[default]
    SceneBuilding,

    /// The scene is built. The control loop ticks on `FixedUpdate`.
    Running,

    /// Every waypoint was reached, or the run failed. The report is written here.
    Finished,
}

/// System sets to control the order of execution during the SceneBuilding state.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SceneBuildSet {
    /// Pass 1: Build the controller and spawn one entity per agent.
    SpawnAgents,

    /// Pass 2: Plan the polygon target assignment, if the scenario asks for one.
    PlanAssignment,

    /// Pass 3: Leave the build phase.
    Finalize,
}

// =========================================================================
// == Main Simulation Sets ==
// =========================================================================

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    /// Advances the formation controller by one iteration and handles waypoints.
    Control,
    /// Copies controller poses onto the agent entities.
    StateSync,
    /// Logging and budget checks. Runs last.
    Validation,
}

/// How the run ended. Read by the reporting plugin when the app reaches `Finished`.
#[derive(Resource, Debug, Clone, PartialEq, Default)]
pub enum RunOutcome {
    #[default]
    Pending,
    Succeeded,
    Failed(String),
}

impl RunOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, RunOutcome::Failed(_))
    }
}
