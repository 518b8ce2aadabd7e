// formation_sim/src/prelude.rs

// Re-export the entire Bevy prelude for convenience.
pub use bevy::prelude::*;

// Re-export the formation_core prelude so you can easily access
// pure types like `Pose`, `FormationController`, `FormationConfig`, etc.
// `Rectangle` collides with the Bevy math primitive; import it by path.
pub use formation_core::prelude::*;

// Re-export common simulation-specific types for easy access in other plugins.
pub use crate::cli::Cli;
pub use crate::error::SimError;
pub use crate::simulation::config::{
    AgentsConfig, AssignmentSection, ControllerKind, ScenarioConfig, WaypointConfig,
};
pub use crate::simulation::core::app_state::{AppState, RunOutcome, SceneBuildSet, SimulationSet};
pub use crate::simulation::core::components::{AgentIndex, FormationControllerModel, WaypointQueue};
pub use crate::simulation::core::prng::SimulationRng;
