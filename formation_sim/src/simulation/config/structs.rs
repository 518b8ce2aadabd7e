// formation_sim/src/simulation/config/structs.rs

use bevy::prelude::Resource;
use formation_core::config::{FormationConfig, TrajectoryConfig};
use formation_core::types::Pose;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_4;

// =========================================================================
// == Top-Level Configuration Resource ==
// =========================================================================

/// # ScenarioConfig
/// The primary Bevy resource holding all configuration for a simulation run.
/// This struct is the root of the data parsed from a `scenario.toml` file.
#[derive(Resource, Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)] // Fail if the TOML has fields not in our struct
pub struct ScenarioConfig {
    #[serde(default)] // Use default if the [simulation] section is missing
    pub simulation: SimulationSection,

    #[serde(default)]
    pub formation: FormationSection,

    #[serde(default)]
    pub agents: AgentsConfig,

    // The TOML has `[[waypoints]]`, which becomes a Vec of WaypointConfig structs.
    #[serde(default)]
    pub waypoints: Vec<WaypointConfig>,

    #[serde(default)]
    pub assignment: Option<AssignmentSection>,
}

// =========================================================================
// == Configuration Sub-Structs ==
// These map directly to the sections in the scenario.toml file.
// =========================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationSection {
    /// Optional seed for the pseudo-random number generator for determinism.
    pub seed: Option<u64>,
    /// Control ticks per second.
    pub tick_hz: f64,
    /// Give up after this many ticks. `None` relies on the controller's own budget.
    pub max_frames: Option<u64>,
    /// Log the formation residual every this many ticks. Zero disables it.
    pub log_every: u32,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            seed: None,
            tick_hz: 60.0,
            max_frames: None,
            log_every: 30,
        }
    }
}

/// Which of the two control laws drives the formation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ControllerKind {
    #[default]
    Rectangular,
    Trajectory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormationSection {
    pub controller: ControllerKind,
    /// Also supplies the rectangle extent used to turn waypoints into goal poses.
    pub rectangular: FormationConfig,
    pub trajectory: TrajectoryConfig,
}

/// How the four agents are placed before the first tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")] // e.g. `type = "Scattered"` selects the variant
#[serde(rename_all = "PascalCase")]
pub enum AgentsConfig {
    /// Exactly four poses (and optionally velocities) given by hand.
    Explicit {
        poses: Vec<Pose>,
        #[serde(default)]
        velocities: Option<Vec<Pose>>,
    },
    /// Agents start near the corners of the formation rectangle, with Gaussian noise.
    Scattered {
        center: [f64; 2],
        #[serde(default)]
        heading: f64,
        position_stddev: f64,
        heading_stddev: f64,
    },
}

impl Default for AgentsConfig {
    fn default() -> Self {
        AgentsConfig::Scattered {
            center: [0.0, 0.0],
            heading: 0.0,
            position_stddev: 0.5,
            heading_stddev: 0.2,
        }
    }
}

/// One commanded rectangle placement.
///
/// Either absolute (`center` and `heading`), or a `shift` of the previous
/// goal that keeps its shape and headings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged, deny_unknown_fields)]
pub enum WaypointConfig {
    Absolute {
        center: [f64; 2],
        #[serde(default)]
        heading: f64,
    },
    Shift { shift: [f64; 2] },
}

/// Polygon target assignment, planned once at scene build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssignmentSection {
    pub agent_count: usize,
    pub center: [f64; 2],
    pub theta: f64,
    /// Distance from the polygon center to each vertex.
    pub side_length: f64,
    /// Start coordinates are drawn per axis from one of these `[low, high]` bands.
    pub spawn_bands: Vec<[f64; 2]>,
}

impl Default for AssignmentSection {
    fn default() -> Self {
        Self {
            agent_count: 4,
            center: [100.0, 100.0],
            theta: FRAC_PI_4,
            side_length: 30.0,
            spawn_bands: vec![[0.0, 55.0], [135.0, 200.0]],
        }
    }
}
