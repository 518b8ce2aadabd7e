// formation_sim/src/simulation/config/mod.rs

//! This module handles loading and validating the simulation scenario from
//! disk, with environment-variable overrides layered on top.

mod structs;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

pub use structs::{
    AgentsConfig, AssignmentSection, ControllerKind, FormationSection, ScenarioConfig,
    SimulationSection, WaypointConfig,
};

use crate::error::SimError;

/// Environment variables with this prefix override scenario values,
/// e.g. `FORMATION_SIMULATION__SEED=7`.
pub const ENV_PREFIX: &str = "FORMATION_";

/// Loads, merges and validates a scenario file.
pub fn load_scenario(path: &Path) -> Result<ScenarioConfig, SimError> {
    if !path.is_file() {
        return Err(SimError::InvalidScenario(format!(
            "scenario file not found at {}",
            path.display()
        )));
    }
    let config: ScenarioConfig = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()?;
    config.validate()?;
    Ok(config)
}

/// Parses a scenario from an in-memory TOML string. No environment overrides.
pub fn scenario_from_str(toml: &str) -> Result<ScenarioConfig, SimError> {
    let config: ScenarioConfig = Figment::new().merge(Toml::string(toml)).extract()?;
    config.validate()?;
    Ok(config)
}

/// Fastest control rate the fixed-step schedule accepts.
pub const MAX_TICK_HZ: f64 = 10_000.0;

impl ScenarioConfig {
    /// Checks everything that serde alone cannot.
    pub fn validate(&self) -> Result<(), SimError> {
        let tick_hz = self.simulation.tick_hz;
        if !(tick_hz.is_finite() && tick_hz > 0.0 && tick_hz <= MAX_TICK_HZ) {
            return Err(SimError::InvalidScenario(format!(
                "tick_hz must be in (0, {}], got {}",
                MAX_TICK_HZ, tick_hz
            )));
        }
        match self.waypoints.first() {
            None => {
                return Err(SimError::InvalidScenario(
                    "at least one [[waypoints]] entry is required".to_string(),
                ))
            }
            Some(WaypointConfig::Shift { .. }) => {
                return Err(SimError::InvalidScenario(
                    "the first waypoint needs a center; there is nothing to shift".to_string(),
                ))
            }
            Some(WaypointConfig::Absolute { .. }) => {}
        }
        self.formation.rectangular.validate()?;
        self.formation.trajectory.validate()?;
        self.agents.validate()?;

        if let Some(assignment) = &self.assignment {
            validate_spawn_bands(&assignment.spawn_bands)?;
        }
        Ok(())
    }
}

impl AgentsConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        if let AgentsConfig::Scattered {
            position_stddev,
            heading_stddev,
            ..
        } = *self
        {
            for (name, v) in [
                ("position_stddev", position_stddev),
                ("heading_stddev", heading_stddev),
            ] {
                if !(v.is_finite() && v >= 0.0) {
                    return Err(SimError::InvalidScenario(format!(
                        "agents.{} must be finite and non-negative, got {}",
                        name, v
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Every band must be non-empty with finite ends and `low <= high`.
pub fn validate_spawn_bands(bands: &[[f64; 2]]) -> Result<(), SimError> {
    if bands.is_empty() {
        return Err(SimError::InvalidScenario(
            "assignment.spawn_bands must not be empty".to_string(),
        ));
    }
    if let Some(band) = bands
        .iter()
        .find(|[lo, hi]| !(lo.is_finite() && hi.is_finite() && lo <= hi))
    {
        return Err(SimError::InvalidScenario(format!(
            "spawn band {:?} needs finite ends with low <= high",
            band
        )));
    }
    Ok(())
}
