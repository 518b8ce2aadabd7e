// formation_sim/src/error.rs

use formation_core::error::FormationError;
use thiserror::Error;

/// Everything that can stop a simulation run before or while it executes.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("failed to load scenario: {0}")]
    Config(#[from] figment::Error),

    #[error("scenario is invalid: {0}")]
    InvalidScenario(String),

    #[error(transparent)]
    Formation(#[from] FormationError),

    #[error("invalid noise distribution: {0}")]
    Noise(#[from] rand_distr::NormalError),

    #[error("failed to serialize run report: {0}")]
    Report(#[from] toml::ser::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
