// formation_core/src/config.rs

//! Plain-data configuration for the formation controllers.
//!
//! Every struct here deserializes with defaults, so a scenario file only needs
//! to name the values it wants to change. Call `validate()` before handing a
//! config to a controller; the constructors do this for you.

use serde::{Deserialize, Serialize};

use crate::error::{FormationError, Result};

// =========================================================================
// == Shared Control Options ==
// =========================================================================

/// Scalar PID gains applied uniformly to every agent and channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PidGains {
    #[serde(default = "default_kp")]
    pub kp: f64,
    #[serde(default)]
    pub ki: f64,
    #[serde(default)]
    pub kd: f64,
}

fn default_kp() -> f64 {
    1.0
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: default_kp(),
            ki: 0.0,
            kd: 0.0,
        }
    }
}

impl PidGains {
    pub const fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }

    fn validate(&self) -> Result<()> {
        if !(self.kp.is_finite() && self.ki.is_finite() && self.kd.is_finite()) {
            return Err(FormationError::InvalidConfig(format!(
                "PID gains must be finite, got {:?}",
                self
            )));
        }
        Ok(())
    }
}

/// What happens to the integral accumulator on every step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WindupGuard {
    /// Plain running sum. Grows without bound while an error persists.
    #[default]
    Unbounded,
    /// Every accumulator entry is clamped to `[-limit, limit]`.
    Clamp { limit: f64 },
    /// The old accumulator is scaled by `factor` before the new error is added.
    Decay { factor: f64 },
}

impl WindupGuard {
    fn validate(&self) -> Result<()> {
        match *self {
            WindupGuard::Unbounded => Ok(()),
            WindupGuard::Clamp { limit } if limit.is_finite() && limit >= 0.0 => Ok(()),
            WindupGuard::Decay { factor } if (0.0..=1.0).contains(&factor) => Ok(()),
            other => Err(FormationError::InvalidConfig(format!(
                "invalid windup guard {:?}",
                other
            ))),
        }
    }
}

/// Which target the rectangular controller's PID loop tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrackingMode {
    /// Error is measured against the commanded goal pose of each corner.
    #[default]
    GoalCorners,
    /// Error is measured against the rectangle recomputed around the live centroid.
    /// This holds the shape but never moves the centroid, so the goal is only
    /// reached if it already shares that centroid.
    FormationShape,
}

fn default_tolerance() -> f64 {
    0.1
}

fn default_max_iterations() -> usize {
    10_000
}

fn check_loop_limits(tolerance: f64, max_iterations: usize) -> Result<()> {
    if !(tolerance.is_finite() && tolerance > 0.0) {
        return Err(FormationError::InvalidConfig(format!(
            "tolerance must be positive, got {}",
            tolerance
        )));
    }
    if max_iterations == 0 {
        return Err(FormationError::InvalidConfig(
            "max_iterations must be at least 1".to_string(),
        ));
    }
    Ok(())
}

// =========================================================================
// == Rectangular Formation Controller ==
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormationConfig {
    /// Rectangle extent along x.
    pub length: f64,
    /// Rectangle extent along y.
    pub width: f64,
    pub gains: PidGains,
    pub tracking: TrackingMode,
    pub windup: WindupGuard,
    /// Frobenius-norm distance to the goal at which a run counts as converged.
    pub tolerance: f64,
    /// Iteration budget per commanded goal.
    pub max_iterations: usize,
}

impl Default for FormationConfig {
    fn default() -> Self {
        Self {
            length: 1.5,
            width: 1.0,
            gains: PidGains::default(),
            tracking: TrackingMode::default(),
            windup: WindupGuard::default(),
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
        }
    }
}

impl FormationConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, v) in [("length", self.length), ("width", self.width)] {
            if !(v.is_finite() && v > 0.0) {
                return Err(FormationError::InvalidConfig(format!(
                    "rectangle {} must be positive, got {}",
                    name, v
                )));
            }
        }
        self.gains.validate()?;
        self.windup.validate()?;
        check_loop_limits(self.tolerance, self.max_iterations)
    }
}

// =========================================================================
// == Trajectory Controller ==
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrajectoryConfig {
    /// Step scale for control and velocity integration.
    #[serde(default = "default_dt")]
    pub dt: f64,
    /// Proportional gain on the x and y channels.
    #[serde(default = "default_kp")]
    pub k_pos: f64,
    /// Proportional gain on the heading channel.
    #[serde(default = "default_kp")]
    pub k_orient: f64,
    #[serde(default)]
    pub ki: f64,
    #[serde(default = "default_trajectory_kd")]
    pub kd: f64,
    #[serde(default = "default_trajectory_windup")]
    pub windup: WindupGuard,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

fn default_dt() -> f64 {
    0.01
}

fn default_trajectory_kd() -> f64 {
    2.0
}

fn default_trajectory_windup() -> WindupGuard {
    WindupGuard::Clamp { limit: 10.0 }
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            dt: default_dt(),
            k_pos: default_kp(),
            k_orient: default_kp(),
            ki: 0.0,
            kd: default_trajectory_kd(),
            windup: default_trajectory_windup(),
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
        }
    }
}

impl TrajectoryConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(FormationError::InvalidConfig(format!(
                "dt must be positive, got {}",
                self.dt
            )));
        }
        PidGains::new(self.k_pos, self.ki, self.kd).validate()?;
        if !self.k_orient.is_finite() {
            return Err(FormationError::InvalidConfig(
                "k_orient must be finite".to_string(),
            ));
        }
        self.windup.validate()?;
        check_loop_limits(self.tolerance, self.max_iterations)
    }
}
