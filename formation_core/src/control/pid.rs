// formation_core/src/control/pid.rs

use crate::config::WindupGuard;
use crate::types::FormationPoses;

/// The three raw PID terms for one step, before any gains are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct PidTerms {
    pub proportional: FormationPoses,
    pub integral: FormationPoses,
    pub derivative: FormationPoses,
}

/// How the derivative term behaves on the very first step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivativeStart {
    /// The previous error starts at zero, so the first derivative equals the first error.
    FromZero,
    /// The first error is also used as the previous error, so the first derivative is zero.
    FromFirstError,
}

/// Per-agent, per-channel PID memory.
#[derive(Debug, Clone)]
pub struct PidState {
    prev_error: FormationPoses,
    integral: FormationPoses,
    start: DerivativeStart,
    primed: bool,
}

impl PidState {
    pub fn new(start: DerivativeStart) -> Self {
        Self {
            prev_error: FormationPoses::zeros(),
            integral: FormationPoses::zeros(),
            start,
            primed: false,
        }
    }

    /// Advances the memory by one step and returns the unweighted terms.
    ///
    /// `integral = guard(integral + error * dt)` and
    /// `derivative = (error - prev_error) / dt`. With `dt = 1` both reduce to a
    /// plain running sum and a plain difference.
    pub fn step(&mut self, error: &FormationPoses, dt: f64, guard: WindupGuard) -> PidTerms {
        if !self.primed {
            if self.start == DerivativeStart::FromFirstError {
                self.prev_error = *error;
            }
            self.primed = true;
        }

        let derivative = (error - self.prev_error) / dt;

        self.integral = match guard {
            WindupGuard::Unbounded => self.integral + error * dt,
            WindupGuard::Clamp { limit } => {
                (self.integral + error * dt).map(|v| v.clamp(-limit, limit))
            }
            WindupGuard::Decay { factor } => self.integral * factor + error * dt,
        };

        self.prev_error = *error;

        PidTerms {
            proportional: *error,
            integral: self.integral,
            derivative,
        }
    }

    pub fn reset(&mut self) {
        self.prev_error = FormationPoses::zeros();
        self.integral = FormationPoses::zeros();
        self.primed = false;
    }

    pub fn prev_error(&self) -> &FormationPoses {
        &self.prev_error
    }

    pub fn integral(&self) -> &FormationPoses {
        &self.integral
    }
}
