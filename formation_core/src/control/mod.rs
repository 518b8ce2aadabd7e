// formation_core/src/control/mod.rs

use std::fmt::Debug;

use crate::error::{FormationError, Result};
use crate::types::FormationPoses;

pub mod pid;
pub mod rectangular;
pub mod trajectory;

/// What a single `advance` call did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    /// Iteration count for the current goal, including this step.
    pub iteration: usize,
    /// Frobenius distance between the poses and the goal after the step.
    pub residual: f64,
    pub converged: bool,
}

/// The time series a controller records for external analysis and plotting.
/// The control law never reads it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunHistory {
    /// Starts with the poses at the moment the goal was set, then one entry per step.
    pub poses: Vec<FormationPoses>,
    /// One error snapshot per step.
    pub errors: Vec<FormationPoses>,
}

impl RunHistory {
    fn starting_at(poses: FormationPoses) -> Self {
        Self {
            poses: vec![poses],
            errors: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

// --- FORMATION CONTROLLER TRAIT ---
/// A stepwise formation controller that an external scheduler drives one tick at a time.
/// Implementations should be `Send + Sync` so a simulation can hold them in its world.
pub trait FormationController: Debug + Send + Sync {
    /// Current agent poses, one row per agent.
    fn poses(&self) -> &FormationPoses;

    /// Current per-step velocities, one row per agent.
    fn velocities(&self) -> &FormationPoses;

    /// The goal the controller is converging to.
    fn goal(&self) -> &FormationPoses;

    /// Commands a new goal. Restarts the iteration budget and the history.
    fn set_goal(&mut self, goal: FormationPoses);

    /// Runs exactly one control iteration.
    ///
    /// Fails with [`FormationError::NonConvergence`] without moving anything if the
    /// iteration budget for the current goal is already spent.
    fn advance(&mut self) -> Result<StepOutcome>;

    /// Snaps every agent onto the goal and zeroes the velocities.
    fn stop_at_goal(&mut self);

    /// Iterations run since the goal was last set.
    fn iterations(&self) -> usize;

    fn max_iterations(&self) -> usize;

    fn tolerance(&self) -> f64;

    fn history(&self) -> &RunHistory;

    /// Frobenius norm of `poses - goal` over all twelve scalars.
    fn residual(&self) -> f64 {
        (self.poses() - self.goal()).norm()
    }

    fn has_converged(&self) -> bool {
        self.residual() <= self.tolerance()
    }

    /// Steps until converged. Returns the number of steps taken by this call.
    fn run_to_convergence(&mut self) -> Result<usize> {
        let start = self.iterations();
        while !self.has_converged() {
            self.advance()?;
        }
        Ok(self.iterations() - start)
    }
}

/// The mutable state every controller carries between steps.
#[derive(Debug, Clone)]
pub(crate) struct LoopState {
    pub poses: FormationPoses,
    pub velocities: FormationPoses,
    pub goal: FormationPoses,
    pub iterations: usize,
    pub history: RunHistory,
}

impl LoopState {
    pub fn new(poses: FormationPoses, velocities: FormationPoses, goal: FormationPoses) -> Self {
        Self {
            poses,
            velocities,
            goal,
            iterations: 0,
            history: RunHistory::starting_at(poses),
        }
    }

    pub fn residual(&self) -> f64 {
        (self.poses - self.goal).norm()
    }

    pub fn retarget(&mut self, goal: FormationPoses) {
        self.goal = goal;
        self.iterations = 0;
        self.history = RunHistory::starting_at(self.poses);
    }

    pub fn check_budget(&self, max_iterations: usize) -> Result<()> {
        if self.iterations >= max_iterations {
            let residual = self.residual();
            log::warn!(
                "formation controller spent its {} iteration budget, residual {:.4}",
                max_iterations,
                residual
            );
            return Err(FormationError::NonConvergence {
                iterations: self.iterations,
                residual,
            });
        }
        Ok(())
    }

    /// Books one finished step and reports it.
    pub fn record(&mut self, error: FormationPoses, tolerance: f64) -> StepOutcome {
        self.iterations += 1;
        self.history.errors.push(error);
        self.history.poses.push(self.poses);
        let residual = self.residual();
        StepOutcome {
            iteration: self.iterations,
            residual,
            converged: residual <= tolerance,
        }
    }

    pub fn snap_to_goal(&mut self) {
        self.poses = self.goal;
        self.velocities = FormationPoses::zeros();
    }
}
