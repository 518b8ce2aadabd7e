// formation_core/src/control/trajectory.rs

use nalgebra::RowVector3;

use crate::config::TrajectoryConfig;
use crate::control::pid::{DerivativeStart, PidState};
use crate::control::{FormationController, LoopState, RunHistory, StepOutcome};
use crate::error::Result;
use crate::types::{formation_from_poses, FormationPoses, Pose};

/// Drives every agent straight at its own fixed goal pose.
///
/// Position (x, y) and heading use separate proportional gains; the integral
/// and derivative terms share `ki` and `kd`. Control and velocity are both
/// integrated with step `dt`.
#[derive(Debug, Clone)]
pub struct TrajectoryController {
    config: TrajectoryConfig,
    state: LoopState,
    pid: PidState,
}

impl TrajectoryController {
    pub fn new(
        config: TrajectoryConfig,
        initial_poses: FormationPoses,
        initial_velocities: FormationPoses,
        goal: FormationPoses,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: LoopState::new(initial_poses, initial_velocities, goal),
            pid: PidState::new(DerivativeStart::FromFirstError),
        })
    }

    pub fn from_poses(
        config: TrajectoryConfig,
        initial_poses: &[Pose],
        initial_velocities: &[Pose],
        goal: &[Pose],
    ) -> Result<Self> {
        Self::new(
            config,
            formation_from_poses(initial_poses)?,
            formation_from_poses(initial_velocities)?,
            formation_from_poses(goal)?,
        )
    }

    pub fn config(&self) -> &TrajectoryConfig {
        &self.config
    }

    /// Steps until converged and hands back the recorded poses and errors.
    pub fn run(&mut self) -> Result<RunHistory> {
        let steps = self.run_to_convergence()?;
        log::debug!("trajectory controller converged in {} steps", steps);
        Ok(self.state.history.clone())
    }

    fn proportional_gains(&self) -> RowVector3<f64> {
        RowVector3::new(self.config.k_pos, self.config.k_pos, self.config.k_orient)
    }
}

impl FormationController for TrajectoryController {
    fn poses(&self) -> &FormationPoses {
        &self.state.poses
    }

    fn velocities(&self) -> &FormationPoses {
        &self.state.velocities
    }

    fn goal(&self) -> &FormationPoses {
        &self.state.goal
    }

    fn set_goal(&mut self, goal: FormationPoses) {
        self.state.retarget(goal);
        self.pid.reset();
    }

    fn advance(&mut self) -> Result<StepOutcome> {
        self.state.check_budget(self.config.max_iterations)?;

        let dt = self.config.dt;
        let error = self.state.goal - self.state.poses;
        let terms = self.pid.step(&error, dt, self.config.windup);

        let mut proportional = terms.proportional;
        let kp = self.proportional_gains();
        for mut row in proportional.row_iter_mut() {
            row.component_mul_assign(&kp);
        }
        let control = proportional + terms.integral * self.config.ki + terms.derivative * self.config.kd;

        self.state.velocities += control * dt;
        self.state.poses += self.state.velocities * dt;

        Ok(self.state.record(error, self.config.tolerance))
    }

    fn stop_at_goal(&mut self) {
        self.state.snap_to_goal();
    }

    fn iterations(&self) -> usize {
        self.state.iterations
    }

    fn max_iterations(&self) -> usize {
        self.config.max_iterations
    }

    fn tolerance(&self) -> f64 {
        self.config.tolerance
    }

    fn history(&self) -> &RunHistory {
        &self.state.history
    }
}
