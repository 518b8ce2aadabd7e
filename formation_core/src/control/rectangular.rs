// formation_core/src/control/rectangular.rs

use crate::config::{FormationConfig, TrackingMode};
use crate::control::pid::{DerivativeStart, PidState};
use crate::control::{FormationController, LoopState, RunHistory, StepOutcome};
use crate::error::Result;
use crate::geometry::rectangle::Rectangle;
use crate::types::{formation_from_poses, FormationPoses, Pose};

/// Drives four agents onto the corners of a rigid rectangle.
///
/// Each step recomputes the desired rectangle around the live centroid, runs a
/// PID law on the pose error, adds the control output to the velocities and
/// the velocities to the poses. The control output therefore acts like an
/// acceleration, and the step size is always one.
#[derive(Debug, Clone)]
pub struct RectangularFormationController {
    config: FormationConfig,
    rectangle: Rectangle,
    state: LoopState,
    pid: PidState,
    desired: FormationPoses,
}

impl RectangularFormationController {
    /// Creates a controller at rest on its own initial poses (goal = initial poses).
    pub fn new(
        config: FormationConfig,
        initial_poses: FormationPoses,
        initial_velocities: FormationPoses,
    ) -> Result<Self> {
        config.validate()?;
        let rectangle = Rectangle::new(config.length, config.width)?;
        let desired = rectangle.desired_poses(&initial_poses);
        Ok(Self {
            config,
            rectangle,
            state: LoopState::new(initial_poses, initial_velocities, initial_poses),
            pid: PidState::new(DerivativeStart::FromZero),
            desired,
        })
    }

    /// Slice-based constructor. Fails unless both slices hold exactly four poses.
    pub fn from_poses(
        config: FormationConfig,
        initial_poses: &[Pose],
        initial_velocities: &[Pose],
    ) -> Result<Self> {
        Self::new(
            config,
            formation_from_poses(initial_poses)?,
            formation_from_poses(initial_velocities)?,
        )
    }

    pub fn config(&self) -> &FormationConfig {
        &self.config
    }

    pub fn rectangle(&self) -> &Rectangle {
        &self.rectangle
    }

    /// The rectangle corners around the current centroid, with current headings.
    pub fn desired_poses(&self) -> &FormationPoses {
        &self.desired
    }

    pub fn pid(&self) -> &PidState {
        &self.pid
    }

    /// Commands `goal` and steps until converged or out of budget.
    pub fn navigate_to_goal_pose(&mut self, goal: FormationPoses) -> Result<usize> {
        self.set_goal(goal);
        let steps = self.run_to_convergence()?;
        log::debug!(
            "rectangular formation converged in {} steps (residual {:.4})",
            steps,
            self.residual()
        );
        Ok(steps)
    }

    /// Teleports the agents onto `goal` and stops them.
    pub fn stop_at_goal_pose(&mut self, goal: FormationPoses) {
        self.state.retarget(goal);
        self.stop_at_goal();
    }

    fn tracking_target(&self) -> &FormationPoses {
        match self.config.tracking {
            TrackingMode::GoalCorners => &self.state.goal,
            TrackingMode::FormationShape => &self.desired,
        }
    }
}

impl FormationController for RectangularFormationController {
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
        log::debug!("rectangular formation retargeted, tracking {:?}", self.config.tracking);
        self.state.retarget(goal);
    }

    fn advance(&mut self) -> Result<StepOutcome> {
        self.state.check_budget(self.config.max_iterations)?;

        let error = self.tracking_target() - self.state.poses;
        let terms = self.pid.step(&error, 1.0, self.config.windup);
        let gains = self.config.gains;
        let control =
            terms.proportional * gains.kp + terms.integral * gains.ki + terms.derivative * gains.kd;

        self.state.velocities += control;
        self.state.poses += self.state.velocities;
        self.desired = self.rectangle.desired_poses(&self.state.poses);

        Ok(self.state.record(error, self.config.tolerance))
    }

    fn stop_at_goal(&mut self) {
        self.state.snap_to_goal();
        self.desired = self.rectangle.desired_poses(&self.state.poses);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PidGains, WindupGuard};
    use crate::error::FormationError;
    use crate::types::{centroid, formation_from_rows};
    use approx::assert_abs_diff_eq;
    use nalgebra::Point2;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn start_poses() -> FormationPoses {
        formation_from_rows(&[
            vec![0.0, 0.0, 0.0],
            vec![0.0, 1.0, FRAC_PI_2],
            vec![1.0, 1.0, PI],
            vec![1.0, 0.0, -FRAC_PI_2],
        ])
        .unwrap()
    }

    fn demo_goal() -> FormationPoses {
        formation_from_rows(&[
            vec![2.0, 2.0, 0.0],
            vec![2.0, 3.0, FRAC_PI_2],
            vec![3.0, 3.0, PI],
            vec![3.0, 2.0, -FRAC_PI_2],
        ])
        .unwrap()
    }

    fn controller(gains: PidGains, tracking: TrackingMode, max_iterations: usize) -> RectangularFormationController {
        let config = FormationConfig {
            length: 1.5,
            width: 1.0,
            gains,
            tracking,
            max_iterations,
            ..Default::default()
        };
        RectangularFormationController::new(config, start_poses(), FormationPoses::zeros()).unwrap()
    }

    #[test]
    fn stop_at_goal_snaps_exactly() {
        let mut c = controller(PidGains::new(0.3, 0.1, 0.2), TrackingMode::GoalCorners, 100);
        for _ in 0..5 {
            c.set_goal(demo_goal());
            c.advance().unwrap();
        }
        c.stop_at_goal_pose(demo_goal());

        assert_eq!(c.poses(), &demo_goal());
        assert_eq!(c.velocities(), &FormationPoses::zeros());
        assert!(c.has_converged());
        assert_eq!(c.desired_poses(), &c.rectangle().desired_poses(&demo_goal()));
    }

    #[test]
    fn unit_gain_from_rest_lands_in_one_step() {
        let mut c = controller(PidGains::default(), TrackingMode::GoalCorners, 100);
        let steps = c.navigate_to_goal_pose(demo_goal()).unwrap();
        assert_eq!(steps, 1);
        // Landing on the goal still leaves the agents moving.
        assert!(c.velocities().norm() > 1.0);
    }

    #[test]
    fn damped_gains_are_deadbeat() {
        let mut c = controller(PidGains::new(1.0, 0.0, 1.0), TrackingMode::GoalCorners, 100);
        let steps = c.navigate_to_goal_pose(demo_goal()).unwrap();
        assert!(steps <= 3, "took {} steps", steps);
        assert!(c.residual() <= 0.1);
    }

    #[test]
    fn moderate_gains_converge_within_budget() {
        let mut c = controller(PidGains::new(0.5, 0.0, 1.0), TrackingMode::GoalCorners, 500);
        c.navigate_to_goal_pose(demo_goal()).unwrap();
        assert!(c.has_converged());
        assert_eq!(c.history().errors.len(), c.iterations());
    }

    #[test]
    fn zero_gains_never_close_the_gap() {
        let mut c = controller(PidGains::new(0.0, 0.0, 0.0), TrackingMode::GoalCorners, 50);
        c.set_goal(demo_goal());
        let initial_residual = c.residual();

        let err = c.run_to_convergence().unwrap_err();
        assert!(matches!(err, FormationError::NonConvergence { iterations: 50, .. }));
        assert_abs_diff_eq!(c.residual(), initial_residual, epsilon = 1e-12);
        assert_eq!(c.history().errors.len(), 50);
        assert_eq!(c.history().poses.len(), 51);
    }

    #[test]
    fn history_grows_one_entry_per_step() {
        let mut c = controller(PidGains::new(0.2, 0.0, 0.5), TrackingMode::GoalCorners, 1_000);
        c.set_goal(demo_goal());
        for m in 1..=7 {
            c.advance().unwrap();
            assert_eq!(c.history().len(), m);
        }
    }

    #[test]
    fn shape_tracking_holds_the_centroid_and_closes_the_rectangle() {
        let mut c = controller(PidGains::new(1.0, 0.0, 1.0), TrackingMode::FormationShape, 100);
        let c0 = centroid(c.poses());
        let goal = *c.desired_poses();

        c.navigate_to_goal_pose(goal).unwrap();
        for poses in &c.history().poses {
            let ck = centroid(poses);
            assert_abs_diff_eq!(ck.x, c0.x, epsilon = 1e-9);
            assert_abs_diff_eq!(ck.y, c0.y, epsilon = 1e-9);
        }
        let expected = c.rectangle().corners_around(c0);
        for (i, corner) in expected.iter().enumerate() {
            assert_abs_diff_eq!(c.poses()[(i, 0)], corner.x, epsilon = 0.1);
            assert_abs_diff_eq!(c.poses()[(i, 1)], corner.y, epsilon = 0.1);
        }
    }

    #[test]
    fn shape_tracking_cannot_reach_a_displaced_goal() {
        let mut c = controller(PidGains::new(1.0, 0.0, 1.0), TrackingMode::FormationShape, 200);
        let goal = c.rectangle().goal_poses(Point2::new(10.0, 10.0), 0.0);
        assert!(matches!(
            c.navigate_to_goal_pose(goal),
            Err(FormationError::NonConvergence { .. })
        ));
    }

    #[test]
    fn clamped_integral_stays_bounded() {
        let config = FormationConfig {
            gains: PidGains::new(0.0, 0.01, 0.0),
            windup: WindupGuard::Clamp { limit: 2.0 },
            max_iterations: 300,
            ..Default::default()
        };
        let mut c = RectangularFormationController::new(config, start_poses(), FormationPoses::zeros()).unwrap();
        c.set_goal(demo_goal());
        for _ in 0..300 {
            c.advance().unwrap();
            assert!(c.pid().integral().amax() <= 2.0);
        }
    }

    #[test]
    fn wrong_pose_count_is_rejected() {
        let three = [Pose::default(); 3];
        let four = [Pose::default(); 4];
        let err = RectangularFormationController::from_poses(FormationConfig::default(), &three, &four)
            .unwrap_err();
        assert!(matches!(
            err,
            FormationError::DimensionMismatch { expected: 4, actual: 3, .. }
        ));
    }
}
