// formation_sim/src/simulation/plugins/formation/mod.rs

//! Owns the formation controller: builds it from the scenario, ticks it on
//! `FixedUpdate`, walks the waypoint list and mirrors poses onto the agents.

use nalgebra::{Point2, Vector2};
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::prelude::*;
use crate::simulation::config::FormationSection;
use crate::simulation::core::simulation_setup::TickCounter;
// Named explicitly: the Bevy prelude has its own `Rectangle` primitive.
use formation_core::geometry::rectangle::{translated, Rectangle};
use formation_core::types::{formation_from_poses, poses_from_formation};

// =========================================================================
// == Plugin Definition ==
// =========================================================================

pub struct FormationPlugin;

impl Plugin for FormationPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            OnEnter(AppState::SceneBuilding),
            spawn_formation.in_set(SceneBuildSet::SpawnAgents),
        )
        .add_systems(
            FixedUpdate,
            (
                advance_formation.in_set(SimulationSet::Control),
                sync_agent_poses.in_set(SimulationSet::StateSync),
            ),
        );
    }
}

// =========================================================================
// == Scene Building ==
// =========================================================================

/// The rectangle every waypoint is expanded into.
pub fn formation_rectangle(section: &FormationSection) -> Result<Rectangle, SimError> {
    Ok(Rectangle::new(
        section.rectangular.length,
        section.rectangular.width,
    )?)
}

/// One goal matrix per waypoint, in order. A shift moves the previous goal.
pub fn waypoint_goals(
    rectangle: &Rectangle,
    waypoints: &[WaypointConfig],
) -> Result<Vec<FormationPoses>, SimError> {
    let mut goals: Vec<FormationPoses> = Vec::with_capacity(waypoints.len());
    for waypoint in waypoints {
        let goal = match *waypoint {
            WaypointConfig::Absolute { center, heading } => {
                rectangle.goal_poses(Point2::new(center[0], center[1]), heading)
            }
            WaypointConfig::Shift { shift } => {
                let previous = goals.last().ok_or_else(|| {
                    SimError::InvalidScenario("a shift waypoint needs an earlier waypoint".to_string())
                })?;
                translated(previous, Vector2::new(shift[0], shift[1]))
            }
        };
        goals.push(goal);
    }
    Ok(goals)
}

/// Initial poses and velocities for the four agents.
pub fn initial_formation<R: Rng + ?Sized>(
    agents: &AgentsConfig,
    rectangle: &Rectangle,
    rng: &mut R,
) -> Result<(FormationPoses, FormationPoses), SimError> {
    agents.validate()?;
    match agents {
        AgentsConfig::Explicit { poses, velocities } => {
            let poses = formation_from_poses(poses)?;
            let velocities = match velocities {
                Some(v) => formation_from_poses(v)?,
                None => FormationPoses::zeros(),
            };
            Ok((poses, velocities))
        }
        AgentsConfig::Scattered {
            center,
            heading,
            position_stddev,
            heading_stddev,
        } => {
            let position_noise = Normal::new(0.0, *position_stddev)?;
            let heading_noise = Normal::new(0.0, *heading_stddev)?;
            let corners = rectangle.corners(Point2::new(center[0], center[1]), *heading);

            let mut poses = FormationPoses::zeros();
            for (i, corner) in corners.iter().enumerate() {
                poses[(i, 0)] = corner.x + position_noise.sample(rng);
                poses[(i, 1)] = corner.y + position_noise.sample(rng);
                poses[(i, 2)] = heading + heading_noise.sample(rng);
            }
            Ok((poses, FormationPoses::zeros()))
        }
    }
}

/// Builds the configured control law, already commanded to `first_goal`.
pub fn build_controller(
    section: &FormationSection,
    poses: FormationPoses,
    velocities: FormationPoses,
    first_goal: FormationPoses,
) -> Result<Box<dyn FormationController>, SimError> {
    let controller: Box<dyn FormationController> = match section.controller {
        ControllerKind::Rectangular => {
            let mut controller =
                RectangularFormationController::new(section.rectangular.clone(), poses, velocities)?;
            controller.set_goal(first_goal);
            Box::new(controller)
        }
        ControllerKind::Trajectory => Box::new(TrajectoryController::new(
            section.trajectory.clone(),
            poses,
            velocities,
            first_goal,
        )?),
    };
    Ok(controller)
}

fn build_scene(
    config: &ScenarioConfig,
    rng: &mut SimulationRng,
) -> Result<(Box<dyn FormationController>, WaypointQueue), SimError> {
    let rectangle = formation_rectangle(&config.formation)?;
    let (poses, velocities) = initial_formation(&config.agents, &rectangle, &mut rng.0)?;

    let mut queue = WaypointQueue::new(waypoint_goals(&rectangle, &config.waypoints)?);
    let first_goal = queue.pending.pop_front().ok_or_else(|| {
        SimError::InvalidScenario("at least one waypoint is required".to_string())
    })?;

    let controller = build_controller(&config.formation, poses, velocities, first_goal)?;
    Ok((controller, queue))
}

fn spawn_formation(
    mut commands: Commands,
    config: Res<ScenarioConfig>,
    mut rng: ResMut<SimulationRng>,
    mut outcome: ResMut<RunOutcome>,
) {
    let (controller, queue) = match build_scene(&config, &mut rng) {
        Ok(scene) => scene,
        Err(e) => {
            *outcome = RunOutcome::Failed(e.to_string());
            return;
        }
    };

    info!(
        "[SPAWN] {:?} formation with {} waypoint(s), initial residual {:.3}",
        config.formation.controller,
        queue.total,
        controller.residual()
    );

    for (i, pose) in poses_from_formation(controller.poses()).into_iter().enumerate() {
        debug!("[SPAWN] agent_{} at ({:.3}, {:.3}, {:.3})", i, pose.x, pose.y, pose.theta);
        commands.spawn((Name::new(format!("agent_{}", i)), AgentIndex(i), pose));
    }
    commands.spawn((
        Name::new("formation"),
        FormationControllerModel(controller),
        queue,
    ));
}

// =========================================================================
// == Runtime Systems ==
// =========================================================================

/// One control iteration per fixed tick. Reaching a goal snaps the agents
/// onto it and commands the next waypoint.
fn advance_formation(
    mut query: Query<(&mut FormationControllerModel, &mut WaypointQueue)>,
    mut counter: ResMut<TickCounter>,
    mut outcome: ResMut<RunOutcome>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    // Several fixed ticks can run in one frame before `Finished` is applied.
    if *outcome != RunOutcome::Pending {
        return;
    }
    let Ok((mut model, mut queue)) = query.single_mut() else {
        return;
    };
    let controller = &mut model.0;

    let reached = if controller.has_converged() {
        true
    } else {
        counter.0 += 1;
        match controller.advance() {
            Ok(step) => step.converged,
            Err(e) => {
                error!("Formation control failed: {}", e);
                *outcome = RunOutcome::Failed(e.to_string());
                next_state.set(AppState::Finished);
                return;
            }
        }
    };
    if !reached {
        return;
    }

    info!(
        "Waypoint {}/{} reached after {} iterations (residual {:.4})",
        queue.completed + 1,
        queue.total,
        controller.iterations(),
        controller.residual()
    );
    controller.stop_at_goal();

    match queue.complete_current() {
        Some(next) => controller.set_goal(next),
        None => {
            info!("All waypoints reached in {} ticks.", counter.0);
            *outcome = RunOutcome::Succeeded;
            next_state.set(AppState::Finished);
        }
    }
}

/// Mirrors each controller row onto the agent entity with that index.
fn sync_agent_poses(
    controllers: Query<&FormationControllerModel>,
    mut agents: Query<(&AgentIndex, &mut Pose)>,
) {
    let Ok(model) = controllers.single() else {
        return;
    };
    let poses = poses_from_formation(model.0.poses());
    for (index, mut pose) in &mut agents {
        if let Some(current) = poses.get(index.0) {
            *pose = *current;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::config::scenario_from_str;
    use crate::simulation::core::simulation_setup::SimulationSetupPlugin;
    use approx::assert_abs_diff_eq;
    use bevy::state::app::StatesPlugin;
    use formation_core::types::centroid;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rectangle() -> Rectangle {
        Rectangle::new(1.5, 1.0).unwrap()
    }

    #[test]
    fn waypoints_become_rectangle_goals() {
        let waypoints = [
            WaypointConfig::Absolute {
                center: [2.0, 3.0],
                heading: 0.0,
            },
            WaypointConfig::Absolute {
                center: [-1.0, 0.0],
                heading: 0.5,
            },
        ];
        let goals = waypoint_goals(&rectangle(), &waypoints).unwrap();
        assert_eq!(goals.len(), 2);

        let c = centroid(&goals[0]);
        assert_abs_diff_eq!(c.x, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c.y, 3.0, epsilon = 1e-12);
        assert_eq!(goals[1].column(2).iter().copied().collect::<Vec<_>>(), vec![0.5; 4]);
    }

    #[test]
    fn shift_waypoint_moves_the_previous_goal() {
        let waypoints = [
            WaypointConfig::Absolute {
                center: [1.0, 1.0],
                heading: 0.3,
            },
            WaypointConfig::Shift { shift: [4.0, -2.0] },
            WaypointConfig::Shift { shift: [0.0, 1.0] },
        ];
        let goals = waypoint_goals(&rectangle(), &waypoints).unwrap();

        let c = centroid(&goals[2]);
        assert_abs_diff_eq!(c.x, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c.y, 0.0, epsilon = 1e-12);
        // Shape and headings carry over unchanged.
        assert_eq!(goals[2].column(2), goals[0].column(2));
        let spread = |g: &FormationPoses| g[(1, 0)] - g[(0, 0)];
        assert_abs_diff_eq!(spread(&goals[2]), spread(&goals[0]), epsilon = 1e-12);
    }

    #[test]
    fn leading_shift_waypoint_is_an_error() {
        let waypoints = [WaypointConfig::Shift { shift: [1.0, 0.0] }];
        assert!(matches!(
            waypoint_goals(&rectangle(), &waypoints),
            Err(SimError::InvalidScenario(_))
        ));
    }

    #[test]
    fn scattered_agents_start_near_their_corners() {
        let agents = AgentsConfig::Scattered {
            center: [10.0, -4.0],
            heading: 0.0,
            position_stddev: 0.05,
            heading_stddev: 0.0,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let (poses, velocities) = initial_formation(&agents, &rectangle(), &mut rng).unwrap();

        assert_eq!(velocities, FormationPoses::zeros());
        for (i, corner) in rectangle().corners(Point2::new(10.0, -4.0), 0.0).iter().enumerate() {
            assert_abs_diff_eq!(poses[(i, 0)], corner.x, epsilon = 0.5);
            assert_abs_diff_eq!(poses[(i, 1)], corner.y, epsilon = 0.5);
            assert_eq!(poses[(i, 2)], 0.0);
        }
    }

    #[test]
    fn same_seed_same_start() {
        let agents = AgentsConfig::default();
        let a = initial_formation(&agents, &rectangle(), &mut ChaCha8Rng::seed_from_u64(3)).unwrap();
        let b = initial_formation(&agents, &rectangle(), &mut ChaCha8Rng::seed_from_u64(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn negative_or_nan_noise_is_rejected() {
        for (position_stddev, heading_stddev) in [(-1.0, 0.0), (0.1, -0.5), (f64::NAN, 0.0)] {
            let agents = AgentsConfig::Scattered {
                center: [0.0, 0.0],
                heading: 0.0,
                position_stddev,
                heading_stddev,
            };
            let mut rng = ChaCha8Rng::seed_from_u64(0);
            assert!(matches!(
                initial_formation(&agents, &rectangle(), &mut rng),
                Err(SimError::InvalidScenario(_))
            ));
        }
    }

    #[test]
    fn explicit_agents_need_four_poses() {
        let agents = AgentsConfig::Explicit {
            poses: vec![Pose::default(); 3],
            velocities: None,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(matches!(
            initial_formation(&agents, &rectangle(), &mut rng),
            Err(SimError::Formation(FormationError::DimensionMismatch { .. }))
        ));
    }

    #[test]
    fn built_controller_is_aimed_at_the_first_goal() {
        let goal = rectangle().goal_poses(Point2::new(5.0, 5.0), 0.0);
        for kind in [ControllerKind::Rectangular, ControllerKind::Trajectory] {
            let section = FormationSection {
                controller: kind,
                ..Default::default()
            };
            let c = build_controller(&section, FormationPoses::zeros(), FormationPoses::zeros(), goal)
                .unwrap();
            assert_eq!(c.goal(), &goal);
            assert_eq!(c.iterations(), 0);
        }
    }

    const TOUR: &str = r#"
        [simulation]
        seed = 1

        [formation.rectangular]
        gains = { kp = 1.0, kd = 1.0 }

        [agents]
        type = "Explicit"
        poses = [
            { x = -0.75, y = 0.5 },
            { x = 0.75, y = 0.5 },
            { x = 0.75, y = -0.5 },
            { x = -0.75, y = -0.5 },
        ]

        [[waypoints]]
        center = [2.0, 0.0]

        [[waypoints]]
        center = [2.0, 2.0]
    "#;

    #[test]
    fn app_walks_every_waypoint() {
        let mut app = App::new();
        app.add_plugins(StatesPlugin)
            .insert_resource(scenario_from_str(TOUR).unwrap())
            .add_plugins((SimulationSetupPlugin, FormationPlugin));

        // First update builds the scene, the second applies the Running transition.
        app.update();
        app.update();
        assert_eq!(
            app.world().resource::<State<AppState>>().get(),
            &AppState::Running
        );
        let agents = app
            .world_mut()
            .query::<&AgentIndex>()
            .iter(app.world())
            .count();
        assert_eq!(agents, AGENT_COUNT);

        for _ in 0..20 {
            app.world_mut().run_schedule(FixedUpdate);
            if app.world().resource::<RunOutcome>() != &RunOutcome::Pending {
                break;
            }
        }
        assert_eq!(app.world().resource::<RunOutcome>(), &RunOutcome::Succeeded);

        let goal = rectangle().goal_poses(Point2::new(2.0, 2.0), 0.0);
        let mut agents = app.world_mut().query::<(&AgentIndex, &Pose)>();
        for (index, pose) in agents.iter(app.world()) {
            assert_abs_diff_eq!(pose.x, goal[(index.0, 0)], epsilon = 1e-12);
            assert_abs_diff_eq!(pose.y, goal[(index.0, 1)], epsilon = 1e-12);
        }
    }

    #[test]
    fn bad_scene_skips_to_finished() {
        let mut config = scenario_from_str(TOUR).unwrap();
        config.agents = AgentsConfig::Explicit {
            poses: vec![Pose::default(); 2],
            velocities: None,
        };
        let mut app = App::new();
        app.add_plugins(StatesPlugin)
            .insert_resource(config)
            .add_plugins((SimulationSetupPlugin, FormationPlugin));
        app.update();
        app.update();

        assert!(app.world().resource::<RunOutcome>().is_failed());
        assert_eq!(
            app.world().resource::<State<AppState>>().get(),
            &AppState::Finished
        );
    }
}
