// formation_sim/src/simulation/plugins/assignment/mod.rs

//! Polygon target assignment. When the scenario has an `[assignment]` section,
//! random start points are drawn once at scene build and greedily matched to
//! the vertices of a regular polygon. The plan is logged and kept for the report.

use nalgebra::Point2;
use rand::Rng;

use crate::prelude::*;
use crate::simulation::config::{validate_spawn_bands, AssignmentSection};
use formation_core::assignment::{assign, total_distance, AssignmentPair};
use formation_core::geometry::polygon::RegularPolygon;

pub struct AssignmentPlugin;

impl Plugin for AssignmentPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            OnEnter(AppState::SceneBuilding),
            plan_assignment.in_set(SceneBuildSet::PlanAssignment),
        );
    }
}

/// The committed agent-to-vertex matching.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct AssignmentPlan {
    pub pairs: Vec<AssignmentPair>,
    pub total_distance: f64,
}

/// Draws `count` start points. Each coordinate picks one of `bands` at random,
/// then a uniform value inside it.
pub fn random_starts<R: Rng + ?Sized>(
    count: usize,
    bands: &[[f64; 2]],
    rng: &mut R,
) -> Result<Vec<Point2<f64>>, SimError> {
    validate_spawn_bands(bands)?;
    let coordinate = |rng: &mut R| {
        let [lo, hi] = bands[rng.gen_range(0..bands.len())];
        rng.gen_range(lo..=hi)
    };
    Ok((0..count)
        .map(|_| {
            let x = coordinate(rng);
            let y = coordinate(rng);
            Point2::new(x, y)
        })
        .collect())
}

/// Builds the polygon and matches `starts` onto its vertices.
pub fn build_plan(section: &AssignmentSection, starts: &[Point2<f64>]) -> Result<AssignmentPlan, SimError> {
    let polygon = RegularPolygon::new(
        Point2::new(section.center[0], section.center[1]),
        section.theta,
        section.agent_count,
        section.side_length,
    )?;
    let pairs = assign(starts, &polygon.targets())?;
    let total_distance = total_distance(&pairs);
    Ok(AssignmentPlan {
        pairs,
        total_distance,
    })
}

fn plan_assignment(
    mut commands: Commands,
    config: Res<ScenarioConfig>,
    mut rng: ResMut<SimulationRng>,
    mut outcome: ResMut<RunOutcome>,
) {
    let Some(section) = &config.assignment else {
        return;
    };
    let plan = random_starts(section.agent_count, &section.spawn_bands, &mut rng.0)
        .and_then(|starts| build_plan(section, &starts));

    match plan {
        Ok(plan) => {
            for pair in &plan.pairs {
                info!(
                    "[ASSIGN] start {} ({:.2}, {:.2}) -> vertex {} ({:.2}, {:.2}), distance {:.3}",
                    pair.initial_index,
                    pair.initial.x,
                    pair.initial.y,
                    pair.target_index,
                    pair.target.x,
                    pair.target.y,
                    pair.distance
                );
            }
            info!("[ASSIGN] total distance {:.3}", plan.total_distance);
            commands.insert_resource(plan);
        }
        Err(e) => {
            error!("Assignment planning failed: {}", e);
            *outcome = RunOutcome::Failed(e.to_string());
        }
    }
}
