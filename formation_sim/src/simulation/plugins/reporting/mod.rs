// formation_sim/src/simulation/plugins/reporting/mod.rs

//! Summarizes a finished run, optionally writes it to disk as TOML, and
//! exits the app with a status that matches the outcome.

use std::path::Path;

use serde::Serialize;

use crate::prelude::*;
use crate::simulation::core::simulation_setup::TickCounter;
use crate::simulation::plugins::assignment::AssignmentPlan;
use formation_core::types::poses_from_formation;

pub struct ReportingPlugin;

impl Plugin for ReportingPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(AppState::Finished), finish_run);
    }
}

// =========================================================================
// == Report Structures ==
// =========================================================================

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RunReport {
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub controller: ControllerKind,
    pub ticks: u64,
    pub waypoints_completed: usize,
    pub waypoints_total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_residual: Option<f64>,
    // Tables go last so the TOML output stays flat at the top.
    pub final_poses: Vec<Pose>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment: Option<AssignmentReport>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AssignmentReport {
    pub total_distance: f64,
    pub pairs: Vec<AssignedPair>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct AssignedPair {
    pub start: usize,
    pub vertex: usize,
    pub distance: f64,
}

impl From<&AssignmentPlan> for AssignmentReport {
    fn from(plan: &AssignmentPlan) -> Self {
        Self {
            total_distance: plan.total_distance,
            pairs: plan
                .pairs
                .iter()
                .map(|p| AssignedPair {
                    start: p.initial_index,
                    vertex: p.target_index,
                    distance: p.distance,
                })
                .collect(),
        }
    }
}

impl RunReport {
    pub fn new(
        outcome: &RunOutcome,
        controller_kind: ControllerKind,
        ticks: u64,
        formation: Option<(&dyn FormationController, &WaypointQueue)>,
        assignment: Option<&AssignmentPlan>,
    ) -> Self {
        let failure = match outcome {
            RunOutcome::Succeeded => None,
            RunOutcome::Failed(reason) => Some(reason.clone()),
            RunOutcome::Pending => Some("run ended before an outcome was recorded".to_string()),
        };
        let (waypoints_completed, waypoints_total, final_residual, final_poses) = match formation {
            Some((controller, queue)) => (
                queue.completed,
                queue.total,
                Some(controller.residual()),
                poses_from_formation(controller.poses()).to_vec(),
            ),
            None => (0, 0, None, Vec::new()),
        };
        Self {
            succeeded: failure.is_none(),
            failure,
            controller: controller_kind,
            ticks,
            waypoints_completed,
            waypoints_total,
            final_residual,
            final_poses,
            assignment: assignment.map(AssignmentReport::from),
        }
    }

    pub fn to_toml(&self) -> Result<String, SimError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), SimError> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}

// =========================================================================
// == Finish System ==
// =========================================================================

fn finish_run(
    config: Res<ScenarioConfig>,
    outcome: Res<RunOutcome>,
    counter: Res<TickCounter>,
    cli: Option<Res<Cli>>,
    plan: Option<Res<AssignmentPlan>>,
    query: Query<(&FormationControllerModel, &WaypointQueue)>,
    mut exit: EventWriter<AppExit>,
) {
    let formation = query
        .single()
        .ok()
        .map(|(model, queue)| (model.0.as_ref(), queue));
    let report = RunReport::new(
        &outcome,
        config.formation.controller,
        counter.0,
        formation,
        plan.as_deref(),
    );

    match &report.failure {
        None => info!(
            "Run succeeded: {}/{} waypoints in {} ticks.",
            report.waypoints_completed, report.waypoints_total, report.ticks
        ),
        Some(reason) => error!(
            "Run failed after {} ticks ({}/{} waypoints): {}",
            report.ticks, report.waypoints_completed, report.waypoints_total, reason
        ),
    }

    let mut succeeded = report.succeeded;
    if let Some(path) = cli.as_ref().and_then(|cli| cli.report.as_ref()) {
        match report.write_to(path) {
            Ok(()) => info!("Run report written to {}", path.display()),
            Err(e) => {
                error!("Could not write run report to {}: {}", path.display(), e);
                succeeded = false;
            }
        }
    }

    exit.write(if succeeded {
        AppExit::Success
    } else {
        AppExit::error()
    });
}
