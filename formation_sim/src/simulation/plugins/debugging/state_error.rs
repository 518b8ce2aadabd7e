// formation_sim/src/simulation/plugins/debugging/state_error.rs

use crate::prelude::*;
use crate::simulation::core::simulation_setup::{TickBudget, TickCounter};

// =========================================================================
// == Plugin Definition ==
// =========================================================================

pub struct StateErrorDebugPlugin;

impl Plugin for StateErrorDebugPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            (log_formation_error, enforce_tick_budget)
                .chain()
                .in_set(SimulationSet::Validation),
        );
    }
}

// =========================================================================
// == Error Logging System ==
// =========================================================================

/// True on every `log_every`-th control iteration, once.
fn is_log_tick(tick: u64, log_every: u32, advanced: bool) -> bool {
    let every = u64::from(log_every);
    advanced && every != 0 && tick != 0 && tick % every == 0
}

/// Logs the distance to the current goal and the worst agent every `log_every` ticks.
fn log_formation_error(
    config: Res<ScenarioConfig>,
    counter: Res<TickCounter>,
    query: Query<(&FormationControllerModel, &WaypointQueue)>,
) {
    // A tick that only commands the next waypoint leaves the counter untouched.
    if !is_log_tick(counter.0, config.simulation.log_every, counter.is_changed()) {
        return;
    }
    for (model, queue) in &query {
        let controller = &model.0;
        let error = controller.goal() - controller.poses();

        // Worst agent by planar distance to its goal corner.
        let (worst, worst_distance) = error
            .row_iter()
            .map(|row| row[0].hypot(row[1]))
            .enumerate()
            .fold((0, 0.0), |acc, (i, d)| if d > acc.1 { (i, d) } else { acc });

        debug!(
            "Tick {} | waypoint {}/{} | iter {}/{} | residual {:.4} | worst agent_{} at {:.3}m",
            counter.0,
            queue.completed + 1,
            queue.total,
            controller.iterations(),
            controller.max_iterations(),
            controller.residual(),
            worst,
            worst_distance
        );
    }
}

/// Fails the run once the global tick budget is spent.
fn enforce_tick_budget(
    budget: Res<TickBudget>,
    counter: Res<TickCounter>,
    mut outcome: ResMut<RunOutcome>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    let Some(max_frames) = budget.0 else {
        return;
    };
    if counter.0 >= max_frames && *outcome == RunOutcome::Pending {
        warn!("Tick budget of {} exhausted before the last waypoint.", max_frames);
        *outcome = RunOutcome::Failed(format!("tick budget of {} exhausted", max_frames));
        next_state.set(AppState::Finished);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logs_on_multiples_of_the_interval() {
        let ticks: Vec<u64> = (0..=10).filter(|&t| is_log_tick(t, 5, true)).collect();
        assert_eq!(ticks, vec![5, 10]);
    }

    #[test]
    fn repeated_tick_number_is_not_logged_again() {
        assert!(is_log_tick(30, 30, true));
        assert!(!is_log_tick(30, 30, false));
    }

    #[test]
    fn zero_interval_disables_logging() {
        assert!(!is_log_tick(30, 0, true));
    }
}
