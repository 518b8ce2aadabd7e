// formation_sim/src/simulation/core/simulation_setup.rs

use std::time::Duration;

use crate::prelude::*;
use crate::simulation::config::{SimulationSection, MAX_TICK_HZ};

/// Hard cap on control ticks for the whole run, if any.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct TickBudget(pub Option<u64>);

/// Control ticks run so far, across all waypoints.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct TickCounter(pub u64);

/// The fixed-update period for `tick_hz`. Rejects rates whose period is not a
/// positive, representable duration.
pub fn fixed_timestep(tick_hz: f64) -> Result<Duration, SimError> {
    let invalid = || SimError::InvalidScenario(format!("tick_hz {} has no usable period", tick_hz));
    if !(tick_hz.is_finite() && tick_hz > 0.0 && tick_hz <= MAX_TICK_HZ) {
        return Err(invalid());
    }
    let period = Duration::try_from_secs_f64(1.0 / tick_hz).map_err(|_| invalid())?;
    if period.is_zero() {
        return Err(invalid());
    }
    Ok(period)
}

pub struct SimulationSetupPlugin;

impl Plugin for SimulationSetupPlugin {
    fn build(&self, app: &mut App) {
        // This plugin's job is to read the config and add resources and schedule sets.
        let config = match app.world().get_resource::<ScenarioConfig>() {
            Some(config) => config.simulation.clone(),
            None => {
                warn!("No ScenarioConfig resource found, using default simulation settings.");
                default()
            }
        };
        // The command line wins over the scenario file.
        let max_frames = app
            .world()
            .get_resource::<Cli>()
            .and_then(|cli| cli.max_frames)
            .or(config.max_frames);

        // --- 1. Add the Deterministic PRNG Resource ---
        app.insert_resource(SimulationRng::from_seed(config.seed));

        // --- 2. Fixed control rate ---
        // A bad rate fails the run at scene build instead of panicking here.
        let (timestep, outcome) = match fixed_timestep(config.tick_hz) {
            Ok(timestep) => (timestep, RunOutcome::Pending),
            Err(e) => (
                Duration::from_secs_f64(1.0 / SimulationSection::default().tick_hz),
                RunOutcome::Failed(e.to_string()),
            ),
        };
        app.insert_resource(Time::<Fixed>::from_duration(timestep));

        // --- INITIALIZE STATE & RESOURCES ---
        app.init_state::<AppState>()
            .insert_resource(outcome)
            .init_resource::<TickCounter>()
            .insert_resource(TickBudget(max_frames));

        // --- CONFIGURE THE SPAWNING PIPELINE ---
        app.configure_sets(
            OnEnter(AppState::SceneBuilding),
            (
                SceneBuildSet::SpawnAgents,
                SceneBuildSet::PlanAssignment,
                SceneBuildSet::Finalize,
            )
                .chain(),
        );
        app.add_systems(
            OnEnter(AppState::SceneBuilding),
            transition_to_running.in_set(SceneBuildSet::Finalize),
        );

        // Configure the runtime schedule graph.
        app.configure_sets(
            FixedUpdate,
            (
                SimulationSet::Control,
                SimulationSet::StateSync,
                SimulationSet::Validation,
            )
                .chain()
                .run_if(in_state(AppState::Running)),
        );
    }
}

/// Runs once at the end of the `OnEnter(SceneBuilding)` chain.
/// A scene that failed to build skips straight to `Finished`.
fn transition_to_running(outcome: Res<RunOutcome>, mut next_state: ResMut<NextState<AppState>>) {
    if let RunOutcome::Failed(reason) = outcome.as_ref() {
        error!("Scene building failed: {}", reason);
        next_state.set(AppState::Finished);
        return;
    }
    info!("Scene building complete. Transitioning to Running state.");
    next_state.set(AppState::Running);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::state::app::StatesPlugin;

    #[test]
    fn timestep_follows_the_tick_rate() {
        assert_eq!(fixed_timestep(50.0).unwrap(), Duration::from_millis(20));
        assert!(fixed_timestep(MAX_TICK_HZ).is_ok());
    }

    #[test]
    fn unusable_tick_rates_are_rejected() {
        for tick_hz in [0.0, -5.0, 1e10, f64::INFINITY, f64::NAN] {
            assert!(
                matches!(fixed_timestep(tick_hz), Err(SimError::InvalidScenario(_))),
                "tick_hz {} was accepted",
                tick_hz
            );
        }
    }

    #[test]
    fn unvalidated_tick_rate_fails_the_run_without_panicking() {
        let mut config = ScenarioConfig::default();
        config.simulation.tick_hz = 1e10;

        let mut app = App::new();
        app.add_plugins(StatesPlugin)
            .insert_resource(config)
            .add_plugins(SimulationSetupPlugin);
        app.update();
        app.update();

        assert!(app.world().resource::<RunOutcome>().is_failed());
        assert_eq!(
            app.world().resource::<State<AppState>>().get(),
            &AppState::Finished
        );
    }
}
