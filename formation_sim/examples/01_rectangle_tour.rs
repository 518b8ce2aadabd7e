// formation_sim/examples/01_rectangle_tour.rs

//! A headless end-to-end run of the formation simulator.
//!
//! This example demonstrates how to:
//! 1. Parse the command line and load a scenario TOML (with `FORMATION_*` env overrides).
//! 2. Set up a minimal, windowless Bevy application with logging and states.
//! 3. Add the `FormationSimulationPlugin`, which drives the formation through every waypoint.
//!
//! To run this example:
//! `cargo run --example 01_rectangle_tour -- --scenario assets/scenarios/rectangle_tour.toml --report run.toml`

use std::time::Duration;

use bevy::{app::ScheduleRunnerPlugin, log::LogPlugin, prelude::*, state::app::StatesPlugin};
use clap::Parser;

use formation_sim::cli::Cli;
use formation_sim::simulation::config::load_scenario;
use formation_sim::FormationSimulationPlugin;

fn main() -> AppExit {
    // --- 1. Load Simulation Configuration ---
    let cli = Cli::parse();
    println!("Loading scenario from: {}", cli.scenario.display());

    let config = match load_scenario(&cli.scenario) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return AppExit::error();
        }
    };
    let frame_period = Duration::from_secs_f64(1.0 / config.simulation.tick_hz);

    let mut app = App::new();

    // --- 2. Add Core Bevy Plugins & Resources ---
    app.add_plugins((
        // No window, no renderer: just time, tasks and a loop that ticks at the control rate.
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(frame_period)),
        LogPlugin {
            level: bevy::log::Level::INFO,
            filter: "info,formation_sim=debug,formation_core=debug".to_string(),
            ..default()
        },
        StatesPlugin,
    ))
    // Both must exist before the simulation plugin reads them in `build`.
    .insert_resource(config)
    .insert_resource(cli);

    // --- 3. Add the Main Formation Simulation Plugin ---
    app.add_plugins(FormationSimulationPlugin);

    // --- 4. Run the App ---
    println!("Starting formation simulation...");
    app.run()
}
