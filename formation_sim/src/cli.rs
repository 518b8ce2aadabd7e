// formation_sim/src/cli.rs

use bevy::prelude::Resource;
use clap::Parser;
use std::path::PathBuf;

/// Formation: a headless four-agent rectangular formation simulator.
///
/// This struct defines the command-line arguments that can be passed to any
/// binary application that uses the formation simulation library.
#[derive(Parser, Debug, Resource, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(short, long, default_value = "assets/scenarios/rectangle_tour.toml")]
    pub scenario: PathBuf,

    /// Stop with a failure after this many control ticks. Overrides the scenario value.
    #[arg(long)]
    pub max_frames: Option<u64>,

    /// Write a TOML run report to this path when the simulation finishes.
    #[arg(short, long)]
    pub report: Option<PathBuf>,
}
