// formation_sim/src/simulation/plugins/mod.rs

pub mod assignment;
pub mod debugging;
pub mod formation;
pub mod reporting;
