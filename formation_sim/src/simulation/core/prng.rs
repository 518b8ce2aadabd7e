// formation_sim/src/simulation/core/prng.rs

use bevy::prelude::Resource;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// A newtype wrapper around `ChaCha8Rng` to make it a Bevy Resource.
/// This is the central, deterministic pseudo-random number generator for the simulation.
#[derive(Resource)]
pub struct SimulationRng(pub ChaCha8Rng);

impl SimulationRng {
    /// Seeded when a seed is given, otherwise drawn from OS entropy.
    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self(ChaCha8Rng::seed_from_u64(seed)),
            None => Self(ChaCha8Rng::from_entropy()),
        }
    }
}
