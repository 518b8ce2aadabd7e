// formation_sim/src/simulation/core/components.rs

use std::collections::VecDeque;

use bevy::prelude::*;
use formation_core::prelude::{FormationController, FormationPoses};

/// The formation controller, held on a single formation entity.
/// Boxed so a scenario can pick either control law at runtime.
#[derive(Component, Debug)]
pub struct FormationControllerModel(pub Box<dyn FormationController>);

/// Which row of the formation matrix this agent entity mirrors.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentIndex(pub usize);

/// Goals still to be commanded, in order, plus progress counters.
#[derive(Component, Debug, Clone, Default)]
pub struct WaypointQueue {
    pub pending: VecDeque<FormationPoses>,
    pub completed: usize,
    pub total: usize,
}

impl WaypointQueue {
    pub fn new(goals: impl IntoIterator<Item = FormationPoses>) -> Self {
        let pending: VecDeque<_> = goals.into_iter().collect();
        let total = pending.len();
        Self {
            pending,
            completed: 0,
            total,
        }
    }

    /// Marks the current goal as reached and hands out the next one.
    pub fn complete_current(&mut self) -> Option<FormationPoses> {
        self.completed += 1;
        self.pending.pop_front()
    }
}
