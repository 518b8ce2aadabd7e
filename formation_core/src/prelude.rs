// formation_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::control::{FormationController, RunHistory, StepOutcome};
pub use crate::error::FormationError;

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::types::{FormationPoses, Pose, AGENT_COUNT};

// --- Configuration ---
pub use crate::config::{FormationConfig, PidGains, TrackingMode, TrajectoryConfig, WindupGuard};

// --- Algorithms ---
pub use crate::assignment::{assign, total_distance, AssignmentPair};
pub use crate::control::rectangular::RectangularFormationController;
pub use crate::control::trajectory::TrajectoryController;
pub use crate::geometry::polygon::{construct_polygon, RegularPolygon};
pub use crate::geometry::rectangle::Rectangle;
