// formation_core/src/geometry/rectangle.rs

use nalgebra::{Point2, Rotation2, RowVector3, Vector2};

use crate::error::{FormationError, Result};
use crate::types::{FormationPoses, AGENT_COUNT};

/// The rigid virtual rectangle the four agents hold.
///
/// Corners are always listed in agent order:
/// `(-L/2, +W/2)`, `(+L/2, +W/2)`, `(+L/2, -W/2)`, `(-L/2, -W/2)`
/// relative to the rectangle's center, before rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub length: f64,
    pub width: f64,
}

impl Rectangle {
    pub fn new(length: f64, width: f64) -> Result<Self> {
        if !(length.is_finite() && length > 0.0 && width.is_finite() && width > 0.0) {
            return Err(FormationError::DegenerateGeometry(format!(
                "rectangle sides must be positive, got {} x {}",
                length, width
            )));
        }
        Ok(Self { length, width })
    }

    /// Corner offsets from the center in agent order, unrotated.
    pub fn corner_offsets(&self) -> [Vector2<f64>; AGENT_COUNT] {
        let hl = self.length / 2.0;
        let hw = self.width / 2.0;
        [
            Vector2::new(-hl, hw),
            Vector2::new(hl, hw),
            Vector2::new(hl, -hw),
            Vector2::new(-hl, -hw),
        ]
    }

    /// Axis-aligned corners around `centroid`.
    pub fn corners_around(&self, centroid: Point2<f64>) -> [Point2<f64>; AGENT_COUNT] {
        self.corner_offsets().map(|offset| centroid + offset)
    }

    /// Corners of the rectangle centered at `center` and rotated by `heading`.
    pub fn corners(&self, center: Point2<f64>, heading: f64) -> [Point2<f64>; AGENT_COUNT] {
        let rot = Rotation2::new(heading);
        self.corner_offsets().map(|offset| center + rot * offset)
    }

    /// Goal poses for commanding the formation: every agent on its corner,
    /// facing the formation heading.
    pub fn goal_poses(&self, center: Point2<f64>, heading: f64) -> FormationPoses {
        let mut goal = FormationPoses::zeros();
        for (i, corner) in self.corners(center, heading).iter().enumerate() {
            goal.set_row(i, &RowVector3::new(corner.x, corner.y, heading));
        }
        goal
    }

    /// Desired poses holding the shape around the live centroid of `poses`.
    /// Each agent keeps its own current heading.
    pub fn desired_poses(&self, poses: &FormationPoses) -> FormationPoses {
        let center = crate::types::centroid(poses);
        let mut desired = *poses;
        for (i, corner) in self.corners_around(center).iter().enumerate() {
            desired[(i, 0)] = corner.x;
            desired[(i, 1)] = corner.y;
        }
        desired
    }
}

/// Shifts a formation goal by `delta`, preserving shape and headings.
pub fn translated(goal: &FormationPoses, delta: Vector2<f64>) -> FormationPoses {
    let mut moved = *goal;
    for mut row in moved.row_iter_mut() {
        row[0] += delta.x;
        row[1] += delta.y;
    }
    moved
}
