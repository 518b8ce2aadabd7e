// formation_core/src/types.rs

use nalgebra::{Matrix4x3, Point2, RowVector3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{FormationError, Result};

// --- Core Constants ---
/// The formation controllers always drive exactly this many agents.
pub const AGENT_COUNT: usize = 4;

// --- Core Type Aliases ---
/// One row per agent, columns `(x, y, theta)`.
/// The same shape is used for poses, velocities, goals and error snapshots.
pub type FormationPoses = Matrix4x3<f64>;

/// A planar agent pose. `theta` is in radians and is never wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "bevy", derive(bevy_ecs::prelude::Component))]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub theta: f64,
}

impl Pose {
    pub const fn new(x: f64, y: f64, theta: f64) -> Self {
        Self { x, y, theta }
    }

    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.theta)
    }

    pub fn to_row(&self) -> RowVector3<f64> {
        RowVector3::new(self.x, self.y, self.theta)
    }

    pub fn from_row(row: &RowVector3<f64>) -> Self {
        Self::new(row[0], row[1], row[2])
    }
}

impl From<Vector3<f64>> for Pose {
    fn from(v: Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// Packs exactly four poses into the matrix form used by the controllers.
pub fn formation_from_poses(poses: &[Pose]) -> Result<FormationPoses> {
    if poses.len() != AGENT_COUNT {
        return Err(FormationError::DimensionMismatch {
            context: "formation poses",
            expected: AGENT_COUNT,
            actual: poses.len(),
        });
    }
    let mut m = FormationPoses::zeros();
    for (i, pose) in poses.iter().enumerate() {
        m.set_row(i, &pose.to_row());
    }
    Ok(m)
}

/// Like [`formation_from_poses`], but for loosely typed rows (e.g. parsed arrays).
/// Every row must hold exactly `(x, y, theta)`.
pub fn formation_from_rows(rows: &[Vec<f64>]) -> Result<FormationPoses> {
    if rows.len() != AGENT_COUNT {
        return Err(FormationError::DimensionMismatch {
            context: "formation rows",
            expected: AGENT_COUNT,
            actual: rows.len(),
        });
    }
    let mut m = FormationPoses::zeros();
    for (i, row) in rows.iter().enumerate() {
        if row.len() != 3 {
            return Err(FormationError::DimensionMismatch {
                context: "pose components",
                expected: 3,
                actual: row.len(),
            });
        }
        m.set_row(i, &RowVector3::new(row[0], row[1], row[2]));
    }
    Ok(m)
}

/// Unpacks the controller matrix back into per-agent poses.
pub fn poses_from_formation(m: &FormationPoses) -> [Pose; AGENT_COUNT] {
    std::array::from_fn(|i| Pose::from_row(&m.row(i).into_owned()))
}

/// Arithmetic mean of the agent positions. Headings are ignored.
pub fn centroid(m: &FormationPoses) -> Point2<f64> {
    let n = m.nrows() as f64;
    Point2::new(m.column(0).sum() / n, m.column(1).sum() / n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn formation_from_poses_requires_four_agents() {
        let three = [Pose::default(); 3];
        let err = formation_from_poses(&three).unwrap_err();
        assert_eq!(
            err,
            FormationError::DimensionMismatch {
                context: "formation poses",
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn formation_from_rows_rejects_short_pose() {
        let rows = vec![
            vec![0.0, 0.0, 0.0],
            vec![1.0, 0.0, 0.0],
            vec![1.0, 1.0],
            vec![0.0, 1.0, 0.0],
        ];
        assert!(matches!(
            formation_from_rows(&rows),
            Err(FormationError::DimensionMismatch { expected: 3, actual: 2, .. })
        ));
    }

    #[test]
    fn poses_survive_matrix_packing() {
        let poses = [
            Pose::new(0.0, 0.0, 0.0),
            Pose::new(0.0, 1.0, 1.5),
            Pose::new(1.0, 1.0, 3.1),
            Pose::new(1.0, 0.0, -1.5),
        ];
        let m = formation_from_poses(&poses).unwrap();
        assert_eq!(m[(2, 2)], 3.1);
        assert_eq!(poses_from_formation(&m), poses);
    }

    #[test]
    fn centroid_is_mean_position() {
        let m = formation_from_rows(&[
            vec![0.0, 0.0, 9.0],
            vec![2.0, 0.0, 9.0],
            vec![2.0, 4.0, 9.0],
            vec![0.0, 4.0, 9.0],
        ])
        .unwrap();
        let c = centroid(&m);
        assert_abs_diff_eq!(c.x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c.y, 2.0, epsilon = 1e-12);
    }
}
