// formation_core/src/geometry/polygon.rs

use nalgebra::Point2;
use std::f64::consts::TAU;

use crate::error::{FormationError, Result};

/// A regular polygon whose vertices serve as target positions for agents.
///
/// Vertex `k` sits at angle `theta + k * 2π / agent_count` from `center`,
/// at distance `radius`.
#[derive(Debug, Clone, PartialEq)]
pub struct RegularPolygon {
    pub center: Point2<f64>,
    pub theta: f64,
    pub agent_count: usize,
    pub radius: f64,
}

impl RegularPolygon {
    pub fn new(center: Point2<f64>, theta: f64, agent_count: usize, radius: f64) -> Result<Self> {
        if agent_count == 0 {
            return Err(FormationError::DegenerateGeometry(
                "a polygon needs at least one vertex".to_string(),
            ));
        }
        if !radius.is_finite() {
            return Err(FormationError::DegenerateGeometry(format!(
                "polygon radius must be finite, got {}",
                radius
            )));
        }
        Ok(Self {
            center,
            theta,
            agent_count,
            radius,
        })
    }

    /// The vertex ring, closed: `agent_count + 1` points with the last equal to the first.
    pub fn vertices(&self) -> Vec<Point2<f64>> {
        let step = TAU / self.agent_count as f64;
        let mut vertices: Vec<Point2<f64>> = (0..self.agent_count)
            .map(|k| {
                let angle = self.theta + k as f64 * step;
                Point2::new(
                    self.center.x + self.radius * angle.cos(),
                    self.center.y + self.radius * angle.sin(),
                )
            })
            .collect();
        vertices.push(vertices[0]);
        vertices
    }

    /// Only the `agent_count` distinct vertices, in order.
    pub fn targets(&self) -> Vec<Point2<f64>> {
        let mut vertices = self.vertices();
        vertices.truncate(self.agent_count);
        vertices
    }
}

/// Builds the closed vertex list of a regular polygon.
pub fn construct_polygon(
    center: Point2<f64>,
    theta: f64,
    agent_count: usize,
    side_length: f64,
) -> Result<Vec<Point2<f64>>> {
    Ok(RegularPolygon::new(center, theta, agent_count, side_length)?.vertices())
}
