// formation_core/src/geometry/mod.rs

//! Target shapes: regular polygons for assignment, rectangles for formations.

pub mod polygon;
pub mod rectangle;
