// formation_core/src/lib.rs

// This file defines the public modules of the library.
pub mod assignment;
pub mod config;
pub mod control;
pub mod error;
pub mod geometry;
pub mod prelude;
pub mod types;
