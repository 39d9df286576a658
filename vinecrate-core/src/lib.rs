//! Core data structures for vinecrate
//!
//! This crate provides the fundamental types shared by the branch analysis
//! algorithms: double precision points and colors, point sets with optional
//! colors, axes, cut planes and the error taxonomy.

pub mod point;
pub mod point_set;
pub mod geometry;
pub mod error;

pub use point::*;
pub use point_set::*;
pub use geometry::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix3};
