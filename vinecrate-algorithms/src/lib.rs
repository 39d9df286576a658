//! # VineCrate Algorithms
//!
//! Branch analysis algorithms for annotated vineyard point clouds.
//!
//! This crate estimates principal axes, turns a branch's points into an
//! ordered skeleton polyline, extracts agronomic features (diameter profile,
//! length, inclination, color), simulates pruning cuts, and runs all of it
//! over many branches with per-branch failure isolation.

pub mod pca;
pub mod segmentation;
pub mod features;
pub mod reference;
pub mod pruning;
pub mod batch;

// Re-export commonly used items
pub use pca::*;
pub use segmentation::*;
pub use features::*;
pub use reference::*;
pub use pruning::*;
pub use batch::*;
