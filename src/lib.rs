//! # VineCrate
//!
//! Skeletonization and agronomic feature extraction for vineyard branches
//! scanned as annotated 3D point clouds.
//!
//! This is the umbrella crate that re-exports the core data structures and
//! the branch analysis algorithms in one place.
//!
//! ## Quick Start
//!
//! ```rust
//! use vinecrate::prelude::*;
//!
//! fn main() -> vinecrate::Result<()> {
//!     // A slightly wavy cane along x
//!     let points: PointSet = (0..40)
//!         .map(|i| Point3d::new(i as f64 * 0.05, 0.01 * (i as f64).sin(), 0.0))
//!         .collect();
//!
//!     let skeleton = skeletonize(&points, &AxisConfig::default(), &SegmentationConfig::default())?;
//!     let features = compute_features(&skeleton, &Vector3d::z())?;
//!     println!("length {:.3}, inclination {:.1}°", features.branch_length, features.inclination_angle);
//!
//!     let cut = propose_cut(&points, 0.3)?;
//!     println!("kept {} points, removed {}", cut.kept.len(), cut.removed.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: Enables algorithms
//! - `algorithms`: Axis estimation, segmentation, features, pruning and batch analysis

// Re-export core functionality
pub use vinecrate_core::*;

// Re-export sub-crates
#[cfg(feature = "algorithms")]
pub use vinecrate_algorithms as algorithms;

/// Convenient imports for common use cases
pub mod prelude {
    pub use vinecrate_core::*;

    #[cfg(feature = "algorithms")]
    pub use vinecrate_algorithms::*;
}
