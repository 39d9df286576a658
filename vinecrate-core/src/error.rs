//! Error types for vinecrate

use thiserror::Error;

/// Main error type for vinecrate operations
///
/// Every core operation returns either a fully populated result or one of
/// these variants. Nothing is downgraded to a default value internally.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Too few points, or points without any spread, to build a covariance
    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    /// The two largest eigenvalues are too close to pick a unique principal direction
    #[error("Ambiguous axis: largest eigenvalues {largest} and {second} are within tolerance {tolerance}")]
    AmbiguousAxis {
        largest: f64,
        second: f64,
        tolerance: f64,
    },

    /// Segmentation produced fewer than two non-empty bins
    #[error("Insufficient segments: {found} non-empty segment(s), at least 2 are needed for a polyline")]
    InsufficientSegments { found: usize },

    /// Bad parameter or inconsistent input arrays
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type alias for vinecrate operations
pub type Result<T> = std::result::Result<T, Error>;
