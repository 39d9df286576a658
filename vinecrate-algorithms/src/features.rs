//! Agronomic branch features
//!
//! Computes, from a [`Skeleton`] and a reference (trunk) direction:
//! - a diameter per segment, from the smallest local covariance eigenvalue
//! - the branch length along the centroid polyline
//! - the inclination of the branch axis to the reference, in [0°, 90°]
//! - a mean color per segment, or an explicit absent marker

use crate::pca::principal_components;
use crate::segmentation::Skeleton;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use vinecrate_core::{Error, Point3d, Result, Rgb, Vector3d};

/// Configuration for feature extraction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Segments with fewer points than this get a diameter of zero
    pub min_diameter_points: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            min_diameter_points: 3,
        }
    }
}

impl FeatureConfig {
    /// A local covariance needs at least two points
    pub fn validate(&self) -> Result<()> {
        if self.min_diameter_points < 2 {
            return Err(Error::InvalidConfiguration(format!(
                "min_diameter_points must be at least 2, got {}",
                self.min_diameter_points
            )));
        }
        Ok(())
    }
}

/// Features of one branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchFeatures {
    /// Estimated diameter of each segment, in skeleton order
    pub diameters: Vec<f64>,
    /// Length of the centroid polyline
    pub branch_length: f64,
    /// Angle between branch axis and reference direction, in degrees
    pub inclination_angle: f64,
    /// Mean color of each segment, `None` when no colors were supplied
    pub mean_colors: Vec<Option<Rgb>>,
    /// Segment centroids, in skeleton order
    pub centers: Vec<Point3d>,
}

/// One segment's features, flattened for tabular export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub segment_index: usize,
    pub diameter: f64,
    pub center: Point3d,
    pub mean_color: Option<Rgb>,
}

impl BranchFeatures {
    /// Number of segments described
    pub fn segment_count(&self) -> usize {
        self.diameters.len()
    }

    /// Per-segment rows
    pub fn rows(&self) -> Vec<FeatureRow> {
        self.diameters
            .iter()
            .zip(&self.centers)
            .zip(&self.mean_colors)
            .enumerate()
            .map(|(segment_index, ((&diameter, &center), &mean_color))| FeatureRow {
                segment_index,
                diameter,
                center,
                mean_color,
            })
            .collect()
    }
}

/// Cross-section diameter proxy of a point subset: `2 * sqrt(λ_min)`
///
/// Subsets with fewer than `min_points` points (and never fewer than two)
/// get a diameter of zero.
pub fn segment_diameter(points: &[Point3d], min_points: usize) -> Result<f64> {
    if points.len() < min_points.max(2) {
        return Ok(0.0);
    }
    let pcs = principal_components(points)?;
    Ok(2.0 * pcs.min_variance().sqrt())
}

/// Sum of distances between consecutive polyline vertices
pub fn polyline_length(vertices: &[Point3d]) -> f64 {
    vertices
        .iter()
        .tuple_windows()
        .map(|(a, b)| (b - a).norm())
        .sum()
}

/// Angle in degrees between two undirected axes, in [0°, 90°]
///
/// Equivalent to `acos(|â · b̂|)`. Evaluated as `atan2(|a × b|, |a · b|)`
/// which stays accurate for nearly parallel vectors. The absolute dot
/// product makes the result independent of either vector's sign.
///
/// # Errors
/// [`Error::DegenerateInput`] when either vector is zero or not finite.
pub fn inclination_angle(direction: &Vector3d, reference: &Vector3d) -> Result<f64> {
    let a = unit(direction, "branch direction")?;
    let b = unit(reference, "reference direction")?;

    let angle = a.cross(&b).norm().atan2(a.dot(&b).abs());
    Ok(angle.to_degrees().clamp(0.0, 90.0))
}

fn unit(v: &Vector3d, what: &str) -> Result<Vector3d> {
    let norm = v.norm();
    if !norm.is_finite() || norm <= f64::EPSILON {
        return Err(Error::DegenerateInput(format!(
            "{} must be a finite non-zero vector",
            what
        )));
    }
    Ok(v / norm)
}

/// Compute branch features with the default configuration
pub fn compute_features(skeleton: &Skeleton, reference_direction: &Vector3d) -> Result<BranchFeatures> {
    compute_features_with(skeleton, reference_direction, &FeatureConfig::default())
}

/// Compute branch features of `skeleton` against `reference_direction`
///
/// # Errors
/// * [`Error::InsufficientSegments`] when the skeleton has fewer than two segments
/// * [`Error::DegenerateInput`] when the reference direction is zero
pub fn compute_features_with(
    skeleton: &Skeleton,
    reference_direction: &Vector3d,
    config: &FeatureConfig,
) -> Result<BranchFeatures> {
    config.validate()?;
    if skeleton.len() < 2 {
        return Err(Error::InsufficientSegments {
            found: skeleton.len(),
        });
    }

    let segments = skeleton.segments();
    let diameters = segments
        .iter()
        .map(|s| segment_diameter(s.points.points(), config.min_diameter_points))
        .collect::<Result<Vec<_>>>()?;
    let centers = skeleton.centroids();
    let mean_colors = segments.iter().map(|s| s.mean_color).collect();

    Ok(BranchFeatures {
        diameters,
        branch_length: polyline_length(&centers),
        inclination_angle: inclination_angle(&skeleton.principal_direction(), reference_direction)?,
        mean_colors,
        centers,
    })
}
