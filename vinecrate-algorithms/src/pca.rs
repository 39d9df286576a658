//! Principal axis estimation
//!
//! The principal axis of a point set is the eigenvector of the largest
//! eigenvalue of its covariance matrix, anchored at the centroid. The
//! decomposition uses nalgebra's symmetric eigen solver, which yields real
//! eigenvalues and orthonormal eigenvectors for the 3x3 covariance.

use nalgebra::{Matrix3, SymmetricEigen};
use serde::{Deserialize, Serialize};
use vinecrate_core::{mean_point, Axis, Error, Point3d, Result, Vector3d};

/// Configuration for principal axis estimation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    /// Relative gap `(λ1 - λ2) / λ1` below which the two largest eigenvalues
    /// are considered equal and no unique principal direction exists
    pub ambiguity_tolerance: f64,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            ambiguity_tolerance: 0.2,
        }
    }
}

impl AxisConfig {
    /// Check that the tolerance is usable
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.ambiguity_tolerance) {
            return Err(Error::InvalidConfiguration(format!(
                "ambiguity_tolerance must lie in [0, 1), got {}",
                self.ambiguity_tolerance
            )));
        }
        Ok(())
    }
}

/// Sorted eigen decomposition of a point set's covariance
#[derive(Debug, Clone, PartialEq)]
pub struct PrincipalComponents {
    /// Mean of the points
    pub centroid: Point3d,
    /// Eigenvalues in descending order
    pub eigenvalues: [f64; 3],
    /// Unit eigenvectors matching `eigenvalues`
    pub eigenvectors: [Vector3d; 3],
}

impl PrincipalComponents {
    /// Direction of maximum variance
    pub fn major(&self) -> Vector3d {
        self.eigenvectors[0]
    }

    /// Smallest eigenvalue, clamped at zero against round-off
    pub fn min_variance(&self) -> f64 {
        self.eigenvalues[2].max(0.0)
    }
}

/// Unbiased empirical covariance (divides by n - 1) of points around `centroid`
///
/// Returns the zero matrix for fewer than two points.
pub fn covariance_matrix(points: &[Point3d], centroid: &Point3d) -> Matrix3<f64> {
    if points.len() < 2 {
        return Matrix3::zeros();
    }

    let mut covariance = Matrix3::zeros();
    for point in points {
        let diff = point - centroid;
        covariance += diff * diff.transpose();
    }
    covariance / (points.len() - 1) as f64
}

/// Centroid plus covariance eigenvalues and eigenvectors sorted by decreasing eigenvalue
///
/// Needs at least two points. No check is made on the spread, so this also
/// serves local cross-section estimates on nearly flat subsets.
pub fn principal_components(points: &[Point3d]) -> Result<PrincipalComponents> {
    if points.len() < 2 {
        return Err(Error::DegenerateInput(format!(
            "need at least 2 points for a covariance, got {}",
            points.len()
        )));
    }

    let centroid = mean_point(points).ok_or_else(|| {
        Error::DegenerateInput("cannot compute the centroid of an empty point set".to_string())
    })?;
    let eigen = SymmetricEigen::new(covariance_matrix(points, &centroid));

    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    let eigenvalues = order.map(|i| eigen.eigenvalues[i]);
    let eigenvectors = order.map(|i| eigen.eigenvectors.column(i).normalize());

    Ok(PrincipalComponents {
        centroid,
        eigenvalues,
        eigenvectors,
    })
}

/// Estimate the principal axis of `points` with the default configuration
///
/// # Errors
/// * [`Error::DegenerateInput`] for fewer than two points or when all points coincide
/// * [`Error::AmbiguousAxis`] when the spread is (nearly) isotropic in the two leading directions
///
/// The returned direction may come out as either of `±d`; compare directions
/// with the absolute value of their dot product.
pub fn estimate_axis(points: &[Point3d]) -> Result<Axis> {
    estimate_axis_with(points, &AxisConfig::default())
}

/// Estimate the principal axis of `points` using `config`
pub fn estimate_axis_with(points: &[Point3d], config: &AxisConfig) -> Result<Axis> {
    config.validate()?;
    let pcs = principal_components(points)?;

    let [largest, second, _] = pcs.eigenvalues;
    if largest <= variance_floor(points) {
        return Err(Error::DegenerateInput(format!(
            "all {} points coincide, covariance is zero",
            points.len()
        )));
    }

    if (largest - second) <= config.ambiguity_tolerance * largest {
        return Err(Error::AmbiguousAxis {
            largest,
            second,
            tolerance: config.ambiguity_tolerance,
        });
    }

    Axis::new(pcs.centroid, pcs.major())
}

/// Variance below which a point set is treated as a single repeated point
///
/// Repeated coordinates of magnitude `s` average to a centroid that is off
/// by a few ulps of `s`, so the spurious variance is of order `(ε s)²`.
fn variance_floor(points: &[Point3d]) -> f64 {
    let scale = points
        .iter()
        .map(|p| p.coords.amax())
        .fold(1.0_f64, f64::max);
    let resolution = 16.0 * f64::EPSILON * scale;
    resolution * resolution
}
