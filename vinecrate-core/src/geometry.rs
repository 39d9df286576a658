//! Axis and plane primitives

use crate::error::{Error, Result};
use crate::point::*;
use serde::{Deserialize, Serialize};

/// Tolerance used when checking that a direction has unit length
pub const UNIT_TOLERANCE: f64 = 1e-9;

/// A line through `origin` along a unit-length `direction`
///
/// The sign of `direction` carries no meaning when it comes from an eigen
/// decomposition: `direction` and `-direction` describe the same axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    origin: Point3d,
    direction: Vector3d,
}

impl Axis {
    /// Create an axis, normalizing `direction`
    pub fn new(origin: Point3d, direction: Vector3d) -> Result<Self> {
        let norm = direction.norm();
        if !norm.is_finite() || norm <= f64::EPSILON {
            return Err(Error::DegenerateInput(
                "axis direction must be a finite non-zero vector".to_string(),
            ));
        }
        Ok(Self {
            origin,
            direction: direction / norm,
        })
    }

    /// Reference origin of the axis (the centroid for estimated axes)
    pub fn origin(&self) -> Point3d {
        self.origin
    }

    /// Unit direction of the axis
    pub fn direction(&self) -> Vector3d {
        self.direction
    }

    /// Scalar coordinate of `point` along the axis, relative to the origin
    pub fn project(&self, point: &Point3d) -> f64 {
        (point - self.origin).dot(&self.direction)
    }

    /// Point on the axis at scalar coordinate `t`
    pub fn point_at(&self, t: f64) -> Point3d {
        self.origin + self.direction * t
    }

    /// Projections of all `points`, in order
    pub fn project_all(&self, points: &[Point3d]) -> Vec<f64> {
        points.iter().map(|p| self.project(p)).collect()
    }
}

/// Smallest and largest of a set of projections, `None` when empty
pub fn projection_span(projections: &[f64]) -> Option<(f64, f64)> {
    if projections.is_empty() {
        return None;
    }
    Some(
        projections
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &t| {
                (min.min(t), max.max(t))
            }),
    )
}

/// A plane given by a point on it and its unit normal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutPlane {
    /// A point on the plane
    pub point: Point3d,
    /// Unit normal of the plane
    pub normal: Vector3d,
}

impl CutPlane {
    /// Signed distance from `point` to the plane, positive on the normal side
    pub fn signed_distance(&self, point: &Point3d) -> f64 {
        (point - self.point).dot(&self.normal)
    }

    /// Unsigned distance from `point` to the plane
    pub fn distance_to_point(&self, point: &Point3d) -> f64 {
        self.signed_distance(point).abs()
    }
}
