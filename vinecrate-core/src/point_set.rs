//! Point set data structure and functionality

use crate::error::{Error, Result};
use crate::point::*;
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// An ordered set of 3D points with an optional parallel color array
///
/// The set is immutable once built. When colors are present there is
/// exactly one color per point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSet {
    points: Vec<Point3d>,
    colors: Option<Vec<Rgb>>,
}

impl PointSet {
    /// Create an empty point set
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            colors: None,
        }
    }

    /// Create a point set from points only
    pub fn from_points(points: Vec<Point3d>) -> Self {
        Self {
            points,
            colors: None,
        }
    }

    /// Create a point set with one color per point
    pub fn with_colors(points: Vec<Point3d>, colors: Vec<Rgb>) -> Result<Self> {
        if points.len() != colors.len() {
            return Err(Error::InvalidConfiguration(format!(
                "{} points but {} colors",
                points.len(),
                colors.len()
            )));
        }
        Ok(Self {
            points,
            colors: Some(colors),
        })
    }

    /// Gather the subset addressed by `indices` from global point and color arrays
    ///
    /// This is how a per-object set is built from a loaded scan and the
    /// merged annotation indices of one object. Indices keep their order.
    pub fn from_indices(
        points: &[Point3d],
        colors: Option<&[Rgb]>,
        indices: &[usize],
    ) -> Result<Self> {
        if let Some(colors) = colors {
            if colors.len() != points.len() {
                return Err(Error::InvalidConfiguration(format!(
                    "{} points but {} colors",
                    points.len(),
                    colors.len()
                )));
            }
        }

        if let Some(&bad) = indices.iter().find(|&&i| i >= points.len()) {
            return Err(Error::InvalidConfiguration(format!(
                "index {} out of range for {} points",
                bad,
                points.len()
            )));
        }

        Ok(Self {
            points: indices.iter().map(|&i| points[i]).collect(),
            colors: colors.map(|c| indices.iter().map(|&i| c[i]).collect()),
        })
    }

    /// Build the subset at `indices` of this set, carrying colors along
    ///
    /// Callers pass indices obtained from this set, so they are in range.
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            points: indices.iter().map(|&i| self.points[i]).collect(),
            colors: self
                .colors
                .as_ref()
                .map(|c| indices.iter().map(|&i| c[i]).collect()),
        }
    }

    /// Get the number of points in the set
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The point coordinates
    pub fn points(&self) -> &[Point3d] {
        &self.points
    }

    /// The per-point colors, if the set carries any
    pub fn colors(&self) -> Option<&[Rgb]> {
        self.colors.as_deref()
    }

    /// Whether the set carries colors
    pub fn has_colors(&self) -> bool {
        self.colors.is_some()
    }

    /// Get an iterator over the points
    pub fn iter(&self) -> std::slice::Iter<'_, Point3d> {
        self.points.iter()
    }

    /// Arithmetic mean of the points
    pub fn centroid(&self) -> Option<Point3d> {
        mean_point(&self.points)
    }

    /// Mean color, `None` when the set has no colors or no points
    pub fn mean_color(&self) -> Option<Rgb> {
        self.colors.as_deref().and_then(mean_color)
    }
}

impl Default for PointSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<usize> for PointSet {
    type Output = Point3d;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

impl<'a> IntoIterator for &'a PointSet {
    type Item = &'a Point3d;
    type IntoIter = std::slice::Iter<'a, Point3d>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl FromIterator<Point3d> for PointSet {
    fn from_iter<I: IntoIterator<Item = Point3d>>(iter: I) -> Self {
        Self::from_points(Vec::from_iter(iter))
    }
}
