//! Point, vector and color types

use nalgebra::{Point3, Vector3};

/// A 3D point with double precision coordinates
pub type Point3d = Point3<f64>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// An RGB color with channels in [0, 1]
///
/// Stored as a vector so that colors can be summed and averaged directly.
pub type Rgb = Vector3<f64>;

/// Arithmetic mean of a slice of points, or `None` when empty
pub fn mean_point(points: &[Point3d]) -> Option<Point3d> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vector3d::zeros(), |acc, p| acc + p.coords);
    Some(Point3d::from(sum / points.len() as f64))
}

/// Arithmetic mean of a slice of colors, or `None` when empty
pub fn mean_color(colors: &[Rgb]) -> Option<Rgb> {
    if colors.is_empty() {
        return None;
    }
    let sum = colors.iter().fold(Rgb::zeros(), |acc, c| acc + c);
    Some(sum / colors.len() as f64)
}
