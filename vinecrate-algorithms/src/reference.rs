//! Reference directions derived from a trunk skeleton
//!
//! The inclination of a cane is measured against the trunk or cordon it
//! grows from. On a curved cordon the global trunk axis is a poor
//! reference, so the direction of the trunk polyline edge nearest to the
//! branch's anchor can be used instead.

use crate::segmentation::Skeleton;
use serde::{Deserialize, Serialize};
use vinecrate_core::{Error, Point3d, Result, Vector3d};

/// How a branch's reference direction is taken from the trunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReferenceMode {
    /// Principal axis of the whole trunk
    #[default]
    TrunkAxis,
    /// Direction of the trunk polyline edge closest to the branch anchor
    LocalTrunkSegment,
}

/// Closest point to `p` on the segment `[a, b]`, and its distance to `p`
pub fn closest_point_on_segment(p: &Point3d, a: &Point3d, b: &Point3d) -> (Point3d, f64) {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    let t = if len_sq <= f64::EPSILON {
        0.0
    } else {
        ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0)
    };
    let closest = a + ab * t;
    (closest, (p - closest).norm())
}

/// Distance from `p` to the polyline through `vertices`
pub fn distance_to_polyline(p: &Point3d, vertices: &[Point3d]) -> f64 {
    match vertices {
        [] => f64::INFINITY,
        [only] => (p - only).norm(),
        _ => vertices
            .windows(2)
            .map(|w| closest_point_on_segment(p, &w[0], &w[1]).1)
            .fold(f64::INFINITY, f64::min),
    }
}

/// Index of the trunk edge (see [`Skeleton::edges`]) closest to `query`
pub fn nearest_edge(trunk: &Skeleton, query: &Point3d) -> usize {
    let centroids = trunk.centroids();
    centroids
        .windows(2)
        .map(|w| closest_point_on_segment(query, &w[0], &w[1]).1)
        .enumerate()
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Unit direction of the trunk near `query`
///
/// Falls back to the trunk's principal direction when the nearest edge
/// has no length.
pub fn local_trunk_direction(trunk: &Skeleton, query: &Point3d) -> Vector3d {
    let centroids = trunk.centroids();
    let edge = nearest_edge(trunk, query);
    match (centroids.get(edge), centroids.get(edge + 1)) {
        (Some(a), Some(b)) => (b - a)
            .try_normalize(f64::EPSILON)
            .unwrap_or_else(|| trunk.principal_direction()),
        _ => trunk.principal_direction(),
    }
}

/// End of the branch skeleton nearest to the trunk polyline
///
/// # Errors
/// [`Error::InsufficientSegments`] when the branch skeleton has no segments.
pub fn branch_anchor(branch: &Skeleton, trunk: &Skeleton) -> Result<Point3d> {
    let centroids = branch.centroids();
    let (first, last) = match (centroids.first(), centroids.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(Error::InsufficientSegments { found: 0 }),
    };

    let trunk_vertices = trunk.centroids();
    if distance_to_polyline(&last, &trunk_vertices) < distance_to_polyline(&first, &trunk_vertices) {
        Ok(last)
    } else {
        Ok(first)
    }
}

/// Reference direction for `branch` according to `mode`
///
/// # Errors
/// [`Error::InsufficientSegments`] when `mode` needs the trunk polyline and
/// either skeleton has fewer than two segments.
pub fn reference_direction(
    mode: ReferenceMode,
    branch: &Skeleton,
    trunk: &Skeleton,
) -> Result<Vector3d> {
    match mode {
        ReferenceMode::TrunkAxis => Ok(trunk.principal_direction()),
        ReferenceMode::LocalTrunkSegment => {
            for skeleton in [branch, trunk] {
                if skeleton.len() < 2 {
                    return Err(Error::InsufficientSegments {
                        found: skeleton.len(),
                    });
                }
            }
            Ok(local_trunk_direction(trunk, &branch_anchor(branch, trunk)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::segment;
    use approx::assert_relative_eq;
    use vinecrate_core::{Axis, PointSet};

    /// An L-shaped cordon: up the z axis to z = 5, then along x
    fn bent_trunk() -> Skeleton {
        let mut points = Vec::new();
        for i in 0..=50 {
            points.push(Point3d::new(0.0, 0.0, i as f64 * 0.1));
        }
        for i in 1..=50 {
            points.push(Point3d::new(i as f64 * 0.1, 0.0, 5.0));
        }
        let set = PointSet::from_points(points);
        let axis = Axis::new(Point3d::new(2.5, 0.0, 2.5), Vector3d::new(1.0, 0.0, 1.0)).unwrap();
        segment(&set, &axis, 10).unwrap()
    }

    fn straight_branch(from: Point3d, direction: Vector3d) -> Skeleton {
        let set: PointSet = (0..20).map(|i| from + direction * (i as f64 * 0.1)).collect();
        let axis = Axis::new(from, direction).unwrap();
        segment(&set, &axis, 4).unwrap()
    }

    #[test]
    fn test_closest_point_on_segment() {
        let a = Point3d::origin();
        let b = Point3d::new(2.0, 0.0, 0.0);

        let (closest, distance) = closest_point_on_segment(&Point3d::new(1.0, 1.0, 0.0), &a, &b);
        assert_relative_eq!(closest, Point3d::new(1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(distance, 1.0, epsilon = 1e-12);

        let (closest, _) = closest_point_on_segment(&Point3d::new(-3.0, 0.0, 0.0), &a, &b);
        assert_eq!(closest, a);

        let (closest, distance) = closest_point_on_segment(&Point3d::new(0.0, 3.0, 4.0), &a, &a);
        assert_eq!(closest, a);
        assert_relative_eq!(distance, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_local_direction_follows_bend() {
        let trunk = bent_trunk();

        let low = local_trunk_direction(&trunk, &Point3d::new(0.3, 0.0, 1.0));
        assert_relative_eq!(low.z.abs(), 1.0, epsilon = 1e-9);

        let far_arm = local_trunk_direction(&trunk, &Point3d::new(9.0, 0.0, 5.2));
        assert_relative_eq!(far_arm.x.abs(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_branch_anchor_is_end_nearest_trunk() {
        let trunk = bent_trunk();
        let branch = straight_branch(Point3d::new(8.0, 0.0, 5.1), Vector3d::z());

        let anchor = branch_anchor(&branch, &trunk).unwrap();
        assert!(anchor.z < 5.5, "anchor {:?} should be the lower end", anchor);
    }

    #[test]
    fn test_reference_modes() {
        let trunk = bent_trunk();
        let branch = straight_branch(Point3d::new(8.0, 0.0, 5.1), Vector3d::z());

        let global = reference_direction(ReferenceMode::TrunkAxis, &branch, &trunk).unwrap();
        assert_relative_eq!(global, trunk.principal_direction());

        let local = reference_direction(ReferenceMode::LocalTrunkSegment, &branch, &trunk).unwrap();
        assert_relative_eq!(local.x.abs(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_skeleton_is_rejected() {
        let trunk = bent_trunk();
        let empty = Skeleton::empty(*trunk.axis());

        assert!(matches!(
            branch_anchor(&empty, &trunk),
            Err(Error::InsufficientSegments { found: 0 })
        ));
        assert!(matches!(
            reference_direction(ReferenceMode::LocalTrunkSegment, &empty, &trunk),
            Err(Error::InsufficientSegments { found: 0 })
        ));

        let branch = straight_branch(Point3d::new(8.0, 0.0, 5.1), Vector3d::z());
        assert!(matches!(
            reference_direction(ReferenceMode::LocalTrunkSegment, &branch, &empty),
            Err(Error::InsufficientSegments { found: 0 })
        ));
        assert!(reference_direction(ReferenceMode::TrunkAxis, &empty, &trunk).is_ok());
    }
}
