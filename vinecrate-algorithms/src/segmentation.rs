//! Branch skeletonization by projection binning
//!
//! Points are projected onto an axis and binned into `k` equal-width
//! intervals between the smallest and largest projection. Every bin is
//! closed on its lower edge and open on its upper edge, except the last
//! bin which is closed on both ends so the point at the maximum projection
//! always lands in it. Each non-empty bin becomes a [`Segment`], and the
//! ordered segment centroids form the branch [`Skeleton`].

use crate::pca::{estimate_axis_with, AxisConfig};
use log::debug;
use serde::{Deserialize, Serialize};
use vinecrate_core::{projection_span, Axis, Error, Point3d, PointSet, Result, Rgb, Vector3d};

/// Configuration for skeleton segmentation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentationConfig {
    /// Target number of equal-width projection bins
    pub segments: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        // five polyline edges need six centroids
        Self { segments: 6 }
    }
}

impl SegmentationConfig {
    /// Check that the segment count is usable
    pub fn validate(&self) -> Result<()> {
        if self.segments < 1 {
            return Err(Error::InvalidConfiguration(
                "segment count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// A contiguous-in-projection slice of a branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Points (and colors, when supplied) falling in this bin
    pub points: PointSet,
    /// Positions of those points in the segmented input set
    pub indices: Vec<usize>,
    /// Mean of the segment's points
    pub centroid: Point3d,
    /// Mean color of the segment, absent when the input had no colors
    pub mean_color: Option<Rgb>,
    /// Bin interval `[lower, upper]` in projection coordinates
    pub projection_range: (f64, f64),
}

impl Segment {
    /// Number of points in the segment
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Segments produced by the segmenter are never empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Ordered polyline approximation of a branch
///
/// Holds at least two segments, ordered by increasing projection along
/// the axis they were cut from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    axis: Axis,
    segments: Vec<Segment>,
    projection_span: (f64, f64),
}

impl Skeleton {
    /// The axis the branch was segmented along
    pub fn axis(&self) -> &Axis {
        &self.axis
    }

    /// Unit direction of the segmentation axis (sign is arbitrary)
    pub fn principal_direction(&self) -> Vector3d {
        self.axis.direction()
    }

    /// Segments in increasing projection order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments (polyline vertices)
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// A valid skeleton always has segments
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Polyline vertices in order
    pub fn centroids(&self) -> Vec<Point3d> {
        self.segments.iter().map(|s| s.centroid).collect()
    }

    /// Index pairs `[i, i + 1]` connecting consecutive centroids
    pub fn edges(&self) -> Vec<[usize; 2]> {
        (1..self.segments.len()).map(|i| [i - 1, i]).collect()
    }

    /// Smallest and largest projection of the segmented points
    pub fn projection_span(&self) -> (f64, f64) {
        self.projection_span
    }

    /// Endpoints of the principal axis over the extent of the branch
    pub fn axis_line(&self) -> (Point3d, Point3d) {
        let (min, max) = self.projection_span;
        (self.axis.point_at(min), self.axis.point_at(max))
    }
}

#[cfg(test)]
impl Skeleton {
    /// A skeleton with no segments, which the segmenter never produces
    pub(crate) fn empty(axis: Axis) -> Self {
        Self {
            axis,
            segments: Vec::new(),
            projection_span: (0.0, 0.0),
        }
    }
}

/// Bin index of projection `value` among `k` equal-width bins starting at `min`
///
/// Matches the edges `min + i * width` exactly, so a value sitting on an
/// inner edge goes to the upper bin and the maximum goes to the last bin.
fn bin_index(value: f64, min: f64, width: f64, k: usize) -> usize {
    let edge = |i: usize| min + i as f64 * width;

    let mut index = (((value - min) / width).floor().max(0.0) as usize).min(k - 1);
    while index + 1 < k && value >= edge(index + 1) {
        index += 1;
    }
    while index > 0 && value < edge(index) {
        index -= 1;
    }
    index
}

/// Split `points` into at most `k` segments along `axis`
///
/// Empty bins are skipped, so the skeleton may have fewer than `k`
/// segments.
///
/// # Errors
/// * [`Error::InvalidConfiguration`] when `k < 1`
/// * [`Error::InsufficientSegments`] when fewer than two bins hold points
pub fn segment(points: &PointSet, axis: &Axis, k: usize) -> Result<Skeleton> {
    SegmentationConfig { segments: k }.validate()?;

    let projections = axis.project_all(points.points());
    let (min, max) =
        projection_span(&projections).ok_or(Error::InsufficientSegments { found: 0 })?;
    let width = (max - min) / k as f64;

    if !(width > 0.0) {
        // every point projects to the same value, a single bin at most
        return Err(Error::InsufficientSegments { found: 1 });
    }

    let mut bins: Vec<Vec<usize>> = vec![Vec::new(); k];
    for (i, &value) in projections.iter().enumerate() {
        bins[bin_index(value, min, width, k)].push(i);
    }

    let segments: Vec<Segment> = bins
        .into_iter()
        .enumerate()
        .filter(|(_, indices)| !indices.is_empty())
        .filter_map(|(bin, indices)| {
            let subset = points.subset(&indices);
            let centroid = subset.centroid()?;
            let upper = if bin + 1 == k {
                max
            } else {
                min + (bin + 1) as f64 * width
            };
            Some(Segment {
                mean_color: subset.mean_color(),
                points: subset,
                indices,
                centroid,
                projection_range: (min + bin as f64 * width, upper),
            })
        })
        .collect();

    debug!(
        "segmented {} points into {}/{} non-empty bins over projection [{:.4}, {:.4}]",
        points.len(),
        segments.len(),
        k,
        min,
        max
    );

    if segments.len() < 2 {
        return Err(Error::InsufficientSegments {
            found: segments.len(),
        });
    }

    Ok(Skeleton {
        axis: *axis,
        segments,
        projection_span: (min, max),
    })
}

/// Estimate the principal axis of `points` and segment along it
pub fn skeletonize(
    points: &PointSet,
    axis_config: &AxisConfig,
    config: &SegmentationConfig,
) -> Result<Skeleton> {
    config.validate()?;
    let axis = estimate_axis_with(points.points(), axis_config)?;
    segment(points, &axis, config.segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn x_axis() -> Axis {
        Axis::new(Point3d::origin(), Vector3d::x()).unwrap()
    }

    fn points_on_x(values: &[f64]) -> PointSet {
        values.iter().map(|&x| Point3d::new(x, 0.0, 0.0)).collect()
    }

    #[test]
    fn test_max_projection_lands_in_last_segment() {
        let values: Vec<f64> = (0..=10).map(|i| i as f64).collect();
        let skeleton = segment(&points_on_x(&values), &x_axis(), 5).unwrap();

        assert_eq!(skeleton.len(), 5);
        let last = skeleton.segments().last().unwrap();
        assert!(last.points.iter().any(|p| p.x == 10.0));

        let total: usize = skeleton.segments().iter().map(Segment::len).sum();
        assert_eq!(total, values.len(), "no point may be dropped");
    }

    #[test]
    fn test_inner_edges_are_half_open() {
        // edges at 0, 2, 4, 6, 8, 10
        let values: Vec<f64> = (0..=10).map(|i| i as f64).collect();
        let skeleton = segment(&points_on_x(&values), &x_axis(), 5).unwrap();

        let firsts: Vec<f64> = skeleton
            .segments()
            .iter()
            .map(|s| s.points[0].x)
            .collect();
        assert_eq!(firsts, vec![0.0, 2.0, 4.0, 6.0, 8.0]);
        assert_eq!(skeleton.segments()[4].len(), 3);
    }

    #[test]
    fn test_empty_bins_are_skipped() {
        let skeleton = segment(&points_on_x(&[0.0, 0.5, 9.5, 10.0]), &x_axis(), 5).unwrap();
        assert_eq!(skeleton.len(), 2);
        assert_eq!(skeleton.edges(), vec![[0, 1]]);
    }

    #[test]
    fn test_segments_ordered_by_projection() {
        let skeleton = segment(&points_on_x(&[9.0, 1.0, 5.0, 3.0, 7.0]), &x_axis(), 5).unwrap();
        let xs: Vec<f64> = skeleton.centroids().iter().map(|c| c.x).collect();
        assert_eq!(xs, vec![1.0, 3.0, 5.0, 7.0, 9.0]);
        assert_eq!(skeleton.segments()[0].indices, vec![1]);
    }

    #[test]
    fn test_insufficient_segments() {
        let result = segment(&points_on_x(&[1.0, 1.0, 1.0]), &x_axis(), 4);
        assert_eq!(result, Err(Error::InsufficientSegments { found: 1 }));

        let result = segment(&points_on_x(&[0.0, 1.0]), &x_axis(), 1);
        assert_eq!(result, Err(Error::InsufficientSegments { found: 1 }));
    }

    #[test]
    fn test_invalid_segment_count() {
        let result = segment(&points_on_x(&[0.0, 1.0]), &x_axis(), 0);
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_colors_are_averaged_per_segment() {
        let points = vec![
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(9.0, 0.0, 0.0),
            Point3d::new(10.0, 0.0, 0.0),
        ];
        let colors = vec![
            Rgb::new(1.0, 0.0, 0.0),
            Rgb::new(0.0, 1.0, 0.0),
            Rgb::new(0.0, 0.0, 1.0),
            Rgb::new(0.0, 0.0, 0.0),
        ];
        let set = PointSet::with_colors(points, colors).unwrap();
        let skeleton = segment(&set, &x_axis(), 2).unwrap();

        assert_relative_eq!(skeleton.segments()[0].mean_color.unwrap(), Rgb::new(0.5, 0.5, 0.0), epsilon = 1e-12);
        assert_relative_eq!(skeleton.segments()[1].mean_color.unwrap(), Rgb::new(0.0, 0.0, 0.5), epsilon = 1e-12);
    }

    #[test]
    fn test_colors_absent_without_input_colors() {
        let skeleton = segment(&points_on_x(&[0.0, 10.0]), &x_axis(), 2).unwrap();
        assert!(skeleton.segments().iter().all(|s| s.mean_color.is_none()));
    }

    #[test]
    fn test_skeletonize_and_axis_line() {
        let set: PointSet = (0..50)
            .map(|i| {
                let t = i as f64 * 0.2;
                Point3d::new(0.0, if i % 2 == 0 { 0.02 } else { -0.02 }, t)
            })
            .collect();
        let skeleton = skeletonize(&set, &AxisConfig::default(), &SegmentationConfig::default()).unwrap();

        assert_eq!(skeleton.len(), 6);
        assert_relative_eq!(skeleton.principal_direction().z.abs(), 1.0, epsilon = 1e-4);

        let (start, end) = skeleton.axis_line();
        assert_relative_eq!((end - start).norm(), 9.8, epsilon = 1e-3);
    }
}
