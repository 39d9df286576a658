//! Pruning cut simulation
//!
//! A cut is placed orthogonal to the branch's principal axis at a chosen
//! fraction of its projected extent. Points at or below the threshold stay
//! on the plant, the rest are removed.

use crate::pca::{estimate_axis_with, AxisConfig};
use log::debug;
use serde::{Deserialize, Serialize};
use vinecrate_core::{projection_span, CutPlane, Error, PointSet, Result};

/// Configuration for a simulated cut
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PruneConfig {
    /// Position of the cut along the branch axis, from 0 (min projection) to 1 (max projection)
    pub fraction: f64,
}

impl PruneConfig {
    pub fn new(fraction: f64) -> Self {
        Self { fraction }
    }

    /// Check that the fraction lies in [0, 1]
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.fraction) {
            return Err(Error::InvalidConfiguration(format!(
                "fraction must lie in [0, 1], got {}",
                self.fraction
            )));
        }
        Ok(())
    }
}

/// Outcome of a simulated cut
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutResult {
    /// Points at or below the threshold (the stub left on the plant)
    pub kept: PointSet,
    /// Points above the threshold
    pub removed: PointSet,
    /// Positions of the kept points in the input set
    pub kept_indices: Vec<usize>,
    /// Positions of the removed points in the input set
    pub removed_indices: Vec<usize>,
    /// Cut position in projection coordinates relative to the centroid
    pub threshold: f64,
    /// The cut plane, with the branch axis as normal
    pub plane: CutPlane,
}

/// Simulate a cut at `fraction` of the branch extent with the default axis configuration
///
/// # Errors
/// * [`Error::InvalidConfiguration`] when `fraction` is outside [0, 1]
/// * any error of [`estimate_axis_with`], unchanged
///
/// Which end counts as fraction 0 follows the sign of the estimated
/// axis, which the eigen solver does not fix.
pub fn propose_cut(points: &PointSet, fraction: f64) -> Result<CutResult> {
    propose_cut_with(points, &PruneConfig::new(fraction), &AxisConfig::default())
}

/// Simulate a cut configured by `config`
pub fn propose_cut_with(
    points: &PointSet,
    config: &PruneConfig,
    axis_config: &AxisConfig,
) -> Result<CutResult> {
    config.validate()?;
    let axis = estimate_axis_with(points.points(), axis_config)?;

    let projections = axis.project_all(points.points());
    let (min, max) = projection_span(&projections)
        .ok_or_else(|| Error::DegenerateInput("cannot cut an empty point set".to_string()))?;
    let threshold = cut_threshold(min, max, config.fraction);

    let (kept_indices, removed_indices): (Vec<usize>, Vec<usize>) =
        (0..projections.len()).partition(|&i| projections[i] <= threshold);

    debug!(
        "cut at fraction {:.3} (threshold {:.4}): kept {}, removed {}",
        config.fraction,
        threshold,
        kept_indices.len(),
        removed_indices.len()
    );

    Ok(CutResult {
        kept: points.subset(&kept_indices),
        removed: points.subset(&removed_indices),
        kept_indices,
        removed_indices,
        threshold,
        plane: CutPlane {
            point: axis.point_at(threshold),
            normal: axis.direction(),
        },
    })
}

/// Projection value at `fraction` of `[min, max]`
///
/// The end points are returned exactly, so fraction 1 keeps the point at
/// the maximum projection however the span rounds.
fn cut_threshold(min: f64, max: f64, fraction: f64) -> f64 {
    if fraction <= 0.0 {
        min
    } else if fraction >= 1.0 {
        max
    } else {
        (min + fraction * (max - min)).clamp(min, max)
    }
}
