//! Batch analysis over many branches
//!
//! Each branch is processed independently. A failure on one branch is
//! recorded in the report next to the successes of the others and never
//! aborts the run. With `parallel` enabled the branches are distributed
//! over the rayon thread pool.

use crate::features::{compute_features_with, BranchFeatures, FeatureConfig};
use crate::pca::AxisConfig;
use crate::pruning::{propose_cut_with, CutResult, PruneConfig};
use crate::reference::{reference_direction, ReferenceMode};
use crate::segmentation::{skeletonize, SegmentationConfig, Skeleton};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use vinecrate_core::{Error, PointSet, Result, Vector3d};

/// Configuration for a batch run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub axis: AxisConfig,
    pub segmentation: SegmentationConfig,
    pub features: FeatureConfig,
    /// How each branch's reference direction is taken from the trunk
    pub reference: ReferenceMode,
    /// Distribute branches over the rayon thread pool
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            axis: AxisConfig::default(),
            segmentation: SegmentationConfig::default(),
            features: FeatureConfig::default(),
            reference: ReferenceMode::default(),
            parallel: true,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        self.axis.validate()?;
        self.segmentation.validate()?;
        self.features.validate()
    }
}

/// One labeled branch to analyze
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchInput {
    /// Identifier of the annotated object
    pub id: String,
    pub points: PointSet,
}

impl BranchInput {
    pub fn new(id: impl Into<String>, points: PointSet) -> Self {
        Self {
            id: id.into(),
            points,
        }
    }
}

/// Skeleton and features of one branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchAnalysis {
    pub skeleton: Skeleton,
    pub features: BranchFeatures,
    /// Unit reference direction the inclination was measured against
    pub reference_direction: Vector3d,
}

/// Result of one branch within a batch
#[derive(Debug, Clone, PartialEq)]
pub struct BranchOutcome<T> {
    pub id: String,
    pub result: Result<T>,
}

/// Per-branch outcomes, in input order
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport<T> {
    pub outcomes: Vec<BranchOutcome<T>>,
}

impl<T> BatchReport<T> {
    /// Number of branches processed
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Successful branches with their results
    pub fn successes(&self) -> impl Iterator<Item = (&str, &T)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|r| (o.id.as_str(), r)))
    }

    /// Failed branches with their errors
    pub fn failures(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.id.as_str(), e)))
    }

    /// Look up the outcome of branch `id`
    pub fn get(&self, id: &str) -> Option<&Result<T>> {
        self.outcomes.iter().find(|o| o.id == id).map(|o| &o.result)
    }
}

/// Anything a batch runs over: carries the branch id used in the report
trait Labeled {
    fn label(&self) -> &str;
}

impl Labeled for BranchInput {
    fn label(&self) -> &str {
        &self.id
    }
}

/// Run `f` on every item, isolating failures
fn run_batch<I, T, F>(items: &[I], parallel: bool, f: F) -> BatchReport<T>
where
    I: Labeled + Sync,
    T: Send,
    F: Fn(&I) -> Result<T> + Sync + Send,
{
    let run_one = |item: &I| {
        let result = f(item);
        if let Err(e) = &result {
            warn!("branch {} skipped: {}", item.label(), e);
        }
        BranchOutcome {
            id: item.label().to_string(),
            result,
        }
    };

    let outcomes: Vec<BranchOutcome<T>> = if parallel {
        items.par_iter().map(run_one).collect()
    } else {
        items.iter().map(run_one).collect()
    };
    BatchReport { outcomes }
}

/// Skeleton and features of one branch against a fixed reference direction
pub fn analyze_branch(
    points: &PointSet,
    reference: &Vector3d,
    config: &AnalysisConfig,
) -> Result<BranchAnalysis> {
    let skeleton = skeletonize(points, &config.axis, &config.segmentation)?;
    let features = compute_features_with(&skeleton, reference, &config.features)?;
    Ok(BranchAnalysis {
        skeleton,
        features,
        reference_direction: reference.normalize(),
    })
}

/// Analyze every branch against the same reference direction
///
/// Only an invalid configuration fails the whole call; branch errors end
/// up in the report.
pub fn analyze_branches(
    branches: &[BranchInput],
    reference: &Vector3d,
    config: &AnalysisConfig,
) -> Result<BatchReport<BranchAnalysis>> {
    config.validate()?;
    debug!("analyzing {} branches", branches.len());
    Ok(run_batch(branches, config.parallel, |branch| {
        analyze_branch(&branch.points, reference, config)
    }))
}

/// Trunk skeleton plus the analysis of every branch on the plant
#[derive(Debug, Clone, PartialEq)]
pub struct PlantReport {
    pub trunk: Skeleton,
    pub branches: BatchReport<BranchAnalysis>,
}

/// Skeletonize the trunk, then analyze each branch against it
///
/// The trunk is needed by every branch, so a trunk error fails the call.
pub fn analyze_plant(
    trunk: &PointSet,
    branches: &[BranchInput],
    config: &AnalysisConfig,
) -> Result<PlantReport> {
    config.validate()?;
    let trunk = skeletonize(trunk, &config.axis, &config.segmentation)?;
    debug!(
        "trunk skeleton has {} segments, analyzing {} branches",
        trunk.len(),
        branches.len()
    );

    let report = run_batch(branches, config.parallel, |branch| {
        let skeleton = skeletonize(&branch.points, &config.axis, &config.segmentation)?;
        let reference = reference_direction(config.reference, &skeleton, &trunk)?;
        let features = compute_features_with(&skeleton, &reference, &config.features)?;
        Ok(BranchAnalysis {
            skeleton,
            features,
            reference_direction: reference,
        })
    });

    Ok(PlantReport {
        trunk,
        branches: report,
    })
}

/// A request to cut branch `id` at `fraction`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PruneDecision {
    pub id: String,
    pub fraction: f64,
}

struct PruneJob<'a> {
    decision: &'a PruneDecision,
    branch: Option<&'a BranchInput>,
}

impl Labeled for PruneJob<'_> {
    fn label(&self) -> &str {
        &self.decision.id
    }
}

/// Cut every branch named in `decisions`
///
/// Decisions naming an unknown branch are reported as
/// [`Error::InvalidConfiguration`]; branches without a decision are left out.
pub fn simulate_pruning(
    branches: &[BranchInput],
    decisions: &[PruneDecision],
    axis_config: &AxisConfig,
    parallel: bool,
) -> BatchReport<CutResult> {
    let jobs: Vec<PruneJob> = decisions
        .iter()
        .map(|decision| PruneJob {
            decision,
            branch: branches.iter().find(|b| b.id == decision.id),
        })
        .collect();
    debug!("simulating {} cuts", jobs.len());

    run_batch(&jobs, parallel, |job| match job.branch {
        Some(branch) => propose_cut_with(
            &branch.points,
            &PruneConfig::new(job.decision.fraction),
            axis_config,
        ),
        None => Err(Error::InvalidConfiguration(format!(
            "no branch with id {}",
            job.decision.id
        ))),
    })
}

/// Reproducible random choice of which branches to cut and where
///
/// Owns a seeded generator, so the same seed and branch list always yield
/// the same plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrunePlanner {
    pub seed: u64,
    /// Probability that any given branch is selected for pruning
    pub prune_probability: f64,
    /// Lower bound of the drawn cut fraction
    pub min_fraction: f64,
    /// Upper bound of the drawn cut fraction
    pub max_fraction: f64,
}

impl Default for PrunePlanner {
    fn default() -> Self {
        Self {
            seed: 0,
            prune_probability: 0.4,
            min_fraction: 0.2,
            max_fraction: 0.7,
        }
    }
}

impl PrunePlanner {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.prune_probability) {
            return Err(Error::InvalidConfiguration(format!(
                "prune_probability must lie in [0, 1], got {}",
                self.prune_probability
            )));
        }
        if !(0.0 <= self.min_fraction && self.min_fraction <= self.max_fraction && self.max_fraction <= 1.0) {
            return Err(Error::InvalidConfiguration(format!(
                "fraction range [{}, {}] must be ordered and within [0, 1]",
                self.min_fraction, self.max_fraction
            )));
        }
        Ok(())
    }

    /// Draw a decision for each branch, keeping the selected ones
    pub fn plan<'a, I>(&self, ids: I) -> Result<Vec<PruneDecision>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.validate()?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut decisions = Vec::new();

        for id in ids {
            // both draws happen for every branch so the plan of one branch
            // does not depend on whether earlier ones were selected
            let selected = rng.gen_bool(self.prune_probability);
            let fraction = self.min_fraction + rng.gen::<f64>() * (self.max_fraction - self.min_fraction);
            if selected {
                decisions.push(PruneDecision {
                    id: id.to_string(),
                    fraction,
                });
            }
        }
        Ok(decisions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vinecrate_core::Point3d;

    fn cane(id: &str, start: Point3d, direction: Vector3d) -> BranchInput {
        let points: PointSet = (0..60)
            .map(|i| {
                let wobble = if i % 2 == 0 { 0.01 } else { -0.01 };
                start + direction * (i as f64 * 0.05) + Vector3d::new(0.0, wobble, 0.0)
            })
            .collect();
        BranchInput::new(id, points)
    }

    fn degenerate(id: &str) -> BranchInput {
        BranchInput::new(id, PointSet::from_points(vec![Point3d::new(1.0, 1.0, 1.0); 4]))
    }

    #[test]
    fn test_failures_are_isolated() {
        let branches = vec![
            cane("a", Point3d::origin(), Vector3d::x()),
            degenerate("broken"),
            cane("b", Point3d::new(0.0, 0.0, 1.0), Vector3d::new(1.0, 0.0, 1.0).normalize()),
        ];

        for parallel in [false, true] {
            let config = AnalysisConfig {
                parallel,
                ..AnalysisConfig::default()
            };
            let report = analyze_branches(&branches, &Vector3d::z(), &config).unwrap();

            assert_eq!(report.len(), 3);
            assert_eq!(report.successes().count(), 2);
            let failures: Vec<_> = report.failures().collect();
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].0, "broken");
            assert!(matches!(failures[0].1, Error::DegenerateInput(_)));

            // outcomes keep input order
            let ids: Vec<&str> = report.outcomes.iter().map(|o| o.id.as_str()).collect();
            assert_eq!(ids, vec!["a", "broken", "b"]);

            let a = report.get("a").unwrap().as_ref().unwrap();
            assert!((a.features.inclination_angle - 90.0).abs() < 0.1);
        }
    }

    #[test]
    fn test_invalid_config_fails_whole_batch() {
        let config = AnalysisConfig {
            segmentation: SegmentationConfig { segments: 0 },
            ..AnalysisConfig::default()
        };
        let result = analyze_branches(&[], &Vector3d::z(), &config);
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_analyze_plant_uses_trunk_reference() {
        let trunk = cane("trunk", Point3d::origin(), Vector3d::z()).points;
        let branches = vec![
            cane("upright", Point3d::new(0.2, 0.0, 2.0), Vector3d::z()),
            cane("flat", Point3d::new(0.2, 0.0, 2.5), Vector3d::x()),
        ];

        let report = analyze_plant(&trunk, &branches, &AnalysisConfig::default()).unwrap();
        assert!(report.trunk.principal_direction().z.abs() > 0.99);

        let upright = report.branches.get("upright").unwrap().as_ref().unwrap();
        let flat = report.branches.get("flat").unwrap().as_ref().unwrap();
        assert!(upright.features.inclination_angle < 1.0);
        assert!(flat.features.inclination_angle > 89.0);
    }

    #[test]
    fn test_analyze_plant_fails_on_degenerate_trunk() {
        let trunk = degenerate("trunk").points;
        let result = analyze_plant(&trunk, &[], &AnalysisConfig::default());
        assert!(matches!(result, Err(Error::DegenerateInput(_))));
    }

    #[test]
    fn test_simulate_pruning() {
        let branches = vec![
            cane("a", Point3d::origin(), Vector3d::x()),
            degenerate("broken"),
        ];
        let decisions = vec![
            PruneDecision { id: "a".to_string(), fraction: 1.0 },
            PruneDecision { id: "broken".to_string(), fraction: 0.5 },
            PruneDecision { id: "missing".to_string(), fraction: 0.5 },
        ];

        let report = simulate_pruning(&branches, &decisions, &AxisConfig::default(), true);
        assert_eq!(report.len(), 3);

        let cut = report.get("a").unwrap().as_ref().unwrap();
        assert_eq!(cut.kept.len(), 60);
        assert!(matches!(report.get("broken"), Some(Err(Error::DegenerateInput(_)))));
        assert!(matches!(report.get("missing"), Some(Err(Error::InvalidConfiguration(_)))));
    }

    #[test]
    fn test_prune_planner_is_reproducible() {
        let ids: Vec<String> = (0..50).map(|i| format!("branch-{}", i)).collect();
        let planner = PrunePlanner::with_seed(42);

        let first = planner.plan(ids.iter().map(String::as_str)).unwrap();
        let second = planner.plan(ids.iter().map(String::as_str)).unwrap();
        assert_eq!(first, second);

        assert!(!first.is_empty() && first.len() < ids.len());
        assert!(first
            .iter()
            .all(|d| (planner.min_fraction..=planner.max_fraction).contains(&d.fraction)));
    }

    #[test]
    fn test_prune_planner_extremes() {
        let ids = ["a", "b", "c"];
        let all = PrunePlanner {
            prune_probability: 1.0,
            ..PrunePlanner::default()
        };
        assert_eq!(all.plan(ids).unwrap().len(), 3);

        let none = PrunePlanner {
            prune_probability: 0.0,
            ..PrunePlanner::default()
        };
        assert!(none.plan(ids).unwrap().is_empty());

        let bad = PrunePlanner {
            min_fraction: 0.8,
            max_fraction: 0.2,
            ..PrunePlanner::default()
        };
        assert!(matches!(bad.plan(ids), Err(Error::InvalidConfiguration(_))));
    }
}
