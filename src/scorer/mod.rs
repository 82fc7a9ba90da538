pub mod demo;
pub mod features;
pub mod kinematics;
pub mod loader;
pub mod normalizer;
pub mod polar;
pub mod report;
pub mod severity;
pub mod tremor;
pub mod types;

pub use self::loader::{PopulationStats, StatEntry, WeightTable};
pub use self::types::{Classification, Direction, FeatureVector, Metric, ScoreResult, ZScores};
use crate::config::{ClassificationThresholds, Config, PipelineParams};
use crate::error::SpiralResult;
use crate::geometry::ReferenceSpiral;
use crate::trace::{self, RawPoint};
use self::types::ScoreWarning;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

/// Immutable scoring context. Build once, share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Scorer {
    pub params: PipelineParams,
    pub thresholds: ClassificationThresholds,
    pub stats: PopulationStats,
    pub weights: WeightTable,
}

impl Scorer {
    pub fn new(config: &Config, stats: PopulationStats, weights: WeightTable) -> SpiralResult<Self> {
        config.validate()?;
        stats.validate()?;
        weights.validate()?;

        Ok(Self {
            params: config.pipeline.clone(),
            thresholds: config.thresholds.clone(),
            stats,
            weights,
        })
    }

    /// Loads stats and (optionally) weights from disk; without a weights
    /// file the embedded baseline table is used.
    pub fn from_files<P: AsRef<Path>>(
        config: &Config,
        stats_path: P,
        weights_path: Option<P>,
    ) -> SpiralResult<Self> {
        let stats = PopulationStats::load_from_file(stats_path)?;
        let weights = match weights_path {
            Some(path) => WeightTable::load_from_file(path)?,
            None => {
                info!("No weights file given; using baseline weights");
                WeightTable::baseline()
            }
        };
        Self::new(config, stats, weights)
    }

    /// Metrics with a population entry or a non-zero weight.
    pub fn metrics_in_use(&self) -> BTreeSet<Metric> {
        let weighted = self
            .weights
            .weights
            .iter()
            .filter(|(_, w)| **w != 0.0)
            .map(|(m, _)| *m);
        self.stats.entries.keys().copied().chain(weighted).collect()
    }

    /// Full pipeline: clean, polar, kinematics, features, z-scores, severity.
    pub fn score(&self, points: &[RawPoint], reference: &ReferenceSpiral) -> SpiralResult<ScoreResult> {
        reference.validate()?;
        let p = &self.params;
        let mut warnings = Vec::new();

        let cleaned = trace::clean_trace(points, p.dedup_epsilon, p.required_points())?;

        let mut reference = *reference;
        if p.refit_reference {
            if let Some(fit) = polar::fit_reference(&cleaned, &reference, p.dedup_epsilon, p.direction_probe)? {
                debug!("Refit reference: a={:.4}, b={:.4}", fit.a, fit.b);
                warnings.push(ScoreWarning::ReferenceRefit { a: fit.a, b: fit.b });
                reference = fit;
            }
        }

        let polar = polar::to_polar(&cleaned, &reference, p.dedup_epsilon, p.direction_probe)?;
        let kin = kinematics::estimate(&polar, p.derivative_window)?;
        let needed = self.metrics_in_use();
        let extraction = features::extract(&cleaned, &polar, &kin, &reference, p, &needed)?;

        let z_scores = normalizer::normalize(&extraction.features, &self.stats)?;
        let severity = severity::score(&z_scores, &self.weights, &self.thresholds)?;

        debug!(
            "Scored trace: {} points, severity={:.4} ({})",
            cleaned.len(),
            severity.score,
            severity.classification
        );

        Ok(report::assemble(
            extraction.features,
            z_scores,
            severity,
            &self.weights,
            p.contributor_limit(),
            warnings,
        ))
    }

    /// Scores an already-extracted feature vector (skips the geometric stages).
    pub fn score_features(&self, features: FeatureVector) -> SpiralResult<ScoreResult> {
        let z_scores = normalizer::normalize(&features, &self.stats)?;
        let severity = severity::score(&z_scores, &self.weights, &self.thresholds)?;
        Ok(report::assemble(
            features,
            z_scores,
            severity,
            &self.weights,
            self.params.contributor_limit(),
            Vec::new(),
        ))
    }
}
