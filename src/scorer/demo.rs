use crate::config::{ClassificationThresholds, DemoParams};
use crate::scorer::types::{ScoreResult, ScoreWarning};

/// Adds seeded uniform noise in `±amplitude` to a finished result.
///
/// Only for demonstrations; the scoring pipeline never calls this.
pub fn apply_demo_jitter(
    mut result: ScoreResult,
    params: &DemoParams,
    thresholds: &ClassificationThresholds,
) -> ScoreResult {
    if !params.demo_jitter {
        return result;
    }

    let mut rng = fastrand::Rng::with_seed(params.demo_seed);
    let delta = (rng.f64() * 2.0 - 1.0) * params.demo_jitter_amplitude;

    result.severity_score = (result.severity_score + delta)
        .clamp(thresholds.clamp_min, thresholds.clamp_max);
    result.classification = thresholds.classify(result.severity_score);
    result.warnings.push(ScoreWarning::DemoJitter { delta });
    result
}
