use crate::config::ClassificationThresholds;
use crate::error::{SpiralError, SpiralResult};
use crate::scorer::loader::WeightTable;
use crate::scorer::types::{Classification, ScoreWarning, ZScores};
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct Severity {
    pub raw_score: f64,
    pub score: f64,
    pub classification: Classification,
    pub warning: Option<ScoreWarning>,
}

/// `Σ w·z / Σ|w|` over metrics present in both maps.
pub fn weighted_score(z_scores: &ZScores, weights: &WeightTable) -> SpiralResult<f64> {
    let mut weighted = 0.0;
    let mut magnitude = 0.0;

    for (metric, z) in z_scores {
        let w = weights.get(*metric).unwrap_or(0.0);
        weighted += w * z;
        magnitude += w.abs();
    }

    if magnitude <= 0.0 {
        return Err(SpiralError::EmptyWeightTable);
    }
    Ok(weighted / magnitude)
}

/// Clamps into the configured bounds, reporting any clamp.
pub fn clamp_score(raw: f64, thresholds: &ClassificationThresholds) -> (f64, Option<ScoreWarning>) {
    let clamped = raw.clamp(thresholds.clamp_min, thresholds.clamp_max);
    if clamped != raw {
        warn!(
            "Severity score {:.4} clamped to {:.4}; check population statistics or trace validity",
            raw, clamped
        );
        (clamped, Some(ScoreWarning::Clamped { raw, clamped }))
    } else {
        (raw, None)
    }
}

pub fn score(
    z_scores: &ZScores,
    weights: &WeightTable,
    thresholds: &ClassificationThresholds,
) -> SpiralResult<Severity> {
    let raw_score = weighted_score(z_scores, weights)?;
    let (score, warning) = clamp_score(raw_score, thresholds);

    Ok(Severity {
        raw_score,
        score,
        classification: thresholds.classify(score),
        warning,
    })
}
