use crate::scorer::loader::WeightTable;
use crate::scorer::severity::Severity;
use crate::scorer::types::{Contribution, FeatureVector, ScoreResult, ScoreWarning, ZScores};

/// Metrics ranked by `|w·z|`, largest first; ties keep metric order.
pub fn top_contributors(z_scores: &ZScores, weights: &WeightTable, limit: usize) -> Vec<Contribution> {
    let mut ranked: Vec<Contribution> = z_scores
        .iter()
        .filter_map(|(metric, z)| {
            weights.get(*metric).map(|w| Contribution {
                metric: *metric,
                contribution: w * z,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.contribution
            .abs()
            .total_cmp(&a.contribution.abs())
            .then(a.metric.cmp(&b.metric))
    });
    ranked.truncate(limit);
    ranked
}

pub fn assemble(
    features: FeatureVector,
    z_scores: ZScores,
    severity: Severity,
    weights: &WeightTable,
    limit: usize,
    mut warnings: Vec<ScoreWarning>,
) -> ScoreResult {
    let top = top_contributors(&z_scores, weights, limit);
    warnings.extend(severity.warning);

    ScoreResult {
        severity_score: severity.score,
        raw_score: severity.raw_score,
        classification: severity.classification,
        features,
        z_scores,
        top_contributors: top,
        warnings,
    }
}
