use crate::error::{SpiralError, SpiralResult};
use crate::scorer::loader::PopulationStats;
use crate::scorer::types::{FeatureVector, ZScores};

/// Converts every feature to a directed z-score ("higher = more abnormal").
///
/// Required metrics without a population entry are an error; supplemental
/// ones are left out of the result.
pub fn normalize(features: &FeatureVector, stats: &PopulationStats) -> SpiralResult<ZScores> {
    let mut z_scores = ZScores::new();

    for (metric, value) in features.iter() {
        let entry = match stats.get(metric) {
            Some(entry) => entry,
            None if metric.is_required() => {
                return Err(SpiralError::MissingReferenceStat(metric));
            }
            None => continue,
        };
        entry.check(metric)?;

        let z = (value - entry.mean) / entry.std;
        z_scores.insert(metric, entry.direction.orient(z));
    }

    Ok(z_scores)
}
