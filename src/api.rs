use crate::config::Config;
use crate::error::{SpiralError, SpiralResult};
use crate::geometry::ReferenceSpiral;
use crate::scorer::{PopulationStats, ScoreResult, Scorer, WeightTable};
use crate::trace::RawPoint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::info;

/// Named scoring profiles shared by every caller of the service.
#[derive(Default)]
pub struct SpiralScoreState {
    profiles: RwLock<HashMap<String, Arc<Scorer>>>,
}

/// Everything needed to score one trace in a single call.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    pub points: Vec<RawPoint>,
    pub reference: ReferenceSpiral,
    pub population_stats: PopulationStats,
    #[serde(default)]
    pub weights: Option<WeightTable>,
}

fn poisoned<T>(_: T) -> SpiralError {
    SpiralError::Config("Profile registry lock poisoned".to_string())
}

impl SpiralScoreState {
    /// Registers (or replaces) a profile built from data files.
    pub fn load_profile<P: AsRef<Path>>(
        &self,
        name: &str,
        config: &Config,
        stats_path: P,
        weights_path: Option<P>,
    ) -> SpiralResult<Arc<Scorer>> {
        let scorer = Arc::new(Scorer::from_files(config, stats_path, weights_path)?);
        self.insert_profile(name, Arc::clone(&scorer))?;
        Ok(scorer)
    }

    pub fn insert_profile(&self, name: &str, scorer: Arc<Scorer>) -> SpiralResult<()> {
        let mut guard = self.profiles.write().map_err(poisoned)?;
        guard.insert(name.to_string(), scorer);
        info!("Profile '{}' registered", name);
        Ok(())
    }

    pub fn profile(&self, name: &str) -> SpiralResult<Arc<Scorer>> {
        let guard = self.profiles.read().map_err(poisoned)?;
        guard
            .get(name)
            .cloned()
            .ok_or_else(|| SpiralError::Config(format!("Unknown profile '{}'", name)))
    }

    pub fn profile_names(&self) -> SpiralResult<Vec<String>> {
        let guard = self.profiles.read().map_err(poisoned)?;
        let mut names: Vec<String> = guard.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// The read lock is released before scoring starts.
    pub fn score_with_profile(
        &self,
        name: &str,
        points: &[RawPoint],
        reference: &ReferenceSpiral,
    ) -> SpiralResult<ScoreResult> {
        let scorer = self.profile(name)?;
        scorer.score(points, reference)
    }
}

/// Scores a self-contained request; missing weights fall back to the
/// baseline table.
pub fn score_request(request: &ScoreRequest, config: &Config) -> SpiralResult<ScoreResult> {
    let weights = request
        .weights
        .clone()
        .unwrap_or_else(WeightTable::baseline);
    let scorer = Scorer::new(config, request.population_stats.clone(), weights)?;
    scorer.score(&request.points, &request.reference)
}
