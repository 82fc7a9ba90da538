use crate::error::{SpiralError, SpiralResult};
use crate::scorer::types::{Direction, Metric};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatEntry {
    pub mean: f64,
    pub std: f64,
    pub direction: Direction,
}

/// Population reference for z-scoring. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStatsDocument")]
pub struct PopulationStats {
    pub version: String,
    #[serde(rename = "statistics")]
    pub entries: BTreeMap<Metric, StatEntry>,
}

/// Signed per-metric weights. Metrics without an entry are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWeightsDocument")]
pub struct WeightTable {
    pub version: String,
    pub weights: BTreeMap<Metric, f64>,
}

// --- RAW FILE SHAPES ---

#[derive(Debug, Deserialize)]
struct RawStatEntry {
    mean: f64,
    std: f64,
    #[serde(default)]
    direction: Option<Direction>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawStatsDocument {
    Versioned {
        #[serde(default)]
        version: Option<String>,
        statistics: BTreeMap<String, RawStatEntry>,
    },
    Bare(BTreeMap<String, RawStatEntry>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawWeightsDocument {
    Versioned {
        #[serde(default)]
        version: Option<String>,
        weights: BTreeMap<String, f64>,
    },
    Bare(BTreeMap<String, f64>),
}

const UNVERSIONED: &str = "unversioned";

fn parse_metric(name: &str, source: &str) -> Option<Metric> {
    match Metric::from_str(name.trim()) {
        Ok(m) => Some(m),
        Err(_) => {
            warn!("Skipping unknown metric '{}' in {}", name, source);
            None
        }
    }
}

impl TryFrom<RawStatsDocument> for PopulationStats {
    type Error = SpiralError;

    fn try_from(doc: RawStatsDocument) -> SpiralResult<Self> {
        let (version, raw) = match doc {
            RawStatsDocument::Versioned {
                version,
                statistics,
            } => (version, statistics),
            RawStatsDocument::Bare(map) => (None, map),
        };

        let mut entries = BTreeMap::new();
        for (name, entry) in raw {
            if let Some(metric) = parse_metric(&name, "population statistics") {
                let direction = entry
                    .direction
                    .unwrap_or_else(|| metric.default_direction());
                entries.insert(metric, StatEntry::new(entry.mean, entry.std, direction));
            }
        }

        let stats = Self::new(version.unwrap_or_else(|| UNVERSIONED.to_string()), entries);
        stats.validate()?;
        Ok(stats)
    }
}

impl TryFrom<RawWeightsDocument> for WeightTable {
    type Error = SpiralError;

    fn try_from(doc: RawWeightsDocument) -> SpiralResult<Self> {
        let (version, raw) = match doc {
            RawWeightsDocument::Versioned { version, weights } => (version, weights),
            RawWeightsDocument::Bare(map) => (None, map),
        };

        let weights = raw
            .into_iter()
            .filter_map(|(name, w)| parse_metric(&name, "weight table").map(|m| (m, w)))
            .collect();

        let table = Self::new(version.unwrap_or_else(|| UNVERSIONED.to_string()), weights);
        table.validate()?;
        Ok(table)
    }
}

impl StatEntry {
    pub fn new(mean: f64, std: f64, direction: Direction) -> Self {
        Self {
            mean,
            std,
            direction,
        }
    }

    pub fn check(&self, metric: Metric) -> SpiralResult<()> {
        if !self.mean.is_finite() || !self.std.is_finite() || self.std <= 0.0 {
            return Err(SpiralError::DegenerateStat {
                metric,
                mean: self.mean,
                std: self.std,
            });
        }
        Ok(())
    }
}

impl PopulationStats {
    pub fn new(version: impl Into<String>, entries: BTreeMap<Metric, StatEntry>) -> Self {
        Self {
            version: version.into(),
            entries,
        }
    }

    pub fn get(&self, metric: Metric) -> Option<&StatEntry> {
        self.entries.get(&metric)
    }

    pub fn validate(&self) -> SpiralResult<()> {
        for (metric, entry) in &self.entries {
            entry.check(*metric)?;
        }
        for metric in Metric::required() {
            if !self.entries.contains_key(&metric) {
                return Err(SpiralError::MissingReferenceStat(metric));
            }
        }
        Ok(())
    }

    pub fn from_reader<R: Read>(reader: R) -> SpiralResult<Self> {
        let raw: RawStatsDocument = serde_json::from_reader(reader)?;
        let stats = Self::try_from(raw)?;
        debug!(
            "Population stats '{}': {} metrics",
            stats.version,
            stats.entries.len()
        );
        Ok(stats)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> SpiralResult<Self> {
        let path = path.as_ref();
        info!("Loading population statistics from {:?}", path);
        let file = fs::File::open(path)?;
        Self::from_reader(file)
    }
}

impl WeightTable {
    pub fn new(version: impl Into<String>, weights: BTreeMap<Metric, f64>) -> Self {
        Self {
            version: version.into(),
            weights,
        }
    }

    /// Embedded fallback used when no weights file is supplied.
    pub fn baseline() -> Self {
        let weights = [
            (Metric::RadialDeviation, 0.30),
            (Metric::TremorAmplitude, 0.25),
            (Metric::PathSmoothness, 0.15),
            (Metric::GeometricPower, 0.10),
            (Metric::TemporalPower, 0.10),
            (Metric::NormalizedJerk, 0.10),
        ]
        .into_iter()
        .collect();
        Self::new("baseline", weights)
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.weights.get(&metric).copied()
    }

    pub fn validate(&self) -> SpiralResult<()> {
        if let Some((metric, w)) = self.weights.iter().find(|(_, w)| !w.is_finite()) {
            return Err(SpiralError::Config(format!(
                "Weight for '{}' is not finite ({})",
                metric, w
            )));
        }
        Ok(())
    }

    pub fn from_reader<R: Read>(reader: R) -> SpiralResult<Self> {
        let raw: RawWeightsDocument = serde_json::from_reader(reader)?;
        Self::try_from(raw)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> SpiralResult<Self> {
        let path = path.as_ref();
        info!("Loading weights from {:?}", path);
        let file = fs::File::open(path)?;
        Self::from_reader(file)
    }
}
