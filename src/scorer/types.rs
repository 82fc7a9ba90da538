use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Every scalar the feature extractor can produce.
///
/// Declaration order is the canonical report order and the tie-break order
/// for contributor ranking.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    EnumString,
    Display,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    PointCount,
    DurationMs,
    MeanSpeed,
    PathSmoothness,
    RadialDeviation,
    TremorAmplitude,
    TremorFrequencyHz,

    // Supplemental shape/timing metrics
    GeometricPower,
    TemporalPower,
    AucRatio,
    NormalizedJerk,
    /// Mean of `ln(dr/dθ)` over samples where the growth rate is positive.
    LogDrDthetaMean,
    /// Mean of `ln(dr/dt)` over samples moving outward.
    LogDrDtMean,
}

impl Metric {
    /// Required metrics must have a population entry; supplemental ones are
    /// normalized only when the stats file carries them.
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            Metric::PointCount
                | Metric::DurationMs
                | Metric::MeanSpeed
                | Metric::PathSmoothness
                | Metric::RadialDeviation
                | Metric::TremorAmplitude
                | Metric::TremorFrequencyHz
        )
    }

    pub fn required() -> impl Iterator<Item = Metric> {
        Metric::iter().filter(|m| m.is_required())
    }

    pub fn default_direction(&self) -> Direction {
        match self {
            Metric::PointCount
            | Metric::DurationMs
            | Metric::MeanSpeed
            | Metric::TremorFrequencyHz
            | Metric::AucRatio
            | Metric::LogDrDthetaMean
            | Metric::LogDrDtMean => Direction::Neutral,
            _ => Direction::HigherIsWorse,
        }
    }
}

/// How a raw z-score maps onto "higher = more abnormal".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    HigherIsWorse,
    LowerIsWorse,
    /// Any departure from the population mean counts as abnormal.
    Neutral,
}

impl Direction {
    #[inline(always)]
    pub fn orient(&self, z: f64) -> f64 {
        match self {
            Direction::HigherIsWorse => z,
            Direction::LowerIsWorse => -z,
            Direction::Neutral => z.abs(),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum Classification {
    Normal,
    Mild,
    Moderate,
    Severe,
}

/// Ordered metric → value table. Values are always finite.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(BTreeMap<Metric, f64>);

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, metric: Metric, value: f64) {
        self.0.insert(metric, value);
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.0.get(&metric).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        self.0.iter().map(|(m, v)| (*m, *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Metric, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (Metric, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

pub type ZScores = BTreeMap<Metric, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub metric: Metric,
    /// Signed `weight * z`.
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreWarning {
    /// The weighted score fell outside the configured bounds.
    Clamped { raw: f64, clamped: f64 },
    /// The supplied reference was replaced by a fit to the trace.
    ReferenceRefit { a: f64, b: f64 },
    /// Stochastic demo noise was added to the score.
    DemoJitter { delta: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub severity_score: f64,
    /// Weighted score before clamping.
    pub raw_score: f64,
    pub classification: Classification,
    pub features: FeatureVector,
    pub z_scores: ZScores,
    pub top_contributors: Vec<Contribution>,
    #[serde(default)]
    pub warnings: Vec<ScoreWarning>,
}

impl ScoreResult {
    pub fn was_clamped(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, ScoreWarning::Clamped { .. }))
    }
}
