use crate::scorer::types::Metric;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpiralError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Data Validation Error: {0}")]
    Validation(String),

    // === Pipeline taxonomy ===
    #[error("Insufficient data: {kept} usable points, {required} required")]
    InsufficientData { kept: usize, required: usize },

    #[error("Degenerate geometry: every point collapses onto the reference center")]
    DegenerateGeometry,

    #[error("Feature computation failed for '{metric}': {detail}")]
    FeatureComputation { metric: String, detail: String },

    #[error("Missing population statistic for '{0}'")]
    MissingReferenceStat(Metric),

    #[error("Degenerate population statistic for '{metric}' (mean={mean}, std={std})")]
    DegenerateStat { metric: Metric, mean: f64, std: f64 },

    #[error("Weight table has no non-zero weight for any normalized metric")]
    EmptyWeightTable,
}

impl SpiralError {
    pub(crate) fn feature(metric: impl ToString, detail: impl Into<String>) -> Self {
        SpiralError::FeatureComputation {
            metric: metric.to_string(),
            detail: detail.into(),
        }
    }
}

pub type SpiralResult<T> = Result<T, SpiralError>;
