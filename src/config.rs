use crate::error::{SpiralError, SpiralResult};
use crate::scorer::types::Classification;
use clap::{parser::ValueSource, ArgMatches, Args};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Args, Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    #[command(flatten)]
    pub pipeline: PipelineParams,
    #[command(flatten)]
    pub thresholds: ClassificationThresholds,
    #[command(flatten)]
    pub demo: DemoParams,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineParams {
    // === CLEANING ===
    /// Points closer than this to the previous kept point are dropped (canvas units).
    #[arg(long, default_value_t = 0.01)]
    pub dedup_epsilon: f64,
    #[arg(long, default_value_t = 2)]
    pub min_points: usize,

    // === POLAR / KINEMATICS ===
    #[arg(long, default_value_t = 10)]
    pub direction_probe: usize,
    #[arg(long, default_value_t = 5)]
    pub derivative_window: usize,
    #[arg(long, default_value_t = false)]
    pub refit_reference: bool,

    // === TREMOR ESTIMATION ===
    #[arg(long, default_value_t = 100.0)]
    pub resample_hz: f64,
    #[arg(long, default_value_t = 2.0)]
    pub detrend_cutoff_hz: f64,
    #[arg(long, default_value_t = 1.0)]
    pub tremor_search_min_hz: f64,
    #[arg(long, default_value_t = 20.0)]
    pub tremor_search_max_hz: f64,
    #[arg(long, default_value_t = 0.1)]
    pub tremor_search_step_hz: f64,
    // Clinically meaningful band
    #[arg(long, default_value_t = 4.0)]
    pub tremor_band_low_hz: f64,
    #[arg(long, default_value_t = 12.0)]
    pub tremor_band_high_hz: f64,
    /// Upper bound on the resampled residual length; longer traces are rejected.
    #[arg(long, default_value_t = 200_000)]
    pub max_resample_points: usize,

    // === REPORT ===
    #[arg(long, default_value_t = 5)]
    pub top_contributors: usize,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            dedup_epsilon: 0.01,
            min_points: 2,
            direction_probe: 10,
            derivative_window: 5,
            refit_reference: false,
            resample_hz: 100.0,
            detrend_cutoff_hz: 2.0,
            tremor_search_min_hz: 1.0,
            tremor_search_max_hz: 20.0,
            tremor_search_step_hz: 0.1,
            tremor_band_low_hz: 4.0,
            tremor_band_high_hz: 12.0,
            max_resample_points: 200_000,
            top_contributors: 5,
        }
    }
}

impl PipelineParams {
    pub const MAX_CONTRIBUTORS: usize = 5;

    #[inline(always)]
    pub fn required_points(&self) -> usize {
        self.min_points.max(2)
    }

    #[inline(always)]
    pub fn contributor_limit(&self) -> usize {
        self.top_contributors.min(Self::MAX_CONTRIBUTORS)
    }

    pub fn validate(&self) -> SpiralResult<()> {
        if !self.dedup_epsilon.is_finite() || self.dedup_epsilon < 0.0 {
            return Err(SpiralError::Config(format!(
                "dedup_epsilon must be a non-negative number, got {}",
                self.dedup_epsilon
            )));
        }
        if self.derivative_window < 2 {
            return Err(SpiralError::Config(format!(
                "derivative_window must be at least 2, got {}",
                self.derivative_window
            )));
        }
        if self.direction_probe == 0 {
            return Err(SpiralError::Config(
                "direction_probe must be at least 1".to_string(),
            ));
        }
        let rates = [
            ("resample_hz", self.resample_hz),
            ("detrend_cutoff_hz", self.detrend_cutoff_hz),
            ("tremor_search_min_hz", self.tremor_search_min_hz),
            ("tremor_search_max_hz", self.tremor_search_max_hz),
            ("tremor_search_step_hz", self.tremor_search_step_hz),
        ];
        for (name, value) in rates {
            if !value.is_finite() || value <= 0.0 {
                return Err(SpiralError::Config(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if self.tremor_search_min_hz >= self.tremor_search_max_hz {
            return Err(SpiralError::Config(format!(
                "tremor search range is empty ({}..{} Hz)",
                self.tremor_search_min_hz, self.tremor_search_max_hz
            )));
        }
        if self.max_resample_points < 4 {
            return Err(SpiralError::Config(format!(
                "max_resample_points must be at least 4, got {}",
                self.max_resample_points
            )));
        }
        if self.tremor_band_low_hz >= self.tremor_band_high_hz {
            return Err(SpiralError::Config(format!(
                "tremor band is empty ({}..{} Hz)",
                self.tremor_band_low_hz, self.tremor_band_high_hz
            )));
        }
        Ok(())
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationThresholds {
    /// Lowest score classified as Mild.
    #[arg(long, default_value_t = 0.3)]
    pub mild_threshold: f64,
    #[arg(long, default_value_t = 1.0)]
    pub moderate_threshold: f64,
    #[arg(long, default_value_t = 2.0)]
    pub severe_threshold: f64,

    #[arg(long, default_value_t = 0.0)]
    pub clamp_min: f64,
    #[arg(long, default_value_t = 3.0)]
    pub clamp_max: f64,
}

impl Default for ClassificationThresholds {
    fn default() -> Self {
        Self {
            mild_threshold: 0.3,
            moderate_threshold: 1.0,
            severe_threshold: 2.0,
            clamp_min: 0.0,
            clamp_max: 3.0,
        }
    }
}

impl ClassificationThresholds {
    pub fn classify(&self, score: f64) -> Classification {
        if score < self.mild_threshold {
            Classification::Normal
        } else if score < self.moderate_threshold {
            Classification::Mild
        } else if score < self.severe_threshold {
            Classification::Moderate
        } else {
            Classification::Severe
        }
    }

    pub fn validate(&self) -> SpiralResult<()> {
        let ordered = [
            self.clamp_min,
            self.mild_threshold,
            self.moderate_threshold,
            self.severe_threshold,
            self.clamp_max,
        ];
        if ordered.iter().any(|v| !v.is_finite()) {
            return Err(SpiralError::Config(
                "Classification thresholds must be finite".to_string(),
            ));
        }
        if !(self.mild_threshold < self.moderate_threshold
            && self.moderate_threshold < self.severe_threshold)
        {
            return Err(SpiralError::Config(format!(
                "Thresholds must be strictly increasing (mild={}, moderate={}, severe={})",
                self.mild_threshold, self.moderate_threshold, self.severe_threshold
            )));
        }
        if self.clamp_min >= self.clamp_max {
            return Err(SpiralError::Config(format!(
                "clamp_min ({}) must be below clamp_max ({})",
                self.clamp_min, self.clamp_max
            )));
        }
        Ok(())
    }
}

/// Stochastic score noise for demonstrations. Off unless asked for.
#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoParams {
    #[arg(long, default_value_t = false)]
    pub demo_jitter: bool,
    #[arg(long, default_value_t = 0.25)]
    pub demo_jitter_amplitude: f64,
    #[arg(long, default_value_t = 42)]
    pub demo_seed: u64,
}

impl Default for DemoParams {
    fn default() -> Self {
        Self {
            demo_jitter: false,
            demo_jitter_amplitude: 0.25,
            demo_seed: 42,
        }
    }
}

impl DemoParams {
    pub fn validate(&self) -> SpiralResult<()> {
        if !self.demo_jitter_amplitude.is_finite() || self.demo_jitter_amplitude < 0.0 {
            return Err(SpiralError::Config(format!(
                "demo_jitter_amplitude must be a non-negative number, got {}",
                self.demo_jitter_amplitude
            )));
        }
        Ok(())
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> SpiralResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SpiralResult<()> {
        self.pipeline.validate()?;
        self.thresholds.validate()?;
        self.demo.validate()
    }

    /// Copies every value the user typed explicitly on the command line over
    /// the file-provided configuration.
    pub fn merge_from_cli(&mut self, cli: &Config, matches: &ArgMatches) {
        macro_rules! update_if_present {
            ($group:ident . $field:ident) => {
                if matches.value_source(stringify!($field)) == Some(ValueSource::CommandLine) {
                    self.$group.$field = cli.$group.$field.clone();
                }
            };
        }

        update_if_present!(pipeline.dedup_epsilon);
        update_if_present!(pipeline.min_points);
        update_if_present!(pipeline.direction_probe);
        update_if_present!(pipeline.derivative_window);
        update_if_present!(pipeline.refit_reference);
        update_if_present!(pipeline.resample_hz);
        update_if_present!(pipeline.detrend_cutoff_hz);
        update_if_present!(pipeline.tremor_search_min_hz);
        update_if_present!(pipeline.tremor_search_max_hz);
        update_if_present!(pipeline.tremor_search_step_hz);
        update_if_present!(pipeline.tremor_band_low_hz);
        update_if_present!(pipeline.tremor_band_high_hz);
        update_if_present!(pipeline.max_resample_points);
        update_if_present!(pipeline.top_contributors);

        update_if_present!(thresholds.mild_threshold);
        update_if_present!(thresholds.moderate_threshold);
        update_if_present!(thresholds.severe_threshold);
        update_if_present!(thresholds.clamp_min);
        update_if_present!(thresholds.clamp_max);

        update_if_present!(demo.demo_jitter);
        update_if_present!(demo.demo_jitter_amplitude);
        update_if_present!(demo.demo_seed);
    }
}
