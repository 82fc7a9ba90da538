use crate::config::PipelineParams;
use crate::error::{SpiralError, SpiralResult};
use crate::geometry::ReferenceSpiral;
use crate::scorer::kinematics::Kinematics;
use crate::scorer::polar::PolarTrace;
use crate::scorer::tremor::{self, TremorEstimate, TremorSearch};
use crate::scorer::types::{FeatureVector, Metric};
use crate::trace::CleanedTrace;
use std::collections::BTreeSet;
use tracing::debug;

/// Smoothing span used to isolate fast radial-velocity fluctuations.
const TEMPORAL_SMOOTHING_WINDOW: usize = 7;

/// Everything the extractor derives, including the tremor estimate that the
/// flat feature table only carries as two scalars.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub features: FeatureVector,
    pub tremor: TremorEstimate,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn trapezoid(times: &[f64], values: &[f64]) -> f64 {
    times
        .windows(2)
        .zip(values.windows(2))
        .map(|(t, v)| 0.5 * (v[0] + v[1]) * (t[1] - t[0]))
        .sum()
}

/// Mean absolute change between consecutive inter-point distances.
pub fn path_smoothness(segments: &[f64]) -> f64 {
    if segments.len() < 2 {
        return 0.0;
    }
    let diffs: Vec<f64> = segments.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    mean(&diffs)
}

/// Mean `|r - (a + b·θ)|` at each point's own unwrapped angle.
pub fn radial_deviation(residuals: &[f64]) -> f64 {
    mean(&residuals.iter().map(|r| r.abs()).collect::<Vec<_>>())
}

/// Drawn polar area over the ideal area between the same progress angles.
fn auc_ratio(polar: &PolarTrace, reference: &ReferenceSpiral) -> SpiralResult<f64> {
    let drawn: f64 = polar
        .points
        .windows(2)
        .map(|w| {
            let d_progress = polar.progress(w[1].theta) - polar.progress(w[0].theta);
            0.25 * (w[0].radius.powi(2) + w[1].radius.powi(2)) * d_progress
        })
        .sum();

    let first = polar.progress(polar.points[0].theta);
    let last = polar.progress(polar.points[polar.len() - 1].theta);
    let ideal = reference.swept_area(first, last);
    if ideal.abs() < 1e-12 {
        return Err(SpiralError::feature(
            Metric::AucRatio,
            "trace sweeps no angle; ideal area vanishes",
        ));
    }
    Ok(drawn / ideal)
}

/// Mean of `ln(v)` over the finite, positive samples.
fn mean_log_positive<I>(values: I, metric: Metric, rate: &str) -> SpiralResult<f64>
where
    I: IntoIterator<Item = f64>,
{
    let logs: Vec<f64> = values
        .into_iter()
        .filter(|v| v.is_finite() && *v > 0.0)
        .map(f64::ln)
        .collect();
    if logs.is_empty() {
        return Err(SpiralError::feature(
            metric,
            format!("no sample has a positive {}", rate),
        ));
    }
    Ok(mean(&logs))
}

fn finite(metric: Metric, value: f64) -> SpiralResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SpiralError::feature(metric, format!("non-finite value {}", value)))
    }
}

/// Computes every metric.
///
/// A supplemental metric that cannot be computed is left out of the vector
/// unless it is in `needed`, in which case the failure is returned.
pub fn extract(
    trace: &CleanedTrace,
    polar: &PolarTrace,
    kin: &Kinematics,
    reference: &ReferenceSpiral,
    params: &PipelineParams,
    needed: &BTreeSet<Metric>,
) -> SpiralResult<Extraction> {
    let duration_ms = trace.duration_ms();
    if duration_ms == 0 {
        return Err(SpiralError::feature(Metric::DurationMs, "trace has zero duration"));
    }
    let duration_s = duration_ms as f64 / 1000.0;

    let segments = trace.segment_lengths();
    let path_length: f64 = segments.iter().sum();
    if path_length <= 0.0 {
        return Err(SpiralError::feature(
            Metric::MeanSpeed,
            "all points coincide; path length is zero",
        ));
    }

    let residuals = polar.residuals(reference);

    let search = TremorSearch {
        resample_hz: params.resample_hz,
        detrend_cutoff_hz: params.detrend_cutoff_hz,
        min_hz: params.tremor_search_min_hz,
        max_hz: params.tremor_search_max_hz,
        step_hz: params.tremor_search_step_hz,
        band: (params.tremor_band_low_hz, params.tremor_band_high_hz),
        max_samples: params.max_resample_points,
    };
    let tremor = tremor::estimate(&kin.t_s, &residuals, &search)?;

    let smoothed = tremor::moving_average(&kin.radial_velocity, TEMPORAL_SMOOTHING_WINDOW);
    let temporal: Vec<f64> = kin
        .radial_velocity
        .iter()
        .zip(&smoothed)
        .map(|(v, s)| (v - s).powi(2))
        .collect();

    let jerk_sq: Vec<f64> = kin.jerk.iter().map(|j| j * j).collect();
    let jerk_integral = trapezoid(&kin.t_s, &jerk_sq);
    let normalized_jerk =
        (0.5 * jerk_integral * duration_s.powi(5) / path_length.powi(2)).sqrt();

    let required = [
        (Metric::PointCount, trace.len() as f64),
        (Metric::DurationMs, duration_ms as f64),
        (Metric::MeanSpeed, path_length / duration_s),
        (Metric::PathSmoothness, path_smoothness(&segments)),
        (Metric::RadialDeviation, radial_deviation(&residuals)),
        (Metric::TremorAmplitude, tremor.amplitude),
        (Metric::TremorFrequencyHz, tremor.frequency_hz),
    ];
    let mut features = FeatureVector::new();
    for (metric, value) in required {
        features.insert(metric, finite(metric, value)?);
    }

    let sign = polar.direction.sign();
    let dr_dtheta = kin
        .radial_velocity
        .iter()
        .zip(&kin.angular_velocity)
        .map(|(dr, dtheta)| dr / (sign * dtheta));

    let supplemental = [
        (
            Metric::GeometricPower,
            Ok(mean(&residuals.iter().map(|r| r * r).collect::<Vec<_>>())),
        ),
        (Metric::TemporalPower, Ok(mean(&temporal))),
        (Metric::AucRatio, auc_ratio(polar, reference)),
        (Metric::NormalizedJerk, Ok(normalized_jerk)),
        (
            Metric::LogDrDthetaMean,
            mean_log_positive(dr_dtheta, Metric::LogDrDthetaMean, "dr/dθ"),
        ),
        (
            Metric::LogDrDtMean,
            mean_log_positive(kin.radial_velocity.iter().copied(), Metric::LogDrDtMean, "dr/dt"),
        ),
    ];
    for (metric, value) in supplemental {
        match value.and_then(|v| finite(metric, v)) {
            Ok(v) => features.insert(metric, v),
            Err(e) if needed.contains(&metric) => return Err(e),
            Err(e) => debug!("Leaving out {}: {}", metric, e),
        }
    }

    debug!(
        "Features: deviation={:.4}, smoothness={:.4}, tremor={:.3} @ {:.2} Hz",
        features.get(Metric::RadialDeviation).unwrap_or_default(),
        features.get(Metric::PathSmoothness).unwrap_or_default(),
        tremor.amplitude,
        tremor.frequency_hz
    );

    Ok(Extraction { features, tremor })
}
