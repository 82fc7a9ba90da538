//! Dominant-oscillation estimate of the radial residual.
//!
//! The residual is resampled onto a uniform grid, stripped of slow drift,
//! Hann windowed and scanned with a Goertzel power estimate. The peak of the
//! scan gives the tremor frequency and the sinusoid amplitude at that peak.

use crate::error::{SpiralError, SpiralResult};
use crate::scorer::types::Metric;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Below this mean residual power there is no oscillation to speak of.
const POWER_FLOOR: f64 = 1e-12;
const MIN_SAMPLES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TremorEstimate {
    pub amplitude: f64,
    pub frequency_hz: f64,
    pub in_clinical_band: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct TremorSearch {
    pub resample_hz: f64,
    pub detrend_cutoff_hz: f64,
    pub min_hz: f64,
    pub max_hz: f64,
    pub step_hz: f64,
    pub band: (f64, f64),
    pub max_samples: usize,
}

/// Linear interpolation of `(times, values)` onto a grid starting at the
/// first time with spacing `1 / rate_hz`.
///
/// Fails before allocating when the grid would exceed `max_samples`.
pub fn resample_uniform(
    times: &[f64],
    values: &[f64],
    rate_hz: f64,
    max_samples: usize,
) -> SpiralResult<Vec<f64>> {
    if times.is_empty() {
        return Ok(Vec::new());
    }
    let start = times[0];
    let span = times[times.len() - 1] - start;
    let wanted = (span * rate_hz).floor() + 1.0;
    if !wanted.is_finite() || wanted > max_samples as f64 {
        return Err(SpiralError::feature(
            Metric::TremorAmplitude,
            format!(
                "{:.0} s span needs {:.0} samples at {} Hz (limit {})",
                span, wanted, rate_hz, max_samples
            ),
        ));
    }
    let count = wanted as usize;

    let mut out = Vec::with_capacity(count);
    let mut j = 0usize;
    for k in 0..count {
        let t = start + k as f64 / rate_hz;
        while j + 1 < times.len() - 1 && times[j + 1] < t {
            j += 1;
        }
        if j + 1 >= times.len() {
            out.push(values[j]);
            continue;
        }
        let (t0, t1) = (times[j], times[j + 1]);
        let frac = ((t - t0) / (t1 - t0)).clamp(0.0, 1.0);
        out.push(values[j] + frac * (values[j + 1] - values[j]));
    }
    Ok(out)
}

/// Centered moving average; the window shrinks near the ends.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let half = window.max(1) / 2;

    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    for v in values {
        prefix.push(prefix[prefix.len() - 1] + v);
    }

    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(n - 1);
            (prefix[hi + 1] - prefix[lo]) / (hi - lo + 1) as f64
        })
        .collect()
}

pub fn hann_window(n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0; n];
    }
    let denom = (n - 1) as f64;
    (0..n)
        .map(|k| 0.5 * (1.0 - (TAU * k as f64 / denom).cos()))
        .collect()
}

/// `|Σ x[k]·e^{-iωk}|` via the Goertzel recurrence; valid for any ω.
#[inline]
pub fn goertzel_magnitude(samples: &[f64], freq_hz: f64, sample_rate: f64) -> f64 {
    let omega = TAU * freq_hz / sample_rate;
    let coeff = 2.0 * omega.cos();
    let mut s1 = 0.0;
    let mut s2 = 0.0;
    for &x in samples {
        let s0 = x + coeff * s1 - s2;
        s2 = s1;
        s1 = s0;
    }
    (s1 * s1 + s2 * s2 - coeff * s1 * s2).max(0.0).sqrt()
}

pub fn estimate(
    times_s: &[f64],
    residuals: &[f64],
    search: &TremorSearch,
) -> SpiralResult<TremorEstimate> {
    let fs = search.resample_hz;
    let series = resample_uniform(times_s, residuals, fs, search.max_samples)?;
    if series.len() < MIN_SAMPLES {
        return Ok(TremorEstimate::default());
    }

    let trend_window = ((fs / search.detrend_cutoff_hz).round() as usize).max(1) | 1;
    let trend = moving_average(&series, trend_window);
    let detrended: Vec<f64> = series.iter().zip(&trend).map(|(v, m)| v - m).collect();

    let power = detrended.iter().map(|v| v * v).sum::<f64>() / detrended.len() as f64;
    if power < POWER_FLOOR {
        return Ok(TremorEstimate::default());
    }

    let window = hann_window(detrended.len());
    let window_sum: f64 = window.iter().sum();
    let tapered: Vec<f64> = detrended.iter().zip(&window).map(|(v, w)| v * w).collect();

    let max_hz = search.max_hz.min(fs / 2.0);
    let mut best = (0.0, 0.0);
    let mut freq = search.min_hz;
    while freq <= max_hz + 1e-9 {
        let mag = goertzel_magnitude(&tapered, freq, fs);
        if mag > best.1 {
            best = (freq, mag);
        }
        freq += search.step_hz;
    }

    let (frequency_hz, magnitude) = best;
    let amplitude = if window_sum > 0.0 {
        2.0 * magnitude / window_sum
    } else {
        0.0
    };

    Ok(TremorEstimate {
        amplitude,
        frequency_hz,
        in_clinical_band: frequency_hz >= search.band.0 && frequency_hz <= search.band.1,
    })
}
