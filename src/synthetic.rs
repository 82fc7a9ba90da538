use crate::geometry::ReferenceSpiral;
use crate::scorer::polar::SpiralDirection;
use crate::trace::{RawPoint, TraceFile};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Parameters for generating an Archimedean trace around a reference.
#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticSpiral {
    #[arg(long, default_value_t = 400)]
    pub points: usize,
    #[arg(long, default_value_t = 8000)]
    pub duration_ms: u64,
    #[arg(long, default_value_t = 3.0)]
    pub turns: f64,
    #[arg(long, default_value_t = false)]
    pub clockwise: bool,

    /// Sinusoidal radial oscillation (canvas units).
    #[arg(long, default_value_t = 0.0)]
    pub tremor_amplitude: f64,
    #[arg(long, default_value_t = 6.0)]
    pub tremor_frequency_hz: f64,

    /// Standard deviation of random radial noise.
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,
    #[arg(long, default_value_t = 7)]
    pub seed: u64,
}

impl Default for SyntheticSpiral {
    fn default() -> Self {
        Self {
            points: 400,
            duration_ms: 8000,
            turns: 3.0,
            clockwise: false,
            tremor_amplitude: 0.0,
            tremor_frequency_hz: 6.0,
            noise: 0.0,
            seed: 7,
        }
    }
}

/// Irwin-Hall approximation of a standard normal sample.
fn approx_normal(rng: &mut fastrand::Rng) -> f64 {
    (0..12).map(|_| rng.f64()).sum::<f64>() - 6.0
}

impl SyntheticSpiral {
    pub fn direction(&self) -> SpiralDirection {
        if self.clockwise {
            SpiralDirection::Clockwise
        } else {
            SpiralDirection::CounterClockwise
        }
    }

    pub fn generate(&self, reference: &ReferenceSpiral) -> Vec<RawPoint> {
        let n = self.points.max(2);
        let sign = self.direction().sign();
        let sweep = self.turns * TAU;
        let mut rng = fastrand::Rng::with_seed(self.seed);

        (0..n)
            .map(|i| {
                let frac = i as f64 / (n - 1) as f64;
                let progress = frac * sweep;
                let t_ms = (frac * self.duration_ms as f64).round() as u64;
                let t_s = t_ms as f64 / 1000.0;

                let mut radius = reference.ideal_radius(progress);
                radius += self.tremor_amplitude * (TAU * self.tremor_frequency_hz * t_s).sin();
                if self.noise > 0.0 {
                    radius += self.noise * approx_normal(&mut rng);
                }

                let angle = sign * progress;
                RawPoint::new(
                    reference.center_x + radius * angle.cos(),
                    reference.center_y + radius * angle.sin(),
                    t_ms,
                )
            })
            .collect()
    }

    pub fn to_trace_file(&self, reference: &ReferenceSpiral) -> TraceFile {
        TraceFile {
            points: self.generate(reference),
            reference: Some(*reference),
            canvas: None,
        }
    }
}
