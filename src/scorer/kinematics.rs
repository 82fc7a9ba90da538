use crate::error::{SpiralError, SpiralResult};
use crate::scorer::polar::PolarTrace;

/// Minimum time spread (seconds) a derivative window may span.
const MIN_WINDOW_SPAN_S: f64 = 1e-9;

/// Per-point smoothed derivatives. Every series has the trace's length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kinematics {
    /// Sample times in seconds.
    pub t_s: Vec<f64>,
    pub vx: Vec<f64>,
    pub vy: Vec<f64>,
    pub speed: Vec<f64>,
    /// dr/dt
    pub radial_velocity: Vec<f64>,
    /// dθ/dt
    pub angular_velocity: Vec<f64>,
    pub ax: Vec<f64>,
    pub ay: Vec<f64>,
    pub acceleration: Vec<f64>,
    pub jerk: Vec<f64>,
}

impl Kinematics {
    pub fn len(&self) -> usize {
        self.t_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t_s.is_empty()
    }
}

/// Least-squares slope of `values` against `times` over a sliding window.
///
/// The window is centered (`window / 2` samples each side); near the ends it
/// is truncated to what exists on one side, so no sample is dropped.
pub fn smoothed_derivative(
    times: &[f64],
    values: &[f64],
    window: usize,
    label: &str,
) -> SpiralResult<Vec<f64>> {
    let n = times.len();
    let half = (window / 2).max(1);
    let mut out = Vec::with_capacity(n);

    for i in 0..n {
        let lo = i.saturating_sub(half);
        let hi = (i + half).min(n - 1);
        let ts = &times[lo..=hi];
        let vs = &values[lo..=hi];

        if ts[ts.len() - 1] - ts[0] <= MIN_WINDOW_SPAN_S {
            return Err(SpiralError::feature(
                label,
                format!("zero time spread in derivative window at sample {}", i),
            ));
        }

        let m = ts.len() as f64;
        let t_mean = ts.iter().sum::<f64>() / m;
        let v_mean = vs.iter().sum::<f64>() / m;
        let mut num = 0.0;
        let mut den = 0.0;
        for (t, v) in ts.iter().zip(vs) {
            let dt = t - t_mean;
            num += dt * (v - v_mean);
            den += dt * dt;
        }

        let slope = num / den;
        if !slope.is_finite() {
            return Err(SpiralError::feature(
                label,
                format!("non-finite derivative at sample {}", i),
            ));
        }
        out.push(slope);
    }

    Ok(out)
}

pub fn estimate(polar: &PolarTrace, window: usize) -> SpiralResult<Kinematics> {
    let t_s: Vec<f64> = polar.points.iter().map(|p| p.t as f64 / 1000.0).collect();
    let xs: Vec<f64> = polar.points.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = polar.points.iter().map(|p| p.y).collect();
    let rs: Vec<f64> = polar.points.iter().map(|p| p.radius).collect();
    let thetas: Vec<f64> = polar.points.iter().map(|p| p.theta).collect();

    let vx = smoothed_derivative(&t_s, &xs, window, "velocity_x")?;
    let vy = smoothed_derivative(&t_s, &ys, window, "velocity_y")?;
    let radial_velocity = smoothed_derivative(&t_s, &rs, window, "radial_velocity")?;
    let angular_velocity = smoothed_derivative(&t_s, &thetas, window, "angular_velocity")?;

    let ax = smoothed_derivative(&t_s, &vx, window, "acceleration_x")?;
    let ay = smoothed_derivative(&t_s, &vy, window, "acceleration_y")?;
    let jx = smoothed_derivative(&t_s, &ax, window, "jerk_x")?;
    let jy = smoothed_derivative(&t_s, &ay, window, "jerk_y")?;

    let speed = vx.iter().zip(&vy).map(|(x, y)| x.hypot(*y)).collect();
    let acceleration = ax.iter().zip(&ay).map(|(x, y)| x.hypot(*y)).collect();
    let jerk = jx.iter().zip(&jy).map(|(x, y)| x.hypot(*y)).collect();

    Ok(Kinematics {
        t_s,
        vx,
        vy,
        speed,
        radial_velocity,
        angular_velocity,
        ax,
        ay,
        acceleration,
        jerk,
    })
}
