use crate::error::{SpiralError, SpiralResult};
use crate::geometry::ReferenceSpiral;
use crate::trace::CleanedTrace;
use nalgebra::{Matrix4, Vector4};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpiralDirection {
    CounterClockwise,
    Clockwise,
}

impl SpiralDirection {
    #[inline(always)]
    pub fn sign(&self) -> f64 {
        match self {
            SpiralDirection::CounterClockwise => 1.0,
            SpiralDirection::Clockwise => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarPoint {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    /// Unwrapped angle, monotone in the drawing direction.
    pub theta: f64,
    pub t: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolarTrace {
    pub points: Vec<PolarPoint>,
    pub direction: SpiralDirection,
}

impl PolarTrace {
    /// Radians travelled along the drawing direction.
    #[inline(always)]
    pub fn progress(&self, theta: f64) -> f64 {
        self.direction.sign() * theta
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// `r - ideal(θ)` for every point.
    pub fn residuals(&self, reference: &ReferenceSpiral) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| p.radius - reference.ideal_radius(self.progress(p.theta)))
            .collect()
    }
}

/// Wraps an angle difference into `(-π, π]`.
#[inline(always)]
pub fn wrap_delta(delta: f64) -> f64 {
    let mut d = delta % TAU;
    if d > PI {
        d -= TAU;
    } else if d <= -PI {
        d += TAU;
    }
    d
}

/// Continuous angle sequence with the shortest signed step between samples.
/// Samples inside the center dead zone (`None`) repeat the previous angle.
fn unwrap_angles(raw: &[Option<f64>]) -> Vec<f64> {
    let mut out = Vec::with_capacity(raw.len());
    let first = raw.iter().flatten().next().copied().unwrap_or(0.0);
    let mut prev_raw = first;
    let mut total = first;

    for angle in raw {
        if let Some(a) = angle {
            total += wrap_delta(a - prev_raw);
            prev_raw = *a;
        }
        out.push(total);
    }
    out
}

fn detect_direction(unwrapped: &[f64], probe: usize) -> SpiralDirection {
    let end = probe.min(unwrapped.len().saturating_sub(1));
    let swept: f64 = unwrapped[..=end].windows(2).map(|w| w[1] - w[0]).sum();
    if swept < 0.0 {
        SpiralDirection::Clockwise
    } else {
        SpiralDirection::CounterClockwise
    }
}

/// Progress of the first sample.
///
/// The angle from +x in the drawing direction is taken in `[0, 2π)`, then
/// moved by whole turns onto the turn whose ideal radius is closest to the
/// sample's radius. Never below `-π`.
fn start_progress(angle: f64, radius: f64, reference: &ReferenceSpiral) -> f64 {
    let base = angle.rem_euclid(TAU);
    let turns = (((radius - reference.a) / reference.b - base) / TAU).round();
    let lowest = if base > PI { -1.0 } else { 0.0 };
    base + TAU * turns.max(lowest)
}

pub fn to_polar(
    trace: &CleanedTrace,
    reference: &ReferenceSpiral,
    epsilon: f64,
    direction_probe: usize,
) -> SpiralResult<PolarTrace> {
    let pts = trace.points();
    let mut radii = Vec::with_capacity(pts.len());
    let mut raw = Vec::with_capacity(pts.len());

    for p in pts {
        let dx = p.x - reference.center_x;
        let dy = p.y - reference.center_y;
        let radius = (dx * dx + dy * dy).sqrt();
        radii.push(radius);
        // atan2 is meaningless at the center; hold the previous angle there.
        raw.push(if radius > epsilon {
            Some(dy.atan2(dx))
        } else {
            None
        });
    }

    if raw.iter().all(Option::is_none) {
        return Err(SpiralError::DegenerateGeometry);
    }

    let unwrapped = unwrap_angles(&raw);
    let direction = detect_direction(&unwrapped, direction_probe);
    let sign = direction.sign();

    let start_progress = start_progress(sign * unwrapped[0], radii[0], reference);
    let shift = sign * start_progress - unwrapped[0];

    let mut points = Vec::with_capacity(pts.len());
    let mut envelope = f64::NEG_INFINITY;
    let mut held = 0usize;

    for ((p, &radius), &angle) in pts.iter().zip(&radii).zip(&unwrapped) {
        let progress = sign * (angle + shift);
        if progress < envelope {
            held += 1;
        } else {
            envelope = progress;
        }
        points.push(PolarPoint {
            x: p.x,
            y: p.y,
            radius,
            theta: sign * envelope,
            t: p.t,
        });
    }

    debug!(
        "Polar transform: {} points, direction={:?}, sweep={:.2} rad, held retrograde={}",
        points.len(),
        direction,
        envelope - start_progress,
        held
    );

    Ok(PolarTrace { points, direction })
}

const REFIT_ROUNDS: usize = 4;
/// Smallest LU pivot, relative to the largest, still treated as full rank.
const SINGULAR_PIVOT_RATIO: f64 = 1e-12;

/// Normal equations for the refit unknowns `[cx, cy, a, b]`.
type RefitMat = Matrix4<f64>;
type RefitVec = Vector4<f64>;

/// Least-squares fit of center, `a` and `b` to the trace.
///
/// Each round takes angles from the current estimate and solves the model
/// `x = cx + (a + b·p)·cos θ`, `y = cy + (a + b·p)·sin θ`, which is linear
/// in the four unknowns. Starts from `base`. Returns `None` when the fit is
/// unusable (singular, non-finite or `b <= 0`); the caller then keeps the
/// supplied reference.
pub fn fit_reference(
    trace: &CleanedTrace,
    base: &ReferenceSpiral,
    epsilon: f64,
    direction_probe: usize,
) -> SpiralResult<Option<ReferenceSpiral>> {
    if trace.len() < 4 {
        warn!("Reference refit skipped: only {} points", trace.len());
        return Ok(None);
    }

    let mut current = *base;
    for _ in 0..REFIT_ROUNDS {
        let polar = to_polar(trace, &current, epsilon, direction_probe)?;

        let mut normal = RefitMat::zeros();
        let mut rhs = RefitVec::zeros();
        for p in &polar.points {
            let progress = polar.progress(p.theta);
            let (sin, cos) = p.theta.sin_cos();
            let rows = [
                (RefitVec::new(1.0, 0.0, cos, progress * cos), p.x),
                (RefitVec::new(0.0, 1.0, sin, progress * sin), p.y),
            ];
            for (row, target) in rows {
                normal += row * row.transpose();
                rhs += row * target;
            }
        }

        let lu = normal.lu();
        let pivots = lu.u().diagonal().abs();
        if pivots.min() <= SINGULAR_PIVOT_RATIO * pivots.max() {
            warn!("Reference refit skipped: singular system");
            return Ok(None);
        }
        let Some(solution) = lu.solve(&rhs) else {
            warn!("Reference refit skipped: singular system");
            return Ok(None);
        };
        let (cx, cy, a, b) = (solution[0], solution[1], solution[2], solution[3]);
        if ![cx, cy, a, b].iter().all(|v| v.is_finite()) || b <= 0.0 {
            warn!("Reference refit rejected (a={:.4}, b={:.4})", a, b);
            return Ok(None);
        }

        current = ReferenceSpiral {
            center_x: cx,
            center_y: cy,
            a: a.max(0.0),
            b,
        };
    }

    debug!(
        "Reference refit: center=({:.3}, {:.3}), a={:.4}, b={:.4}",
        current.center_x, current.center_y, current.a, current.b
    );
    Ok(Some(current))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_delta_range() {
        assert!((wrap_delta(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((wrap_delta(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-12);
        assert_eq!(wrap_delta(PI), PI);
        assert_eq!(wrap_delta(-PI), PI);
    }

    #[test]
    fn test_unwrap_crosses_pi_boundary() {
        let raw = vec![Some(3.0), Some(-3.0), Some(-2.5)];
        let out = unwrap_angles(&raw);
        assert!((out[1] - (3.0 + (TAU - 6.0))).abs() < 1e-12);
        assert!(out[2] > out[1]);
    }

    #[test]
    fn test_start_turn_follows_radius() {
        let reference = ReferenceSpiral {
            center_x: 0.0,
            center_y: 0.0,
            a: 5.0,
            b: 10.0,
        };
        // Just below +x on the innermost turn.
        assert!((start_progress(-0.1, 4.0, &reference) + 0.1).abs() < 1e-12);
        // Same angle, one turn out.
        let p = start_progress(-0.1, 5.0 + 10.0 * (TAU - 0.1), &reference);
        assert!((p - (TAU - 0.1)).abs() < 1e-12);
        assert_eq!(start_progress(0.5, 5.0, &reference), 0.5);
    }

    #[test]
    fn test_radial_stroke_refit_is_singular() {
        let points: Vec<_> = (0..30)
            .map(|i| crate::trace::RawPoint::new(10.0 + 3.0 * i as f64, 0.0, i * 20))
            .collect();
        let cleaned = crate::trace::clean_trace(&points, 0.01, 2).unwrap();
        let base = ReferenceSpiral {
            center_x: 0.0,
            center_y: 0.0,
            a: 5.0,
            b: 10.0,
        };
        assert_eq!(fit_reference(&cleaned, &base, 0.01, 10).unwrap(), None);
    }

    #[test]
    fn test_dead_zone_holds_angle() {
        let raw = vec![None, Some(1.0), None, Some(1.5)];
        let out = unwrap_angles(&raw);
        assert_eq!(out, vec![1.0, 1.0, 1.0, 1.5]);
    }
}
