use crate::error::{SpiralError, SpiralResult};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fs;
use std::path::Path;

/// The ideal Archimedean spiral `r(θ) = a + b·θ` around a fixed center.
///
/// `a` is the start radius, `b` the growth per radian. Immutable once a
/// session starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSpiral {
    #[serde(alias = "centerX")]
    pub center_x: f64,
    #[serde(alias = "centerY")]
    pub center_y: f64,
    pub a: f64,
    pub b: f64,
}

/// Canvas layout the reference is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasGeometry {
    pub center_x: f64,
    pub center_y: f64,
    pub max_radius: f64,
    pub turns: f64,
    #[serde(default)]
    pub start_radius: f64,
}

impl ReferenceSpiral {
    pub fn new(center_x: f64, center_y: f64, a: f64, b: f64) -> SpiralResult<Self> {
        let spiral = Self {
            center_x,
            center_y,
            a,
            b,
        };
        spiral.validate()?;
        Ok(spiral)
    }

    pub fn from_canvas(canvas: &CanvasGeometry) -> SpiralResult<Self> {
        let values = [
            canvas.center_x,
            canvas.center_y,
            canvas.max_radius,
            canvas.turns,
            canvas.start_radius,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(SpiralError::Config(
                "Canvas geometry contains non-finite values".to_string(),
            ));
        }
        if canvas.turns <= 0.0 {
            return Err(SpiralError::Config(format!(
                "Canvas turns must be positive, got {}",
                canvas.turns
            )));
        }
        if canvas.max_radius <= canvas.start_radius {
            return Err(SpiralError::Config(format!(
                "Canvas max_radius ({}) must exceed start_radius ({})",
                canvas.max_radius, canvas.start_radius
            )));
        }

        let b = (canvas.max_radius - canvas.start_radius) / (canvas.turns * TAU);
        Self::new(canvas.center_x, canvas.center_y, canvas.start_radius, b)
    }

    pub fn validate(&self) -> SpiralResult<()> {
        if ![self.center_x, self.center_y, self.a, self.b]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(SpiralError::Config(
                "Reference spiral contains non-finite values".to_string(),
            ));
        }
        if self.a < 0.0 {
            return Err(SpiralError::Config(format!(
                "Reference start radius must be non-negative, got {}",
                self.a
            )));
        }
        if self.b <= 0.0 {
            return Err(SpiralError::Config(format!(
                "Reference growth rate must be positive, got {}",
                self.b
            )));
        }
        Ok(())
    }

    /// Ideal radius at a progress angle (radians travelled from θ = 0).
    #[inline(always)]
    pub fn ideal_radius(&self, progress: f64) -> f64 {
        self.a + self.b * progress
    }

    /// Polar area swept by the ideal curve between two progress angles.
    pub fn swept_area(&self, from: f64, to: f64) -> f64 {
        let (a, b) = (self.a, self.b);
        0.5 * (b * b * (to.powi(3) - from.powi(3)) / 3.0
            + a * b * (to.powi(2) - from.powi(2))
            + a * a * (to - from))
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> SpiralResult<Self> {
        let content = fs::read_to_string(path)?;
        let spiral: Self = serde_json::from_str(&content)?;
        spiral.validate()?;
        Ok(spiral)
    }
}

#[inline(always)]
pub fn euclidean_dist(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    let dx = x1 - x2;
    let dy = y1 - y2;
    (dx * dx + dy * dy).sqrt()
}
