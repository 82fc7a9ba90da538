use crate::error::{SpiralError, SpiralResult};
use crate::geometry::{euclidean_dist, CanvasGeometry, ReferenceSpiral};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// One pointer sample from the drawing surface. `t` is milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    pub x: f64,
    pub y: f64,
    pub t: u64,
}

impl RawPoint {
    pub fn new(x: f64, y: f64, t: u64) -> Self {
        Self { x, y, t }
    }
}

/// Time-ordered, de-duplicated trace whose first sample sits at `t == 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedTrace {
    points: Vec<RawPoint>,
}

impl CleanedTrace {
    pub fn points(&self) -> &[RawPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn duration_ms(&self) -> u64 {
        self.points.last().map(|p| p.t).unwrap_or(0)
    }

    pub fn path_length(&self) -> f64 {
        self.segment_lengths().iter().sum()
    }

    pub fn segment_lengths(&self) -> Vec<f64> {
        self.points
            .windows(2)
            .map(|w| euclidean_dist(w[0].x, w[0].y, w[1].x, w[1].y))
            .collect()
    }
}

/// Drops invalid, out-of-order and coincident samples, then re-bases time.
pub fn clean_trace(
    points: &[RawPoint],
    epsilon: f64,
    min_points: usize,
) -> SpiralResult<CleanedTrace> {
    let required = min_points.max(2);
    let mut kept: Vec<RawPoint> = Vec::with_capacity(points.len());
    let mut dropped_invalid = 0usize;
    let mut dropped_time = 0usize;
    let mut dropped_coincident = 0usize;

    for p in points {
        if !p.x.is_finite() || !p.y.is_finite() {
            dropped_invalid += 1;
            continue;
        }
        if let Some(last) = kept.last() {
            if p.t <= last.t {
                dropped_time += 1;
                continue;
            }
            if euclidean_dist(p.x, p.y, last.x, last.y) < epsilon {
                dropped_coincident += 1;
                continue;
            }
        }
        kept.push(*p);
    }

    debug!(
        "Trace cleaner: {} in, {} kept (invalid={}, time={}, coincident={})",
        points.len(),
        kept.len(),
        dropped_invalid,
        dropped_time,
        dropped_coincident
    );

    if kept.len() < required {
        return Err(SpiralError::InsufficientData {
            kept: kept.len(),
            required,
        });
    }

    let t0 = kept[0].t;
    for p in kept.iter_mut() {
        p.t -= t0;
    }

    Ok(CleanedTrace { points: kept })
}

// --- FILE FORMAT ---

#[derive(Debug, Clone, Deserialize)]
struct PointRecord {
    #[serde(alias = "x []")]
    x: f64,
    #[serde(alias = "y []")]
    y: f64,
    #[serde(alias = "t_ms", alias = "t [ms]")]
    t: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct TraceBody {
    points: Vec<PointRecord>,
    #[serde(default)]
    reference: Option<ReferenceSpiral>,
    #[serde(default)]
    canvas: Option<CanvasGeometry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TraceDocument {
    Wrapped { data: TraceBody },
    Flat(TraceBody),
}

/// A recorded drawing session as exported by the drawing surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceFile {
    pub points: Vec<RawPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<ReferenceSpiral>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas: Option<CanvasGeometry>,
}

impl TraceFile {
    pub fn from_json_str(content: &str) -> SpiralResult<Self> {
        let body = match serde_json::from_str::<TraceDocument>(content)? {
            TraceDocument::Wrapped { data } => data,
            TraceDocument::Flat(body) => body,
        };

        let mut points = Vec::with_capacity(body.points.len());
        for (idx, rec) in body.points.into_iter().enumerate() {
            if !rec.t.is_finite() || rec.t < 0.0 {
                return Err(SpiralError::Validation(format!(
                    "Point {} has invalid timestamp {}",
                    idx, rec.t
                )));
            }
            points.push(RawPoint {
                x: rec.x,
                y: rec.y,
                t: rec.t.round() as u64,
            });
        }

        Ok(Self {
            points,
            reference: body.reference,
            canvas: body.canvas,
        })
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> SpiralResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> SpiralResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Embedded reference, else one derived from the embedded canvas.
    pub fn resolve_reference(&self) -> SpiralResult<Option<ReferenceSpiral>> {
        if let Some(reference) = self.reference {
            reference.validate()?;
            return Ok(Some(reference));
        }
        self.canvas
            .as_ref()
            .map(ReferenceSpiral::from_canvas)
            .transpose()
    }
}
