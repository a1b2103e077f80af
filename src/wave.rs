//! # Day Arc Wave Geometry
//!
//! Maps a progress fraction in `[0, 1]` onto one full period of a sine wave
//! inscribed in an ellipse's bounding box:
//!
//! ```text
//! x = cx - rx + progress * 2 * rx
//! y = cy - ry * sin(progress * 2π - π/2)
//! ```
//!
//! Progress 0 and 1 sit at the trough (`cy + ry`, screen coordinates grow
//! downwards so that is visually below centre) and progress 0.5 at the crest
//! (`cy - ry`). The sweep reads night → day → night.

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, TAU};

/// Samples used by [`path_between`] when the caller has no preference.
pub const DEFAULT_PATH_STEPS: usize = 30;

/// Bounding ellipse of the wave, in drawing units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub cx: f64,
    pub cy: f64,
    pub rx: f64,
    pub ry: f64,
}

impl Ellipse {
    pub fn new(cx: f64, cy: f64, rx: f64, ry: f64) -> Self {
        Self { cx, cy, rx, ry }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Position on the wave for a progress fraction.
///
/// # Example
/// ```
/// use prayer_arc_lib::wave::{position_at, Ellipse};
///
/// let e = Ellipse::new(185.0, 170.0, 185.0, 50.0);
/// let start = position_at(0.0, &e);
/// assert_eq!(start.x, 0.0);
/// assert!((start.y - 220.0).abs() < 1e-9);
/// ```
pub fn position_at(progress: f64, ellipse: &Ellipse) -> Point {
    let x = ellipse.cx - ellipse.rx + progress * 2.0 * ellipse.rx;
    let y = ellipse.cy - ellipse.ry * (progress * TAU - FRAC_PI_2).sin();
    Point { x, y }
}

/// Sample the wave between two progress values, both inclusive.
///
/// Returns `steps + 1` points ordered from `start` to `end`, so a reversed
/// range walks the wave right to left and `start == end` yields a repeated
/// single point. A `steps` of zero is treated as one.
pub fn path_between(start: f64, end: f64, ellipse: &Ellipse, steps: usize) -> Vec<Point> {
    let steps = steps.max(1);
    (0..=steps)
        .map(|i| {
            let p = start + (i as f64 / steps as f64) * (end - start);
            position_at(p, ellipse)
        })
        .collect()
}
