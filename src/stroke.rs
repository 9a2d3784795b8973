//! Freehand stroke classification.
//!
//! A stroke is the fingertip trajectory collected while the pen is down. It is
//! reduced to a handful of cheap geometric measurements (straightness, bounding
//! box roundness, turning angles) and mapped onto one of four shapes.

use crate::types::{ShapeLabel, ShapeResult};

pub const MIN_STROKE_POINTS: usize = 30;
pub const MIN_PATH_LENGTH: f32 = 10.0;
const MAX_SAMPLED_POINTS: usize = 15;
const SHARP_TURN_RAD: f32 = 1.0;
const ZIGZAG_TOTAL_TURN_RAD: f32 = 2.5;
const CLOSED_LINEARITY: f32 = 0.25;
const STRAIGHT_LINEARITY: f32 = 0.90;
const ROUND_ASPECT: f32 = 0.5;

const CIRCLE_CONFIDENCE: f32 = 0.95;
const FLAT_CIRCLE_CONFIDENCE: f32 = 0.85;
const LINE_CONFIDENCE: f32 = 0.92;
const ZIGZAG_CONFIDENCE: f32 = 0.88;
const ARC_CONFIDENCE: f32 = 0.85;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeMetrics {
    pub path_length: f32,
    pub chord: f32,
    /// chord / path length: 1.0 for a straight stroke, close to 0.0 for a closed loop.
    pub linearity: f32,
    pub aspect: f32,
    pub sharp_turns: usize,
    pub total_turning: f32,
}

/// Measure a stroke. Returns `None` for fewer than two points.
pub fn measure_stroke(points: &[(f32, f32)]) -> Option<StrokeMetrics> {
    if points.len() < 2 {
        return None;
    }

    let path_length: f32 = points.windows(2).map(|w| distance(w[0], w[1])).sum();
    let chord = distance(points[0], points[points.len() - 1]);
    let linearity = if path_length > 0.0 {
        chord / path_length
    } else {
        0.0
    };

    let (min_x, max_x, min_y, max_y) = points.iter().fold(
        (f32::MAX, f32::MIN, f32::MAX, f32::MIN),
        |acc, &(x, y)| (acc.0.min(x), acc.1.max(x), acc.2.min(y), acc.3.max(y)),
    );
    let width = max_x - min_x;
    let height = max_y - min_y;
    let aspect = width.min(height) / (width.max(height) + 1e-5);

    let (sharp_turns, total_turning) = turning(points);

    Some(StrokeMetrics {
        path_length,
        chord,
        linearity,
        aspect,
        sharp_turns,
        total_turning,
    })
}

/// Classify a completed stroke. `None` means no shape (too short or too small);
/// its confidence is 0.0.
pub fn classify_stroke(points: &[(f32, f32)]) -> Option<ShapeResult> {
    if points.len() < MIN_STROKE_POINTS {
        return None;
    }

    let metrics = measure_stroke(points)?;
    if metrics.path_length < MIN_PATH_LENGTH {
        return None;
    }

    let (label, confidence) = if metrics.linearity < CLOSED_LINEARITY {
        // Flattened loops still count as circles, with less confidence.
        if metrics.aspect > ROUND_ASPECT {
            (ShapeLabel::Circle, CIRCLE_CONFIDENCE)
        } else {
            (ShapeLabel::Circle, FLAT_CIRCLE_CONFIDENCE)
        }
    } else if metrics.linearity > STRAIGHT_LINEARITY {
        (ShapeLabel::Line, LINE_CONFIDENCE)
    } else if metrics.sharp_turns >= 1 || metrics.total_turning > ZIGZAG_TOTAL_TURN_RAD {
        (ShapeLabel::Zigzag, ZIGZAG_CONFIDENCE)
    } else {
        (ShapeLabel::Arc, ARC_CONFIDENCE)
    };

    log::debug!("stroke of {} points -> {label:?} ({metrics:?})", points.len());

    Some(ShapeResult { label, confidence })
}

/// Sharp turn count and summed absolute turning angle over an evenly
/// sub-sampled copy of the stroke.
fn turning(points: &[(f32, f32)]) -> (usize, f32) {
    let step = points.len().div_ceil(MAX_SAMPLED_POINTS).max(1);
    let sampled: Vec<(f32, f32)> = points.iter().copied().step_by(step).collect();
    if sampled.len() < 3 {
        return (0, 0.0);
    }

    let tangents: Vec<(f32, f32)> = sampled
        .windows(2)
        .map(|w| {
            let (dx, dy) = (w[1].0 - w[0].0, w[1].1 - w[0].1);
            let len = dx.hypot(dy) + 1e-6;
            (dx / len, dy / len)
        })
        .collect();

    let mut sharp = 0;
    let mut total = 0.0;
    for pair in tangents.windows(2) {
        let dot = (pair[0].0 * pair[1].0 + pair[0].1 * pair[1].1).clamp(-1.0, 1.0);
        let angle = dot.acos();
        total += angle;
        if angle > SHARP_TURN_RAD {
            sharp += 1;
        }
    }

    (sharp, total)
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    (a.0 - b.0).hypot(a.1 - b.1)
}
