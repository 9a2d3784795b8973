//! Air drawing: trace a shape with the index finger, lift the pen, get a weapon.

use std::{
    mem,
    sync::{Arc, Mutex},
};

use serde::Serialize;

use super::{GameSession, draw_model_missing};
use crate::{
    gesture::is_pen_down,
    pipeline::{LatestFrameChannel, imaging, overlay},
    recognizer::{LandmarkModel, detect_or_empty},
    robot::{Mood, RobotNotifier},
    stroke::classify_stroke,
    types::{Frame, LandmarkSet, ShapeLabel, ShapeResult, hand},
};

/// Inference runs on a downscaled copy of the frame.
pub const PROCESS_SIZE: (u32, u32) = (320, 240);
/// A rejected stroke longer than this counts as a failed attempt.
pub const WRONG_MIN_POINTS: usize = 20;

/// Latest recognised shape as served to the browser.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AirResult {
    pub shape: ShapeLabel,
    pub name: &'static str,
    pub figure: &'static str,
    pub description: &'static str,
    pub confidence: f64,
}

impl From<ShapeResult> for AirResult {
    fn from(result: ShapeResult) -> Self {
        let (name, figure, description) = result.label.lore();
        Self {
            shape: result.label,
            name,
            figure,
            description,
            confidence: (f64::from(result.confidence) * 100.0).round() / 100.0,
        }
    }
}

/// What happened when the pen was lifted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StrokeOutcome {
    Recognised(ShapeResult),
    Rejected { points: usize },
}

pub struct AirGame {
    channel: Arc<LatestFrameChannel>,
    model: Arc<dyn LandmarkModel>,
    robot: Arc<dyn RobotNotifier>,
    result: Mutex<Option<ShapeResult>>,
}

impl AirGame {
    pub fn new(
        channel: Arc<LatestFrameChannel>,
        model: Arc<dyn LandmarkModel>,
        robot: Arc<dyn RobotNotifier>,
    ) -> Self {
        Self {
            channel,
            model,
            robot,
            result: Mutex::new(None),
        }
    }

    pub fn channel(&self) -> &Arc<LatestFrameChannel> {
        &self.channel
    }

    pub fn session(self: &Arc<Self>) -> AirSession {
        AirSession {
            game: self.clone(),
            stroke: Vec::new(),
            drawing: false,
        }
    }

    pub fn result(&self) -> Option<AirResult> {
        (*self.lock_result()).map(AirResult::from)
    }

    fn finish_stroke(&self, points: &[(f32, f32)]) -> StrokeOutcome {
        match classify_stroke(points) {
            Some(shape) => {
                *self.lock_result() = Some(shape);
                log::info!(
                    "stroke of {} points recognised as {} ({:.2})",
                    points.len(),
                    shape.label.as_str(),
                    shape.confidence
                );
                self.robot.notify(Mood::Correct);
                StrokeOutcome::Recognised(shape)
            }
            None => {
                log::debug!("stroke of {} points not recognised", points.len());
                if points.len() > WRONG_MIN_POINTS {
                    self.robot.notify(Mood::Wrong);
                }
                StrokeOutcome::Rejected {
                    points: points.len(),
                }
            }
        }
    }

    fn lock_result(&self) -> std::sync::MutexGuard<'_, Option<ShapeResult>> {
        self.result
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// One viewer's drawing state. The stroke lives here, so only this session's
/// loop ever appends to it.
pub struct AirSession {
    game: Arc<AirGame>,
    stroke: Vec<(f32, f32)>,
    drawing: bool,
}

impl AirSession {
    pub fn stroke(&self) -> &[(f32, f32)] {
        &self.stroke
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    /// Feed one tick of hand tracking. `detected` is `None` when no hand is
    /// visible; fingertip positions are scaled to `width`x`height` pixels.
    pub fn observe(
        &mut self,
        detected: Option<&LandmarkSet>,
        width: u32,
        height: u32,
    ) -> Option<StrokeOutcome> {
        let tip = detected
            .filter(|set| is_pen_down(set))
            .and_then(|set| set.get(hand::INDEX_TIP))
            .map(|tip| tip.to_pixels(width, height));

        match tip {
            Some(point) => {
                self.drawing = true;
                self.stroke.push(point);
                None
            }
            None if self.drawing => {
                self.drawing = false;
                let points = mem::take(&mut self.stroke);
                Some(self.game.finish_stroke(&points))
            }
            None => None,
        }
    }
}

impl GameSession for AirSession {
    fn step(&mut self, mut frame: Frame) -> Frame {
        imaging::mirror(&mut frame);

        let small = match imaging::resize(&frame, PROCESS_SIZE.0, PROCESS_SIZE.1) {
            Ok(small) => small,
            Err(err) => {
                log::warn!("air frame resize failed: {err:?}");
                frame.clone()
            }
        };
        let hands = detect_or_empty(self.game.model.as_ref(), &small);
        self.observe(hands.first(), frame.width, frame.height);

        overlay::draw_polyline(&mut frame, &self.stroke, overlay::GOLD, 2);
        if !self.game.model.is_available() {
            draw_model_missing(&mut frame, self.game.model.as_ref());
        }
        frame
    }
}
