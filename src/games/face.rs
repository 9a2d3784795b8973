//! Divine mirror: face mesh overlay, presence moods and a random character match.

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};

use rand::{Rng, seq::IndexedRandom};
use serde::Serialize;

use super::{GameSession, draw_model_missing};
use crate::{
    pipeline::{LatestFrameChannel, overlay},
    recognizer::{LandmarkModel, detect_or_empty},
    robot::{Mood, RobotNotifier},
    types::Frame,
};

pub const DIVINE_CHARACTERS: [(&str, &str); 20] = [
    ("Shiva", "Transformation through stillness."),
    ("Vishnu", "Balance sustains the cosmos."),
    ("Krishna", "Wisdom hides behind playfulness."),
    ("Rama", "Dharma is your backbone."),
    ("Ganesha", "Obstacles yield to intelligence."),
    ("Hanuman", "Strength through devotion."),
    ("Durga", "Fearless protector of truth."),
    ("Kali", "Liberation through destruction."),
    ("Lakshmi", "Abundance flows where gratitude lives."),
    ("Saraswati", "Knowledge is the highest power."),
    ("Parvati", "Gentleness with inner fire."),
    ("Arjuna", "Focus is your greatest weapon."),
    ("Karna", "Loyalty beyond circumstance."),
    ("Bhishma", "Sacrifice defines destiny."),
    ("Ravana", "Power without restraint destroys itself."),
    ("Sita", "Unshaken purity and resilience."),
    ("Narada", "Truth travels faster than silence."),
    ("Surya", "Radiance fuels all action."),
    ("Yama", "Discipline defines balance."),
    ("Indra", "Leadership is tested by chaos."),
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FaceFinding {
    pub name: &'static str,
    pub confidence: String,
    pub text: &'static str,
}

impl FaceFinding {
    fn nobody() -> Self {
        Self {
            name: "No Face Detected",
            confidence: "—".to_string(),
            text: "Look into the divine mirror to reveal your form.",
        }
    }
}

pub struct FaceGame {
    channel: Arc<LatestFrameChannel>,
    model: Arc<dyn LandmarkModel>,
    robot: Arc<dyn RobotNotifier>,
    present: Mutex<bool>,
}

impl FaceGame {
    pub fn new(
        channel: Arc<LatestFrameChannel>,
        model: Arc<dyn LandmarkModel>,
        robot: Arc<dyn RobotNotifier>,
    ) -> Self {
        Self {
            channel,
            model,
            robot,
            present: Mutex::new(false),
        }
    }

    pub fn channel(&self) -> &Arc<LatestFrameChannel> {
        &self.channel
    }

    pub fn session(self: &Arc<Self>) -> FaceSession {
        FaceSession {
            game: self.clone(),
            last_presence: None,
            fps: FpsCounter::default(),
        }
    }

    pub fn is_present(&self) -> bool {
        *self.lock_present()
    }

    pub fn find(&self) -> FaceFinding {
        self.find_with(&mut rand::rng())
    }

    pub fn find_with<R: Rng + ?Sized>(&self, rng: &mut R) -> FaceFinding {
        if !self.is_present() {
            return FaceFinding::nobody();
        }
        match DIVINE_CHARACTERS.choose(rng) {
            Some(&(name, text)) => FaceFinding {
                name,
                confidence: format!("{}%", rng.random_range(75..=99)),
                text,
            },
            None => FaceFinding::nobody(),
        }
    }

    fn lock_present(&self) -> std::sync::MutexGuard<'_, bool> {
        self.present
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Default)]
struct FpsCounter {
    prev: Option<Instant>,
    fps: u32,
}

impl FpsCounter {
    fn tick(&mut self, now: Instant) -> u32 {
        if let Some(prev) = self.prev {
            let dt = now.duration_since(prev).as_secs_f32();
            if dt > 0.0 {
                self.fps = (1.0 / dt).round() as u32;
            }
        }
        self.prev = Some(now);
        self.fps
    }
}

pub struct FaceSession {
    game: Arc<FaceGame>,
    last_presence: Option<bool>,
    fps: FpsCounter,
}

impl FaceSession {
    /// Record this tick's presence and return the mood sent on a change.
    /// The first observation always counts as a change.
    pub fn observe(&mut self, present: bool) -> Option<Mood> {
        *self.game.lock_present() = present;

        if self.last_presence == Some(present) {
            return None;
        }
        self.last_presence = Some(present);
        let mood = if present { Mood::Neutral } else { Mood::Sleeping };
        self.game.robot.notify(mood.clone());
        Some(mood)
    }
}

impl GameSession for FaceSession {
    fn step(&mut self, mut frame: Frame) -> Frame {
        let faces = detect_or_empty(self.game.model.as_ref(), &frame);
        if let Some(face) = faces.first() {
            for (x, y) in face.projected(frame.width, frame.height) {
                overlay::draw_circle(&mut frame, (x as i32, y as i32), 1, overlay::GOLD);
            }
        }
        self.observe(!faces.is_empty());

        let fps = self.fps.tick(Instant::now());
        overlay::draw_text(&mut frame, &format!("FPS: {fps}"), (20, 40), 3, overlay::GOLD);
        if !self.game.model.is_available() {
            draw_model_missing(&mut frame, self.game.model.as_ref());
        }
        frame
    }
}
