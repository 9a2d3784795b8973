//! Rock-paper-scissors against the robot.

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, Instant},
};

use rand::seq::IndexedRandom;
use serde::Serialize;

use super::{GameSession, draw_model_missing};
use crate::{
    gesture::{classify_move, resolve_winner},
    pipeline::{LatestFrameChannel, imaging, overlay},
    recognizer::{LandmarkModel, detect_or_empty},
    robot::{Mood, RobotNotifier},
    types::{Frame, LandmarkSet, Move, Winner},
};

pub const COUNTDOWN: Duration = Duration::from_secs(3);
const BOX_MARGIN: i32 = 30;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoundState {
    #[default]
    Idle,
    Countdown,
    Detecting,
    Result,
}

/// The single live round. Transitions are the only writers.
#[derive(Clone, Debug, Default)]
pub struct RpsRound {
    state: RoundState,
    countdown_start: Option<Instant>,
    player: Option<Move>,
    computer: Option<Move>,
    winner: Option<Winner>,
}

impl RpsRound {
    pub fn state(&self) -> RoundState {
        self.state
    }

    /// IDLE -> COUNTDOWN. Returns whether the state changed.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.state != RoundState::Idle {
            return false;
        }
        self.state = RoundState::Countdown;
        self.countdown_start = Some(now);
        true
    }

    /// Move COUNTDOWN -> DETECTING once the countdown has run out. While it is
    /// still running, returns the digit to show (3, 2, 1).
    pub fn advance(&mut self, now: Instant) -> Option<u64> {
        if self.state != RoundState::Countdown {
            return None;
        }
        let elapsed = self
            .countdown_start
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or(COUNTDOWN);
        if elapsed >= COUNTDOWN {
            self.state = RoundState::Detecting;
            return None;
        }
        Some(COUNTDOWN.as_secs() - elapsed.as_secs())
    }

    /// DETECTING -> RESULT on the first playable move. Moves and winner are
    /// set together, exactly once per round.
    pub fn resolve(&mut self, player: Move, computer: Move) -> Option<Winner> {
        if self.state != RoundState::Detecting || !player.is_playable() || !computer.is_playable() {
            return None;
        }
        let winner = resolve_winner(player, computer);
        self.player = Some(player);
        self.computer = Some(computer);
        self.winner = Some(winner);
        self.state = RoundState::Result;
        Some(winner)
    }

    /// Any state -> IDLE, clearing the round. Returns whether anything changed.
    pub fn reset(&mut self) -> bool {
        if self.state == RoundState::Idle {
            return false;
        }
        *self = Self::default();
        true
    }

    pub fn status(&self) -> RpsStatus {
        RpsStatus {
            state: self.state,
            player: self.player,
            computer: self.computer,
            winner: self.winner,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RpsStatus {
    pub state: RoundState,
    pub player: Option<Move>,
    pub computer: Option<Move>,
    pub winner: Option<Winner>,
}

pub fn mood_for(winner: Winner) -> Mood {
    match winner {
        Winner::Computer => Mood::Loving,
        Winner::Player => Mood::Sad,
        Winner::Tie => Mood::Neutral,
    }
}

pub struct RpsGame {
    channel: Arc<LatestFrameChannel>,
    model: Arc<dyn LandmarkModel>,
    robot: Arc<dyn RobotNotifier>,
    round: Mutex<RpsRound>,
}

impl RpsGame {
    pub fn new(
        channel: Arc<LatestFrameChannel>,
        model: Arc<dyn LandmarkModel>,
        robot: Arc<dyn RobotNotifier>,
    ) -> Self {
        Self {
            channel,
            model,
            robot,
            round: Mutex::new(RpsRound::default()),
        }
    }

    pub fn channel(&self) -> &Arc<LatestFrameChannel> {
        &self.channel
    }

    pub fn session(self: &Arc<Self>) -> RpsSession {
        RpsSession { game: self.clone() }
    }

    pub fn start(&self, now: Instant) -> bool {
        let changed = self.lock_round().start(now);
        if changed {
            log::info!("rps countdown started");
        }
        changed
    }

    /// The robot is told under the round lock, so it always ends on the
    /// mood of the latest transition.
    pub fn reset(&self) -> bool {
        let mut round = self.lock_round();
        let changed = round.reset();
        if changed {
            self.robot.notify(Mood::Neutral);
        }
        changed
    }

    pub fn status(&self) -> RpsStatus {
        self.lock_round().status()
    }

    /// Countdown bookkeeping for one video tick; see [`RpsRound::advance`].
    pub fn tick(&self, now: Instant) -> Option<u64> {
        self.lock_round().advance(now)
    }

    /// Offer the player's detected move against a given computer move.
    pub fn play(&self, player: Move, computer: Move) -> Option<Winner> {
        let mut round = self.lock_round();
        let winner = round.resolve(player, computer)?;
        self.robot.notify(mood_for(winner));
        drop(round);

        log::info!(
            "rps round: player {} vs computer {} -> {winner:?}",
            player.label(),
            computer.label()
        );
        Some(winner)
    }

    /// Offer the player's move; the computer picks uniformly at random.
    pub fn offer_move(&self, player: Move) -> Option<Winner> {
        let computer = Move::PLAYABLE
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(Move::Rock);
        self.play(player, computer)
    }

    fn lock_round(&self) -> MutexGuard<'_, RpsRound> {
        self.round
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct RpsSession {
    game: Arc<RpsGame>,
}

impl GameSession for RpsSession {
    fn step(&mut self, mut frame: Frame) -> Frame {
        imaging::mirror(&mut frame);

        let hands = detect_or_empty(self.game.model.as_ref(), &frame);
        if let Some(hand) = hands.first() {
            let detected = classify_move(hand);
            draw_hand(&mut frame, hand, detected);
            self.game.offer_move(detected);
        }

        if let Some(digit) = self.game.tick(Instant::now()) {
            draw_countdown(&mut frame, digit);
        }
        if !self.game.model.is_available() {
            draw_model_missing(&mut frame, self.game.model.as_ref());
        }
        frame
    }
}

fn draw_hand(frame: &mut Frame, hand: &LandmarkSet, detected: Move) {
    let points = hand.projected(frame.width, frame.height);
    let (w, h) = (frame.width as i32, frame.height as i32);

    let xs = points.iter().map(|p| p.0 as i32);
    let ys = points.iter().map(|p| p.1 as i32);
    let (Some(min_x), Some(max_x)) = (xs.clone().min(), xs.max()) else {
        return;
    };
    let (Some(min_y), Some(max_y)) = (ys.clone().min(), ys.max()) else {
        return;
    };
    let top_left = ((min_x - BOX_MARGIN).max(0), (min_y - BOX_MARGIN).max(0));
    let bottom_right = ((max_x + BOX_MARGIN).min(w), (max_y + BOX_MARGIN).min(h));

    overlay::draw_rect(frame, top_left, bottom_right, overlay::AMBER, 2);
    overlay::fill_rect(
        frame,
        (top_left.0, top_left.1 - 35),
        (top_left.0 + 110, top_left.1),
        overlay::AMBER,
    );
    overlay::draw_text(
        frame,
        detected.label(),
        (top_left.0 + 5, top_left.1 - 26),
        2,
        overlay::BLACK,
    );
    overlay::draw_skeleton(frame, &points, overlay::WHITE, overlay::AMBER);
}

fn draw_countdown(frame: &mut Frame, digit: u64) {
    let text = digit.to_string();
    let scale = 12;
    let x = (frame.width as i32 - overlay::text_width(&text, scale)) / 2;
    let y = (frame.height as i32 - overlay::text_height(scale)) / 2;
    overlay::draw_text(frame, &text, (x, y), scale, overlay::SKY);
}
