//! End-to-end checks: fake camera -> broadcaster -> game loops -> HTTP.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};

use axum::{
    body::{Body, to_bytes},
    http::Request,
};
use serde_json::{Value, json};
use tower::ServiceExt;

use gesture_arcade::{
    games::{Arcade, FrameSink, GameChannels, GameSession, run_stream},
    pipeline::{BroadcasterConfig, CaptureError, CaptureSource, FrameBroadcaster},
    recognizer::{LandmarkModel, UnavailableModel},
    robot::{Mood, RobotNotifier},
    types::{Frame, Landmark, LandmarkSet, Move, hand},
    web,
};

#[derive(Default)]
struct Recorder(Mutex<Vec<Mood>>);

impl Recorder {
    fn moods(&self) -> Vec<Mood> {
        self.0.lock().unwrap().clone()
    }
}

impl RobotNotifier for Recorder {
    fn notify(&self, mood: Mood) {
        self.0.lock().unwrap().push(mood);
    }
}

/// Returns one scripted detection per call; an exhausted script sees no hand.
struct ScriptedModel {
    script: Mutex<VecDeque<Option<LandmarkSet>>>,
}

impl ScriptedModel {
    fn new(script: impl IntoIterator<Item = Option<LandmarkSet>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
        }
    }
}

impl LandmarkModel for ScriptedModel {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&self, _frame: &Frame) -> anyhow::Result<Vec<LandmarkSet>> {
        let next = self.script.lock().unwrap().pop_front().flatten();
        Ok(next.into_iter().collect())
    }
}

/// Always shows the same hand.
struct SteadyHand(LandmarkSet);

impl LandmarkModel for SteadyHand {
    fn name(&self) -> &'static str {
        "steady"
    }

    fn detect(&self, _frame: &Frame) -> anyhow::Result<Vec<LandmarkSet>> {
        Ok(vec![self.0.clone()])
    }
}

struct FakeCamera {
    open: bool,
}

impl CaptureSource for FakeCamera {
    fn open(&mut self) -> Result<(), CaptureError> {
        self.open = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn read(&mut self) -> Result<Frame, CaptureError> {
        thread::sleep(Duration::from_millis(2));
        Ok(Frame::blank(160, 120))
    }

    fn release(&mut self) {
        self.open = false;
    }
}

/// Upright hand with the wrist at (`wrist_x`, 0.9); `fingers` are index..pinky.
fn hand_at(wrist_x: f32, thumb_open: bool, fingers: [bool; 4]) -> LandmarkSet {
    let wrist_y = 0.9;
    let at = |dx: f32, dy: f32| Landmark::new(wrist_x + dx, wrist_y + dy);
    let mut points = vec![at(0.0, 0.0); hand::NUM_LANDMARKS];

    points[1] = at(-0.06, -0.05);
    points[2] = at(-0.09, -0.12);
    points[hand::THUMB_IP] = at(-0.10, -0.20);
    points[hand::THUMB_TIP] = if thumb_open {
        at(-0.20, -0.25)
    } else {
        at(0.05, -0.20)
    };
    for (finger, (&open, dx)) in fingers.iter().zip([-0.05, 0.0, 0.05, 0.10]).enumerate() {
        let mcp = 5 + finger * 4;
        points[mcp] = at(dx, -0.20);
        points[mcp + 1] = at(dx, -0.30);
        let (dip, tip) = if open { (-0.40, -0.50) } else { (-0.24, -0.16) };
        points[mcp + 2] = at(dx, dip);
        points[mcp + 3] = at(dx, tip);
    }
    LandmarkSet::new(points)
}

fn arcade_with(hand: Arc<dyn LandmarkModel>, robot: Arc<Recorder>) -> (Arc<Arcade>, GameChannels) {
    let channels = GameChannels::new();
    let arcade = Arcade::new(
        channels.clone(),
        Default::default(),
        hand,
        Arc::new(UnavailableModel::new("face")),
        robot,
    );
    (Arc::new(arcade), channels)
}

/// Sink that stops once `done` says so, or after `limit` parts.
struct UntilDone<F: Fn() -> bool> {
    done: F,
    sent: usize,
    limit: usize,
}

impl<F: Fn() -> bool> FrameSink for UntilDone<F> {
    fn send(&mut self, _part: Vec<u8>) -> bool {
        self.sent += 1;
        self.sent < self.limit && !(self.done)()
    }
}

async fn get_json(app: axum::Router, uri: &str) -> Value {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[test]
fn horizontal_pointing_trace_becomes_a_line() {
    let mut script: Vec<Option<LandmarkSet>> = (0..30)
        .map(|i| Some(hand_at(0.2 + i as f32 * 0.015, false, [true, false, false, false])))
        .collect();
    script.push(None);

    let robot = Arc::new(Recorder::default());
    let (arcade, _channels) = arcade_with(Arc::new(ScriptedModel::new(script)), robot.clone());

    let mut session = arcade.air.session();
    for _ in 0..31 {
        session.step(Frame::blank(640, 480));
    }

    let result = arcade.air.result().expect("shape stored");
    assert_eq!(result.shape.as_str(), "LINE");
    assert_eq!(result.confidence, 0.92);
    assert_eq!(robot.moods(), vec![Mood::Correct]);
}

#[test]
fn live_pipeline_delivers_the_air_result() {
    let mut script: Vec<Option<LandmarkSet>> = (0..30)
        .map(|i| Some(hand_at(0.2 + i as f32 * 0.015, true, [true, false, false, false])))
        .collect();
    script.push(None);

    let robot = Arc::new(Recorder::default());
    let (arcade, channels) = arcade_with(Arc::new(ScriptedModel::new(script)), robot.clone());
    let broadcaster = FrameBroadcaster::spawn(
        || FakeCamera { open: false },
        channels.all(),
        BroadcasterConfig::default(),
    );

    let mut session = arcade.air.session();
    let watched = robot.clone();
    let mut sink = UntilDone {
        done: move || !watched.moods().is_empty(),
        sent: 0,
        limit: 500,
    };
    run_stream(&mut session, channels.air.as_ref(), &broadcaster.status(), &mut sink);
    broadcaster.stop();

    assert_eq!(robot.moods(), vec![Mood::Correct]);

    let body = tokio::runtime::Runtime::new()
        .unwrap()
        .block_on(get_json(web::router(arcade), "/air/result"));
    assert_eq!(
        body,
        json!({
            "shape": "LINE",
            "name": "Nandaka",
            "figure": "Vishnu",
            "description": "The divine sword of preservation",
            "confidence": 0.92
        })
    );
}

#[test]
fn rps_round_resolves_on_a_fist_after_the_countdown() {
    let robot = Arc::new(Recorder::default());
    let fist = hand_at(0.5, false, [false; 4]);
    let (arcade, _channels) = arcade_with(Arc::new(SteadyHand(fist)), robot.clone());
    let mut session = arcade.rps.session();

    // Idle: a visible move changes nothing.
    session.step(Frame::blank(320, 240));
    assert_eq!(arcade.rps.status().winner, None);

    let long_ago = Instant::now()
        .checked_sub(Duration::from_secs(4))
        .expect("monotonic clock older than 4s");
    assert!(arcade.rps.start(long_ago));

    // Countdown expires on this tick; the move is read on the next one.
    session.step(Frame::blank(320, 240));
    session.step(Frame::blank(320, 240));

    let status = arcade.rps.status();
    assert_eq!(status.player, Some(Move::Rock));
    assert!(status.computer.is_some());
    assert!(status.winner.is_some());
    let mood = robot.moods();
    assert_eq!(mood.len(), 1);
    assert!(matches!(mood[0], Mood::Loving | Mood::Sad | Mood::Neutral));

    // A later frame cannot re-resolve the round.
    session.step(Frame::blank(320, 240));
    assert_eq!(robot.moods().len(), 1);

    assert!(arcade.rps.reset());
    assert_eq!(robot.moods().last(), Some(&Mood::Neutral));
}

#[tokio::test]
async fn rps_status_over_http_tracks_commands() {
    let robot = Arc::new(Recorder::default());
    let (arcade, _channels) = arcade_with(Arc::new(UnavailableModel::new("hand")), robot);
    let app = web::router(arcade);

    let started = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/rps/start")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(started.status().is_success());

    let status = get_json(app, "/rps/status").await;
    assert_eq!(
        status,
        json!({"state": "COUNTDOWN", "player": null, "computer": null, "winner": null})
    );
}
