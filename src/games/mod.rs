//! Per-game frame processing and the per-viewer stream loop.

pub mod air;
pub mod face;
pub mod rps;

use std::{
    io,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use anyhow::Context;
use tokio::sync::mpsc;

use crate::{
    pipeline::{CaptureStatus, LatestFrameChannel, imaging, overlay},
    recognizer::LandmarkModel,
    robot::RobotNotifier,
    types::Frame,
};

pub use air::{AirGame, AirResult, AirSession};
pub use face::{FaceFinding, FaceGame, FaceSession};
pub use rps::{RoundState, RpsGame, RpsRound, RpsSession, RpsStatus};

/// Show the camera placeholder after this long without frames while offline.
pub const PLACEHOLDER_AFTER: Duration = Duration::from_millis(500);
const FRAME_WAIT: Duration = Duration::from_millis(100);
const PLACEHOLDER_SIZE: (u32, u32) = (640, 480);

/// One viewer's processing state for a game. Sessions are owned by exactly one
/// stream loop, so they need no locking of their own.
pub trait GameSession: Send {
    /// Interpret one captured frame and return the annotated output frame.
    fn step(&mut self, frame: Frame) -> Frame;
}

/// Destination of encoded multipart parts.
pub trait FrameSink {
    /// `false` once the viewer is gone.
    fn send(&mut self, part: Vec<u8>) -> bool;

    fn is_closed(&self) -> bool {
        false
    }
}

pub type StreamChunk = Result<Vec<u8>, io::Error>;

impl FrameSink for mpsc::Sender<StreamChunk> {
    fn send(&mut self, part: Vec<u8>) -> bool {
        self.blocking_send(Ok(part)).is_ok()
    }

    fn is_closed(&self) -> bool {
        mpsc::Sender::is_closed(self)
    }
}

/// The three per-game frame channels fed by the broadcaster.
#[derive(Clone, Default)]
pub struct GameChannels {
    pub air: Arc<LatestFrameChannel>,
    pub face: Arc<LatestFrameChannel>,
    pub rps: Arc<LatestFrameChannel>,
}

impl GameChannels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Arc<LatestFrameChannel>> {
        vec![self.air.clone(), self.face.clone(), self.rps.clone()]
    }
}

/// Everything the HTTP layer needs: the three games plus capture status.
pub struct Arcade {
    pub air: Arc<AirGame>,
    pub face: Arc<FaceGame>,
    pub rps: Arc<RpsGame>,
    pub status: CaptureStatus,
    pub robot: Arc<dyn RobotNotifier>,
}

impl Arcade {
    pub fn new(
        channels: GameChannels,
        status: CaptureStatus,
        hand_model: Arc<dyn LandmarkModel>,
        face_model: Arc<dyn LandmarkModel>,
        robot: Arc<dyn RobotNotifier>,
    ) -> Self {
        Self {
            air: Arc::new(AirGame::new(channels.air, hand_model.clone(), robot.clone())),
            face: Arc::new(FaceGame::new(channels.face, face_model, robot.clone())),
            rps: Arc::new(RpsGame::new(channels.rps, hand_model, robot.clone())),
            status,
            robot,
        }
    }
}

/// Drive one viewer's stream until the sink reports the viewer gone.
///
/// Waits on the channel with a bounded timeout; when the camera is offline and
/// nothing arrived for [`PLACEHOLDER_AFTER`], a placeholder frame is sent.
pub fn run_stream<S, K>(
    session: &mut S,
    channel: &LatestFrameChannel,
    status: &CaptureStatus,
    sink: &mut K,
) where
    S: GameSession + ?Sized,
    K: FrameSink,
{
    let mut seen = 0;
    let mut last_output = Instant::now();
    let mut size = PLACEHOLDER_SIZE;

    loop {
        if sink.is_closed() {
            break;
        }

        let output = match channel.wait_newer(seen, FRAME_WAIT) {
            Some((seq, frame)) => {
                seen = seq;
                size = (frame.width, frame.height);
                session.step(frame)
            }
            None if !status.is_online() && last_output.elapsed() >= PLACEHOLDER_AFTER => {
                waiting_for_camera(size.0, size.1)
            }
            None => continue,
        };
        last_output = Instant::now();

        let jpeg = match imaging::encode_jpeg(&output) {
            Ok(jpeg) => jpeg,
            Err(err) => {
                log::warn!("dropping frame: {err:?}");
                continue;
            }
        };
        if !sink.send(imaging::multipart_part(&jpeg)) {
            break;
        }
    }
}

/// Run a stream loop on its own thread. The thread ends when `tx` closes.
pub fn spawn_stream<S>(
    name: &'static str,
    mut session: S,
    channel: Arc<LatestFrameChannel>,
    status: CaptureStatus,
    mut tx: mpsc::Sender<StreamChunk>,
) -> anyhow::Result<()>
where
    S: GameSession + 'static,
{
    thread::Builder::new()
        .name(format!("{name}-stream"))
        .spawn(move || {
            log::info!("{name} viewer connected");
            run_stream(&mut session, &channel, &status, &mut tx);
            log::info!("{name} viewer disconnected");
        })
        .with_context(|| format!("failed to spawn {name} stream thread"))?;
    Ok(())
}

pub fn waiting_for_camera(width: u32, height: u32) -> Frame {
    let mut frame = Frame::blank(width, height);
    draw_centered_banner(&mut frame, "WAITING FOR CAMERA", overlay::WARNING);
    frame
}

/// Fixed warning shown when a landmark model could not be loaded.
pub fn draw_model_missing(frame: &mut Frame, model: &dyn LandmarkModel) {
    let text = format!("{} MODEL MISSING", model.name());
    overlay::draw_banner(frame, &text, (10, 10), 2, overlay::WHITE, overlay::WARNING);
}

fn draw_centered_banner(frame: &mut Frame, text: &str, bg: overlay::Color) {
    let scale = 3;
    let x = (frame.width as i32 - overlay::text_width(text, scale)) / 2;
    let y = (frame.height as i32 - overlay::text_height(scale)) / 2;
    overlay::draw_banner(frame, text, (x.max(0), y.max(0)), scale, overlay::WHITE, bg);
}
