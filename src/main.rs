use std::sync::Arc;

use anyhow::{Context, Result};
use gesture_arcade::{
    config::Config,
    games::{Arcade, GameChannels},
    pipeline::{BroadcasterConfig, FrameBroadcaster},
    robot::connect_robot,
    web,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    log::info!(
        "starting with camera {} at {}x{}, landmark backend {}",
        config.capture.index,
        config.capture.width,
        config.capture.height,
        config.models.label()
    );

    let channels = GameChannels::new();
    let broadcaster = spawn_broadcaster(&config, &channels);

    let hand_model = config.models.load_hand_model();
    let face_model = config.models.load_face_model();

    if config.robot.is_none() {
        log::info!("robot link disabled");
    }
    let robot = connect_robot(config.robot.clone());

    let arcade = Arc::new(Arcade::new(
        channels,
        broadcaster.status(),
        hand_model,
        face_model,
        robot,
    ));

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let served = runtime.block_on(web::serve(arcade, config.bind));

    broadcaster.stop();
    served
}

#[cfg(feature = "camera-nokhwa")]
fn spawn_broadcaster(config: &Config, channels: &GameChannels) -> FrameBroadcaster {
    use gesture_arcade::pipeline::NokhwaCapture;

    let settings = config.capture;
    FrameBroadcaster::spawn(
        move || NokhwaCapture::new(settings),
        channels.all(),
        BroadcasterConfig::default(),
    )
}

#[cfg(not(feature = "camera-nokhwa"))]
fn spawn_broadcaster(_config: &Config, channels: &GameChannels) -> FrameBroadcaster {
    use gesture_arcade::pipeline::NoCamera;

    log::warn!("built without a camera backend, streams will show a placeholder");
    FrameBroadcaster::spawn(|| NoCamera, channels.all(), BroadcasterConfig::default())
}
