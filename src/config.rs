use std::{net::SocketAddr, path::PathBuf, str::FromStr};

use anyhow::{Context, Result};

use crate::{
    pipeline::CaptureSettings,
    recognizer::{FACE_MODEL_FILENAME, HAND_MODEL_FILENAME, RecognizerBackend},
    robot::RobotConfig,
};

const DEFAULT_BIND: &str = "0.0.0.0:5000";

/// Service configuration from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind: SocketAddr,
    pub capture: CaptureSettings,
    /// `None` when the robot link is switched off.
    pub robot: Option<RobotConfig>,
    pub models: RecognizerBackend,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_str = lookup("ARCADE_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = SocketAddr::from_str(&bind_str)
            .with_context(|| format!("invalid ARCADE_BIND address {bind_str:?}"))?;

        let defaults = CaptureSettings::default();
        let capture = CaptureSettings {
            index: parsed_or(&lookup, "ARCADE_CAMERA_INDEX", defaults.index),
            width: parsed_or(&lookup, "ARCADE_FRAME_WIDTH", defaults.width),
            height: parsed_or(&lookup, "ARCADE_FRAME_HEIGHT", defaults.height),
            ..defaults
        };

        let robot_port = lookup("ARCADE_ROBOT_PORT").filter(|p| !p.trim().is_empty());
        let disabled = robot_port
            .as_deref()
            .is_some_and(|p| p.trim().eq_ignore_ascii_case("off"));
        let robot = (!disabled).then(|| RobotConfig {
            port: robot_port,
            baud_rate: parsed_or(&lookup, "ARCADE_ROBOT_BAUD", RobotConfig::default().baud_rate),
        });

        let model_dir = lookup("ARCADE_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("models"));
        let models = RecognizerBackend {
            hand_model_path: lookup("ARCADE_HAND_MODEL")
                .map(PathBuf::from)
                .unwrap_or_else(|| model_dir.join(HAND_MODEL_FILENAME)),
            face_model_path: lookup("ARCADE_FACE_MODEL")
                .map(PathBuf::from)
                .unwrap_or_else(|| model_dir.join(FACE_MODEL_FILENAME)),
            allow_download: lookup("ARCADE_MODEL_DOWNLOAD")
                .map(|v| !matches!(v.trim(), "0" | "false" | "no" | "off"))
                .unwrap_or(true),
        };

        Ok(Self {
            bind,
            capture,
            robot,
            models,
        })
    }
}

fn parsed_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("ignoring unparseable {key}={raw:?}, using {default}");
            default
        }),
    }
}
