//! Mood link to the desk robot.
//!
//! The robot listens on a serial port for `FACE:<MOOD>\n` lines. Notifications
//! are fire-and-forget: callers never block on the port and never see errors.

use std::{
    fmt,
    io::Write,
    sync::Arc,
    thread,
    time::Duration,
};

use crossbeam_channel::{Sender, TrySendError, bounded};
use serialport::{SerialPort, SerialPortType};
use thiserror::Error;

const QUEUE_DEPTH: usize = 16;
const BOARD_RESET_DELAY: Duration = Duration::from_secs(2);
const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Emotion shown on the robot. Unknown tags are passed through untouched.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Mood {
    Neutral,
    Correct,
    Wrong,
    Sleeping,
    Loving,
    Sad,
    Other(String),
}

impl Mood {
    pub fn as_str(&self) -> &str {
        match self {
            Mood::Neutral => "NEUTRAL",
            Mood::Correct => "CORRECT",
            Mood::Wrong => "WRONG",
            Mood::Sleeping => "SLEEPING",
            Mood::Loving => "LOVING",
            Mood::Sad => "SAD",
            Mood::Other(tag) => tag,
        }
    }

    pub fn command(&self) -> String {
        format!("FACE:{}\n", self.as_str())
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort sink for mood changes.
pub trait RobotNotifier: Send + Sync {
    fn notify(&self, mood: Mood);
}

/// Notifier used when no robot is attached; it only logs.
#[derive(Default)]
pub struct DetachedRobot;

impl RobotNotifier for DetachedRobot {
    fn notify(&self, mood: Mood) {
        log::debug!("robot detached, dropping mood {mood}");
    }
}

#[derive(Debug, Error)]
pub enum RobotError {
    #[error("no serial port found")]
    NoPort,
    #[error("failed to list serial ports: {0}")]
    Enumerate(#[source] serialport::Error),
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("write failed: {0}")]
    Write(#[from] std::io::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RobotConfig {
    /// Explicit port path; `None` auto-detects.
    pub port: Option<String>,
    pub baud_rate: u32,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 115_200,
        }
    }
}

/// Pick the notifier for `config`: a serial robot on the configured or
/// detected port, or a logging-only one when disabled or no port is found.
pub fn connect_robot(config: Option<RobotConfig>) -> Arc<dyn RobotNotifier> {
    match config.and_then(|config| resolve_port(config, detect_port)) {
        Some(config) => Arc::new(SerialRobot::spawn(config)),
        None => Arc::new(DetachedRobot),
    }
}

/// Fill in the port from `detect` when none is configured.
fn resolve_port(
    config: RobotConfig,
    detect: impl FnOnce() -> Result<String, RobotError>,
) -> Option<RobotConfig> {
    if config.port.is_some() {
        return Some(config);
    }
    match detect() {
        Ok(port) => Some(RobotConfig {
            port: Some(port),
            ..config
        }),
        Err(err) => {
            log::warn!("robot disabled: {err}");
            None
        }
    }
}

/// Serial robot driven by a dedicated writer thread.
pub struct SerialRobot {
    tx: Sender<Mood>,
}

impl SerialRobot {
    pub fn spawn(config: RobotConfig) -> Self {
        let (tx, rx) = bounded::<Mood>(QUEUE_DEPTH);

        let spawned = thread::Builder::new()
            .name("robot-link".into())
            .spawn(move || {
                let mut link = SerialLink::new(config);
                link.connect();
                for mood in rx.iter() {
                    link.send(&mood);
                }
                log::info!("robot link closed");
            });
        if let Err(err) = spawned {
            log::error!("failed to spawn robot link thread: {err}");
        }

        Self { tx }
    }
}

impl RobotNotifier for SerialRobot {
    fn notify(&self, mood: Mood) {
        match self.tx.try_send(mood) {
            Ok(()) => {}
            Err(TrySendError::Full(mood)) => {
                log::warn!("robot link busy, dropping mood {mood}");
            }
            Err(TrySendError::Disconnected(mood)) => {
                log::warn!("robot link thread gone, dropping mood {mood}");
            }
        }
    }
}

struct SerialLink {
    config: RobotConfig,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialLink {
    fn new(config: RobotConfig) -> Self {
        Self { config, port: None }
    }

    fn connect(&mut self) {
        match open_port(&self.config) {
            Ok((name, port)) => {
                log::info!("robot connected on {name}");
                self.port = Some(port);
            }
            Err(err) => log::warn!("robot connection failed: {err}"),
        }
    }

    fn send(&mut self, mood: &Mood) {
        if self.port.is_none() {
            // One reconnect attempt per command after the link dropped.
            self.connect();
        }
        let Some(port) = self.port.as_mut() else {
            log::debug!("robot offline, dropping mood {mood}");
            return;
        };

        let result = port
            .write_all(mood.command().as_bytes())
            .and_then(|()| port.flush())
            .map_err(RobotError::from);
        match result {
            Ok(()) => log::debug!("robot mood -> {mood}"),
            Err(err) => {
                log::warn!("robot send error: {err}");
                self.port = None;
            }
        }
    }
}

fn open_port(config: &RobotConfig) -> Result<(String, Box<dyn SerialPort>), RobotError> {
    let name = match &config.port {
        Some(port) => port.clone(),
        None => detect_port()?,
    };

    let port = serialport::new(&name, config.baud_rate)
        .timeout(WRITE_TIMEOUT)
        .open()
        .map_err(|source| RobotError::Open {
            port: name.clone(),
            source,
        })?;

    // Opening the port resets most Arduino-style boards.
    thread::sleep(BOARD_RESET_DELAY);
    Ok((name, port))
}

fn detect_port() -> Result<String, RobotError> {
    let ports = serialport::available_ports().map_err(RobotError::Enumerate)?;
    log::info!(
        "found serial ports: {:?}",
        ports.iter().map(|p| p.port_name.as_str()).collect::<Vec<_>>()
    );

    let described: Vec<(String, String)> = ports
        .into_iter()
        .map(|p| {
            let description = match &p.port_type {
                SerialPortType::UsbPort(usb) => format!(
                    "USB {} {}",
                    usb.manufacturer.as_deref().unwrap_or(""),
                    usb.product.as_deref().unwrap_or("")
                ),
                SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                SerialPortType::PciPort => "PCI".to_string(),
                SerialPortType::Unknown => String::new(),
            };
            (p.port_name, description)
        })
        .collect();

    pick_port(&described).ok_or(RobotError::NoPort)
}

/// Prefer a USB serial adapter; otherwise fall back to the first port listed.
fn pick_port(ports: &[(String, String)]) -> Option<String> {
    const HINTS: [&str; 3] = ["USB", "Serial", "CH340"];
    ports
        .iter()
        .find(|(_, description)| HINTS.iter().any(|hint| description.contains(hint)))
        .or_else(|| ports.first())
        .map(|(name, _)| name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moods_become_face_commands() {
        assert_eq!(Mood::Sleeping.as_str(), "SLEEPING");
        assert_eq!(Mood::Loving.command(), "FACE:LOVING\n");
        let custom = Mood::Other("DANCING".to_string());
        assert_eq!(custom.to_string(), "DANCING");
        assert_eq!(custom.command(), "FACE:DANCING\n");
    }

    #[test]
    fn configured_port_skips_detection() {
        let config = RobotConfig {
            port: Some("/dev/ttyACM0".to_string()),
            baud_rate: 9600,
        };
        let resolved = resolve_port(config.clone(), || panic!("detection must not run"));
        assert_eq!(resolved, Some(config));
    }

    #[test]
    fn detected_port_is_filled_in() {
        let resolved = resolve_port(RobotConfig::default(), || Ok("/dev/ttyUSB0".to_string()));
        assert_eq!(resolved.and_then(|c| c.port).as_deref(), Some("/dev/ttyUSB0"));
    }

    #[test]
    fn no_port_found_means_detached() {
        assert_eq!(resolve_port(RobotConfig::default(), || Err(RobotError::NoPort)), None);
        let robot = connect_robot(None);
        robot.notify(Mood::Neutral);
    }

    #[test]
    fn usb_adapters_are_preferred() {
        let ports = vec![
            ("/dev/ttyS0".to_string(), String::new()),
            ("/dev/ttyUSB0".to_string(), "USB QinHeng CH340".to_string()),
        ];
        assert_eq!(pick_port(&ports).as_deref(), Some("/dev/ttyUSB0"));
    }

    #[test]
    fn first_port_is_the_fallback() {
        let ports = vec![
            ("COM3".to_string(), "PCI".to_string()),
            ("COM4".to_string(), String::new()),
        ];
        assert_eq!(pick_port(&ports).as_deref(), Some("COM3"));
        assert_eq!(pick_port(&[]), None);
    }

    #[test]
    fn unreachable_port_never_blocks_the_caller() {
        let robot = SerialRobot::spawn(RobotConfig {
            port: Some("/nonexistent/robot-port".to_string()),
            baud_rate: 115_200,
        });
        let started = std::time::Instant::now();
        for _ in 0..(QUEUE_DEPTH * 4) {
            robot.notify(Mood::Neutral);
        }
        assert!(started.elapsed() < BOARD_RESET_DELAY);
    }

    #[test]
    fn full_queue_drops_instead_of_blocking() {
        let (tx, rx) = bounded::<Mood>(1);
        let robot = SerialRobot { tx };
        robot.notify(Mood::Correct);
        robot.notify(Mood::Wrong);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![Mood::Correct]);

        drop(rx);
        robot.notify(Mood::Sad);
    }
}
