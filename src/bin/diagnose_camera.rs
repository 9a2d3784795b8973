//! Camera and model check: tries every camera the backend reports and prints
//! which index to put in `ARCADE_CAMERA_INDEX`.

use std::{thread, time::Duration};

use anyhow::Result;
use gesture_arcade::{
    config::Config,
    pipeline::{CaptureSettings, CaptureSource, NokhwaCapture, available_cameras},
};

const READ_ATTEMPTS: usize = 5;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let config = Config::from_env()?;

    println!("=== Camera diagnostic ===");
    let cameras = available_cameras()?;
    if cameras.is_empty() {
        println!("no cameras reported by the capture backend");
    }

    let mut working = Vec::new();
    for camera in &cameras {
        let index = match camera.index.as_index() {
            Ok(index) => index,
            Err(err) => {
                println!("\n{}: skipped, not an indexed device ({err})", camera.label);
                continue;
            }
        };
        println!("\n--- camera {index}: {} ---", camera.label);
        if probe(CaptureSettings {
            index,
            ..config.capture
        }) {
            working.push(index);
        }
    }

    match working.first() {
        Some(index) => println!("\n*** recommended: ARCADE_CAMERA_INDEX={index} ***"),
        None => {
            println!("\n!!! no working camera found !!!");
            println!("check that the camera is plugged in, not held by another application,");
            println!("and that privacy settings allow camera access");
        }
    }

    println!("\n=== Landmark models ===");
    for (label, path) in [
        ("hand", &config.models.hand_model_path),
        ("face", &config.models.face_model_path),
    ] {
        let state = if path.exists() { "present" } else { "MISSING" };
        println!("{label:>5}: {state} ({})", path.display());
    }
    println!("backend: {}", config.models.label());

    Ok(())
}

fn probe(settings: CaptureSettings) -> bool {
    let mut capture = NokhwaCapture::new(settings);
    if let Err(err) = capture.open() {
        println!("  FAILED to open: {err}");
        return false;
    }

    let mut ok = false;
    for attempt in 1..=READ_ATTEMPTS {
        match capture.read() {
            Ok(frame) => {
                println!("  SUCCESS: frame read ({}x{})", frame.width, frame.height);
                ok = true;
                break;
            }
            Err(err) => {
                println!("  WARNING: no frame on attempt {attempt}: {err}");
                thread::sleep(Duration::from_millis(500));
            }
        }
    }
    capture.release();
    ok
}
