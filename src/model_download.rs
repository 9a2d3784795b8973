use std::{
    fs,
    io::{self, BufWriter},
    path::Path,
    time::Duration,
};

use anyhow::{Context, bail};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;

/// Where a missing model file can be fetched from.
#[derive(Clone, Copy, Debug)]
pub struct ModelSource {
    pub label: &'static str,
    pub url: &'static str,
}

pub const HAND_MODEL: ModelSource = ModelSource {
    label: "hand landmark model",
    url: "https://raw.githubusercontent.com/214zzl995/gesture-universe/refs/heads/main/models/handpose_estimation_mediapipe_2023feb.onnx",
};

pub fn ensure_hand_model_ready(model_path: &Path, allow_download: bool) -> anyhow::Result<()> {
    ensure_model_ready(&HAND_MODEL, model_path, allow_download)
}

/// Make sure `model_path` exists, fetching it from `source` when allowed.
pub fn ensure_model_ready(
    source: &ModelSource,
    model_path: &Path,
    allow_download: bool,
) -> anyhow::Result<()> {
    if model_path.is_file() {
        log::debug!("{} found at {}", source.label, model_path.display());
        return Ok(());
    }
    if !allow_download {
        bail!(
            "{} missing at {} and downloads are disabled",
            source.label,
            model_path.display()
        );
    }

    if let Some(parent) = model_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create model directory {}", parent.display()))?;
    }
    fetch(source, model_path)
}

fn fetch(source: &ModelSource, dest: &Path) -> anyhow::Result<()> {
    log::info!("downloading {} to {}", source.label, dest.display());

    let client = Client::builder()
        .connect_timeout(Duration::from_secs(15))
        .build()
        .context("failed to build http client")?;
    let response = client
        .get(source.url)
        .send()
        .with_context(|| format!("failed to request {}", source.url))?
        .error_for_status()
        .context("model server returned an error status")?;

    let progress = progress_bar(source.label, response.content_length());

    // Write beside the destination and rename, so a partial file is never loaded.
    let staging = dest.with_extension("part");
    let file = fs::File::create(&staging)
        .with_context(|| format!("failed to create {}", staging.display()))?;
    let mut writer = BufWriter::new(file);
    let mut reader = progress.wrap_read(response);
    let written = io::copy(&mut reader, &mut writer).context("model download interrupted")?;

    let file = writer
        .into_inner()
        .map_err(|err| err.into_error())
        .context("failed to flush model file")?;
    file.sync_all().context("failed to sync model file")?;
    fs::rename(&staging, dest)
        .with_context(|| format!("failed to move model into place at {}", dest.display()))?;

    progress.finish_with_message(format!("{} ready", source.label));
    log::info!("{} downloaded ({written} bytes)", source.label);
    Ok(())
}

fn progress_bar(label: &str, total: Option<u64>) -> ProgressBar {
    let (bar, template) = match total {
        Some(total) if total > 0 => (
            ProgressBar::new(total),
            "{msg} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})",
        ),
        _ => (ProgressBar::new_spinner(), "{spinner:.green} {msg} {bytes}"),
    };
    if let Ok(style) = ProgressStyle::with_template(template) {
        bar.set_style(style.progress_chars("=>-"));
    }
    bar.set_message(label.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
