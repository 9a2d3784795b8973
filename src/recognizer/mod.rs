pub mod common;
#[cfg(feature = "landmarks-ort")]
mod onnx;

use std::{path::PathBuf, sync::Arc};

use crate::types::{Frame, LandmarkSet};

pub const HAND_MODEL_FILENAME: &str = "handpose_estimation_mediapipe_2023feb.onnx";
pub const FACE_MODEL_FILENAME: &str = "face_landmark.onnx";

/// Landmark extraction capability: zero or more landmark sets per frame, in
/// normalized frame coordinates.
pub trait LandmarkModel: Send + Sync {
    fn name(&self) -> &'static str;

    fn detect(&self, frame: &Frame) -> anyhow::Result<Vec<LandmarkSet>>;

    /// `false` when the model could not be loaded; games show a warning overlay.
    fn is_available(&self) -> bool {
        true
    }
}

/// Used when a model is missing: never detects anything.
pub struct UnavailableModel {
    name: &'static str,
}

impl UnavailableModel {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl LandmarkModel for UnavailableModel {
    fn name(&self) -> &'static str {
        self.name
    }

    fn detect(&self, _frame: &Frame) -> anyhow::Result<Vec<LandmarkSet>> {
        Ok(Vec::new())
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Run the model, degrading failures to "no detections".
pub fn detect_or_empty(model: &dyn LandmarkModel, frame: &Frame) -> Vec<LandmarkSet> {
    match model.detect(frame) {
        Ok(sets) => sets,
        Err(err) => {
            log::warn!("{} landmark inference failed: {err:?}", model.name());
            Vec::new()
        }
    }
}

#[derive(Clone, Debug)]
pub struct RecognizerBackend {
    pub hand_model_path: PathBuf,
    pub face_model_path: PathBuf,
    pub allow_download: bool,
}

impl RecognizerBackend {
    pub fn label(&self) -> &'static str {
        if cfg!(feature = "landmarks-ort") {
            "ort"
        } else {
            "disabled"
        }
    }

    pub fn load_hand_model(&self) -> Arc<dyn LandmarkModel> {
        #[cfg(feature = "landmarks-ort")]
        {
            let loaded = crate::model_download::ensure_hand_model_ready(
                &self.hand_model_path,
                self.allow_download,
            )
            .and_then(|()| onnx::OrtHandModel::new(&self.hand_model_path));
            match loaded {
                Ok(model) => return Arc::new(model),
                Err(err) => log::error!("hand landmark model unavailable: {err:?}"),
            }
        }

        #[cfg(not(feature = "landmarks-ort"))]
        log::warn!("built without a landmark backend, hand detection disabled");

        Arc::new(UnavailableModel::new("hand"))
    }

    pub fn load_face_model(&self) -> Arc<dyn LandmarkModel> {
        #[cfg(feature = "landmarks-ort")]
        {
            if self.face_model_path.exists() {
                match onnx::OrtFaceModel::new(&self.face_model_path) {
                    Ok(model) => return Arc::new(model),
                    Err(err) => log::error!("face landmark model unavailable: {err:?}"),
                }
            } else {
                log::error!(
                    "face landmark model not found at {}",
                    self.face_model_path.display()
                );
            }
        }

        #[cfg(not(feature = "landmarks-ort"))]
        log::warn!("built without a landmark backend, face detection disabled");

        Arc::new(UnavailableModel::new("face"))
    }
}
