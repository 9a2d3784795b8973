use std::{path::Path, sync::Mutex};

use anyhow::{Context, Result, anyhow};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::{DynValue, Tensor};

use super::{
    LandmarkModel,
    common::{self, sigmoid},
};
use crate::types::{Frame, LandmarkSet, hand};

const HAND_INPUT_SIZE: u32 = 224;
const HAND_MIN_CONFIDENCE: f32 = 0.2;
const FACE_INPUT_SIZE: u32 = 192;
const FACE_MESH_POINTS: usize = 468;
const FACE_MIN_PRESENCE: f32 = 0.5;

fn build_session(model_path: &Path) -> Result<Session> {
    Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(2)?
        .commit_from_file(model_path)
        .with_context(|| format!("failed to load ORT session from {}", model_path.display()))
}

fn first_scalar(value: &DynValue) -> f32 {
    value
        .try_extract_array::<f32>()
        .ok()
        .and_then(|arr| arr.iter().next().copied())
        .unwrap_or(0.0)
}

/// Single-hand handpose estimator run on the letterboxed whole frame.
///
/// Sessions need exclusive access to run, so concurrent game loops take turns
/// on the session lock; game state locks are never held while waiting here.
pub struct OrtHandModel {
    session: Mutex<Session>,
}

impl OrtHandModel {
    pub fn new(model_path: &Path) -> Result<Self> {
        let session = build_session(model_path)?;
        log::info!("hand landmark model ready using {}", model_path.display());
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl LandmarkModel for OrtHandModel {
    fn name(&self) -> &'static str {
        "hand"
    }

    fn detect(&self, frame: &Frame) -> Result<Vec<LandmarkSet>> {
        let (input, letterbox) = common::prepare_frame_with_size(frame, HAND_INPUT_SIZE)?;
        let tensor = Tensor::from_array(input)?;

        let (flattened, confidence) = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| anyhow!("hand model session poisoned"))?;
            let outputs = session
                .run(ort::inputs![tensor])
                .context("failed to run ORT session")?;

            if outputs.len() < 1 {
                return Err(anyhow!("model returned no outputs"));
            }

            let coords = outputs[0].try_extract_array::<f32>()?;
            let flattened: Vec<f32> = coords.iter().copied().collect();
            let confidence = if outputs.len() > 1 {
                first_scalar(&outputs[1]).clamp(0.0, 1.0)
            } else {
                0.0
            };
            (flattened, confidence)
        };

        if confidence < HAND_MIN_CONFIDENCE {
            return Ok(Vec::new());
        }

        let raw = common::decode_landmarks(&flattened, hand::NUM_LANDMARKS)?;
        let mut set = LandmarkSet::new(common::project_landmarks(&raw, &letterbox));
        set.confidence = confidence;
        Ok(vec![set])
    }
}

/// Face mesh estimator: 468 points plus a face-presence logit.
pub struct OrtFaceModel {
    session: Mutex<Session>,
}

impl OrtFaceModel {
    pub fn new(model_path: &Path) -> Result<Self> {
        let session = build_session(model_path)?;
        log::info!("face mesh model ready using {}", model_path.display());
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl LandmarkModel for OrtFaceModel {
    fn name(&self) -> &'static str {
        "face"
    }

    fn detect(&self, frame: &Frame) -> Result<Vec<LandmarkSet>> {
        let (input, letterbox) = common::prepare_frame_with_size(frame, FACE_INPUT_SIZE)?;
        let tensor = Tensor::from_array(input)?;

        let (flattened, presence) = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| anyhow!("face model session poisoned"))?;
            let outputs = session
                .run(ort::inputs![tensor])
                .context("failed to run ORT session")?;

            if outputs.len() < 2 {
                return Err(anyhow!(
                    "face model returned {} outputs, expected mesh and presence",
                    outputs.len()
                ));
            }

            let mesh = outputs[0].try_extract_array::<f32>()?;
            let flattened: Vec<f32> = mesh.iter().copied().collect();
            (flattened, sigmoid(first_scalar(&outputs[1])))
        };

        if presence < FACE_MIN_PRESENCE {
            return Ok(Vec::new());
        }

        let raw = common::decode_landmarks(&flattened, FACE_MESH_POINTS)?;
        let mut set = LandmarkSet::new(common::project_landmarks(&raw, &letterbox));
        set.confidence = presence;
        Ok(vec![set])
    }
}
