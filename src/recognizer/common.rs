use anyhow::{Result, anyhow};

use crate::types::Landmark;

#[derive(Clone, Debug, PartialEq)]
pub struct LetterboxInfo {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub orig_w: u32,
    pub orig_h: u32,
}

impl LetterboxInfo {
    /// Geometry for fitting a `width`x`height` frame into a square model input.
    pub fn fit(width: u32, height: u32, target_size: u32) -> Self {
        let scale = target_size as f32 / (width.max(height).max(1) as f32);
        let new_w = (width as f32 * scale).round().max(1.0) as u32;
        let new_h = (height as f32 * scale).round().max(1.0) as u32;
        Self {
            scale,
            pad_x: ((target_size as i64 - new_w as i64) / 2).max(0) as f32,
            pad_y: ((target_size as i64 - new_h as i64) / 2).max(0) as f32,
            orig_w: width,
            orig_h: height,
        }
    }

    pub fn scaled_size(&self) -> (u32, u32) {
        (
            (self.orig_w as f32 * self.scale).round().max(1.0) as u32,
            (self.orig_h as f32 * self.scale).round().max(1.0) as u32,
        )
    }
}

pub fn decode_landmarks(flat: &[f32], count: usize) -> Result<Vec<[f32; 3]>> {
    if flat.len() < count * 3 {
        return Err(anyhow!(
            "unexpected landmarks length: got {}, need {}",
            flat.len(),
            count * 3
        ));
    }

    Ok(flat
        .chunks_exact(3)
        .take(count)
        .map(|chunk| [chunk[0], chunk[1], chunk[2]])
        .collect())
}

/// Map model-input pixel coordinates back to normalized frame coordinates.
pub fn project_landmarks(landmarks: &[[f32; 3]], letterbox: &LetterboxInfo) -> Vec<Landmark> {
    let w = letterbox.orig_w.max(1) as f32;
    let h = letterbox.orig_h.max(1) as f32;
    landmarks
        .iter()
        .map(|[x, y, z]| {
            let px = ((x - letterbox.pad_x) / letterbox.scale).clamp(0.0, w - 1.0);
            let py = ((y - letterbox.pad_y) / letterbox.scale).clamp(0.0, h - 1.0);
            Landmark {
                x: px / w,
                y: py / h,
                z: z / letterbox.scale / w,
            }
        })
        .collect()
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(feature = "landmarks-ort")]
pub use tensor::prepare_frame_with_size;

#[cfg(feature = "landmarks-ort")]
mod tensor {
    use anyhow::{Result, anyhow};
    use ndarray::Array4;
    use rayon::prelude::*;

    use super::LetterboxInfo;
    use crate::{pipeline::imaging, types::Frame};

    /// Letterbox the frame into a `target_size` square NHWC tensor in `[0, 1]`.
    pub fn prepare_frame_with_size(
        frame: &Frame,
        target_size: u32,
    ) -> Result<(Array4<f32>, LetterboxInfo)> {
        let letterbox = LetterboxInfo::fit(frame.width, frame.height, target_size);
        let (new_w, new_h) = letterbox.scaled_size();
        let resized = imaging::resize(frame, new_w, new_h)?;

        let side = target_size as usize;
        let mut canvas = vec![0u8; side * side * 3];
        let dst_stride = side * 3;
        let src_stride = new_w as usize * 3;
        let (pad_x, pad_y) = (letterbox.pad_x as usize, letterbox.pad_y as usize);
        for row in 0..(new_h as usize).min(side - pad_y) {
            let dst_offset = (pad_y + row) * dst_stride + pad_x * 3;
            let len = src_stride.min(dst_stride - pad_x * 3);
            let src_offset = row * src_stride;
            canvas[dst_offset..dst_offset + len]
                .copy_from_slice(&resized.rgb[src_offset..src_offset + len]);
        }

        let normalized: Vec<f32> = canvas.par_iter().map(|&v| v as f32 / 255.0).collect();
        let input = Array4::<f32>::from_shape_vec((1, side, side, 3), normalized)
            .map_err(|err| anyhow!("failed to build input tensor: {err}"))?;

        Ok((input, letterbox))
    }
}
