use anyhow::{Context, Result, anyhow};
use fast_image_resize as fir;
use image::{ExtendedColorType, codecs::jpeg::JpegEncoder};
use rayon::prelude::*;

use crate::types::Frame;

const JPEG_QUALITY: u8 = 80;

/// Flip the frame left-to-right so the stream behaves like a mirror.
pub fn mirror(frame: &mut Frame) {
    let row_len = frame.width as usize * 3;
    if row_len == 0 {
        return;
    }
    frame.rgb.par_chunks_mut(row_len).for_each(|row| {
        let pixels = row.len() / 3;
        for x in 0..pixels / 2 {
            let (a, b) = (x * 3, (pixels - 1 - x) * 3);
            for c in 0..3 {
                row.swap(a + c, b + c);
            }
        }
    });
}

/// Bilinear downscale used before landmark inference.
pub fn resize(frame: &Frame, width: u32, height: u32) -> Result<Frame> {
    if !frame.is_well_formed() {
        return Err(anyhow!(
            "frame buffer size mismatch: got {}, expected {}",
            frame.rgb.len(),
            frame.width as usize * frame.height as usize * 3
        ));
    }
    if (frame.width, frame.height) == (width, height) {
        return Ok(frame.clone());
    }

    let src = fir::images::Image::from_vec_u8(
        frame.width,
        frame.height,
        frame.rgb.clone(),
        fir::PixelType::U8x3,
    )?;
    let mut dst = fir::images::Image::new(width, height, fir::PixelType::U8x3);
    let options =
        fir::ResizeOptions::new().resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    fir::Resizer::new()
        .resize(&src, &mut dst, Some(&options))
        .context("fast resize failed")?;

    Ok(Frame {
        rgb: dst.into_vec(),
        width,
        height,
        timestamp: frame.timestamp,
    })
}

pub fn encode_jpeg(frame: &Frame) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(frame.rgb.len() / 8);
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode(&frame.rgb, frame.width, frame.height, ExtendedColorType::Rgb8)
        .context("jpeg encode failed")?;
    Ok(out)
}

/// Wrap one JPEG as a `multipart/x-mixed-replace` part with boundary `frame`.
pub fn multipart_part(jpeg: &[u8]) -> Vec<u8> {
    const HEAD: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
    let mut part = Vec::with_capacity(HEAD.len() + jpeg.len() + 2);
    part.extend_from_slice(HEAD);
    part.extend_from_slice(jpeg);
    part.extend_from_slice(b"\r\n");
    part
}
