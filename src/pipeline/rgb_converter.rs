//! Camera buffer decoding into packed RGB frames.

use anyhow::{Result, anyhow, ensure};
use nokhwa::{Buffer, utils::FrameFormat};
use rayon::prelude::*;
use yuv::{
    YuvBiPlanarImage, YuvConversionMode, YuvPackedImage, YuvRange, YuvStandardMatrix,
    yuv_nv12_to_rgb, yuyv422_to_rgb,
};
use zune_jpeg::{
    JpegDecoder,
    zune_core::{bytestream::ZCursor, colorspace::ColorSpace, options::DecoderOptions},
};

use crate::types::Frame;

const RANGE: YuvRange = YuvRange::Full;
const MATRIX: YuvStandardMatrix = YuvStandardMatrix::Bt709;

pub fn to_frame(buffer: &Buffer) -> Result<Frame> {
    let resolution = buffer.resolution();
    let (width, height) = (resolution.width_x, resolution.height_y);
    let rgb = decode(buffer.source_frame_format(), buffer.buffer(), width, height)?;
    Ok(Frame::new(rgb, width, height))
}

/// Decode one raw camera buffer of the given format to `width * height * 3` bytes.
pub fn decode(format: FrameFormat, data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let pixels = width as usize * height as usize;
    match format {
        FrameFormat::MJPEG => decode_mjpeg(data, width, height),
        FrameFormat::NV12 => {
            let data = input(data, pixels * 3 / 2, "NV12")?;
            let (y_plane, uv_plane) = data.split_at(pixels);
            let image = YuvBiPlanarImage {
                y_plane,
                y_stride: width,
                uv_plane,
                uv_stride: width,
                width,
                height,
            };
            let mut rgb = vec![0u8; pixels * 3];
            yuv_nv12_to_rgb(&image, &mut rgb, width * 3, RANGE, MATRIX, YuvConversionMode::Balanced)
                .map_err(|err| anyhow!("NV12 conversion failed: {err:?}"))?;
            Ok(rgb)
        }
        FrameFormat::YUYV => {
            let image = YuvPackedImage {
                yuy: input(data, pixels * 2, "YUYV")?,
                yuy_stride: width * 2,
                width,
                height,
            };
            let mut rgb = vec![0u8; pixels * 3];
            yuyv422_to_rgb(&image, &mut rgb, width * 3, RANGE, MATRIX)
                .map_err(|err| anyhow!("YUYV conversion failed: {err:?}"))?;
            Ok(rgb)
        }
        FrameFormat::RAWRGB => Ok(input(data, pixels * 3, "RGB")?.to_vec()),
        FrameFormat::RAWBGR => Ok(swap_red_blue(input(data, pixels * 3, "BGR")?)),
        FrameFormat::GRAY => Ok(expand_gray(input(data, pixels, "GRAY")?)),
    }
}

/// The first `len` bytes of `data`, or an error naming the format.
fn input<'a>(data: &'a [u8], len: usize, format: &str) -> Result<&'a [u8]> {
    ensure!(
        data.len() >= len,
        "{format} buffer too small: got {}, need {len}",
        data.len()
    );
    Ok(&data[..len])
}

fn decode_mjpeg(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let options = DecoderOptions::default().jpeg_set_out_colorspace(ColorSpace::RGB);
    let mut decoder = JpegDecoder::new_with_options(ZCursor::new(data), options);
    let rgb = decoder
        .decode()
        .map_err(|err| anyhow!("MJPEG decode failed: {err:?}"))?;

    // Some drivers report a resolution that differs from the encoded image.
    if let Some(info) = decoder.info() {
        let decoded = (u32::from(info.width), u32::from(info.height));
        ensure!(
            decoded == (width, height),
            "MJPEG frame is {}x{}, camera reported {width}x{height}",
            decoded.0,
            decoded.1
        );
    }
    ensure!(
        rgb.len() >= width as usize * height as usize * 3,
        "MJPEG decode produced only {} bytes",
        rgb.len()
    );
    Ok(rgb)
}

fn swap_red_blue(bgr: &[u8]) -> Vec<u8> {
    bgr.par_chunks_exact(3)
        .flat_map_iter(|px| [px[2], px[1], px[0]])
        .collect()
}

fn expand_gray(gray: &[u8]) -> Vec<u8> {
    gray.par_iter().flat_map_iter(|&v| [v, v, v]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bgr_is_reordered() {
        let rgb = decode(FrameFormat::RAWBGR, &[1, 2, 3, 4, 5, 6], 2, 1).unwrap();
        assert_eq!(rgb, vec![3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn gray_is_replicated_per_channel() {
        let rgb = decode(FrameFormat::GRAY, &[7, 9], 2, 1).unwrap();
        assert_eq!(rgb, vec![7, 7, 7, 9, 9, 9]);
    }

    #[test]
    fn oversized_rgb_is_trimmed_and_short_buffers_fail() {
        let rgb = decode(FrameFormat::RAWRGB, &[1; 10], 1, 2).unwrap();
        assert_eq!(rgb.len(), 6);
        assert!(decode(FrameFormat::YUYV, &[0; 3], 2, 1).is_err());
        assert!(decode(FrameFormat::NV12, &[0; 5], 2, 2).is_err());
    }
}
