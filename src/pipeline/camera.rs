use thiserror::Error;

use crate::types::Frame;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("camera unavailable: {0}")]
    Unavailable(String),
    #[error("camera is not open")]
    NotOpen,
    #[error("frame read failed: {0}")]
    Read(String),
    #[error("frame decode failed: {0}")]
    Decode(String),
}

/// A video device owned by exactly one capture loop.
pub trait CaptureSource {
    fn open(&mut self) -> Result<(), CaptureError>;
    fn is_open(&self) -> bool;
    fn read(&mut self) -> Result<Frame, CaptureError>;
    fn release(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureSettings {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            index: 0,
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

/// Stand-in used when the crate is built without a camera backend.
pub struct NoCamera;

impl CaptureSource for NoCamera {
    fn open(&mut self) -> Result<(), CaptureError> {
        Err(CaptureError::Unavailable(
            "built without a camera backend".to_string(),
        ))
    }

    fn is_open(&self) -> bool {
        false
    }

    fn read(&mut self) -> Result<Frame, CaptureError> {
        Err(CaptureError::NotOpen)
    }

    fn release(&mut self) {}
}

#[cfg(feature = "camera-nokhwa")]
pub use native::{CameraDevice, NokhwaCapture, available_cameras};

#[cfg(feature = "camera-nokhwa")]
mod native {
    use nokhwa::{
        Camera,
        pixel_format::RgbFormat,
        query,
        utils::{
            ApiBackend, CameraFormat, CameraIndex, CameraInfo, FrameFormat, RequestedFormat,
            RequestedFormatType, Resolution,
        },
    };

    use super::{CaptureError, CaptureSettings, CaptureSource};
    use crate::{pipeline::rgb_converter, types::Frame};

    // Prefer pixel formats that are widely supported on macOS (the built-in cameras
    // often reject YUYV even though Nokhwa reports it).
    const PREFERRED_PIXEL_FORMATS: &[FrameFormat] = &[
        FrameFormat::MJPEG,
        FrameFormat::RAWRGB,
        FrameFormat::RAWBGR,
        FrameFormat::YUYV,
        FrameFormat::NV12,
        FrameFormat::GRAY,
    ];

    fn requested_formats(settings: &CaptureSettings) -> [RequestedFormat<'static>; 4] {
        let wanted = CameraFormat::new(
            Resolution::new(settings.width, settings.height),
            FrameFormat::MJPEG,
            settings.fps,
        );
        [
            RequestedFormat::with_formats(
                RequestedFormatType::Closest(wanted),
                PREFERRED_PIXEL_FORMATS,
            ),
            RequestedFormat::with_formats(
                RequestedFormatType::AbsoluteHighestFrameRate,
                PREFERRED_PIXEL_FORMATS,
            ),
            // Fall back to any format Nokhwa can decode.
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate),
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
        ]
    }

    #[derive(Clone, Debug)]
    pub struct CameraDevice {
        pub index: CameraIndex,
        pub label: String,
    }

    pub fn available_cameras() -> anyhow::Result<Vec<CameraDevice>> {
        let cameras = query(ApiBackend::Auto)?;
        Ok(cameras
            .into_iter()
            .map(|info| CameraDevice {
                index: info.index().clone(),
                label: format_camera_label(&info),
            })
            .collect())
    }

    fn format_camera_label(info: &CameraInfo) -> String {
        format!("{} ({})", info.human_name(), info.description())
    }

    /// Native camera through Nokhwa. Not `Send`: build it on the capture thread.
    pub struct NokhwaCapture {
        settings: CaptureSettings,
        camera: Option<Camera>,
    }

    impl NokhwaCapture {
        pub fn new(settings: CaptureSettings) -> Self {
            Self {
                settings,
                camera: None,
            }
        }

        fn build_camera(&self) -> Result<Camera, CaptureError> {
            let index = CameraIndex::Index(self.settings.index);
            let mut last_err = None;

            for requested in requested_formats(&self.settings) {
                match Camera::new(index.clone(), requested) {
                    Ok(mut camera) => match camera.open_stream() {
                        Ok(()) => return Ok(camera),
                        Err(err) => last_err = Some(err.to_string()),
                    },
                    Err(err) => last_err = Some(err.to_string()),
                }
            }

            Err(CaptureError::Unavailable(last_err.unwrap_or_else(|| {
                "failed to open camera with any supported format".to_string()
            })))
        }
    }

    impl CaptureSource for NokhwaCapture {
        fn open(&mut self) -> Result<(), CaptureError> {
            let camera = self.build_camera()?;
            self.camera = Some(camera);

            // Only count the device as open once it actually delivers a frame.
            match self.read() {
                Ok(frame) => {
                    log::info!(
                        "camera {} open at {}x{}",
                        self.settings.index,
                        frame.width,
                        frame.height
                    );
                    Ok(())
                }
                Err(err) => {
                    self.release();
                    Err(CaptureError::Unavailable(format!(
                        "camera opened but returned no frame: {err}"
                    )))
                }
            }
        }

        fn is_open(&self) -> bool {
            self.camera.is_some()
        }

        fn read(&mut self) -> Result<Frame, CaptureError> {
            let camera = self.camera.as_mut().ok_or(CaptureError::NotOpen)?;
            let buffer = camera
                .frame()
                .map_err(|err| CaptureError::Read(err.to_string()))?;
            rgb_converter::to_frame(&buffer)
                .map_err(|err| CaptureError::Decode(format!("{err:?}")))
        }

        fn release(&mut self) {
            if let Some(mut camera) = self.camera.take() {
                if let Err(err) = camera.stop_stream() {
                    log::warn!("failed to stop camera stream: {err:?}");
                }
                log::info!("camera {} released", self.settings.index);
            }
        }
    }

    impl Drop for NokhwaCapture {
        fn drop(&mut self) {
            self.release();
        }
    }
}
