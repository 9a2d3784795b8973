pub mod broadcaster;
pub mod camera;
pub mod imaging;
pub mod latest;
pub mod overlay;
#[cfg(feature = "camera-nokhwa")]
pub mod rgb_converter;

// Re-exports for convenience
pub use broadcaster::{BroadcasterConfig, CaptureStatus, FrameBroadcaster};
pub use camera::{CaptureError, CaptureSettings, CaptureSource, NoCamera};
#[cfg(feature = "camera-nokhwa")]
pub use camera::{CameraDevice, NokhwaCapture, available_cameras};
pub use latest::LatestFrameChannel;
