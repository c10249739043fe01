//! mdlthumb: offscreen GPU thumbnails for 3D model files.
//!
//! Each render creates its own device, draws the model exactly once into an
//! offscreen target, copies the frame back to host memory, and releases every
//! GPU object before returning. Nothing is cached between renders.
//!
//! # Quick Start
//!
//! ```no_run
//! use mdlthumb::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!
//!     let pixels = render_to_pixel_buffer("model.obj", 256, 256)?;
//!     assert_eq!(pixels.as_bytes().len(), 256 * 256 * 4);
//!     Ok(())
//! }
//! ```
//!
//! # Failures
//!
//! Every failure is a [`ThumbnailError`]; [`ThumbnailError::kind`] gives the
//! [`FailureKind`]. A failed render never yields a partial image.

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod pipeline;
pub mod provider;

use std::path::Path;

pub use mdlthumb_core::{
    ChannelOrder, ConfigError, DeviceAttempt, DriverType, FailureKind, FeatureLevel, Options,
    PixelBuffer, ProvisionStep, RenderRequest, Result, ThumbnailError, BYTES_PER_PIXEL,
};
pub use mdlthumb_render::{
    encode_png, save_png, BoundModel, BridgeError, DeviceCreateError, DeviceFactory, GpuContext,
    ModelBackend, ModelDrawer, ObjBackend, OutputLayout, ScreenshotError, WgpuDeviceFactory,
};
pub use pipeline::{PipelineStage, Thumbnailer};
pub use provider::{AlphaType, InitializeWithFile, ModelThumbProvider, Thumbnail, ThumbnailProvider};

/// Initializes `env_logger` from `RUST_LOG`.
///
/// Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::try_init();
}

/// Renders the model at `path` into a `width` x `height` RGBA buffer.
///
/// Uses default [`Options`]. The returned buffer is top-down with a stride of
/// `width * 4` and every alpha byte set to `0xFF`.
pub fn render_to_pixel_buffer(
    path: impl AsRef<Path>,
    width: u32,
    height: u32,
) -> Result<PixelBuffer> {
    let request = RenderRequest::new(path.as_ref(), width, height);
    Thumbnailer::default().render(&request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging();
        init_logging();
    }

    #[test]
    fn test_render_rejects_zero_size() {
        let err = render_to_pixel_buffer("model.obj", 0, 64).unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidRequest);
    }

    #[test]
    fn test_render_rejects_empty_path() {
        let err = render_to_pixel_buffer("", 64, 64).unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidRequest);
    }
}
