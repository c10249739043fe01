//! Thumbnail-provider host adapter.
//!
//! Shell hosts hand the provider a file path once, then ask for a square
//! thumbnail of a given edge length.

use std::path::{Path, PathBuf};

use mdlthumb_core::{Options, PixelBuffer, RenderRequest, Result, ThumbnailError};
use mdlthumb_render::{DeviceFactory, GpuContext, ModelBackend, ObjBackend, WgpuDeviceFactory};

use crate::pipeline::Thumbnailer;

/// How the host should treat the alpha channel of a thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaType {
    Unknown,
    /// Alpha is ignored.
    Rgb,
    /// Alpha is meaningful.
    Argb,
}

/// A rendered thumbnail and its alpha interpretation.
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub pixels: PixelBuffer,
    pub alpha: AlphaType,
}

/// Receives the file a provider will describe.
pub trait InitializeWithFile {
    fn initialize(&mut self, path: &Path) -> Result<()>;
}

/// Produces a square thumbnail with edge `cx`.
pub trait ThumbnailProvider {
    fn thumbnail(&self, cx: u32) -> Result<Thumbnail>;
}

/// Provider for model files, backed by a [`Thumbnailer`].
pub struct ModelThumbProvider<F = WgpuDeviceFactory, B = ObjBackend> {
    thumbnailer: Thumbnailer<F, B>,
    path: Option<PathBuf>,
}

impl ModelThumbProvider {
    pub fn new(options: Options) -> Self {
        Self::with_thumbnailer(Thumbnailer::new(options))
    }
}

impl Default for ModelThumbProvider {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl<F, B> ModelThumbProvider<F, B>
where
    F: DeviceFactory<Device = GpuContext>,
    B: ModelBackend,
{
    pub fn with_thumbnailer(thumbnailer: Thumbnailer<F, B>) -> Self {
        Self {
            thumbnailer,
            path: None,
        }
    }

    /// The file passed to [`InitializeWithFile::initialize`], if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Builds the render request for a thumbnail of edge `cx`.
    ///
    /// Edges below the configured minimum are raised to it.
    pub fn request_for(&self, cx: u32) -> Result<RenderRequest> {
        let path = self.path.as_ref().ok_or_else(|| {
            ThumbnailError::InvalidRequest("provider has not been initialized".to_string())
        })?;
        Ok(RenderRequest::square_clamped(
            path.clone(),
            cx,
            self.thumbnailer.options().min_thumbnail_size,
        ))
    }
}

impl<F, B> InitializeWithFile for ModelThumbProvider<F, B>
where
    F: DeviceFactory<Device = GpuContext>,
    B: ModelBackend,
{
    fn initialize(&mut self, path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(ThumbnailError::InvalidRequest(
                "model path is empty".to_string(),
            ));
        }
        log::debug!("provider initialized with '{}'", path.display());
        self.path = Some(path.to_path_buf());
        Ok(())
    }
}

impl<F, B> ThumbnailProvider for ModelThumbProvider<F, B>
where
    F: DeviceFactory<Device = GpuContext>,
    B: ModelBackend,
{
    fn thumbnail(&self, cx: u32) -> Result<Thumbnail> {
        let request = self.request_for(cx)?;
        let pixels = self.thumbnailer.render(&request)?;
        Ok(Thumbnail {
            pixels,
            alpha: AlphaType::Argb,
        })
    }
}
