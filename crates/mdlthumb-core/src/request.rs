//! Render requests.

use std::path::{Path, PathBuf};

use crate::error::{Result, ThumbnailError};

/// A single "render this file at this resolution" request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// Model asset to render.
    pub path: PathBuf,
    /// Target width in pixels.
    pub width: u32,
    /// Target height in pixels.
    pub height: u32,
}

impl RenderRequest {
    /// Creates a new request. No validation happens here; see [`RenderRequest::validate`].
    pub fn new(path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            path: path.into(),
            width,
            height,
        }
    }

    /// Creates a square request with the size raised to at least `min_size`.
    ///
    /// This is the caller-facing clamp; the pipeline itself accepts any
    /// positive dimension.
    pub fn square_clamped(path: impl Into<PathBuf>, size: u32, min_size: u32) -> Self {
        let size = size.max(min_size);
        Self::new(path, size, size)
    }

    /// Returns the asset path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checks the request before any GPU work.
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(ThumbnailError::InvalidRequest(
                "asset path is empty".to_string(),
            ));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ThumbnailError::InvalidRequest(format!(
                "dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}
