//! Seam between the pipeline and the model loader/drawer collaborators.
//!
//! A [`ModelBackend`] turns an asset path into a renderable model and binds a
//! drawer to the current device. The pipeline only sees these traits; how a
//! model is decoded or shaded is up to the backend.

use std::path::Path;

use mdlthumb_core::{Result, ThumbnailError};

use crate::device::GpuContext;
use crate::error::BridgeError;
use crate::frame_target::{FrameTarget, RasterState};

/// Output configuration a drawer builds its pipeline against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputLayout {
    pub color_format: wgpu::TextureFormat,
    pub depth_format: wgpu::TextureFormat,
    pub raster: RasterState,
}

/// Loader and drawer factory for one model format.
pub trait ModelBackend {
    /// Renderable model handle, bound to the device it was loaded on.
    type Model;
    /// Drawer able to render [`Self::Model`].
    type Drawer: ModelDrawer<Model = Self::Model>;

    /// Decodes the asset at `path` and uploads it to the device.
    fn load_model(&self, gpu: &GpuContext, path: &Path)
        -> std::result::Result<Self::Model, BridgeError>;

    /// Creates a drawer bound to the device and output layout.
    fn bind_drawer(
        &self,
        gpu: &GpuContext,
        layout: &OutputLayout,
    ) -> std::result::Result<Self::Drawer, BridgeError>;
}

/// Issues draw commands for a model.
pub trait ModelDrawer {
    type Model;

    /// Sets the output size in pixels.
    fn set_viewport(&mut self, width: u32, height: u32);

    /// Binds the model; called once before [`ModelDrawer::draw`].
    fn set_model(&mut self, gpu: &GpuContext, model: &Self::Model);

    /// Records the draw into an open render pass.
    fn draw(&mut self, pass: &mut wgpu::RenderPass<'_>);
}

/// A loaded model together with its drawer.
///
/// Fields drop in declaration order: the drawer is released before the model.
pub struct BoundModel<B: ModelBackend> {
    pub drawer: B::Drawer,
    pub model: B::Model,
}

impl<B: ModelBackend> BoundModel<B> {
    /// Sets viewport and model on the drawer.
    pub fn prepare(&mut self, gpu: &GpuContext, width: u32, height: u32) {
        self.drawer.set_viewport(width, height);
        self.drawer.set_model(gpu, &self.model);
    }

    /// Records one draw of the model.
    pub fn draw(&mut self, pass: &mut wgpu::RenderPass<'_>) {
        self.drawer.draw(pass);
    }
}

/// Loads the asset and binds a drawer for it.
///
/// Loader, drawer, and any GPU validation error raised while they run all
/// surface as `ModelLoadFailed`.
pub fn load_and_bind<B: ModelBackend>(
    backend: &B,
    gpu: &GpuContext,
    target: &FrameTarget,
    path: &Path,
) -> Result<BoundModel<B>> {
    let failed = |message: String| {
        log::error!("model '{}' rejected: {message}", path.display());
        ThumbnailError::ModelLoadFailed {
            path: path.to_path_buf(),
            message,
        }
    };

    gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
    let loaded = backend.load_model(gpu, path).and_then(|model| {
        let drawer = backend.bind_drawer(gpu, &target.output_layout())?;
        Ok(BoundModel { drawer, model })
    });
    let gpu_error = pollster::block_on(gpu.device.pop_error_scope());

    let bound = loaded.map_err(|e| failed(e.to_string()))?;
    if let Some(err) = gpu_error {
        return Err(failed(err.to_string()));
    }

    log::debug!("model '{}' loaded and drawer bound", path.display());
    Ok(bound)
}
