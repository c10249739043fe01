//! Offscreen render targets.
//!
//! A [`FrameTarget`] owns everything a single frame is drawn into and read
//! back from: the color texture, a depth-stencil buffer, a staging texture of
//! identical size and format, and the mappable readback buffer behind it.

use mdlthumb_core::{ChannelOrder, ProvisionStep, Result, ThumbnailError, BYTES_PER_PIXEL};

use crate::bridge::OutputLayout;
use crate::device::GpuContext;

/// Depth-stencil format (24-bit depth, 8-bit stencil).
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// Color formats tried for the render target, in order of preference.
const COLOR_FORMATS: [wgpu::TextureFormat; 2] = [
    wgpu::TextureFormat::Bgra8Unorm,
    wgpu::TextureFormat::Rgba8Unorm,
];

/// Rasterizer configuration shared with model drawers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterState {
    pub primitive: wgpu::PrimitiveState,
    pub multisample: wgpu::MultisampleState,
}

impl RasterState {
    /// Back-face culling, solid fill, depth clipping, no multisampling.
    pub fn thumbnail() -> Self {
        Self {
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
        }
    }
}

/// Viewport rectangle and depth range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Covers the whole target with depth range `[0, 1]`.
    #[allow(clippy::cast_precision_loss)]
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Bytes per row of the readback buffer, padded for buffer copies.
///
/// `None` if the padded row does not fit in a `u32`.
pub fn aligned_bytes_per_row(width: u32) -> Option<u32> {
    let bytes_per_pixel = u32::try_from(BYTES_PER_PIXEL).ok()?;
    width
        .checked_mul(bytes_per_pixel)?
        .checked_next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
}

/// Byte order of mapped data for a color format.
pub fn channel_order(format: wgpu::TextureFormat) -> ChannelOrder {
    match format {
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => ChannelOrder::Bgra,
        _ => ChannelOrder::Rgba,
    }
}

/// Offscreen resources for one frame.
///
/// Dropping the target destroys every texture and buffer it owns.
pub struct FrameTarget {
    width: u32,
    height: u32,
    color_format: wgpu::TextureFormat,
    color_texture: wgpu::Texture,
    color_view: wgpu::TextureView,
    staging_texture: wgpu::Texture,
    readback_buffer: wgpu::Buffer,
    readback_bytes_per_row: u32,
    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
    raster: RasterState,
    viewport: Viewport,
}

impl FrameTarget {
    /// Creates the offscreen resources for a `width` x `height` frame.
    ///
    /// Steps run in [`ProvisionStep::ORDER`]; the first failing step aborts
    /// provisioning and is named in the returned error. Anything created
    /// before the failure is released on return.
    pub fn provision(gpu: &GpuContext, width: u32, height: u32) -> Result<Self> {
        let device = &gpu.device;
        let color_format = select_color_format(&gpu.adapter);
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let color_texture = guarded(device, ProvisionStep::ColorTexture, || {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some("thumbnail color texture"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: color_format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            })
        })?;

        let readback_bytes_per_row =
            aligned_bytes_per_row(width).ok_or_else(|| ThumbnailError::ResourceCreationFailed {
                step: ProvisionStep::StagingTexture,
                message: format!("row pitch for width {width} overflows"),
            })?;
        let (staging_texture, readback_buffer) =
            guarded(device, ProvisionStep::StagingTexture, || {
                let texture = device.create_texture(&wgpu::TextureDescriptor {
                    label: Some("thumbnail staging texture"),
                    size,
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: color_format,
                    usage: wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::COPY_SRC,
                    view_formats: &[],
                });
                let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("thumbnail readback buffer"),
                    size: u64::from(readback_bytes_per_row) * u64::from(height),
                    usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                    mapped_at_creation: false,
                });
                (texture, buffer)
            })?;

        let color_view = guarded(device, ProvisionStep::RenderTargetView, || {
            color_texture.create_view(&wgpu::TextureViewDescriptor {
                label: Some("thumbnail color view"),
                ..Default::default()
            })
        })?;

        let depth_texture = guarded(device, ProvisionStep::DepthStencilTexture, || {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some("thumbnail depth texture"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
        })?;

        let depth_view = guarded(device, ProvisionStep::DepthStencilView, || {
            depth_texture.create_view(&wgpu::TextureViewDescriptor {
                label: Some("thumbnail depth view"),
                ..Default::default()
            })
        })?;

        // The remaining steps are pass state in wgpu: they are recorded here
        // and applied when the frame's render pass begins.
        log::debug!("provisioned {}", ProvisionStep::OutputBinding);
        let raster = RasterState::thumbnail();
        log::debug!("provisioned {}", ProvisionStep::RasterizerState);
        let viewport = Viewport::full(width, height);
        log::debug!("provisioned {}", ProvisionStep::Viewport);

        log::debug!("frame target ready: {width}x{height} {color_format:?}");

        Ok(Self {
            width,
            height,
            color_format,
            color_texture,
            color_view,
            staging_texture,
            readback_buffer,
            readback_bytes_per_row,
            depth_texture,
            depth_view,
            raster,
            viewport,
        })
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Color format shared by the render and staging textures.
    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.color_format
    }

    /// Render target view.
    pub fn color_view(&self) -> &wgpu::TextureView {
        &self.color_view
    }

    /// Depth-stencil view.
    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_view
    }

    /// Formats and raster state a drawer must build its pipeline against.
    pub fn output_layout(&self) -> OutputLayout {
        OutputLayout {
            color_format: self.color_format,
            depth_format: DEPTH_FORMAT,
            raster: self.raster,
        }
    }

    pub(crate) fn color_texture(&self) -> &wgpu::Texture {
        &self.color_texture
    }

    pub(crate) fn staging_texture(&self) -> &wgpu::Texture {
        &self.staging_texture
    }

    pub(crate) fn readback(&self) -> (&wgpu::Buffer, u32) {
        (&self.readback_buffer, self.readback_bytes_per_row)
    }

    pub(crate) fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }

    /// Applies viewport and scissor to a pass.
    pub fn bind_output_state(&self, pass: &mut wgpu::RenderPass<'_>) {
        let vp = self.viewport;
        pass.set_viewport(vp.x, vp.y, vp.width, vp.height, vp.min_depth, vp.max_depth);
        pass.set_scissor_rect(0, 0, self.width, self.height);
    }
}

impl Drop for FrameTarget {
    fn drop(&mut self) {
        self.readback_buffer.destroy();
        self.depth_texture.destroy();
        self.staging_texture.destroy();
        self.color_texture.destroy();
        log::debug!("frame target released");
    }
}

fn select_color_format(adapter: &wgpu::Adapter) -> wgpu::TextureFormat {
    let required = wgpu::TextureUsages::RENDER_ATTACHMENT
        | wgpu::TextureUsages::TEXTURE_BINDING
        | wgpu::TextureUsages::COPY_SRC
        | wgpu::TextureUsages::COPY_DST;
    COLOR_FORMATS
        .into_iter()
        .find(|format| {
            adapter
                .get_texture_format_features(*format)
                .allowed_usages
                .contains(required)
        })
        .unwrap_or(wgpu::TextureFormat::Rgba8Unorm)
}

/// Runs one provisioning step inside validation and out-of-memory error scopes.
fn guarded<T>(device: &wgpu::Device, step: ProvisionStep, create: impl FnOnce() -> T) -> Result<T> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    let validation = pollster::block_on(device.pop_error_scope());
    let out_of_memory = pollster::block_on(device.pop_error_scope());

    if let Some(err) = validation.or(out_of_memory) {
        log::error!("failed to create {step}: {err}");
        return Err(ThumbnailError::ResourceCreationFailed {
            step,
            message: err.to_string(),
        });
    }
    log::debug!("provisioned {step}");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_aligned_bytes_per_row() {
        assert_eq!(aligned_bytes_per_row(64), Some(256));
        assert_eq!(aligned_bytes_per_row(1), Some(256));
        assert_eq!(aligned_bytes_per_row(65), Some(512));
        assert_eq!(aligned_bytes_per_row(128), Some(512));
        assert_eq!(aligned_bytes_per_row(0), Some(0));
    }

    #[test]
    fn test_aligned_bytes_per_row_overflow() {
        assert_eq!(aligned_bytes_per_row(u32::MAX), None);
        assert_eq!(aligned_bytes_per_row(u32::MAX / 4), None);
        assert!(aligned_bytes_per_row(16_384).is_some());
    }

    #[test]
    fn test_channel_order() {
        assert_eq!(
            channel_order(wgpu::TextureFormat::Bgra8Unorm),
            ChannelOrder::Bgra
        );
        assert_eq!(
            channel_order(wgpu::TextureFormat::Rgba8Unorm),
            ChannelOrder::Rgba
        );
    }

    #[test]
    fn test_raster_state() {
        let raster = RasterState::thumbnail();
        assert_eq!(raster.primitive.cull_mode, Some(wgpu::Face::Back));
        assert_eq!(raster.primitive.polygon_mode, wgpu::PolygonMode::Fill);
        assert!(!raster.primitive.unclipped_depth);
        assert_eq!(raster.multisample.count, 1);
    }

    #[test]
    fn test_full_viewport() {
        let vp = Viewport::full(128, 64);
        assert_eq!((vp.x, vp.y, vp.width, vp.height), (0.0, 0.0, 128.0, 64.0));
        assert_eq!((vp.min_depth, vp.max_depth), (0.0, 1.0));
    }

    proptest! {
        #[test]
        fn prop_row_pitch_is_aligned_and_minimal(width in 1u32..8192) {
            let pitch = aligned_bytes_per_row(width).unwrap();
            let row = width * 4;
            prop_assert_eq!(pitch % wgpu::COPY_BYTES_PER_ROW_ALIGNMENT, 0);
            prop_assert!(pitch >= row);
            prop_assert!(pitch - row < wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        }
    }
}
