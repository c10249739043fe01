//! Single-frame draw and readback.

use mdlthumb_core::{PixelBuffer, Result, ThumbnailError};

use crate::bridge::{BoundModel, ModelBackend};
use crate::device::GpuContext;
use crate::frame_target::{channel_order, FrameTarget};

/// Clears the target, draws the bound model once, and waits for the GPU.
///
/// Returns only after the submitted work has retired, so a following
/// [`read_back`] never observes a partial frame. Validation errors raised
/// while recording or submitting are reported as `UnexpectedFault`.
pub fn render_frame<B: ModelBackend>(
    gpu: &GpuContext,
    target: &FrameTarget,
    background: [f32; 4],
    model: Option<&mut BoundModel<B>>,
) -> Result<()> {
    gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);

    let mut model = model;
    if let Some(bound) = model.as_deref_mut() {
        bound.prepare(gpu, target.width(), target.height());
    }

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("thumbnail frame encoder"),
        });

    {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("thumbnail frame pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view(),
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color(background)),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: target.depth_view(),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Store,
                }),
            }),
            ..Default::default()
        });

        target.bind_output_state(&mut pass);

        if let Some(bound) = model.as_deref_mut() {
            bound.draw(&mut pass);
        }
    }

    gpu.queue.submit(std::iter::once(encoder.finish()));

    let fault = pollster::block_on(gpu.device.pop_error_scope());
    if let Some(err) = fault {
        log::error!("frame draw raised a device error: {err}");
        return Err(ThumbnailError::UnexpectedFault(err.to_string()));
    }

    gpu.device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(|e| ThumbnailError::UnexpectedFault(format!("flush failed: {e}")))?;

    log::debug!("frame rendered");
    Ok(())
}

/// Copies the rendered frame out through the staging texture and converts it.
///
/// The color texture is copied whole into the staging texture, the staging
/// texture into the padded readback buffer, which is then mapped. The mapping
/// is always released before returning.
pub fn read_back(gpu: &GpuContext, target: &FrameTarget) -> Result<PixelBuffer> {
    let (buffer, bytes_per_row) = target.readback();
    let extent = target.extent();

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("thumbnail readback encoder"),
        });

    encoder.copy_texture_to_texture(
        target.color_texture().as_image_copy(),
        target.staging_texture().as_image_copy(),
        extent,
    );

    encoder.copy_texture_to_buffer(
        target.staging_texture().as_image_copy(),
        wgpu::TexelCopyBufferInfo {
            buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(target.height()),
            },
        },
        extent,
    );

    gpu.queue.submit(std::iter::once(encoder.finish()));

    let slice = buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    gpu.device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(|e| ThumbnailError::CaptureFailed(format!("poll failed: {e}")))?;
    rx.recv()
        .map_err(|_| ThumbnailError::CaptureFailed("map callback dropped".to_string()))?
        .map_err(|e| ThumbnailError::CaptureFailed(format!("map failed: {e}")))?;

    let data = slice.get_mapped_range();
    let pixels = PixelBuffer::from_device_rows(
        &data,
        bytes_per_row as usize,
        target.width(),
        target.height(),
        channel_order(target.color_format()),
    );
    drop(data);
    buffer.unmap();

    let pixels = pixels?;
    log::debug!(
        "captured {}x{} frame (row pitch {bytes_per_row})",
        pixels.width(),
        pixels.height()
    );
    Ok(pixels)
}

/// [`render_frame`] followed by [`read_back`].
pub fn draw_and_capture<B: ModelBackend>(
    gpu: &GpuContext,
    target: &FrameTarget,
    background: [f32; 4],
    model: Option<&mut BoundModel<B>>,
) -> Result<PixelBuffer> {
    render_frame(gpu, target, background, model)?;
    read_back(gpu, target)
}

fn clear_color(rgba: [f32; 4]) -> wgpu::Color {
    wgpu::Color {
        r: f64::from(rgba[0]),
        g: f64::from(rgba[1]),
        b: f64::from(rgba[2]),
        a: f64::from(rgba[3]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_color_widens() {
        let color = clear_color([0.2, 0.5, 0.698, 1.0]);
        assert!((color.r - 0.2).abs() < 1e-6);
        assert!((color.b - 0.698).abs() < 1e-6);
        assert!((color.a - 1.0).abs() < f64::EPSILON);
    }
}
