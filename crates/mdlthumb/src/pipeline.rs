//! The thumbnail pipeline orchestrator.
//!
//! One call to [`Thumbnailer::render`] acquires a device, provisions a frame
//! target, loads and binds the model, draws one frame, and reads it back. Every
//! GPU object is owned by a local of that call and is released before it
//! returns, whether it succeeds, fails, or panics.

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use mdlthumb_core::{Options, PixelBuffer, RenderRequest, Result, ThumbnailError};
use mdlthumb_render::{
    capture, device, load_and_bind, DeviceFactory, FrameTarget, GpuContext, ModelBackend,
    ObjBackend, WgpuDeviceFactory,
};

/// Where a render currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    DeviceReady,
    TargetReady,
    ModelReady,
    Rendered,
    Captured,
    TornDown,
}

impl PipelineStage {
    pub fn name(self) -> &'static str {
        match self {
            PipelineStage::Idle => "idle",
            PipelineStage::DeviceReady => "device ready",
            PipelineStage::TargetReady => "target ready",
            PipelineStage::ModelReady => "model ready",
            PipelineStage::Rendered => "rendered",
            PipelineStage::Captured => "captured",
            PipelineStage::TornDown => "torn down",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Renders model files to pixel buffers.
///
/// Holds no GPU state between calls. The default configuration uses
/// [`WgpuDeviceFactory`] and the OBJ [`ObjBackend`].
pub struct Thumbnailer<F = WgpuDeviceFactory, B = ObjBackend> {
    options: Options,
    factory: F,
    backend: B,
}

impl Thumbnailer {
    /// Creates a thumbnailer with the wgpu device factory and OBJ backend.
    pub fn new(options: Options) -> Self {
        let factory = WgpuDeviceFactory::new(options.debug_validation);
        Self {
            options,
            factory,
            backend: ObjBackend::default(),
        }
    }
}

impl Default for Thumbnailer {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl<F, B> Thumbnailer<F, B>
where
    F: DeviceFactory<Device = GpuContext>,
    B: ModelBackend,
{
    /// Creates a thumbnailer from explicit collaborators.
    pub fn with_parts(options: Options, factory: F, backend: B) -> Self {
        Self {
            options,
            factory,
            backend,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Renders `request` and returns the captured frame.
    ///
    /// The error kind is that of the first failing step. A panic anywhere in
    /// the sequence is reported as `UnexpectedFault` after all resources
    /// acquired so far have been released.
    pub fn render(&self, request: &RenderRequest) -> Result<PixelBuffer> {
        let stage = Cell::new(PipelineStage::Idle);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run(request, &stage)));
        let reached = stage.get();
        advance(&stage, PipelineStage::TornDown);

        match outcome {
            Ok(Ok(pixels)) => {
                log::info!(
                    "rendered '{}' at {}x{}",
                    request.path().display(),
                    pixels.width(),
                    pixels.height()
                );
                Ok(pixels)
            }
            Ok(Err(err)) => {
                log::error!("render failed after '{reached}' ({}): {err}", err.kind());
                Err(err)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::error!("render panicked after '{reached}': {message}");
                Err(ThumbnailError::UnexpectedFault(message))
            }
        }
    }

    fn run(&self, request: &RenderRequest, stage: &Cell<PipelineStage>) -> Result<PixelBuffer> {
        request.validate()?;

        let gpu = device::acquire(&self.factory, &self.options.feature_levels)?;
        advance(stage, PipelineStage::DeviceReady);

        let target = FrameTarget::provision(&gpu, request.width, request.height)?;
        advance(stage, PipelineStage::TargetReady);

        let mut model = load_and_bind(&self.backend, &gpu, &target, request.path())?;
        advance(stage, PipelineStage::ModelReady);

        capture::render_frame(
            &gpu,
            &target,
            self.options.background_color,
            Some(&mut model),
        )?;
        advance(stage, PipelineStage::Rendered);

        let pixels = capture::read_back(&gpu, &target)?;
        advance(stage, PipelineStage::Captured);

        // Reverse acquisition order.
        drop(model);
        drop(target);
        drop(gpu);

        Ok(pixels)
    }
}

fn advance(stage: &Cell<PipelineStage>, next: PipelineStage) {
    log::debug!("pipeline: {} -> {next}", stage.get());
    stage.set(next);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
