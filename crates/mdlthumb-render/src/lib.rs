//! Rendering backend for mdlthumb.
//!
//! This crate provides the wgpu side of the thumbnail pipeline:
//! - device acquisition with driver and feature-level fallback ([`device`])
//! - offscreen color, depth and staging resources ([`frame_target`])
//! - the single-frame draw and readback ([`capture`])
//! - the model loader/drawer seam ([`bridge`]) and a reference OBJ mesh backend ([`mesh_render`])
//! - PNG export of captured frames ([`screenshot`])

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod bridge;
pub mod camera;
pub mod capture;
pub mod device;
pub mod error;
pub mod frame_target;
pub mod mesh_render;
pub mod screenshot;

pub use bridge::{load_and_bind, BoundModel, ModelBackend, ModelDrawer, OutputLayout};
pub use camera::Camera;
pub use capture::{draw_and_capture, read_back, render_frame};
pub use device::{acquire, DeviceFactory, GpuContext, WgpuDeviceFactory};
pub use error::{BridgeError, DeviceCreateError};
pub use frame_target::{FrameTarget, RasterState, Viewport};
pub use mesh_render::{MeshData, MeshDrawer, MeshModel, ObjBackend};
pub use screenshot::{encode_png, save_png, ScreenshotError};
