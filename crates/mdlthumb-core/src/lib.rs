//! Core types for mdlthumb.
//!
//! This crate holds everything the thumbnail pipeline exchanges that does not
//! touch the GPU:
//! - [`RenderRequest`] and its validation rules
//! - [`PixelBuffer`], the only artifact that outlives a render
//! - [`ThumbnailError`] and the [`FailureKind`] taxonomy
//! - [`Options`] and the device capability vocabulary ([`DriverType`], [`FeatureLevel`])

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod caps;
pub mod error;
pub mod options;
pub mod pixels;
pub mod request;

pub use caps::{DriverType, FeatureLevel};
pub use error::{DeviceAttempt, FailureKind, ProvisionStep, Result, ThumbnailError};
pub use options::{ConfigError, Options};
pub use pixels::{ChannelOrder, PixelBuffer, BYTES_PER_PIXEL};
pub use request::RenderRequest;
