//! Rendering error types.

use thiserror::Error;

/// Why a single device creation attempt failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceCreateError {
    /// The driver rejected the requested feature-level set.
    ///
    /// Acquisition retries the same driver once with the top level dropped.
    #[error("feature level set rejected: {0}")]
    InvalidFeatureLevels(String),

    /// The driver could not produce a device.
    #[error("{0}")]
    Unavailable(String),
}

/// Errors reported by model loaders and drawers.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The asset could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// The asset decoded but holds nothing drawable.
    #[error("model contains no triangles")]
    EmptyModel,

    /// GPU-side setup for the model or drawer failed.
    #[error("gpu setup failed: {0}")]
    Gpu(String),
}

impl From<tobj::LoadError> for BridgeError {
    fn from(err: tobj::LoadError) -> Self {
        match err {
            tobj::LoadError::OpenFileFailed => BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "failed to open model file",
            )),
            other => BridgeError::Parse(other.to_string()),
        }
    }
}
