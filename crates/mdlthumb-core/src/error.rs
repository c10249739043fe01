//! Error types for mdlthumb.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::caps::{DriverType, FeatureLevel};

/// Coarse failure classification reported to hosts.
///
/// A render either fully succeeds or fails with exactly one of these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Empty path or non-positive dimensions; no GPU work was attempted.
    InvalidRequest,
    /// No driver type could be initialized.
    DeviceUnavailable,
    /// A specific offscreen resource could not be created.
    ResourceCreationFailed,
    /// The model loader or drawer rejected the asset.
    ModelLoadFailed,
    /// Mapping or readback of the rendered frame failed.
    CaptureFailed,
    /// An abnormal runtime condition was raised inside the pipeline.
    UnexpectedFault,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::InvalidRequest => "InvalidRequest",
            FailureKind::DeviceUnavailable => "DeviceUnavailable",
            FailureKind::ResourceCreationFailed => "ResourceCreationFailed",
            FailureKind::ModelLoadFailed => "ModelLoadFailed",
            FailureKind::CaptureFailed => "CaptureFailed",
            FailureKind::UnexpectedFault => "UnexpectedFault",
        };
        f.write_str(name)
    }
}

/// Frame target provisioning steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvisionStep {
    ColorTexture,
    StagingTexture,
    RenderTargetView,
    DepthStencilTexture,
    DepthStencilView,
    OutputBinding,
    RasterizerState,
    Viewport,
}

impl ProvisionStep {
    /// Every step, in the order provisioning runs them.
    pub const ORDER: [ProvisionStep; 8] = [
        ProvisionStep::ColorTexture,
        ProvisionStep::StagingTexture,
        ProvisionStep::RenderTargetView,
        ProvisionStep::DepthStencilTexture,
        ProvisionStep::DepthStencilView,
        ProvisionStep::OutputBinding,
        ProvisionStep::RasterizerState,
        ProvisionStep::Viewport,
    ];
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProvisionStep::ColorTexture => "color texture",
            ProvisionStep::StagingTexture => "staging texture",
            ProvisionStep::RenderTargetView => "render target view",
            ProvisionStep::DepthStencilTexture => "depth-stencil texture",
            ProvisionStep::DepthStencilView => "depth-stencil view",
            ProvisionStep::OutputBinding => "output binding",
            ProvisionStep::RasterizerState => "rasterizer state",
            ProvisionStep::Viewport => "viewport",
        };
        f.write_str(name)
    }
}

/// One device creation attempt, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAttempt {
    pub driver: DriverType,
    pub levels: Vec<FeatureLevel>,
    pub outcome: String,
}

impl fmt::Display for DeviceAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [", self.driver)?;
        for (i, level) in self.levels.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{level}")?;
        }
        write!(f, "]: {}", self.outcome)
    }
}

fn join_attempts(attempts: &[DeviceAttempt]) -> String {
    if attempts.is_empty() {
        return "no attempts".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// The error type returned by the thumbnail pipeline.
#[derive(Error, Debug)]
pub enum ThumbnailError {
    /// The request was rejected before any GPU work.
    #[error("invalid render request: {0}")]
    InvalidRequest(String),

    /// Every driver type failed.
    #[error("no graphics device available ({})", join_attempts(.attempts))]
    DeviceUnavailable { attempts: Vec<DeviceAttempt> },

    /// An offscreen resource could not be created.
    #[error("failed to create {step}: {message}")]
    ResourceCreationFailed { step: ProvisionStep, message: String },

    /// The model loader or drawer rejected the asset.
    #[error("failed to load model '{}': {message}", .path.display())]
    ModelLoadFailed { path: PathBuf, message: String },

    /// The rendered frame could not be read back.
    #[error("frame capture failed: {0}")]
    CaptureFailed(String),

    /// A panic or driver fault surfaced inside the pipeline.
    #[error("unexpected fault: {0}")]
    UnexpectedFault(String),
}

impl ThumbnailError {
    /// Returns the failure classification.
    pub fn kind(&self) -> FailureKind {
        match self {
            ThumbnailError::InvalidRequest(_) => FailureKind::InvalidRequest,
            ThumbnailError::DeviceUnavailable { .. } => FailureKind::DeviceUnavailable,
            ThumbnailError::ResourceCreationFailed { .. } => FailureKind::ResourceCreationFailed,
            ThumbnailError::ModelLoadFailed { .. } => FailureKind::ModelLoadFailed,
            ThumbnailError::CaptureFailed(_) => FailureKind::CaptureFailed,
            ThumbnailError::UnexpectedFault(_) => FailureKind::UnexpectedFault,
        }
    }
}

/// A specialized Result type for thumbnail operations.
pub type Result<T> = std::result::Result<T, ThumbnailError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let cases = [
            (
                ThumbnailError::InvalidRequest("empty".into()),
                FailureKind::InvalidRequest,
            ),
            (
                ThumbnailError::DeviceUnavailable { attempts: vec![] },
                FailureKind::DeviceUnavailable,
            ),
            (
                ThumbnailError::ResourceCreationFailed {
                    step: ProvisionStep::StagingTexture,
                    message: "oom".into(),
                },
                FailureKind::ResourceCreationFailed,
            ),
            (
                ThumbnailError::ModelLoadFailed {
                    path: PathBuf::from("missing.bin"),
                    message: "not found".into(),
                },
                FailureKind::ModelLoadFailed,
            ),
            (
                ThumbnailError::CaptureFailed("map".into()),
                FailureKind::CaptureFailed,
            ),
            (
                ThumbnailError::UnexpectedFault("panic".into()),
                FailureKind::UnexpectedFault,
            ),
        ];
        for (err, kind) in cases {
            assert_eq!(err.kind(), kind);
        }
    }

    #[test]
    fn test_resource_error_names_step() {
        let err = ThumbnailError::ResourceCreationFailed {
            step: ProvisionStep::DepthStencilTexture,
            message: "out of memory".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to create depth-stencil texture: out of memory"
        );
    }

    #[test]
    fn test_device_unavailable_lists_attempts() {
        let err = ThumbnailError::DeviceUnavailable {
            attempts: vec![
                DeviceAttempt {
                    driver: DriverType::Hardware,
                    levels: vec![FeatureLevel::Full, FeatureLevel::Downlevel],
                    outcome: "no adapter".into(),
                },
                DeviceAttempt {
                    driver: DriverType::Warp,
                    levels: vec![FeatureLevel::Downlevel],
                    outcome: "no adapter".into(),
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("hardware [full, downlevel]: no adapter"));
        assert!(msg.contains("warp [downlevel]: no adapter"));
    }

    #[test]
    fn test_provision_order_starts_with_color() {
        assert_eq!(ProvisionStep::ORDER[0], ProvisionStep::ColorTexture);
        assert_eq!(ProvisionStep::ORDER[1], ProvisionStep::StagingTexture);
        assert_eq!(ProvisionStep::ORDER[7], ProvisionStep::Viewport);
    }
}
