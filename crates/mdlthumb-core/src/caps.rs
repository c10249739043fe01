//! Device capability vocabulary shared by configuration and the device layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of driver a device is created on.
///
/// Acquisition walks [`DriverType::PRIORITY`] in order and stops at the first
/// driver that yields a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriverType {
    /// Hardware-accelerated adapter.
    Hardware,
    /// Software rasterizer adapter (WARP, llvmpipe, SwiftShader).
    Warp,
    /// Pure software reference path on the secondary (GL) backends.
    Reference,
}

impl DriverType {
    /// Fixed acquisition order.
    pub const PRIORITY: [DriverType; 3] =
        [DriverType::Hardware, DriverType::Warp, DriverType::Reference];

    /// Returns display name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            DriverType::Hardware => "hardware",
            DriverType::Warp => "warp",
            DriverType::Reference => "reference",
        }
    }
}

impl fmt::Display for DriverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Named tier of GPU capability requested during device negotiation.
///
/// Variants are ordered from broadest to narrowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeatureLevel {
    /// Full WebGPU limits on a compliant adapter.
    Full,
    /// Downlevel limits (roughly GLES 3.1 / D3D11 class hardware).
    Downlevel,
    /// WebGL2-class limits, the floor every adapter must reach.
    WebGl2,
}

impl FeatureLevel {
    /// Every level, broadest first.
    pub const ALL: [FeatureLevel; 3] = [
        FeatureLevel::Full,
        FeatureLevel::Downlevel,
        FeatureLevel::WebGl2,
    ];

    /// Returns display name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            FeatureLevel::Full => "full",
            FeatureLevel::Downlevel => "downlevel",
            FeatureLevel::WebGl2 => "webgl2",
        }
    }
}

impl fmt::Display for FeatureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
