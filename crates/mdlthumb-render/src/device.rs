//! GPU device acquisition.
//!
//! Devices are created per render and never cached. Acquisition walks the
//! driver types in [`DriverType::PRIORITY`] order and stops at the first one
//! that produces a device; see [`acquire`].

use mdlthumb_core::{DeviceAttempt, DriverType, FeatureLevel, Result, ThumbnailError};

use crate::error::DeviceCreateError;

/// Creates a device on one driver type.
///
/// `levels` is ordered broadest first. Implementations negotiate the best
/// level they can satisfy, or return [`DeviceCreateError::InvalidFeatureLevels`]
/// when the driver cannot interpret the top of the list at all.
pub trait DeviceFactory {
    /// Device handle produced on success.
    type Device;

    fn create_device(
        &self,
        driver: DriverType,
        levels: &[FeatureLevel],
    ) -> std::result::Result<Self::Device, DeviceCreateError>;
}

/// Acquires a device, falling back through driver types in priority order.
///
/// For each driver the full level list is tried first. If the driver rejects
/// the list as invalid, the same driver is retried once with the top level
/// dropped. Every attempt is recorded in the returned error when all drivers
/// fail.
pub fn acquire<F: DeviceFactory + ?Sized>(
    factory: &F,
    levels: &[FeatureLevel],
) -> Result<F::Device> {
    let mut attempts = Vec::new();

    for driver in DriverType::PRIORITY {
        let mut requested = levels;
        let mut outcome = factory.create_device(driver, requested);

        if let Err(DeviceCreateError::InvalidFeatureLevels(reason)) = &outcome {
            if requested.len() > 1 {
                log::debug!("{driver} driver rejected levels {requested:?} ({reason}), retrying");
                attempts.push(DeviceAttempt {
                    driver,
                    levels: requested.to_vec(),
                    outcome: reason.clone(),
                });
                requested = &requested[1..];
                outcome = factory.create_device(driver, requested);
            }
        }

        match outcome {
            Ok(device) => {
                log::debug!("device created on {driver} driver");
                return Ok(device);
            }
            Err(err) => {
                log::warn!("{driver} driver unavailable: {err}");
                attempts.push(DeviceAttempt {
                    driver,
                    levels: requested.to_vec(),
                    outcome: err.to_string(),
                });
            }
        }
    }

    log::error!("no driver type could create a device");
    Err(ThumbnailError::DeviceUnavailable { attempts })
}

/// Limits requested for a feature level.
pub fn limits_for(level: FeatureLevel) -> wgpu::Limits {
    match level {
        FeatureLevel::Full => wgpu::Limits::default(),
        FeatureLevel::Downlevel => wgpu::Limits::downlevel_defaults(),
        FeatureLevel::WebGl2 => wgpu::Limits::downlevel_webgl2_defaults(),
    }
}

/// Limits requested from an adapter at `level`.
///
/// Resolution limits (texture dimensions and friends) are raised to what the
/// adapter supports, so large frames work at any level the adapter satisfies.
pub fn device_limits(level: FeatureLevel, supported: &wgpu::Limits) -> wgpu::Limits {
    limits_for(level).using_resolution(supported.clone())
}

/// Owns the wgpu device and queue for exactly one render.
///
/// Dropping the context destroys the device.
pub struct GpuContext {
    /// The wgpu instance.
    pub instance: wgpu::Instance,
    /// The selected adapter.
    pub adapter: wgpu::Adapter,
    /// The logical device.
    pub device: wgpu::Device,
    /// The command queue.
    pub queue: wgpu::Queue,
    /// Driver type the device was created on.
    pub driver: DriverType,
    /// Negotiated feature level.
    pub feature_level: FeatureLevel,
}

impl GpuContext {
    /// Returns the adapter description.
    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        log::debug!("destroying {} device", self.driver);
        self.device.destroy();
    }
}

/// The real [`DeviceFactory`], backed by wgpu adapters.
///
/// Driver types map onto adapter requests:
/// - `Hardware`: primary backends, no fallback adapter
/// - `Warp`: primary backends, software fallback adapter
/// - `Reference`: secondary (GL) backends, software fallback adapter
#[derive(Debug, Clone, Default)]
pub struct WgpuDeviceFactory {
    /// Enables backend validation layers.
    pub debug_validation: bool,
}

impl WgpuDeviceFactory {
    /// Creates a factory.
    pub fn new(debug_validation: bool) -> Self {
        Self { debug_validation }
    }

    fn instance_for(&self, driver: DriverType) -> wgpu::Instance {
        let backends = match driver {
            DriverType::Hardware | DriverType::Warp => wgpu::Backends::PRIMARY,
            DriverType::Reference => wgpu::Backends::SECONDARY,
        };
        let flags = if self.debug_validation {
            wgpu::InstanceFlags::VALIDATION | wgpu::InstanceFlags::DEBUG
        } else {
            wgpu::InstanceFlags::empty()
        };
        wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            flags,
            ..Default::default()
        })
    }
}

impl DeviceFactory for WgpuDeviceFactory {
    type Device = GpuContext;

    fn create_device(
        &self,
        driver: DriverType,
        levels: &[FeatureLevel],
    ) -> std::result::Result<GpuContext, DeviceCreateError> {
        let instance = self.instance_for(driver);

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: driver != DriverType::Hardware,
        }))
        .map_err(|e| DeviceCreateError::Unavailable(format!("no adapter: {e}")))?;

        let info = adapter.get_info();
        log::debug!(
            "{driver} driver offered adapter '{}' ({:?}, {:?})",
            info.name,
            info.backend,
            info.device_type
        );

        let feature_level = negotiate(&adapter, levels)?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("mdlthumb device"),
            required_features: wgpu::Features::empty(),
            required_limits: device_limits(feature_level, &adapter.limits()),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: Default::default(),
            experimental_features: Default::default(),
        }))
        .map_err(|e| DeviceCreateError::Unavailable(format!("device request failed: {e}")))?;

        if self.debug_validation {
            log::debug!("validation layers requested for '{}'", info.name);
        }
        log::info!(
            "using '{}' on {:?} ({driver} driver, {feature_level} level)",
            info.name,
            info.backend
        );

        Ok(GpuContext {
            instance,
            adapter,
            device,
            queue,
            driver,
            feature_level,
        })
    }
}

/// Picks the first requested level the adapter satisfies.
///
/// A `Full` request on an adapter that is not WebGPU compliant is treated as
/// an invalid level set, which lets [`acquire`] retry without it.
fn negotiate(
    adapter: &wgpu::Adapter,
    levels: &[FeatureLevel],
) -> std::result::Result<FeatureLevel, DeviceCreateError> {
    let Some(&top) = levels.first() else {
        return Err(DeviceCreateError::InvalidFeatureLevels(
            "no feature levels requested".to_string(),
        ));
    };

    if top == FeatureLevel::Full && !adapter.get_downlevel_capabilities().is_webgpu_compliant() {
        return Err(DeviceCreateError::InvalidFeatureLevels(format!(
            "adapter cannot express the {top} level"
        )));
    }

    let supported = adapter.limits();
    levels
        .iter()
        .copied()
        .find(|level| limits_for(*level).check_limits(&supported))
        .ok_or_else(|| {
            DeviceCreateError::Unavailable(format!(
                "adapter supports none of the requested levels {levels:?}"
            ))
        })
}
