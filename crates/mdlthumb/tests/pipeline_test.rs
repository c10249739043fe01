//! Orchestrator tests that run without a GPU.
//!
//! A scripted device factory stands in for the driver so the request guards
//! and the driver fallback order can be checked on any machine.

use std::sync::Mutex;

use mdlthumb::*;

/// Device factory that never produces a device and records every call.
#[derive(Default)]
struct ScriptedFactory {
    reject_levels_on: Vec<DriverType>,
    calls: Mutex<Vec<(DriverType, Vec<FeatureLevel>)>>,
}

impl ScriptedFactory {
    fn calls(&self) -> Vec<(DriverType, Vec<FeatureLevel>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl DeviceFactory for ScriptedFactory {
    type Device = GpuContext;

    fn create_device(
        &self,
        driver: DriverType,
        levels: &[FeatureLevel],
    ) -> std::result::Result<GpuContext, DeviceCreateError> {
        self.calls.lock().unwrap().push((driver, levels.to_vec()));
        if self.reject_levels_on.contains(&driver) && levels.first() == Some(&FeatureLevel::Full) {
            Err(DeviceCreateError::InvalidFeatureLevels(
                "full level not supported".to_string(),
            ))
        } else {
            Err(DeviceCreateError::Unavailable(format!("no {driver} adapter")))
        }
    }
}

fn thumbnailer(factory: ScriptedFactory) -> Thumbnailer<ScriptedFactory, ObjBackend> {
    Thumbnailer::with_parts(Options::default(), factory, ObjBackend::default())
}

#[test]
fn test_invalid_requests_never_touch_the_factory() {
    let thumbnailer = thumbnailer(ScriptedFactory::default());

    for request in [
        RenderRequest::new("", 128, 128),
        RenderRequest::new("cube.obj", 0, 128),
        RenderRequest::new("cube.obj", 128, 0),
    ] {
        let err = thumbnailer.render(&request).unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidRequest, "{request:?}");
    }
    assert!(thumbnailer.factory().calls().is_empty());
}

#[test]
fn test_fallback_walks_every_driver_in_order() {
    let thumbnailer = thumbnailer(ScriptedFactory::default());

    let err = thumbnailer
        .render(&RenderRequest::new("cube.obj", 128, 128))
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::DeviceUnavailable);

    let drivers: Vec<DriverType> = thumbnailer
        .factory()
        .calls()
        .into_iter()
        .map(|(driver, _)| driver)
        .collect();
    assert_eq!(
        drivers,
        vec![DriverType::Hardware, DriverType::Warp, DriverType::Reference]
    );

    let ThumbnailError::DeviceUnavailable { attempts } = err else {
        panic!("expected DeviceUnavailable");
    };
    assert_eq!(attempts.len(), 3);
    assert!(attempts.iter().all(|a| a.levels == FeatureLevel::ALL.to_vec()));
}

#[test]
fn test_rejected_level_set_is_retried_once_without_top_level() {
    let thumbnailer = thumbnailer(ScriptedFactory {
        reject_levels_on: vec![DriverType::Hardware],
        ..Default::default()
    });

    let err = thumbnailer
        .render(&RenderRequest::new("cube.obj", 64, 64))
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::DeviceUnavailable);

    let calls = thumbnailer.factory().calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[0].0, DriverType::Hardware);
    assert_eq!(calls[0].1, FeatureLevel::ALL.to_vec());
    assert_eq!(calls[1].0, DriverType::Hardware);
    assert_eq!(calls[1].1, FeatureLevel::ALL[1..].to_vec());
    assert_eq!(calls[2].0, DriverType::Warp);
    assert_eq!(calls[3].0, DriverType::Reference);
}

#[test]
fn test_configured_levels_are_passed_through() {
    let options = Options {
        feature_levels: vec![FeatureLevel::WebGl2],
        ..Options::default()
    };
    let thumbnailer =
        Thumbnailer::with_parts(options, ScriptedFactory::default(), ObjBackend::default());

    let _ = thumbnailer.render(&RenderRequest::new("cube.obj", 64, 64));
    assert!(thumbnailer
        .factory()
        .calls()
        .iter()
        .all(|(_, levels)| levels == &[FeatureLevel::WebGl2]));
}

#[test]
fn test_failures_are_independent() {
    let thumbnailer = thumbnailer(ScriptedFactory::default());
    let request = RenderRequest::new("cube.obj", 32, 32);

    let first = thumbnailer.render(&request).unwrap_err();
    let second = thumbnailer.render(&request).unwrap_err();
    assert_eq!(first.kind(), second.kind());
    assert_eq!(thumbnailer.factory().calls().len(), 6);
}

/// Device factory whose driver faults instead of returning an error.
struct FaultingFactory;

impl DeviceFactory for FaultingFactory {
    type Device = GpuContext;

    fn create_device(
        &self,
        _driver: DriverType,
        _levels: &[FeatureLevel],
    ) -> std::result::Result<GpuContext, DeviceCreateError> {
        panic!("driver fault");
    }
}

#[test]
fn test_panics_become_unexpected_fault() {
    let thumbnailer =
        Thumbnailer::with_parts(Options::default(), FaultingFactory, ObjBackend::default());

    let err = thumbnailer
        .render(&RenderRequest::new("cube.obj", 64, 64))
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::UnexpectedFault);
    assert!(err.to_string().contains("driver fault"), "{err}");

    // The thumbnailer stays usable after a fault.
    let err = thumbnailer
        .render(&RenderRequest::new("", 64, 64))
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::InvalidRequest);
}
