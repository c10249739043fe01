//! End-to-end rendering tests.
//!
//! These need a GPU adapter (real or software fallback). When no driver type
//! can produce a device the tests print a note and return early.

use std::path::PathBuf;

use mdlthumb::*;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Renders `path`, or returns `None` if this machine has no usable device.
fn render_or_skip(
    thumbnailer: &Thumbnailer,
    request: &RenderRequest,
) -> Option<Result<PixelBuffer>> {
    match thumbnailer.render(request) {
        Err(err) if err.kind() == FailureKind::DeviceUnavailable => {
            eprintln!("Skipping headless test: no GPU adapter available ({err})");
            None
        }
        other => Some(other),
    }
}

#[test]
fn headless_render_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
    let thumbnailer = Thumbnailer::default();
    let cube = fixture("cube.obj");

    // --- Test 1: 128x128 cube ---
    let Some(result) = render_or_skip(&thumbnailer, &RenderRequest::new(&cube, 128, 128)) else {
        return;
    };
    let pixels = result.expect("cube render failed");
    assert_eq!(pixels.width(), 128);
    assert_eq!(pixels.height(), 128);
    assert_eq!(pixels.stride(), 128 * 4);
    assert_eq!(pixels.as_bytes().len(), 128 * 128 * 4);
    assert!(pixels.as_bytes().chunks_exact(4).all(|px| px[3] == 0xFF));

    // Corners show the background, the center shows the cube.
    let background = pixels.pixel(0, 0).expect("corner pixel");
    assert!((i32::from(background[0]) - 51).abs() <= 2, "{background:?}");
    assert!((i32::from(background[1]) - 128).abs() <= 2, "{background:?}");
    assert!((i32::from(background[2]) - 178).abs() <= 2, "{background:?}");
    assert_ne!(pixels.pixel(64, 64), Some(background));

    // --- Test 2: missing model, then an independent render ---
    let err = thumbnailer
        .render(&RenderRequest::new(fixture("missing.bin"), 128, 128))
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::ModelLoadFailed);

    let again = thumbnailer
        .render(&RenderRequest::new(&cube, 128, 128))
        .expect("render after a failure should succeed");
    assert_eq!(again.as_bytes().len(), pixels.as_bytes().len());
    assert_eq!(again.pixel(0, 0), Some(background));
    assert_ne!(again.pixel(64, 64), Some(background));

    // --- Test 3: non-square output with padded rows ---
    let wide = thumbnailer
        .render(&RenderRequest::new(&cube, 100, 37))
        .expect("non-square render failed");
    assert_eq!(wide.stride(), 400);
    assert_eq!(wide.as_bytes().len(), 100 * 37 * 4);
    assert!(wide.as_bytes().chunks_exact(4).all(|px| px[3] == 0xFF));

    // --- Test 4: frame larger than the device allows ---
    let err = thumbnailer
        .render(&RenderRequest::new(&cube, 100_000, 1))
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::ResourceCreationFailed);
    let ThumbnailError::ResourceCreationFailed { step, .. } = &err else {
        panic!("expected ResourceCreationFailed, got {err}");
    };
    assert_eq!(*step, ProvisionStep::ColorTexture);

    let after = thumbnailer
        .render(&RenderRequest::new(&cube, 64, 64))
        .expect("render after a provisioning failure should succeed");
    assert_eq!(after.as_bytes().len(), 64 * 64 * 4);

    // --- Test 5: host adapter ---
    let mut provider = ModelThumbProvider::default();
    provider.initialize(&cube).expect("initialize");
    let thumb = provider.thumbnail(32).expect("thumbnail");
    assert_eq!(thumb.alpha, AlphaType::Argb);
    assert_eq!((thumb.pixels.width(), thumb.pixels.height()), (64, 64));

    // --- Test 6: PNG export ---
    let png = encode_png(&thumb.pixels).expect("encode");
    assert_eq!(&png[..4], b"\x89PNG");
}

/// Frames above the level minimums (2048 px at Downlevel) are bounded by the
/// adapter, not by the feature level.
#[test]
fn headless_large_frame_at_downlevel() {
    let _ = env_logger::builder().is_test(true).try_init();
    let thumbnailer = Thumbnailer::new(Options {
        feature_levels: vec![FeatureLevel::Downlevel, FeatureLevel::WebGl2],
        ..Options::default()
    });

    let request = RenderRequest::new(fixture("cube.obj"), 2560, 2560);
    let Some(result) = render_or_skip(&thumbnailer, &request) else {
        return;
    };
    let pixels = result.expect("2560x2560 render failed");
    assert_eq!((pixels.width(), pixels.height()), (2560, 2560));
    assert_eq!(pixels.as_bytes().len(), 2560 * 2560 * 4);
    assert!(pixels.as_bytes().chunks_exact(4).all(|px| px[3] == 0xFF));
}
