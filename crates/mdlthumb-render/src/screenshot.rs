//! Image export for captured thumbnails.

use std::path::Path;

use image::{ImageBuffer, Rgba};
use mdlthumb_core::PixelBuffer;

/// Saves a captured frame to an image file.
///
/// The format follows the extension: `.png`, or `.jpg`/`.jpeg` with alpha
/// dropped.
///
/// # Errors
/// Returns an error if the file cannot be written or the format is unsupported.
pub fn save_png(path: impl AsRef<Path>, pixels: &PixelBuffer) -> Result<(), ScreenshotError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let img = to_image(pixels)?;

    match extension.as_str() {
        "png" => {
            img.save_with_format(path, image::ImageFormat::Png)?;
        }
        "jpg" | "jpeg" => {
            let rgb_img = image::DynamicImage::ImageRgba8(img).to_rgb8();
            rgb_img.save_with_format(path, image::ImageFormat::Jpeg)?;
        }
        _ => {
            return Err(ScreenshotError::UnsupportedFormat(extension));
        }
    }

    log::info!(
        "wrote {}x{} thumbnail to {}",
        pixels.width(),
        pixels.height(),
        path.display()
    );
    Ok(())
}

/// Encodes a captured frame as PNG in memory.
pub fn encode_png(pixels: &PixelBuffer) -> Result<Vec<u8>, ScreenshotError> {
    let img = to_image(pixels)?;
    let mut buffer = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

fn to_image(pixels: &PixelBuffer) -> Result<ImageBuffer<Rgba<u8>, Vec<u8>>, ScreenshotError> {
    // Rows are tightly packed, so the byte vector maps straight onto the image.
    ImageBuffer::from_raw(pixels.width(), pixels.height(), pixels.as_bytes().to_vec())
        .ok_or(ScreenshotError::InvalidImageData)
}

/// Error type for image export.
#[derive(Debug, thiserror::Error)]
pub enum ScreenshotError {
    #[error("Failed to save image: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image encoding error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid image data")]
    InvalidImageData,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdlthumb_core::ChannelOrder;

    fn checker(width: u32, height: u32) -> PixelBuffer {
        let mut rows = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                rows.extend_from_slice(&[v, 0, 255 - v, 0]);
            }
        }
        PixelBuffer::from_device_rows(
            &rows,
            width as usize * 4,
            width,
            height,
            ChannelOrder::Rgba,
        )
        .unwrap()
    }

    #[test]
    fn test_encode_png_decodes_back() {
        let pixels = checker(4, 3);
        let png = encode_png(&pixels).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded.as_raw().as_slice(), pixels.as_bytes());
    }

    #[test]
    fn test_save_rejects_unknown_extension() {
        let path = std::env::temp_dir().join("mdlthumb_screenshot_test.tga");
        let err = save_png(&path, &checker(2, 2)).unwrap_err();
        assert!(matches!(err, ScreenshotError::UnsupportedFormat(ext) if ext == "tga"));
    }

    #[test]
    fn test_save_png_writes_file() {
        let path = std::env::temp_dir().join(format!(
            "mdlthumb_screenshot_test_{}.png",
            std::process::id()
        ));
        save_png(&path, &checker(8, 8)).unwrap();
        let decoded = image::open(&path).unwrap();
        assert_eq!(decoded.width(), 8);
        let _ = std::fs::remove_file(&path);
    }
}
