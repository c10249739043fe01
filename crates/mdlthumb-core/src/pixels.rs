//! Device-independent pixel buffers and readback conversion.

use crate::error::{Result, ThumbnailError};

/// Bytes per pixel of every buffer this crate produces.
pub const BYTES_PER_PIXEL: usize = 4;

/// Alpha written into every output pixel.
const OPAQUE: u8 = 0xFF;

/// Byte order of a mapped device image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    /// Blue, green, red, alpha.
    Bgra,
    /// Red, green, blue, alpha.
    Rgba,
}

/// Captured frame: tightly packed, top-down, RGBA, alpha always 0xFF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Converts mapped device rows into a pixel buffer.
    ///
    /// `src_stride` is the device row pitch and may exceed `width * 4`; the
    /// padding is dropped. Source alpha is discarded.
    pub fn from_device_rows(
        src: &[u8],
        src_stride: usize,
        width: u32,
        height: u32,
        order: ChannelOrder,
    ) -> Result<Self> {
        let row_bytes = width as usize * BYTES_PER_PIXEL;
        if src_stride < row_bytes {
            return Err(ThumbnailError::CaptureFailed(format!(
                "row pitch {src_stride} is smaller than row size {row_bytes}"
            )));
        }
        let height_px = height as usize;
        let needed = if height_px == 0 {
            0
        } else {
            src_stride * (height_px - 1) + row_bytes
        };
        if src.len() < needed {
            return Err(ThumbnailError::CaptureFailed(format!(
                "mapped data holds {} bytes, expected at least {needed}",
                src.len()
            )));
        }

        let mut data = vec![0u8; row_bytes * height_px];
        for (row, dst_row) in data.chunks_exact_mut(row_bytes.max(1)).enumerate() {
            let start = row * src_stride;
            let src_row = &src[start..start + row_bytes];
            for (dst, px) in dst_row
                .chunks_exact_mut(BYTES_PER_PIXEL)
                .zip(src_row.chunks_exact(BYTES_PER_PIXEL))
            {
                match order {
                    ChannelOrder::Bgra => {
                        dst[0] = px[2];
                        dst[1] = px[1];
                        dst[2] = px[0];
                    }
                    ChannelOrder::Rgba => dst[..3].copy_from_slice(&px[..3]),
                }
                dst[3] = OPAQUE;
            }
        }

        Ok(Self {
            width,
            height,
            stride: row_bytes,
            data,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes between the starts of consecutive rows (always `width * 4`).
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Raw RGBA bytes, row-major, top row first.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the buffer and returns the raw RGBA bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Returns the RGBA value at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = y as usize * self.stride + x as usize * BYTES_PER_PIXEL;
        let px = &self.data[offset..offset + BYTES_PER_PIXEL];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Iterates over all pixels, top row first.
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(BYTES_PER_PIXEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use proptest::prelude::*;

    #[test]
    fn test_bgra_reordered_to_rgba() {
        // One pixel: B=0x10, G=0x20, R=0x30, A=0x00
        let src = [0x10, 0x20, 0x30, 0x00];
        let buffer = PixelBuffer::from_device_rows(&src, 4, 1, 1, ChannelOrder::Bgra).unwrap();
        assert_eq!(buffer.pixel(0, 0), Some([0x30, 0x20, 0x10, 0xFF]));
    }

    #[test]
    fn test_rgba_passthrough_forces_alpha() {
        let src = [1, 2, 3, 4, 5, 6, 7, 8];
        let buffer = PixelBuffer::from_device_rows(&src, 8, 2, 1, ChannelOrder::Rgba).unwrap();
        assert_eq!(buffer.as_bytes(), &[1, 2, 3, 0xFF, 5, 6, 7, 0xFF]);
    }

    #[test]
    fn test_padded_rows_are_depadded() {
        // 2x2 image with a 256-byte device row pitch
        let pitch = 256;
        let mut src = vec![0xEEu8; pitch * 2];
        src[0..8].copy_from_slice(&[0, 0, 255, 9, 0, 255, 0, 9]);
        src[pitch..pitch + 8].copy_from_slice(&[255, 0, 0, 9, 1, 2, 3, 9]);

        let buffer =
            PixelBuffer::from_device_rows(&src, pitch, 2, 2, ChannelOrder::Bgra).unwrap();

        assert_eq!(buffer.stride(), 8);
        assert_eq!(buffer.as_bytes().len(), 16);
        assert_eq!(buffer.pixel(0, 0), Some([255, 0, 0, 255]));
        assert_eq!(buffer.pixel(1, 0), Some([0, 255, 0, 255]));
        assert_eq!(buffer.pixel(0, 1), Some([0, 0, 255, 255]));
        assert_eq!(buffer.pixel(1, 1), Some([3, 2, 1, 255]));
        assert_eq!(buffer.pixel(2, 0), None);
    }

    #[test]
    fn test_last_row_may_omit_padding() {
        // Mapped ranges are allowed to end right after the last pixel.
        let src = vec![7u8; 16 + 4];
        let buffer = PixelBuffer::from_device_rows(&src, 16, 1, 2, ChannelOrder::Rgba).unwrap();
        assert_eq!(buffer.as_bytes(), &[7, 7, 7, 255, 7, 7, 7, 255]);
    }

    #[test]
    fn test_short_source_is_capture_failure() {
        let src = [0u8; 12];
        let err = PixelBuffer::from_device_rows(&src, 8, 2, 2, ChannelOrder::Bgra).unwrap_err();
        assert_eq!(err.kind(), FailureKind::CaptureFailed);
    }

    #[test]
    fn test_pitch_smaller_than_row_is_capture_failure() {
        let src = [0u8; 64];
        let err = PixelBuffer::from_device_rows(&src, 4, 2, 2, ChannelOrder::Bgra).unwrap_err();
        assert_eq!(err.kind(), FailureKind::CaptureFailed);
    }

    proptest! {
        #[test]
        fn prop_size_stride_and_alpha(
            width in 1u32..48,
            height in 1u32..48,
            padding in 0usize..64,
            seed in any::<u8>(),
        ) {
            let pitch = width as usize * 4 + padding;
            let src: Vec<u8> = (0..pitch * height as usize)
                .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
                .collect();

            let buffer = PixelBuffer::from_device_rows(&src, pitch, width, height, ChannelOrder::Bgra)
                .unwrap();

            prop_assert_eq!(buffer.as_bytes().len(), (width * height * 4) as usize);
            prop_assert_eq!(buffer.stride(), (width * 4) as usize);
            prop_assert!(buffer.pixels().all(|px| px[3] == 0xFF));
        }

        #[test]
        fn prop_channel_reorder_matches_source(
            width in 1u32..16,
            height in 1u32..16,
            x_frac in 0.0f64..1.0,
            y_frac in 0.0f64..1.0,
            bgra in any::<[u8; 4]>(),
        ) {
            let pitch = (width as usize * 4).next_multiple_of(256);
            let mut src = vec![0u8; pitch * height as usize];
            let x = ((f64::from(width) * x_frac) as u32).min(width - 1);
            let y = ((f64::from(height) * y_frac) as u32).min(height - 1);
            let offset = y as usize * pitch + x as usize * 4;
            src[offset..offset + 4].copy_from_slice(&bgra);

            let buffer = PixelBuffer::from_device_rows(&src, pitch, width, height, ChannelOrder::Bgra)
                .unwrap();

            prop_assert_eq!(buffer.pixel(x, y), Some([bgra[2], bgra[1], bgra[0], 0xFF]));
        }
    }
}
