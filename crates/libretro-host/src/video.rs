use crate::raw;

/// Source framebuffer encodings a core may negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// No format negotiated yet; frames cannot be interpreted.
    #[default]
    Unknown,
    /// 16-bit 0RGB1555.
    ZRgb1555,
    /// 16-bit RGB565.
    Rgb565,
    /// 32-bit XRGB8888.
    XRgb8888,
}

impl PixelFormat {
    /// Maps a raw `enum retro_pixel_format` value. Values outside the three
    /// supported encodings collapse to [`Unknown`](Self::Unknown).
    pub fn from_raw(value: u32) -> Self {
        match value {
            raw::RETRO_PIXEL_FORMAT_0RGB1555 => Self::ZRgb1555,
            raw::RETRO_PIXEL_FORMAT_XRGB8888 => Self::XRgb8888,
            raw::RETRO_PIXEL_FORMAT_RGB565 => Self::Rgb565,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("no pixel interpretation negotiated for the incoming frame")]
    UnsupportedFormat,
    #[error("source frame too short (expected {expected} bytes, got {actual})")]
    SourceTooShort { expected: usize, actual: usize },
}

/// Canonical RGBA8 frame store every source format is converted into.
///
/// The backing bytes are exactly `width * height * 4` long. A dimension
/// change reallocates the store and invalidates its contents; converting at
/// unchanged dimensions reuses the allocation.
#[derive(Default)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// RGBA8 bytes, row-major, tightly packed.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn ensure_size(&mut self, width: u32, height: u32) {
        if self.width != width || self.height != height {
            self.width = width;
            self.height = height;
            self.pixels = vec![0; width as usize * height as usize * 4];
        }
    }

    /// Converts one raw core frame into the canonical RGBA store.
    ///
    /// `pitch` is the source row stride in bytes; rows may carry padding
    /// beyond `width` pixels, which is skipped. Both 16-bit formats go
    /// through the same 5/6/5 field extraction; see the crate docs for the
    /// 0RGB1555 caveat.
    ///
    /// Runs once per produced video frame; pure computation, no allocation
    /// unless the dimensions changed.
    pub fn convert(
        &mut self,
        src: &[u8],
        width: u32,
        height: u32,
        pitch: usize,
        format: PixelFormat,
    ) -> Result<(), ConvertError> {
        let bytes_per_pixel = match format {
            PixelFormat::XRgb8888 => 4,
            PixelFormat::Rgb565 | PixelFormat::ZRgb1555 => 2,
            PixelFormat::Unknown => return Err(ConvertError::UnsupportedFormat),
        };

        let (w, h) = (width as usize, height as usize);
        let expected = if h == 0 || w == 0 {
            0
        } else {
            (h - 1) * pitch + w * bytes_per_pixel
        };
        if src.len() < expected {
            return Err(ConvertError::SourceTooShort {
                expected,
                actual: src.len(),
            });
        }

        self.ensure_size(width, height);
        if w == 0 || h == 0 {
            return Ok(());
        }

        for (y, dst_row) in self.pixels.chunks_exact_mut(w * 4).enumerate() {
            let src_row = &src[y * pitch..y * pitch + w * bytes_per_pixel];
            match format {
                PixelFormat::XRgb8888 => {
                    for (dst, px) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
                        // Source bytes arrive as B,G,R,X; swap to R,G,B and
                        // force the frame opaque.
                        dst[0] = px[2];
                        dst[1] = px[1];
                        dst[2] = px[0];
                        dst[3] = 255;
                    }
                }
                _ => {
                    for (dst, px) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(2)) {
                        let px = u16::from_le_bytes([px[0], px[1]]);
                        let r = ((px & 0xF800) >> 11) as u32;
                        let g = ((px & 0x07E0) >> 5) as u32;
                        let b = (px & 0x001F) as u32;
                        dst[0] = ((r * 255) / 31) as u8;
                        dst[1] = ((g * 255) / 63) as u8;
                        dst[2] = ((b * 255) / 31) as u8;
                        dst[3] = 255;
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_rgb565(px: u16, width: usize, height: usize) -> Vec<u8> {
        px.to_le_bytes().repeat(width * height)
    }

    #[test]
    fn rgb565_primaries_map_to_full_channels() {
        let mut fb = FrameBuffer::new();
        for (px, expected) in [
            (0xF800u16, [255u8, 0, 0, 255]),
            (0x07E0, [0, 255, 0, 255]),
            (0x001F, [0, 0, 255, 255]),
        ] {
            let src = solid_rgb565(px, 2, 2);
            fb.convert(&src, 2, 2, 4, PixelFormat::Rgb565).unwrap();
            assert_eq!(fb.pixels().len(), 2 * 2 * 4);
            for pixel in fb.pixels().chunks_exact(4) {
                assert_eq!(pixel, expected);
            }
        }
    }

    #[test]
    fn xrgb8888_swaps_blue_and_red_and_forces_alpha() {
        let mut fb = FrameBuffer::new();
        let src = [10u8, 20, 30, 77].repeat(4);
        fb.convert(&src, 2, 2, 8, PixelFormat::XRgb8888).unwrap();
        for pixel in fb.pixels().chunks_exact(4) {
            assert_eq!(pixel, [30, 20, 10, 255]);
        }
    }

    #[test]
    fn both_16bit_formats_convert_identically() {
        let src = solid_rgb565(0b01010_101010_10101, 3, 1);
        let mut fb_565 = FrameBuffer::new();
        let mut fb_1555 = FrameBuffer::new();
        fb_565.convert(&src, 3, 1, 6, PixelFormat::Rgb565).unwrap();
        fb_1555.convert(&src, 3, 1, 6, PixelFormat::ZRgb1555).unwrap();
        assert_eq!(fb_565.pixels(), fb_1555.pixels());
    }

    #[test]
    fn every_supported_format_yields_opaque_frames_of_exact_size() {
        let mut fb = FrameBuffer::new();
        let cases: [(PixelFormat, Vec<u8>, usize); 3] = [
            (PixelFormat::Rgb565, solid_rgb565(0x1234, 4, 3), 8),
            (PixelFormat::ZRgb1555, solid_rgb565(0x1234, 4, 3), 8),
            (PixelFormat::XRgb8888, [9u8, 8, 7, 6].repeat(12), 16),
        ];
        for (format, src, pitch) in cases {
            fb.convert(&src, 4, 3, pitch, format).unwrap();
            assert_eq!(fb.pixels().len(), 4 * 3 * 4);
            assert!(fb.pixels().chunks_exact(4).all(|px| px[3] == 255));
        }
    }

    #[test]
    fn resize_reallocates_and_stable_dimensions_do_not() {
        let mut fb = FrameBuffer::new();
        let src = solid_rgb565(0xFFFF, 2, 2);
        fb.convert(&src, 2, 2, 4, PixelFormat::Rgb565).unwrap();
        assert_eq!(fb.pixels().len(), 16);
        let ptr_before = fb.pixels().as_ptr();
        let capacity_before = fb.pixels.capacity();

        fb.convert(&src, 2, 2, 4, PixelFormat::Rgb565).unwrap();
        assert_eq!(fb.pixels().as_ptr(), ptr_before);
        assert_eq!(fb.pixels.capacity(), capacity_before);

        let bigger = solid_rgb565(0xFFFF, 4, 4);
        fb.convert(&bigger, 4, 4, 8, PixelFormat::Rgb565).unwrap();
        assert_eq!(fb.pixels().len(), 4 * 4 * 4);
        assert_eq!(fb.width(), 4);
        assert_eq!(fb.height(), 4);
    }

    #[test]
    fn row_padding_in_the_pitch_is_skipped() {
        let mut fb = FrameBuffer::new();
        // Two 2-pixel rows with 4 bytes of padding at the end of each row.
        let mut src = Vec::new();
        for _ in 0..2 {
            src.extend_from_slice(&0xF800u16.to_le_bytes());
            src.extend_from_slice(&0x001Fu16.to_le_bytes());
            src.extend_from_slice(&[0xAA; 4]);
        }
        fb.convert(&src, 2, 2, 8, PixelFormat::Rgb565).unwrap();
        for row in fb.pixels().chunks_exact(8) {
            assert_eq!(&row[..4], [255, 0, 0, 255]);
            assert_eq!(&row[4..], [0, 0, 255, 255]);
        }
    }

    #[test]
    fn unknown_format_is_an_error() {
        let mut fb = FrameBuffer::new();
        let err = fb
            .convert(&[0; 16], 2, 2, 8, PixelFormat::Unknown)
            .unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedFormat));
    }

    #[test]
    fn short_source_is_an_error() {
        let mut fb = FrameBuffer::new();
        let err = fb
            .convert(&[0; 4], 2, 2, 4, PixelFormat::Rgb565)
            .unwrap_err();
        assert!(matches!(err, ConvertError::SourceTooShort { expected: 8, .. }));
    }
}
