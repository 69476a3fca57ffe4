//! Decoded raster images in CPU memory, before GPU upload.

use std::path::Path;

use anyhow::Context;

use crate::pixel::{rgb5a1_to_rgba8, rgb8_to_rgba8};

/// Pixel layouts a loader can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// 16 bits per pixel, `RRRRRGGG:GGBBBBBA` in little-endian byte order.
    Rgb5A1,
    /// 24 bits per pixel, one byte per channel.
    Rgb8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb5A1 => 2,
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// Channel order tag carried alongside the pixel buffer. Every loader in
/// this crate currently produces `Abgr`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColourOrder {
    Abgr,
}

/// Exact size in bytes of a single-level buffer for `format` at `width`x`height`.
/// Returns `None` if the size does not fit in `usize`.
pub fn compute_buffer_size(format: PixelFormat, width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(format.bytes_per_pixel())
}

/// Decoded image. `data.len()` always equals
/// `compute_buffer_size(format, width, height)`.
#[derive(Clone, Debug)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub colour_order: ColourOrder,
    pub levels: u32,
    pub data: Vec<u8>,
}

impl RasterImage {
    /// Check if the buffer matches the declared format and dimensions.
    /// A zero-sized image with an empty buffer is valid.
    pub fn is_valid(&self) -> bool {
        compute_buffer_size(self.format, self.width, self.height) == Some(self.data.len())
    }

    /// Expand the pixel buffer to 8-bit RGBA.
    pub fn to_rgba8(&self) -> anyhow::Result<image::RgbaImage> {
        let bpp = self.format.bytes_per_pixel();
        let mut out = Vec::with_capacity(self.data.len() / bpp * 4);
        for px in self.data.chunks_exact(bpp) {
            let rgba = match self.format {
                PixelFormat::Rgb5A1 => rgb5a1_to_rgba8(u16::from_le_bytes([px[0], px[1]])),
                PixelFormat::Rgb8 => rgb8_to_rgba8([px[0], px[1], px[2]]),
            };
            out.extend_from_slice(&rgba);
        }
        image::RgbaImage::from_raw(self.width, self.height, out).ok_or_else(|| {
            anyhow::anyhow!(
                "pixel buffer does not match {}x{} {:?}",
                self.width,
                self.height,
                self.format
            )
        })
    }

    /// Write the image as a PNG file.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let rgba = self.to_rgba8()?;
        rgba.save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("Failed to write PNG {:?}", path))?;
        log::info!("Wrote {}x{} PNG to {:?}", self.width, self.height, path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> RasterImage {
        RasterImage {
            width,
            height,
            format,
            colour_order: ColourOrder::Abgr,
            levels: 1,
            data,
        }
    }

    #[test]
    fn buffer_size_per_format() {
        assert_eq!(compute_buffer_size(PixelFormat::Rgb5A1, 4, 3), Some(24));
        assert_eq!(compute_buffer_size(PixelFormat::Rgb8, 4, 3), Some(36));
        assert_eq!(compute_buffer_size(PixelFormat::Rgb8, 0, 3), Some(0));
    }

    #[test]
    fn validity_tracks_buffer_length() {
        assert!(raster(2, 1, PixelFormat::Rgb5A1, vec![0; 4]).is_valid());
        assert!(!raster(2, 1, PixelFormat::Rgb5A1, vec![0; 5]).is_valid());
        assert!(raster(0, 3, PixelFormat::Rgb5A1, Vec::new()).is_valid());
    }

    #[test]
    fn rgba_expansion() {
        // Opaque pure red, then transparent black.
        let img = raster(2, 1, PixelFormat::Rgb5A1, vec![0xF8, 0x01, 0x00, 0x00]);
        let rgba = img.to_rgba8().expect("expand");
        assert_eq!(rgba.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(rgba.get_pixel(1, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn save_png_writes_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.png");
        let img = raster(1, 1, PixelFormat::Rgb8, vec![10, 20, 30]);
        img.save_png(&path).expect("save");
        let back = image::open(&path).expect("reopen").to_rgba8();
        assert_eq!(back.get_pixel(0, 0).0, [10, 20, 30, 255]);
    }
}
