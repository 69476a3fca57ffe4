//! TIM raster image loader (4/8/16/24 bpp, optional CLUT).
//!
//! # Layout
//! ```text
//! 0x00: ident u32 (0x10)
//! 0x04: flags u32 (bits 0-1 = type, bit 3 = has CLUT)
//! [CLUT]  palette info (12 bytes) + palette_width * palette_height u16 entries
//! image info (12 bytes) + pixel data (image_size - 12 bytes)
//! ```
//!
//! Both info records carry a total byte size that includes the record itself;
//! it must agree with the width/height fields before anything is allocated.

use std::io::{Read, Seek};

use corelib::{DecodeError, DecodeResult, alloc_zeroed};

use crate::{
    pixel::tim16_to_rgb5a1,
    sniff::sniff_magic,
    stream::{Record, ensure_remaining, le_u16, le_u32, read_exact_or_eof, read_record},
    texture::{ColourOrder, PixelFormat, RasterImage, compute_buffer_size},
};

/// Leading identifier of every TIM file (`0x10` as little-endian u32).
pub const TIM_MAGIC: [u8; 4] = [0x10, 0x00, 0x00, 0x00];

pub const TIM_FLAG_TYPE_MASK: u8 = 0x03;
pub const TIM_FLAG_CLUT: u8 = 0x08;

/// Pixel encoding selected by the two type bits of the flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimType {
    Bpp4,
    Bpp8,
    Bpp16,
    /// Header is understood but pixel copy is not implemented.
    Bpp24,
}

impl TimType {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(TimType::Bpp4),
            1 => Some(TimType::Bpp8),
            2 => Some(TimType::Bpp16),
            3 => Some(TimType::Bpp24),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            TimType::Bpp4 => 0,
            TimType::Bpp8 => 1,
            TimType::Bpp16 => 2,
            TimType::Bpp24 => 3,
        }
    }

    /// Output width and pixel format for a stored row width in 16-bit words.
    pub fn output_layout(self, stored_width: u16) -> (u32, PixelFormat) {
        let w = u32::from(stored_width);
        match self {
            TimType::Bpp4 => (w * 4, PixelFormat::Rgb5A1),
            TimType::Bpp8 => (w * 2, PixelFormat::Rgb5A1),
            TimType::Bpp16 => (w, PixelFormat::Rgb5A1),
            // Three bytes per pixel: width / 1.5 pixels per row.
            TimType::Bpp24 => (w * 2 / 3, PixelFormat::Rgb8),
        }
    }
}

/// The 4-byte flags word that follows the identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimHeader {
    pub flags: [u8; 4],
}

impl TimHeader {
    pub fn new(ty: TimType, has_clut: bool) -> Self {
        let mut flag = ty.code();
        if has_clut {
            flag |= TIM_FLAG_CLUT;
        }
        Self {
            flags: [flag, 0, 0, 0],
        }
    }

    pub fn has_clut(&self) -> bool {
        self.flags[0] & TIM_FLAG_CLUT != 0
    }

    pub fn type_code(&self) -> u8 {
        self.flags[0] & TIM_FLAG_TYPE_MASK
    }
}

impl Record for TimHeader {
    const SIZE: usize = 4;

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let flags: [u8; 4] = bytes.get(..Self::SIZE)?.try_into().ok()?;
        Some(Self { flags })
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.flags.to_vec()
    }
}

/// Layout shared by the palette-info and image-info records.
/// `size` counts the record itself plus the data that follows it;
/// `width` is in 16-bit words.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimBlockInfo {
    pub size: u32,
    pub org_x: u16,
    pub org_y: u16,
    pub width: u16,
    pub height: u16,
}

impl TimBlockInfo {
    /// Info record describing `width` x `height` words of data.
    pub fn for_words(width: u16, height: u16) -> Self {
        let data = (u32::from(width) * u32::from(height)).saturating_mul(2);
        Self {
            size: data.saturating_add(Self::SIZE as u32),
            org_x: 0,
            org_y: 0,
            width,
            height,
        }
    }

    /// Declared data length, excluding the record. `None` if the declared
    /// size is smaller than the record.
    fn payload_len(&self) -> Option<u64> {
        u64::from(self.size).checked_sub(Self::SIZE as u64)
    }
}

impl Record for TimBlockInfo {
    const SIZE: usize = 12;

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            size: le_u32(bytes, 0),
            org_x: le_u16(bytes, 4),
            org_y: le_u16(bytes, 6),
            width: le_u16(bytes, 8),
            height: le_u16(bytes, 10),
        })
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.extend_from_slice(&self.size.to_le_bytes());
        bytes.extend_from_slice(&self.org_x.to_le_bytes());
        bytes.extend_from_slice(&self.org_y.to_le_bytes());
        bytes.extend_from_slice(&self.width.to_le_bytes());
        bytes.extend_from_slice(&self.height.to_le_bytes());
        bytes
    }
}

/// Palette entry count, if the palette-info record is self-consistent.
pub fn validate_palette_info(info: &TimBlockInfo) -> DecodeResult<usize> {
    let entries = u64::from(info.width) * u64::from(info.height);
    let consistent = entries < u64::from(info.size) && info.payload_len() == Some(entries * 2);
    if !consistent {
        return Err(DecodeError::MalformedHeader(format!(
            "invalid size/width/height in TIM palette header (size={}, width={}, height={})",
            info.size, info.width, info.height
        )));
    }
    Ok(entries as usize)
}

/// Pixel payload length in bytes, if the image-info record is self-consistent.
pub fn validate_image_info(info: &TimBlockInfo) -> DecodeResult<usize> {
    let row_bytes = u64::from(info.width) * 2;
    let consistent = row_bytes < u64::from(info.size)
        && info.payload_len() == Some(row_bytes * u64::from(info.height));
    if !consistent {
        return Err(DecodeError::MalformedHeader(format!(
            "invalid size/width/height in TIM image header (size={}, width={}, height={})",
            info.size, info.width, info.height
        )));
    }
    Ok((row_bytes * u64::from(info.height)) as usize)
}

pub fn sniff_tim<R: Read + Seek>(reader: &mut R) -> DecodeResult<bool> {
    sniff_magic(reader, &TIM_MAGIC)
}

/// Decode a TIM image. The stream is expected to start with the identifier.
pub fn decode_tim<R: Read + Seek>(reader: &mut R) -> DecodeResult<RasterImage> {
    if !sniff_tim(reader)? {
        return Err(DecodeError::MalformedHeader(
            "invalid/unexpected identifier for TIM".into(),
        ));
    }
    let mut ident = [0u8; 4];
    read_exact_or_eof(reader, &mut ident, "TIM identifier")?;

    let header: TimHeader = read_record(reader, "TIM flags")?;
    log::debug!(
        "TIM flags: type={} clut={}",
        header.type_code(),
        header.has_clut()
    );

    let palette = if header.has_clut() {
        Some(read_palette(reader)?)
    } else {
        None
    };

    let info: TimBlockInfo = read_record(reader, "TIM image info")?;
    let data_len = validate_image_info(&info)?;
    log::debug!(
        "TIM image info: size={} {}x{} words at ({}, {})",
        info.size,
        info.width,
        info.height,
        info.org_x,
        info.org_y
    );

    ensure_remaining(reader, data_len as u64, "TIM pixel data")?;
    let mut raw: Vec<u8> = alloc_zeroed(data_len, "TIM pixel data")?;
    read_exact_or_eof(reader, &mut raw, "TIM pixel data")?;

    let ty = TimType::from_code(header.type_code())
        .ok_or_else(|| DecodeError::Unsupported("invalid image format".into()))?;
    let palette = palette.as_deref().unwrap_or(&[]);
    let image = convert_pixels(ty, &info, palette, &raw)?;

    log::info!(
        "Decoded TIM {}x{} ({:?}, {} bytes)",
        image.width,
        image.height,
        ty,
        image.data.len()
    );
    Ok(image)
}

fn read_palette<R: Read + Seek>(reader: &mut R) -> DecodeResult<Vec<u16>> {
    let info: TimBlockInfo = read_record(reader, "TIM palette info")?;
    let entries = validate_palette_info(&info)?;
    log::debug!(
        "TIM palette: {} entries ({}x{})",
        entries,
        info.width,
        info.height
    );

    let bytes_len = entries * 2;
    ensure_remaining(reader, bytes_len as u64, "TIM palette")?;
    let mut raw: Vec<u8> = alloc_zeroed(bytes_len, "TIM palette")?;
    read_exact_or_eof(reader, &mut raw, "TIM palette")?;

    let mut palette: Vec<u16> = alloc_zeroed(entries, "TIM palette")?;
    for (entry, pair) in palette.iter_mut().zip(raw.chunks_exact(2)) {
        *entry = u16::from_le_bytes([pair[0], pair[1]]);
    }
    Ok(palette)
}

fn lookup(palette: &[u16], index: u8) -> DecodeResult<u16> {
    palette
        .get(usize::from(index))
        .map(|&c| tim16_to_rgb5a1(c))
        .ok_or_else(|| {
            DecodeError::OutOfRange(format!(
                "palette index {} in TIM image exceeds palette of {} entries",
                index,
                palette.len()
            ))
        })
}

/// Re-express the raw pixel stream in the output format.
fn convert_pixels(
    ty: TimType,
    info: &TimBlockInfo,
    palette: &[u16],
    raw: &[u8],
) -> DecodeResult<RasterImage> {
    let (width, format) = ty.output_layout(info.width);
    let height = u32::from(info.height);

    let size = compute_buffer_size(format, width, height).ok_or_else(|| {
        DecodeError::MalformedHeader(format!("TIM image {}x{} is too large", width, height))
    })?;
    let mut data: Vec<u8> = alloc_zeroed(size, "TIM image")?;

    match ty {
        TimType::Bpp4 => expand_indexed(raw, palette, &mut data, true)?,
        TimType::Bpp8 => expand_indexed(raw, palette, &mut data, false)?,
        TimType::Bpp16 => {
            if raw.len() != data.len() {
                return Err(DecodeError::MalformedHeader(format!(
                    "TIM 16bpp payload is {} bytes, image needs {}",
                    raw.len(),
                    data.len()
                )));
            }
            data.copy_from_slice(raw);
        }
        TimType::Bpp24 => {
            return Err(DecodeError::Unsupported(format!(
                "unsupported tim type ({})",
                ty.code()
            )));
        }
    }

    Ok(RasterImage {
        width,
        height,
        format,
        colour_order: ColourOrder::Abgr,
        levels: 1,
        data,
    })
}

/// Resolve palette indices into converted colours. With `nibbles` each byte
/// holds two indices, low nibble first.
fn expand_indexed(raw: &[u8], palette: &[u16], out: &mut [u8], nibbles: bool) -> DecodeResult<()> {
    let mut pixels = out.chunks_exact_mut(2);
    let mut emit = |index: u8| -> DecodeResult<()> {
        let colour = lookup(palette, index)?;
        let px = pixels.next().ok_or_else(|| {
            DecodeError::OutOfRange("TIM pixel data overruns output buffer".into())
        })?;
        px.copy_from_slice(&colour.to_le_bytes());
        Ok(())
    };

    for &byte in raw {
        if nibbles {
            emit(byte & 0x0F)?;
            emit(byte >> 4)?;
        } else {
            emit(byte)?;
        }
    }
    Ok(())
}

/// Write a TIM file. `palette` is `(width, height, entries)` and `image` is
/// `(width_in_words, height, pixel_bytes)`; the declared sizes of both info
/// records are derived from the dimensions.
pub fn encode_tim(
    ty: TimType,
    palette: Option<(u16, u16, &[u16])>,
    image: (u16, u16, &[u8]),
) -> Vec<u8> {
    let mut out = TIM_MAGIC.to_vec();
    out.extend(TimHeader::new(ty, palette.is_some()).to_bytes());
    if let Some((w, h, entries)) = palette {
        out.extend(TimBlockInfo::for_words(w, h).to_bytes());
        for e in entries {
            out.extend_from_slice(&e.to_le_bytes());
        }
    }
    let (w, h, pixels) = image;
    out.extend(TimBlockInfo::for_words(w, h).to_bytes());
    out.extend_from_slice(pixels);
    out
}
