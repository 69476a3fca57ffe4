//! Pixel conversions between on-disk and in-memory colour layouts.

/// Convert a TIM 16-bit colour to RGB5A1.
///
/// Bytes are shuffled from `GGGRRRRR:ABBBBBGG` to `RRRRRGGG:GGBBBBBA`
/// (low byte first on both sides). The TIM "STP" bit marks a colour as
/// transparent, except for pure black where its meaning is inverted: black
/// with STP set is opaque, black without it is transparent.
pub fn tim16_to_rgb5a1(colour: u16) -> u16 {
    let [lo, hi] = colour.to_le_bytes();

    let mut out_lo = (lo & 0x1F) << 3;
    out_lo |= (hi & 0x03) << 1;
    out_lo |= (lo & 0x80) >> 7;

    let mut out_hi = (lo & 0x60) << 1;
    out_hi |= (hi & 0x7C) >> 1;

    let is_black = out_lo == 0 && out_hi == 0;
    let stp = hi & 0x80 != 0;
    if is_black == stp {
        out_hi |= 0x01;
    }

    u16::from_le_bytes([out_lo, out_hi])
}

#[inline]
fn expand5(c: u8) -> u8 {
    (c << 3) | (c >> 2)
}

/// Expand an RGB5A1 value (layout as produced by [`tim16_to_rgb5a1`]) to RGBA8.
pub fn rgb5a1_to_rgba8(colour: u16) -> [u8; 4] {
    let [b0, b1] = colour.to_le_bytes();
    let r = b0 >> 3;
    let g = ((b0 & 0x07) << 2) | (b1 >> 6);
    let b = (b1 >> 1) & 0x1F;
    let a = if b1 & 0x01 != 0 { 255 } else { 0 };
    [expand5(r), expand5(g), expand5(b), a]
}

#[inline]
pub fn rgb8_to_rgba8([r, g, b]: [u8; 3]) -> [u8; 4] {
    [r, g, b, 255]
}
