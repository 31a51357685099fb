//! Packed pixel layout.
//!
//! One `u32` per pixel: `[31:24]` alpha, `[23:16]` blue, `[15:8]` green,
//! `[7:0]` red. On a little-endian machine the bytes sit in memory as
//! R, G, B, A, which is what canvas-style image data and `Rgba8Unorm`
//! textures expect.

/// Pack four 8-bit channels into one pixel.
#[inline]
pub const fn pack(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (a as u32) << 24 | (b as u32) << 16 | (g as u32) << 8 | r as u32
}

/// Split a packed pixel into `[r, g, b, a]`.
#[inline]
pub const fn unpack(pixel: u32) -> [u8; 4] {
    [
        pixel as u8,
        (pixel >> 8) as u8,
        (pixel >> 16) as u8,
        (pixel >> 24) as u8,
    ]
}

#[inline]
pub const fn alpha(pixel: u32) -> u8 {
    (pixel >> 24) as u8
}

/// Pack a row-major RGBA byte stream. Trailing bytes that don't form a
/// whole pixel are dropped.
pub fn pack_rgba8(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|px| pack(px[0], px[1], px[2], px[3]))
        .collect()
}

/// Expand packed pixels back to an RGBA byte stream.
pub fn unpack_rgba8(pixels: &[u32]) -> Vec<u8> {
    pixels.iter().flat_map(|&px| unpack(px)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_layout_is_abgr() {
        assert_eq!(pack(0x11, 0x22, 0x33, 0x44), 0x4433_2211);
        assert_eq!(pack(255, 0, 0, 255), 0xFF00_00FF);
    }

    #[test]
    fn unpack_reverses_pack() {
        assert_eq!(unpack(0x4433_2211), [0x11, 0x22, 0x33, 0x44]);
        assert_eq!(alpha(0x8000_0000), 0x80);
    }

    #[test]
    fn byte_order_matches_native_little_endian() {
        let px = pack(1, 2, 3, 4);
        assert_eq!(px.to_le_bytes(), [1, 2, 3, 4]);
        assert_eq!(pack_rgba8(&[1, 2, 3, 4, 9]), vec![px]);
        assert_eq!(unpack_rgba8(&[px]), vec![1, 2, 3, 4]);
    }
}
