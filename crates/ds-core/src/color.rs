use crate::pixel;
use serde::{Deserialize, Serialize};

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

fn channel(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl Color {
    pub const TRANSPARENT: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::rgba(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        [channel(self.r), channel(self.g), channel(self.b), channel(self.a)]
    }

    pub fn from_packed(px: u32) -> Self {
        let [r, g, b, a] = pixel::unpack(px);
        Self::from_rgba8(r, g, b, a)
    }

    pub fn to_packed(self) -> u32 {
        let [r, g, b, a] = self.to_rgba8();
        pixel::pack(r, g, b, a)
    }

    /// Parse `#RGB`, `#RGBA`, `#RRGGBB` or `#RRGGBBAA`. The `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();

        let short = |i: usize| hex_val(bytes[i]).map(|v| v * 17);
        let long = |i: usize| Some(hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?);

        let [r, g, b, a] = match bytes.len() {
            3 => [short(0)?, short(1)?, short(2)?, 255],
            4 => [short(0)?, short(1)?, short(2)?, short(3)?],
            6 => [long(0)?, long(2)?, long(4)?, 255],
            8 => [long(0)?, long(2)?, long(4)?, long(6)?],
            _ => return None,
        };
        Some(Self::from_rgba8(r, g, b, a))
    }

    /// `#RRGGBB` when opaque, `#RRGGBBAA` otherwise. Canvas style strings
    /// accept both.
    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}
