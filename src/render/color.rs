//! Colours used by drawing jobs.
//!
//! Callers usually speak in packed `0xRRGGBB` integers (see the named constants at the bottom of
//! this module); [`Color`] keeps the channels as `f32` so backends can pick whatever byte order
//! they need.

/// RGBA color used for drawing commands.
///
/// Channels are represented as `f32` in the range `0.0 ..= 1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    /// Red channel
    pub r: f32,
    /// Green channel
    pub g: f32,
    /// Blue channel
    pub b: f32,
    /// Alpha channel (opacity)
    pub a: f32,
}

impl Color {
    /// Creates a new color from `f32` channel values in the range `0.0 ..= 1.0`.
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Color {
        Color { r, g, b, a }
    }

    /// Creates a new color from `u8` channel values in the range `0 ..= 255`.
    pub fn from_u8(r: u8, g: u8, b: u8, a: u8) -> Color {
        Color {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }

    /// Creates an opaque color from a packed `0xRRGGBB` value. The top byte is ignored.
    pub fn from_rgb(packed: u32) -> Color {
        Color::from_u8(
            ((packed >> 16) & 0xFF) as u8,
            ((packed >> 8) & 0xFF) as u8,
            (packed & 0xFF) as u8,
            0xFF,
        )
    }

    /// Returns the red channel as an `u8` (0–255).
    pub fn r_u8(&self) -> u8 {
        channel_u8(self.r)
    }
    /// Returns the green channel as an `u8` (0–255).
    pub fn g_u8(&self) -> u8 {
        channel_u8(self.g)
    }
    /// Returns the blue channel as an `u8` (0–255).
    pub fn b_u8(&self) -> u8 {
        channel_u8(self.b)
    }
    /// Returns the alpha channel as an `u8` (0–255).
    pub fn a_u8(&self) -> u8 {
        channel_u8(self.a)
    }

    /// Packs the color as `0xRRGGBBAA`.
    pub fn to_rgba(&self) -> u32 {
        (self.r_u8() as u32) << 24
            | (self.g_u8() as u32) << 16
            | (self.b_u8() as u32) << 8
            | self.a_u8() as u32
    }
}

impl From<u32> for Color {
    fn from(packed: u32) -> Self {
        Color::from_rgb(packed)
    }
}

fn channel_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Named colours as packed `0xRRGGBB` values.
pub mod palette {
    pub const TUM_BLUE: u32 = 0x0065BD;
    pub const RED: u32 = 0xFF0000;
    pub const GREEN: u32 = 0x00FF00;
    pub const BLUE: u32 = 0x0000FF;
    pub const YELLOW: u32 = 0xFFFF00;
    pub const AQUA: u32 = 0x00FFFF;
    pub const FUCHSIA: u32 = 0xFF00FF;
    pub const WHITE: u32 = 0xFFFFFF;
    pub const BLACK: u32 = 0x000000;
    pub const GRAY: u32 = 0x808080;
    pub const GREY: u32 = GRAY;
    pub const MAGENTA: u32 = FUCHSIA;
    pub const CYAN: u32 = AQUA;
    pub const LIME: u32 = 0x00FF00;
    pub const MAROON: u32 = 0x800000;
    pub const NAVY: u32 = 0x000080;
    pub const OLIVE: u32 = 0x808000;
    pub const PURPLE: u32 = 0x800080;
    pub const SILVER: u32 = 0xC0C0C0;
    pub const TEAL: u32 = 0x008080;
    pub const ORANGE: u32 = 0xFFA500;
    pub const PINK: u32 = 0xFFC0CB;
    pub const SKYBLUE: u32 = 0x87CEEB;
}

#[cfg(test)]
mod tests {
    use super::palette::*;
    use super::*;

    #[test]
    fn packed_rgb_is_opaque() {
        let c = Color::from_rgb(TUM_BLUE);
        assert_eq!((c.r_u8(), c.g_u8(), c.b_u8(), c.a_u8()), (0x00, 0x65, 0xBD, 0xFF));
        assert_eq!(c.to_rgba(), 0x0065BDFF);
    }

    #[test]
    fn top_byte_is_ignored() {
        assert_eq!(Color::from(0xAB_FF0000), Color::from_rgb(RED));
    }
}
