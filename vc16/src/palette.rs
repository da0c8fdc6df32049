//! The fixed 256-colour palette that framebuffer bytes index into.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PaletteVariant {
    /// `hhh ss vvv`: seven hue bands with four saturations and eight values,
    /// hue band 7 is a 32 step grayscale ramp.
    Hsv,
    /// `rrr ggg bb`.
    Rgb332,
}

impl Default for PaletteVariant {
    fn default() -> Self {
        PaletteVariant::Hsv
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Palette {
    variant: PaletteVariant,
    colors: [Rgb; 256],
}

impl Palette {
    pub fn new(variant: PaletteVariant) -> Self {
        let mut colors = [Rgb::default(); 256];
        for (index, color) in colors.iter_mut().enumerate() {
            *color = match variant {
                PaletteVariant::Hsv => hsv_entry(index as u8),
                PaletteVariant::Rgb332 => rgb332_entry(index as u8),
            };
        }
        Palette { variant, colors }
    }

    pub fn variant(&self) -> PaletteVariant {
        self.variant
    }

    pub fn color(&self, index: u8) -> Rgb {
        self.colors[usize::from(index)]
    }

    pub fn colors(&self) -> &[Rgb; 256] {
        &self.colors
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette::new(PaletteVariant::default())
    }
}

const GRAY_BAND: u8 = 7;
// hue is measured in 1/256ths of a 60 degree sector
const HUE_CIRCLE: u32 = 6 * 256;

fn hsv_entry(index: u8) -> Rgb {
    let band = index >> 5;
    if band == GRAY_BAND {
        let level = (u32::from(index & 0b1_1111) * 255 / 31) as u8;
        return Rgb::new(level, level, level);
    }
    let hue = u32::from(band) * HUE_CIRCLE / 7;
    let saturation = (u32::from((index >> 3) & 0b11) + 1) * 64;
    let value = (u32::from(index & 0b111) + 1) * 255 / 8;
    hsv_to_rgb(hue, saturation, value)
}

/// `saturation` is in 0..=256, `value` in 0..=255.
fn hsv_to_rgb(hue: u32, saturation: u32, value: u32) -> Rgb {
    let sector = hue / 256;
    let fraction = hue % 256;
    let p = value * (256 - saturation) / 256;
    let q = value * (256 * 256 - saturation * fraction) / (256 * 256);
    let t = value * (256 * 256 - saturation * (256 - fraction)) / (256 * 256);
    let (r, g, b) = match sector {
        0 => (value, t, p),
        1 => (q, value, p),
        2 => (p, value, t),
        3 => (p, q, value),
        4 => (t, p, value),
        _ => (value, p, q),
    };
    Rgb::new(r as u8, g as u8, b as u8)
}

fn rgb332_entry(index: u8) -> Rgb {
    let scale = |bits: u8, max: u32| (u32::from(bits) * 255 / max) as u8;
    Rgb::new(
        scale(index >> 5, 7),
        scale((index >> 2) & 0b111, 7),
        scale(index & 0b11, 3),
    )
}
