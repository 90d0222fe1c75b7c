//! Palette lookup and color-space conversion.

use image::Rgba;

use crate::parser::types::{PaletteDefinition, YCrCbAColor};

// ITU-R BT.709
const KR: f64 = 0.2126;
const KB: f64 = 0.0722;
const KG: f64 = 1.0 - KR - KB;

/// What a pixel absent from the palette renders as, in either color space.
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Channel layout of a rendered pixel.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ColorSpace {
    /// Channels are R, G, B, A.
    Rgba,
    /// Channels are Y, Cb, Cr, A, copied straight from the palette.
    YCbCrA,
}

impl YCrCbAColor {
    pub fn to_rgba(&self) -> Rgba<u8> {
        ycbcra_to_rgba(self)
    }

    pub fn to_ycbcra(&self) -> Rgba<u8> {
        Rgba([self.y, self.cb, self.cr, self.a])
    }

    pub fn to_space(&self, space: ColorSpace) -> Rgba<u8> {
        match space {
            ColorSpace::Rgba => self.to_rgba(),
            ColorSpace::YCbCrA => self.to_ycbcra(),
        }
    }
}

/// Looks `index` up in `palette`. Missing palettes and missing entries both
/// render as [`TRANSPARENT`].
pub fn palette_color(palette: Option<&PaletteDefinition>, index: u8, space: ColorSpace) -> Rgba<u8> {
    palette
        .and_then(|p| p.entry(index))
        .map_or(TRANSPARENT, |entry| entry.color.to_space(space))
}

/// Resolves all 256 indices at once, for mapping whole bitmaps.
pub fn color_table(palette: Option<&PaletteDefinition>, space: ColorSpace) -> [Rgba<u8>; 256] {
    let mut table = [TRANSPARENT; 256];
    if let Some(p) = palette {
        for (id, entry) in &p.entries {
            table[usize::from(*id)] = entry.color.to_space(space);
        }
    }
    table
}

fn ycbcra_to_rgba(p: &YCrCbAColor) -> Rgba<u8> {
    let y = f64::from(p.y) / 255.0;
    let cb = f64::from(p.cb) / 255.0 - 0.5;
    let cr = f64::from(p.cr) / 255.0 - 0.5;

    let rf = y + 2.0 * (1.0 - KR) * cr;
    let bf = y + 2.0 * (1.0 - KB) * cb;
    let gf = (y - KR * rf - KB * bf) / KG;

    let r = constrain_double_to_byte(rf * 255.0 + 0.5);
    let g = constrain_double_to_byte(gf * 255.0 + 0.5);
    let b = constrain_double_to_byte(bf * 255.0 + 0.5);

    Rgba([r, g, b, p.a])
}

fn constrain_double_to_byte(data: f64) -> u8 {
    if data > 255.0 {
        255
    } else if data < 0.0 {
        0
    } else {
        data as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::types::PaletteEntry;
    use std::collections::BTreeMap;

    fn palette() -> PaletteDefinition {
        let mut entries = BTreeMap::new();
        for (id, y, a) in [(0u8, 16u8, 0u8), (1, 235, 255)] {
            entries.insert(
                id,
                PaletteEntry {
                    id,
                    color: YCrCbAColor { y, cr: 128, cb: 128, a },
                },
            );
        }
        PaletteDefinition { id: 1, version: 0, entries }
    }

    #[test]
    fn bright_entry_is_near_white() {
        let Rgba([r, g, b, a]) = palette_color(Some(&palette()), 1, ColorSpace::Rgba);
        for channel in [r, g, b] {
            assert!(channel > 230, "{:?}", (r, g, b));
        }
        assert_eq!(a, 255);
    }

    #[test]
    fn neutral_chroma_is_grey() {
        let Rgba([r, g, b, _]) = YCrCbAColor { y: 128, cr: 128, cb: 128, a: 255 }.to_rgba();
        assert!((i16::from(r) - i16::from(g)).abs() <= 1);
        assert!((i16::from(b) - i16::from(g)).abs() <= 1);
    }

    #[test]
    fn saturated_values_clamp() {
        let red = YCrCbAColor { y: 255, cr: 255, cb: 0, a: 10 }.to_rgba();
        assert_eq!(red.0[0], 255);
        assert_eq!(red.0[3], 10);
        let dark = YCrCbAColor { y: 0, cr: 0, cb: 0, a: 10 }.to_rgba();
        assert_eq!(dark.0[0], 0);
        assert_eq!(dark.0[2], 0);
    }

    #[test]
    fn missing_index_is_transparent() {
        for space in [ColorSpace::Rgba, ColorSpace::YCbCrA] {
            assert_eq!(palette_color(Some(&palette()), 2, space), TRANSPARENT);
            assert_eq!(palette_color(None, 1, space), TRANSPARENT);
        }
    }

    #[test]
    fn ycbcra_is_passed_through() {
        assert_eq!(
            palette_color(Some(&palette()), 1, ColorSpace::YCbCrA),
            Rgba([235, 128, 128, 255])
        );
    }

    #[test]
    fn table_matches_lookup() {
        let p = palette();
        let table = color_table(Some(&p), ColorSpace::Rgba);
        for index in 0..=255u8 {
            assert_eq!(table[usize::from(index)], palette_color(Some(&p), index, ColorSpace::Rgba));
        }
    }
}
