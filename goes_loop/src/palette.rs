// GOES Loop - palette.rs

use image::imageops::{self, ColorMap};
use image::{DynamicImage, Rgb};

pub const PALETTE_SIZE: usize = 256;

/// Display time of every frame, in hundredths of a second.
pub const FRAME_DELAY: u16 = 5;

/// The Plan 9 color map: a fixed, image-independent 256-entry palette.
///
/// Entries come from a 4x4x4 RGB cube where each cube cell is split into
/// four brightness steps. Cells with no color component fall back to a grey
/// ramp.
#[derive(Debug, Clone)]
pub struct Plan9Palette {
    colors: [[u8; 3]; PALETTE_SIZE],
}

impl Plan9Palette {
    pub fn new() -> Self {
        let mut colors = [[0u8; 3]; PALETTE_SIZE];
        let mut i = 0usize;
        for r in 0..4i32 {
            for v in 0..4i32 {
                let mut j = v - r;
                for g in 0..4i32 {
                    for b in 0..4i32 {
                        let den = r.max(g).max(b);
                        let color = if den == 0 {
                            let grey = (17 * v) as u8;
                            [grey, grey, grey]
                        } else {
                            let num = 17 * (4 * den + v);
                            [
                                (r * num / den) as u8,
                                (g * num / den) as u8,
                                (b * num / den) as u8,
                            ]
                        };
                        colors[i + (j & 0x0f) as usize] = color;
                        j += 1;
                    }
                }
                i += 16;
            }
        }
        Plan9Palette { colors }
    }

    pub fn colors(&self) -> &[[u8; 3]] {
        &self.colors
    }

    /// Flattened `r, g, b` triples, the layout of a GIF color table.
    pub fn color_table(&self) -> Vec<u8> {
        self.colors.iter().flatten().copied().collect()
    }
}

impl Default for Plan9Palette {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorMap for Plan9Palette {
    type Color = Rgb<u8>;

    // Nearest entry by squared RGB distance; ties go to the lower index.
    fn index_of(&self, color: &Rgb<u8>) -> usize {
        let [r, g, b] = color.0;
        let sq = |x: u8, y: u8| (x as i32 - y as i32).pow(2);
        self.colors
            .iter()
            .enumerate()
            .min_by_key(|(_, c)| sq(r, c[0]) + sq(g, c[1]) + sq(b, c[2]))
            .map_or(0, |(idx, _)| idx)
    }

    fn lookup(&self, index: usize) -> Option<Rgb<u8>> {
        self.colors.get(index).map(|c| Rgb(*c))
    }

    fn has_lookup(&self) -> bool {
        true
    }

    fn map_color(&self, color: &mut Rgb<u8>) {
        *color = Rgb(self.colors[self.index_of(color)]);
    }
}

/// An indexed raster into a [`Plan9Palette`], with its display delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PalettedFrame {
    pub width: u32,
    pub height: u32,
    /// Row-major palette indices, `width * height` of them.
    pub indices: Vec<u8>,
    pub delay: u16,
}

/// Reduces `image` to `palette` using Floyd–Steinberg error diffusion.
pub fn quantize(image: &DynamicImage, palette: &Plan9Palette) -> PalettedFrame {
    let mut rgb = image.to_rgb8();
    imageops::dither(&mut rgb, palette);
    let indexed = imageops::index_colors(&rgb, palette);

    PalettedFrame {
        width: indexed.width(),
        height: indexed.height(),
        indices: indexed.into_raw(),
        delay: FRAME_DELAY,
    }
}
