use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::BlendMode;
use crate::CoreError;

/// Straight-alpha 8-bit colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
    pub const DARK_BLUE: Rgba = Rgba::new(0x00, 0x00, 0x80, 0xff);
    pub const DARK_GREEN: Rgba = Rgba::new(0x00, 0x80, 0x00, 0xff);
    pub const GREEN: Rgba = Rgba::new(0x00, 0xff, 0x00, 0xff);
    pub const DARK_CYAN: Rgba = Rgba::new(0x00, 0x80, 0x80, 0xff);
    pub const DARK_GRAY: Rgba = Rgba::new(0x80, 0x80, 0x80, 0xff);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 0xff)
    }

    pub fn alpha_f32(self) -> f32 {
        f32::from(self.a) / 255.0
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 0xff {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

impl FromStr for Rgba {
    type Err = CoreError;

    /// Parses `#rrggbb` or `#rrggbbaa`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::msg(format!("invalid colour `{s}`"));
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !matches!(hex.len(), 6 | 8) || !hex.is_ascii() {
            return Err(invalid());
        }
        let byte = |index: usize| {
            u8::from_str_radix(&hex[index * 2..index * 2 + 2], 16).map_err(|_| invalid())
        };
        let alpha = if hex.len() == 8 { byte(3)? } else { 0xff };
        Ok(Rgba::new(byte(0)?, byte(1)?, byte(2)?, alpha))
    }
}

impl TryFrom<String> for Rgba {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgba> for String {
    fn from(colour: Rgba) -> Self {
        colour.to_string()
    }
}

/// Owned RGBA raster, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl Bitmap {
    /// Creates a fully transparent bitmap.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Rgba::TRANSPARENT)
    }

    pub fn filled(width: u32, height: u32, colour: Rgba) -> Self {
        Self {
            width,
            height,
            pixels: vec![colour; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| y as usize * self.width as usize + x as usize)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        self.offset(x, y).map(|offset| self.pixels[offset])
    }

    /// Writes `colour` at `(x, y)`; out-of-bounds writes are dropped.
    pub fn set_pixel(&mut self, x: u32, y: u32, colour: Rgba) {
        if let Some(offset) = self.offset(x, y) {
            self.pixels[offset] = colour;
        }
    }

    /// Blends `colour` over the pixel at `(x, y)`.
    pub fn blend_pixel(&mut self, x: u32, y: u32, colour: Rgba, mode: BlendMode) {
        if let Some(offset) = self.offset(x, y) {
            self.pixels[offset] = mode.apply(colour, self.pixels[offset]);
        }
    }

    /// Fills the whole bitmap with a rounded rectangle. A radius of zero
    /// fills every pixel.
    pub fn fill_rounded_rect(&mut self, radius: u32, colour: Rgba) {
        let radius = radius.min(self.width / 2).min(self.height / 2);
        let r = radius as f32;
        for y in 0..self.height {
            for x in 0..self.width {
                if radius > 0 && !self.inside_corners(x, y, r) {
                    continue;
                }
                self.blend_pixel(x, y, colour, BlendMode::SourceOver);
            }
        }
    }

    fn inside_corners(&self, x: u32, y: u32, r: f32) -> bool {
        let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
        let (w, h) = (self.width as f32, self.height as f32);
        let cx = if px < r {
            r
        } else if px > w - r {
            w - r
        } else {
            return true;
        };
        let cy = if py < r {
            r
        } else if py > h - r {
            h - r
        } else {
            return true;
        };
        let (dx, dy) = (px - cx, py - cy);
        dx * dx + dy * dy <= r * r
    }

    /// Blends every pixel of `src` over this bitmap with `mode`, aligned at
    /// the origin. Only the overlapping area is touched.
    pub fn composite(&mut self, src: &Bitmap, mode: BlendMode) {
        let width = self.width.min(src.width);
        let height = self.height.min(src.height);
        for y in 0..height {
            for x in 0..width {
                if let Some(colour) = src.pixel(x, y) {
                    self.blend_pixel(x, y, colour, mode);
                }
            }
        }
    }

    /// Copies the columns in `columns` from `src` into the same columns of
    /// this bitmap, replacing what was there.
    pub fn copy_columns(&mut self, src: &Bitmap, columns: Range<u32>) {
        let end = columns.end.min(self.width).min(src.width);
        let start = columns.start.min(end);
        if start == end {
            return;
        }
        let height = self.height.min(src.height) as usize;
        let (dst_stride, src_stride) = (self.width as usize, src.width as usize);
        let span = start as usize..end as usize;
        for row in 0..height {
            let dst_row = row * dst_stride;
            let src_row = row * src_stride;
            self.pixels[dst_row + span.start..dst_row + span.end]
                .copy_from_slice(&src.pixels[src_row + span.start..src_row + span.end]);
        }
    }

    /// Encodes the bitmap as a binary PPM (`P6`), dropping alpha.
    pub fn to_ppm(&self) -> Vec<u8> {
        let mut out = format!("P6\n{} {}\n255\n", self.width, self.height).into_bytes();
        out.reserve(self.pixels.len() * 3);
        for pixel in &self.pixels {
            out.extend_from_slice(&[pixel.r, pixel.g, pixel.b]);
        }
        out
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colours() {
        assert_eq!("#008000".parse::<Rgba>().unwrap(), Rgba::DARK_GREEN);
        assert_eq!(
            "#11223344".parse::<Rgba>().unwrap(),
            Rgba::new(0x11, 0x22, 0x33, 0x44)
        );
        assert!("008000".parse::<Rgba>().is_err());
        assert!("#0080".parse::<Rgba>().is_err());
        assert!("#zz8000".parse::<Rgba>().is_err());
        assert_eq!(Rgba::new(1, 2, 3, 4).to_string(), "#01020304");
        assert_eq!(Rgba::DARK_CYAN.to_string(), "#008080");
    }

    #[test]
    fn rounded_rect_leaves_corners_clear() {
        let mut bitmap = Bitmap::new(20, 10);
        bitmap.fill_rounded_rect(4, Rgba::DARK_BLUE);
        assert_eq!(bitmap.pixel(0, 0), Some(Rgba::TRANSPARENT));
        assert_eq!(bitmap.pixel(19, 9), Some(Rgba::TRANSPARENT));
        assert_eq!(bitmap.pixel(10, 0), Some(Rgba::DARK_BLUE));
        assert_eq!(bitmap.pixel(0, 5), Some(Rgba::DARK_BLUE));

        let mut square = Bitmap::new(4, 4);
        square.fill_rounded_rect(0, Rgba::GREEN);
        assert!(square.pixels().iter().all(|&p| p == Rgba::GREEN));
    }

    #[test]
    fn copies_column_ranges() {
        let src = Bitmap::filled(6, 2, Rgba::GREEN);
        let mut dst = Bitmap::filled(6, 2, Rgba::DARK_BLUE);
        dst.copy_columns(&src, 2..4);
        for y in 0..2 {
            let row: Vec<_> = (0..6).map(|x| dst.pixel(x, y).unwrap()).collect();
            assert_eq!(
                row,
                [
                    Rgba::DARK_BLUE,
                    Rgba::DARK_BLUE,
                    Rgba::GREEN,
                    Rgba::GREEN,
                    Rgba::DARK_BLUE,
                    Rgba::DARK_BLUE
                ]
            );
        }
        dst.copy_columns(&src, 5..99);
        assert_eq!(dst.pixel(5, 1), Some(Rgba::GREEN));
        dst.copy_columns(&src, 4..2);
        assert_eq!(dst.pixel(4, 0), Some(Rgba::DARK_BLUE));
    }

    #[test]
    fn ppm_header_matches_dimensions() {
        let ppm = Bitmap::filled(3, 2, Rgba::GREEN).to_ppm();
        assert!(ppm.starts_with(b"P6\n3 2\n255\n"));
        assert_eq!(ppm.len(), b"P6\n3 2\n255\n".len() + 3 * 2 * 3);
    }
}
