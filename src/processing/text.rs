//! # Text Rendering
//!
//! The compositor only needs two things from a font: how big a string is, and
//! a way to draw it onto an RGBA layer. [`TextRenderer`] is that seam; fonts
//! are passed in by the caller instead of being loaded globally.
//!
//! [`GlyphFont`] implements it for TrueType/OpenType fonts. Text is never
//! wrapped: `\n` starts a new line, and anything outside the layer is clipped.

use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use std::fs;
use std::path::Path;

use crate::error::{MarkError, Result};

/// Font measurement and rasterization service.
pub trait TextRenderer {
    /// Pixel `(width, height)` of `text` as it would be drawn.
    fn measure(&self, text: &str) -> (u32, u32);

    /// Draw `text` with its top-left corner at `origin`.
    ///
    /// Each covered pixel gets the RGB of `color` and an alpha of
    /// `color[3] * coverage`. Pixels outside `layer` are skipped.
    fn draw(&self, layer: &mut RgbaImage, origin: (f32, f32), text: &str, color: Rgba<u8>);
}

impl<T: TextRenderer + ?Sized> TextRenderer for &T {
    fn measure(&self, text: &str) -> (u32, u32) {
        (**self).measure(text)
    }

    fn draw(&self, layer: &mut RgbaImage, origin: (f32, f32), text: &str, color: Rgba<u8>) {
        (**self).draw(layer, origin, text, color)
    }
}

/// Write one partially covered pixel, clipping to the layer bounds.
///
/// Overlapping glyph edges keep the stronger coverage.
pub fn put_coverage(layer: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>, coverage: f32) {
    if x < 0 || y < 0 || x >= layer.width() as i64 || y >= layer.height() as i64 {
        return;
    }

    let alpha = (color.0[3] as f32 * coverage.clamp(0.0, 1.0)).round() as u8;
    if alpha == 0 {
        return;
    }

    let pixel = layer.get_pixel_mut(x as u32, y as u32);
    let [r, g, b, _] = color.0;
    *pixel = Rgba([r, g, b, alpha.max(pixel.0[3])]);
}

/// A TrueType/OpenType font at a fixed pixel size.
pub struct GlyphFont {
    font: FontVec,
    scale: PxScale,
}

impl GlyphFont {
    /// Parse font data.
    ///
    /// # Errors
    /// - [`MarkError::Font`] if the bytes are not a usable font
    pub fn from_bytes(data: Vec<u8>, size: f32) -> Result<Self> {
        let font = FontVec::try_from_vec(data).map_err(|e| MarkError::Font(e.to_string()))?;
        Ok(Self {
            font,
            scale: PxScale::from(size),
        })
    }

    /// Load a font file from disk.
    ///
    /// # Example
    /// ```ignore
    /// let font = GlyphFont::from_file("/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf", 24.0)?;
    /// ```
    pub fn from_file(path: impl AsRef<Path>, size: f32) -> Result<Self> {
        let data = fs::read(path)?;
        Self::from_bytes(data, size)
    }

    fn line_width(&self, line: &str) -> f32 {
        let scaled = self.font.as_scaled(self.scale);
        let mut width = 0.0;
        let mut previous = None;

        for c in line.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = previous {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            previous = Some(id);
        }
        width
    }

    fn line_height(&self) -> f32 {
        let scaled = self.font.as_scaled(self.scale);
        scaled.height() + scaled.line_gap()
    }
}

impl TextRenderer for GlyphFont {
    fn measure(&self, text: &str) -> (u32, u32) {
        let width = text
            .lines()
            .map(|line| self.line_width(line))
            .fold(0.0f32, f32::max);
        let lines = text.lines().count().max(1);

        (
            width.ceil() as u32,
            (self.line_height() * lines as f32).ceil() as u32,
        )
    }

    fn draw(&self, layer: &mut RgbaImage, origin: (f32, f32), text: &str, color: Rgba<u8>) {
        let scaled = self.font.as_scaled(self.scale);
        let line_height = self.line_height();

        for (index, line) in text.lines().enumerate() {
            let baseline = origin.1 + scaled.ascent() + index as f32 * line_height;
            let mut caret = origin.0;
            let mut previous = None;

            for c in line.chars() {
                let id = scaled.glyph_id(c);
                if let Some(prev) = previous {
                    caret += scaled.kern(prev, id);
                }

                let glyph = id.with_scale_and_position(self.scale, point(caret, baseline));
                caret += scaled.h_advance(id);
                previous = Some(id);

                if let Some(outlined) = self.font.outline_glyph(glyph) {
                    let bounds = outlined.px_bounds();
                    outlined.draw(|gx, gy, coverage| {
                        put_coverage(
                            layer,
                            bounds.min.x as i64 + gx as i64,
                            bounds.min.y as i64 + gy as i64,
                            color,
                            coverage,
                        );
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_coverage_scales_alpha() {
        let mut layer = RgbaImage::from_pixel(2, 1, Rgba([255, 255, 255, 0]));
        put_coverage(&mut layer, 0, 0, Rgba([255, 255, 255, 128]), 0.5);
        put_coverage(&mut layer, 1, 0, Rgba([255, 255, 255, 128]), 1.0);

        assert_eq!(layer.get_pixel(0, 0), &Rgba([255, 255, 255, 64]));
        assert_eq!(layer.get_pixel(1, 0), &Rgba([255, 255, 255, 128]));
    }

    #[test]
    fn test_put_coverage_keeps_stronger_edge() {
        let mut layer = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 0]));
        put_coverage(&mut layer, 0, 0, Rgba([255, 255, 255, 128]), 1.0);
        put_coverage(&mut layer, 0, 0, Rgba([255, 255, 255, 128]), 0.25);

        assert_eq!(layer.get_pixel(0, 0).0[3], 128);
    }

    #[test]
    fn test_put_coverage_clips() {
        let mut layer = RgbaImage::new(2, 2);
        put_coverage(&mut layer, -1, 0, Rgba([255, 0, 0, 255]), 1.0);
        put_coverage(&mut layer, 0, 2, Rgba([255, 0, 0, 255]), 1.0);

        assert!(layer.pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn test_invalid_font_data() {
        assert!(matches!(
            GlyphFont::from_bytes(vec![0u8; 16], 24.0),
            Err(MarkError::Font(_))
        ));
    }

    const SYSTEM_FONTS: [&str; 3] = [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
    ];

    fn system_font(size: f32) -> Option<GlyphFont> {
        let font = SYSTEM_FONTS
            .iter()
            .find_map(|path| GlyphFont::from_file(path, size).ok());
        if font.is_none() {
            eprintln!("no DejaVuSans.ttf found, skipping");
        }
        font
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)` of every drawn pixel.
    fn ink_bounds(layer: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
        layer
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[3] > 0)
            .fold(None, |acc, (x, y, _)| match acc {
                None => Some((x, y, x, y)),
                Some((x0, y0, x1, y1)) => Some((x0.min(x), y0.min(y), x1.max(x), y1.max(y))),
            })
    }

    #[test]
    fn test_glyph_font_measure() {
        let Some(font) = system_font(24.0) else {
            return;
        };

        let (width, height) = font.measure("Mark");
        assert!(width > 0 && height >= 24);

        // Lines stack, the widest one sets the width
        let (two_w, two_h) = font.measure("Mark\nMk");
        assert_eq!(two_w, width);
        assert!(two_h + 1 >= 2 * height && two_h <= 2 * height);

        let (double_w, _) = font.measure("MarkMark");
        assert!(double_w > width);
        assert!(double_w <= 2 * width + 2);

        assert_eq!(font.measure(""), (0, height));
    }

    #[test]
    fn test_glyph_font_draws_inside_measured_box() {
        let Some(font) = system_font(24.0) else {
            return;
        };
        let (width, height) = font.measure("Mark");
        let mut layer = RgbaImage::new(width + 40, height + 40);

        font.draw(&mut layer, (20.0, 20.0), "Mark", Rgba([255, 255, 255, 255]));

        let (x0, y0, x1, y1) = ink_bounds(&layer).expect("nothing drawn");
        assert!(x0 >= 18 && x1 <= 20 + width + 2);
        assert!(y0 >= 18 && y1 <= 20 + height + 2);

        // No descenders in "Mark": the ink ends on the baseline
        let baseline = 20.0 + font.font.as_scaled(font.scale).ascent();
        assert!((y1 as f32 - baseline).abs() <= 2.0, "{} vs {}", y1, baseline);
    }

    #[test]
    fn test_glyph_font_second_line_starts_below_first() {
        let Some(font) = system_font(24.0) else {
            return;
        };
        let (_, height) = font.measure("M\nM");
        let line_height = font.line_height();
        let mut layer = RgbaImage::new(60, height + 20);

        font.draw(&mut layer, (0.0, 0.0), "M\nM", Rgba([255, 255, 255, 255]));

        let first = RgbaImage::from_fn(60, line_height as u32, |x, y| *layer.get_pixel(x, y));
        let (_, _, _, first_bottom) = ink_bounds(&first).expect("first line missing");
        let (_, _, _, bottom) = ink_bounds(&layer).expect("nothing drawn");

        assert!(first_bottom < line_height as u32);
        assert!(bottom as f32 >= first_bottom as f32 + line_height - 2.0);
    }
}
