#![allow(dead_code)]

use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use imagemark::processing::text::{put_coverage, TextRenderer};

/// Fixed-cell stand-in font: every non-space character is a solid block.
pub struct BlockFont {
    pub cell: (u32, u32),
}

impl TextRenderer for BlockFont {
    fn measure(&self, text: &str) -> (u32, u32) {
        let columns = text.lines().map(|l| l.chars().count()).max().unwrap_or(0) as u32;
        let rows = text.lines().count().max(1) as u32;
        (columns * self.cell.0, rows * self.cell.1)
    }

    fn draw(&self, layer: &mut RgbaImage, origin: (f32, f32), text: &str, color: Rgba<u8>) {
        let (ox, oy) = (origin.0.floor() as i64, origin.1.floor() as i64);
        for (row, line) in text.lines().enumerate() {
            for (column, c) in line.chars().enumerate() {
                if c.is_whitespace() {
                    continue;
                }
                let x0 = ox + column as i64 * self.cell.0 as i64;
                let y0 = oy + row as i64 * self.cell.1 as i64;
                for dy in 0..self.cell.1 as i64 {
                    for dx in 0..self.cell.0 as i64 {
                        put_coverage(layer, x0 + dx, y0 + dy, color, 1.0);
                    }
                }
            }
        }
    }
}

/// Deterministic RGB test pattern.
pub fn pattern(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x.wrapping_mul(13) ^ y) as u8,
            (y.wrapping_mul(7) + x) as u8,
            (x + y) as u8,
        ])
    }))
}
