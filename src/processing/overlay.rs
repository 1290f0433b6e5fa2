//! # Visible Watermark Compositing
//!
//! Blends a scaled, semi-transparent overlay image and white text onto a base
//! image.
//!
//! ## Watermark Process
//! 1. Convert base and overlay to RGBA
//! 2. Size the overlay with [`fitter::fit`]
//! 3. Crop the source to the part that lands on the base and resample only
//!    that crop
//! 4. Derive a blend mask from it, capped at `alpha_cap`
//! 5. Paste it centered, weighted by the mask
//! 6. Draw the text twice (header and footer) on a transparent layer and
//!    composite it over the result with [`imageops::overlay`]
//!
//! All inputs are borrowed; every call returns a fresh image.

use image::{imageops, DynamicImage, GrayImage, Luma, Rgba, RgbaImage};
use log::debug;

use crate::common::config::{FitConfig, MaskSource, OverlayConfig};
use crate::error::{MarkError, Result};
use crate::processing::fitter;
use crate::processing::text::TextRenderer;

/// Per-pixel blend weight for an overlay, never above the configured cap.
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaMask(GrayImage);

impl AlphaMask {
    /// Build the mask from `overlay`, clamping every value to `cap`.
    ///
    /// Values below the cap pass through unchanged.
    pub fn from_overlay(overlay: &RgbaImage, cap: u8, source: MaskSource) -> Self {
        let mask = GrayImage::from_fn(overlay.width(), overlay.height(), |x, y| {
            let [r, g, b, a] = overlay.get_pixel(x, y).0;
            let value = match source {
                MaskSource::Alpha => a,
                MaskSource::Luminance => luminance(r, g, b),
            };
            Luma([value.min(cap)])
        });
        Self(mask)
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.0
    }

    pub fn into_image(self) -> GrayImage {
        self.0
    }
}

/// ITU-R 601-2 luma, the usual RGB to grayscale transform.
fn luminance(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}

/// Paste `overlay` onto `base` at `origin`, weighted by `mask`.
///
/// Mutates `base` in place. Color channels become
/// `(base * (255 - m) + overlay * m) / 255`; the base alpha is kept.
/// Parts of the overlay outside `base` are clipped, so `origin` may be negative.
///
/// # Errors
/// - [`MarkError::DimensionMismatch`] if `mask` and `overlay` differ in size
pub fn paste_with_mask(
    base: &mut RgbaImage,
    overlay: &RgbaImage,
    mask: &GrayImage,
    origin: (i64, i64),
) -> Result<()> {
    if overlay.dimensions() != mask.dimensions() {
        return Err(MarkError::DimensionMismatch {
            expected: overlay.width() as usize * overlay.height() as usize,
            actual: mask.width() as usize * mask.height() as usize,
        });
    }

    let (base_w, base_h) = (base.width() as i64, base.height() as i64);

    for (x, y, pixel) in overlay.enumerate_pixels() {
        let (bx, by) = (origin.0 + x as i64, origin.1 + y as i64);
        if bx < 0 || by < 0 || bx >= base_w || by >= base_h {
            continue;
        }

        let weight = mask.get_pixel(x, y).0[0] as u32;
        if weight == 0 {
            continue;
        }

        let target = base.get_pixel_mut(bx as u32, by as u32);
        for channel in 0..3 {
            let under = target.0[channel] as u32;
            let over = pixel.0[channel] as u32;
            target.0[channel] = ((under * (255 - weight) + over * weight + 127) / 255) as u8;
        }
    }

    Ok(())
}

/// Composites watermarks and text with an injected font.
pub struct OverlayCompositor<F> {
    font: F,
    config: OverlayConfig,
    fit: FitConfig,
}

impl<F: TextRenderer> OverlayCompositor<F> {
    /// Create a compositor that draws text with `font`.
    ///
    /// # Example
    /// ```ignore
    /// let font = GlyphFont::from_file("DejaVuSans-Bold.ttf", 24.0)?;
    /// let compositor = OverlayCompositor::new(font, OverlayConfig::default(), FitConfig::default());
    /// ```
    pub fn new(font: F, config: OverlayConfig, fit: FitConfig) -> Self {
        Self { font, config, fit }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Paste a scaled, capped-alpha `overlay` in the middle of `base` and add
    /// `text` as header and footer.
    ///
    /// # Errors
    /// - [`MarkError::InvalidDimensions`] if either image has a zero side
    pub fn composite_watermark(
        &self,
        base: &DynamicImage,
        overlay: &DynamicImage,
        text: &str,
    ) -> Result<RgbaImage> {
        let mut canvas = base.to_rgba8();
        let overlay = overlay.to_rgba8();

        let spec = fitter::fit(canvas.dimensions(), overlay.dimensions(), &self.fit)?;
        match spec.visible_window(canvas.dimensions(), overlay.dimensions()) {
            Some(window) => {
                let (x, y) = (window.x, window.y);
                let crop = imageops::crop_imm(
                    &overlay,
                    x.source_start,
                    y.source_start,
                    x.source_len,
                    y.source_len,
                )
                .to_image();
                let resampled = imageops::resize(
                    &crop,
                    x.resampled_len,
                    y.resampled_len,
                    self.config.resize_filter.into(),
                );
                let visible = imageops::crop_imm(&resampled, x.skip, y.skip, x.len, y.len).to_image();

                let mask =
                    AlphaMask::from_overlay(&visible, self.config.alpha_cap, self.config.mask_source);
                paste_with_mask(&mut canvas, &visible, mask.as_image(), window.target())?;

                debug!(
                    "Watermark {}x{} scaled by {:.4} to {}x{}, {}x{} visible at ({}, {})",
                    overlay.width(),
                    overlay.height(),
                    spec.watermark_scale,
                    spec.new_size.0,
                    spec.new_size.1,
                    x.len,
                    y.len,
                    x.target_start,
                    y.target_start
                );
            }
            None => debug!(
                "Watermark lands outside the {}x{} base",
                canvas.width(),
                canvas.height()
            ),
        }

        let (width, height) = canvas.dimensions();
        let (text_w, text_h) = self.font.measure(text);
        let x = width as f32 / 2.0 - text_w as f32 / 2.0;
        let usable = height as f32 - text_h as f32;
        let positions = [
            (x, self.config.header_position as f32 * usable),
            (x, self.config.footer_position as f32 * usable),
        ];

        let layer = self.text_layer(width, height, text, &positions);
        imageops::overlay(&mut canvas, &layer, 0, 0);
        Ok(canvas)
    }

    /// Draw `text` once, centered on `base`.
    pub fn composite_text_only(&self, base: &DynamicImage, text: &str) -> Result<RgbaImage> {
        let mut canvas = base.to_rgba8();
        let (width, height) = canvas.dimensions();
        let (text_w, text_h) = self.font.measure(text);

        let position = (
            width as f32 / 2.0 - text_w as f32 / 2.0,
            height as f32 / 2.0 - text_h as f32 / 2.0,
        );

        let layer = self.text_layer(width, height, text, &[position]);
        imageops::overlay(&mut canvas, &layer, 0, 0);
        Ok(canvas)
    }

    fn text_layer(&self, width: u32, height: u32, text: &str, positions: &[(f32, f32)]) -> RgbaImage {
        let mut layer = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 0]));
        if text.is_empty() {
            return layer;
        }

        let fill = Rgba([255, 255, 255, self.config.text_alpha]);
        for &origin in positions {
            self.font.draw(&mut layer, origin, text, fill);
        }
        layer
    }
}
