//! # Watermark Auto-Scaling
//!
//! Sizes an overlay of arbitrary dimensions relative to a base image while
//! keeping the overlay's aspect ratio.
//!
//! ## Heuristic
//!
//! ```text
//! ratio  = (Wo / Ho) / (Wb / Hb)
//! k      = landscape_constant if Wo / Ho > 1 else portrait_constant
//! scale  = max(Wb / (k * ratio * Wo), Hb / (k * ratio * Ho))
//! size   = (round(Wo * scale), round(Ho * scale))
//! ```
//!
//! The resulting size only depends on the overlay's aspect ratio, not on its
//! pixel count. Portrait overlays can end up taller than the base; the paste
//! position then goes negative and the compositor clips.
//!
//! [`ScaleSpec::visible_window`] maps the part of the scaled overlay that lands
//! on the base back to source pixels, so only that crop is ever resampled.

use crate::common::config::FitConfig;
use crate::error::{MarkError, Result};

/// Scale factor and target size of the overlay for one composite call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleSpec {
    pub watermark_scale: f64,
    pub new_size: (u32, u32),
}

impl ScaleSpec {
    /// Top-left paste position that centers the scaled overlay on `base`.
    pub fn origin(&self, base: (u32, u32)) -> (i64, i64) {
        (
            (base.0 as i64 - self.new_size.0 as i64).div_euclid(2),
            (base.1 as i64 - self.new_size.1 as i64).div_euclid(2),
        )
    }

    /// The part of the centered, scaled overlay that lies on `base`, or `None`
    /// if nothing does.
    ///
    /// `overlay` is the unscaled source size.
    pub fn visible_window(&self, base: (u32, u32), overlay: (u32, u32)) -> Option<VisibleWindow> {
        let origin = self.origin(base);
        Some(VisibleWindow {
            x: Span::clip(origin.0, self.new_size.0, base.0, overlay.0)?,
            y: Span::clip(origin.1, self.new_size.1, base.1, overlay.1)?,
        })
    }
}

/// Crop, resample and placement of the visible overlay along both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleWindow {
    pub x: Span,
    pub y: Span,
}

impl VisibleWindow {
    /// Top-left paste position on the base.
    pub fn target(&self) -> (i64, i64) {
        (self.x.target_start as i64, self.y.target_start as i64)
    }
}

/// One axis of a [`VisibleWindow`].
///
/// The source run `[source_start, source_start + source_len)` is resampled to
/// `resampled_len` pixels; of those, `len` pixels starting at `skip` land on
/// the base at `target_start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub source_start: u32,
    pub source_len: u32,
    pub resampled_len: u32,
    pub skip: u32,
    pub target_start: u32,
    pub len: u32,
}

impl Span {
    /// Clip a run of `scaled` pixels placed at `offset` to `[0, limit)`.
    fn clip(offset: i64, scaled: u32, limit: u32, source: u32) -> Option<Self> {
        if scaled == 0 || source == 0 {
            return None;
        }

        // Visible part in scaled coordinates
        let start = (-offset).max(0);
        let end = (limit as i64 - offset).min(scaled as i64);
        if start >= end {
            return None;
        }
        let (start, end) = (start as u32, end as u32);

        // Whole source pixels covering it
        let to_source = source as f64 / scaled as f64;
        let source_start = ((start as f64 * to_source).floor() as u32).min(source - 1);
        let source_end = ((end as f64 * to_source).ceil() as u32).clamp(source_start + 1, source);

        // Where those source pixels fall in scaled coordinates
        let to_scaled = scaled as f64 / source as f64;
        let scaled_start = ((source_start as f64 * to_scaled).floor() as u32).min(start);
        let scaled_end = ((source_end as f64 * to_scaled).ceil() as u32)
            .min(scaled)
            .max(end);

        Some(Self {
            source_start,
            source_len: source_end - source_start,
            resampled_len: scaled_end - scaled_start,
            skip: start - scaled_start,
            target_start: (offset + start as i64) as u32,
            len: end - start,
        })
    }
}

/// Compute the overlay size for a base of `base` pixels.
///
/// # Errors
/// - [`MarkError::InvalidDimensions`] if any side of either image is zero
///
/// # Example
/// ```ignore
/// let spec = fit((800, 600), (1600, 400), &FitConfig::default())?;
/// assert_eq!(spec.new_size, (747, 187));
/// ```
pub fn fit(base: (u32, u32), overlay: (u32, u32), config: &FitConfig) -> Result<ScaleSpec> {
    let (base_w, base_h) = base;
    let (overlay_w, overlay_h) = overlay;

    if base_w == 0 || base_h == 0 || overlay_w == 0 || overlay_h == 0 {
        return Err(MarkError::InvalidDimensions { base, overlay });
    }

    let (base_w, base_h) = (base_w as f64, base_h as f64);
    let (overlay_w, overlay_h) = (overlay_w as f64, overlay_h as f64);

    let aspect_base = base_w / base_h;
    let aspect_overlay = overlay_w / overlay_h;
    let ratio = aspect_overlay / aspect_base;

    let fit_constant = if aspect_overlay > 1.0 {
        config.landscape_constant
    } else {
        config.portrait_constant
    };
    let scale_size = fit_constant * ratio;

    let watermark_scale = f64::max(
        base_w / (scale_size * overlay_w),
        base_h / (scale_size * overlay_h),
    );

    let new_size = (
        ((overlay_w * watermark_scale).round() as u32).max(1),
        ((overlay_h * watermark_scale).round() as u32).max(1),
    );

    Ok(ScaleSpec {
        watermark_scale,
        new_size,
    })
}
