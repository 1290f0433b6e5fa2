//! # Configuration
//!
//! TOML-backed settings for every tunable in the watermarking pipeline.
//! Every section falls back to its defaults, so a config file only needs to
//! name what it changes.
//!
//! ```toml
//! [stego]
//! channel = 0
//! overflow = "reject"
//!
//! [fit]
//! landscape_constant = 1.071
//! portrait_constant = 5.419
//!
//! [overlay]
//! alpha_cap = 90
//! resize_filter = "lanczos3"
//! ```

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{MarkError, Result};
use crate::processing::bits::OverflowPolicy;

/// Load a TOML configuration file and deserialize it into the specified type.
///
/// # Arguments
/// - `path`: Path to the TOML configuration file
///
/// # Returns
/// - `Ok(T)`: Successfully loaded and parsed configuration
/// - `Err`: File I/O or parsing error
///
/// # Example
/// ```ignore
/// let config: MarkConfig = load_config("config/imagemark.toml")?;
/// ```
pub fn load_config<T>(path: impl AsRef<Path>) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let content = fs::read_to_string(path)?;
    let config: T = toml::from_str(&content).map_err(|e| MarkError::Config(e.to_string()))?;
    Ok(config)
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkConfig {
    pub stego: StegoConfig,
    pub fit: FitConfig,
    pub overlay: OverlayConfig,
    pub text: TextConfig,
    pub watermark: WatermarkConfig,
    pub output: OutputConfig,
}

impl MarkConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        load_config(path)
    }
}

/// Hidden (LSB) watermark settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StegoConfig {
    /// Index of the carrier channel (0 = red)
    pub channel: usize,
    /// Behavior when the payload does not fit in the image
    pub overflow: OverflowPolicy,
    /// Payload written by the hidden-watermark variant
    pub payload: String,
}

impl Default for StegoConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            overflow: OverflowPolicy::Reject,
            payload: "imagemark".to_string(),
        }
    }
}

/// Empirical fitting factors for the watermark auto-scaler.
///
/// These were tuned by eye against a handful of reference images; portrait
/// overlays in particular do not always fit inside the base.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Used when the overlay is wider than it is tall
    pub landscape_constant: f64,
    /// Used for portrait and square overlays
    pub portrait_constant: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            landscape_constant: 1.071,
            portrait_constant: 5.419,
        }
    }
}

/// Which overlay data the blend mask is derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskSource {
    /// The overlay's own alpha channel
    #[default]
    Alpha,
    /// The overlay's grayscale luminance
    Luminance,
}

/// Resampling filter used to scale the overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    #[default]
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Blending and text placement for visible watermarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Highest blend weight the overlay mask may carry (0-255)
    pub alpha_cap: u8,
    /// Alpha of the white text fill (0-255)
    pub text_alpha: u8,
    /// Header text offset as a fraction of the usable height
    pub header_position: f64,
    /// Footer text offset as a fraction of the usable height
    pub footer_position: f64,
    pub resize_filter: ResizeFilter,
    pub mask_source: MaskSource,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            alpha_cap: 90,
            text_alpha: 128,
            header_position: 0.015,
            footer_position: 0.99,
            resize_filter: ResizeFilter::Lanczos3,
            mask_source: MaskSource::Alpha,
        }
    }
}

/// Displayed text and the font used to draw it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub text: String,
    /// TrueType/OpenType font file; visible variants need one
    pub font_path: Option<PathBuf>,
    /// Pixel size for the header/footer of the watermark variant
    pub watermark_font_size: f32,
    /// Pixel size for the centered text-overlay variant
    pub text_overlay_font_size: f32,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_path: None,
            watermark_font_size: 24.0,
            text_overlay_font_size: 36.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    /// Overlay image composited by the watermark variant
    pub image_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// JPEG quality for the visible variants
    pub jpeg_quality: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { jpeg_quality: 75 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_reference_tuning() {
        let config = MarkConfig::default();
        assert_eq!(config.fit.landscape_constant, 1.071);
        assert_eq!(config.fit.portrait_constant, 5.419);
        assert_eq!(config.overlay.alpha_cap, 90);
        assert_eq!(config.overlay.text_alpha, 128);
        assert_eq!(config.output.jpeg_quality, 75);
        assert_eq!(config.stego.channel, 0);
        assert_eq!(config.stego.overflow, OverflowPolicy::Reject);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[stego]\noverflow = \"truncate\"\n\n[overlay]\nalpha_cap = 60\nresize_filter = \"nearest\"\n\n[text]\ntext = \"Sample\""
        )
        .unwrap();

        let config = MarkConfig::from_file(file.path()).unwrap();
        assert_eq!(config.stego.overflow, OverflowPolicy::Truncate);
        assert_eq!(config.stego.payload, "imagemark");
        assert_eq!(config.overlay.alpha_cap, 60);
        assert_eq!(config.overlay.resize_filter, ResizeFilter::Nearest);
        assert_eq!(config.overlay.text_alpha, 128);
        assert_eq!(config.text.text, "Sample");
        assert_eq!(config.text.watermark_font_size, 24.0);
        assert_eq!(config.fit, FitConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[overlay]\nalpha_cap = \"lots\"").unwrap();

        assert!(matches!(
            MarkConfig::from_file(file.path()),
            Err(MarkError::Config(_))
        ));
    }
}
