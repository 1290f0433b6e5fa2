//! # Output Variants
//!
//! Named recipes that turn one source image into one output image:
//!
//! | name               | pipeline                                  | output      |
//! |--------------------|-------------------------------------------|-------------|
//! | `text-overlay`     | centered translucent text                 | JPEG q75    |
//! | `watermark`        | scaled overlay image + header/footer text | JPEG q75    |
//! | `hidden-watermark` | payload in the red channel LSBs           | PNG         |
//!
//! The hidden variant must stay lossless or the payload is destroyed.

use image::{DynamicImage, ImageOutputFormat};
use log::info;
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use crate::common::config::MarkConfig;
use crate::error::{MarkError, Result};
use crate::processing::overlay::OverlayCompositor;
use crate::processing::steganography;
use crate::processing::text::{GlyphFont, TextRenderer};

/// Font handle shared between worker threads.
pub type SharedFont = Box<dyn TextRenderer + Send + Sync>;

/// A named output recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    TextOverlay,
    Watermark,
    HiddenWatermark,
}

impl Variant {
    pub const ALL: [Variant; 3] = [
        Variant::TextOverlay,
        Variant::Watermark,
        Variant::HiddenWatermark,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Variant::TextOverlay => "text-overlay",
            Variant::Watermark => "watermark",
            Variant::HiddenWatermark => "hidden-watermark",
        }
    }

    /// Encoding used when this variant is written out.
    pub fn output_format(&self, config: &MarkConfig) -> OutputFormat {
        match self {
            Variant::TextOverlay | Variant::Watermark => OutputFormat::Jpeg {
                quality: config.output.jpeg_quality,
            },
            Variant::HiddenWatermark => OutputFormat::Png,
        }
    }

    /// Apply this variant to `image`.
    ///
    /// # Errors
    /// - [`MarkError::Config`] if a font or watermark image the variant needs
    ///   was not provided
    /// - Any error of the underlying compositor or steganography call
    pub fn render(&self, image: &DynamicImage, context: &RenderContext) -> Result<DynamicImage> {
        let config = &context.config;

        let output = match self {
            Variant::TextOverlay => {
                let font = context.text_font.as_deref().ok_or_else(|| missing("text font"))?;
                let compositor =
                    OverlayCompositor::new(font, config.overlay.clone(), config.fit);
                DynamicImage::ImageRgba8(compositor.composite_text_only(image, &config.text.text)?)
            }
            Variant::Watermark => {
                let font = context
                    .watermark_font
                    .as_deref()
                    .ok_or_else(|| missing("watermark font"))?;
                let overlay = context
                    .watermark_image
                    .as_ref()
                    .ok_or_else(|| missing("watermark image"))?;
                let compositor =
                    OverlayCompositor::new(font, config.overlay.clone(), config.fit);
                DynamicImage::ImageRgba8(compositor.composite_watermark(
                    image,
                    overlay,
                    &config.text.text,
                )?)
            }
            Variant::HiddenWatermark => {
                steganography::hide(config.stego.payload.as_str(), image, &config.stego)?
            }
        };

        Ok(output)
    }
}

fn missing(what: &str) -> MarkError {
    MarkError::Config(format!("no {} configured", what))
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = MarkError;

    fn from_str(s: &str) -> Result<Self> {
        Variant::ALL
            .into_iter()
            .find(|variant| variant.name() == s)
            .ok_or_else(|| MarkError::UnknownVariant(s.to_string()))
    }
}

/// Encoding of a rendered image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg { quality: u8 },
    Png,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg { .. } => "jpg",
            OutputFormat::Png => "png",
        }
    }
}

/// Encode `image` in `format`. JPEG output drops the alpha channel.
pub fn encode_output(image: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);

    match format {
        OutputFormat::Jpeg { quality } => {
            DynamicImage::ImageRgb8(image.to_rgb8())
                .write_to(&mut cursor, ImageOutputFormat::Jpeg(quality))?;
        }
        OutputFormat::Png => {
            image.write_to(&mut cursor, ImageOutputFormat::Png)?;
        }
    }

    Ok(bytes)
}

/// Everything a variant needs besides the source image.
///
/// Fonts and the overlay image are loaded once and shared by every render.
pub struct RenderContext {
    pub config: MarkConfig,
    pub text_font: Option<SharedFont>,
    pub watermark_font: Option<SharedFont>,
    pub watermark_image: Option<DynamicImage>,
}

impl RenderContext {
    /// A context with no fonts or overlay image; only `hidden-watermark` renders.
    pub fn new(config: MarkConfig) -> Self {
        Self {
            config,
            text_font: None,
            watermark_font: None,
            watermark_image: None,
        }
    }

    /// Load the fonts and overlay image named in `config`.
    ///
    /// # Errors
    /// - Font or image files that exist in the config but cannot be read
    pub fn load(config: MarkConfig) -> Result<Self> {
        let mut context = Self::new(config);

        if let Some(path) = context.config.text.font_path.clone() {
            let text = &context.config.text;
            let text_font = GlyphFont::from_file(&path, text.text_overlay_font_size)?;
            let watermark_font = GlyphFont::from_file(&path, text.watermark_font_size)?;
            info!("🔤 Loaded font {}", path.display());
            context = context
                .with_text_font(Box::new(text_font))
                .with_watermark_font(Box::new(watermark_font));
        }

        if let Some(path) = context.config.watermark.image_path.clone() {
            let overlay = image::open(&path)?;
            info!(
                "🖼️ Loaded watermark {} ({}x{})",
                path.display(),
                overlay.width(),
                overlay.height()
            );
            context = context.with_watermark_image(overlay);
        }

        Ok(context)
    }

    pub fn with_text_font(mut self, font: SharedFont) -> Self {
        self.text_font = Some(font);
        self
    }

    pub fn with_watermark_font(mut self, font: SharedFont) -> Self {
        self.watermark_font = Some(font);
        self
    }

    pub fn with_watermark_image(mut self, image: DynamicImage) -> Self {
        self.watermark_image = Some(image);
        self
    }
}
