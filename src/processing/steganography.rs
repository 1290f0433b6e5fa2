//! # LSB Steganography Implementation
//!
//! Hides a serialized payload in the least significant bit of one color
//! channel and reads it back.
//!
//! ## Algorithm
//!
//! ### Encoding Process
//! 1. Serialize the payload into a framed byte sequence ([`payload`])
//! 2. Expand the bytes into one bit per pixel, MSB first, zero padded to
//!    `width * height` bits ([`bits::pack`])
//! 3. Split out the carrier channel (red by default)
//! 4. For every pixel in raster order: `carrier = (carrier & 0xFE) | bit`
//! 5. Put the carrier back; the other channels are never touched
//!
//! ### Decoding Process
//! 1. Split out the same carrier channel
//! 2. Read `carrier & 1` for every pixel in raster order
//! 3. Collapse the bits into bytes and parse the framed payload
//!
//! ### Capacity
//! One bit per pixel, so an image holds `(width * height) / 8` bytes
//! including the 8-byte payload header.
//!
//! Example: an 800x600 image can store ~60 KB.
//!
//! The hidden data only survives lossless transforms. Save the result as PNG.

use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat, Luma, Pixel};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Cursor;

use crate::common::config::StegoConfig;
use crate::error::{MarkError, Result};
use crate::processing::bits::{self, BitStream};
use crate::processing::payload;

/// Number of payload bytes (header included) an image of this size can carry.
pub fn capacity_bytes(width: u32, height: u32) -> usize {
    width as usize * height as usize / 8
}

/// Copy one channel of an image into a grayscale plane.
///
/// # Errors
/// - [`MarkError::InvalidChannel`] if `index` is not a channel of `P`
pub fn split_channel<P>(image: &ImageBuffer<P, Vec<u8>>, index: usize) -> Result<GrayImage>
where
    P: Pixel<Subpixel = u8>,
{
    check_channel::<P>(index)?;
    Ok(GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([image.get_pixel(x, y).channels()[index]])
    }))
}

/// Overwrite one channel of `image` with the values of `plane`.
///
/// # Errors
/// - [`MarkError::InvalidChannel`] if `index` is not a channel of `P`
/// - [`MarkError::DimensionMismatch`] if the plane and image sizes differ
pub fn replace_channel<P>(
    image: &mut ImageBuffer<P, Vec<u8>>,
    index: usize,
    plane: &GrayImage,
) -> Result<()>
where
    P: Pixel<Subpixel = u8>,
{
    check_channel::<P>(index)?;
    if image.dimensions() != plane.dimensions() {
        return Err(MarkError::DimensionMismatch {
            expected: image.width() as usize * image.height() as usize,
            actual: plane.width() as usize * plane.height() as usize,
        });
    }

    for (pixel, value) in image.pixels_mut().zip(plane.pixels()) {
        pixel.channels_mut()[index] = value.0[0];
    }
    Ok(())
}

/// Write one bit into the LSB of every pixel of `channel`.
///
/// The upper seven bits of each pixel are preserved.
///
/// # Errors
/// - [`MarkError::DimensionMismatch`] if `bits` is not exactly one bit per pixel
pub fn embed(channel: &GrayImage, bits: &BitStream) -> Result<GrayImage> {
    let mask = bits.to_mask(channel.width(), channel.height())?;
    embed_mask(channel, &mask)
}

/// Same as [`embed`], with the bits already laid out as a mask image.
pub fn embed_mask(channel: &GrayImage, mask: &GrayImage) -> Result<GrayImage> {
    if channel.dimensions() != mask.dimensions() {
        return Err(MarkError::DimensionMismatch {
            expected: channel.width() as usize * channel.height() as usize,
            actual: mask.width() as usize * mask.height() as usize,
        });
    }

    let data = channel
        .as_raw()
        .iter()
        .zip(mask.as_raw())
        .map(|(value, bit)| (value & 0xFE) | (bit & 0x01))
        .collect();

    GrayImage::from_raw(channel.width(), channel.height(), data).ok_or(
        MarkError::DimensionMismatch {
            expected: channel.width() as usize * channel.height() as usize,
            actual: mask.as_raw().len(),
        },
    )
}

/// Read the LSB of every pixel of `channel`, in raster order.
pub fn extract(channel: &GrayImage) -> BitStream {
    BitStream::from_mask(&extract_mask(channel))
}

/// Read the LSB plane of `channel` as a 0/1 mask image.
pub fn extract_mask(channel: &GrayImage) -> GrayImage {
    GrayImage::from_fn(channel.width(), channel.height(), |x, y| {
        Luma([channel.get_pixel(x, y).0[0] & 0x01])
    })
}

/// Hide `value` in the carrier channel of `image`.
///
/// Images with an alpha channel come back as RGBA8, everything else as RGB8.
/// Only the LSB of the configured channel differs from the converted input.
///
/// # Errors
/// - [`MarkError::Serialization`] if the value cannot be serialized
/// - [`MarkError::InvalidChannel`] if the configured channel does not exist
/// - [`MarkError::Capacity`] if the payload does not fit and the overflow
///   policy is `reject`
///
/// # Example
/// ```ignore
/// let marked = hide("owner:alice", &image, &StegoConfig::default())?;
/// marked.save("marked.png")?;
/// ```
pub fn hide<T>(value: &T, image: &DynamicImage, config: &StegoConfig) -> Result<DynamicImage>
where
    T: Serialize + ?Sized,
{
    let bytes = payload::serialize(value)?;

    debug!(
        "Hiding {} payload bytes in a {}x{} image (capacity {} bytes)",
        bytes.len(),
        image.width(),
        image.height(),
        capacity_bytes(image.width(), image.height())
    );

    if image.color().has_alpha() {
        hide_in_buffer(&bytes, image.to_rgba8(), config).map(DynamicImage::ImageRgba8)
    } else {
        hide_in_buffer(&bytes, image.to_rgb8(), config).map(DynamicImage::ImageRgb8)
    }
}

fn hide_in_buffer<P>(
    bytes: &[u8],
    mut buffer: ImageBuffer<P, Vec<u8>>,
    config: &StegoConfig,
) -> Result<ImageBuffer<P, Vec<u8>>>
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = buffer.dimensions();
    let carrier = split_channel(&buffer, config.channel)?;
    let bits = bits::pack(bytes, width as usize * height as usize, config.overflow)?;

    let marked = embed(&carrier, &bits)?;
    replace_channel(&mut buffer, config.channel, &marked)?;
    Ok(buffer)
}

/// Recover a value hidden with [`hide`].
///
/// # Errors
/// - [`MarkError::InvalidChannel`] if the configured channel does not exist
/// - [`MarkError::Deserialize`] if the LSB plane does not hold a valid payload
pub fn reveal<T>(image: &DynamicImage, config: &StegoConfig) -> Result<T>
where
    T: DeserializeOwned,
{
    let carrier = if image.color().has_alpha() {
        split_channel(&image.to_rgba8(), config.channel)?
    } else {
        split_channel(&image.to_rgb8(), config.channel)?
    };

    let bytes = bits::unpack(&extract(&carrier));
    payload::deserialize(&bytes)
}

/// Recover a hidden value, returning `T::default()` when there is none.
///
/// Never fails: unmarked, corrupted and truncated images all decode to the
/// default value (the empty string for `String`).
pub fn reveal_or_default<T>(image: &DynamicImage, config: &StegoConfig) -> T
where
    T: DeserializeOwned + Default,
{
    match reveal(image, config) {
        Ok(value) => value,
        Err(e) => {
            debug!("No hidden payload recovered: {}", e);
            T::default()
        }
    }
}

/// Hide `value` in an encoded image and return the result as PNG bytes.
///
/// # Arguments
/// - `image_bytes`: Raw bytes of the input image (any format supported by `image` crate)
/// - `value`: Payload to embed
/// - `config`: Carrier channel and overflow policy
///
/// # Errors
/// - The input cannot be decoded
/// - Any error of [`hide`]
/// - Encoding to PNG fails
pub fn hide_in_bytes<T>(image_bytes: &[u8], value: &T, config: &StegoConfig) -> Result<Vec<u8>>
where
    T: Serialize + ?Sized,
{
    let image = image::load_from_memory(image_bytes)?;
    let marked = hide(value, &image, config)?;

    let mut output_bytes = Vec::new();
    marked.write_to(&mut Cursor::new(&mut output_bytes), ImageFormat::Png)?;
    Ok(output_bytes)
}

/// Recover a hidden value from an encoded image.
///
/// Decoding errors of the image itself are reported; a missing or corrupt
/// payload yields `T::default()`.
pub fn reveal_from_bytes<T>(image_bytes: &[u8], config: &StegoConfig) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let image = image::load_from_memory(image_bytes)?;
    Ok(reveal_or_default(&image, config))
}

fn check_channel<P>(index: usize) -> Result<()>
where
    P: Pixel<Subpixel = u8>,
{
    let channels = P::CHANNEL_COUNT as usize;
    if index >= channels {
        return Err(MarkError::InvalidChannel { index, channels });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 + y) as u8, (x + y * 3) as u8, (x ^ y) as u8])
        })
    }

    #[test]
    fn test_embed_keeps_upper_bits() {
        let channel = GrayImage::from_raw(2, 2, vec![0x00, 0xFF, 0x80, 0x7F]).unwrap();
        let bits = BitStream::from_bits(vec![1, 0, 1, 0]);

        let marked = embed(&channel, &bits).unwrap();
        assert_eq!(marked.as_raw(), &vec![0x01, 0xFE, 0x81, 0x7E]);
        assert_eq!(extract(&marked), bits);
    }

    #[test]
    fn test_embed_rejects_wrong_length() {
        let channel = GrayImage::new(3, 3);
        let bits = BitStream::from_bits(vec![1; 8]);

        assert!(matches!(
            embed(&channel, &bits),
            Err(MarkError::DimensionMismatch {
                expected: 9,
                actual: 8
            })
        ));
    }

    #[test]
    fn test_split_and_replace_channel() {
        let mut image = gradient(4, 3);
        let original = image.clone();

        let mut green = split_channel(&image, 1).unwrap();
        assert_eq!(green.get_pixel(2, 1).0[0], original.get_pixel(2, 1).0[1]);

        for pixel in green.pixels_mut() {
            pixel.0[0] = 9;
        }
        replace_channel(&mut image, 1, &green).unwrap();

        for (after, before) in image.pixels().zip(original.pixels()) {
            assert_eq!(after.0[0], before.0[0]);
            assert_eq!(after.0[1], 9);
            assert_eq!(after.0[2], before.0[2]);
        }
    }

    #[test]
    fn test_invalid_channel() {
        let image = gradient(2, 2);
        assert!(matches!(
            split_channel(&image, 3),
            Err(MarkError::InvalidChannel {
                index: 3,
                channels: 3
            })
        ));
    }

    #[test]
    fn test_hide_short_text_round_trip() {
        let image = DynamicImage::ImageRgb8(gradient(100, 100));
        let config = StegoConfig::default();

        let marked = hide("hi", &image, &config).unwrap();
        let recovered: String = reveal(&marked, &config).unwrap();
        assert_eq!(recovered, "hi");
    }

    #[test]
    fn test_hide_keeps_alpha_images_rgba() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 40, Rgba([10, 20, 30, 77])));
        let config = StegoConfig {
            channel: 2,
            ..StegoConfig::default()
        };

        let marked = hide("blue", &image, &config).unwrap();
        let marked_rgba = marked.as_rgba8().unwrap();
        for pixel in marked_rgba.pixels() {
            assert_eq!(&pixel.0[..2], &[10, 20]);
            assert_eq!(pixel.0[2] & 0xFE, 30);
            assert_eq!(pixel.0[3], 77);
        }

        let recovered: String = reveal(&marked, &config).unwrap();
        assert_eq!(recovered, "blue");
    }

    #[test]
    fn test_unmarked_image_reveals_default() {
        let image = DynamicImage::ImageRgb8(gradient(32, 32));
        let recovered: String = reveal_or_default(&image, &StegoConfig::default());
        assert_eq!(recovered, "");
    }

    #[test]
    fn test_bytes_round_trip_through_png() {
        let image = DynamicImage::ImageRgb8(gradient(64, 64));
        let mut input = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut input), ImageFormat::Png)
            .unwrap();

        let config = StegoConfig::default();
        let marked = hide_in_bytes(&input, "png survives", &config).unwrap();
        let recovered: String = reveal_from_bytes(&marked, &config).unwrap();
        assert_eq!(recovered, "png survives");
    }

    #[test]
    fn test_capacity_bytes() {
        assert_eq!(capacity_bytes(10, 10), 12);
        assert_eq!(capacity_bytes(800, 600), 60_000);
    }
}
