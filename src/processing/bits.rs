//! # Bit Packing
//!
//! Expands payload bytes into one bit per pixel (MSB first) and collapses
//! extracted bits back into bytes.

use image::GrayImage;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{MarkError, Result};

/// What to do when a payload needs more bits than the image has pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Fail with [`MarkError::Capacity`] before anything is written.
    #[default]
    Reject,
    /// Drop the bits that do not fit. Lossy and silent apart from a warning log.
    Truncate,
}

/// Ordered sequence of 0/1 values, one per carrier pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitStream(Vec<u8>);

impl BitStream {
    /// Wrap raw bits. Any non-zero value is normalized to 1.
    pub fn from_bits(bits: Vec<u8>) -> Self {
        Self(bits.into_iter().map(|b| b & 1).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Reshape into a single-channel mask image with one bit per pixel.
    ///
    /// # Errors
    /// - [`MarkError::DimensionMismatch`] if the stream is not exactly `width * height` long
    pub fn to_mask(&self, width: u32, height: u32) -> Result<GrayImage> {
        let expected = width as usize * height as usize;
        if self.0.len() != expected {
            return Err(MarkError::DimensionMismatch {
                expected,
                actual: self.0.len(),
            });
        }

        GrayImage::from_raw(width, height, self.0.clone()).ok_or(MarkError::DimensionMismatch {
            expected,
            actual: self.0.len(),
        })
    }

    /// Read a mask image back into a stream, in raster order.
    pub fn from_mask(mask: &GrayImage) -> Self {
        Self(mask.pixels().map(|p| p.0[0] & 1).collect())
    }
}

/// Expand bytes into exactly `target_bits` bits, MSB first, zero padded.
///
/// # Errors
/// - [`MarkError::Capacity`] if the bytes need more than `target_bits` bits and
///   `policy` is [`OverflowPolicy::Reject`]
pub fn pack(bytes: &[u8], target_bits: usize, policy: OverflowPolicy) -> Result<BitStream> {
    let required_bits = bytes.len() * 8;

    if required_bits > target_bits {
        match policy {
            OverflowPolicy::Reject => {
                return Err(MarkError::Capacity {
                    required_bits,
                    available_bits: target_bits,
                });
            }
            OverflowPolicy::Truncate => {
                warn!(
                    "⚠️ Payload truncated: {} of {} bits dropped, it will not decode",
                    required_bits - target_bits,
                    required_bits
                );
            }
        }
    }

    let mut bits: Vec<u8> = bytes
        .iter()
        .flat_map(|byte| (0..8).rev().map(move |shift| (byte >> shift) & 1))
        .take(target_bits)
        .collect();
    bits.resize(target_bits, 0);

    Ok(BitStream(bits))
}

/// Collapse bits into bytes, MSB first, dropping a trailing partial byte.
pub fn unpack(bits: &BitStream) -> Vec<u8> {
    bits.0
        .chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, bit| (acc << 1) | (bit & 1)))
        .collect()
}
