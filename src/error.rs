//! # Error Model
//!
//! One error enum carries every failure the watermarking pipeline can surface.
//! Callers match on the variant; the binary lifts it into `anyhow::Error`.

/// Errors produced by the imagemark library.
#[derive(Debug, thiserror::Error)]
pub enum MarkError {
    /// The payload value could not be turned into bytes.
    #[error("payload serialization failed: {0}")]
    Serialization(String),

    /// A byte sequence recovered from an image is not a valid payload.
    #[error("payload deserialization failed: {0}")]
    Deserialize(String),

    /// Bit stream length does not match the channel's pixel count.
    #[error("dimension mismatch: expected {expected} bits, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Payload does not fit in the carrier image.
    #[error("payload too large: need {required_bits} bits but only {available_bits} available")]
    Capacity {
        required_bits: usize,
        available_bits: usize,
    },

    /// Zero-sized base or overlay handed to the fitter.
    #[error("invalid dimensions: base {base:?}, overlay {overlay:?}")]
    InvalidDimensions {
        base: (u32, u32),
        overlay: (u32, u32),
    },

    /// Carrier channel index is out of range for the pixel type.
    #[error("channel {index} out of range for a {channels}-channel image")]
    InvalidChannel { index: usize, channels: usize },

    #[error("font error: {0}")]
    Font(String),

    #[error("unknown variant '{0}'")]
    UnknownVariant(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MarkError>;
