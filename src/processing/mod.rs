//! # Image Processing
//!
//! The two watermarking pipelines:
//!
//! - Hidden: [`payload`] → [`bits`] → [`steganography`] embeds a payload in
//!   the LSBs of one color channel, and reverses it on decode.
//! - Visible: [`fitter`] sizes an overlay image, [`overlay`] blends it and the
//!   text drawn by a [`text::TextRenderer`] onto the base image.

pub mod bits;
pub mod fitter;
pub mod overlay;
pub mod payload;
pub mod steganography;
pub mod text;

// Re-export main functions for convenience
pub use overlay::OverlayCompositor;
pub use steganography::{hide, reveal, reveal_or_default};
