pub mod common;
pub mod error;
pub mod processing;
pub mod variants;

pub use error::{MarkError, Result};
pub use variants::{RenderContext, Variant};
