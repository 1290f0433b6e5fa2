//! # Common Components
//!
//! Shared settings used by every processing stage and the binary.
//!
//! ## Modules
//!
//! - [`config`]: TOML configuration loading and the per-stage settings

pub mod config;
