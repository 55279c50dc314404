//! # Imaging Module
//!
//! Normalization of user-submitted embedded images (`data:image/...;base64,...`)
//! before they are persisted.
//!
//! - **`data_url`**: splitting and re-assembling the data-URL text form.
//! - **`orientation`**: EXIF-driven orientation correction with ordered fallbacks.
//! - **`pipeline`**: the full decode / orient / flatten / downscale / JPEG pipeline
//!   and its fail-open entry point `normalize`.

/// Data-URL parsing and assembly.
pub mod data_url;
/// Orientation correction strategies.
pub mod orientation;
/// The normalization pipeline.
pub mod pipeline;

pub use data_url::{DataUrl, CANONICAL_HEADER, DATA_URL_PREFIX};
pub use pipeline::{
    normalize, normalize_value, try_normalize, NormalizeError, NormalizeOptions, DEFAULT_MAX_PIXELS,
};
