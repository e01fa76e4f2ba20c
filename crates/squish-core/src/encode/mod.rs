//! Image encoding for the adaptive search.
//!
//! This module provides:
//! - The output formats and the transparency-driven format choice
//! - The [`Encoder`] seam the search drives, so tests can substitute
//!   synthetic encoders with a known size curve
//! - [`ImageEncoder`], the production implementation on the `image` crate
//!
//! # Examples
//!
//! ```ignore
//! use squish_core::encode::{Encoder, ImageEncoder, OutputFormat};
//!
//! let jpeg = ImageEncoder.encode(&image, OutputFormat::Jpeg, 0.8)?;
//! println!("Encoded {} bytes", jpeg.len());
//! ```

mod encoder;
mod format;

pub use encoder::{
    encode_jpeg, encode_png, encode_webp, jpeg_quality, EncodeError, Encoder, ImageEncoder,
};
pub use format::{select_format, OpaqueFormat, OutputFormat, TranslucentFormat};
