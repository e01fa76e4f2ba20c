//! Image decoding pipeline.
//!
//! This module provides functionality for:
//! - Sniffing and decoding JPEG, PNG, WebP and GIF sources
//! - Applying EXIF orientation the way browsers do when drawing to a canvas
//! - Resolving fixed-width target dimensions and resampling
//!
//! All decoded images are normalized to RGBA8.

mod resize;
mod source;
mod types;

pub use resize::{fit_within_limits, resize, resolve_dimensions, shrink_dimensions};
pub use source::{decode_image, detect_format, extract_orientation};
pub use types::{DecodeError, DecodedImage, FilterType, Orientation, SourceFormat};
