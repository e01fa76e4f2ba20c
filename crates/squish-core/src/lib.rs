//! Squish Core - Adaptive image re-encoder
//!
//! This crate scales an uploaded image to a fixed width and re-encodes it so
//! the result fits a byte budget. Images with any transparency go to a
//! lossless translucent format, opaque images to JPEG. The encoder quality is
//! bisected first; if the lowest acceptable quality still overflows, the
//! dimensions are shrunk and the search repeats.
//!
//! ```ignore
//! use squish_core::{compress, CompressionConfig};
//!
//! let result = compress(&bytes, Some("image/png"), &CompressionConfig::default())?;
//! assert!(result.byte_size <= 100 * 1024);
//! ```

pub mod alpha;
pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod pipeline;
pub mod search;

pub use alpha::{flatten_onto, has_transparency};
pub use config::{CompressionConfig, DEFAULT_MAX_BYTES, DEFAULT_MAX_PIXELS, DEFAULT_TARGET_WIDTH};
pub use decode::{decode_image, fit_within_limits, resolve_dimensions, DecodedImage, FilterType};
pub use encode::{select_format, Encoder, ImageEncoder, OpaqueFormat, OutputFormat, TranslucentFormat};
pub use error::{CompressError, Result};
pub use pipeline::{compress, compress_batch, compress_decoded, compress_with, SourceBytes};
pub use search::{search, EncodeAttempt, EncodedResult, SearchControl};
