//! Encoders backed by the `image` crate.
//!
//! JPEG is the only format with a continuous quality knob. PNG and WebP are
//! written losslessly, so the search can only shrink their dimensions.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder as _, ImageError};
use thiserror::Error;

use super::OutputFormat;
use crate::decode::DecodedImage;

/// Errors that can occur during a single encode.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes (width * height * 4), got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero, or the buffer size overflows
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// A side is longer than the format can store
    #[error("{format:?} cannot store {width}x{height}: sides are limited to {max} pixels")]
    DimensionsTooLarge {
        format: OutputFormat,
        width: u32,
        height: u32,
        max: u32,
    },

    /// The codec refused the input; the same call will fail again
    #[error("{format:?} encoder rejected the image: {message}")]
    Rejected { format: OutputFormat, message: String },

    /// The encoder returned successfully but wrote nothing
    #[error("Encoder produced no output")]
    EmptyOutput,

    /// The underlying codec failed while writing
    #[error("{format:?} encoding failed: {message}")]
    EncodingFailed { format: OutputFormat, message: String },
}

impl EncodeError {
    /// Whether retrying the same attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, EncodeError::EmptyOutput | EncodeError::EncodingFailed { .. })
    }

    /// Map a codec error. Only I/O failures are worth retrying; parameter,
    /// limit and format errors are deterministic.
    fn from_codec(format: OutputFormat, err: ImageError) -> Self {
        match err {
            ImageError::IoError(_) => EncodeError::EncodingFailed {
                format,
                message: err.to_string(),
            },
            _ => EncodeError::Rejected {
                format,
                message: err.to_string(),
            },
        }
    }
}

/// Anything that can turn an RGBA buffer into encoded bytes.
///
/// `quality` is in `[0, 1]`; encoders for formats without a quality knob
/// ignore it and must report so through [`Encoder::supports_quality`].
pub trait Encoder: Send + Sync {
    fn encode(
        &self,
        image: &DecodedImage,
        format: OutputFormat,
        quality: f32,
    ) -> Result<Vec<u8>, EncodeError>;

    fn supports_quality(&self, format: OutputFormat) -> bool;

    /// Number of distinct quality steps the encoder resolves `[0, 1]` into,
    /// or `None` for a continuous knob. The search only probes qualities on
    /// this grid so no two probes produce the same encode.
    fn quality_levels(&self, _format: OutputFormat) -> Option<u32> {
        None
    }
}

/// Production encoder built on the `image` crate codecs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageEncoder;

impl Encoder for ImageEncoder {
    fn encode(
        &self,
        image: &DecodedImage,
        format: OutputFormat,
        quality: f32,
    ) -> Result<Vec<u8>, EncodeError> {
        validate(image, format)?;
        match format {
            OutputFormat::Jpeg => encode_jpeg(
                &image.to_rgb_bytes(),
                image.width,
                image.height,
                jpeg_quality(quality),
            ),
            OutputFormat::Png => encode_png(&image.pixels, image.width, image.height),
            OutputFormat::WebP => encode_webp(&image.pixels, image.width, image.height),
        }
    }

    fn supports_quality(&self, format: OutputFormat) -> bool {
        matches!(format, OutputFormat::Jpeg)
    }

    fn quality_levels(&self, format: OutputFormat) -> Option<u32> {
        match format {
            OutputFormat::Jpeg => Some(100),
            OutputFormat::Png | OutputFormat::WebP => None,
        }
    }
}

/// Map a `[0, 1]` quality to the JPEG encoder's 1-100 scale.
pub fn jpeg_quality(quality: f32) -> u8 {
    let scaled = (quality.clamp(0.0, 1.0) * 100.0).round();
    (scaled as u8).clamp(1, 100)
}

fn validate(image: &DecodedImage, format: OutputFormat) -> Result<(), EncodeError> {
    if image.width == 0 || image.height == 0 {
        return Err(EncodeError::InvalidDimensions {
            width: image.width,
            height: image.height,
        });
    }

    let max = format.max_dimension();
    if image.width > max || image.height > max {
        return Err(EncodeError::DimensionsTooLarge {
            format,
            width: image.width,
            height: image.height,
            max,
        });
    }

    let expected = (image.width as usize)
        .checked_mul(image.height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or(EncodeError::InvalidDimensions {
            width: image.width,
            height: image.height,
        })?;
    if image.pixels.len() != expected {
        return Err(EncodeError::InvalidPixelData {
            expected,
            actual: image.pixels.len(),
        });
    }

    Ok(())
}

/// Encode RGB pixel data to JPEG bytes with a 1-100 quality.
pub fn encode_jpeg(rgb: &[u8], width: u32, height: u32, quality: u8) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .write_image(rgb, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| EncodeError::from_codec(OutputFormat::Jpeg, e))?;
    Ok(buffer.into_inner())
}

/// Encode RGBA pixel data to PNG with the strongest compression.
pub fn encode_png(rgba: &[u8], width: u32, height: u32) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = Vec::new();
    PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, PngFilter::Adaptive)
        .write_image(rgba, width, height, ExtendedColorType::Rgba8)
        .map_err(|e| EncodeError::from_codec(OutputFormat::Png, e))?;
    Ok(buffer)
}

/// Encode RGBA pixel data to lossless WebP.
pub fn encode_webp(rgba: &[u8], width: u32, height: u32) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = Vec::new();
    WebPEncoder::new_lossless(&mut buffer)
        .write_image(rgba, width, height, ExtendedColorType::Rgba8)
        .map_err(|e| EncodeError::from_codec(OutputFormat::WebP, e))?;
    Ok(buffer)
}
