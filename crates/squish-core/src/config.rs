//! Caller-supplied compression settings.

use serde::{Deserialize, Serialize};

use crate::decode::FilterType;
use crate::encode::{OpaqueFormat, TranslucentFormat};
use crate::error::{CompressError, Result};

/// Default fixed output width in pixels.
pub const DEFAULT_TARGET_WIDTH: u32 = 825;

/// Default byte budget (100 KiB).
pub const DEFAULT_MAX_BYTES: u64 = 100 * 1024;

/// Default cap on the resized area, 160 MB of RGBA.
pub const DEFAULT_MAX_PIXELS: u64 = 40_000_000;

/// Settings for one compression run.
///
/// Deserializes from a partial camelCase object; missing fields take the
/// defaults below, so a JavaScript host can pass `{ maxBytes: 51200 }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompressionConfig {
    /// Fixed output width; height follows the source aspect ratio.
    pub target_width: u32,
    /// Hard upper bound on the encoded size.
    pub max_bytes: u64,
    /// Lowest quality the search may use, in `(0, 1]`.
    pub min_quality: f32,
    /// Encoder calls allowed per dimension round, endpoint probes included.
    pub max_search_iterations: u32,
    /// The quality bisection stops once the bracket is narrower than this.
    pub quality_epsilon: f32,
    /// How many times the dimensions may be shrunk after quality alone fails.
    pub max_dimension_shrinks: u32,
    /// Width multiplier applied per shrink, in `(0, 1)`.
    pub shrink_factor: f32,
    /// Format for images with any transparency.
    pub translucent_format: TranslucentFormat,
    /// Format for fully opaque images.
    pub opaque_format: OpaqueFormat,
    /// Retry an infeasible translucent image as opaque, composited over
    /// `background`.
    pub allow_alpha_to_opaque_fallback: bool,
    /// Fill color used when flattening alpha.
    pub background: [u8; 3],
    /// Resampling filter.
    pub filter: FilterType,
    /// Tries per encode before a transient encoder failure becomes fatal.
    pub max_encode_attempts: u32,
    /// Largest area the resized buffer may have; taller or wider targets
    /// are scaled down to fit before any resampling.
    pub max_pixels: u64,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            target_width: DEFAULT_TARGET_WIDTH,
            max_bytes: DEFAULT_MAX_BYTES,
            min_quality: 0.2,
            max_search_iterations: 10,
            quality_epsilon: 0.01,
            max_dimension_shrinks: 5,
            shrink_factor: 0.9,
            translucent_format: TranslucentFormat::default(),
            opaque_format: OpaqueFormat::default(),
            allow_alpha_to_opaque_fallback: false,
            background: [255, 255, 255],
            filter: FilterType::default(),
            max_encode_attempts: 2,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

impl CompressionConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject settings the search cannot work with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(CompressError::InvalidConfig(msg.to_string()));

        if self.target_width == 0 {
            return invalid("targetWidth must be positive");
        }
        if self.max_bytes == 0 {
            return invalid("maxBytes must be positive");
        }
        if !(self.min_quality > 0.0 && self.min_quality <= 1.0) {
            return invalid("minQuality must be in (0, 1]");
        }
        if self.max_search_iterations < 2 {
            return invalid("maxSearchIterations must be at least 2");
        }
        if !(self.quality_epsilon > 0.0) {
            return invalid("qualityEpsilon must be positive");
        }
        if !(self.shrink_factor > 0.0 && self.shrink_factor < 1.0) {
            return invalid("shrinkFactor must be in (0, 1)");
        }
        if self.max_encode_attempts == 0 {
            return invalid("maxEncodeAttempts must be at least 1");
        }
        if self.max_pixels == 0 {
            return invalid("maxPixels must be positive");
        }
        Ok(())
    }

    /// Upper bound on encoder calls for one search pass.
    pub fn max_encode_calls(&self) -> u64 {
        u64::from(self.max_search_iterations) * (1 + u64::from(self.max_dimension_shrinks))
    }
}
