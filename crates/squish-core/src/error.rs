//! Error types for the re-encoder.

use thiserror::Error;

use crate::decode::DecodeError;
use crate::encode::EncodeError;

/// Result type alias for compression operations.
pub type Result<T> = std::result::Result<T, CompressError>;

/// Everything that can stop one image from being compressed.
///
/// Errors are per image: a batch keeps them next to the successes of its
/// sibling images instead of aborting.
#[derive(Debug, Error)]
pub enum CompressError {
    /// The source bytes could not be decoded as an image
    #[error("Failed to decode image: {0}")]
    DecodeFailed(DecodeError),

    /// Zero-area source or target
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// The caller-supplied configuration is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The encoder failed and retries were exhausted
    #[error("Encoding failed: {0}")]
    EncodeFailed(#[from] EncodeError),

    /// No quality/dimension combination met the byte budget
    #[error(
        "Cannot fit image under {max_bytes} bytes: smallest encode was {smallest_bytes} bytes \
         (last tried quality {last_quality:.3} at {last_width}x{last_height})"
    )]
    CompressionInfeasible {
        max_bytes: u64,
        smallest_bytes: u64,
        last_quality: f32,
        last_width: u32,
        last_height: u32,
    },

    /// The caller cancelled the search
    #[error("Compression cancelled")]
    Cancelled,
}

impl From<DecodeError> for CompressError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::InvalidDimensions { width, height } => {
                CompressError::InvalidDimensions { width, height }
            }
            other => CompressError::DecodeFailed(other),
        }
    }
}
