//! Output formats and the transparency-driven format choice.

use serde::{Deserialize, Serialize};

/// Every format the re-encoder can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
}

impl OutputFormat {
    /// MIME type for previews and downloads.
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
        }
    }

    /// Suggested filename extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
        }
    }

    /// Whether the format can store an alpha channel.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, OutputFormat::Jpeg)
    }

    /// Longest side, in pixels, the encoder for this format accepts.
    pub fn max_dimension(self) -> u32 {
        match self {
            OutputFormat::Jpeg => 65_535,
            OutputFormat::Png => i32::MAX as u32,
            OutputFormat::WebP => 16_383,
        }
    }
}

/// Alpha-capable formats used for translucent images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslucentFormat {
    #[default]
    Png,
    WebP,
}

impl From<TranslucentFormat> for OutputFormat {
    fn from(format: TranslucentFormat) -> Self {
        match format {
            TranslucentFormat::Png => OutputFormat::Png,
            TranslucentFormat::WebP => OutputFormat::WebP,
        }
    }
}

/// Lossy formats used for opaque images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpaqueFormat {
    #[default]
    Jpeg,
}

impl From<OpaqueFormat> for OutputFormat {
    fn from(format: OpaqueFormat) -> Self {
        match format {
            OpaqueFormat::Jpeg => OutputFormat::Jpeg,
        }
    }
}

/// Pick the output format: the translucent one when any pixel carries
/// transparency, the opaque (lossy) one otherwise.
pub fn select_format(
    has_transparency: bool,
    translucent: TranslucentFormat,
    opaque: OpaqueFormat,
) -> OutputFormat {
    if has_transparency {
        translucent.into()
    } else {
        opaque.into()
    }
}
