//! Decoding of raw source bytes with EXIF orientation handling.

use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::{DynamicImage, ImageReader};
use tracing::debug;

use super::{DecodeError, DecodedImage, Orientation, SourceFormat};

/// Decode image bytes into an RGBA buffer, applying EXIF orientation.
///
/// The container format is sniffed from the magic bytes. The declared MIME
/// type is only consulted when sniffing fails, since clipboard and
/// drag-and-drop sources regularly mislabel their payloads.
///
/// # Errors
///
/// Returns `DecodeError::InvalidFormat` if the format cannot be determined,
/// `DecodeError::UnsupportedMime` if only an unusable MIME type was given,
/// and `DecodeError::CorruptedFile` if the decoder rejects the bytes.
pub fn decode_image(bytes: &[u8], declared_mime: Option<&str>) -> Result<DecodedImage, DecodeError> {
    let format = detect_format(bytes, declared_mime)?;

    let img = ImageReader::with_format(Cursor::new(bytes), format.to_image_format())
        .decode()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    if img.width() == 0 || img.height() == 0 {
        return Err(DecodeError::InvalidDimensions {
            width: img.width(),
            height: img.height(),
        });
    }

    let channels = if !format.is_always_opaque() && img.color().has_alpha() {
        4
    } else {
        3
    };
    let orientation = if format == SourceFormat::Gif {
        Orientation::Normal
    } else {
        extract_orientation(bytes)
    };

    debug!(
        ?format,
        ?orientation,
        width = img.width(),
        height = img.height(),
        channels,
        "decoded source image"
    );

    let oriented = apply_orientation(img, orientation);
    Ok(DecodedImage::from_rgba_image(oriented.into_rgba8(), channels))
}

/// Work out which decoder to use for `bytes`.
pub fn detect_format(bytes: &[u8], declared_mime: Option<&str>) -> Result<SourceFormat, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::InvalidFormat);
    }

    if let Some(format) = image::guess_format(bytes)
        .ok()
        .and_then(SourceFormat::from_image_format)
    {
        return Ok(format);
    }

    match declared_mime {
        Some(mime) => SourceFormat::from_mime(mime),
        None => Err(DecodeError::InvalidFormat),
    }
}

/// Read the EXIF orientation tag.
///
/// Returns `Orientation::Normal` if no EXIF data is found or orientation
/// cannot be determined.
pub fn extract_orientation(bytes: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(bytes);

    match Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif
            .get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .map(Orientation::from)
            .unwrap_or_default(),
        Err(_) => Orientation::Normal,
    }
}

fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => img,
        Orientation::FlipHorizontal => img.fliph(),
        Orientation::Rotate180 => img.rotate180(),
        Orientation::FlipVertical => img.flipv(),
        Orientation::Transpose => img.rotate90().fliph(),
        Orientation::Rotate90CW => img.rotate90(),
        Orientation::Transverse => img.rotate270().fliph(),
        Orientation::Rotate270CW => img.rotate270(),
    }
}
