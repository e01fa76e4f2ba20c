//! Transparency classification and alpha flattening.

use crate::decode::DecodedImage;

/// Returns true iff at least one pixel has alpha below 255.
///
/// Sources that never carried an alpha channel are answered without a scan.
/// Otherwise every pixel is checked, stopping at the first translucent one;
/// sampling only the first pixel misses localized transparency.
pub fn has_transparency(image: &DecodedImage) -> bool {
    if !image.has_alpha_channel() {
        return false;
    }
    scan_transparency(&image.pixels)
}

/// Full scan of an RGBA8 buffer for any alpha value below 255.
pub fn scan_transparency(rgba: &[u8]) -> bool {
    rgba.chunks_exact(4).any(|px| px[3] < u8::MAX)
}

/// Composite the image over a solid background, producing a fully opaque
/// buffer. Used when a translucent image is allowed to fall back to a lossy
/// format.
pub fn flatten_onto(image: &DecodedImage, background: [u8; 3]) -> DecodedImage {
    let pixels = image
        .pixels
        .chunks_exact(4)
        .flat_map(|px| {
            let a = u32::from(px[3]);
            let blend = |fg: u8, bg: u8| {
                ((u32::from(fg) * a + u32::from(bg) * (255 - a) + 127) / 255) as u8
            };
            [
                blend(px[0], background[0]),
                blend(px[1], background[1]),
                blend(px[2], background[2]),
                u8::MAX,
            ]
        })
        .collect();

    DecodedImage {
        width: image.width,
        height: image.height,
        pixels,
        channels: 3,
    }
}
