//! Target dimension math and resampling.
//!
//! All functions return new `DecodedImage` instances without modifying the input.

use super::{DecodeError, DecodedImage, FilterType};

/// Resolve the output size for a fixed target width.
///
/// The height follows the source aspect ratio,
/// `round(target_width * source_height / source_width)`, and is never
/// smaller than one pixel. Upscaling is allowed: the target width is fixed.
///
/// # Errors
///
/// Returns `DecodeError::InvalidDimensions` if any input is zero.
pub fn resolve_dimensions(
    source_width: u32,
    source_height: u32,
    target_width: u32,
) -> Result<(u32, u32), DecodeError> {
    if source_width == 0 || source_height == 0 || target_width == 0 {
        return Err(DecodeError::InvalidDimensions {
            width: source_width,
            height: source_height,
        });
    }

    let height = (u64::from(target_width) * u64::from(source_height)) as f64 / source_width as f64;
    Ok((target_width, clamp_dimension(height.round())))
}

/// Shrink a width by `factor`, deriving the height from `aspect_ratio`
/// (source height divided by source width) rather than from the current,
/// already rounded, height.
///
/// The width drops by at least one pixel while it is above one, so small
/// images keep shrinking even when rounding would undo the factor.
pub fn shrink_dimensions(width: u32, aspect_ratio: f64, factor: f32) -> (u32, u32) {
    let mut new_width = clamp_dimension((f64::from(width) * f64::from(factor)).round());
    if width > 1 {
        new_width = new_width.min(width - 1);
    }
    (new_width, height_for(new_width, aspect_ratio))
}

/// Scale `width` down, keeping `aspect_ratio`, until neither side exceeds
/// `max_side` and the area stays within `max_pixels`.
///
/// Returns the dimensions unchanged when they already fit.
///
/// # Errors
///
/// Returns `DecodeError::InvalidDimensions` when even a one pixel wide
/// image would break a limit, e.g. an extremely tall strip.
pub fn fit_within_limits(
    width: u32,
    aspect_ratio: f64,
    max_side: u32,
    max_pixels: u64,
) -> Result<(u32, u32), DecodeError> {
    let exact_height = f64::from(width) * aspect_ratio;
    let side_scale = f64::from(max_side) / f64::from(width).max(exact_height);
    let area_scale = (max_pixels as f64 / (f64::from(width) * exact_height)).sqrt();
    let scale = side_scale.min(area_scale).min(1.0);

    let mut fitted = clamp_dimension((f64::from(width) * scale).floor()).min(width);
    loop {
        let height = height_for(fitted, aspect_ratio);
        let fits = fitted <= max_side
            && height <= max_side
            && u64::from(fitted) * u64::from(height) <= max_pixels;
        if fits {
            return Ok((fitted, height));
        }
        if fitted == 1 {
            return Err(DecodeError::InvalidDimensions {
                width: fitted,
                height,
            });
        }
        fitted -= 1;
    }
}

fn height_for(width: u32, aspect_ratio: f64) -> u32 {
    clamp_dimension((f64::from(width) * aspect_ratio).round())
}

fn clamp_dimension(value: f64) -> u32 {
    if value < 1.0 {
        1
    } else if value > f64::from(u32::MAX) {
        u32::MAX
    } else {
        value as u32
    }
}

/// Resize an image to exact dimensions.
///
/// # Errors
///
/// Returns `DecodeError::InvalidDimensions` for a zero target and
/// `DecodeError::CorruptedFile` if the pixel buffer does not match the
/// image's declared size.
pub fn resize(
    image: &DecodedImage,
    width: u32,
    height: u32,
    filter: FilterType,
) -> Result<DecodedImage, DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidDimensions { width, height });
    }

    // Fast path: if dimensions match, just clone
    if image.width == width && image.height == height {
        return Ok(image.clone());
    }

    let view = image.as_rgba_view().ok_or_else(|| {
        DecodeError::CorruptedFile("Pixel buffer does not match dimensions".to_string())
    })?;

    let resized = image::imageops::resize(&view, width, height, filter.to_image_filter());

    Ok(DecodedImage::from_rgba_image(resized, image.channels))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_image(width: u32, height: u32) -> DecodedImage {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(((x * 255) / width.max(1)) as u8);
                pixels.push(((y * 255) / height.max(1)) as u8);
                pixels.push(128);
                pixels.push(255);
            }
        }
        DecodedImage::new(width, height, pixels)
    }

    #[test]
    fn test_resolve_dimensions_landscape() {
        assert_eq!(resolve_dimensions(3300, 2200, 825).unwrap(), (825, 550));
    }

    #[test]
    fn test_resolve_dimensions_portrait_and_upscale() {
        assert_eq!(resolve_dimensions(400, 600, 825).unwrap(), (825, 1238));
        assert_eq!(resolve_dimensions(400, 400, 825).unwrap(), (825, 825));
    }

    #[test]
    fn test_resolve_dimensions_minimum_height() {
        // A very wide strip still gets one row.
        assert_eq!(resolve_dimensions(100_000, 1, 825).unwrap(), (825, 1));
    }

    #[test]
    fn test_resolve_dimensions_zero_input() {
        assert!(matches!(
            resolve_dimensions(0, 100, 825),
            Err(DecodeError::InvalidDimensions { .. })
        ));
        assert!(resolve_dimensions(100, 0, 825).is_err());
        assert!(resolve_dimensions(100, 100, 0).is_err());
    }

    #[test]
    fn test_shrink_dimensions_uses_aspect_ratio() {
        let aspect = 2200.0 / 3300.0;
        assert_eq!(shrink_dimensions(825, aspect, 0.8), (660, 440));
    }

    #[test]
    fn test_shrink_dimensions_floor_is_one_pixel() {
        assert_eq!(shrink_dimensions(1, 1.0, 0.5), (1, 1));
    }

    #[test]
    fn test_shrink_dimensions_small_widths_keep_shrinking() {
        // round(5 * 0.9) is 5 again
        assert_eq!(shrink_dimensions(5, 1.0, 0.9), (4, 4));
        assert_eq!(shrink_dimensions(2, 2.0, 0.9), (1, 2));
    }

    #[test]
    fn test_fit_within_limits_leaves_normal_sizes() {
        assert_eq!(
            fit_within_limits(825, 2.0 / 3.0, 65_535, 40_000_000).unwrap(),
            (825, 550)
        );
    }

    #[test]
    fn test_fit_within_limits_long_screenshot() {
        // 400x32000 resolves to 825x66000, past the JPEG side limit
        let (w, h) = fit_within_limits(825, 80.0, 65_535, u64::MAX).unwrap();
        assert!(h <= 65_535);
        assert_eq!(h, height_for(w, 80.0));
        assert_eq!((w, h), (819, 65_520));
    }

    #[test]
    fn test_fit_within_limits_pixel_cap() {
        let (w, h) = fit_within_limits(825, 100.0, 65_535, 100_000).unwrap();
        assert!(u64::from(w) * u64::from(h) <= 100_000);
        assert_eq!((w, h), (31, 3100));
    }

    #[test]
    fn test_fit_within_limits_thin_strip_at_one_pixel() {
        assert_eq!(
            fit_within_limits(825, 50_000.0, 65_535, 40_000_000).unwrap(),
            (1, 50_000)
        );
    }

    #[test]
    fn test_fit_within_limits_impossible_strip() {
        assert!(matches!(
            fit_within_limits(825, 100_000.0, 65_535, 40_000_000),
            Err(DecodeError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_resize_basic() {
        let img = create_test_image(100, 50);
        let resized = resize(&img, 50, 25, FilterType::Bilinear).unwrap();

        assert_eq!(resized.width, 50);
        assert_eq!(resized.height, 25);
        assert_eq!(resized.pixels.len(), 50 * 25 * 4);
    }

    #[test]
    fn test_resize_same_dimensions() {
        let img = create_test_image(100, 50);
        let resized = resize(&img, 100, 50, FilterType::Bilinear).unwrap();
        assert_eq!(resized, img);
    }

    #[test]
    fn test_resize_keeps_channel_count() {
        let img = DecodedImage::from_rgb(4, 4, &[7u8; 4 * 4 * 3]);
        let resized = resize(&img, 8, 8, FilterType::Nearest).unwrap();
        assert!(!resized.has_alpha_channel());
    }

    #[test]
    fn test_resize_zero_dimensions_error() {
        let img = create_test_image(100, 50);

        assert!(resize(&img, 0, 50, FilterType::Bilinear).is_err());
        assert!(resize(&img, 50, 0, FilterType::Bilinear).is_err());
    }

    #[test]
    fn test_resize_mismatched_buffer_error() {
        let img = DecodedImage {
            width: 10,
            height: 10,
            pixels: vec![0u8; 12],
            channels: 4,
        };
        assert!(matches!(
            resize(&img, 5, 5, FilterType::Nearest),
            Err(DecodeError::CorruptedFile(_))
        ));
    }

    #[test]
    fn test_all_filter_types() {
        let img = create_test_image(100, 50);

        for filter in [
            FilterType::Nearest,
            FilterType::Bilinear,
            FilterType::Lanczos3,
        ] {
            let resized = resize(&img, 50, 25, filter).unwrap();
            assert_eq!(resized.width, 50);
            assert_eq!(resized.height, 25);
        }
    }
}
