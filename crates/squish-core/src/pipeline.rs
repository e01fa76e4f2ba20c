//! End-to-end compression: decode, resize, classify, pick a format, search.

use tracing::{info, warn};

use crate::alpha::{flatten_onto, has_transparency};
use crate::config::CompressionConfig;
use crate::decode::{decode_image, fit_within_limits, resize, resolve_dimensions, DecodedImage};
use crate::encode::{select_format, Encoder, ImageEncoder};
use crate::error::{CompressError, Result};
use crate::search::{search, EncodedResult, SearchControl};

/// Raw bytes of one source image plus the MIME type its provider declared.
#[derive(Debug, Clone, Copy)]
pub struct SourceBytes<'a> {
    pub bytes: &'a [u8],
    pub mime: Option<&'a str>,
}

impl<'a> SourceBytes<'a> {
    pub fn new(bytes: &'a [u8], mime: Option<&'a str>) -> Self {
        Self { bytes, mime }
    }
}

/// Decode `bytes` and fit the result under the configured budget.
pub fn compress(bytes: &[u8], mime: Option<&str>, config: &CompressionConfig) -> Result<EncodedResult> {
    config.validate()?;
    let source = decode_image(bytes, mime)?;
    compress_decoded(&source, config)
}

/// Compress an already decoded image with the production encoder.
pub fn compress_decoded(source: &DecodedImage, config: &CompressionConfig) -> Result<EncodedResult> {
    compress_with(source, config, &ImageEncoder, &SearchControl::new())
}

/// Compress with an explicit encoder and search control.
///
/// Transparency is classified on the source rather than the resized buffer
/// so that downscaling cannot average away an isolated transparent pixel.
/// Targets longer than the chosen format can store, or larger than
/// `config.max_pixels`, are scaled down before anything is allocated.
pub fn compress_with(
    source: &DecodedImage,
    config: &CompressionConfig,
    encoder: &dyn Encoder,
    control: &SearchControl,
) -> Result<EncodedResult> {
    config.validate()?;

    let (target_width, target_height) =
        resolve_dimensions(source.width, source.height, config.target_width)?;
    let aspect_ratio = f64::from(source.height) / f64::from(source.width);
    let translucent = has_transparency(source);
    let format = select_format(translucent, config.translucent_format, config.opaque_format);

    let (width, height) = fit_within_limits(
        target_width,
        aspect_ratio,
        format.max_dimension(),
        config.max_pixels,
    )?;
    if (width, height) != (target_width, target_height) {
        warn!(
            target_width,
            target_height,
            width,
            height,
            max_pixels = config.max_pixels,
            "target size exceeds limits, scaling down"
        );
    }

    info!(
        source_width = source.width,
        source_height = source.height,
        width,
        height,
        translucent,
        ?format,
        max_bytes = config.max_bytes,
        "compressing image"
    );

    let resized = resize(source, width, height, config.filter)?;

    let outcome = match search(&resized, aspect_ratio, format, config, encoder, control) {
        Err(CompressError::CompressionInfeasible { smallest_bytes, .. })
            if format.supports_alpha() && config.allow_alpha_to_opaque_fallback =>
        {
            warn!(
                smallest_bytes,
                background = ?config.background,
                "translucent encode cannot fit, retrying as opaque"
            );
            let flattened = flatten_onto(&resized, config.background);
            search(
                &flattened,
                aspect_ratio,
                config.opaque_format.into(),
                config,
                encoder,
                control,
            )
            .map_err(|err| keep_smallest(err, smallest_bytes))
        }
        other => other,
    };

    if let Ok(result) = &outcome {
        info!(
            format = ?result.format,
            width = result.width,
            height = result.height,
            byte_size = result.byte_size,
            quality = result.quality,
            "image compressed"
        );
    }
    outcome
}

fn keep_smallest(err: CompressError, earlier_smallest: u64) -> CompressError {
    match err {
        CompressError::CompressionInfeasible {
            max_bytes,
            smallest_bytes,
            last_quality,
            last_width,
            last_height,
        } => CompressError::CompressionInfeasible {
            max_bytes,
            smallest_bytes: smallest_bytes.min(earlier_smallest),
            last_quality,
            last_width,
            last_height,
        },
        other => other,
    }
}

/// Compress every input independently, one result per input in order.
///
/// A failing image never affects its siblings. With the `parallel` feature
/// the images are processed on the rayon thread pool.
pub fn compress_batch(
    inputs: &[SourceBytes<'_>],
    config: &CompressionConfig,
) -> Vec<Result<EncodedResult>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        inputs
            .par_iter()
            .map(|input| compress(input.bytes, input.mime, config))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        inputs
            .iter()
            .map(|input| compress(input.bytes, input.mime, config))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{OutputFormat, TranslucentFormat};
    use crate::search::test_support::LinearEncoder;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    fn gradient_rgb(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                (x * 255 / width) as u8,
                (y * 255 / height) as u8,
                ((x + y) * 127 / (width + height)) as u8,
            ])
        })
    }

    fn encode_to(img: &image::DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    /// Deterministic RGBA noise that no lossless encoder can shrink much.
    fn noise_rgba(width: u32, height: u32) -> DecodedImage {
        let mut state: u32 = 0x2545_F491;
        let pixels = (0..width * height * 4)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 24) as u8
            })
            .collect();
        DecodedImage::new(width, height, pixels)
    }

    #[test]
    fn test_large_opaque_source_hits_target_size() {
        let rgb = gradient_rgb(3300, 2200);
        let source = DecodedImage::from_rgb(3300, 2200, rgb.as_raw());

        let result = compress_decoded(&source, &CompressionConfig::default()).unwrap();

        assert_eq!(result.format, OutputFormat::Jpeg);
        assert_eq!((result.width, result.height), (825, 550));
        assert!(result.byte_size <= 102_400);
        assert_eq!(result.byte_size as usize, result.bytes.len());
    }

    #[test]
    fn test_jpeg_bytes_end_to_end() {
        let jpeg = encode_to(&gradient_rgb(1650, 1100).into(), ImageFormat::Jpeg);

        let result = compress(&jpeg, Some("image/jpeg"), &CompressionConfig::default()).unwrap();

        assert_eq!(result.format, OutputFormat::Jpeg);
        assert_eq!((result.width, result.height), (825, 550));
        assert!(result.byte_size <= 102_400);
        assert_eq!(&result.bytes[0..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_single_transparent_pixel_picks_translucent_format() {
        let mut img = RgbaImage::from_pixel(400, 400, Rgba([30, 160, 90, 255]));
        img.put_pixel(287, 331, Rgba([0, 0, 0, 0]));
        let png = encode_to(&img.into(), ImageFormat::Png);

        let result = compress(&png, Some("image/png"), &CompressionConfig::default()).unwrap();

        assert_eq!(result.format, OutputFormat::Png);
        assert_eq!((result.width, result.height), (825, 825));
        assert!(result.byte_size <= 102_400);

        let decoded = image::load_from_memory(&result.bytes).unwrap().into_rgba8();
        assert!(decoded.pixels().any(|p| p[3] < 255));
    }

    #[test]
    fn test_translucent_webp_config() {
        let mut img = RgbaImage::from_pixel(100, 50, Rgba([200, 10, 10, 255]));
        img.put_pixel(99, 49, Rgba([200, 10, 10, 10]));
        let png = encode_to(&img.into(), ImageFormat::Png);
        let config = CompressionConfig {
            target_width: 200,
            translucent_format: TranslucentFormat::WebP,
            ..CompressionConfig::default()
        };

        let result = compress(&png, None, &config).unwrap();

        assert_eq!(result.format, OutputFormat::WebP);
        assert_eq!((result.width, result.height), (200, 100));
        assert_eq!(&result.bytes[8..12], b"WEBP");
    }

    #[test]
    fn test_opaque_png_goes_to_jpeg() {
        let img = RgbaImage::from_pixel(64, 64, Rgba([1, 2, 3, 255]));
        let png = encode_to(&img.into(), ImageFormat::Png);
        let config = CompressionConfig {
            target_width: 64,
            ..CompressionConfig::default()
        };

        let result = compress(&png, Some("image/png"), &config).unwrap();
        assert_eq!(result.format, OutputFormat::Jpeg);
    }

    #[test]
    fn test_small_image_keeps_full_quality() {
        let source = DecodedImage::from_rgb(50, 50, gradient_rgb(50, 50).as_raw());
        let config = CompressionConfig {
            target_width: 100,
            ..CompressionConfig::default()
        };
        let result = compress_decoded(&source, &config).unwrap();
        assert_eq!(result.quality, 1.0);
        assert_eq!((result.width, result.height), (100, 100));
    }

    #[test]
    fn test_one_byte_budget_is_infeasible() {
        let source = DecodedImage::from_rgb(40, 30, gradient_rgb(40, 30).as_raw());
        let config = CompressionConfig {
            max_bytes: 1,
            target_width: 120,
            ..CompressionConfig::default()
        };

        let err = compress_decoded(&source, &config).unwrap_err();
        match err {
            CompressError::CompressionInfeasible {
                max_bytes,
                smallest_bytes,
                ..
            } => {
                assert_eq!(max_bytes, 1);
                assert!(smallest_bytes > 1);
            }
            other => panic!("expected CompressionInfeasible, got {other:?}"),
        }
    }

    #[test]
    fn test_alpha_fallback_to_opaque() {
        let source = noise_rgba(200, 200);
        // No shrinking: resampling would smooth the noise
        let mut config = CompressionConfig {
            target_width: 200,
            max_bytes: 60 * 1024,
            max_dimension_shrinks: 0,
            ..CompressionConfig::default()
        };

        let err = compress_decoded(&source, &config).unwrap_err();
        assert!(matches!(err, CompressError::CompressionInfeasible { .. }));

        config.allow_alpha_to_opaque_fallback = true;
        let result = compress_decoded(&source, &config).unwrap();
        assert_eq!(result.format, OutputFormat::Jpeg);
        assert!(result.byte_size <= config.max_bytes);
    }

    #[test]
    fn test_fallback_failure_keeps_smallest_of_both_passes() {
        let source = noise_rgba(20, 20);
        let config = CompressionConfig {
            target_width: 20,
            max_bytes: 1,
            allow_alpha_to_opaque_fallback: true,
            ..CompressionConfig::default()
        };
        let encoder = LinearEncoder::new(0.5, 1.0);

        let err = compress_with(&source, &config, &encoder, &SearchControl::new()).unwrap_err();

        let smallest_seen = encoder
            .calls()
            .iter()
            .map(|(q, w, h)| encoder.size_for(u64::from(*w) * u64::from(*h), *q) as u64)
            .min()
            .unwrap();
        match err {
            CompressError::CompressionInfeasible { smallest_bytes, .. } => {
                assert_eq!(smallest_bytes, smallest_seen);
            }
            other => panic!("expected CompressionInfeasible, got {other:?}"),
        }
    }

    #[test]
    fn test_deterministic_output() {
        let jpeg = encode_to(&gradient_rgb(300, 200).into(), ImageFormat::Jpeg);
        let config = CompressionConfig {
            max_bytes: 20 * 1024,
            ..CompressionConfig::default()
        };

        let first = compress(&jpeg, Some("image/jpeg"), &config).unwrap();
        let second = compress(&jpeg, Some("image/jpeg"), &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_area_source() {
        let source = DecodedImage::new(0, 0, vec![]);
        let err = compress_decoded(&source, &CompressionConfig::default()).unwrap_err();
        assert!(matches!(err, CompressError::InvalidDimensions { .. }));
    }

    #[test]
    fn test_thin_strip_stays_at_one_pixel_wide() {
        // 825 wide would need 41 million rows
        let source = DecodedImage::from_rgb(1, 50_000, &vec![200u8; 3 * 50_000]);

        let result = compress_decoded(&source, &CompressionConfig::default()).unwrap();

        assert_eq!(result.format, OutputFormat::Jpeg);
        assert_eq!((result.width, result.height), (1, 50_000));
        assert!(result.byte_size <= 102_400);
    }

    #[test]
    fn test_unstorable_strip_is_a_per_image_error() {
        let strip = encode_to(
            &RgbImage::from_pixel(1, 100_000, Rgb([9, 9, 9])).into(),
            ImageFormat::Png,
        );
        let jpeg = encode_to(&gradient_rgb(30, 20).into(), ImageFormat::Jpeg);
        let config = CompressionConfig {
            target_width: 60,
            ..CompressionConfig::default()
        };

        let results = compress_batch(
            &[
                SourceBytes::new(&strip, Some("image/png")),
                SourceBytes::new(&jpeg, Some("image/jpeg")),
            ],
            &config,
        );

        assert!(matches!(
            results[0],
            Err(CompressError::InvalidDimensions { .. })
        ));
        assert!(results[1].is_ok());
    }

    #[test]
    fn test_pixel_cap_scales_target_down() {
        let source = DecodedImage::from_rgb(4, 400, &[120u8; 3 * 4 * 400]);
        let config = CompressionConfig {
            max_pixels: 100_000,
            ..CompressionConfig::default()
        };

        let result = compress_decoded(&source, &config).unwrap();

        assert_eq!((result.width, result.height), (31, 3_100));
        assert!(u64::from(result.width) * u64::from(result.height) <= 100_000);
    }

    #[test]
    fn test_translucent_target_respects_format_side_limit() {
        let mut source = DecodedImage::new(2, 100, [50u8, 60, 70, 255].repeat(200));
        source.pixels[3] = 0;
        let config = CompressionConfig {
            translucent_format: TranslucentFormat::WebP,
            filter: crate::decode::FilterType::Nearest,
            ..CompressionConfig::default()
        };
        let encoder = LinearEncoder::lossless(0.001);

        let result = compress_with(&source, &config, &encoder, &SearchControl::new()).unwrap();

        // 825x41250 would overflow WebP's side limit
        assert_eq!(result.format, OutputFormat::WebP);
        assert!(result.height <= OutputFormat::WebP.max_dimension());
        assert_eq!((result.width, result.height), (327, 16_350));
    }

    #[test]
    fn test_garbage_bytes() {
        let err = compress(b"definitely not an image", Some("image/png"), &CompressionConfig::default())
            .unwrap_err();
        assert!(matches!(err, CompressError::DecodeFailed(_)));
    }

    #[test]
    fn test_cancelled() {
        let source = DecodedImage::from_rgb(10, 10, &[0u8; 300]);
        let control = SearchControl::new().with_cancel_flag(Arc::new(AtomicBool::new(true)));

        let err = compress_with(&source, &CompressionConfig::default(), &ImageEncoder, &control)
            .unwrap_err();
        assert!(matches!(err, CompressError::Cancelled));
    }

    #[test]
    fn test_batch_keeps_siblings() {
        let png = encode_to(
            &RgbaImage::from_pixel(30, 20, Rgba([5, 5, 5, 128])).into(),
            ImageFormat::Png,
        );
        let jpeg = encode_to(&gradient_rgb(30, 20).into(), ImageFormat::Jpeg);
        let garbage = [0u8, 1, 2, 3];
        let config = CompressionConfig {
            target_width: 60,
            ..CompressionConfig::default()
        };

        let results = compress_batch(
            &[
                SourceBytes::new(&png, Some("image/png")),
                SourceBytes::new(&garbage, Some("image/png")),
                SourceBytes::new(&jpeg, Some("image/jpeg")),
            ],
            &config,
        );

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().format, OutputFormat::Png);
        assert!(matches!(results[1], Err(CompressError::DecodeFailed(_))));
        assert_eq!(results[2].as_ref().unwrap().format, OutputFormat::Jpeg);
        assert_eq!(
            (results[2].as_ref().unwrap().width, results[2].as_ref().unwrap().height),
            (60, 40)
        );
    }
}
