//! Compression WASM bindings.
//!
//! # Example
//!
//! ```typescript
//! import { compress_image } from '@squish/wasm';
//!
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const result = compress_image(bytes, file.type, { maxBytes: 100 * 1024 });
//! const blob = new Blob([result.bytes()], { type: result.mimeType });
//! ```
//!
//! Errors reach JavaScript as strings of the form `"<Kind>: <message>"` so
//! callers can branch on the kind, e.g. `CompressionInfeasible`.

use squish_core::{self as squish, CompressError, CompressionConfig};
use wasm_bindgen::prelude::*;

use crate::types::JsEncodedResult;

/// Scale an image to the configured width and re-encode it under the byte
/// budget.
///
/// # Arguments
///
/// * `bytes` - The uploaded file contents
/// * `mime` - The MIME type the browser reported, used when sniffing fails
/// * `config` - A partial config object; `undefined` or `null` means defaults
///
/// # Errors
///
/// Returns an error string when decoding fails, the config is invalid, or no
/// quality and size combination fits the budget.
#[wasm_bindgen]
pub fn compress_image(
    bytes: &[u8],
    mime: Option<String>,
    config: JsValue,
) -> Result<JsEncodedResult, JsValue> {
    let config = config_from_js(config)?;
    compress_bytes(bytes, mime.as_deref(), &config).map_err(|e| to_js_error(&e))
}

/// The default configuration as a plain object.
#[wasm_bindgen]
pub fn default_config() -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(&CompressionConfig::default())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Output dimensions `[width, height]` for a source of the given size.
///
/// `target_width` defaults to the standard fixed width.
#[wasm_bindgen]
pub fn target_dimensions(
    source_width: u32,
    source_height: u32,
    target_width: Option<u32>,
) -> Result<Vec<u32>, JsValue> {
    dimensions(source_width, source_height, target_width).map_err(|e| to_js_error(&e))
}

/// Whether an RGBA buffer (e.g. canvas `ImageData.data`) has any pixel with
/// alpha below 255.
#[wasm_bindgen]
pub fn has_transparency(rgba: &[u8], width: u32, height: u32) -> Result<bool, JsValue> {
    check_rgba_length(rgba, width, height).map_err(|e| JsValue::from_str(&e))?;
    Ok(squish::alpha::scan_transparency(rgba))
}

fn config_from_js(config: JsValue) -> Result<CompressionConfig, JsValue> {
    if config.is_undefined() || config.is_null() {
        return Ok(CompressionConfig::default());
    }
    serde_wasm_bindgen::from_value(config)
        .map_err(|e| JsValue::from_str(&format!("InvalidConfig: {}", e)))
}

pub(crate) fn compress_bytes(
    bytes: &[u8],
    mime: Option<&str>,
    config: &CompressionConfig,
) -> squish::Result<JsEncodedResult> {
    squish::compress(bytes, mime, config).map(JsEncodedResult::from)
}

pub(crate) fn dimensions(
    source_width: u32,
    source_height: u32,
    target_width: Option<u32>,
) -> squish::Result<Vec<u32>> {
    let target = target_width.unwrap_or(squish::DEFAULT_TARGET_WIDTH);
    let (width, height) = squish::resolve_dimensions(source_width, source_height, target)?;
    Ok(vec![width, height])
}

pub(crate) fn check_rgba_length(rgba: &[u8], width: u32, height: u32) -> Result<(), String> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| format!("InvalidDimensions: {}x{} RGBA does not fit in memory", width, height))?;
    if rgba.len() != expected {
        return Err(format!(
            "InvalidPixelData: expected {} bytes for {}x{} RGBA, got {}",
            expected,
            width,
            height,
            rgba.len()
        ));
    }
    Ok(())
}

/// Stable name for each error variant, used as the message prefix.
pub(crate) fn error_kind(err: &CompressError) -> &'static str {
    match err {
        CompressError::DecodeFailed(_) => "DecodeFailed",
        CompressError::InvalidDimensions { .. } => "InvalidDimensions",
        CompressError::InvalidConfig(_) => "InvalidConfig",
        CompressError::EncodeFailed(_) => "EncodeFailed",
        CompressError::CompressionInfeasible { .. } => "CompressionInfeasible",
        CompressError::Cancelled => "Cancelled",
    }
}

pub(crate) fn error_message(err: &CompressError) -> String {
    format!("{}: {}", error_kind(err), err)
}

fn to_js_error(err: &CompressError) -> JsValue {
    JsValue::from_str(&error_message(err))
}
