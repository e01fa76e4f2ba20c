//! WASM-compatible wrapper types for compression results.

use squish_core::EncodedResult;
use wasm_bindgen::prelude::*;

/// A compressed image handed back to JavaScript.
///
/// The encoded bytes live in WASM memory until `bytes()` copies them out as
/// a `Uint8Array`, ready to wrap in a `Blob` with `mimeType`.
#[wasm_bindgen]
pub struct JsEncodedResult {
    inner: EncodedResult,
}

#[wasm_bindgen]
impl JsEncodedResult {
    /// Encoded image bytes (copied into a `Uint8Array`)
    pub fn bytes(&self) -> Vec<u8> {
        self.inner.bytes.clone()
    }

    /// MIME type of the encoded bytes, e.g. `image/jpeg`
    #[wasm_bindgen(getter, js_name = mimeType)]
    pub fn mime_type(&self) -> String {
        self.inner.format.mime_type().to_string()
    }

    /// File extension without the dot
    #[wasm_bindgen(getter)]
    pub fn extension(&self) -> String {
        self.inner.format.extension().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.inner.height
    }

    /// Size of the encoded bytes. Always at most the configured budget.
    #[wasm_bindgen(getter, js_name = byteSize)]
    pub fn byte_size(&self) -> f64 {
        self.inner.byte_size as f64
    }

    /// Quality the image was encoded at, in `(0, 1]`
    #[wasm_bindgen(getter)]
    pub fn quality(&self) -> f32 {
        self.inner.quality
    }
}

impl From<EncodedResult> for JsEncodedResult {
    fn from(inner: EncodedResult) -> Self {
        Self { inner }
    }
}
