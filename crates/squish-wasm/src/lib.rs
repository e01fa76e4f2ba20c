//! Squish WASM - WebAssembly bindings for Squish
//!
//! This crate exposes the squish-core re-encoder to JavaScript/TypeScript so a
//! browser can shrink uploads before sending them.
//!
//! # Module Structure
//!
//! - `compress` - The compression entry point and small helpers around it
//! - `types` - WASM-compatible wrapper for the compressed result
//! - `logging` - Console logger for the core crate's `tracing` events
//!
//! # Usage
//!
//! ```typescript
//! import init, { compress_image, init_logging } from '@squish/wasm';
//!
//! await init();
//! init_logging('info');
//!
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const result = compress_image(bytes, file.type, undefined);
//! console.log(`${result.width}x${result.height}, ${result.byteSize} bytes`);
//! ```

use wasm_bindgen::prelude::*;

mod compress;
mod logging;
mod types;

pub use compress::{compress_image, default_config, has_transparency, target_dimensions};
pub use logging::{init_logging, ConsoleMakeWriter, ConsoleWriter};
pub use types::JsEncodedResult;

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    // Logging stays off until the host calls `init_logging`
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
