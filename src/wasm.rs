//! WASM bindings for texmark
//!
//! This module provides JavaScript-accessible functions for LaTeX to Markdown conversion.

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

#[cfg(feature = "wasm")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "wasm")]
use crate::core::latex2md::{transpile_with_diagnostics, TranspileOptions};

/// Conversion result with additional metadata
#[cfg(feature = "wasm")]
#[derive(Serialize, Deserialize)]
pub struct ConvertResult {
    /// The converted output
    pub output: String,
    /// Whether the conversion was successful
    pub success: bool,
    /// Error message if conversion failed
    pub error: Option<String>,
    /// Warnings during conversion
    pub warnings: Vec<String>,
}

#[cfg(feature = "wasm")]
impl ConvertResult {
    fn failure(error: String) -> Self {
        ConvertResult {
            output: String::new(),
            success: false,
            error: Some(error),
            warnings: vec![],
        }
    }
}

/// Safely serialize a value to JsValue, returning an error object on failure.
#[cfg(feature = "wasm")]
fn to_js_value<T: Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or_else(|e| {
        let error_obj = ConvertResult::failure(format!("Serialization error: {}", e));
        serde_wasm_bindgen::to_value(&error_obj).unwrap_or(JsValue::NULL)
    })
}

/// Initialize panic hook for better error messages in browser console
#[cfg(feature = "wasm")]
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Convert LaTeX to Markdown
///
/// # Arguments
/// * `input` - LaTeX document or fragment
/// * `preview` - emit the short one-line forms
#[cfg(feature = "wasm")]
#[wasm_bindgen(js_name = "transpile")]
pub fn transpile_wasm(input: &str, preview: bool) -> String {
    crate::transpile(input, preview)
}

/// Convert LaTeX to Markdown with options
///
/// `options` is a plain object with the `TranspileOptions` fields; missing fields
/// take their defaults. Returns `{output, warnings, success, error}`.
#[cfg(feature = "wasm")]
#[wasm_bindgen(js_name = "transpileWithOptions")]
pub fn transpile_with_options_wasm(input: &str, options: JsValue) -> JsValue {
    let opts: TranspileOptions = if options.is_undefined() || options.is_null() {
        TranspileOptions::default()
    } else {
        match serde_wasm_bindgen::from_value(options) {
            Ok(opts) => opts,
            Err(e) => {
                return to_js_value(&ConvertResult::failure(format!("Invalid options: {}", e)))
            }
        }
    };
    if let Err(e) = opts.validate() {
        return to_js_value(&ConvertResult::failure(e.to_string()));
    }

    let result = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        transpile_with_diagnostics(input, &opts)
    })) {
        Ok(result) => ConvertResult {
            warnings: result.format_warnings(),
            output: result.output,
            success: true,
            error: None,
        },
        Err(e) => {
            // Try to extract panic message for better error reporting
            let error_msg = if let Some(s) = e.downcast_ref::<&str>() {
                format!("Conversion failed: {}", s)
            } else if let Some(s) = e.downcast_ref::<String>() {
                format!("Conversion failed: {}", s)
            } else {
                "Conversion failed: unknown error (check browser console for details)".to_string()
            };
            ConvertResult::failure(error_msg)
        }
    };

    to_js_value(&result)
}

/// Get version information
#[cfg(feature = "wasm")]
#[wasm_bindgen(js_name = "getVersion")]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
