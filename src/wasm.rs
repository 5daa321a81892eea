//! WASM bindings for the browser extension.

use wasm_bindgen::prelude::*;

use crate::field_classifier::{classify, ClassificationResult, ClassifyInput};
use crate::generator::{generate_password, GeneratorOptions};

/// Initialize panic hook for better error messages.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Domain WASM Bindings
// ═══════════════════════════════════════════════════════════════════════════════

/// Canonicalize a URL or host to its registrable domain.
///
/// E.g., "https://www.example.co.uk/login" -> "example.co.uk"
#[wasm_bindgen(js_name = canonicalizeDomain)]
pub fn canonicalize_domain_js(raw: Option<String>) -> Option<String> {
    crate::credential_matcher::canonicalize(raw.as_deref())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Field Classifier WASM Bindings
// ═══════════════════════════════════════════════════════════════════════════════

/// Classify the fields of one page.
///
/// Takes a JsValue (ClassifyInput) and returns a JsValue (ClassificationResult).
#[wasm_bindgen(js_name = classifyFields)]
pub fn classify_fields_js(input: JsValue) -> Result<JsValue, JsValue> {
    let input: ClassifyInput = serde_wasm_bindgen::from_value(input)
        .map_err(|e| JsValue::from_str(&format!("Failed to parse input: {}", e)))?;

    let output: ClassificationResult = classify(&input.screen, input.site_domain.as_deref());

    serde_wasm_bindgen::to_value(&output)
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize output: {}", e)))
}

/// Classify fields using JSON strings (alternative API).
///
/// Takes a JSON string and returns a JSON string.
#[wasm_bindgen(js_name = classifyFieldsJson)]
pub fn classify_fields_json_js(input_json: &str) -> Result<String, JsValue> {
    crate::field_classifier::classify_json(input_json).map_err(|e| JsValue::from_str(&e))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Password Generator WASM Bindings
// ═══════════════════════════════════════════════════════════════════════════════

/// Generate a random password.
///
/// Takes a JsValue (GeneratorOptions, `undefined` for defaults) and returns
/// `{ password, strength, entropyBits }`.
#[wasm_bindgen(js_name = generatePassword)]
pub fn generate_password_js(options: JsValue) -> Result<JsValue, JsValue> {
    let options: GeneratorOptions = if options.is_undefined() || options.is_null() {
        GeneratorOptions::default()
    } else {
        serde_wasm_bindgen::from_value(options)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse input: {}", e)))?
    };

    let generated = generate_password(&options)
        .map_err(|e| JsValue::from_str(&format!("Generation failed: {}", e)))?;

    let output = serde_json::json!({
        "password": generated.password.as_str(),
        "strength": generated.strength,
        "entropyBits": generated.entropy_bits,
    });
    serde_wasm_bindgen::to_value(&output)
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize output: {}", e)))
}
