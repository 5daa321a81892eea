//! C FFI exports for the Android JNI shim and .NET P/Invoke.
//!
//! These functions provide a C-compatible interface for the synchronous parts
//! of the core. All functions use JSON strings for input/output to simplify
//! marshalling.

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use crate::credential_matcher::canonicalize;
use crate::field_classifier::classify_json;
use crate::generator::{generate_password, GeneratorOptions};

/// Borrow a C string as UTF-8, or `None` for null / invalid input.
unsafe fn read_input<'a>(input: *const c_char) -> Option<&'a str> {
    if input.is_null() {
        return None;
    }
    CStr::from_ptr(input).to_str().ok()
}

/// Canonicalize a URL or host to its registrable domain.
///
/// # Safety
///
/// - `raw` must be null or a valid null-terminated C string
/// - The returned pointer must be freed by calling `free_string`
///
/// # Returns
///
/// A null-terminated C string with the domain, or null when there is none.
#[no_mangle]
pub unsafe extern "C" fn canonicalize_domain_ffi(raw: *const c_char) -> *mut c_char {
    match canonicalize(read_input(raw)) {
        Some(domain) => string_to_c_char(domain),
        None => ptr::null_mut(),
    }
}

/// Classify the fields of one screen.
///
/// # Safety
///
/// - `input_json` must be a valid null-terminated C string (ClassifyInput)
/// - The returned pointer must be freed by calling `free_string`
///
/// # Returns
///
/// A null-terminated C string containing the JSON result (ClassificationResult).
/// Returns null on error.
#[no_mangle]
pub unsafe extern "C" fn classify_fields_ffi(input_json: *const c_char) -> *mut c_char {
    let Some(input) = read_input(input_json) else {
        return ptr::null_mut();
    };

    match classify_json(input) {
        Ok(json) => string_to_c_char(json),
        Err(e) => create_error_response(&format!("Failed to classify: {}", e)),
    }
}

/// Generate a random password.
///
/// # Safety
///
/// - `options_json` must be null (defaults) or a valid null-terminated C string (GeneratorOptions)
/// - The returned pointer must be freed by calling `free_string`
///
/// # Returns
///
/// A null-terminated C string containing `{"password", "strength", "entropyBits"}`.
#[no_mangle]
pub unsafe extern "C" fn generate_password_ffi(options_json: *const c_char) -> *mut c_char {
    let options: GeneratorOptions = if options_json.is_null() {
        GeneratorOptions::default()
    } else {
        let Some(input) = read_input(options_json) else {
            return ptr::null_mut();
        };
        match serde_json::from_str(input) {
            Ok(o) => o,
            Err(e) => {
                return create_error_response(&format!("Failed to parse input: {}", e));
            }
        }
    };

    let generated = match generate_password(&options) {
        Ok(g) => g,
        Err(e) => {
            return create_error_response(&format!("Generation failed: {}", e));
        }
    };

    let output = serde_json::json!({
        "password": generated.password.as_str(),
        "strength": generated.strength,
        "entropyBits": generated.entropy_bits,
    });
    string_to_c_char(output.to_string())
}

/// Free a string that was allocated by Rust.
///
/// # Safety
///
/// - `s` must be a pointer that was returned by one of the FFI functions
/// - This function must only be called once per pointer
/// - After calling this function, the pointer is invalid
#[no_mangle]
pub unsafe extern "C" fn free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Convert a Rust string to a C string pointer.
fn string_to_c_char(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(c_string) => c_string.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Create an error response JSON string.
fn create_error_response(message: &str) -> *mut c_char {
    let error_json = serde_json::json!({ "success": false, "error": message });
    string_to_c_char(error_json.to_string())
}
