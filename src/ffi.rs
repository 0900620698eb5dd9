//! C ABI for hosts that link the converter as a shared library
//!
//! `ncm_convert_file` returns null on success or an owned message that must be
//! released with `ncm_free_string`.

use std::ffi::{CStr, CString, c_char};
use std::panic;
use std::ptr;

use crate::bridge;

fn into_c_message(message: String) -> *mut c_char {
    if message.is_empty() {
        return ptr::null_mut();
    }
    CString::new(message.replace('\0', " "))
        .unwrap_or_default()
        .into_raw()
}

/// # Safety
///
/// `input_path` must be null or a valid NUL-terminated string; the same holds
/// for `output_dir`. A non-null return value must be passed to
/// [`ncm_free_string`] exactly once.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ncm_convert_file(
    input_path: *const c_char,
    output_dir: *const c_char,
) -> *mut c_char {
    if input_path.is_null() {
        return into_c_message("read failed: input path is null".to_string());
    }

    // SAFETY: caller guarantees both pointers are null or valid C strings
    let input = unsafe { CStr::from_ptr(input_path) }
        .to_string_lossy()
        .into_owned();
    let output = if output_dir.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(output_dir) }
            .to_string_lossy()
            .into_owned()
    };

    let message = panic::catch_unwind(|| bridge::convert_file(&input, &output))
        .unwrap_or_else(|_| "conversion failed: converter panicked".to_string());
    into_c_message(message)
}

/// # Safety
///
/// `message` must be null or a pointer returned by [`ncm_convert_file`] that
/// has not been freed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ncm_free_string(message: *mut c_char) {
    if !message.is_null() {
        // SAFETY: pointer came from CString::into_raw in this module
        drop(unsafe { CString::from_raw(message) });
    }
}
