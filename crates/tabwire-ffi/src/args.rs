use std::ffi::CStr;
use std::os::raw::c_char;

use crate::error;

/// Convert an optional C string argument into UTF-8 `&str`.
///
/// Returns `Some(None)` for a null pointer and `None` after recording an
/// invalid-argument error.
///
/// # Safety
/// `value` must be null or point to a valid NUL-terminated C string.
pub(crate) unsafe fn optional_str_arg<'a>(
    value: *const c_char,
    name: &str,
) -> Option<Option<&'a str>> {
    if value.is_null() {
        return Some(None);
    }

    let as_cstr = {
        // SAFETY: The caller guarantees `value` points to a valid NUL-terminated C string.
        unsafe { CStr::from_ptr(value) }
    };

    match as_cstr.to_str() {
        Ok(v) => Some(Some(v)),
        Err(_) => {
            let _ = error::set_invalid_argument(format!("{name} must be valid UTF-8"));
            None
        }
    }
}

/// Convert a required C string argument into UTF-8 `&str`.
///
/// # Safety
/// `value` must be null or point to a valid NUL-terminated C string.
pub(crate) unsafe fn required_str_arg<'a>(value: *const c_char, name: &str) -> Option<&'a str> {
    // SAFETY: Forwarded caller contract.
    match unsafe { optional_str_arg(value, name) }? {
        Some(v) => Some(v),
        None => {
            let _ = error::set_invalid_argument(format!("{name} cannot be null"));
            None
        }
    }
}

/// Convert a pointer + element count into a slice.
///
/// # Safety
/// If `len > 0`, `data` must be non-null, aligned and readable for `len` elements.
pub(crate) unsafe fn slice_arg<'a, T>(data: *const T, len: usize, name: &str) -> Option<&'a [T]> {
    if len == 0 {
        return Some(&[]);
    }
    if data.is_null() {
        let _ = error::set_invalid_argument(format!("{name} cannot be null when len > 0"));
        return None;
    }

    // SAFETY: Pointer and length are validated above and owned by caller for the call duration.
    Some(unsafe { std::slice::from_raw_parts(data, len) })
}

/// Convert a pointer + capacity into a writable slice.
///
/// # Safety
/// If `capacity > 0`, `data` must be non-null, aligned and writable for
/// `capacity` elements, and not aliased for the call duration.
pub(crate) unsafe fn slice_mut_arg<'a, T>(
    data: *mut T,
    capacity: usize,
    name: &str,
) -> Option<&'a mut [T]> {
    if capacity == 0 {
        return Some(&mut []);
    }
    if data.is_null() {
        let _ = error::set_invalid_argument(format!("{name} cannot be null when capacity > 0"));
        return None;
    }

    // SAFETY: Pointer and capacity are validated above and owned by caller for the call duration.
    Some(unsafe { std::slice::from_raw_parts_mut(data, capacity) })
}
