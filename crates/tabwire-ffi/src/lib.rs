//! tabwire-ffi: C-ABI exports for tabwire endpoints.
//!
//! Endpoints cross the boundary as opaque handles. Every call returns a
//! [`TwStatus`] (or a non-negative byte count), and the text of the last
//! failure on the calling thread is available from [`tw_last_error`].

mod args;
mod endpoint;
mod error;
mod types;

use std::panic::AssertUnwindSafe;

pub use endpoint::{
    tw_client_new, tw_close, tw_endpoint_free, tw_receive_bytes, tw_receive_matrix,
    tw_send_bytes, tw_send_matrix, tw_server_new,
};
pub use types::{TwEndpointHandle, TwStatus};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

/// Text of the last failure on this thread, or an empty string.
///
/// The pointer stays valid until the next tabwire call on the same thread.
#[no_mangle]
pub extern "C" fn tw_last_error() -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}

#[no_mangle]
pub extern "C" fn tw_clear_error() {
    ffi_boundary((), error::clear_error_state);
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;

    use super::*;

    #[test]
    fn last_error_returns_non_null_pointer() {
        tw_clear_error();
        let ptr = tw_last_error();
        assert!(!ptr.is_null());

        // SAFETY: tw_last_error returns a pointer to a thread-local CString.
        let text = unsafe { CStr::from_ptr(ptr).to_str().unwrap() };
        assert!(text.is_empty());
    }

    #[test]
    fn boundary_contains_panics() {
        let status = ffi_boundary(TwStatus::Internal, || -> TwStatus { panic!("boom") });
        assert_eq!(status, TwStatus::Internal);

        // SAFETY: tw_last_error returns a pointer to a thread-local CString.
        let text = unsafe { CStr::from_ptr(tw_last_error()).to_str().unwrap() };
        assert_eq!(text, "panic across FFI boundary");
    }
}
