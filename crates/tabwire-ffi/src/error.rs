use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;

use tabwire_endpoint::EndpointError;

use crate::types::TwStatus;

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

pub(crate) fn clear_error_state() {
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::default();
    });
}

pub(crate) fn set_error_message(message: impl Into<String>) {
    let message = message.into().replace('\0', "?");
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::new(message).unwrap_or_default();
    });
}

pub(crate) fn set_invalid_argument(message: impl Into<String>) -> TwStatus {
    set_error_message(message);
    TwStatus::InvalidArgument
}

pub(crate) fn set_panic_error() {
    set_error_message("panic across FFI boundary");
}

pub(crate) fn map_endpoint_error(err: &EndpointError) -> TwStatus {
    set_error_message(err.to_string());
    status_of(err)
}

pub(crate) fn status_of(err: &EndpointError) -> TwStatus {
    match err {
        EndpointError::ConnectionFailed(_) => TwStatus::ConnectionFailed,
        EndpointError::Disconnected => TwStatus::Disconnected,
        EndpointError::Truncated { .. } => TwStatus::Truncated,
        EndpointError::LengthExceeded { .. } => TwStatus::LengthExceeded,
        EndpointError::InvalidShape { .. } => TwStatus::InvalidShape,
        EndpointError::BadKind(_) => TwStatus::BadKind,
        EndpointError::UnexpectedKind { .. } => TwStatus::UnexpectedKind,
        EndpointError::EndpointClosed => TwStatus::EndpointClosed,
        EndpointError::Io(_) => TwStatus::Io,
    }
}

pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|state| state.borrow().as_ptr())
}
