use std::os::raw::c_char;

use tabwire_endpoint::{create_client, create_server, Endpoint, DEFAULT_BIND_ADDR};

use crate::args;
use crate::error;
use crate::types::{EndpointHandle, TwEndpointHandle, TwStatus};

fn with_endpoint_mut<T>(
    handle: TwEndpointHandle,
    on_error: T,
    f: impl FnOnce(&mut Endpoint) -> T,
) -> T {
    if handle.is_null() {
        let _ = error::set_invalid_argument("endpoint handle cannot be null");
        return on_error;
    }

    let endpoint_handle = {
        // SAFETY: Pointer validity is guaranteed by the caller.
        unsafe { &mut *(handle as *mut EndpointHandle) }
    };

    f(&mut endpoint_handle.endpoint)
}

fn into_handle(endpoint: Endpoint) -> TwEndpointHandle {
    Box::into_raw(Box::new(EndpointHandle { endpoint })) as TwEndpointHandle
}

fn status(result: tabwire_endpoint::Result<()>) -> TwStatus {
    match result {
        Ok(()) => TwStatus::Ok,
        Err(err) => error::map_endpoint_error(&err),
    }
}

/// Bind `bind_addr`, wait for exactly one client, and return its endpoint.
///
/// A null `bind_addr` binds the well-known default address. Returns null
/// on failure; see `tw_last_error`.
///
/// # Safety
/// `bind_addr` must be null or a valid UTF-8, NUL-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn tw_server_new(bind_addr: *const c_char) -> TwEndpointHandle {
    crate::ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();

        let addr = {
            // SAFETY: We validate UTF-8 in helper.
            match unsafe { args::optional_str_arg(bind_addr, "bind_addr") } {
                Some(v) => v.unwrap_or(DEFAULT_BIND_ADDR),
                None => return std::ptr::null_mut(),
            }
        };

        match create_server(addr) {
            Ok(endpoint) => into_handle(endpoint),
            Err(err) => {
                let _ = error::map_endpoint_error(&err);
                std::ptr::null_mut()
            }
        }
    })
}

/// Connect to a server. A missing port means the well-known default port.
///
/// Returns null on failure; see `tw_last_error`.
///
/// # Safety
/// `server_addr` must be a non-null UTF-8, NUL-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn tw_client_new(server_addr: *const c_char) -> TwEndpointHandle {
    crate::ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();

        let addr = {
            // SAFETY: We validate null and UTF-8 in helper.
            match unsafe { args::required_str_arg(server_addr, "server_addr") } {
                Some(v) => v,
                None => return std::ptr::null_mut(),
            }
        };

        match create_client(addr) {
            Ok(endpoint) => into_handle(endpoint),
            Err(err) => {
                let _ = error::map_endpoint_error(&err);
                std::ptr::null_mut()
            }
        }
    })
}

/// Send `len` bytes as one raw frame.
///
/// # Safety
/// `endpoint` must be a live handle. If `len > 0`, `data` must be non-null
/// and readable for `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn tw_send_bytes(
    endpoint: TwEndpointHandle,
    data: *const u8,
    len: usize,
) -> TwStatus {
    crate::ffi_boundary(TwStatus::Internal, || {
        error::clear_error_state();

        let payload = {
            // SAFETY: We validate pointer/length pairing in helper.
            match unsafe { args::slice_arg(data, len, "data") } {
                Some(v) => v,
                None => return TwStatus::InvalidArgument,
            }
        };

        with_endpoint_mut(endpoint, TwStatus::InvalidArgument, |endpoint| {
            status(endpoint.send_bytes(payload))
        })
    })
}

/// Receive one raw frame into `buf`.
///
/// Returns the number of bytes written (>= 0) or a negative `TwStatus`.
/// Capacities above `INT32_MAX` are treated as `INT32_MAX`.
///
/// # Safety
/// `endpoint` must be a live handle. If `capacity > 0`, `buf` must be
/// non-null and writable for `capacity` bytes.
#[no_mangle]
pub unsafe extern "C" fn tw_receive_bytes(
    endpoint: TwEndpointHandle,
    buf: *mut u8,
    capacity: usize,
) -> i32 {
    crate::ffi_boundary(TwStatus::Internal.code(), || {
        error::clear_error_state();

        let capacity = capacity.min(i32::MAX as usize);
        let buf = {
            // SAFETY: We validate pointer/capacity pairing in helper.
            match unsafe { args::slice_mut_arg(buf, capacity, "buf") } {
                Some(v) => v,
                None => return TwStatus::InvalidArgument.code(),
            }
        };

        with_endpoint_mut(endpoint, TwStatus::InvalidArgument.code(), |endpoint| {
            match endpoint.receive_bytes(buf) {
                Ok(n) => i32::try_from(n).unwrap_or(i32::MAX),
                Err(err) => error::map_endpoint_error(&err).code(),
            }
        })
    })
}

/// Send a row-major `rows x cols` matrix as one table frame.
///
/// # Safety
/// `endpoint` must be a live handle. If `rows * cols > 0`, `values` must be
/// non-null and readable for `rows * cols` doubles.
#[no_mangle]
pub unsafe extern "C" fn tw_send_matrix(
    endpoint: TwEndpointHandle,
    values: *const f64,
    rows: u32,
    cols: u32,
) -> TwStatus {
    crate::ffi_boundary(TwStatus::Internal, || {
        error::clear_error_state();

        let count = match (rows as usize).checked_mul(cols as usize) {
            Some(count) => count,
            None => return error::set_invalid_argument("rows * cols overflows"),
        };
        let values = {
            // SAFETY: We validate pointer/length pairing in helper.
            match unsafe { args::slice_arg(values, count, "values") } {
                Some(v) => v,
                None => return TwStatus::InvalidArgument,
            }
        };

        with_endpoint_mut(endpoint, TwStatus::InvalidArgument, |endpoint| {
            status(endpoint.send_matrix(values, rows, cols))
        })
    })
}

/// Receive one table frame into `buf` and report its shape.
///
/// `capacity` counts elements, not bytes. On failure `buf`, `out_rows` and
/// `out_cols` are left untouched.
///
/// # Safety
/// `endpoint` must be a live handle. If `capacity > 0`, `buf` must be
/// non-null and writable for `capacity` doubles. `out_rows` and `out_cols`
/// must be non-null and writable.
#[no_mangle]
pub unsafe extern "C" fn tw_receive_matrix(
    endpoint: TwEndpointHandle,
    buf: *mut f64,
    capacity: usize,
    out_rows: *mut u32,
    out_cols: *mut u32,
) -> TwStatus {
    crate::ffi_boundary(TwStatus::Internal, || {
        error::clear_error_state();

        if out_rows.is_null() || out_cols.is_null() {
            return error::set_invalid_argument("out_rows and out_cols cannot be null");
        }
        let buf = {
            // SAFETY: We validate pointer/capacity pairing in helper.
            match unsafe { args::slice_mut_arg(buf, capacity, "buf") } {
                Some(v) => v,
                None => return TwStatus::InvalidArgument,
            }
        };

        with_endpoint_mut(endpoint, TwStatus::InvalidArgument, |endpoint| {
            match endpoint.receive_matrix(buf) {
                Ok((rows, cols)) => {
                    // SAFETY: Both pointers were checked for null above.
                    unsafe {
                        *out_rows = rows;
                        *out_cols = cols;
                    }
                    TwStatus::Ok
                }
                Err(err) => error::map_endpoint_error(&err),
            }
        })
    })
}

/// Release the endpoint's socket.
///
/// The handle stays allocated so later calls report `EndpointClosed`;
/// free it with `tw_endpoint_free`. The first close returns `Ok`, every
/// later close returns `EndpointClosed`.
///
/// # Safety
/// `endpoint` must be a handle returned by `tw_server_new`/`tw_client_new`
/// that has not been freed.
#[no_mangle]
pub unsafe extern "C" fn tw_close(endpoint: TwEndpointHandle) -> TwStatus {
    crate::ffi_boundary(TwStatus::Internal, || {
        error::clear_error_state();

        with_endpoint_mut(endpoint, TwStatus::InvalidArgument, |endpoint| {
            status(endpoint.close())
        })
    })
}

/// Free an endpoint handle, closing it first if still open.
///
/// # Safety
/// `endpoint` must be null or a handle returned by `tw_server_new`/`tw_client_new`
/// that has not been freed.
#[no_mangle]
pub unsafe extern "C" fn tw_endpoint_free(endpoint: TwEndpointHandle) {
    crate::ffi_boundary((), || {
        if endpoint.is_null() {
            return;
        }

        // SAFETY: Caller guarantees this handle was allocated by tw_server_new/tw_client_new.
        unsafe {
            drop(Box::from_raw(endpoint as *mut EndpointHandle));
        }
    });
}
