use std::ffi::c_void;

use tabwire_endpoint::Endpoint;

/// Status returned by every fallible call. Zero is success; failures are
/// negative so a byte count and a failure can share one return value.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwStatus {
    Ok = 0,
    ConnectionFailed = -1,
    Disconnected = -2,
    Truncated = -3,
    LengthExceeded = -4,
    InvalidShape = -5,
    BadKind = -6,
    EndpointClosed = -7,
    UnexpectedKind = -8,
    Io = -9,
    InvalidArgument = -10,
    Internal = -99,
}

impl TwStatus {
    pub fn code(self) -> i32 {
        self as i32
    }
}

pub type TwEndpointHandle = *mut c_void;

pub(crate) struct EndpointHandle {
    pub(crate) endpoint: Endpoint,
}
