//! Point-to-point transport for byte buffers and f64 matrices.
//!
//! Two processes connect over TCP and exchange self-describing frames:
//! opaque byte payloads and dense row-major `f64` matrices. Every call is
//! blocking and every frame arrives whole.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP listener/connector and the owned stream handle
//! - [`frame`]: Kind-tagged little-endian framing, blocking reader/writer loops
//! - [`endpoint`]: Single-connection endpoints over TCP or in-process
//!   (behind `endpoint` feature)
//!
//! The `async` feature adds `frame::TabwireCodec` for `tokio_util` framed
//! streams. The C ABI lives in the separate `tabwire-ffi` crate.

/// Re-export transport types.
pub mod transport {
    pub use tabwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use tabwire_frame::*;
}

/// Re-export endpoint types (requires `endpoint` feature).
#[cfg(feature = "endpoint")]
pub mod endpoint {
    pub use tabwire_endpoint::*;
}

#[cfg(feature = "endpoint")]
pub use tabwire_endpoint::{
    create_client, create_memory_pair, create_server, Endpoint, EndpointError,
};
pub use tabwire_frame::{Frame, FrameKind, Table};
