//! Deferred output core for statically ID'd trace records.
//!
//! Application code emits compact records (14-bit ID, optional stamp, binary
//! payload) into a buffer; this crate walks, encodes, frames and fans them out
//! to byte-oriented output channels without blocking the caller.
//!
//! # Crate Structure
//!
//! - [`transport`]: Per-channel non-blocking transmitters and port trait
//! - [`frame`]: Header codec, record walker, encode pipeline, buffers
//! - [`route`]: Channels, router, deferred output driver, config, health report

/// Re-export transport types.
pub mod transport {
    pub use trice_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use trice_frame::*;
}

/// Re-export routing types.
pub mod route {
    pub use trice_route::*;
}
