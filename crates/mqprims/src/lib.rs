//! Reliable messaging over unreliable transports.
//!
//! mqprims turns a raw "send/receive one frame, maybe would-block" datagram
//! primitive into bounded-retry, optionally zero-copy, multipart-aware
//! messaging, with a chainable error-value model threaded through every
//! failure path.
//!
//! # Crate Structure
//!
//! - [`err`] — chainable, causally linked error values
//! - [`wire`] — socket lifecycle and single-frame transfer
//! - [`xfer`] — retry engine and reliable send/receive operations

/// Re-export error types.
pub mod err {
    pub use mqprims_err::*;
}

/// Re-export wire types.
pub mod wire {
    pub use mqprims_wire::*;
}

/// Re-export reliable transfer operations.
pub mod xfer {
    pub use mqprims_xfer::*;
}
