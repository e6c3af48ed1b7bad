//! Datagram socket lifecycle and single-frame transfer.
//!
//! One frame is one Unix datagram: the kernel preserves message boundaries,
//! so no stream reassembly is needed. Every datagram carries a small header:
//! - A 2-byte magic number ("MQ") guarding against stray senders
//! - A 4-byte little-endian payload length
//! - A 1-byte flags field whose low bit marks "more frames follow"
//!
//! The flags bit is what makes multipart messages work: a receiver asks the
//! socket whether the frame it just read announced a continuation via
//! [`Socket::has_more`].
//!
//! This crate is deliberately synchronous. Non-blocking operation is a
//! per-call choice; a refused attempt surfaces as [`WireError::WouldBlock`]
//! and the retry policy on top of it lives in `mqprims-xfer`.

pub mod codec;
pub mod error;
pub mod socket;

pub use codec::{decode_frame, encode_frame, encode_header, Frame, DEFAULT_MAX_PAYLOAD, HEADER_SIZE, MAGIC};
pub use error::{Result, WireError};
pub use socket::{Role, Socket, SocketKind, SocketOption};
