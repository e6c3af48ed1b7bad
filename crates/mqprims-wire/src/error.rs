use std::path::PathBuf;

use crate::socket::SocketKind;

/// Errors that can occur on the wire layer.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Failed to create, bind, or connect the socket.
    #[error("failed to open socket at {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to apply an endpoint option during open.
    #[error("failed to apply socket option {option}: {source}")]
    Option {
        option: &'static str,
        source: std::io::Error,
    },

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// A non-blocking attempt could not complete without suspending the
    /// caller. Not a failure; the retry layer drives on it.
    #[error("operation would block")]
    WouldBlock,

    /// A bound socket tried to send before hearing from any peer.
    #[error("no peer established yet")]
    NoPeer,

    /// The socket kind does not allow this operation.
    #[error("{kind:?} socket cannot {op}")]
    Direction { kind: SocketKind, op: &'static str },

    /// The frame header contains an invalid magic number.
    #[error("invalid frame magic (expected 0x4D 0x51 \"MQ\")")]
    InvalidMagic,

    /// The datagram is shorter than a frame header.
    #[error("datagram too short for a frame header ({len} bytes)")]
    ShortHeader { len: usize },

    /// The header-declared length disagrees with the received byte count.
    #[error("frame length mismatch (declared {declared} bytes, received {actual})")]
    LengthMismatch { declared: usize, actual: usize },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred on the socket.
    #[error("wire I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WireError>;
