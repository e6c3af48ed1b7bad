use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, WireError};

/// Frame header: magic (2) + length (4) + flags (1) = 7 bytes.
pub const HEADER_SIZE: usize = 7;

/// Magic bytes: "MQ" (0x4D 0x51).
pub const MAGIC: [u8; 2] = [0x4D, 0x51];

/// Flags bit: another frame of the same multipart message follows.
pub const FLAG_MORE: u8 = 0b0000_0001;

/// Default maximum payload size: 64 KiB, comfortably inside the default
/// Unix datagram buffer sizes.
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024;

/// One frame: an opaque byte buffer plus the multipart continuation flag.
#[derive(Debug, Clone)]
pub struct Frame {
    /// The frame payload. May be empty (a "signal" frame).
    pub payload: Bytes,
    /// True if the sender announced a following frame.
    pub more: bool,
}

impl Frame {
    /// Create a new frame.
    pub fn new(payload: impl Into<Bytes>, more: bool) -> Self {
        Self {
            payload: payload.into(),
            more,
        }
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Build the header for a payload of `len` bytes.
///
/// Wire format of a datagram:
/// ```text
/// ┌──────────────┬───────────┬───────────┬─────────────────┐
/// │ Magic (2B)   │ Length    │ Flags     │ Payload          │
/// │ 0x4D 0x51    │ (4B LE)   │ (1B)      │ (Length bytes)   │
/// │ "MQ"         │           │ bit0=MORE │                  │
/// └──────────────┴───────────┴───────────┴─────────────────┘
/// ```
pub fn encode_header(len: usize, more: bool) -> [u8; HEADER_SIZE] {
    let mut header = [0u8; HEADER_SIZE];
    header[..2].copy_from_slice(&MAGIC);
    header[2..6].copy_from_slice(&(len as u32).to_le_bytes());
    header[6] = if more { FLAG_MORE } else { 0 };
    header
}

/// Encode a complete frame datagram into `dst`.
pub fn encode_frame(payload: &[u8], more: bool, dst: &mut BytesMut) -> Result<()> {
    if payload.len() > u32::MAX as usize {
        return Err(WireError::PayloadTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&encode_header(payload.len(), more));
    dst.put_slice(payload);
    Ok(())
}

/// Decode one received datagram into a frame, consuming `src`.
///
/// A datagram is exactly one frame; anything left over, missing, or
/// mislabeled is an error, not a partial read.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Frame> {
    if src.len() < HEADER_SIZE {
        return Err(WireError::ShortHeader { len: src.len() });
    }
    if src[0..2] != MAGIC {
        return Err(WireError::InvalidMagic);
    }

    let declared = u32::from_le_bytes(src[2..6].try_into().unwrap()) as usize;
    let more = src[6] & FLAG_MORE != 0;

    if declared > max_payload {
        return Err(WireError::PayloadTooLarge {
            size: declared,
            max: max_payload,
        });
    }

    let actual = src.len() - HEADER_SIZE;
    if declared != actual {
        return Err(WireError::LengthMismatch { declared, actual });
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(declared).freeze();

    Ok(Frame { payload, more })
}
