//! Reliable send and receive over a wire socket.
//!
//! Every operation here wraps a single-frame transfer primitive in a bounded
//! retry loop: try without blocking, sleep on a would-block, and after the
//! budget is spent fall back to one fully blocking attempt. Success reports
//! how the operation completed — [`Completion::Fast`] for the non-blocking
//! path, [`Completion::Fallback`] when the blocking attempt carried it —
//! so callers can tune their retry parameters without treating a degraded
//! success as a failure.
//!
//! Receives can ask for a multipart continuity check: after each frame, the
//! socket must still announce a pending continuation or the operation fails
//! with [`mqprims_err::MISSING_FRAME`] and the whole logical message is
//! corrupt.

mod convert;
pub mod recv;
pub mod retry;
pub mod send;

pub use recv::{recv, recv_into, recv_multipart, recv_str};
pub use retry::{next_state, run, Completion, RetryEvent, RetryPolicy, RetryState};
pub use send::{send_copy, send_handoff, send_multipart, send_str, Reclaim};
