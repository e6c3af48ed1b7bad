//! Chainable, causally linked error values.
//!
//! Every fallible operation in mqprims returns an [`Error`] value instead of
//! panicking. Errors carry an integer code, a message, an optional payload,
//! and an optional *cause* — a single predecessor error, forming a singly
//! linked causal chain. Straight-line "accumulate then return" code uses
//! [`chain`] to collapse several results into one:
//!
//! ```
//! use mqprims_err::{chain, Error, Outcome};
//!
//! fn step_one() -> Outcome { Ok(()) }
//! fn step_two() -> Outcome { Err(Error::generic("step two failed")) }
//!
//! let mut out: Outcome = Ok(());
//! chain(&mut out, step_one());
//! chain(&mut out, step_two());
//! assert!(out.is_err());
//! ```
//!
//! Success is the `Ok(())` arm of [`Outcome`]; there is no sentinel value to
//! compare against — match on the result instead.

mod chain;
mod error;

pub use chain::{chain, Outcome};
pub use error::{Error, Payload, ALL_CAUSES};

/// The fast-path retry budget ran out and the blocking fallback also failed.
/// The retry count travels in [`Payload::Retries`].
pub const RETRIES_EXHAUSTED: i32 = 1;

/// A protocol-state violation, such as sending on a receive-only socket.
pub const PROTOCOL_STATE: i32 = 2;

/// A multipart message was truncated: a continuation frame was expected but
/// none is pending.
pub const MISSING_FRAME: i32 = 3;

/// Catch-all code for unclassified failures.
pub const GENERIC: i32 = 32203;
