use std::fmt;

use bytes::Bytes;

use mqprims_err::Error;
use mqprims_wire::Socket;

use crate::retry::{run, Completion, RetryPolicy};

/// Release capability for a zero-copy send.
///
/// Owns the closure invoked exactly once with the buffer when the transfer
/// layer no longer needs it — whether the send succeeded or failed. Move
/// semantics make double invocation unrepresentable.
pub struct Reclaim {
    hook: Option<Box<dyn FnOnce(Bytes) + Send>>,
}

impl Reclaim {
    /// Run `hook` with the buffer once the transfer layer is done with it.
    pub fn new(hook: impl FnOnce(Bytes) + Send + 'static) -> Self {
        Self {
            hook: Some(Box::new(hook)),
        }
    }

    /// Drop the buffer once the transfer layer is done with it.
    pub fn discard() -> Self {
        Self { hook: None }
    }

    fn release(self, buf: Bytes) {
        if let Some(hook) = self.hook {
            hook(buf);
        }
    }
}

impl fmt::Debug for Reclaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reclaim")
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

/// Send one frame, duplicating nothing the caller keeps: the payload is
/// borrowed for the duration of the call and untouched afterward.
pub fn send_copy(
    socket: &Socket,
    payload: &[u8],
    more: bool,
    policy: &RetryPolicy,
) -> Result<Completion, Error> {
    run(policy, |block| socket.send_frame(payload, more, block)).map(|((), completion)| completion)
}

/// Send one frame, taking ownership of the buffer.
///
/// The buffer must not be touched by the caller after this call — the move
/// enforces that. `reclaim` is invoked exactly once when the transfer layer
/// is done with the buffer, on success and on failure alike.
pub fn send_handoff(
    socket: &Socket,
    payload: Bytes,
    more: bool,
    policy: &RetryPolicy,
    reclaim: Reclaim,
) -> Result<Completion, Error> {
    let result =
        run(policy, |block| socket.send_frame(&payload, more, block)).map(|((), c)| c);
    reclaim.release(payload);
    result
}

/// Send a string frame. Convenience over [`send_copy`].
pub fn send_str(
    socket: &Socket,
    text: &str,
    more: bool,
    policy: &RetryPolicy,
) -> Result<Completion, Error> {
    send_copy(socket, text.as_bytes(), more, policy)
}

/// Send a sequence of frames as one multipart message: every frame but the
/// last carries the continuation flag. An empty sequence is a no-op.
pub fn send_multipart<P: AsRef<[u8]>>(
    socket: &Socket,
    parts: &[P],
    policy: &RetryPolicy,
) -> Result<Completion, Error> {
    let mut total = Completion::Fast { retries: 0 };
    for (index, part) in parts.iter().enumerate() {
        let more = index + 1 < parts.len();
        let completion = send_copy(socket, part.as_ref(), more, policy)?;
        total = total.merge(completion);
    }
    Ok(total)
}
