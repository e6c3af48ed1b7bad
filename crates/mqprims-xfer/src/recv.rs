use bytes::Bytes;
use tracing::error;

use mqprims_err::{Error, MISSING_FRAME};
use mqprims_wire::{Frame, Socket};

use crate::retry::{run, Completion, RetryPolicy};

/// Receive one frame, allocating the payload.
///
/// With `check_continuity`, the socket must still announce a pending
/// continuation after the read, or the operation fails with
/// [`MISSING_FRAME`]: the multipart message is truncated and the caller
/// must treat the whole logical message as corrupt.
pub fn recv(
    socket: &Socket,
    check_continuity: bool,
    policy: &RetryPolicy,
) -> Result<(Bytes, Completion), Error> {
    let (frame, completion) = recv_frame(socket, policy)?;
    check_more(socket, check_continuity)?;
    Ok((frame.payload, completion))
}

/// Receive one frame into a caller-supplied buffer.
///
/// Returns the received length, which may be smaller than the buffer: only
/// the prefix up to that length is written, the rest keeps its previous
/// contents. A zero-length frame into an empty buffer is the documented
/// "signal" no-op. A frame *larger* than the buffer is a fatal integrity
/// violation — the process logs and aborts rather than write past
/// caller-owned memory.
pub fn recv_into(
    socket: &Socket,
    buf: &mut [u8],
    check_continuity: bool,
    policy: &RetryPolicy,
) -> Result<(usize, Completion), Error> {
    let (frame, completion) = recv_frame(socket, policy)?;
    let received = frame.payload.len();
    if received > buf.len() {
        fatal_overflow(buf.len(), received);
    }
    buf[..received].copy_from_slice(&frame.payload);
    check_more(socket, check_continuity)?;
    Ok((received, completion))
}

/// Receive one string frame. Convenience over [`recv`]; invalid UTF-8 is a
/// generic error.
pub fn recv_str(
    socket: &Socket,
    check_continuity: bool,
    policy: &RetryPolicy,
) -> Result<(String, Completion), Error> {
    let (payload, completion) = recv(socket, check_continuity, policy)?;
    let text = String::from_utf8(payload.to_vec())
        .map_err(|err| Error::generic(format!("received text is not valid UTF-8: {err}")))?;
    Ok((text, completion))
}

/// Receive a whole multipart message, draining frames while the socket
/// announces continuations. The message length is not known in advance;
/// the last frame is the first one without the continuation flag.
pub fn recv_multipart(
    socket: &Socket,
    policy: &RetryPolicy,
) -> Result<(Vec<Bytes>, Completion), Error> {
    let (first, mut total) = recv(socket, false, policy)?;
    let mut parts = vec![first];
    while socket.has_more() {
        let (part, completion) = recv(socket, false, policy)?;
        total = total.merge(completion);
        parts.push(part);
    }
    Ok((parts, total))
}

fn recv_frame(socket: &Socket, policy: &RetryPolicy) -> Result<(Frame, Completion), Error> {
    run(policy, |block| socket.recv_frame(block))
}

fn check_more(socket: &Socket, check_continuity: bool) -> Result<(), Error> {
    if check_continuity && !socket.has_more() {
        return Err(Error::new(
            MISSING_FRAME,
            "multipart message truncated: expected another frame, none pending",
        ));
    }
    Ok(())
}

fn fatal_overflow(expected: usize, received: usize) -> ! {
    error!(
        expected,
        received, "received frame exceeds the caller's buffer; aborting"
    );
    eprintln!(
        "fatal: received frame of {received} bytes exceeds the caller's {expected}-byte buffer"
    );
    std::process::abort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    use crate::send::{send_copy, send_multipart};
    use mqprims_wire::{Role, SocketKind};

    fn test_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mqprims-recv-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn pair(dir: &std::path::Path) -> (Socket, Socket) {
        let path = dir.join("pair.sock");
        let server = Socket::open(SocketKind::Pair, &path, Role::Bind, &[]).unwrap();
        let client = Socket::open(SocketKind::Pair, &path, Role::Connect, &[]).unwrap();
        (server, client)
    }

    #[test]
    fn recv_returns_payload_and_completion() {
        let dir = test_dir("basic");
        let (server, client) = pair(&dir);

        send_copy(&client, b"payload", false, &RetryPolicy::blocking()).unwrap();
        let (payload, completion) = recv(&server, false, &RetryPolicy::blocking()).unwrap();

        assert_eq!(payload.as_ref(), b"payload");
        assert_eq!(completion, Completion::Fast { retries: 0 });

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn continuity_violation_is_missing_frame() {
        let dir = test_dir("truncated");
        let (server, client) = pair(&dir);

        // Final frame of a message, but the receiver expected a continuation.
        send_copy(&client, b"lonely", false, &RetryPolicy::blocking()).unwrap();
        let err = recv(&server, true, &RetryPolicy::blocking()).unwrap_err();

        assert_eq!(err.code(), MISSING_FRAME);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn continuity_holds_when_more_frames_pend() {
        let dir = test_dir("pending");
        let (server, client) = pair(&dir);

        send_copy(&client, b"first", true, &RetryPolicy::blocking()).unwrap();
        send_copy(&client, b"second", false, &RetryPolicy::blocking()).unwrap();

        let (payload, _) = recv(&server, true, &RetryPolicy::blocking()).unwrap();
        assert_eq!(payload.as_ref(), b"first");
        let (payload, _) = recv(&server, false, &RetryPolicy::blocking()).unwrap();
        assert_eq!(payload.as_ref(), b"second");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn recv_into_fills_only_the_prefix() {
        let dir = test_dir("prefix");
        let (server, client) = pair(&dir);

        send_copy(&client, b"abc", false, &RetryPolicy::blocking()).unwrap();

        let mut buf = [0xEEu8; 8];
        let (n, _) = recv_into(&server, &mut buf, false, &RetryPolicy::blocking()).unwrap();

        assert_eq!(n, 3);
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(&buf[3..], &[0xEE; 5]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn zero_length_signal_leaves_buffer_untouched() {
        let dir = test_dir("signal");
        let (server, client) = pair(&dir);

        send_copy(&client, b"", false, &RetryPolicy::blocking()).unwrap();

        let mut buf = [0u8; 0];
        let (n, _) = recv_into(&server, &mut buf, false, &RetryPolicy::blocking()).unwrap();
        assert_eq!(n, 0);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn recv_str_decodes_utf8() {
        let dir = test_dir("str");
        let (server, client) = pair(&dir);

        send_copy(&client, "héllo".as_bytes(), false, &RetryPolicy::blocking()).unwrap();
        let (text, _) = recv_str(&server, false, &RetryPolicy::blocking()).unwrap();
        assert_eq!(text, "héllo");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn recv_str_rejects_invalid_utf8() {
        let dir = test_dir("badutf8");
        let (server, client) = pair(&dir);

        send_copy(&client, &[0xFF, 0xFE], false, &RetryPolicy::blocking()).unwrap();
        let err = recv_str(&server, false, &RetryPolicy::blocking()).unwrap_err();
        assert_eq!(err.code(), mqprims_err::GENERIC);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn recv_multipart_drains_the_message() {
        let dir = test_dir("multipart");
        let (server, client) = pair(&dir);

        send_multipart(&client, &[b"a".as_ref(), b"bb", b"ccc"], &RetryPolicy::blocking())
            .unwrap();

        let (parts, completion) = recv_multipart(&server, &RetryPolicy::blocking()).unwrap();
        let collected: Vec<&[u8]> = parts.iter().map(|p| p.as_ref()).collect();
        assert_eq!(collected, vec![b"a".as_ref(), b"bb", b"ccc"]);
        assert!(!completion.fell_back());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn retrying_recv_waits_out_a_slow_sender() {
        let dir = test_dir("slow-sender");
        let path = dir.join("slow.sock");
        let server = Socket::open(SocketKind::Pair, &path, Role::Bind, &[]).unwrap();

        let sender = std::thread::spawn({
            let path = path.clone();
            move || {
                std::thread::sleep(Duration::from_millis(20));
                let client = Socket::open(SocketKind::Pair, &path, Role::Connect, &[]).unwrap();
                send_copy(&client, b"late", false, &RetryPolicy::blocking()).unwrap();
            }
        });

        // 5 ms probes, generous budget: the frame lands a few sleeps in.
        let policy = RetryPolicy::new(100, 5_000_000);
        let (payload, completion) = recv(&server, false, &policy).unwrap();

        assert_eq!(payload.as_ref(), b"late");
        assert!(completion.retries() >= 1);
        assert!(!completion.fell_back());

        sender.join().unwrap();
        let _ = std::fs::remove_dir_all(&dir);
    }
}
