//! End-to-end multipart and signaling behavior over a real socket pair.

use std::path::PathBuf;

use mqprims::wire::{Role, Socket, SocketKind};
use mqprims::xfer::{recv, recv_into, send_copy, send_multipart, RetryPolicy};

fn test_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("mqprims-e2e-{tag}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn three_frame_message_arrives_in_order() {
    let dir = test_dir("three-frames");
    let path = dir.join("multi.sock");

    let receiver = Socket::open(SocketKind::Pull, &path, Role::Bind, &[]).unwrap();
    let sender = Socket::open(SocketKind::Push, &path, Role::Connect, &[]).unwrap();
    let policy = RetryPolicy::blocking();

    send_copy(&sender, b"a", true, &policy).unwrap();
    send_copy(&sender, b"bb", true, &policy).unwrap();
    send_copy(&sender, b"ccc", false, &policy).unwrap();

    // Frames 1 and 2 assert a pending continuation; frame 3 does not.
    let (first, _) = recv(&receiver, true, &policy).unwrap();
    assert!(receiver.has_more());
    let (second, _) = recv(&receiver, true, &policy).unwrap();
    assert!(receiver.has_more());
    let (third, _) = recv(&receiver, false, &policy).unwrap();
    assert!(!receiver.has_more());

    let mut message = Vec::new();
    message.extend_from_slice(&first);
    message.extend_from_slice(&second);
    message.extend_from_slice(&third);
    assert_eq!(message, b"abbccc");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn truncated_message_is_flagged_on_the_last_frame() {
    let dir = test_dir("truncated");
    let path = dir.join("short.sock");

    let receiver = Socket::open(SocketKind::Pull, &path, Role::Bind, &[]).unwrap();
    let sender = Socket::open(SocketKind::Push, &path, Role::Connect, &[]).unwrap();
    let policy = RetryPolicy::blocking();

    // The sender stops early: frame 2 closes the message.
    send_copy(&sender, b"head", true, &policy).unwrap();
    send_copy(&sender, b"tail", false, &policy).unwrap();

    let (_, _) = recv(&receiver, true, &policy).unwrap();
    let err = recv(&receiver, true, &policy).unwrap_err();
    assert_eq!(err.code(), mqprims::err::MISSING_FRAME);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn zero_length_pulse_synchronizes_without_payload() {
    let dir = test_dir("pulse");
    let path = dir.join("pulse.sock");

    let receiver = Socket::open(SocketKind::Pull, &path, Role::Bind, &[]).unwrap();
    let sender = Socket::open(SocketKind::Push, &path, Role::Connect, &[]).unwrap();
    let policy = RetryPolicy::blocking();

    send_copy(&sender, &[], false, &policy).unwrap();

    let mut buf = [0u8; 0];
    let (received, _) = recv_into(&receiver, &mut buf, false, &policy).unwrap();
    assert_eq!(received, 0);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn request_reply_conversation_over_one_socket_pair() {
    let dir = test_dir("reqrep");
    let path = dir.join("rpc.sock");

    let replier = Socket::open(SocketKind::Rep, &path, Role::Bind, &[]).unwrap();
    let requester = Socket::open(SocketKind::Req, &path, Role::Connect, &[]).unwrap();
    let policy = RetryPolicy::blocking();

    send_multipart(&requester, &[b"get".as_ref(), b"answer"], &policy).unwrap();

    let (request, _) = mqprims::xfer::recv_multipart(&replier, &policy).unwrap();
    assert_eq!(request.len(), 2);
    assert_eq!(request[0].as_ref(), b"get");

    send_copy(&replier, b"42", false, &policy).unwrap();
    let (reply, _) = recv(&requester, false, &policy).unwrap();
    assert_eq!(reply.as_ref(), b"42");

    let _ = std::fs::remove_dir_all(&dir);
}
