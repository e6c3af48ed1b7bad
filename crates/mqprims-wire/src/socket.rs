use std::cell::Cell;
use std::io::ErrorKind;
use std::net::Shutdown;
use std::os::fd::AsRawFd;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::BytesMut;
use tracing::{debug, info};

use crate::codec::{decode_frame, encode_header, Frame, DEFAULT_MAX_PAYLOAD, HEADER_SIZE};
use crate::error::{Result, WireError};

/// What the endpoint is for. Kinds carry directionality only; delivery
/// topology belongs to the transport underneath.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketKind {
    /// Bidirectional, one peer.
    Pair,
    /// Send-only pipeline end.
    Push,
    /// Receive-only pipeline end.
    Pull,
    /// Send-only broadcast end.
    Pub,
    /// Receive-only broadcast end.
    Sub,
    /// Request side of a request/reply conversation.
    Req,
    /// Reply side of a request/reply conversation.
    Rep,
}

impl SocketKind {
    /// True if this kind may send frames.
    pub fn can_send(self) -> bool {
        !matches!(self, SocketKind::Pull | SocketKind::Sub)
    }

    /// True if this kind may receive frames.
    pub fn can_recv(self) -> bool {
        !matches!(self, SocketKind::Push | SocketKind::Pub)
    }
}

/// Whether `open` binds the address or connects to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Bind,
    Connect,
}

/// Endpoint options, applied in order during [`Socket::open`] before the
/// socket is handed to the caller. Any failure aborts the open and the
/// partially created socket is released on the way out.
#[derive(Debug, Clone)]
pub enum SocketOption {
    /// Timeout for blocking receives. Expiry surfaces as a would-block.
    RecvTimeout(Duration),
    /// Timeout for blocking sends. Expiry surfaces as a would-block.
    SendTimeout(Duration),
    /// Kernel receive buffer size (SO_RCVBUF).
    RecvBuffer(usize),
    /// Kernel send buffer size (SO_SNDBUF).
    SendBuffer(usize),
    /// Maximum accepted frame payload size. Default: 64 KiB.
    MaxFrame(usize),
}

impl SocketOption {
    fn name(&self) -> &'static str {
        match self {
            SocketOption::RecvTimeout(_) => "recv-timeout",
            SocketOption::SendTimeout(_) => "send-timeout",
            SocketOption::RecvBuffer(_) => "recv-buffer",
            SocketOption::SendBuffer(_) => "send-buffer",
            SocketOption::MaxFrame(_) => "max-frame",
        }
    }
}

static RETURN_SEQ: AtomicU64 = AtomicU64::new(0);

/// An endpoint bound to one kind, one address, and its options.
///
/// One frame in, one frame out; the retry machinery lives a layer up.
/// Not safe for concurrent use from multiple threads — the underlying
/// transport allows one logical conversation per socket at a time, and this
/// layer performs no internal locking.
pub struct Socket {
    io: UnixDatagram,
    kind: SocketKind,
    local: PathBuf,
    local_inode: (u64, u64),
    peer_locked: Cell<bool>,
    rcvmore: Cell<bool>,
    nonblocking: Cell<bool>,
    max_payload: Cell<usize>,
}

impl Socket {
    /// Default permission mode for created socket paths.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;
    /// Maximum socket path length.
    /// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Open an endpoint: create the socket, apply each option, then bind or
    /// connect per `role`.
    ///
    /// A connecting socket also binds an automatically generated return path
    /// next to the target so the bound side can answer it. A bound socket
    /// locks onto the first peer it hears from; the kernel filters everyone
    /// else from then on.
    pub fn open(
        kind: SocketKind,
        path: impl AsRef<Path>,
        role: Role,
        options: &[SocketOption],
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        Self::validate_path_len(&path)?;

        let socket = match role {
            Role::Bind => {
                remove_stale_socket(&path)?;
                let io = UnixDatagram::bind(&path).map_err(|e| WireError::Open {
                    path: path.clone(),
                    source: e,
                })?;
                let local_inode = match harden_path(&path) {
                    Ok(inode) => inode,
                    Err(err) => {
                        let _ = std::fs::remove_file(&path);
                        return Err(err);
                    }
                };
                info!(?path, ?kind, "bound message socket");
                Self::from_parts(io, kind, path, local_inode, false)
            }
            Role::Connect => {
                let local = return_path(&path);
                Self::validate_path_len(&local)?;
                let io = UnixDatagram::bind(&local).map_err(|e| WireError::Open {
                    path: local.clone(),
                    source: e,
                })?;
                let connected = harden_path(&local).and_then(|inode| {
                    io.connect(&path).map_err(|e| WireError::Open {
                        path: path.clone(),
                        source: e,
                    })?;
                    Ok(inode)
                });
                let local_inode = match connected {
                    Ok(inode) => inode,
                    Err(err) => {
                        let _ = std::fs::remove_file(&local);
                        return Err(err);
                    }
                };
                debug!(?path, ?kind, "connected message socket");
                Self::from_parts(io, kind, local, local_inode, true)
            }
        };

        for option in options {
            socket.apply(option)?;
        }

        Ok(socket)
    }

    fn from_parts(
        io: UnixDatagram,
        kind: SocketKind,
        local: PathBuf,
        local_inode: (u64, u64),
        peer_locked: bool,
    ) -> Self {
        Self {
            io,
            kind,
            local,
            local_inode,
            peer_locked: Cell::new(peer_locked),
            rcvmore: Cell::new(false),
            nonblocking: Cell::new(false),
            max_payload: Cell::new(DEFAULT_MAX_PAYLOAD),
        }
    }

    fn validate_path_len(path: &Path) -> Result<()> {
        let len = path.as_os_str().len();
        if len >= Self::MAX_PATH_LEN {
            return Err(WireError::PathTooLong {
                path: path.to_path_buf(),
                len,
                max: Self::MAX_PATH_LEN,
            });
        }
        Ok(())
    }

    fn apply(&self, option: &SocketOption) -> Result<()> {
        let applied = match option {
            SocketOption::RecvTimeout(timeout) => self.io.set_read_timeout(Some(*timeout)),
            SocketOption::SendTimeout(timeout) => self.io.set_write_timeout(Some(*timeout)),
            SocketOption::RecvBuffer(size) => {
                set_buffer_size(self.io.as_raw_fd(), libc::SO_RCVBUF, *size)
            }
            SocketOption::SendBuffer(size) => {
                set_buffer_size(self.io.as_raw_fd(), libc::SO_SNDBUF, *size)
            }
            SocketOption::MaxFrame(size) => {
                if *size > u32::MAX as usize {
                    Err(std::io::Error::new(
                        ErrorKind::InvalidInput,
                        "max frame size exceeds the u32 length field",
                    ))
                } else {
                    self.max_payload.set(*size);
                    Ok(())
                }
            }
        };
        applied.map_err(|source| WireError::Option {
            option: option.name(),
            source,
        })
    }

    /// Send one frame, `more` marking a multipart continuation.
    ///
    /// The payload is handed to the kernel through a vectored write; this
    /// layer never stages it through an intermediate buffer. When `block` is
    /// false a full peer buffer surfaces as [`WireError::WouldBlock`].
    pub fn send_frame(&self, payload: &[u8], more: bool, block: bool) -> Result<()> {
        if !self.kind.can_send() {
            return Err(WireError::Direction {
                kind: self.kind,
                op: "send",
            });
        }
        let max = self.max_payload.get();
        if payload.len() > max {
            return Err(WireError::PayloadTooLarge {
                size: payload.len(),
                max,
            });
        }
        if !self.peer_locked.get() {
            return Err(WireError::NoPeer);
        }

        self.set_mode(block)?;
        let header = encode_header(payload.len(), more);
        self.sendmsg(&header, payload)
    }

    /// Receive one frame. When `block` is false an empty queue surfaces as
    /// [`WireError::WouldBlock`]. Zero-length payloads are valid signal
    /// frames.
    pub fn recv_frame(&self, block: bool) -> Result<Frame> {
        if !self.kind.can_recv() {
            return Err(WireError::Direction {
                kind: self.kind,
                op: "receive",
            });
        }

        self.set_mode(block)?;
        loop {
            let mut buf = BytesMut::zeroed(HEADER_SIZE + self.max_payload.get());
            let received = if self.peer_locked.get() {
                self.io.recv(&mut buf)
            } else {
                self.io.recv_from(&mut buf).map(|(n, addr)| {
                    if let Some(peer) = addr.as_pathname() {
                        if self.io.connect(peer).is_ok() {
                            self.peer_locked.set(true);
                            debug!(?peer, "locked conversation to first peer");
                        }
                    }
                    n
                })
            };

            match received {
                Ok(n) => {
                    buf.truncate(n);
                    let frame = decode_frame(&mut buf, self.max_payload.get())?;
                    self.rcvmore.set(frame.more);
                    return Ok(frame);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
                {
                    return Err(WireError::WouldBlock)
                }
                Err(err) => return Err(WireError::Io(err)),
            }
        }
    }

    /// True iff the last received frame announced a following frame of the
    /// same multipart message.
    pub fn has_more(&self) -> bool {
        self.rcvmore.get()
    }

    /// The socket kind.
    pub fn kind(&self) -> SocketKind {
        self.kind
    }

    /// The local path this socket is bound to.
    pub fn local_path(&self) -> &Path {
        &self.local
    }

    /// The configured maximum frame payload size.
    pub fn max_payload(&self) -> usize {
        self.max_payload.get()
    }

    /// Close the endpoint. Terminal: further operations are refused by the
    /// kernel, and the bound path is released when the handle drops.
    pub fn close(self) -> Result<()> {
        match self.io.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(WireError::Io(err)),
        }
    }

    fn set_mode(&self, block: bool) -> Result<()> {
        let nonblocking = !block;
        if self.nonblocking.get() != nonblocking {
            self.io.set_nonblocking(nonblocking).map_err(WireError::Io)?;
            self.nonblocking.set(nonblocking);
        }
        Ok(())
    }

    fn sendmsg(&self, header: &[u8], payload: &[u8]) -> Result<()> {
        #[cfg(target_os = "linux")]
        const SEND_FLAGS: libc::c_int = libc::MSG_NOSIGNAL;
        #[cfg(not(target_os = "linux"))]
        const SEND_FLAGS: libc::c_int = 0;

        let iov = [
            libc::iovec {
                iov_base: header.as_ptr() as *mut libc::c_void,
                iov_len: header.len(),
            },
            libc::iovec {
                iov_base: payload.as_ptr() as *mut libc::c_void,
                iov_len: payload.len(),
            },
        ];
        // SAFETY: zeroed msghdr is a valid "no name, no control data" value.
        let mut msg: libc::msghdr = unsafe { std::mem::zeroed() };
        msg.msg_iov = iov.as_ptr() as *mut libc::iovec;
        msg.msg_iovlen = iov.len() as _;

        loop {
            // SAFETY: the iovecs point into slices that outlive the call,
            // and the fd is an open socket owned by this process.
            let rc = unsafe { libc::sendmsg(self.io.as_raw_fd(), &msg, SEND_FLAGS) };
            if rc >= 0 {
                return Ok(());
            }
            let err = std::io::Error::last_os_error();
            match err.kind() {
                ErrorKind::Interrupted => continue,
                ErrorKind::WouldBlock | ErrorKind::TimedOut => return Err(WireError::WouldBlock),
                _ => return Err(WireError::Io(err)),
            }
        }
    }
}

impl std::fmt::Debug for Socket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Socket")
            .field("kind", &self.kind)
            .field("local", &self.local)
            .field("peer_locked", &self.peer_locked.get())
            .finish()
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        let (expected_dev, expected_ino) = self.local_inode;
        if let Ok(metadata) = std::fs::symlink_metadata(&self.local) {
            if metadata.file_type().is_socket()
                && metadata.dev() == expected_dev
                && metadata.ino() == expected_ino
            {
                debug!(path = ?self.local, "removing socket path");
                let _ = std::fs::remove_file(&self.local);
            } else {
                debug!(
                    path = ?self.local,
                    "socket path identity changed; skipping cleanup"
                );
            }
        }
    }
}

/// Remove a stale socket file at `path`, but never a non-socket file.
fn remove_stale_socket(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let metadata = std::fs::symlink_metadata(path).map_err(|e| WireError::Open {
        path: path.to_path_buf(),
        source: e,
    })?;
    if metadata.file_type().is_socket() {
        debug!(?path, "removing stale socket");
        std::fs::remove_file(path).map_err(|e| WireError::Open {
            path: path.to_path_buf(),
            source: e,
        })
    } else {
        Err(WireError::Open {
            path: path.to_path_buf(),
            source: std::io::Error::new(
                ErrorKind::AlreadyExists,
                "existing path is not a unix socket",
            ),
        })
    }
}

/// Restrict permissions on a freshly bound path and record its identity for
/// the cleanup-on-drop check.
fn harden_path(path: &Path) -> Result<(u64, u64)> {
    std::fs::set_permissions(
        path,
        std::fs::Permissions::from_mode(Socket::DEFAULT_SOCKET_MODE),
    )
    .map_err(|e| WireError::Open {
        path: path.to_path_buf(),
        source: e,
    })?;
    let metadata = std::fs::symlink_metadata(path).map_err(|e| WireError::Open {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok((metadata.dev(), metadata.ino()))
}

/// Unique return address for a connecting socket, next to its target.
fn return_path(target: &Path) -> PathBuf {
    let seq = RETURN_SEQ.fetch_add(1, Ordering::Relaxed);
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.{}.peer", std::process::id(), seq));
    target.with_file_name(name)
}

fn set_buffer_size(fd: std::os::fd::RawFd, option: libc::c_int, size: usize) -> std::io::Result<()> {
    let value: libc::c_int = size
        .try_into()
        .map_err(|_| std::io::Error::new(ErrorKind::InvalidInput, "buffer size out of range"))?;
    // SAFETY: `fd` is an open socket owned by this process and `value` is a
    // valid c_int of the size the option expects.
    let rc = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            option,
            (&value as *const libc::c_int).cast::<libc::c_void>(),
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}
