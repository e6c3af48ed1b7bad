use std::borrow::Cow;
use std::fmt;
use std::fmt::Write as _;

use tracing::error;

use crate::GENERIC;

/// Depth sentinel for [`Error::to_string_limit`]: render every cause.
pub const ALL_CAUSES: u64 = u64::MAX;

/// A chainable error value.
///
/// An `Error` is created by any fallible operation, handed to the caller on
/// return, and released by `Drop` — recursively through its payload and its
/// cause chain. `Display` renders only the top message; use
/// [`Error::to_string_limit`] to render causes.
#[derive(Debug)]
pub struct Error {
    code: i32,
    msg: Cow<'static, str>,
    payload: Option<Payload>,
    cause: Option<Box<Error>>,
    static_def: bool,
}

/// Data attached to an error.
///
/// A closed set of payload kinds; each variant owns its contents, so cleanup
/// happens on drop with no separate destructor to carry around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Retry count attached to a retries-exhausted error.
    Retries(usize),
    /// Free-form diagnostic text.
    Text(String),
    /// Opaque diagnostic bytes.
    Bytes(Vec<u8>),
}

impl Error {
    /// Create an error with the given code and message. Never fails.
    pub fn new(code: i32, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: Cow::Owned(msg.into()),
            payload: None,
            cause: None,
            static_def: false,
        }
    }

    /// Create an error with the catch-all [`GENERIC`](crate::GENERIC) code.
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::new(GENERIC, msg)
    }

    /// Create an error from an index into a message table.
    ///
    /// The message is `"{msg}: {table[index]}"` when a table is supplied and
    /// the index is in range; otherwise the OS error string for `index` is
    /// used, which makes `from_index(errno, None, msg)` the uniform way to
    /// wrap system error codes.
    pub fn from_index(index: i32, table: Option<&[&str]>, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        let described = table.and_then(|table| {
            usize::try_from(index)
                .ok()
                .and_then(|i| table.get(i).copied())
        });
        let text = match described {
            Some(entry) => format!("{msg}: {entry}"),
            None => format!("{msg}: {}", std::io::Error::from_raw_os_error(index)),
        };
        Self {
            code: index,
            msg: Cow::Owned(text),
            payload: None,
            cause: None,
            static_def: false,
        }
    }

    /// Wrap the last OS error code with the given message.
    pub fn from_os(msg: impl Into<String>) -> Self {
        let code = std::io::Error::last_os_error()
            .raw_os_error()
            .unwrap_or(GENERIC);
        Self::from_index(code, None, msg)
    }

    /// Define an error at compile time: fixed code, fixed message, no
    /// allocation. Statically defined errors can never acquire a cause.
    pub const fn static_def(code: i32, msg: &'static str) -> Self {
        Self {
            code,
            msg: Cow::Borrowed(msg),
            payload: None,
            cause: None,
            static_def: true,
        }
    }

    /// Attach a payload.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Attach a cause.
    ///
    /// Attaching to a statically defined error, or to an error that already
    /// has a cause, is a programming error: the attempt is reported through
    /// the log side channel and the cause is dropped, leaving `self`
    /// unchanged. The process continues.
    pub fn with_cause(mut self, cause: Error) -> Self {
        if self.static_def {
            error!(
                dropped = %cause.to_string_limit(ALL_CAUSES),
                "cannot attach a cause to a statically defined error; dropping it"
            );
            return self;
        }
        if self.cause.is_some() {
            error!(
                dropped = %cause.to_string_limit(ALL_CAUSES),
                "error already has a cause; dropping the new one"
            );
            return self;
        }
        self.cause = Some(Box::new(cause));
        self
    }

    /// The error code.
    pub fn code(&self) -> i32 {
        self.code
    }

    /// The error message (top of the chain only).
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// The attached payload, if any.
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// The direct cause, if any.
    pub fn cause(&self) -> Option<&Error> {
        self.cause.as_deref()
    }

    /// True if this error was defined at compile time.
    pub fn is_static(&self) -> bool {
        self.static_def
    }

    /// Number of causes in the chain. 0 when there is no cause.
    pub fn depth(&self) -> usize {
        let mut n = 0;
        let mut cur = self.cause.as_deref();
        while let Some(err) = cur {
            n += 1;
            cur = err.cause.as_deref();
        }
        n
    }

    /// Render this error and up to `max_causes` of its causes, newest first,
    /// one per line. Pass [`ALL_CAUSES`] to render the whole chain; 0 renders
    /// only the top message.
    pub fn to_string_limit(&self, max_causes: u64) -> String {
        let mut out = String::new();
        let _ = write!(out, "{}", self.msg);
        let mut cur = self.cause.as_deref();
        let mut rendered = 0u64;
        while let Some(err) = cur {
            if rendered >= max_causes {
                break;
            }
            let _ = write!(out, "\ncaused by: {}", err.msg);
            rendered += 1;
            cur = err.cause.as_deref();
        }
        out
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.msg)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|err| err as &(dyn std::error::Error + 'static))
    }
}
