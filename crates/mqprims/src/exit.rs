use std::fmt;
use std::io;

use mqprims_err::{ALL_CAUSES, MISSING_FRAME, PROTOCOL_STATE, RETRIES_EXHAUSTED};
use mqprims_wire::WireError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn wire_error(context: &str, err: WireError) -> CliError {
    match err {
        WireError::Open { source, .. } | WireError::Io(source) => io_error(context, source),
        WireError::Option { source, .. } => io_error(context, source),
        WireError::PathTooLong { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        WireError::WouldBlock => CliError::new(TIMEOUT, format!("{context}: {err}")),
        WireError::Direction { .. } | WireError::NoPeer => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn xfer_error(context: &str, err: mqprims_err::Error) -> CliError {
    let code = match err.code() {
        RETRIES_EXHAUSTED => TIMEOUT,
        PROTOCOL_STATE => USAGE,
        MISSING_FRAME => DATA_INVALID,
        mqprims_err::GENERIC => INTERNAL,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {}", err.to_string_limit(ALL_CAUSES)))
}
