use mqprims_err::{Error, PROTOCOL_STATE};
use mqprims_wire::WireError;

/// Map a wire-layer error into a chainable error value.
///
/// OS-level failures keep their errno as the code via the uniform wrapping
/// path; protocol misuse gets the stable protocol-state code; everything
/// else is generic.
pub(crate) fn wire_to_error(err: WireError) -> Error {
    match err {
        WireError::Direction { .. } | WireError::NoPeer => {
            Error::new(PROTOCOL_STATE, err.to_string())
        }
        WireError::Io(io) => match io.raw_os_error() {
            Some(code) => Error::from_index(code, None, "transport I/O failed"),
            None => Error::generic(format!("transport I/O failed: {io}")),
        },
        other => Error::generic(other.to_string()),
    }
}
