use mqprims_wire::{Role, Socket, SocketKind};
use mqprims_xfer::{send_copy, RetryPolicy};

use crate::cmd::PulseArgs;
use crate::exit::{wire_error, xfer_error, CliResult, SUCCESS};

/// A pulse is a zero-length frame: pure synchronization, no payload.
pub fn run(args: PulseArgs) -> CliResult<i32> {
    let socket = Socket::open(SocketKind::Push, &args.path, Role::Connect, &[])
        .map_err(|err| wire_error("connect failed", err))?;

    send_copy(&socket, &[], false, &RetryPolicy::blocking())
        .map_err(|err| xfer_error("pulse failed", err))?;

    socket
        .close()
        .map_err(|err| wire_error("close failed", err))?;
    Ok(SUCCESS)
}
