use std::fs;

use tracing::warn;

use mqprims_wire::{Role, Socket, SocketKind};
use mqprims_xfer::{send_copy, send_multipart, RetryPolicy};

use crate::cmd::SendArgs;
use crate::exit::{wire_error, xfer_error, CliResult, SUCCESS};

pub fn run(args: SendArgs) -> CliResult<i32> {
    let policy = RetryPolicy::new(args.retries, args.delay_ms.saturating_mul(1_000_000));
    let socket = Socket::open(SocketKind::Push, &args.path, Role::Connect, &[])
        .map_err(|err| wire_error("connect failed", err))?;

    let parts = resolve_parts(&args)?;
    let completion = if parts.len() == 1 {
        send_copy(&socket, &parts[0], false, &policy)
    } else {
        send_multipart(&socket, &parts, &policy)
    }
    .map_err(|err| xfer_error("send failed", err))?;

    if completion.fell_back() {
        warn!(
            retries = completion.retries(),
            "send degraded to a blocking attempt; consider a larger retry budget"
        );
    }

    socket
        .close()
        .map_err(|err| wire_error("close failed", err))?;
    Ok(SUCCESS)
}

fn resolve_parts(args: &SendArgs) -> CliResult<Vec<Vec<u8>>> {
    if !args.part.is_empty() {
        return Ok(args.part.iter().map(|p| p.as_bytes().to_vec()).collect());
    }
    if let Some(data) = &args.data {
        return Ok(vec![data.as_bytes().to_vec()]);
    }
    if let Some(path) = &args.file {
        let bytes = fs::read(path).map_err(|err| {
            crate::exit::io_error(&format!("failed reading {}", path.display()), err)
        })?;
        return Ok(vec![bytes]);
    }
    Ok(vec![Vec::new()])
}
