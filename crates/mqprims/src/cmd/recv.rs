use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mqprims_err::RETRIES_EXHAUSTED;
use mqprims_wire::{Role, Socket, SocketKind, SocketOption};
use mqprims_xfer::{recv_multipart, RetryPolicy};

use crate::cmd::RecvArgs;
use crate::exit::{wire_error, xfer_error, CliError, CliResult, SUCCESS};
use crate::output::print_message;

pub fn run(args: RecvArgs) -> CliResult<i32> {
    let policy = RetryPolicy::new(args.retries, args.delay_ms.saturating_mul(1_000_000));
    // The blocking fallback attempt times out so the loop stays responsive
    // to ctrl-c; an exhausted budget is just an idle tick here.
    let socket = Socket::open(
        SocketKind::Pull,
        &args.path,
        Role::Bind,
        &[SocketOption::RecvTimeout(Duration::from_millis(500))],
    )
    .map_err(|err| wire_error("bind failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        let (parts, _completion) = match recv_multipart(&socket, &policy) {
            Ok(message) => message,
            Err(err) if err.code() == RETRIES_EXHAUSTED => continue,
            Err(err) => return Err(xfer_error("receive failed", err)),
        };

        print_message(&parts);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                return Ok(SUCCESS);
            }
        }
    }

    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
