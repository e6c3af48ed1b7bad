use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;

pub mod pulse;
pub mod recv;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send one message (optionally multipart).
    Send(SendArgs),
    /// Bind and print received messages.
    Recv(RecvArgs),
    /// Send a zero-length signal frame.
    Pulse(PulseArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args),
        Command::Recv(args) => recv::run(args),
        Command::Pulse(args) => pulse::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["file", "part"])]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "part"])]
    pub file: Option<PathBuf>,
    /// Multipart frame (repeatable; frames are sent in order).
    #[arg(long = "part", conflicts_with_all = ["data", "file"])]
    pub part: Vec<String>,
    /// Non-blocking retries before degrading to a blocking send.
    #[arg(long, default_value = "8")]
    pub retries: usize,
    /// Delay between retries in milliseconds.
    #[arg(long, default_value = "1")]
    pub delay_ms: u64,
}

#[derive(Args, Debug)]
pub struct RecvArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Non-blocking retries before degrading to a blocking receive.
    #[arg(long, default_value = "8")]
    pub retries: usize,
    /// Delay between retries in milliseconds.
    #[arg(long, default_value = "1")]
    pub delay_ms: u64,
}

#[derive(Args, Debug)]
pub struct PulseArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
