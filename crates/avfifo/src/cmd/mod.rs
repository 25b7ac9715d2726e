use std::path::PathBuf;

use avfifo_chunk::{FileBacking, MemoryChunk};
use avfifo_ring::CTRL_SIZE;
use clap::{Args, Subcommand};

use crate::exit::{chunk_error, CliResult};
use crate::output::OutputFormat;

pub mod bench;
pub mod stream;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stream synthetic frames through an in-process fifo pipe.
    Stream(StreamArgs),
    /// Measure raw fifo throughput.
    Bench(BenchArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Stream(args) => stream::run(args, format),
        Command::Bench(args) => bench::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    /// Fifo data capacity in bytes.
    #[arg(long, default_value_t = 256 * 1024)]
    pub capacity: usize,
    /// Number of frames to stream.
    #[arg(long, default_value_t = 500)]
    pub frames: u64,
    /// Payload bytes per frame.
    #[arg(long, default_value_t = 4096)]
    pub frame_size: usize,
    /// Back the fifo with a mapped file instead of heap memory.
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct BenchArgs {
    /// Fifo data capacity in bytes.
    #[arg(long, default_value_t = 64 * 1024)]
    pub capacity: usize,
    /// Number of messages to push through.
    #[arg(long, default_value_t = 100_000)]
    pub messages: u64,
    /// Payload bytes per message.
    #[arg(long, default_value_t = 1024)]
    pub message_size: usize,
    /// Back the fifo with a mapped file instead of heap memory.
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Print extended build information.
    #[arg(long)]
    pub extended: bool,
}

/// Open the shared chunk both fifo halves bind to.
pub(crate) fn open_chunk(capacity: usize, file: Option<&PathBuf>) -> CliResult<MemoryChunk> {
    let len = CTRL_SIZE + capacity;
    match file {
        Some(path) => {
            let backing =
                FileBacking::open(path, len).map_err(|err| chunk_error("open fifo file", err))?;
            Ok(MemoryChunk::new(backing))
        }
        None => Ok(MemoryChunk::heap(len)),
    }
}
