use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use avfifo_message::{align_up, MessageType, MessageWriter, HEADER_SIZE};
use avfifo_ring::{FifoConsumer, FifoProducer};
use tracing::info;

use crate::cmd::{open_chunk, BenchArgs};
use crate::exit::{ring_error, CliError, CliResult, INTERNAL, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_bench_summary, BenchSummary, OutputFormat};

const PUMP_TIMEOUT: Duration = Duration::from_secs(10);

pub fn run(args: BenchArgs, format: OutputFormat) -> CliResult<i32> {
    let chunk = open_chunk(args.capacity, args.file.as_ref())?;
    let mut producer =
        FifoProducer::new(chunk.clone(), true).map_err(|err| ring_error("create fifo", err))?;
    let mut consumer =
        FifoConsumer::new(chunk, false).map_err(|err| ring_error("bind fifo", err))?;

    let total = align_up(HEADER_SIZE + args.message_size);
    if total > producer.max_message_size() {
        return Err(CliError::new(
            USAGE,
            format!(
                "message footprint {total} exceeds the {}-byte limit of a {}-byte fifo",
                producer.max_message_size(),
                args.capacity
            ),
        ));
    }

    let (write_tx, write_rx) = mpsc::sync_channel(1);
    let (read_tx, read_rx) = mpsc::sync_channel(1);
    producer.observe_write_activity(Arc::new(write_tx));
    consumer.observe_read_activity(Arc::new(read_tx));

    info!(
        capacity = args.capacity,
        messages = args.messages,
        message_size = args.message_size,
        "benchmark started"
    );
    let started = Instant::now();

    let messages = args.messages;
    let message_size = args.message_size;
    let producer_thread = thread::spawn(move || {
        let payload = vec![0xa5u8; message_size];
        for _ in 0..messages {
            loop {
                match MessageWriter::create(MessageType::Frame, &mut producer, payload.len()) {
                    Some(mut writer) => {
                        writer.write(&payload);
                        break;
                    }
                    None => {
                        if read_rx.recv_timeout(PUMP_TIMEOUT).is_err() {
                            return Err(CliError::new(TIMEOUT, "consumer stalled"));
                        }
                    }
                }
            }
        }
        Ok(())
    });

    let mut received = 0u64;
    let mut bytes = 0u64;
    while received < messages {
        match consumer.pop().map_err(|err| ring_error("pop message", err))? {
            Some(reader) => {
                bytes += reader.content_size() as u64;
                received += 1;
            }
            None => {
                if write_rx.recv_timeout(PUMP_TIMEOUT).is_err() {
                    return Err(CliError::new(TIMEOUT, "producer stalled"));
                }
            }
        }
    }

    producer_thread
        .join()
        .map_err(|_| CliError::new(INTERNAL, "producer thread panicked"))??;

    let elapsed = started.elapsed();
    let secs = elapsed.as_secs_f64().max(f64::EPSILON);
    let summary = BenchSummary {
        capacity: args.capacity,
        messages: received,
        message_size: args.message_size,
        elapsed_ms: secs * 1000.0,
        msgs_per_sec: received as f64 / secs,
        mb_per_sec: bytes as f64 / (1024.0 * 1024.0) / secs,
    };
    info!(msgs_per_sec = summary.msgs_per_sec as u64, "benchmark complete");

    print_bench_summary(&summary, format);
    Ok(SUCCESS)
}
