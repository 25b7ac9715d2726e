use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use avfifo_pipe::{
    AudioConfig, FrameData, FrameEvent, FrameSource, ProviderHost, StreamerProxy, VideoConfig,
};
use avfifo_ring::{FifoConsumer, FifoProducer};
use bytes::Bytes;
use tracing::info;

use crate::cmd::{open_chunk, StreamArgs};
use crate::exit::{pipe_error, ring_error, CliError, CliResult, INTERNAL, SUCCESS, TIMEOUT};
use crate::output::{print_stream_summary, OutputFormat, StreamSummary};

const PUMP_TIMEOUT: Duration = Duration::from_secs(10);
const FRAME_INTERVAL_MICROS: i64 = 33_333;

/// Generates a config-led synthetic stream, ending with an end-of-stream
/// marker frame.
struct SyntheticSource {
    remaining: u64,
    frame_size: usize,
    next_pts: i64,
    finished: Arc<AtomicBool>,
}

impl FrameSource for SyntheticSource {
    fn poll_frame(&mut self) -> Option<FrameEvent> {
        if self.finished.load(Ordering::Relaxed) {
            return None;
        }
        if self.remaining == 0 {
            self.finished.store(true, Ordering::Relaxed);
            return Some(FrameEvent::frame(FrameData::end_of_stream()));
        }

        let first = self.next_pts == 0;
        self.remaining -= 1;
        let frame = FrameData {
            pts_micros: self.next_pts,
            key_frame: first,
            end_of_stream: false,
            data: Bytes::from(vec![(self.next_pts / FRAME_INTERVAL_MICROS) as u8; self.frame_size]),
        };
        self.next_pts += FRAME_INTERVAL_MICROS;

        let mut event = FrameEvent::frame(frame);
        if first {
            event.audio_config = Some(AudioConfig {
                codec: 1,
                sample_rate: 48_000,
                channels: 2,
                extra_data: Bytes::new(),
            });
            event.video_config = Some(VideoConfig {
                codec: 1,
                width: 1920,
                height: 1080,
                extra_data: Bytes::new(),
            });
        }
        Some(event)
    }
}

pub fn run(args: StreamArgs, format: OutputFormat) -> CliResult<i32> {
    let chunk = open_chunk(args.capacity, args.file.as_ref())?;
    let producer =
        FifoProducer::new(chunk.clone(), true).map_err(|err| ring_error("create fifo", err))?;
    let consumer =
        FifoConsumer::new(chunk, false).map_err(|err| ring_error("bind fifo", err))?;

    let (write_tx, write_rx) = mpsc::sync_channel(1);
    let (read_tx, read_rx) = mpsc::sync_channel(1);

    let finished = Arc::new(AtomicBool::new(false));
    let source = SyntheticSource {
        remaining: args.frames,
        frame_size: args.frame_size,
        next_pts: 0,
        finished: Arc::clone(&finished),
    };
    let streamer = StreamerProxy::new(producer, source);
    streamer.observe_write_activity(Arc::new(write_tx));

    let host = ProviderHost::new(consumer);
    host.observe_read_activity(Arc::new(read_tx));

    info!(
        capacity = args.capacity,
        frames = args.frames,
        frame_size = args.frame_size,
        "streaming"
    );
    let started = Instant::now();

    let producer_thread = thread::spawn(move || stream_all(streamer, finished, read_rx));
    let summary = consume_all(host, args.capacity, write_rx, started);

    let produced = producer_thread
        .join()
        .map_err(|_| CliError::new(INTERNAL, "producer thread panicked"))?;
    produced?;
    let summary = summary?;

    print_stream_summary(&summary, format);
    Ok(SUCCESS)
}

fn stream_all<S: FrameSource>(
    mut streamer: StreamerProxy<S>,
    finished: Arc<AtomicBool>,
    read_rx: mpsc::Receiver<()>,
) -> CliResult<()> {
    loop {
        streamer
            .pump()
            .map_err(|err| pipe_error("stream frames", err))?;
        if finished.load(Ordering::Relaxed) && !streamer.has_pending() {
            return Ok(());
        }
        if read_rx.recv_timeout(PUMP_TIMEOUT).is_err() {
            return Err(CliError::new(TIMEOUT, "consumer stalled"));
        }
    }
}

fn consume_all(
    mut host: ProviderHost,
    capacity: usize,
    write_rx: mpsc::Receiver<()>,
    started: Instant,
) -> CliResult<StreamSummary> {
    let mut summary = StreamSummary {
        capacity,
        frames_delivered: 0,
        bytes_delivered: 0,
        audio_config_seen: false,
        video_config_seen: false,
        elapsed_ms: 0.0,
    };
    let (frame_tx, frame_rx) = mpsc::channel();

    loop {
        let tx = frame_tx.clone();
        host.read(move |delivered| {
            let _ = tx.send(delivered);
        });
        while host.has_pending_read() {
            if write_rx.recv_timeout(PUMP_TIMEOUT).is_err() {
                return Err(CliError::new(TIMEOUT, "producer stalled"));
            }
            host.on_write_activity();
        }
        let delivered = frame_rx
            .recv()
            .map_err(|_| CliError::new(INTERNAL, "read callback dropped"))?;

        summary.audio_config_seen |= delivered.audio_config.is_some();
        summary.video_config_seen |= delivered.video_config.is_some();
        if delivered.frame.end_of_stream {
            break;
        }
        summary.frames_delivered += 1;
        summary.bytes_delivered += delivered.frame.data.len() as u64;
    }

    summary.elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    info!(
        frames = summary.frames_delivered,
        bytes = summary.bytes_delivered,
        "stream complete"
    );
    Ok(summary)
}
