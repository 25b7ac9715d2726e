//! Streamer-to-provider behavior over an in-process heap ring.

use std::sync::{Arc, Mutex};

use avfifo_chunk::MemoryChunk;
use avfifo_message::{MessageType, MessageWriter, HEADER_SIZE};
use avfifo_pipe::{
    AudioConfig, DeliveredFrame, FrameData, FrameEvent, PipeError, ProviderHost, ScriptedSource,
    StreamerProxy, VideoConfig,
};
use avfifo_ring::{FifoConsumer, FifoProducer, CTRL_SIZE};
use bytes::Bytes;

fn pipe(
    data_len: usize,
    events: Vec<FrameEvent>,
) -> (StreamerProxy<ScriptedSource>, ProviderHost) {
    let chunk = MemoryChunk::heap(CTRL_SIZE + data_len);
    let producer = FifoProducer::new(chunk.clone(), true).unwrap();
    let consumer = FifoConsumer::new(chunk, false).unwrap();
    (
        StreamerProxy::new(producer, ScriptedSource::new(events)),
        ProviderHost::new(consumer),
    )
}

fn frame(pts: i64, len: usize) -> FrameData {
    FrameData {
        pts_micros: pts,
        key_frame: pts == 0,
        end_of_stream: false,
        data: Bytes::from(vec![pts as u8; len]),
    }
}

fn audio_config() -> AudioConfig {
    AudioConfig {
        codec: 1,
        sample_rate: 48_000,
        channels: 2,
        extra_data: Bytes::from_static(&[0xde, 0xad]),
    }
}

fn video_config() -> VideoConfig {
    VideoConfig {
        codec: 2,
        width: 1280,
        height: 720,
        extra_data: Bytes::new(),
    }
}

fn collect(received: &Arc<Mutex<Vec<DeliveredFrame>>>) -> impl FnOnce(DeliveredFrame) + Send {
    let received = Arc::clone(received);
    move |delivered| received.lock().unwrap().push(delivered)
}

#[test]
fn configs_attach_to_the_next_frame_only() {
    let mut first = FrameEvent::frame(frame(0, 64));
    first.audio_config = Some(audio_config());
    first.video_config = Some(video_config());
    let (mut streamer, mut provider) =
        pipe(4096, vec![first, FrameEvent::frame(frame(33_000, 64))]);

    streamer.pump().unwrap();

    let received = Arc::new(Mutex::new(Vec::new()));
    provider.read(collect(&received));
    provider.read(collect(&received));

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 2);
    assert_eq!(received[0].audio_config, Some(audio_config()));
    assert_eq!(received[0].video_config, Some(video_config()));
    assert_eq!(received[0].frame, frame(0, 64));
    assert!(received[1].audio_config.is_none());
    assert!(received[1].video_config.is_none());
    assert_eq!(received[1].frame, frame(33_000, 64));
}

#[test]
fn pending_read_completes_on_write_activity() {
    let (mut streamer, mut provider) = pipe(1024, vec![FrameEvent::frame(frame(0, 32))]);

    let received = Arc::new(Mutex::new(Vec::new()));
    provider.read(collect(&received));
    assert!(provider.has_pending_read());
    assert!(received.lock().unwrap().is_empty());

    streamer.pump().unwrap();
    provider.on_write_activity();

    assert!(!provider.has_pending_read());
    assert_eq!(received.lock().unwrap().len(), 1);
}

#[test]
fn full_fifo_defers_whole_batches() {
    // 512 bytes hold only a couple of 200-byte frames at a time.
    let events: Vec<_> = (0..20)
        .map(|i| FrameEvent::frame(frame(i, 200)))
        .collect();
    let (mut streamer, mut provider) = pipe(512, events);

    streamer.pump().unwrap();
    assert!(streamer.has_pending());

    let received = Arc::new(Mutex::new(Vec::new()));
    for _ in 0..20 {
        provider.read(collect(&received));
        // Reads free space; the streamer resumes on that notification.
        streamer.on_read_activity().unwrap();
        provider.on_write_activity();
    }

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 20);
    for (i, delivered) in received.iter().enumerate() {
        assert_eq!(delivered.frame.pts_micros, i as i64);
    }
    assert!(!streamer.has_pending());
}

#[test]
fn impossible_frame_surfaces_an_error() {
    let (mut streamer, _provider) = pipe(256, vec![FrameEvent::frame(frame(0, 1024))]);
    match streamer.pump() {
        Err(PipeError::FrameTooLarge { capacity: 256, .. }) => {}
        other => panic!("expected FrameTooLarge, got {other:?}"),
    }
}

#[test]
fn revoked_backing_stops_the_stream() {
    let chunk = MemoryChunk::heap(CTRL_SIZE + 1024);
    let producer = FifoProducer::new(chunk.clone(), true).unwrap();
    let _consumer = FifoConsumer::new(chunk.clone(), false).unwrap();
    let mut streamer = StreamerProxy::new(
        producer,
        ScriptedSource::new(vec![FrameEvent::frame(frame(0, 64))]),
    );

    // Space checks still pass after revocation, so the failure must surface
    // from the write itself rather than vanish with the message.
    chunk.revoke();
    match streamer.pump() {
        Err(PipeError::BackingRevoked) => {}
        other => panic!("expected BackingRevoked, got {other:?}"),
    }
}

#[test]
#[should_panic(expected = "previous read is still pending")]
fn concurrent_reads_panic() {
    let (_streamer, mut provider) = pipe(1024, Vec::new());
    provider.read(|_| {});
    provider.read(|_| {});
}

#[test]
#[should_panic(expected = "protocol violation")]
fn unknown_message_type_aborts() {
    let chunk = MemoryChunk::heap(CTRL_SIZE + 1024);
    let mut producer = FifoProducer::new(chunk.clone(), true).unwrap();
    let consumer = FifoConsumer::new(chunk, false).unwrap();

    // Frame a syntactically valid message with a type outside the known set.
    {
        let reservation = producer.reserve(16).unwrap();
        let mut raw = [0u8; HEADER_SIZE];
        raw[0..4].copy_from_slice(&16u32.to_le_bytes());
        raw[4..8].copy_from_slice(&99u32.to_le_bytes());
        assert!(reservation.chunk.write_at(0, &raw));
    }

    let mut provider = ProviderHost::new(consumer);
    provider.read(|_| {});
}

#[test]
fn stop_and_flush_clears_cached_configs() {
    let chunk = MemoryChunk::heap(CTRL_SIZE + 1024);
    let mut producer = FifoProducer::new(chunk.clone(), true).unwrap();
    let consumer = FifoConsumer::new(chunk, false).unwrap();
    let mut provider = ProviderHost::new(consumer);

    let config = audio_config();
    {
        let mut writer =
            MessageWriter::create(MessageType::AudioConfig, &mut producer, 32).unwrap();
        assert!(config.marshal(&mut writer));
    }

    // The read drains and caches the config; no frame has arrived, so the
    // read itself stays pending.
    let received = Arc::new(Mutex::new(Vec::new()));
    provider.read(collect(&received));
    assert!(provider.has_pending_read());

    let flushed = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&flushed);
    provider.stop_and_flush(move || *flag.lock().unwrap() = true);
    assert!(*flushed.lock().unwrap());
    assert!(provider.has_pending_read());

    // A frame arriving after the flush carries no stale config.
    {
        let mut writer = MessageWriter::create(MessageType::Frame, &mut producer, 16).unwrap();
        assert!(frame(5, 7).marshal(&mut writer));
    }
    provider.on_write_activity();

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].audio_config.is_none());
    assert_eq!(received[0].frame, frame(5, 7));
}

#[test]
fn every_stop_and_flush_completion_fires() {
    let (_streamer, mut provider) = pipe(512, Vec::new());
    let order = Arc::new(Mutex::new(Vec::new()));
    let first = Arc::clone(&order);
    provider.stop_and_flush(move || first.lock().unwrap().push(1));
    let second = Arc::clone(&order);
    provider.stop_and_flush(move || second.lock().unwrap().push(2));
    assert_eq!(order.lock().unwrap().as_slice(), [1, 2]);
}
