//! Output through the system audio device.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    SampleFormat, Stream,
};
use rtrb::{Consumer, Producer, RingBuffer};

use crate::io::sink::{AudioSink, SinkError};

const FULL_RING_BACKOFF: Duration = Duration::from_millis(1);

/// Extra time `flush` allows on top of the ring's playback time.
const FLUSH_MARGIN: Duration = Duration::from_millis(500);

/// Blocking writer in front of a cpal output stream.
///
/// `write` pushes into a ring buffer and waits while it is full; the device
/// callback drains the ring, duplicating the mono signal into every
/// channel. When the callback finds the ring empty it plays silence and
/// flags an underrun, which the next `write` reports.
///
/// The stream is not `Send` on every platform, so open the sink on the
/// thread that will write to it.
pub struct CpalSink {
    _stream: Stream,
    producer: Producer<i16>,
    underrun: Arc<AtomicBool>,
    sample_rate: u32,
    channels: u16,
}

impl CpalSink {
    /// Open the default output device at `sample_rate`, buffering up to
    /// `ring_frames` frames ahead of the callback.
    pub fn open(sample_rate: u32, ring_frames: usize) -> Result<Self, SinkError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| SinkError::Device("no default output device available".into()))?;
        let supported = device
            .default_output_config()
            .map_err(|e| SinkError::Device(e.to_string()))?;

        let channels = supported.channels();
        let config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (producer, consumer) = RingBuffer::new(ring_frames.max(1));
        let underrun = Arc::new(AtomicBool::new(false));

        let stream = match supported.sample_format() {
            SampleFormat::I16 => {
                let mut feed = Feed::new(consumer, underrun.clone(), channels as usize);
                device.build_output_stream(
                    &config,
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        feed.fill(data, |s| s)
                    },
                    |err| tracing::error!(%err, "audio stream error"),
                    None,
                )
            }
            SampleFormat::F32 => {
                let mut feed = Feed::new(consumer, underrun.clone(), channels as usize);
                device.build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        feed.fill(data, |s| s as f32 / 32768.0)
                    },
                    |err| tracing::error!(%err, "audio stream error"),
                    None,
                )
            }
            other => {
                return Err(SinkError::Device(format!(
                    "unsupported sample format {other:?}"
                )))
            }
        }
        .map_err(|e| SinkError::Device(e.to_string()))?;

        stream
            .play()
            .map_err(|e| SinkError::Device(e.to_string()))?;

        tracing::info!(
            device = %device.name().unwrap_or_default(),
            sample_rate,
            channels,
            "audio output open"
        );

        Ok(Self {
            _stream: stream,
            producer,
            underrun,
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

impl AudioSink for CpalSink {
    fn write(&mut self, samples: &[i16]) -> Result<(), SinkError> {
        if self.underrun.load(Ordering::Acquire) {
            return Err(SinkError::Underrun);
        }

        let mut rest = samples;
        while !rest.is_empty() {
            if self.producer.is_abandoned() {
                return Err(SinkError::Closed);
            }
            let n = self.producer.slots().min(rest.len());
            if n == 0 {
                std::thread::sleep(FULL_RING_BACKOFF);
                continue;
            }
            let chunk = self
                .producer
                .write_chunk_uninit(n)
                .map_err(|e| SinkError::Device(e.to_string()))?;
            let written = chunk.fill_from_iter(rest.iter().copied());
            rest = &rest[written..];
        }
        Ok(())
    }

    fn recover(&mut self) -> Result<(), SinkError> {
        self.underrun.store(false, Ordering::Release);
        Ok(())
    }

    /// Wait until the callback has taken everything queued, giving up once
    /// a full ring should have played out.
    fn flush(&mut self) -> Result<(), SinkError> {
        let capacity = self.producer.buffer().capacity();
        let deadline = Instant::now() + drain_timeout(capacity, self.sample_rate);
        while !self.producer.is_abandoned() && self.producer.slots() < capacity {
            if Instant::now() >= deadline {
                let queued = capacity - self.producer.slots();
                tracing::warn!(queued, "audio device stopped draining");
                return Err(SinkError::Device(format!(
                    "output stalled with {queued} frames queued"
                )));
            }
            std::thread::sleep(FULL_RING_BACKOFF);
        }
        Ok(())
    }
}

/// Playback time of `frames` at `sample_rate`, plus [`FLUSH_MARGIN`].
fn drain_timeout(frames: usize, sample_rate: u32) -> Duration {
    let nanos = frames as u128 * 1_000_000_000 / sample_rate.max(1) as u128;
    Duration::from_nanos(nanos.min(u64::MAX as u128) as u64) + FLUSH_MARGIN
}

/// Callback-side state.
struct Feed {
    consumer: Consumer<i16>,
    underrun: Arc<AtomicBool>,
    channels: usize,
    primed: bool,
}

impl Feed {
    fn new(consumer: Consumer<i16>, underrun: Arc<AtomicBool>, channels: usize) -> Self {
        Self {
            consumer,
            underrun,
            channels: channels.max(1),
            primed: false,
        }
    }

    fn fill<T: Copy>(&mut self, data: &mut [T], convert: impl Fn(i16) -> T) {
        for frame in data.chunks_mut(self.channels) {
            let sample = match self.consumer.pop() {
                Ok(s) => {
                    self.primed = true;
                    s
                }
                Err(_) => {
                    // silence before the first write is not an underrun
                    if self.primed {
                        self.underrun.store(true, Ordering::Release);
                    }
                    0
                }
            };
            frame.fill(convert(sample));
        }
    }
}
