//! The render loop: render a period, hand it to the sink, pace.

pub mod governor;

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use crate::{
    config::EngineConfig,
    io::sink::{AudioSink, SinkError},
    synth::Synth,
};

use self::governor::{Clock, Governor, GovernorStatus, SlackHandle, SystemClock};

/// Rewrites of one buffer after an underrun before it is dropped.
pub const MAX_UNDERRUN_RETRIES: usize = 3;

/// What a finished run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub buffers: u64,
    pub frames: u64,
    pub underruns: u64,
    /// Buffers given up on after repeated underruns.
    pub dropped_buffers: u64,
    pub slept: Duration,
}

pub struct RenderLoop<C: Clock = SystemClock> {
    governor: Governor<C>,
    buffer: Vec<i16>,
}

impl RenderLoop<SystemClock> {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_clock(config, SystemClock::new())
    }
}

impl<C: Clock> RenderLoop<C> {
    pub fn with_clock(config: &EngineConfig, clock: C) -> Self {
        Self {
            governor: Governor::with_clock(config.sample_rate, config.slack_ms, clock),
            buffer: vec![0; config.period_frames.max(1)],
        }
    }

    pub fn governor(&self) -> &Governor<C> {
        &self.governor
    }

    pub fn status(&self) -> GovernorStatus {
        self.governor.status()
    }

    pub fn set_slack_ms(&mut self, slack_ms: u64) {
        self.governor.set_slack_ms(slack_ms);
    }

    /// Retune the slack from another thread while [`run`](Self::run) is
    /// going.
    pub fn slack_handle(&self) -> SlackHandle {
        self.governor.slack_handle()
    }

    /// Run until `shutdown` is set. The buffer in flight is always
    /// finished and written first.
    pub fn run<S>(
        &mut self,
        synth: &mut Synth,
        sink: &mut S,
        shutdown: &AtomicBool,
    ) -> Result<RunStats, SinkError>
    where
        S: AudioSink + ?Sized,
    {
        self.run_for(synth, sink, shutdown, u64::MAX)
    }

    /// Like [`run`](Self::run), also stopping after about `max_frames`
    /// (rounded up to whole periods).
    pub fn run_for<S>(
        &mut self,
        synth: &mut Synth,
        sink: &mut S,
        shutdown: &AtomicBool,
        max_frames: u64,
    ) -> Result<RunStats, SinkError>
    where
        S: AudioSink + ?Sized,
    {
        let mut stats = RunStats::default();
        tracing::info!(
            sample_rate = synth.sample_rate(),
            period = self.buffer.len(),
            voices = synth.voice_count(),
            "render loop started"
        );

        while !shutdown.load(Ordering::Acquire) && stats.frames < max_frames {
            synth.render(&mut self.buffer);

            if self.write_buffer(sink, &mut stats)? {
                stats.buffers += 1;
                stats.frames += self.buffer.len() as u64;
                stats.slept += self.governor.pace(self.buffer.len(), shutdown);
            }
        }

        sink.flush()?;
        tracing::info!(
            buffers = stats.buffers,
            underruns = stats.underruns,
            dropped = stats.dropped_buffers,
            "render loop stopped"
        );
        tracing::debug!(status = ?self.governor.status(), "final pacing");
        Ok(stats)
    }

    /// Returns false when the buffer was dropped.
    fn write_buffer<S>(&self, sink: &mut S, stats: &mut RunStats) -> Result<bool, SinkError>
    where
        S: AudioSink + ?Sized,
    {
        for attempt in 0..=MAX_UNDERRUN_RETRIES {
            match sink.write(&self.buffer) {
                Ok(()) => return Ok(true),
                Err(SinkError::Underrun) => {
                    stats.underruns += 1;
                    tracing::warn!(attempt, "sink underrun, recovering");
                    sink.recover()?;
                }
                Err(err) => return Err(err),
            }
        }
        stats.dropped_buffers += 1;
        tracing::warn!("dropping buffer after repeated underruns");
        Ok(false)
    }
}
