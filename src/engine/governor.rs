use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

/*
Real-Time Pacing
================

A blocking sink accepts buffers as fast as its internal queue has room,
which is much faster than real time until the queue fills. Left alone the
render loop races seconds ahead of the listener, and control changes
take that long to become audible.

The governor compares two clocks:

  buffer_ms   How much audio has been handed to the sink:
                rendered_frames * 1000 / sample_rate

  wall_ms     How long we have actually been running.

    ahead = buffer_ms - wall_ms

    ahead <= slack     ->  carry on
    ahead >  slack     ->  sleep(ahead - slack)

The slack can be changed while the loop runs through a [`SlackHandle`].

It only ever slows rendering down. Being behind is the sink's problem
(underrun); frames are never dropped to catch up.
*/

/// Longest single sleep before the shutdown flag is checked again.
pub const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// Source of elapsed time and of sleeping.
pub trait Clock {
    /// Time since the clock's origin.
    fn now(&self) -> Duration;
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by [`Instant`] and [`std::thread::sleep`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Test clock. Time moves only when told to, or when something sleeps on it.
///
/// Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        self.nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, now: Duration) {
        self.nanos.store(now.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// Adjustable pacing slack in milliseconds. Clones share the value, so a
/// control thread can retune a governor that is busy in a render loop.
#[derive(Debug, Clone, Default)]
pub struct SlackHandle {
    ms: Arc<AtomicU64>,
}

impl SlackHandle {
    pub fn new(slack_ms: u64) -> Self {
        Self {
            ms: Arc::new(AtomicU64::new(slack_ms)),
        }
    }

    pub fn ms(&self) -> u64 {
        self.ms.load(Ordering::Relaxed)
    }

    pub fn set_ms(&self, slack_ms: u64) {
        self.ms.store(slack_ms, Ordering::Relaxed);
    }
}

/// Where rendering stands relative to the wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GovernorStatus {
    pub rendered_ms: u64,
    pub wall_ms: u64,
    /// Negative when rendering is behind.
    pub ahead_ms: i64,
}

pub struct Governor<C: Clock = SystemClock> {
    clock: C,
    sample_rate: u32,
    slack: SlackHandle,
    started: Duration,
    rendered_frames: u64,
}

impl Governor<SystemClock> {
    pub fn new(sample_rate: u32, slack_ms: u64) -> Self {
        Self::with_clock(sample_rate, slack_ms, SystemClock::new())
    }
}

impl<C: Clock> Governor<C> {
    /// Start tracking from the clock's current time.
    pub fn with_clock(sample_rate: u32, slack_ms: u64, clock: C) -> Self {
        let started = clock.now();
        Self {
            clock,
            sample_rate: sample_rate.max(1),
            slack: SlackHandle::new(slack_ms),
            started,
            rendered_frames: 0,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn slack_ms(&self) -> u64 {
        self.slack.ms()
    }

    /// Takes effect from the next [`advance`](Self::advance).
    pub fn set_slack_ms(&mut self, slack_ms: u64) {
        self.slack.set_ms(slack_ms);
    }

    pub fn slack_handle(&self) -> SlackHandle {
        self.slack.clone()
    }

    pub fn rendered_frames(&self) -> u64 {
        self.rendered_frames
    }

    pub fn status(&self) -> GovernorStatus {
        let rendered_ms = self.rendered_frames.saturating_mul(1000) / self.sample_rate as u64;
        let wall_ms = self.clock.now().saturating_sub(self.started).as_millis() as u64;
        GovernorStatus {
            rendered_ms,
            wall_ms,
            ahead_ms: rendered_ms as i64 - wall_ms as i64,
        }
    }

    /// Account for `frames` handed to the sink and return the delay
    /// needed to stay within the slack, if any.
    pub fn advance(&mut self, frames: usize) -> Option<Duration> {
        self.rendered_frames = self.rendered_frames.saturating_add(frames as u64);
        let status = self.status();
        let slack = self.slack.ms().min(i64::MAX as u64) as i64;
        let excess = status.ahead_ms.saturating_sub(slack);
        (excess > 0).then(|| Duration::from_millis(excess as u64))
    }

    /// [`advance`](Self::advance), then sleep off any excess in slices,
    /// stopping early once `shutdown` is set. Returns the time slept.
    pub fn pace(&mut self, frames: usize, shutdown: &AtomicBool) -> Duration {
        let Some(mut remaining) = self.advance(frames) else {
            return Duration::ZERO;
        };
        let mut slept = Duration::ZERO;
        while !remaining.is_zero() && !shutdown.load(Ordering::Acquire) {
            let slice = remaining.min(SLEEP_SLICE);
            self.clock.sleep(slice);
            slept += slice;
            remaining -= slice;
        }
        slept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn governor(slack_ms: u64) -> (Governor<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        (Governor::with_clock(1_000, slack_ms, clock.clone()), clock)
    }

    #[test]
    fn within_slack_requests_nothing() {
        let (mut gov, _clock) = governor(100);
        assert_eq!(gov.advance(100), None);
        assert_eq!(gov.status().ahead_ms, 100);
    }

    #[test]
    fn ahead_by_more_than_slack_requests_the_excess() {
        let (mut gov, clock) = governor(100);
        clock.advance(Duration::from_millis(50));
        // 500 ms rendered, 50 ms elapsed, 100 ms slack
        assert_eq!(gov.advance(500), Some(Duration::from_millis(350)));
    }

    #[test]
    fn behind_requests_nothing() {
        let (mut gov, clock) = governor(0);
        clock.advance(Duration::from_secs(2));
        assert_eq!(gov.advance(1_000), None);
        assert_eq!(gov.status().ahead_ms, -1_000);
    }

    #[test]
    fn start_time_is_taken_at_construction() {
        let clock = ManualClock::new();
        clock.set(Duration::from_secs(10));
        let mut gov = Governor::with_clock(1_000, 0, clock.clone());
        clock.advance(Duration::from_millis(200));
        assert_eq!(gov.advance(300), Some(Duration::from_millis(100)));
    }

    #[test]
    fn slack_can_change_between_buffers() {
        let (mut gov, _clock) = governor(1_000);
        assert_eq!(gov.advance(200), None);

        gov.set_slack_ms(50);
        assert_eq!(gov.slack_ms(), 50);
        assert_eq!(gov.advance(100), Some(Duration::from_millis(250)));

        let handle = gov.slack_handle();
        handle.set_ms(u64::MAX);
        assert_eq!(gov.slack_ms(), u64::MAX);
        assert_eq!(gov.advance(100), None);
    }

    #[test]
    fn slack_handle_works_across_threads() {
        let (mut gov, _clock) = governor(1_000);
        let handle = gov.slack_handle();
        std::thread::spawn(move || handle.set_ms(0)).join().unwrap();
        assert_eq!(gov.advance(10), Some(Duration::from_millis(10)));
    }

    #[test]
    fn pace_sleeps_in_slices() {
        let (mut gov, clock) = governor(0);
        let shutdown = AtomicBool::new(false);
        let slept = gov.pace(45, &shutdown);
        assert_eq!(slept, Duration::from_millis(45));
        assert_eq!(clock.now(), Duration::from_millis(45));
        assert_eq!(gov.status().ahead_ms, 0);
    }

    #[test]
    fn pace_stops_on_shutdown() {
        let (mut gov, clock) = governor(0);
        let shutdown = AtomicBool::new(true);
        assert_eq!(gov.pace(500, &shutdown), Duration::ZERO);
        assert_eq!(clock.now(), Duration::ZERO);
    }
}
