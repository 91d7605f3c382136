//! Engine-wide configuration.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{dsp::wavetable::MAX_TABLE_LEN, MAX_BLOCK_SIZE};

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_VOICES: usize = 8;
pub const DEFAULT_PERIOD_FRAMES: usize = 1_024;
pub const DEFAULT_SLACK_MS: u64 = 100;
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Everything fixed at startup.
///
/// ```
/// use ddsynth::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_sample_rate(48_000)
///     .with_voices(4)
///     .with_slack_ms(50);
/// assert!(config.validate().is_ok());
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Samples per waveform table. Power of two.
    pub table_len: usize,
    /// Size of the voice pool.
    pub voices: usize,
    /// Frames per rendered buffer.
    pub period_frames: usize,
    /// How far rendering may run ahead of the wall clock before the
    /// governor sleeps.
    pub slack_ms: u64,
    /// Capacity of the control → render message queue.
    pub control_queue: usize,
    /// Capacity of the render → control event queue.
    pub event_queue: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            table_len: crate::dsp::wavetable::DEFAULT_TABLE_LEN,
            voices: DEFAULT_VOICES,
            period_frames: DEFAULT_PERIOD_FRAMES,
            slack_ms: DEFAULT_SLACK_MS,
            control_queue: DEFAULT_QUEUE_CAPACITY,
            event_queue: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_table_len(mut self, table_len: usize) -> Self {
        self.table_len = table_len;
        self
    }

    pub fn with_voices(mut self, voices: usize) -> Self {
        self.voices = voices;
        self
    }

    pub fn with_period_frames(mut self, period_frames: usize) -> Self {
        self.period_frames = period_frames;
        self
    }

    pub fn with_slack_ms(mut self, slack_ms: u64) -> Self {
        self.slack_ms = slack_ms;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.control_queue = capacity;
        self.event_queue = capacity;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::SampleRate(self.sample_rate));
        }
        if !self.table_len.is_power_of_two() || self.table_len > MAX_TABLE_LEN {
            return Err(ConfigError::TableLength(self.table_len));
        }
        if self.voices == 0 {
            return Err(ConfigError::Voices(self.voices));
        }
        if self.period_frames == 0 || self.period_frames > MAX_BLOCK_SIZE {
            return Err(ConfigError::PeriodFrames(self.period_frames));
        }
        if self.control_queue == 0 || self.event_queue == 0 {
            return Err(ConfigError::QueueCapacity);
        }
        Ok(())
    }

    /// Duration of one period in milliseconds (rounded down).
    pub fn period_ms(&self) -> u64 {
        self.period_frames as u64 * 1000 / self.sample_rate.max(1) as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    SampleRate(u32),
    TableLength(usize),
    Voices(usize),
    PeriodFrames(usize),
    QueueCapacity,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::SampleRate(rate) => write!(f, "sample rate must be positive, got {rate}"),
            ConfigError::TableLength(len) => write!(
                f,
                "table length must be a power of two up to {MAX_TABLE_LEN}, got {len}"
            ),
            ConfigError::Voices(n) => write!(f, "voice pool must hold at least one voice, got {n}"),
            ConfigError::PeriodFrames(n) => {
                write!(f, "period must be 1..={MAX_BLOCK_SIZE} frames, got {n}")
            }
            ConfigError::QueueCapacity => write!(f, "queue capacities must be positive"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.table_len, 4_096);
        assert_eq!(config.voices, 8);
    }

    #[test]
    fn rejects_bad_values() {
        let base = EngineConfig::default();
        assert_eq!(
            base.clone().with_sample_rate(0).validate(),
            Err(ConfigError::SampleRate(0))
        );
        assert_eq!(
            base.clone().with_table_len(1000).validate(),
            Err(ConfigError::TableLength(1000))
        );
        assert_eq!(
            base.clone().with_table_len(1 << 16).validate(),
            Err(ConfigError::TableLength(1 << 16))
        );
        assert_eq!(base.clone().with_voices(0).validate(), Err(ConfigError::Voices(0)));
        assert_eq!(
            base.clone().with_period_frames(MAX_BLOCK_SIZE + 1).validate(),
            Err(ConfigError::PeriodFrames(MAX_BLOCK_SIZE + 1))
        );
        assert_eq!(
            base.with_queue_capacity(0).validate(),
            Err(ConfigError::QueueCapacity)
        );
    }

    #[test]
    fn period_duration() {
        let config = EngineConfig::default().with_period_frames(441);
        assert_eq!(config.period_ms(), 10);
    }
}
