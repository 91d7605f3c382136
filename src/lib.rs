//! Fixed-point, multi-voice DDS synthesis.
//!
//! Voices walk shared waveform tables with Q16 phase accumulators, are
//! shaped by Q15 ADSR envelopes, and can frequency-modulate each other.
//! A [`Synth`] renders mono `i16` buffers; a [`RenderLoop`] feeds them to
//! an [`AudioSink`](io::AudioSink) while keeping rendering close to real
//! time.

pub mod config;
pub mod dsp; // Fixed-point signal primitives
pub mod engine; // Render loop and pacing
pub mod io; // Sinks and format conversion
pub mod synth; // Voices, mixing and control

pub use config::{ConfigError, EngineConfig};
pub use engine::{
    governor::{Governor, SlackHandle},
    RenderLoop, RunStats,
};
pub use synth::{ControlError, Synth, SynthHandle};

/// Largest period the render loop will allocate.
pub const MAX_BLOCK_SIZE: usize = 8192;
