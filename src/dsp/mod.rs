//! Low-level fixed-point DSP primitives used by the voice bank.
//!
//! These components are allocation-free once constructed and realtime-safe,
//! making them safe to embed directly inside voice structs. They stay focused
//! on the integer signal math so the mixer can layer on routing and
//! modulation.

/// Fixed-point attack/decay/sustain/release envelope generator.
pub mod envelope;
/// Q-format constants, saturating narrowing and rational amplitudes.
pub mod fixed;
/// Table-walking DDS oscillator.
pub mod oscillator;
/// One-cycle waveform tables and the bank that owns them.
pub mod wavetable;

pub use envelope::{Envelope, EnvelopeShape, EnvelopeStage};
pub use fixed::AmplitudeRatio;
pub use oscillator::Oscillator;
pub use wavetable::{WaveBank, WaveformKind, WaveformTable};
