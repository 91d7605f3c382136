//! Benchmarks for low-level DSP primitives.

mod envelope;
mod gain;
mod oscillator;

pub use envelope::bench_envelope;
pub use gain::bench_gain;
pub use oscillator::bench_oscillator;
