//! Whole-synth benchmarks: every voice in the bank, mixed.

mod mix;

pub use mix::bench_mix;
