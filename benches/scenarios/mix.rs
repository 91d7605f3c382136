//! Benchmarks for full voice banks.
//!
//! These render the whole bank the way the render loop does, with and
//! without FM routing.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use ddsynth::{dsp::wavetable::WaveBank, EngineConfig, Synth};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

fn bank(voices: usize, fm: bool) -> Synth {
    let config = EngineConfig::default()
        .with_sample_rate(SAMPLE_RATE)
        .with_voices(voices);
    let mut synth = Synth::new(&config, WaveBank::with_noise_seed(config.table_len, 0));

    for v in 0..voices {
        synth.set_waveform(v, (v % 6) as u8);
        synth.set_frequency(v, 110.0 * (v + 1) as f64);
        synth.set_amplitude(v, 0.1);
        synth.set_envelope_enabled(v, true);
        synth.note_on(v);
    }
    if fm {
        // odd voices modulate the even voice below them
        for m in (1..voices).step_by(2) {
            synth.set_waveform(m, 0);
            synth.set_frequency(m, 5.0);
            synth.set_amplitude(m, 0.001);
            synth.set_modulator(m, true);
            synth.set_modulation_source(m - 1, Some(m));
        }
    }
    synth
}

pub fn bench_mix(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/mix");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0i16; size];

        // === 2 CARRIERS ===
        let mut minimal = bank(2, false);
        group.bench_with_input(BenchmarkId::new("2_voice", size), &size, |b, _| {
            b.iter(|| minimal.render(black_box(&mut buffer)))
        });

        // === DEFAULT BANK: 8 carriers ===
        let mut full = bank(8, false);
        group.bench_with_input(BenchmarkId::new("8_voice", size), &size, |b, _| {
            b.iter(|| full.render(black_box(&mut buffer)))
        });

        // === 4 CARRIER/MODULATOR PAIRS ===
        let mut fm = bank(8, true);
        group.bench_with_input(BenchmarkId::new("8_voice_fm", size), &size, |b, _| {
            b.iter(|| fm.render(black_box(&mut buffer)))
        });

        // === DENSE: 32 voices (stress test) ===
        let mut dense = bank(32, true);
        group.bench_with_input(BenchmarkId::new("32_voice_fm", size), &size, |b, _| {
            b.iter(|| dense.render(black_box(&mut buffer)))
        });
    }

    group.finish();
}
