//! Benchmarks for table-walking oscillators.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use ddsynth::dsp::{
    oscillator::Oscillator,
    wavetable::{WaveBank, WaveformKind},
};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");
    let bank = WaveBank::with_noise_seed(4096, 0);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0i16; size];

        // Every table costs the same; sine stands in for all of them
        let mut osc = Oscillator::new(bank.table(WaveformKind::Sine).clone(), SAMPLE_RATE);
        osc.set_frequency(440.0);
        group.bench_with_input(BenchmarkId::new("sine", size), &size, |b, _| {
            b.iter(|| {
                for s in buffer.iter_mut() {
                    *s = osc.next_sample();
                }
                black_box(&mut buffer);
            })
        });

        // Reverse playback exercises the negative wrap
        let mut osc = Oscillator::new(bank.table(WaveformKind::SawUp).clone(), SAMPLE_RATE);
        osc.set_frequency(-440.0);
        group.bench_with_input(BenchmarkId::new("reverse", size), &size, |b, _| {
            b.iter(|| {
                for s in buffer.iter_mut() {
                    *s = osc.next_sample();
                }
                black_box(&mut buffer);
            })
        });

        // Retuned every sample, as an FM carrier is
        let mut osc = Oscillator::new(bank.table(WaveformKind::Sine).clone(), SAMPLE_RATE);
        group.bench_with_input(BenchmarkId::new("retune_per_sample", size), &size, |b, _| {
            b.iter(|| {
                for (i, s) in buffer.iter_mut().enumerate() {
                    osc.set_frequency(black_box(440.0 + (i & 7) as f64));
                    *s = osc.next_sample();
                }
                black_box(&mut buffer);
            })
        });
    }

    group.finish();
}
