//! Benchmarks for the fixed-point ADSR envelope.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use ddsynth::dsp::{
    envelope::{Envelope, EnvelopeShape},
    fixed::GAIN_UNITY,
};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");
    let slow = EnvelopeShape::new(2_000, 3_000, 4_000, GAIN_UNITY, GAIN_UNITY * 7 / 10);
    let fast = EnvelopeShape::new(1, 1, 4_000, GAIN_UNITY, GAIN_UNITY / 2);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0i32; size];

        // Attack phase (ramping up)
        let mut env = Envelope::with_shape(slow, SAMPLE_RATE);
        env.note_on();
        group.bench_with_input(BenchmarkId::new("attack", size), &size, |b, _| {
            b.iter(|| env.render(black_box(&mut buffer)))
        });

        // Sustain phase (holding steady)
        let mut env = Envelope::with_shape(fast, SAMPLE_RATE);
        env.note_on();
        for _ in 0..200 {
            env.advance();
        }
        group.bench_with_input(BenchmarkId::new("sustain", size), &size, |b, _| {
            b.iter(|| env.render(black_box(&mut buffer)))
        });

        // Release phase (ramping down)
        let mut env = Envelope::with_shape(fast, SAMPLE_RATE);
        env.note_on();
        for _ in 0..200 {
            env.advance();
        }
        env.note_off();
        group.bench_with_input(BenchmarkId::new("release", size), &size, |b, _| {
            b.iter(|| env.render(black_box(&mut buffer)))
        });
    }

    group.finish();
}
