//! Benchmarks for the amplitude ratio and Q15 gain steps.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use ddsynth::dsp::fixed::{apply_gain, AmplitudeRatio, GAIN_UNITY};

use crate::BLOCK_SIZES;

pub fn bench_gain(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/gain");
    let ratio = AmplitudeRatio::from_f64(0.37);

    for &size in BLOCK_SIZES {
        let input: Vec<i16> = (0..size).map(|i| (i as i16).wrapping_mul(97)).collect();
        let mut output = vec![0i16; size];

        group.bench_with_input(BenchmarkId::new("ratio_then_gain", size), &size, |b, _| {
            b.iter(|| {
                for (o, &s) in output.iter_mut().zip(&input) {
                    *o = apply_gain(ratio.scale(s as i32), black_box(GAIN_UNITY * 3 / 4));
                }
                black_box(&mut output);
            })
        });
    }

    group.finish();
}
