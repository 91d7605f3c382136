//! Fixed-point convention shared by the oscillator, envelope and mixer.

/*
Fixed-Point Arithmetic
======================

Every value on the render path is an integer. Fractions are carried with a
fixed number of fractional bits ("Q notation"):

  Q16 phase     The oscillator's phase accumulator. The top bits are the
                table index, the low 16 bits are the fraction between two
                table entries.

                  accumulator = index * 2^16 + fraction

  Q15 gain      Envelope levels and gains. 1 << 15 (32768) is unity.

                  0      -> silence
                  16384  -> half
                  32768  -> full scale

  i16 sample    Table entries and output samples. Positive peak 32766,
                negative peak -32767 (symmetric around zero, so a
                negated peak never overflows).


Applying a Gain
---------------

    out = (sample * gain) >> 15

The product of an i16 sample and a Q15 gain needs up to 31 bits, and an
amplitude ratio can push a sample past i16 before the gain is applied, so
every product is formed in i64 and only narrowed at the very end.

The shift is arithmetic: it rounds toward negative infinity. -1 * 16384 >> 15
gives -1, not 0. This keeps the rounding direction the same for every
sample, so a constant input never picks up a sign-dependent DC offset.


Narrowing
---------

Narrowing back to i16 SATURATES. A sum that lands outside [-32768, 32767]
is clipped to the nearest bound instead of wrapping around. Wrapping turns a
small overshoot into a full-scale spike of the opposite sign; clipping is
the audible behaviour a DAC produces anyway.


Amplitude Ratios
----------------

Amplitude is carried as a reduced fraction num/den so the hot path only
needs an integer multiply and divide:

    0.25   ->  2500/10000  ->  1/4
    0.01   ->   100/10000  ->  1/100
    1.5    -> 15000/10000  ->  3/2

The float is quantised to 1/10000 first, then reduced by the GCD.
*/

/// Fractional bits in the oscillator phase accumulator.
pub const PHASE_FRAC_BITS: u32 = 16;

/// Fractional bits in envelope levels and gains.
pub const GAIN_FRAC_BITS: u32 = 15;

/// Unity gain in Q15.
pub const GAIN_UNITY: i32 = 1 << GAIN_FRAC_BITS;

/// Largest positive sample value written into waveform tables.
pub const SAMPLE_MAX: i16 = 32766;

/// Largest negative sample value written into waveform tables.
pub const SAMPLE_MIN: i16 = -32767;

/// Quantisation step used when converting a float amplitude into a ratio.
pub const RATIO_PRECISION: i32 = 10_000;

/// Narrow a wide intermediate to `i16`, clipping at the type bounds.
#[inline]
pub fn saturate_i16(value: i64) -> i16 {
    value.clamp(i16::MIN as i64, i16::MAX as i64) as i16
}

/// Apply a Q15 gain to a sample: `(sample * gain) >> 15`, saturated.
#[inline]
pub fn apply_gain(sample: i64, gain: i32) -> i16 {
    saturate_i16(sample.saturating_mul(gain as i64) >> GAIN_FRAC_BITS)
}

/// Greatest common divisor (Euclid). `gcd(0, 0)` is 0.
pub fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Amplitude expressed as an integer fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmplitudeRatio {
    pub num: i32,
    pub den: i32,
}

impl AmplitudeRatio {
    pub const ZERO: Self = Self { num: 0, den: 1 };
    pub const UNITY: Self = Self { num: 1, den: 1 };

    /// Build a ratio and reduce it. A zero denominator is kept as-is and
    /// silences the voice.
    pub fn new(num: i32, den: i32) -> Self {
        if den == 0 {
            return Self { num, den };
        }
        let g = gcd(num.unsigned_abs(), den.unsigned_abs()).max(1) as i32;
        let (num, den) = (num / g, den / g);
        if den < 0 {
            Self { num: num.saturating_neg(), den: den.saturating_neg() }
        } else {
            Self { num, den }
        }
    }

    /// Quantise a float amplitude to 1/10000 and reduce.
    ///
    /// Non-finite input maps to zero.
    pub fn from_f64(amplitude: f64) -> Self {
        if !amplitude.is_finite() {
            return Self::ZERO;
        }
        let limit = i32::MAX as f64 / RATIO_PRECISION as f64;
        let scaled = (amplitude.clamp(-limit, limit) * RATIO_PRECISION as f64) as i32;
        Self::new(scaled, RATIO_PRECISION)
    }

    /// True when applying this ratio always yields zero.
    #[inline]
    pub fn is_silent(&self) -> bool {
        self.num == 0 || self.den == 0
    }

    /// Scale a sample, returning the wide result (truncated toward zero).
    #[inline]
    pub fn scale(&self, sample: i32) -> i64 {
        if self.den == 0 {
            return 0;
        }
        sample as i64 * self.num as i64 / self.den as i64
    }

    pub fn as_f64(&self) -> f64 {
        if self.den == 0 {
            0.0
        } else {
            self.num as f64 / self.den as f64
        }
    }
}

impl Default for AmplitudeRatio {
    fn default() -> Self {
        Self::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturate_clips_instead_of_wrapping() {
        assert_eq!(saturate_i16(40_000), i16::MAX);
        assert_eq!(saturate_i16(-40_000), i16::MIN);
        assert_eq!(saturate_i16(1234), 1234);
    }

    #[test]
    fn gain_unity_is_identity() {
        assert_eq!(apply_gain(12_345, GAIN_UNITY), 12_345);
        assert_eq!(apply_gain(-12_345, GAIN_UNITY), -12_345);
        assert_eq!(apply_gain(SAMPLE_MIN as i64, GAIN_UNITY), SAMPLE_MIN);
    }

    #[test]
    fn gain_shift_rounds_toward_negative_infinity() {
        // half of -1 floors to -1, half of 1 floors to 0
        assert_eq!(apply_gain(-1, GAIN_UNITY / 2), -1);
        assert_eq!(apply_gain(1, GAIN_UNITY / 2), 0);
    }

    #[test]
    fn gain_product_saturates() {
        // A ratio-boosted sample above i16 range at unity gain clips
        assert_eq!(apply_gain(60_000, GAIN_UNITY), i16::MAX);
        assert_eq!(apply_gain(-60_000, GAIN_UNITY), i16::MIN);
    }

    #[test]
    fn gcd_basics() {
        assert_eq!(gcd(10_000, 2_500), 2_500);
        assert_eq!(gcd(17, 5), 1);
        assert_eq!(gcd(0, 7), 7);
        assert_eq!(gcd(0, 0), 0);
    }

    #[test]
    fn ratio_from_float_reduces() {
        assert_eq!(AmplitudeRatio::from_f64(0.25), AmplitudeRatio { num: 1, den: 4 });
        assert_eq!(AmplitudeRatio::from_f64(0.01), AmplitudeRatio { num: 1, den: 100 });
        assert_eq!(AmplitudeRatio::from_f64(1.5), AmplitudeRatio { num: 3, den: 2 });
        assert_eq!(AmplitudeRatio::from_f64(0.0), AmplitudeRatio { num: 0, den: 1 });
        assert!(AmplitudeRatio::from_f64(f64::NAN).is_silent());
    }

    #[test]
    fn ratio_scale_truncates_toward_zero() {
        let third = AmplitudeRatio::new(1, 3);
        assert_eq!(third.scale(10), 3);
        assert_eq!(third.scale(-10), -3);
    }

    #[test]
    fn zero_denominator_is_silent() {
        let r = AmplitudeRatio::new(5, 0);
        assert!(r.is_silent());
        assert_eq!(r.scale(30_000), 0);
    }

    #[test]
    fn negative_denominator_is_normalised() {
        assert_eq!(AmplitudeRatio::new(2, -4), AmplitudeRatio { num: -1, den: 2 });
    }
}
