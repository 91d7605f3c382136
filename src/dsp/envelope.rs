use crate::dsp::fixed::GAIN_UNITY;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Fixed-Point ADSR Envelope
=========================

A linear ADSR envelope whose level is a Q15 integer. The level multiplies
the oscillator output to shape its amplitude over time.

Vocabulary
----------

  level         Current output, Q15: 0 is silence, 32768 (1 << 15) is unity.

  attack level  Peak reached at the end of the attack ramp.

  sustain level Level held while the note is down, after decay.

  rate          Per-sample step for a stage, in Q15 units.


The Shape
---------

  Level
    A   ┐     ╱╲
        │    ╱  ╲___________
    S   │   ╱               ╲
        │  ╱                 ╲
    0   └─╱───────────────────╲──→ samples
        Attack Decay  Sustain  Release


Time to Rate
------------

    samples = max(1, ceil(ms * sample_rate / 1000))
    rate    = max(1, ceil(delta / samples))

    attack  delta = attack_level
    decay   delta = attack_level - sustain_level
    release delta = attack_level

The division rounds UP. Rounding down would leave the ramp short of its
target after `samples` steps and stretch the stage by up to a third at short
durations; rounding up lands on or past the target in time, and the clamp
at the end of each stage absorbs the overshoot.

The release rate is derived from the attack level, not the sustain level.
A note released mid-attack can be sitting anywhere up to the attack level;
sizing the ramp for the highest possible start keeps every release within
its configured duration.

A zero duration becomes one sample. A zero rate becomes one, so no stage
can stall.


State Machine
-------------

    Idle     level = 0                 → Attack on note_on
    Attack   level += attack_rate      → Decay when level ≥ attack_level
    Decay    level -= decay_rate       → Sustain when level ≤ sustain_level
    Sustain  level held                → Release on note_off
    Release  level -= release_rate     → Idle when level ≤ 0

note_on forces Attack from ANY stage and keeps the current level. A re-
triggered note ramps up from wherever it is instead of snapping to zero,
which would click.

note_off forces Release from any sounding stage.

`advance` reports the stage it moved into, so the caller can count or log
transitions without printing from inside the sample loop.
*/

/// The current stage of the envelope state machine.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Durations in milliseconds, levels in Q15.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeShape {
    pub attack_ms: u32,
    pub decay_ms: u32,
    pub release_ms: u32,
    pub attack_level: i32,
    pub sustain_level: i32,
}

impl EnvelopeShape {
    /// Build a shape, clamping `attack_level` into `[0, unity]` and
    /// `sustain_level` into `[0, attack_level]`.
    pub fn new(
        attack_ms: u32,
        decay_ms: u32,
        release_ms: u32,
        attack_level: i32,
        sustain_level: i32,
    ) -> Self {
        let attack_level = attack_level.clamp(0, GAIN_UNITY);
        let sustain_level = sustain_level.clamp(0, attack_level);
        Self {
            attack_ms,
            decay_ms,
            release_ms,
            attack_level,
            sustain_level,
        }
    }
}

impl Default for EnvelopeShape {
    fn default() -> Self {
        // 2 s attack, 3 s decay to 70%, 4 s release
        Self::new(2_000, 3_000, 4_000, GAIN_UNITY, GAIN_UNITY * 7 / 10)
    }
}

/// Samples in a stage of `ms` milliseconds, at least one.
#[inline]
pub fn stage_samples(ms: u32, sample_rate: u32) -> u64 {
    (ms as u64 * sample_rate as u64).div_ceil(1000).max(1)
}

/// Per-sample step covering `delta` in `samples` steps, at least one.
#[inline]
pub fn stage_rate(delta: i32, samples: u64) -> i32 {
    let step = (delta.unsigned_abs() as u64).div_ceil(samples.max(1));
    step.clamp(1, i32::MAX as u64) as i32
}

pub struct Envelope {
    shape: EnvelopeShape,
    sample_rate: u32,

    attack_rate: i32,
    decay_rate: i32,
    release_rate: i32,

    stage: EnvelopeStage,
    level: i32,
    note_on: bool,
}

impl Envelope {
    pub fn new(sample_rate: u32) -> Self {
        Self::with_shape(EnvelopeShape::default(), sample_rate)
    }

    pub fn with_shape(shape: EnvelopeShape, sample_rate: u32) -> Self {
        let mut env = Self {
            shape,
            sample_rate: sample_rate.max(1),
            attack_rate: 1,
            decay_rate: 1,
            release_rate: 1,
            stage: EnvelopeStage::Idle,
            level: 0,
            note_on: false,
        };
        env.set_shape(shape);
        env
    }

    /// Replace the shape and re-initialise: stage Idle, level 0.
    pub fn set_shape(&mut self, shape: EnvelopeShape) {
        let shape = EnvelopeShape::new(
            shape.attack_ms,
            shape.decay_ms,
            shape.release_ms,
            shape.attack_level,
            shape.sustain_level,
        );
        let sr = self.sample_rate;

        self.attack_rate = stage_rate(shape.attack_level, stage_samples(shape.attack_ms, sr));
        self.decay_rate = stage_rate(
            shape.attack_level - shape.sustain_level,
            stage_samples(shape.decay_ms, sr),
        );
        self.release_rate = stage_rate(shape.attack_level, stage_samples(shape.release_ms, sr));

        self.shape = shape;
        self.stage = EnvelopeStage::Idle;
        self.level = 0;
        self.note_on = false;
    }

    /// Gate high: (re)enter Attack from the current level.
    pub fn note_on(&mut self) -> EnvelopeStage {
        self.note_on = true;
        self.stage = EnvelopeStage::Attack;
        self.stage
    }

    /// Gate low: enter Release from the current level. No-op while Idle.
    pub fn note_off(&mut self) -> EnvelopeStage {
        self.note_on = false;
        if self.stage != EnvelopeStage::Idle {
            self.stage = EnvelopeStage::Release;
        }
        self.stage
    }

    /// Advance one sample. Returns the stage entered, if it changed.
    #[inline]
    pub fn advance(&mut self) -> Option<EnvelopeStage> {
        let before = self.stage;
        match self.stage {
            EnvelopeStage::Idle => {
                self.level = 0;
            }

            EnvelopeStage::Attack => {
                self.level = self.level.saturating_add(self.attack_rate);
                if self.level >= self.shape.attack_level {
                    self.level = self.shape.attack_level;
                    self.stage = EnvelopeStage::Decay;
                }
            }

            EnvelopeStage::Decay => {
                self.level = self.level.saturating_sub(self.decay_rate);
                if self.level <= self.shape.sustain_level {
                    self.level = self.shape.sustain_level;
                    self.stage = EnvelopeStage::Sustain;
                }
            }

            EnvelopeStage::Sustain => {}

            EnvelopeStage::Release => {
                self.level = self.level.saturating_sub(self.release_rate);
                if self.level <= 0 {
                    self.level = 0;
                    self.stage = EnvelopeStage::Idle;
                }
            }
        }

        debug_assert!((0..=self.shape.attack_level).contains(&self.level));
        (self.stage != before).then_some(self.stage)
    }

    /// Fill `buffer` with successive gains.
    pub fn render(&mut self, buffer: &mut [i32]) {
        for gain in buffer.iter_mut() {
            self.advance();
            *gain = self.level;
        }
    }

    /// Current gain in Q15, for `fixed::apply_gain`.
    #[inline]
    pub fn gain(&self) -> i32 {
        self.level
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    pub fn shape(&self) -> EnvelopeShape {
        self.shape
    }

    pub fn is_note_on(&self) -> bool {
        self.note_on
    }

    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    /// (attack, decay, release) per-sample steps.
    pub fn rates(&self) -> (i32, i32, i32) {
        (self.attack_rate, self.decay_rate, self.release_rate)
    }
}
