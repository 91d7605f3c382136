use crate::{
    dsp::{envelope::EnvelopeStage, fixed::saturate_i16},
    synth::voice::Voice,
};

/*
Mixing & Modulation Routing
===========================

Every output frame runs two passes over the voice bank.

  1. Modulators   Voices flagged `is_modulator`. Each writes its sample
                  into `cache[index]` and nothing into the output.

  2. Carriers     Everything else. A carrier with a modulation source is
                  retuned to `base_frequency + cache[source]` Hz before it
                  produces its sample, then summed into the output.

The cache is zeroed at the start of each frame, so a skipped or missing
modulator reads as 0.

A modulator may itself have a source. It reads the cache from the
PREVIOUS frame, which keeps chains and cycles between modulators
well-defined regardless of voice order:

    frame n:   m1 <- prev[m2]    m2 <- prev[m1]    c0 <- cache[m1]


Skipping
--------

A voice with a zero amplitude or the silence table is skipped entirely:
its oscillator and envelope do not advance. Its contribution would be
exactly zero, so the output is the same as computing it.


Summing
-------

Carriers are summed in i32 with no normalisation, then clipped to i16.
Eight full-scale voices overflow i16 by a wide margin; the clip is the
only protection.
*/

pub struct Mixer {
    cache: Vec<i32>,
    previous: Vec<i32>,
}

impl Mixer {
    pub fn new(voice_count: usize) -> Self {
        Self {
            cache: vec![0; voice_count],
            previous: vec![0; voice_count],
        }
    }

    /// Modulator outputs from the most recent frame.
    pub fn cached(&self) -> &[i32] {
        &self.cache
    }

    /// Mix one frame. `on_event` sees every envelope stage transition.
    #[inline]
    pub fn render_frame<F>(&mut self, voices: &mut [Voice], on_event: &mut F) -> i16
    where
        F: FnMut(usize, EnvelopeStage),
    {
        std::mem::swap(&mut self.cache, &mut self.previous);
        self.cache.fill(0);

        for voice in voices.iter_mut() {
            if !voice.config().is_modulator || voice.is_silent() {
                continue;
            }
            let offset = voice
                .config()
                .modulation_source
                .map(|src| self.previous.get(src).copied().unwrap_or(0));

            let (sample, transition) = voice.next_sample(offset);
            if let Some(slot) = self.cache.get_mut(voice.index()) {
                *slot = sample as i32;
            }
            if let Some(stage) = transition {
                on_event(voice.index(), stage);
            }
        }

        let mut acc: i32 = 0;
        for voice in voices.iter_mut() {
            if voice.config().is_modulator || voice.is_silent() {
                continue;
            }
            let offset = voice
                .config()
                .modulation_source
                .map(|src| self.cache.get(src).copied().unwrap_or(0));

            let (sample, transition) = voice.next_sample(offset);
            acc = acc.saturating_add(sample as i32);
            if let Some(stage) = transition {
                on_event(voice.index(), stage);
            }
        }

        saturate_i16(acc as i64)
    }

    /// Fill `out`, one frame per sample.
    pub fn render<F>(&mut self, voices: &mut [Voice], out: &mut [i16], mut on_event: F)
    where
        F: FnMut(usize, EnvelopeStage),
    {
        for slot in out.iter_mut() {
            *slot = self.render_frame(voices, &mut on_event);
        }
    }
}
