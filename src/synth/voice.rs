use std::fmt;

use crate::dsp::{
    envelope::{Envelope, EnvelopeShape, EnvelopeStage},
    fixed::{apply_gain, saturate_i16, AmplitudeRatio},
    oscillator::Oscillator,
    wavetable::{WaveformKind, WaveformTable},
};

/// Fields written by the control side. The render side only reads them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceConfig {
    pub base_frequency: f64,
    pub amplitude: AmplitudeRatio,
    pub waveform: WaveformKind,
    pub envelope: EnvelopeShape,
    pub envelope_enabled: bool,
    pub is_modulator: bool,
    pub modulation_source: Option<usize>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            base_frequency: 440.0,
            amplitude: AmplitudeRatio::ZERO,
            waveform: WaveformKind::None,
            envelope: EnvelopeShape::default(),
            envelope_enabled: false,
            is_modulator: false,
            modulation_source: None,
        }
    }
}

/// One oscillator, one envelope, an amplitude and a routing role.
///
/// Configuration lives in [`VoiceConfig`]; the oscillator phase and the
/// envelope level/stage are transient state owned by the render path.
pub struct Voice {
    index: usize,
    config: VoiceConfig,
    osc: Oscillator,
    env: Envelope,
}

impl Voice {
    /// A silent voice: waveform none, amplitude 0, 440 Hz.
    pub fn new(index: usize, silence: WaveformTable, sample_rate: u32) -> Self {
        let config = VoiceConfig::default();
        let mut osc = Oscillator::new(silence, sample_rate);
        osc.set_frequency(config.base_frequency);
        let env = Envelope::with_shape(config.envelope, sample_rate);

        Self {
            index,
            config,
            osc,
            env,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    pub fn oscillator(&self) -> &Oscillator {
        &self.osc
    }

    pub fn envelope(&self) -> &Envelope {
        &self.env
    }

    /// Retune the base frequency. Non-finite values are ignored.
    pub fn set_frequency(&mut self, hz: f64) {
        if !hz.is_finite() {
            return;
        }
        self.config.base_frequency = hz;
        self.osc.set_frequency(hz);
    }

    pub fn set_amplitude(&mut self, ratio: AmplitudeRatio) {
        self.config.amplitude = ratio;
    }

    pub fn set_waveform(&mut self, kind: WaveformKind, table: WaveformTable) {
        self.config.waveform = kind;
        self.osc.set_table(table);
    }

    /// Replace the envelope shape; the envelope restarts from Idle.
    pub fn set_envelope_shape(&mut self, shape: EnvelopeShape) {
        self.env.set_shape(shape);
        self.config.envelope = self.env.shape();
    }

    pub fn set_envelope_enabled(&mut self, enabled: bool) {
        self.config.envelope_enabled = enabled;
    }

    pub fn set_modulator(&mut self, is_modulator: bool) {
        self.config.is_modulator = is_modulator;
    }

    /// Route FM from `source`. Returns false (and changes nothing) when
    /// `source` is this voice.
    pub fn set_modulation_source(&mut self, source: Option<usize>) -> bool {
        if source == Some(self.index) {
            return false;
        }
        self.config.modulation_source = source;
        if source.is_none() {
            self.osc.set_frequency(self.config.base_frequency);
        }
        true
    }

    pub fn note_on(&mut self) -> EnvelopeStage {
        self.env.note_on()
    }

    pub fn note_off(&mut self) -> EnvelopeStage {
        self.env.note_off()
    }

    /// True when this voice would contribute nothing this frame.
    #[inline]
    pub fn is_silent(&self) -> bool {
        self.config.amplitude.is_silent() || self.osc.table().is_silence()
    }

    /// Produce one sample.
    ///
    /// `fm_offset` retunes the oscillator to `base + offset` Hz first.
    /// Returns the sample and the envelope stage entered this sample, if any.
    #[inline]
    pub fn next_sample(&mut self, fm_offset: Option<i32>) -> (i16, Option<EnvelopeStage>) {
        if let Some(offset) = fm_offset {
            self.osc
                .set_frequency(self.config.base_frequency + offset as f64);
        }

        let raw = self.osc.next_sample() as i32;
        let scaled = self.config.amplitude.scale(raw);

        if self.config.envelope_enabled {
            let transition = self.env.advance();
            (apply_gain(scaled, self.env.gain()), transition)
        } else {
            (saturate_i16(scaled), None)
        }
    }

    pub fn snapshot(&self) -> VoiceSnapshot {
        VoiceSnapshot {
            index: self.index,
            config: self.config,
            frequency: self.osc.frequency(),
            stage: self.env.stage(),
            level: self.env.level(),
        }
    }
}

/// Point-in-time view of a voice for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceSnapshot {
    pub index: usize,
    pub config: VoiceConfig,
    /// Instantaneous oscillator frequency (differs from base under FM).
    pub frequency: f64,
    pub stage: EnvelopeStage,
    pub level: i32,
}

impl fmt::Display for VoiceSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.config;
        write!(
            f,
            "v{} w{} f{} e{} a{} t{} b{} B{},{},{}",
            self.index,
            c.waveform.id(),
            c.base_frequency,
            u8::from(c.envelope_enabled),
            c.amplitude.as_f64(),
            c.amplitude.num,
            c.amplitude.den,
            c.envelope.attack_ms,
            c.envelope.decay_ms,
            c.envelope.release_ms,
        )?;
        if c.is_modulator {
            write!(f, " mod")?;
        }
        if let Some(src) = c.modulation_source {
            write!(f, " <-v{src}")?;
        }
        write!(f, " {:?}:{}", self.stage, self.level)
    }
}
