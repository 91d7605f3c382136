use crate::{
    dsp::{
        envelope::EnvelopeShape,
        fixed::AmplitudeRatio,
        wavetable::{WaveBank, WaveformKind},
    },
    io::converter::midi_note_to_freq,
    synth::{
        message::ControlMessage,
        voice::{Voice, VoiceSnapshot},
    },
};

/// Fixed pool of voices plus the tables they draw from.
///
/// Every setter ignores an out-of-range voice index.
pub struct VoiceBank {
    voices: Vec<Voice>,
    waves: WaveBank,
}

impl VoiceBank {
    pub fn new(voice_count: usize, waves: WaveBank, sample_rate: u32) -> Self {
        let voices = (0..voice_count)
            .map(|i| Voice::new(i, waves.silence().clone(), sample_rate))
            .collect();
        Self { voices, waves }
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn voices_mut(&mut self) -> &mut [Voice] {
        &mut self.voices
    }

    pub fn waves(&self) -> &WaveBank {
        &self.waves
    }

    pub fn set_frequency(&mut self, voice: usize, hz: f64) {
        if let Some(v) = self.voices.get_mut(voice) {
            v.set_frequency(hz);
        }
    }

    pub fn set_note(&mut self, voice: usize, note: u8) {
        self.set_frequency(voice, midi_note_to_freq(note));
    }

    pub fn set_amplitude(&mut self, voice: usize, ratio: AmplitudeRatio) {
        if let Some(v) = self.voices.get_mut(voice) {
            v.set_amplitude(ratio);
        }
    }

    /// Select a table by id. Unknown ids are ignored.
    pub fn set_waveform(&mut self, voice: usize, table_id: u8) {
        let Some(kind) = WaveformKind::from_id(table_id) else {
            return;
        };
        let table = self.waves.table(kind).clone();
        if let Some(v) = self.voices.get_mut(voice) {
            v.set_waveform(kind, table);
        }
    }

    pub fn set_envelope_shape(&mut self, voice: usize, shape: EnvelopeShape) {
        if let Some(v) = self.voices.get_mut(voice) {
            v.set_envelope_shape(shape);
        }
    }

    pub fn set_envelope_enabled(&mut self, voice: usize, enabled: bool) {
        if let Some(v) = self.voices.get_mut(voice) {
            v.set_envelope_enabled(enabled);
        }
    }

    pub fn set_modulator(&mut self, voice: usize, is_modulator: bool) {
        if let Some(v) = self.voices.get_mut(voice) {
            v.set_modulator(is_modulator);
        }
    }

    pub fn set_modulation_source(&mut self, voice: usize, source: Option<usize>) {
        if let Some(v) = self.voices.get_mut(voice) {
            v.set_modulation_source(source);
        }
    }

    pub fn note_on(&mut self, voice: usize) {
        if let Some(v) = self.voices.get_mut(voice) {
            v.note_on();
        }
    }

    pub fn note_off(&mut self, voice: usize) {
        if let Some(v) = self.voices.get_mut(voice) {
            v.note_off();
        }
    }

    pub fn all_notes_off(&mut self) {
        for v in &mut self.voices {
            v.note_off();
        }
    }

    pub fn apply(&mut self, msg: ControlMessage) {
        match msg {
            ControlMessage::SetFrequency { voice, hz } => self.set_frequency(voice, hz),
            ControlMessage::SetNote { voice, note } => self.set_note(voice, note),
            ControlMessage::SetAmplitude { voice, ratio } => self.set_amplitude(voice, ratio),
            ControlMessage::SetWaveform { voice, table_id } => self.set_waveform(voice, table_id),
            ControlMessage::SetEnvelopeShape { voice, shape } => {
                self.set_envelope_shape(voice, shape)
            }
            ControlMessage::SetEnvelopeEnabled { voice, enabled } => {
                self.set_envelope_enabled(voice, enabled)
            }
            ControlMessage::SetModulator {
                voice,
                is_modulator,
            } => self.set_modulator(voice, is_modulator),
            ControlMessage::SetModulationSource { voice, source } => {
                self.set_modulation_source(voice, source)
            }
            ControlMessage::NoteOn { voice } => self.note_on(voice),
            ControlMessage::NoteOff { voice } => self.note_off(voice),
            ControlMessage::AllNotesOff => self.all_notes_off(),
        }
    }

    pub fn snapshot(&self) -> Vec<VoiceSnapshot> {
        self.voices.iter().map(Voice::snapshot).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::envelope::EnvelopeStage;

    fn bank() -> VoiceBank {
        VoiceBank::new(4, WaveBank::with_noise_seed(256, 3), 8_000)
    }

    #[test]
    fn out_of_range_voice_is_ignored() {
        let mut bank = bank();
        let before = bank.snapshot();
        bank.set_frequency(4, 100.0);
        bank.set_waveform(17, 0);
        bank.note_on(99);
        assert_eq!(bank.snapshot(), before);
    }

    #[test]
    fn unknown_table_id_is_ignored() {
        let mut bank = bank();
        bank.set_waveform(0, 12);
        assert_eq!(bank.voice(0).map(|v| v.config().waveform), Some(WaveformKind::None));
        bank.set_waveform(0, 0);
        assert_eq!(bank.voice(0).map(|v| v.config().waveform), Some(WaveformKind::Sine));
    }

    #[test]
    fn voices_share_tables() {
        let mut bank = bank();
        bank.set_waveform(0, 4);
        bank.set_waveform(1, 4);
        let a = bank.voice(0).map(|v| v.oscillator().table().clone());
        let b = bank.voice(1).map(|v| v.oscillator().table().clone());
        assert!(a.zip(b).is_some_and(|(a, b)| a.ptr_eq(&b)));
    }

    #[test]
    fn messages_apply_like_direct_calls() {
        let mut direct = bank();
        direct.set_note(2, 69);
        direct.note_on(2);
        direct.set_modulator(1, true);

        let mut queued = bank();
        queued.apply(ControlMessage::SetNote { voice: 2, note: 69 });
        queued.apply(ControlMessage::NoteOn { voice: 2 });
        queued.apply(ControlMessage::SetModulator { voice: 1, is_modulator: true });

        assert_eq!(direct.snapshot(), queued.snapshot());
        assert_eq!(queued.voice(2).map(|v| v.config().base_frequency), Some(440.0));
    }

    #[test]
    fn all_notes_off_releases_every_voice() {
        let mut bank = bank();
        bank.note_on(0);
        bank.note_on(3);
        bank.apply(ControlMessage::AllNotesOff);
        let stages: Vec<_> = bank.voices().iter().map(|v| v.envelope().stage()).collect();
        assert_eq!(
            stages,
            vec![
                EnvelopeStage::Release,
                EnvelopeStage::Idle,
                EnvelopeStage::Idle,
                EnvelopeStage::Release
            ]
        );
    }
}
