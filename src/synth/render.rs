use rtrb::Producer;

use crate::{
    config::EngineConfig,
    dsp::{envelope::EnvelopeShape, fixed::AmplitudeRatio, wavetable::WaveBank},
    synth::{
        bank::VoiceBank,
        message::{
            control_channel, event_channel, EventReceiver, MessageReceiver, SynthEvent,
            SynthHandle,
        },
        mixer::Mixer,
        voice::VoiceSnapshot,
    },
};

/// The render-side synthesizer: voice bank, mixer scratch and the
/// receiving ends of the control queue.
pub struct Synth {
    bank: VoiceBank,
    mixer: Mixer,
    sample_rate: u32,
    rx: Option<Box<dyn MessageReceiver + Send>>,
    events: Option<Producer<SynthEvent>>,
    frames_rendered: u64,
}

impl Synth {
    /// A standalone synth driven by direct method calls.
    pub fn new(config: &EngineConfig, waves: WaveBank) -> Self {
        Self {
            bank: VoiceBank::new(config.voices, waves, config.sample_rate),
            mixer: Mixer::new(config.voices),
            sample_rate: config.sample_rate,
            rx: None,
            events: None,
            frames_rendered: 0,
        }
    }

    /// A synth for the render thread, a handle for the control thread and
    /// the receiver for stage-change events.
    pub fn with_handle(
        config: &EngineConfig,
        waves: WaveBank,
    ) -> (Self, SynthHandle, EventReceiver) {
        let (handle, rx) = control_channel(config.voices, config.control_queue);
        let (events_tx, events) = event_channel(config.event_queue);

        let mut synth = Self::new(config, waves);
        synth.rx = Some(Box::new(rx));
        synth.events = Some(events_tx);
        (synth, handle, events)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn voice_count(&self) -> usize {
        self.bank.len()
    }

    pub fn bank(&self) -> &VoiceBank {
        &self.bank
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Apply every queued control message.
    pub fn process_messages(&mut self) -> usize {
        let Some(rx) = self.rx.as_mut() else {
            return 0;
        };
        let mut applied = 0;
        while let Some(msg) = rx.pop() {
            self.bank.apply(msg);
            applied += 1;
        }
        applied
    }

    /// Fill `out` with the next `out.len()` mono samples.
    pub fn render(&mut self, out: &mut [i16]) {
        self.process_messages();

        let events = &mut self.events;
        self.mixer
            .render(self.bank.voices_mut(), out, |voice, stage| {
                if let Some(tx) = events.as_mut() {
                    // dropped when the control side is not keeping up
                    let _ = tx.push(SynthEvent::StageChanged { voice, stage });
                }
            });

        self.frames_rendered += out.len() as u64;
    }

    pub fn snapshot(&self) -> Vec<VoiceSnapshot> {
        self.bank.snapshot()
    }

    pub fn set_frequency(&mut self, voice: usize, hz: f64) {
        self.bank.set_frequency(voice, hz);
    }

    pub fn set_note(&mut self, voice: usize, note: u8) {
        self.bank.set_note(voice, note);
    }

    pub fn set_amplitude(&mut self, voice: usize, amplitude: f64) {
        self.bank.set_amplitude(voice, AmplitudeRatio::from_f64(amplitude));
    }

    pub fn set_amplitude_ratio(&mut self, voice: usize, num: i32, den: i32) {
        self.bank.set_amplitude(voice, AmplitudeRatio::new(num, den));
    }

    pub fn set_waveform(&mut self, voice: usize, table_id: u8) {
        self.bank.set_waveform(voice, table_id);
    }

    pub fn set_envelope_shape(
        &mut self,
        voice: usize,
        attack_ms: u32,
        decay_ms: u32,
        release_ms: u32,
        attack_level: i32,
        sustain_level: i32,
    ) {
        let shape =
            EnvelopeShape::new(attack_ms, decay_ms, release_ms, attack_level, sustain_level);
        self.bank.set_envelope_shape(voice, shape);
    }

    pub fn set_envelope_enabled(&mut self, voice: usize, enabled: bool) {
        self.bank.set_envelope_enabled(voice, enabled);
    }

    pub fn set_modulator(&mut self, voice: usize, is_modulator: bool) {
        self.bank.set_modulator(voice, is_modulator);
    }

    pub fn set_modulation_source(&mut self, voice: usize, source: Option<usize>) {
        self.bank.set_modulation_source(voice, source);
    }

    pub fn note_on(&mut self, voice: usize) {
        self.bank.note_on(voice);
    }

    pub fn note_off(&mut self, voice: usize) {
        self.bank.note_off(voice);
    }

    pub fn all_notes_off(&mut self) {
        self.bank.all_notes_off();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::envelope::EnvelopeStage;

    fn config() -> EngineConfig {
        EngineConfig::default()
            .with_sample_rate(8_000)
            .with_table_len(256)
            .with_voices(2)
    }

    #[test]
    fn messages_apply_before_the_buffer() {
        let (mut synth, mut handle, _events) =
            Synth::with_handle(&config(), WaveBank::with_noise_seed(256, 1));

        let mut out = [0i16; 16];
        synth.render(&mut out);
        assert!(out.iter().all(|&s| s == 0));

        handle.set_waveform(0, 1).unwrap();
        handle.set_amplitude(0, 1.0).unwrap();
        synth.render(&mut out);
        assert_eq!(out[0], 32766);
        assert_eq!(synth.frames_rendered(), 32);
    }

    #[test]
    fn stage_changes_reach_the_event_queue() {
        let (mut synth, mut handle, mut events) =
            Synth::with_handle(&config(), WaveBank::with_noise_seed(256, 1));
        handle.set_waveform(1, 0).unwrap();
        handle.set_amplitude(1, 0.5).unwrap();
        handle.set_envelope_shape(1, 1, 1, 1, 1 << 15, 0).unwrap();
        handle.set_envelope_enabled(1, true).unwrap();
        handle.note_on(1).unwrap();

        let mut out = [0i16; 64];
        synth.render(&mut out);

        let stages: Vec<_> = events
            .drain()
            .into_iter()
            .map(|SynthEvent::StageChanged { voice, stage }| (voice, stage))
            .collect();
        assert_eq!(
            stages,
            vec![(1, EnvelopeStage::Decay), (1, EnvelopeStage::Sustain)]
        );
    }

    #[test]
    fn direct_calls_without_queue() {
        let mut synth = Synth::new(&config(), WaveBank::with_noise_seed(256, 1));
        assert_eq!(synth.process_messages(), 0);
        synth.set_waveform(0, 1);
        synth.set_amplitude_ratio(0, 1, 2);
        let mut out = [0i16; 1];
        synth.render(&mut out);
        assert_eq!(out[0], 16383);
        assert!(synth.snapshot()[0].to_string().starts_with("v0 w1 f440 e0 a0.5 t1 b2"));
    }
}
