use std::fmt;

use rtrb::{Consumer, Producer, RingBuffer};

use crate::dsp::{
    envelope::{EnvelopeShape, EnvelopeStage},
    fixed::AmplitudeRatio,
};

/// A configuration change for one voice, applied at the next buffer
/// boundary.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ControlMessage {
    SetFrequency { voice: usize, hz: f64 },
    SetNote { voice: usize, note: u8 },
    SetAmplitude { voice: usize, ratio: AmplitudeRatio },
    SetWaveform { voice: usize, table_id: u8 },
    SetEnvelopeShape { voice: usize, shape: EnvelopeShape },
    SetEnvelopeEnabled { voice: usize, enabled: bool },
    SetModulator { voice: usize, is_modulator: bool },
    SetModulationSource { voice: usize, source: Option<usize> },
    NoteOn { voice: usize },
    NoteOff { voice: usize },
    AllNotesOff,
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<ControlMessage>;
}

impl MessageReceiver for Consumer<ControlMessage> {
    fn pop(&mut self) -> Option<ControlMessage> {
        Consumer::pop(self).ok()
    }
}

/// Things the render side reports back.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SynthEvent {
    StageChanged { voice: usize, stage: EnvelopeStage },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlError {
    /// The render side has not drained the queue yet.
    QueueFull,
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlError::QueueFull => write!(f, "control queue is full"),
        }
    }
}

impl std::error::Error for ControlError {}

/// Build the control queue: a handle for the control thread, a receiver
/// for the render thread.
pub fn control_channel(
    voice_count: usize,
    capacity: usize,
) -> (SynthHandle, Consumer<ControlMessage>) {
    let (tx, rx) = RingBuffer::new(capacity.max(1));
    (SynthHandle { tx, voice_count }, rx)
}

/// Build the event queue feeding an [`EventReceiver`].
pub fn event_channel(capacity: usize) -> (Producer<SynthEvent>, EventReceiver) {
    let (tx, rx) = RingBuffer::new(capacity.max(1));
    (tx, EventReceiver { rx })
}

/// Control-side entry point. Every call becomes one [`ControlMessage`].
///
/// Out-of-range voice indices and self-modulation are dropped here with a
/// `trace!` and never reach the queue.
pub struct SynthHandle {
    tx: Producer<ControlMessage>,
    voice_count: usize,
}

impl SynthHandle {
    pub fn voice_count(&self) -> usize {
        self.voice_count
    }

    /// Free slots left in the queue.
    pub fn capacity_left(&self) -> usize {
        self.tx.slots()
    }

    /// Push a raw message. Voice indices are not checked.
    pub fn send(&mut self, msg: ControlMessage) -> Result<(), ControlError> {
        self.tx.push(msg).map_err(|_| ControlError::QueueFull)
    }

    fn send_to(&mut self, voice: usize, msg: ControlMessage) -> Result<(), ControlError> {
        if voice >= self.voice_count {
            tracing::trace!(voice, ?msg, "ignoring message for unknown voice");
            return Ok(());
        }
        self.send(msg)
    }

    pub fn set_frequency(&mut self, voice: usize, hz: f64) -> Result<(), ControlError> {
        self.send_to(voice, ControlMessage::SetFrequency { voice, hz })
    }

    pub fn set_note(&mut self, voice: usize, note: u8) -> Result<(), ControlError> {
        self.send_to(voice, ControlMessage::SetNote { voice, note })
    }

    /// Amplitude as a float, quantised to 1/10000.
    pub fn set_amplitude(&mut self, voice: usize, amplitude: f64) -> Result<(), ControlError> {
        let ratio = AmplitudeRatio::from_f64(amplitude);
        self.send_to(voice, ControlMessage::SetAmplitude { voice, ratio })
    }

    pub fn set_amplitude_ratio(
        &mut self,
        voice: usize,
        num: i32,
        den: i32,
    ) -> Result<(), ControlError> {
        let ratio = AmplitudeRatio::new(num, den);
        self.send_to(voice, ControlMessage::SetAmplitude { voice, ratio })
    }

    pub fn set_waveform(&mut self, voice: usize, table_id: u8) -> Result<(), ControlError> {
        self.send_to(voice, ControlMessage::SetWaveform { voice, table_id })
    }

    pub fn set_envelope_shape(
        &mut self,
        voice: usize,
        attack_ms: u32,
        decay_ms: u32,
        release_ms: u32,
        attack_level: i32,
        sustain_level: i32,
    ) -> Result<(), ControlError> {
        let shape =
            EnvelopeShape::new(attack_ms, decay_ms, release_ms, attack_level, sustain_level);
        self.send_to(voice, ControlMessage::SetEnvelopeShape { voice, shape })
    }

    pub fn set_envelope_enabled(
        &mut self,
        voice: usize,
        enabled: bool,
    ) -> Result<(), ControlError> {
        self.send_to(voice, ControlMessage::SetEnvelopeEnabled { voice, enabled })
    }

    pub fn set_modulator(&mut self, voice: usize, is_modulator: bool) -> Result<(), ControlError> {
        self.send_to(voice, ControlMessage::SetModulator { voice, is_modulator })
    }

    pub fn set_modulation_source(
        &mut self,
        voice: usize,
        source: Option<usize>,
    ) -> Result<(), ControlError> {
        if source == Some(voice) {
            tracing::trace!(voice, "ignoring self-modulation");
            return Ok(());
        }
        self.send_to(voice, ControlMessage::SetModulationSource { voice, source })
    }

    pub fn note_on(&mut self, voice: usize) -> Result<(), ControlError> {
        self.send_to(voice, ControlMessage::NoteOn { voice })
    }

    pub fn note_off(&mut self, voice: usize) -> Result<(), ControlError> {
        self.send_to(voice, ControlMessage::NoteOff { voice })
    }

    pub fn all_notes_off(&mut self) -> Result<(), ControlError> {
        self.send(ControlMessage::AllNotesOff)
    }
}

/// Control-side end of the event queue.
pub struct EventReceiver {
    rx: Consumer<SynthEvent>,
}

impl EventReceiver {
    pub fn pop(&mut self) -> Option<SynthEvent> {
        self.rx.pop().ok()
    }

    /// Take everything currently queued.
    pub fn drain(&mut self) -> Vec<SynthEvent> {
        std::iter::from_fn(|| self.pop()).collect()
    }

    /// Drain and log at `debug`. Returns how many events were logged.
    pub fn log_pending(&mut self) -> usize {
        let mut count = 0;
        while let Some(event) = self.pop() {
            match event {
                SynthEvent::StageChanged { voice, stage } => {
                    tracing::debug!(voice, ?stage, "envelope stage changed");
                }
            }
            count += 1;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_drops_unknown_voices() {
        let (mut handle, mut rx) = control_channel(4, 8);
        handle.set_frequency(9, 100.0).unwrap();
        handle.note_on(4).unwrap();
        assert!(rx.pop().is_err());

        handle.note_on(3).unwrap();
        assert_eq!(rx.pop().ok(), Some(ControlMessage::NoteOn { voice: 3 }));
    }

    #[test]
    fn handle_drops_self_modulation() {
        let (mut handle, mut rx) = control_channel(4, 8);
        handle.set_modulation_source(2, Some(2)).unwrap();
        assert!(rx.pop().is_err());
    }

    #[test]
    fn amplitude_is_reduced_before_sending() {
        let (mut handle, mut rx) = control_channel(2, 8);
        handle.set_amplitude(0, 0.25).unwrap();
        handle.set_amplitude_ratio(1, 6, 8).unwrap();
        assert_eq!(
            rx.pop().ok(),
            Some(ControlMessage::SetAmplitude { voice: 0, ratio: AmplitudeRatio::new(1, 4) })
        );
        assert_eq!(
            rx.pop().ok(),
            Some(ControlMessage::SetAmplitude { voice: 1, ratio: AmplitudeRatio::new(3, 4) })
        );
    }

    #[test]
    fn full_queue_is_reported() {
        let (mut handle, _rx) = control_channel(1, 2);
        handle.note_on(0).unwrap();
        handle.note_off(0).unwrap();
        assert_eq!(handle.capacity_left(), 0);
        assert_eq!(handle.note_on(0), Err(ControlError::QueueFull));
    }

    #[test]
    fn events_drain_in_order() {
        let (mut tx, mut events) = event_channel(4);
        tx.push(SynthEvent::StageChanged { voice: 0, stage: EnvelopeStage::Decay })
            .unwrap();
        tx.push(SynthEvent::StageChanged { voice: 1, stage: EnvelopeStage::Idle })
            .unwrap();
        assert_eq!(events.drain().len(), 2);
        assert!(events.pop().is_none());
        assert_eq!(events.log_pending(), 0);
    }
}
