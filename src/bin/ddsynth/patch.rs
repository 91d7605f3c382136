use ddsynth::{dsp::wavetable::WaveformKind, ControlError, SynthHandle};

use crate::args::Args;

/// Voices below this index get the carrier/modulator pairs; the rest stay
/// silent.
const PATCHED_VOICES: usize = 4;

/// Carrier on every even voice, a slow sine modulator on the odd voice
/// after it. Returns the carrier indices.
pub fn load_default(handle: &mut SynthHandle, args: &Args) -> Result<Vec<usize>, ControlError> {
    let sine = WaveformKind::Sine.id();
    let pairs = PATCHED_VOICES.min(handle.voice_count());
    let mut carriers = Vec::new();

    for carrier in (0..pairs).step_by(2) {
        let modulator = carrier + 1;

        handle.set_waveform(carrier, sine)?;
        handle.set_frequency(carrier, args.frequency)?;
        handle.set_amplitude(carrier, args.amplitude)?;
        handle.set_envelope_enabled(carrier, args.envelope)?;
        carriers.push(carrier);

        if modulator >= handle.voice_count() {
            break;
        }
        handle.set_waveform(modulator, sine)?;
        handle.set_frequency(modulator, args.fm_rate)?;
        handle.set_amplitude(modulator, args.fm_depth)?;
        handle.set_modulator(modulator, true)?;
        handle.set_modulation_source(carrier, Some(modulator))?;
    }

    Ok(carriers)
}
