/// Equal-tempered pitch of a MIDI note, A4 (69) = 440 Hz.
pub fn midi_note_to_freq(note: u8) -> f64 {
    440.0 * 2.0_f64.powf((note as f64 - 69.0) / 12.0)
}

/// Append `samples` to `out` as signed 16-bit little-endian.
pub fn extend_s16le(out: &mut Vec<u8>, samples: &[i16]) {
    out.reserve(samples.len() * 2);
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_pitches() {
        assert_eq!(midi_note_to_freq(69), 440.0);
        assert!((midi_note_to_freq(60) - 261.625_565).abs() < 1e-5);
        assert!((midi_note_to_freq(81) - 880.0).abs() < 1e-9);
    }

    #[test]
    fn little_endian_layout() {
        let mut bytes = Vec::new();
        extend_s16le(&mut bytes, &[1, -2, 0x1234]);
        assert_eq!(bytes, [0x01, 0x00, 0xFE, 0xFF, 0x34, 0x12]);
    }
}
