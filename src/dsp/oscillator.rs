use crate::dsp::{fixed::PHASE_FRAC_BITS, wavetable::WaveformTable};

/*
DDS Oscillator
==============

Direct digital synthesis: a phase accumulator steps through a stored
one-cycle table. The step size sets the pitch.

Vocabulary
----------

  accumulator   Current position in the table, Q16 fixed point. The top
                bits select the table entry, the low 16 bits remember how
                far we are between entries.

  increment     How far the accumulator moves per output sample. Signed:
                a negative increment plays the table backwards.

  span          table_len * 2^16. One full cycle of the accumulator.


The Math
--------

    increment = freq * table_len / sample_rate * 2^16

Example: 440 Hz, 4096-entry table, 44100 Hz
    440 * 4096 / 44100     = 40.867 table entries per sample
    40.867 * 65536         = 2678276 (truncated)

Each sample:
    index        = (accumulator >> 16) mod table_len
    output       = table[index]
    accumulator  = (accumulator + increment) mod span

The modulo is Euclidean, so reverse playback wraps from 0 back to the end
of the table instead of going negative.


Nearest Neighbour
-----------------

We read the table entry under the integer part of the phase and ignore the
fraction. Linear interpolation between neighbours would lower the noise
floor, at the cost of a multiply and a second table read per sample. With a
4096-entry table the truncation error is already small at musical pitches.


Retuning
--------

`set_frequency` only replaces the increment. The accumulator keeps its
value, so retuning mid-cycle is phase-continuous: no jump in the output,
no click. FM relies on this: the carrier is retuned every sample.
*/

pub struct Oscillator {
    table: WaveformTable,
    sample_rate: u32,
    frequency: f64,
    phase_accumulator: u32,
    phase_increment: i64,
}

impl Oscillator {
    pub fn new(table: WaveformTable, sample_rate: u32) -> Self {
        Self {
            table,
            sample_rate: sample_rate.max(1),
            frequency: 0.0,
            phase_accumulator: 0,
            phase_increment: 0,
        }
    }

    /// Phase-continuous retune. Negative frequencies play in reverse.
    pub fn set_frequency(&mut self, freq_hz: f64) {
        self.frequency = freq_hz;
        self.phase_increment = increment_for(freq_hz, self.table.len(), self.sample_rate);
    }

    /// Swap the table. The phase is kept, wrapped into the new span if the
    /// length differs.
    pub fn set_table(&mut self, table: WaveformTable) {
        let len_changed = table.len() != self.table.len();
        self.table = table;
        if len_changed {
            let wrapped = (self.phase_accumulator as i64).rem_euclid(self.span());
            self.phase_accumulator = wrapped as u32;
            self.set_frequency(self.frequency);
        }
    }

    /// Read the current sample and advance the phase.
    #[inline]
    pub fn next_sample(&mut self) -> i16 {
        let index = (self.phase_accumulator >> PHASE_FRAC_BITS) as usize;
        let sample = self.table.get(index);

        let next = self.phase_accumulator as i64 + self.phase_increment;
        self.phase_accumulator = next.rem_euclid(self.span()) as u32;

        sample
    }

    /// Rewind to the start of the table.
    pub fn reset_phase(&mut self) {
        self.phase_accumulator = 0;
    }

    #[inline]
    fn span(&self) -> i64 {
        (self.table.len() as i64) << PHASE_FRAC_BITS
    }

    pub fn table(&self) -> &WaveformTable {
        &self.table
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn phase_accumulator(&self) -> u32 {
        self.phase_accumulator
    }

    pub fn phase_increment(&self) -> i64 {
        self.phase_increment
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// `freq * table_len / sample_rate * 2^16`, truncated toward zero.
///
/// Non-finite frequencies stop the oscillator.
#[inline]
pub fn increment_for(freq_hz: f64, table_len: usize, sample_rate: u32) -> i64 {
    if !freq_hz.is_finite() {
        return 0;
    }
    let scale = (1u64 << PHASE_FRAC_BITS) as f64;
    (freq_hz * table_len as f64 / sample_rate.max(1) as f64 * scale) as i64
}
