//! One-cycle waveform tables and the bank that owns them.

use std::{fmt, sync::Arc};

use rand::{rngs::SmallRng, Rng, SeedableRng};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::fixed::{SAMPLE_MAX, SAMPLE_MIN};

/*
Wavetables
==========

A wavetable holds exactly one cycle of a waveform. The oscillator walks
through it at a speed proportional to the target frequency; the table itself
never changes after startup.

    index:  0 ........ n/4 ........ n/2 ........ 3n/4 ........ n-1
    sine:   0   ->    peak    ->     0     ->   -peak   ->    ~0
    square: peak .................. | -peak ..................
    saw up: 0 -----------------------------------------> ~peak

Tables are shared: every voice that selects "sine" reads the same
`Arc<[i16]>`. Selecting a waveform is a reference-count bump, never a copy.

Silence is a real table of zeros rather than an empty one. An empty table
would need a special case in the oscillator's modulo; a zero table needs
none, and the mixer can still recognise it and skip the voice.

User slots start out silent and may be loaded once, before the bank is
handed to the engine.
*/

/// Table length used when none is configured.
pub const DEFAULT_TABLE_LEN: usize = 4096;

/// Largest supported table length. Keeps `len << 16` inside `u32`.
pub const MAX_TABLE_LEN: usize = 1 << 15;

/// Number of user-loadable table slots.
pub const USER_SLOTS: usize = 5;

/// Every selectable waveform, numbered as the control protocol numbers them.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaveformKind {
    Sine,
    Square,
    SawDown,
    SawUp,
    Triangle,
    Noise,
    User(u8),
    None,
}

impl WaveformKind {
    /// Number of distinct waveform ids (0..COUNT).
    pub const COUNT: usize = 12;

    /// Map a protocol id to a waveform. Out-of-range ids return `None`.
    pub fn from_id(id: u8) -> Option<Self> {
        let kind = match id {
            0 => Self::Sine,
            1 => Self::Square,
            2 => Self::SawDown,
            3 => Self::SawUp,
            4 => Self::Triangle,
            5 => Self::Noise,
            6..=10 => Self::User(id - 6),
            11 => Self::None,
            _ => return None,
        };
        Some(kind)
    }

    pub fn id(self) -> u8 {
        match self {
            Self::Sine => 0,
            Self::Square => 1,
            Self::SawDown => 2,
            Self::SawUp => 3,
            Self::Triangle => 4,
            Self::Noise => 5,
            Self::User(slot) => 6 + slot.min(USER_SLOTS as u8 - 1),
            Self::None => 11,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sine => "sine",
            Self::Square => "sqr",
            Self::SawDown => "sawd",
            Self::SawUp => "sawu",
            Self::Triangle => "tri",
            Self::Noise => "noiz",
            Self::User(_) => "usr",
            Self::None => "none",
        }
    }
}

/// An immutable single-cycle table of signed samples.
#[derive(Clone)]
pub struct WaveformTable {
    samples: Arc<[i16]>,
    silent: bool,
}

impl WaveformTable {
    /// Wrap existing samples. An empty slice becomes a single zero sample;
    /// anything past [`MAX_TABLE_LEN`] is cut off.
    pub fn from_samples(samples: &[i16]) -> Self {
        let samples: Arc<[i16]> = if samples.is_empty() {
            Arc::from([0i16].as_slice())
        } else {
            Arc::from(&samples[..samples.len().min(MAX_TABLE_LEN)])
        };
        let silent = samples.iter().all(|&s| s == 0);
        Self { samples, silent }
    }

    /// All-zero table of the given length (at least one sample).
    pub fn silence(len: usize) -> Self {
        Self::from_samples(&vec![0; len.max(1)])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false: a table holds at least one sample.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// True when every sample is zero.
    #[inline]
    pub fn is_silence(&self) -> bool {
        self.silent
    }

    #[inline]
    pub fn get(&self, index: usize) -> i16 {
        self.samples[index % self.samples.len()]
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// True when both handles point at the same shared storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.samples, &other.samples)
    }
}

impl fmt::Debug for WaveformTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaveformTable")
            .field("len", &self.len())
            .field("silent", &self.silent)
            .finish()
    }
}

/// Build a table of `kind` with `length` samples.
///
/// Noise is seeded from the OS; use [`generate_seeded`] for repeatable noise.
pub fn generate(kind: WaveformKind, length: usize) -> WaveformTable {
    generate_seeded(kind, length, rand::random())
}

/// Build a table of `kind`, seeding the noise generator with `seed`.
///
/// `length` is clamped to `1..=MAX_TABLE_LEN`.
pub fn generate_seeded(kind: WaveformKind, length: usize, seed: u64) -> WaveformTable {
    let n = length.clamp(1, MAX_TABLE_LEN);
    let samples: Vec<i16> = match kind {
        WaveformKind::Sine => (0..n).map(|i| sine_at(i, n)).collect(),
        WaveformKind::Square => (0..n)
            .map(|i| if i < n / 2 { SAMPLE_MAX } else { SAMPLE_MIN })
            .collect(),
        WaveformKind::Triangle => (0..n).map(|i| triangle_at(i, n)).collect(),
        WaveformKind::SawUp => {
            let step = SAMPLE_MAX as i64 / n as i64;
            (0..n).map(|i| (i as i64 * step) as i16).collect()
        }
        WaveformKind::SawDown => {
            let step = SAMPLE_MAX as i64 / n as i64;
            (0..n)
                .map(|i| (SAMPLE_MAX as i64 - i as i64 * step) as i16)
                .collect()
        }
        WaveformKind::Noise => {
            let mut rng = SmallRng::seed_from_u64(seed);
            (0..n)
                .map(|_| (rng.random_range(-0.5f64..0.5) * SAMPLE_MAX as f64) as i16)
                .collect()
        }
        WaveformKind::User(_) | WaveformKind::None => vec![0; n],
    };
    WaveformTable::from_samples(&samples)
}

fn sine_at(i: usize, n: usize) -> i16 {
    let phase = std::f64::consts::TAU * i as f64 / n as f64;
    (SAMPLE_MAX as f64 * phase.sin()) as i16
}

fn triangle_at(i: usize, n: usize) -> i16 {
    // Same integer ramps as the classic quarter-wave construction, computed
    // in i64 so large tables cannot overflow.
    let (i, n) = (i as i64, n as i64);
    let peak = SAMPLE_MAX as i64;
    let quarter = n / 4;
    let value = if i < quarter {
        4 * peak * i / n
    } else if i < 3 * quarter {
        peak - 4 * peak * (i - quarter) / n
    } else {
        SAMPLE_MIN as i64 + 4 * peak * (i - 3 * quarter) / n
    };
    value.clamp(SAMPLE_MIN as i64, SAMPLE_MAX as i64) as i16
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaveError {
    /// Only `WaveformKind::User` slots can be replaced.
    NotUserSlot(WaveformKind),
    /// User slot index past the last slot.
    SlotOutOfRange(u8),
    /// Loaded table length must match the bank's.
    LengthMismatch { expected: usize, found: usize },
}

impl fmt::Display for WaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaveError::NotUserSlot(kind) => {
                write!(f, "waveform {} is built in and cannot be replaced", kind.name())
            }
            WaveError::SlotOutOfRange(slot) => {
                write!(f, "user slot {slot} out of range (0..{USER_SLOTS})")
            }
            WaveError::LengthMismatch { expected, found } => {
                write!(f, "table has {found} samples, bank expects {expected}")
            }
        }
    }
}

impl std::error::Error for WaveError {}

/// The startup set of tables, one per waveform id.
#[derive(Debug, Clone)]
pub struct WaveBank {
    table_len: usize,
    tables: Vec<WaveformTable>,
}

impl WaveBank {
    /// Generate every built-in table at `table_len` samples.
    pub fn new(table_len: usize) -> Self {
        Self::with_noise_seed(table_len, rand::random())
    }

    /// Like [`WaveBank::new`], with a fixed noise seed.
    pub fn with_noise_seed(table_len: usize, seed: u64) -> Self {
        let table_len = table_len.clamp(1, MAX_TABLE_LEN);
        let tables = (0..WaveformKind::COUNT as u8)
            .filter_map(WaveformKind::from_id)
            .map(|kind| generate_seeded(kind, table_len, seed))
            .collect();
        Self { table_len, tables }
    }

    pub fn table_len(&self) -> usize {
        self.table_len
    }

    pub fn table(&self, kind: WaveformKind) -> &WaveformTable {
        &self.tables[kind.id() as usize]
    }

    /// The shared silence table.
    pub fn silence(&self) -> &WaveformTable {
        self.table(WaveformKind::None)
    }

    /// Replace a user slot. Must happen before voices select it.
    pub fn load_user(&mut self, kind: WaveformKind, samples: &[i16]) -> Result<(), WaveError> {
        let WaveformKind::User(slot) = kind else {
            return Err(WaveError::NotUserSlot(kind));
        };
        if slot as usize >= USER_SLOTS {
            return Err(WaveError::SlotOutOfRange(slot));
        }
        if samples.len() != self.table_len {
            return Err(WaveError::LengthMismatch {
                expected: self.table_len,
                found: samples.len(),
            });
        }
        self.tables[kind.id() as usize] = WaveformTable::from_samples(samples);
        Ok(())
    }
}
