use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use crate::io::{
    converter::extend_s16le,
    sink::{AudioSink, SinkError},
};

/// Writes headerless signed 16-bit little-endian mono, the same layout
/// `aplay -f S16_LE -c 1` expects.
pub struct RawFileSink<W: Write = BufWriter<File>> {
    out: W,
    scratch: Vec<u8>,
    samples_written: u64,
}

impl RawFileSink<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let file = File::create(path)?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }
}

impl<W: Write> RawFileSink<W> {
    pub fn from_writer(out: W) -> Self {
        Self {
            out,
            scratch: Vec::new(),
            samples_written: 0,
        }
    }

    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> AudioSink for RawFileSink<W> {
    fn write(&mut self, samples: &[i16]) -> Result<(), SinkError> {
        self.scratch.clear();
        extend_s16le(&mut self.scratch, samples);
        self.out.write_all(&self.scratch)?;
        self.samples_written += samples.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_little_endian_pairs() {
        let mut sink = RawFileSink::from_writer(Vec::new());
        sink.write(&[0x0102, -1]).unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.samples_written(), 2);
        assert_eq!(sink.into_inner(), vec![0x02, 0x01, 0xFF, 0xFF]);
    }
}
