use std::{fmt, io};

#[derive(Debug)]
pub enum SinkError {
    /// The device ran dry before this write. Call
    /// [`AudioSink::recover`] and write the same buffer again.
    Underrun,
    /// The sink no longer accepts samples.
    Closed,
    Io(io::Error),
    /// Backend-specific failure, stringified.
    Device(String),
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Underrun => write!(f, "audio device underrun"),
            SinkError::Closed => write!(f, "audio sink is closed"),
            SinkError::Io(err) => write!(f, "audio sink I/O error: {err}"),
            SinkError::Device(msg) => write!(f, "audio device error: {msg}"),
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SinkError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for SinkError {
    fn from(err: io::Error) -> Self {
        SinkError::Io(err)
    }
}

/// Destination for rendered mono `i16` buffers.
pub trait AudioSink {
    /// Block until the whole buffer has been accepted.
    fn write(&mut self, samples: &[i16]) -> Result<(), SinkError>;

    /// Re-prime after [`SinkError::Underrun`].
    fn recover(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: AudioSink + ?Sized> AudioSink for Box<S> {
    fn write(&mut self, samples: &[i16]) -> Result<(), SinkError> {
        (**self).write(samples)
    }

    fn recover(&mut self) -> Result<(), SinkError> {
        (**self).recover()
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        (**self).flush()
    }
}

/// Collects everything written. Can be told to fail with underruns.
#[derive(Debug, Default)]
pub struct MemorySink {
    samples: Vec<i16>,
    pending_underruns: usize,
    recoveries: usize,
    writes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` writes with [`SinkError::Underrun`].
    pub fn inject_underruns(&mut self, count: usize) {
        self.pending_underruns += count;
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }

    pub fn recoveries(&self) -> usize {
        self.recoveries
    }

    /// Successful writes.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl AudioSink for MemorySink {
    fn write(&mut self, samples: &[i16]) -> Result<(), SinkError> {
        if self.pending_underruns > 0 {
            self.pending_underruns -= 1;
            return Err(SinkError::Underrun);
        }
        self.samples.extend_from_slice(samples);
        self.writes += 1;
        Ok(())
    }

    fn recover(&mut self) -> Result<(), SinkError> {
        self.recoveries += 1;
        Ok(())
    }
}
