// Purpose - audio sinks and sample format conversions

pub mod converter;
#[cfg(feature = "cpal")]
pub mod cpal_sink;
pub mod file;
pub mod sink;

#[cfg(feature = "cpal")]
pub use cpal_sink::CpalSink;
pub use file::RawFileSink;
pub use sink::{AudioSink, MemorySink, SinkError};
