use std::path::PathBuf;

use clap::Parser;
use ddsynth::EngineConfig;
use tracing::Level;

/// Play a DDS patch through the sound card or into a raw s16le file.
#[derive(Debug, Parser)]
#[command(name = "ddsynth", version, about)]
pub struct Args {
    /// Output sample rate in Hz
    #[arg(short = 'r', long, default_value_t = ddsynth::config::DEFAULT_SAMPLE_RATE)]
    pub sample_rate: u32,

    /// Frames per rendered period
    #[arg(short, long, default_value_t = ddsynth::config::DEFAULT_PERIOD_FRAMES)]
    pub period: usize,

    /// How far rendering may run ahead of real time, in milliseconds
    #[arg(short = 'l', long = "latency", default_value_t = ddsynth::config::DEFAULT_SLACK_MS)]
    pub slack_ms: u64,

    /// Size of the voice pool
    #[arg(long, default_value_t = ddsynth::config::DEFAULT_VOICES)]
    pub voices: usize,

    /// How long to play, in seconds
    #[arg(short, long, default_value_t = 5.0)]
    pub seconds: f64,

    /// Write raw s16le mono to this file instead of the audio device
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Render as fast as possible (file output only)
    #[arg(long, requires = "output")]
    pub no_pace: bool,

    /// Carrier pitch in Hz
    #[arg(short, long, default_value_t = 440.0)]
    pub frequency: f64,

    /// Carrier amplitude, 0.0 to 1.0
    #[arg(short, long, default_value_t = 0.25)]
    pub amplitude: f64,

    /// Modulator amplitude. The modulator's output is added to the
    /// carrier's frequency in Hz, so 0.001 swings about +/-33 Hz.
    #[arg(long, default_value_t = 0.001)]
    pub fm_depth: f64,

    /// Modulator rate in Hz
    #[arg(long, default_value_t = 0.25)]
    pub fm_rate: f64,

    /// Gate carriers through their ADSR envelope
    #[arg(short, long)]
    pub envelope: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn engine_config(&self) -> EngineConfig {
        let slack_ms = if self.no_pace { u64::MAX } else { self.slack_ms };
        EngineConfig::default()
            .with_sample_rate(self.sample_rate)
            .with_period_frames(self.period)
            .with_slack_ms(slack_ms)
            .with_voices(self.voices)
    }

    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}
