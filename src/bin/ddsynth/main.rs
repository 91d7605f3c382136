//! ddsynth - play a DDS patch
//!
//! Run with: cargo run --features cpal -- --envelope
//!       or: cargo run -- -o out.raw --no-pace && aplay -f S16_LE -r 44100 -c 1 out.raw

mod args;
mod patch;

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use clap::Parser;
use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use ddsynth::{
    dsp::wavetable::WaveBank,
    io::{AudioSink, RawFileSink, SinkError},
    EngineConfig, RenderLoop, RunStats, Synth,
};

use args::Args;

const CONTROL_TICK: Duration = Duration::from_millis(50);

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level())
        .with_target(false)
        .init();

    let config = args.engine_config();
    config.validate().wrap_err("invalid engine configuration")?;

    let waves = WaveBank::new(config.table_len);
    let (synth, mut handle, mut events) = Synth::with_handle(&config, waves);
    let carriers = patch::load_default(&mut handle, &args).wrap_err("failed to load patch")?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let render = spawn_render(synth, config, args.output.clone(), shutdown.clone())?;

    for &voice in &carriers {
        handle.note_on(voice)?;
    }
    tracing::info!(?carriers, seconds = args.seconds, "playing");

    let started = Instant::now();
    let total = Duration::from_secs_f64(args.seconds.max(0.0));
    let release_at = total.mul_f64(0.6);
    let mut released = false;

    while started.elapsed() < total && !render.is_finished() {
        if !released && started.elapsed() >= release_at {
            handle.all_notes_off()?;
            released = true;
        }
        events.log_pending();
        thread::sleep(CONTROL_TICK);
    }

    shutdown.store(true, Ordering::Release);
    let stats = render
        .join()
        .map_err(|_| eyre!("render thread panicked"))?
        .wrap_err("render loop failed")?;
    events.log_pending();

    tracing::info!(
        frames = stats.frames,
        underruns = stats.underruns,
        slept_ms = stats.slept.as_millis() as u64,
        "done"
    );
    Ok(())
}

fn spawn_render(
    mut synth: Synth,
    config: EngineConfig,
    output: Option<std::path::PathBuf>,
    shutdown: Arc<AtomicBool>,
) -> EyreResult<thread::JoinHandle<Result<RunStats, SinkError>>> {
    thread::Builder::new()
        .name("render".into())
        .spawn(move || {
            // opened here: device streams may not cross threads
            let mut sink = open_sink(&config, output)?;
            for line in synth.snapshot() {
                tracing::debug!("{line}");
            }
            RenderLoop::new(&config).run(&mut synth, &mut sink, &shutdown)
        })
        .wrap_err("failed to spawn render thread")
}

fn open_sink(
    config: &EngineConfig,
    output: Option<std::path::PathBuf>,
) -> Result<Box<dyn AudioSink>, SinkError> {
    if let Some(path) = output {
        tracing::info!(path = %path.display(), "writing raw s16le");
        return Ok(Box::new(RawFileSink::create(path)?));
    }
    open_device(config)
}

#[cfg(feature = "cpal")]
fn open_device(config: &EngineConfig) -> Result<Box<dyn AudioSink>, SinkError> {
    let ring = config.period_frames * 4;
    Ok(Box::new(ddsynth::io::CpalSink::open(config.sample_rate, ring)?))
}

#[cfg(not(feature = "cpal"))]
fn open_device(_config: &EngineConfig) -> Result<Box<dyn AudioSink>, SinkError> {
    Err(SinkError::Device(
        "built without the `cpal` feature; pass --output to write a file".into(),
    ))
}
