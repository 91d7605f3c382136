//! Voice bank, mixing and the control-to-render handoff.
//!
//! The render thread owns a [`Synth`]; the control thread talks to it
//! through a [`SynthHandle`]. Nothing is shared between them except the
//! two lock-free queues.

pub mod bank;
pub mod message;
pub mod mixer;
pub mod render;
pub mod voice;

pub use bank::VoiceBank;
pub use message::{ControlError, ControlMessage, EventReceiver, SynthEvent, SynthHandle};
pub use mixer::Mixer;
pub use render::Synth;
pub use voice::{Voice, VoiceConfig, VoiceSnapshot};
