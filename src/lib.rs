//! POLYLANE - A parameter-lane step sequencing engine
//!
//! This library provides the core components for a polymetric step sequencer:
//! - Fixed-capacity parameter lanes, each with its own length
//! - Per-channel note lifecycle (gate, slide, retrigger, note duration)
//! - Live recording of a distance sensor into the held lanes
//! - Audio monitor and MIDI output for the desktop host

pub mod audio;
pub mod config;
pub mod error;
pub mod midi;
pub mod sequencer;

// Re-export commonly used types
pub use audio::AudioOutput;
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use midi::{midi_note_name, MidiOutputDevice};
pub use sequencer::bank::{ChannelBank, CHANNEL_COUNT};
pub use sequencer::io::{GatePin, NullIo, SequencerIo};
pub use sequencer::manager::ParameterManager;
pub use sequencer::note::{Envelope, NoteDurationTracker};
pub use sequencer::params::{ParamId, ParamValue, ParameterDefinition, DEFINITIONS};
pub use sequencer::playback::{PlaybackEngine, PlaybackEvent};
pub use sequencer::track::{ParameterTrack, MAX_STEPS, MIN_STEPS};
pub use sequencer::voice::{Step, TickInput, VoiceState};
pub use sequencer::{randomize_lanes, Sequencer, StepIndex};
