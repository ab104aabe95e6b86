//! Crate-wide error type
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),

    #[error("failed to create MIDI output: {0}")]
    MidiInit(String),

    #[error("MIDI port {0} does not exist")]
    MidiPort(usize),

    #[error("failed to connect MIDI port: {0}")]
    MidiConnect(String),

    #[error("failed to send MIDI message: {0}")]
    MidiSend(String),
}

pub type Result<T> = std::result::Result<T, Error>;
