//! MIDI output using midir
use midir::{MidiOutput, MidiOutputConnection};

use crate::error::{Error, Result};
use crate::sequencer::bank::CHANNEL_COUNT;

/// MIDI note for lane note value 0.
pub const BASE_MIDI_NOTE: i32 = 48;

const NOTE_ON: u8 = 0x90;
const NOTE_OFF: u8 = 0x80;
const TIMING_CLOCK: u8 = 0xF8;

pub struct MidiOutputDevice {
    connection: Option<MidiOutputConnection>,
    sounding: [Option<u8>; CHANNEL_COUNT],
}

impl MidiOutputDevice {
    pub fn new() -> Self {
        Self {
            connection: None,
            sounding: [None; CHANNEL_COUNT],
        }
    }

    pub fn available_ports() -> Vec<String> {
        if let Ok(midi_out) = MidiOutput::new("POLYLANE MIDI Output") {
            midi_out
                .ports()
                .iter()
                .filter_map(|p| midi_out.port_name(p).ok())
                .collect()
        } else {
            vec![]
        }
    }

    pub fn connect(&mut self, port_index: usize) -> Result<()> {
        let midi_out = MidiOutput::new("POLYLANE MIDI Output")
            .map_err(|e| Error::MidiInit(e.to_string()))?;

        let ports = midi_out.ports();
        let port = ports.get(port_index).ok_or(Error::MidiPort(port_index))?;

        let connection = midi_out
            .connect(port, "polylane")
            .map_err(|e| Error::MidiConnect(e.to_string()))?;

        log::info!(target: "midi", "connected to port {}", port_index);
        self.connection = Some(connection);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn send(&mut self, message: &[u8]) -> Result<()> {
        if let Some(ref mut conn) = self.connection {
            conn.send(message)
                .map_err(|e| Error::MidiSend(e.to_string()))?;
        }
        Ok(())
    }

    /// Start a voice note on sequencer `channel` (1-based).
    pub fn send_note_on(&mut self, channel: u8, note: i32, velocity: f32) -> Result<()> {
        self.send_note_off(channel)?;
        let key = voice_note_to_midi(note);
        self.send(&[status(NOTE_ON, channel), key, midi_velocity(velocity)])?;
        if let Some(slot) = slot(channel).and_then(|i| self.sounding.get_mut(i)) {
            *slot = Some(key);
        }
        Ok(())
    }

    /// Legato move: the new note starts before the old one is released.
    pub fn send_glide(&mut self, channel: u8, note: i32) -> Result<()> {
        let key = voice_note_to_midi(note);
        let previous = slot(channel).and_then(|i| self.sounding.get(i).copied().flatten());
        if previous == Some(key) {
            return Ok(());
        }
        self.send(&[status(NOTE_ON, channel), key, 100])?;
        if let Some(old) = previous {
            self.send(&[status(NOTE_OFF, channel), old, 0])?;
        }
        if let Some(slot) = slot(channel).and_then(|i| self.sounding.get_mut(i)) {
            *slot = Some(key);
        }
        Ok(())
    }

    /// Release whatever `channel` is sounding. Silent channels send nothing.
    pub fn send_note_off(&mut self, channel: u8) -> Result<()> {
        let sounding = slot(channel).and_then(|i| self.sounding.get_mut(i).and_then(Option::take));
        if let Some(key) = sounding {
            self.send(&[status(NOTE_OFF, channel), key, 0])?;
        }
        Ok(())
    }

    pub fn send_clock(&mut self) -> Result<()> {
        self.send(&[TIMING_CLOCK])
    }

    pub fn all_notes_off(&mut self) -> Result<()> {
        for channel in 1..=CHANNEL_COUNT as u8 {
            self.send_note_off(channel)?;
        }
        Ok(())
    }

    pub fn disconnect(&mut self) {
        self.connection = None;
        self.sounding = [None; CHANNEL_COUNT];
    }
}

impl Default for MidiOutputDevice {
    fn default() -> Self {
        Self::new()
    }
}

fn slot(channel: u8) -> Option<usize> {
    (channel as usize).checked_sub(1)
}

fn status(kind: u8, channel: u8) -> u8 {
    kind | (channel.saturating_sub(1) & 0x0F)
}

pub fn voice_note_to_midi(note: i32) -> u8 {
    (BASE_MIDI_NOTE + note).clamp(0, 127) as u8
}

pub fn midi_velocity(velocity: f32) -> u8 {
    ((velocity.clamp(0.0, 1.0) * 126.0).round() as u8) + 1
}

pub fn midi_note_name(note: u8) -> String {
    let note_names = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
    let octave = (note / 12) as i32 - 1;
    let note_index = (note % 12) as usize;
    format!("{}{}", note_names[note_index], octave)
}
