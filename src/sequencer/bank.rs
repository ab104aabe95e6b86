//! All sequencer channels and their voice outputs, owned in one place
use std::sync::Arc;

use crate::config::EngineConfig;

use super::io::SequencerIo;
use super::manager::ParameterManager;
use super::voice::{TickInput, VoiceState};
use super::Sequencer;

pub const CHANNEL_COUNT: usize = 4;

pub struct ChannelBank {
    channels: [Sequencer; CHANNEL_COUNT],
    voices: [VoiceState; CHANNEL_COUNT],
    record_target: usize,
}

impl ChannelBank {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            channels: std::array::from_fn(|i| Sequencer::with_config(i as u8 + 1, config)),
            voices: [VoiceState::default(); CHANNEL_COUNT],
            record_target: 0,
        }
    }

    /// Sequencer for 0-based slot `index` (channel `index + 1`).
    pub fn channel(&self, index: usize) -> Option<&Sequencer> {
        self.channels.get(index)
    }

    pub fn channel_mut(&mut self, index: usize) -> Option<&mut Sequencer> {
        self.channels.get_mut(index)
    }

    pub fn channels(&self) -> &[Sequencer; CHANNEL_COUNT] {
        &self.channels
    }

    pub fn voice(&self, index: usize) -> Option<&VoiceState> {
        self.voices.get(index)
    }

    pub fn voices(&self) -> &[VoiceState; CHANNEL_COUNT] {
        &self.voices
    }

    /// Lane handles for the UI context, one per channel.
    pub fn param_handles(&self) -> [Arc<ParameterManager>; CHANNEL_COUNT] {
        std::array::from_fn(|i| Arc::clone(self.channels[i].params()))
    }

    pub fn record_target(&self) -> usize {
        self.record_target
    }

    /// Route sensor recording to one channel. Out-of-range slots are ignored.
    pub fn set_record_target(&mut self, index: usize) {
        if index < CHANNEL_COUNT {
            self.record_target = index;
        }
    }

    pub fn is_running(&self) -> bool {
        self.channels.iter().any(Sequencer::is_running)
    }

    pub fn start_all(&mut self) {
        self.channels.iter_mut().for_each(Sequencer::start);
    }

    pub fn stop_all(&mut self) {
        self.channels.iter_mut().for_each(Sequencer::stop);
    }

    pub fn reset_all(&mut self, io: &mut impl SequencerIo) {
        for (seq, voice) in self.channels.iter_mut().zip(self.voices.iter_mut()) {
            seq.reset(io);
            voice.gate = false;
            voice.retrigger = false;
        }
    }

    /// Advance every channel. Only the record target sees the sensor input.
    pub fn advance(&mut self, tick: u64, input: &TickInput, io: &mut impl SequencerIo) {
        let idle = TickInput::idle();
        for (i, (seq, voice)) in self.channels.iter_mut().zip(self.voices.iter_mut()).enumerate() {
            let input = if i == self.record_target { input } else { &idle };
            seq.advance_step(tick, input, voice, io);
        }
    }

    pub fn tick_note_duration(&mut self, io: &mut impl SequencerIo) {
        for (seq, voice) in self.channels.iter_mut().zip(self.voices.iter_mut()) {
            seq.tick_note_duration(voice, io);
        }
    }

    pub fn randomize_all(&self) {
        self.channels.iter().for_each(Sequencer::randomize_parameters);
    }
}

impl Default for ChannelBank {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}
