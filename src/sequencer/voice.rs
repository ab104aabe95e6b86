//! Plain data exchanged with the synthesis layer and the UI
use super::params::ParamId;

/// Everything the synthesis layer needs for one channel, written every tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VoiceState {
    /// Sounding note in semitones, octave offset applied.
    pub note: i32,
    pub velocity: f32,
    pub filter: f32,
    pub attack: f32,
    pub decay: f32,
    pub octave: f32,
    pub gate_length: f32,
    pub gate: bool,
    pub slide: bool,
    /// One-shot: restart the envelope from zero.
    pub retrigger: bool,
}

/// Read-only view of one step index across every lane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub note: f32,
    pub velocity: f32,
    pub filter: f32,
    pub attack: f32,
    pub decay: f32,
    pub octave: f32,
    pub gate_length: f32,
    pub gate: bool,
    pub slide: bool,
}

impl Step {
    pub fn from_values(values: &[f32; ParamId::COUNT]) -> Self {
        let get = |id: ParamId| values[id.index()];
        Self {
            note: get(ParamId::Note),
            velocity: get(ParamId::Velocity),
            filter: get(ParamId::Filter),
            attack: get(ParamId::Attack),
            decay: get(ParamId::Decay),
            octave: get(ParamId::Octave),
            gate_length: get(ParamId::GateLength),
            gate: is_on(get(ParamId::Gate)),
            slide: is_on(get(ParamId::Slide)),
        }
    }

    /// Semitone shift selected by the octave lane: three zones, strict bounds.
    pub fn octave_offset(&self) -> i32 {
        octave_offset(self.octave)
    }

    pub fn final_note(&self) -> i32 {
        self.note as i32 + self.octave_offset()
    }
}

pub fn octave_offset(octave: f32) -> i32 {
    if octave < 0.15 {
        -12
    } else if octave > 0.4 {
        12
    } else {
        0
    }
}

pub(crate) fn is_on(value: f32) -> bool {
    value >= 0.5
}

/// Pre-sampled inputs for one sequencer pulse.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickInput {
    /// Distance sensor reading. `None` or negative skips recording.
    pub sensor_distance: Option<f32>,
    /// Record buttons, in [`ParamId::RECORDABLE`] order.
    pub held: [bool; 6],
    /// Recording is suppressed while editing.
    pub edit_mode: bool,
}

impl TickInput {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn recording(distance: f32, held: [bool; 6]) -> Self {
        Self {
            sensor_distance: Some(distance),
            held,
            edit_mode: false,
        }
    }

    pub fn is_held(&self, id: ParamId) -> bool {
        ParamId::RECORDABLE
            .iter()
            .position(|&p| p == id)
            .is_some_and(|i| self.held[i])
    }

    /// The reading to record this pulse, if any.
    pub fn recordable_distance(&self) -> Option<f32> {
        if self.edit_mode {
            return None;
        }
        self.sensor_distance.filter(|d| *d >= 0.0)
    }
}
