//! Core sequencer logic - per-channel note lifecycle over independent lanes
//!
//! Every parameter keeps its own cursor (`tick % lane length`), so lanes of
//! different lengths drift against each other and the combined pattern only
//! repeats after the lcm of the active lengths.
use std::sync::Arc;

use rand::Rng;

use crate::config::EngineConfig;

pub mod bank;
pub mod io;
pub mod manager;
pub mod note;
pub mod params;
pub mod playback;
pub mod track;
pub mod voice;

use io::{GatePin, SequencerIo};
use manager::ParameterManager;
use note::{gate_ticks, Envelope, NoteDurationTracker};
use params::ParamId;
use voice::{Step, TickInput, VoiceState};

/// Which step each lane is read at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepIndex {
    /// Each lane at its own live cursor.
    PerParam,
    /// Every lane at the same index.
    Fixed(usize),
}

pub struct Sequencer {
    params: Arc<ParameterManager>,
    channel: u8,
    running: bool,
    current_step: usize,
    cursors: [usize; ParamId::COUNT],
    last_note: Option<i32>,
    current_note: Option<i32>,
    previous_step_had_slide: bool,
    envelope: Envelope,
    duration: NoteDurationTracker,
    ticks_per_step: u32,
    sensor_max_range: f32,
}

impl Sequencer {
    pub fn new(channel: u8) -> Self {
        Self::with_config(channel, &EngineConfig::default())
    }

    pub fn with_config(channel: u8, config: &EngineConfig) -> Self {
        let params = match config.seed {
            Some(seed) => ParameterManager::with_seed(seed.wrapping_add(channel as u64)),
            None => ParameterManager::new(),
        };
        Self::with_params(channel, config, Arc::new(params))
    }

    pub fn with_params(channel: u8, config: &EngineConfig, params: Arc<ParameterManager>) -> Self {
        Self {
            params,
            channel: channel.clamp(1, 4),
            running: false,
            current_step: 0,
            cursors: [0; ParamId::COUNT],
            last_note: None,
            current_note: None,
            previous_step_had_slide: false,
            envelope: Envelope::default(),
            duration: NoteDurationTracker::default(),
            ticks_per_step: config.ticks_per_step.max(1),
            sensor_max_range: config.sensor_max_range,
        }
    }

    /// Shared handle to the lanes, for the UI context.
    pub fn params(&self) -> &Arc<ParameterManager> {
        &self.params
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        self.running = true;
        log::debug!(target: "sequencer", "channel {} started", self.channel);
    }

    pub fn stop(&mut self) {
        self.running = false;
        log::debug!(target: "sequencer", "channel {} stopped", self.channel);
    }

    pub fn toggle_play(&mut self) {
        if self.running {
            self.stop();
        } else {
            self.start();
        }
    }

    /// Rewind every cursor and silence the channel.
    pub fn reset(&mut self, io: &mut impl SequencerIo) {
        self.current_step = 0;
        self.cursors = [0; ParamId::COUNT];
        self.previous_step_had_slide = false;
        if let Some(pin) = self.gate_pin() {
            io.set_gate(pin, false);
        }
        self.note_off(io);
        log::debug!(target: "sequencer", "channel {} reset", self.channel);
    }

    /// Position within the gate lane.
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn cursor(&self, id: ParamId) -> usize {
        self.cursors[id.index()]
    }

    pub fn cursors(&self) -> &[usize; ParamId::COUNT] {
        &self.cursors
    }

    pub fn current_note(&self) -> Option<i32> {
        self.current_note
    }

    pub fn last_note(&self) -> Option<i32> {
        self.last_note
    }

    pub fn envelope(&self) -> Envelope {
        self.envelope
    }

    pub fn note_duration(&self) -> &NoteDurationTracker {
        &self.duration
    }

    pub fn ticks_per_step(&self) -> u32 {
        self.ticks_per_step
    }

    /// Per-pulse entry point.
    pub fn advance_step(
        &mut self,
        tick: u64,
        input: &TickInput,
        out: &mut VoiceState,
        io: &mut impl SequencerIo,
    ) {
        if !self.running {
            return;
        }

        io.clock_pulse();

        for id in ParamId::ALL {
            self.cursors[id.index()] = cursor_for(tick, self.params.step_count(id));
        }
        self.current_step = self.cursors[ParamId::Gate.index()];

        if let Some(distance) = input.recordable_distance() {
            self.record(distance, input);
        }

        self.process_step(StepIndex::PerParam, out, io);
    }

    /// Paint the normalized reading into every held lane at its own cursor.
    fn record(&self, distance: f32, input: &TickInput) {
        let normalized = (distance / self.sensor_max_range).clamp(0.0, 1.0);
        for (i, id) in ParamId::RECORDABLE.into_iter().enumerate() {
            if input.held[i] {
                let value = id.definition().denormalize(normalized);
                self.params.set_value(id, self.cursor(id), value);
            }
        }
    }

    /// Evaluate the note state machine for one step and write `out`.
    pub fn process_step(
        &mut self,
        index: StepIndex,
        out: &mut VoiceState,
        io: &mut impl SequencerIo,
    ) {
        out.retrigger = false;

        let values = match index {
            StepIndex::PerParam => self.params.values_at_cursors(&self.cursors),
            StepIndex::Fixed(step) => self.params.values_at(step),
        };
        let step = Step::from_values(&values);
        let pin = self.gate_pin();

        if step.gate {
            let final_note = step.final_note();
            if step.slide {
                // Glide to the new note without restarting the envelope
                self.current_note = Some(final_note);
            } else {
                out.retrigger = true;
                self.envelope.trigger();
                if let Some(pin) = pin {
                    io.set_gate(pin, true);
                }
                self.last_note = self.current_note;
                self.current_note = Some(final_note);
            }
            self.duration
                .start(gate_ticks(step.gate_length, self.ticks_per_step));

            out.note = final_note;
            out.velocity = step.velocity;
            out.filter = step.filter;
            out.attack = step.attack;
            out.decay = step.decay;
            out.octave = step.octave;
            out.gate_length = step.gate_length;
            out.slide = step.slide;
        } else {
            if let Some(pin) = pin {
                io.set_gate(pin, false);
            }
            // A slid note rings on through the following gate-off step
            if !self.previous_step_had_slide {
                self.note_off(io);
            }
        }

        out.gate = step.gate;
        self.previous_step_had_slide = step.slide && step.gate;
    }

    /// Preview one step on every lane without touching the live cursors.
    pub fn play_step_now(&mut self, step: usize, out: &mut VoiceState, io: &mut impl SequencerIo) {
        self.process_step(StepIndex::Fixed(step), out, io);
    }

    /// Count the sounding note down by one clock tick.
    ///
    /// On expiry the note is released, the gate pin drops and `out.gate` is
    /// cleared, so `out.gate` can go low between two step pulses.
    pub fn tick_note_duration(&mut self, out: &mut VoiceState, io: &mut impl SequencerIo) {
        if self.duration.tick() {
            if let Some(pin) = self.gate_pin() {
                io.set_gate(pin, false);
            }
            self.note_off(io);
            out.gate = false;
        }
    }

    fn note_off(&mut self, io: &mut impl SequencerIo) {
        self.envelope.release();
        self.current_note = None;
        self.duration.stop();
        io.note_off(self.channel);
    }

    fn gate_pin(&self) -> Option<GatePin> {
        GatePin::for_channel(self.channel)
    }

    pub fn toggle_step(&self, step: usize) {
        let gate = self.params.value(ParamId::Gate, step);
        let flipped = if voice::is_on(gate) { 0.0 } else { 1.0 };
        self.params.set_value(ParamId::Gate, step, flipped);
    }

    pub fn step(&self, index: usize) -> Step {
        Step::from_values(&self.params.values_at(index))
    }

    pub fn step_parameter_value(&self, step: usize, id: ParamId) -> f32 {
        self.params.value(id, step)
    }

    pub fn set_step_parameter_value(&self, step: usize, id: ParamId, value: f32) {
        self.params.set_value(id, step, value);
    }

    pub fn parameter_step_count(&self, id: ParamId) -> usize {
        self.params.step_count(id)
    }

    pub fn set_parameter_step_count(&self, id: ParamId, count: usize) -> bool {
        self.params.set_step_count(id, count)
    }

    pub fn randomize_parameters(&self) {
        randomize_lanes(&self.params);
    }

    pub fn randomize_parameters_with<R: Rng>(&self, rng: &mut R) {
        self.params.randomize_with(rng);
        tame_random_pattern(&self.params);
    }
}

/// Randomize every lane, then keep the first bar playable.
pub fn randomize_lanes(params: &ParameterManager) {
    params.randomize();
    tame_random_pattern(params);
}

/// Flatten octave and envelope over the first 16 steps, whatever the lane
/// lengths.
fn tame_random_pattern(params: &ParameterManager) {
    for step in 0..16 {
        params.set_value(ParamId::Octave, step, 0.0);
        params.set_value(ParamId::Attack, step, 0.001);
        params.set_value(ParamId::Decay, step, 0.12);
    }
}

fn cursor_for(tick: u64, length: usize) -> usize {
    if length == 0 {
        return 0;
    }
    (tick % length as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::io::testing::RecordingIo;
    use super::io::NullIo;
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn seeded(channel: u8) -> Sequencer {
        let config = EngineConfig {
            seed: Some(11),
            ..EngineConfig::default()
        };
        Sequencer::with_config(channel, &config)
    }

    fn set_lane(seq: &Sequencer, id: ParamId, values: &[f32]) {
        seq.set_parameter_step_count(id, values.len());
        for (i, v) in values.iter().enumerate() {
            seq.set_step_parameter_value(i, id, *v);
        }
    }

    #[test]
    fn test_gate_pattern_end_to_end() {
        let mut seq = seeded(1);
        set_lane(&seq, ParamId::Gate, &[1.0, 0.0, 1.0, 1.0]);
        seq.start();

        let mut out = VoiceState::default();
        let mut io = RecordingIo::default();
        let gates: Vec<bool> = (0..8)
            .map(|tick| {
                seq.advance_step(tick, &TickInput::idle(), &mut out, &mut io);
                out.gate
            })
            .collect();

        assert_eq!(gates, [true, false, true, true, true, false, true, true]);
        assert_eq!(io.clocks(), 8);
    }

    #[test]
    fn test_stopped_sequencer_ignores_ticks() {
        let mut seq = seeded(1);
        let mut out = VoiceState::default();
        let mut io = RecordingIo::default();
        seq.advance_step(5, &TickInput::idle(), &mut out, &mut io);
        assert!(io.events.is_empty());
        assert_eq!(seq.current_step(), 0);
    }

    #[test]
    fn test_stop_start_keeps_cursors() {
        let mut seq = seeded(1);
        let mut out = VoiceState::default();
        seq.start();
        seq.advance_step(5, &TickInput::idle(), &mut out, &mut NullIo);
        seq.stop();
        seq.advance_step(6, &TickInput::idle(), &mut out, &mut NullIo);
        assert_eq!(seq.current_step(), 5);
        seq.start();
        assert_eq!(seq.current_step(), 5);
        assert_eq!(seq.cursor(ParamId::Note), 5);
    }

    #[test]
    fn test_reset_rewinds_and_silences() {
        let mut seq = seeded(1);
        set_lane(&seq, ParamId::Gate, &[1.0, 1.0]);
        let mut out = VoiceState::default();
        let mut io = RecordingIo::default();
        seq.start();
        seq.advance_step(3, &TickInput::idle(), &mut out, &mut io);
        assert!(seq.current_note().is_some());

        io.clear();
        seq.reset(&mut io);
        assert_eq!(seq.current_step(), 0);
        assert!(seq.cursors().iter().all(|&c| c == 0));
        assert_eq!(seq.current_note(), None);
        assert_eq!(io.note_offs(), 1);
        assert_eq!(io.last_gate(GatePin::A), Some(false));
        assert!(seq.is_running());
    }

    #[test]
    fn test_lanes_drift_independently() {
        let mut seq = seeded(1);
        seq.set_parameter_step_count(ParamId::Gate, 16);
        seq.set_parameter_step_count(ParamId::Note, 3);
        seq.start();
        let mut out = VoiceState::default();

        seq.advance_step(3, &TickInput::idle(), &mut out, &mut NullIo);
        assert_eq!(seq.cursor(ParamId::Gate), 3);
        assert_eq!(seq.current_step(), 3);
        assert_eq!(seq.cursor(ParamId::Note), 0);

        let realigned = (1..=100u64).find(|&tick| {
            seq.advance_step(tick, &TickInput::idle(), &mut out, &mut NullIo);
            seq.cursor(ParamId::Gate) == 0 && seq.cursor(ParamId::Note) == 0
        });
        assert_eq!(realigned, Some(48));
    }

    #[test]
    fn test_current_step_matches_gate_cursor_during_resize() {
        let mut seq = seeded(1);
        seq.start();
        let params = Arc::clone(seq.params());
        let resizer = std::thread::spawn(move || {
            for i in 0..2000 {
                params.set_step_count(ParamId::Gate, if i % 2 == 0 { 3 } else { 5 });
            }
        });

        let mut out = VoiceState::default();
        for tick in 0..2000u64 {
            seq.advance_step(tick, &TickInput::idle(), &mut out, &mut NullIo);
            assert_eq!(seq.current_step(), seq.cursor(ParamId::Gate));
        }
        resizer.join().unwrap();
    }

    #[test]
    fn test_slide_sustains_through_one_gate_off() {
        let mut seq = seeded(1);
        set_lane(&seq, ParamId::Gate, &[1.0, 1.0, 0.0, 0.0]);
        set_lane(&seq, ParamId::Slide, &[0.0, 1.0, 0.0, 0.0]);
        set_lane(&seq, ParamId::Note, &[5.0, 7.0, 0.0, 0.0]);
        set_lane(&seq, ParamId::Octave, &[0.3; 4]);
        set_lane(&seq, ParamId::GateLength, &[1.0; 4]);
        seq.start();

        let mut out = VoiceState::default();
        let mut io = RecordingIo::default();

        seq.advance_step(0, &TickInput::idle(), &mut out, &mut io);
        assert!(out.retrigger);
        assert_eq!(seq.current_note(), Some(5));
        assert!(seq.envelope().is_triggered());

        seq.advance_step(1, &TickInput::idle(), &mut out, &mut io);
        assert!(!out.retrigger);
        assert!(out.slide);
        assert_eq!(seq.current_note(), Some(7));
        assert_eq!(seq.last_note(), None);

        seq.advance_step(2, &TickInput::idle(), &mut out, &mut io);
        assert!(!out.gate);
        assert_eq!(io.note_offs(), 0);
        assert_eq!(seq.current_note(), Some(7));

        seq.advance_step(3, &TickInput::idle(), &mut out, &mut io);
        assert_eq!(io.note_offs(), 1);
        assert_eq!(seq.current_note(), None);
        assert!(!seq.envelope().is_triggered());
    }

    #[test]
    fn test_slide_without_gate_does_not_sustain() {
        let mut seq = seeded(1);
        set_lane(&seq, ParamId::Gate, &[1.0, 0.0, 0.0]);
        set_lane(&seq, ParamId::Slide, &[0.0, 1.0, 0.0]);
        seq.start();
        let mut out = VoiceState::default();
        let mut io = RecordingIo::default();
        seq.advance_step(0, &TickInput::idle(), &mut out, &mut io);
        seq.advance_step(1, &TickInput::idle(), &mut out, &mut io);
        assert_eq!(io.note_offs(), 1);
        seq.advance_step(2, &TickInput::idle(), &mut out, &mut io);
        assert_eq!(io.note_offs(), 2);
    }

    #[test]
    fn test_octave_zones_shift_note() {
        let mut seq = seeded(2);
        set_lane(&seq, ParamId::Gate, &[1.0; 4]);
        set_lane(&seq, ParamId::Note, &[12.0; 4]);
        set_lane(&seq, ParamId::Octave, &[0.10, 0.30, 0.45, 0.15]);
        let mut out = VoiceState::default();
        let notes: Vec<i32> = (0..4)
            .map(|step| {
                seq.play_step_now(step, &mut out, &mut NullIo);
                out.note
            })
            .collect();
        assert_eq!(notes, [0, 12, 24, 12]);
    }

    #[test]
    fn test_gate_off_step_does_not_overwrite_voice() {
        let mut seq = seeded(1);
        set_lane(&seq, ParamId::Gate, &[1.0, 0.0]);
        set_lane(&seq, ParamId::Filter, &[0.3, 0.9]);
        set_lane(&seq, ParamId::Velocity, &[0.8, 0.1]);
        seq.start();
        let mut out = VoiceState::default();
        seq.advance_step(0, &TickInput::idle(), &mut out, &mut NullIo);
        assert!(out.retrigger);
        seq.advance_step(1, &TickInput::idle(), &mut out, &mut NullIo);
        assert!(!out.gate);
        assert!(!out.retrigger);
        assert_eq!(out.filter, 0.3);
        assert_eq!(out.velocity, 0.8);
    }

    #[test]
    fn test_gate_pins_follow_channel() {
        let mut out = VoiceState::default();

        let mut second = seeded(2);
        set_lane(&second, ParamId::Gate, &[1.0, 0.0]);
        second.start();
        let mut io = RecordingIo::default();
        second.advance_step(0, &TickInput::idle(), &mut out, &mut io);
        assert_eq!(io.last_gate(GatePin::B), Some(true));
        second.advance_step(1, &TickInput::idle(), &mut out, &mut io);
        assert_eq!(io.last_gate(GatePin::B), Some(false));
        assert_eq!(io.last_gate(GatePin::A), None);

        let mut third = seeded(3);
        set_lane(&third, ParamId::Gate, &[1.0, 0.0]);
        third.start();
        let mut io = RecordingIo::default();
        third.advance_step(0, &TickInput::idle(), &mut out, &mut io);
        third.advance_step(1, &TickInput::idle(), &mut out, &mut io);
        assert_eq!(io.last_gate(GatePin::A), None);
        assert_eq!(io.last_gate(GatePin::B), None);
        assert_eq!(io.clocks(), 2);
    }

    #[test]
    fn test_recording_paints_at_lane_cursor() {
        let mut seq = seeded(1);
        seq.set_parameter_step_count(ParamId::Gate, 16);
        seq.set_parameter_step_count(ParamId::Note, 3);
        seq.start();
        let mut out = VoiceState::default();
        let mut held = [false; 6];
        held[0] = true; // Note
        held[2] = true; // Filter

        let input = TickInput::recording(350.0, held);
        seq.advance_step(4, &input, &mut out, &mut NullIo);

        assert_eq!(seq.step_parameter_value(1, ParamId::Note), 6.0);
        assert_eq!(seq.step_parameter_value(0, ParamId::Note), 0.0);
        assert_eq!(seq.step_parameter_value(4, ParamId::Filter), 0.25);
        assert_eq!(seq.step_parameter_value(1, ParamId::Filter), 0.5);
        assert_eq!(seq.step_parameter_value(4, ParamId::Velocity), 0.5);
    }

    #[test]
    fn test_recording_clamps_far_readings() {
        let mut seq = seeded(1);
        seq.start();
        let mut out = VoiceState::default();
        let input = TickInput::recording(9000.0, [false, true, false, false, false, false]);
        seq.advance_step(2, &input, &mut out, &mut NullIo);
        assert_eq!(seq.step_parameter_value(2, ParamId::Velocity), 1.0);
    }

    #[test]
    fn test_recording_suppressed() {
        let mut seq = seeded(1);
        seq.start();
        let mut out = VoiceState::default();

        let editing = TickInput {
            edit_mode: true,
            ..TickInput::recording(1400.0, [true; 6])
        };
        seq.advance_step(0, &editing, &mut out, &mut NullIo);
        let negative = TickInput::recording(-1.0, [true; 6]);
        seq.advance_step(1, &negative, &mut out, &mut NullIo);

        assert_eq!(seq.step_parameter_value(0, ParamId::Note), 0.0);
        assert_eq!(seq.step_parameter_value(1, ParamId::Filter), 0.5);
    }

    #[test]
    fn test_play_step_now_leaves_cursors() {
        let mut seq = seeded(1);
        set_lane(&seq, ParamId::Gate, &[0.0, 0.0, 1.0]);
        seq.start();
        let mut out = VoiceState::default();
        seq.advance_step(1, &TickInput::idle(), &mut out, &mut NullIo);
        seq.play_step_now(2, &mut out, &mut NullIo);
        assert!(out.gate);
        assert!(out.retrigger);
        assert_eq!(seq.cursor(ParamId::Gate), 1);
    }

    #[test]
    fn test_note_ends_between_pulses() {
        let mut seq = seeded(1);
        set_lane(&seq, ParamId::Gate, &[1.0, 0.0]);
        set_lane(&seq, ParamId::GateLength, &[0.5, 0.5]);
        seq.start();
        let mut out = VoiceState::default();
        let mut io = RecordingIo::default();
        seq.advance_step(0, &TickInput::idle(), &mut out, &mut io);
        assert_eq!(seq.note_duration().remaining_ticks(), 3);

        seq.tick_note_duration(&mut out, &mut io);
        seq.tick_note_duration(&mut out, &mut io);
        assert_eq!(io.note_offs(), 0);
        assert!(out.gate);
        seq.tick_note_duration(&mut out, &mut io);
        assert_eq!(io.note_offs(), 1);
        assert!(!out.gate);
        assert_eq!(seq.current_note(), None);
        assert_eq!(io.last_gate(GatePin::A), Some(false));

        seq.tick_note_duration(&mut out, &mut io);
        assert_eq!(io.note_offs(), 1);
    }

    #[test]
    fn test_toggle_step() {
        let seq = seeded(1);
        assert!(!seq.step(3).gate);
        seq.toggle_step(3);
        assert!(seq.step(3).gate);
        seq.toggle_step(3);
        assert!(!seq.step(3).gate);
    }

    #[test]
    fn test_randomize_tames_first_sixteen_steps() {
        let seq = seeded(1);
        seq.set_parameter_step_count(ParamId::Slide, 9);
        seq.set_parameter_step_count(ParamId::Octave, 32);
        seq.randomize_parameters_with(&mut Pcg32::seed_from_u64(3));

        assert_eq!(seq.parameter_step_count(ParamId::Slide), 16);
        for step in 0..16 {
            assert_eq!(seq.step_parameter_value(step, ParamId::Octave), 0.0);
            assert_eq!(seq.step_parameter_value(step, ParamId::Attack), 0.001);
            assert_eq!(seq.step_parameter_value(step, ParamId::Decay), 0.12);
        }
    }

    #[test]
    fn test_randomize_with_short_lane_wraps() {
        let seq = seeded(1);
        seq.set_parameter_step_count(ParamId::Decay, 4);
        seq.randomize_parameters();
        assert_eq!(seq.parameter_step_count(ParamId::Decay), 4);
        for step in 0..4 {
            assert_eq!(seq.step_parameter_value(step, ParamId::Decay), 0.12);
        }
    }

    #[test]
    fn test_ui_edits_while_ticking() {
        let mut seq = seeded(1);
        seq.start();
        let params = Arc::clone(seq.params());
        let editor = std::thread::spawn(move || {
            for i in 0..500 {
                params.set_step_count(ParamId::Gate, 2 + i % 30);
                params.set_value(ParamId::Gate, i, (i % 2) as f32);
                params.set_value(ParamId::Note, i, i as f32);
            }
        });
        let mut out = VoiceState::default();
        for tick in 0..500 {
            seq.advance_step(tick, &TickInput::idle(), &mut out, &mut NullIo);
            assert!(seq.current_step() < 32);
            assert!((0.0..=1.0).contains(&out.velocity));
        }
        editor.join().unwrap();
    }
}
