//! Hardware side effects the engine drives: clock out, gate lines, note-off

/// Discrete gate outputs. Only channels 1 and 2 have one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatePin {
    A,
    B,
}

impl GatePin {
    pub fn for_channel(channel: u8) -> Option<GatePin> {
        match channel {
            1 => Some(GatePin::A),
            2 => Some(GatePin::B),
            _ => None,
        }
    }
}

/// Side-effect sink handed to the sequencer on every call that can cause one.
///
/// Implementations run on the tick path and must not block.
pub trait SequencerIo {
    /// Momentary pulse on the shared clock-out line.
    fn clock_pulse(&mut self);

    fn set_gate(&mut self, pin: GatePin, high: bool);

    /// The sounding note on `channel` has been released.
    fn note_off(&mut self, channel: u8);
}

/// Discards every side effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullIo;

impl SequencerIo for NullIo {
    fn clock_pulse(&mut self) {}

    fn set_gate(&mut self, _pin: GatePin, _high: bool) {}

    fn note_off(&mut self, _channel: u8) {}
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum IoEvent {
        Clock,
        Gate(GatePin, bool),
        NoteOff(u8),
    }

    /// Records every side effect in order.
    #[derive(Debug, Default)]
    pub struct RecordingIo {
        pub events: Vec<IoEvent>,
    }

    impl RecordingIo {
        pub fn note_offs(&self) -> usize {
            self.events
                .iter()
                .filter(|e| matches!(e, IoEvent::NoteOff(_)))
                .count()
        }

        pub fn clocks(&self) -> usize {
            self.events.iter().filter(|e| **e == IoEvent::Clock).count()
        }

        pub fn last_gate(&self, pin: GatePin) -> Option<bool> {
            self.events.iter().rev().find_map(|e| match e {
                IoEvent::Gate(p, high) if *p == pin => Some(*high),
                _ => None,
            })
        }

        pub fn clear(&mut self) {
            self.events.clear();
        }
    }

    impl SequencerIo for RecordingIo {
        fn clock_pulse(&mut self) {
            self.events.push(IoEvent::Clock);
        }

        fn set_gate(&mut self, pin: GatePin, high: bool) {
            self.events.push(IoEvent::Gate(pin, high));
        }

        fn note_off(&mut self, channel: u8) {
            self.events.push(IoEvent::NoteOff(channel));
        }
    }
}
