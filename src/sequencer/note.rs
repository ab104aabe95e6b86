//! Note lifecycle helpers: envelope trigger flag and gate duration countdown

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Envelope {
    Triggered,
    #[default]
    Released,
}

impl Envelope {
    pub fn trigger(&mut self) {
        *self = Envelope::Triggered;
    }

    pub fn release(&mut self) {
        *self = Envelope::Released;
    }

    pub fn is_triggered(&self) -> bool {
        *self == Envelope::Triggered
    }
}

/// Counts a sounding note down in clock ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NoteDurationTracker {
    active: bool,
    remaining_ticks: u32,
}

impl NoteDurationTracker {
    pub fn start(&mut self, ticks: u32) {
        self.active = true;
        self.remaining_ticks = ticks.max(1);
    }

    pub fn stop(&mut self) {
        self.active = false;
        self.remaining_ticks = 0;
    }

    /// Advance one tick. Returns `true` on the tick the note runs out.
    pub fn tick(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.remaining_ticks = self.remaining_ticks.saturating_sub(1);
        if self.remaining_ticks == 0 {
            self.active = false;
            return true;
        }
        false
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn remaining_ticks(&self) -> u32 {
        self.remaining_ticks
    }
}

/// Gate length in clock ticks for a gate-length fraction, never below one.
pub fn gate_ticks(gate_length: f32, ticks_per_step: u32) -> u32 {
    ((gate_length * ticks_per_step as f32) as u32).max(1)
}
