//! Owner of every parameter lane, shared between the tick and UI contexts
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::params::{ParamId, DEFINITIONS};
use super::track::ParameterTrack;

/// One lane per [`ParamId`], each behind its own lock.
///
/// Every accessor takes `&self` and holds exactly one track lock for a bounded
/// amount of work, so the UI context can edit while the tick context plays.
pub struct ParameterManager {
    tracks: [Mutex<ParameterTrack>; ParamId::COUNT],
    rng: Mutex<Pcg32>,
}

impl ParameterManager {
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Build with a fixed randomizer seed.
    pub fn with_seed(seed: u64) -> Self {
        let manager = Self {
            tracks: std::array::from_fn(|_| Mutex::new(ParameterTrack::default())),
            rng: Mutex::new(Pcg32::seed_from_u64(seed)),
        };
        manager.init();
        manager
    }

    /// Reset every lane to its definition's default value and length.
    pub fn init(&self) {
        for (slot, def) in self.tracks.iter().zip(DEFINITIONS.iter()) {
            let mut track = slot.lock();
            track.init(def.default_f32());
            track.resize(def.default_steps);
        }
    }

    pub fn step_count(&self, id: ParamId) -> usize {
        self.tracks[id.index()].lock().step_count()
    }

    /// Out-of-range lengths are ignored and the previous length is kept.
    pub fn set_step_count(&self, id: ParamId, count: usize) -> bool {
        let accepted = self.tracks[id.index()].lock().resize(count);
        if accepted {
            log::debug!(target: "params", "{} length -> {}", id.name(), count);
        } else {
            log::trace!(target: "params", "ignored {} length {}", id.name(), count);
        }
        accepted
    }

    pub fn value(&self, id: ParamId, step: usize) -> f32 {
        self.tracks[id.index()].lock().value(step)
    }

    /// Store `value` after the parameter's clamp/rounding policy.
    pub fn set_value(&self, id: ParamId, step: usize, value: f32) {
        let value = id.definition().constrain(value);
        self.tracks[id.index()].lock().set_value(step, value);
    }

    /// Read every lane, each at its own cursor.
    pub fn values_at_cursors(&self, cursors: &[usize; ParamId::COUNT]) -> [f32; ParamId::COUNT] {
        std::array::from_fn(|i| self.tracks[i].lock().value(cursors[i]))
    }

    /// Read every lane at the same step index.
    pub fn values_at(&self, step: usize) -> [f32; ParamId::COUNT] {
        self.values_at_cursors(&[step; ParamId::COUNT])
    }

    /// Copy of one lane, for display.
    pub fn track(&self, id: ParamId) -> ParameterTrack {
        self.tracks[id.index()].lock().clone()
    }

    pub fn randomize(&self) {
        let mut rng = self.rng.lock();
        self.randomize_with(&mut *rng);
    }

    /// Redraw every active step of every lane.
    ///
    /// Slide is forced back to 16 steps before it is redrawn.
    pub fn randomize_with<R: Rng>(&self, rng: &mut R) {
        for id in ParamId::ALL {
            let def = id.definition();
            let mut track = self.tracks[id.index()].lock();
            if id == ParamId::Slide {
                track.resize(16);
            }
            track.fill_with(|step| def.constrain(random_step_value(id, step, rng)));
        }
        log::debug!(target: "params", "randomized all lanes");
    }
}

impl Default for ParameterManager {
    fn default() -> Self {
        Self::new()
    }
}

fn random_step_value<R: Rng>(id: ParamId, step: usize, rng: &mut R) -> f32 {
    match id {
        ParamId::Slide => on_off(rng.random_ratio(1, 13)),
        // Downbeats mostly on, offbeats mostly off
        ParamId::Gate if step % 2 == 0 => on_off(!rng.random_ratio(1, 4)),
        ParamId::Gate => on_off(rng.random_ratio(1, 3)),
        ParamId::GateLength => rng.random_range(0.1..=0.7),
        ParamId::Filter => rng.random_range(0.2..=0.7),
        ParamId::Attack => rng.random_range(0.0..=0.05),
        ParamId::Decay => rng.random_range(0.08..=0.5),
        ParamId::Note | ParamId::Velocity | ParamId::Octave => {
            let def = id.definition();
            rng.random_range(def.min_f32()..=def.max_f32())
        }
    }
}

fn on_off(on: bool) -> f32 {
    if on {
        1.0
    } else {
        0.0
    }
}
