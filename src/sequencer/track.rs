//! Fixed-capacity circular step lane for a single parameter

pub const MAX_STEPS: usize = 64;
pub const MIN_STEPS: usize = 2;
pub const DEFAULT_STEPS: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterTrack {
    values: [f32; MAX_STEPS],
    step_count: usize,
    default_value: f32,
}

impl ParameterTrack {
    pub fn new(default_value: f32) -> Self {
        let mut track = Self {
            values: [0.0; MAX_STEPS],
            step_count: 0,
            default_value,
        };
        track.init(default_value);
        track
    }

    /// Fill every slot with `default_value` and fall back to 16 steps.
    pub fn init(&mut self, default_value: f32) {
        self.default_value = default_value;
        self.values = [default_value; MAX_STEPS];
        self.step_count = DEFAULT_STEPS;
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn default_value(&self) -> f32 {
        self.default_value
    }

    pub fn value(&self, index: usize) -> f32 {
        if self.step_count == 0 {
            return self.default_value;
        }
        self.values[index % self.step_count]
    }

    pub fn set_value(&mut self, index: usize, value: f32) {
        if self.step_count == 0 {
            return;
        }
        self.values[index % self.step_count] = value;
    }

    /// Change the active length. Returns whether the request was accepted.
    ///
    /// Growing resets the newly exposed slots to the default value. Shrinking
    /// leaves the hidden slots untouched.
    pub fn resize(&mut self, new_count: usize) -> bool {
        if !(MIN_STEPS..=MAX_STEPS).contains(&new_count) {
            return false;
        }
        if new_count > self.step_count {
            self.values[self.step_count..new_count].fill(self.default_value);
        }
        self.step_count = new_count;
        true
    }

    /// Overwrite every active step with the value produced for its index.
    pub fn fill_with(&mut self, mut f: impl FnMut(usize) -> f32) {
        for (i, slot) in self.values[..self.step_count].iter_mut().enumerate() {
            *slot = f(i);
        }
    }

    pub fn active_values(&self) -> &[f32] {
        &self.values[..self.step_count]
    }
}

impl Default for ParameterTrack {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_init() {
        let track = ParameterTrack::new(0.5);
        assert_eq!(track.step_count(), DEFAULT_STEPS);
        assert!(track.active_values().iter().all(|&v| v == 0.5));
        assert_eq!(track.value(63), 0.5);
    }

    #[test]
    fn test_index_wraps_by_step_count() {
        let mut track = ParameterTrack::new(0.0);
        track.resize(5);
        track.set_value(2, 0.9);
        for k in 0..20 {
            assert_eq!(track.value(2 + k * 5), 0.9);
        }
        track.set_value(8, 0.3);
        assert_eq!(track.value(3), 0.3);
    }

    #[test]
    fn test_resize_bounds() {
        let mut track = ParameterTrack::new(0.0);
        assert!(track.resize(10));
        assert_eq!(track.step_count(), 10);
        assert!(!track.resize(1));
        assert!(!track.resize(70));
        assert!(!track.resize(0));
        assert_eq!(track.step_count(), 10);
        assert!(track.resize(MIN_STEPS));
        assert!(track.resize(MAX_STEPS));
        assert_eq!(track.step_count(), MAX_STEPS);
    }

    #[test]
    fn test_grow_resets_exposed_slots() {
        let mut track = ParameterTrack::new(0.25);
        track.fill_with(|_| 1.0);
        track.resize(4);
        track.resize(8);
        assert_eq!(&track.active_values()[..4], &[1.0; 4]);
        assert_eq!(&track.active_values()[4..], &[0.25; 4]);
    }

    #[test]
    fn test_shrink_keeps_hidden_values() {
        let mut track = ParameterTrack::new(0.0);
        track.resize(8);
        track.set_value(6, 0.7);
        track.resize(4);
        assert_eq!(track.value(6), track.value(2));
        // Hidden slot is untouched until something regrows over it
        assert_eq!(track.values[6], 0.7);
    }

    #[test]
    fn test_zero_length_is_degenerate_not_fatal() {
        let mut track = ParameterTrack::new(0.4);
        track.step_count = 0;
        assert_eq!(track.value(5), 0.4);
        track.set_value(5, 0.9);
        assert_eq!(track.value(5), 0.4);
    }
}
