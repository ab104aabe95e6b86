//! Parameter identities and their compile-time definition table

/// The musical parameters, each with its own step lane.
///
/// Order matches [`DEFINITIONS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum ParamId {
    Note,
    Velocity,
    Filter,
    Attack,
    Decay,
    Octave,
    GateLength,
    Gate,
    Slide,
}

impl ParamId {
    pub const COUNT: usize = 9;

    pub const ALL: [ParamId; Self::COUNT] = [
        ParamId::Note,
        ParamId::Velocity,
        ParamId::Filter,
        ParamId::Attack,
        ParamId::Decay,
        ParamId::Octave,
        ParamId::GateLength,
        ParamId::Gate,
        ParamId::Slide,
    ];

    /// Lanes that can be painted from the distance sensor, in held-flag order.
    pub const RECORDABLE: [ParamId; 6] = [
        ParamId::Note,
        ParamId::Velocity,
        ParamId::Filter,
        ParamId::Attack,
        ParamId::Decay,
        ParamId::Octave,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn definition(self) -> &'static ParameterDefinition {
        &DEFINITIONS[self.index()]
    }

    pub fn name(self) -> &'static str {
        self.definition().name
    }
}

/// A bound or default that may be declared as an integer, float or boolean.
///
/// Everything is stored as `f32`; the tag only matters to the write policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Int(i32),
    Float(f32),
    Bool(bool),
}

impl ParamValue {
    pub fn as_f32(self) -> f32 {
        match self {
            ParamValue::Int(v) => v as f32,
            ParamValue::Float(v) => v,
            ParamValue::Bool(true) => 1.0,
            ParamValue::Bool(false) => 0.0,
        }
    }

    pub const fn is_int(self) -> bool {
        matches!(self, ParamValue::Int(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterDefinition {
    pub name: &'static str,
    pub default_value: ParamValue,
    pub min_value: ParamValue,
    pub max_value: ParamValue,
    pub is_binary: bool,
    pub default_steps: usize,
}

impl ParameterDefinition {
    pub fn default_f32(&self) -> f32 {
        self.default_value.as_f32()
    }

    pub fn min_f32(&self) -> f32 {
        self.min_value.as_f32()
    }

    pub fn max_f32(&self) -> f32 {
        self.max_value.as_f32()
    }

    /// Write policy applied before a value reaches a lane.
    ///
    /// Clamp into range, then snap binary parameters to 0/1 at the 0.5
    /// threshold. Otherwise round to the nearest integer when the *declared*
    /// minimum is an integer literal. No shipped parameter declares one.
    pub fn constrain(&self, value: f32) -> f32 {
        let clamped = value.clamp(self.min_f32(), self.max_f32());
        if self.is_binary {
            if clamped >= 0.5 {
                1.0
            } else {
                0.0
            }
        } else if self.min_value.is_int() {
            clamped.round()
        } else {
            clamped
        }
    }

    /// Linear map of a normalized `[0, 1]` reading into the declared range.
    pub fn denormalize(&self, normalized: f32) -> f32 {
        let min = self.min_f32();
        min + normalized.clamp(0.0, 1.0) * (self.max_f32() - min)
    }
}

const fn float_param(name: &'static str, default: f32, min: f32, max: f32) -> ParameterDefinition {
    ParameterDefinition {
        name,
        default_value: ParamValue::Float(default),
        min_value: ParamValue::Float(min),
        max_value: ParamValue::Float(max),
        is_binary: false,
        default_steps: 16,
    }
}

const fn bool_param(name: &'static str, default: bool) -> ParameterDefinition {
    ParameterDefinition {
        name,
        default_value: ParamValue::Bool(default),
        min_value: ParamValue::Bool(false),
        max_value: ParamValue::Bool(true),
        is_binary: true,
        default_steps: 16,
    }
}

pub const DEFINITIONS: [ParameterDefinition; ParamId::COUNT] = [
    float_param("Note", 0.0, 0.0, 24.0),
    float_param("Velocity", 0.5, 0.0, 1.0),
    float_param("Filter", 0.5, 0.0, 1.0),
    float_param("Attack", 0.0, 0.0, 1.0),
    float_param("Decay", 0.12, 0.0, 1.0),
    float_param("Octave", 0.0, 0.0, 1.0),
    float_param("GateLength", 0.2, 0.0, 1.0),
    bool_param("Gate", false),
    bool_param("Slide", false),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_matches_ids() {
        let expected = [
            "Note",
            "Velocity",
            "Filter",
            "Attack",
            "Decay",
            "Octave",
            "GateLength",
            "Gate",
            "Slide",
        ];
        for (id, name) in ParamId::ALL.iter().zip(expected) {
            assert_eq!(id.name(), name);
        }
        for (i, id) in ParamId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
    }

    #[test]
    fn test_value_coercion() {
        assert_eq!(ParamValue::Bool(true).as_f32(), 1.0);
        assert_eq!(ParamValue::Bool(false).as_f32(), 0.0);
        assert_eq!(ParamValue::Int(7).as_f32(), 7.0);
        assert_eq!(ParamValue::Float(0.25).as_f32(), 0.25);
    }

    #[test]
    fn test_binary_rounding() {
        let gate = ParamId::Gate.definition();
        assert_eq!(gate.constrain(0.6), 1.0);
        assert_eq!(gate.constrain(0.4), 0.0);
        assert_eq!(gate.constrain(0.5), 1.0);
        assert_eq!(gate.constrain(-3.0), 0.0);
    }

    #[test]
    fn test_float_param_is_not_rounded() {
        let filter = ParamId::Filter.definition();
        assert_eq!(filter.constrain(0.37), 0.37);
        assert_eq!(filter.constrain(5.0), 1.0);
        assert_eq!(filter.constrain(-5.0), 0.0);
    }

    #[test]
    fn test_no_shipped_param_declares_int_minimum() {
        assert!(DEFINITIONS.iter().all(|def| !def.min_value.is_int()));
    }

    #[test]
    fn test_int_minimum_rounds_to_nearest() {
        // Rounding keys on the min literal's tag, not on the max or default.
        let steps = ParameterDefinition {
            name: "Steps",
            default_value: ParamValue::Float(1.0),
            min_value: ParamValue::Int(0),
            max_value: ParamValue::Float(8.0),
            is_binary: false,
            default_steps: 16,
        };
        assert_eq!(steps.constrain(2.4), 2.0);
        assert_eq!(steps.constrain(2.6), 3.0);
        assert_eq!(steps.constrain(11.2), 8.0);

        let float_min = ParameterDefinition {
            min_value: ParamValue::Float(0.0),
            max_value: ParamValue::Int(8),
            ..steps
        };
        assert_eq!(float_min.constrain(2.4), 2.4);
    }

    #[test]
    fn test_denormalize_maps_into_range() {
        let note = ParamId::Note.definition();
        assert_eq!(note.denormalize(0.0), 0.0);
        assert_eq!(note.denormalize(0.5), 12.0);
        assert_eq!(note.denormalize(2.0), 24.0);
    }
}
