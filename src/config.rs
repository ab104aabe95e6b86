//! Engine and host configuration loaded from TOML
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

pub const DEFAULT_TICKS_PER_STEP: u32 = 6;
pub const DEFAULT_SENSOR_MAX_RANGE: f32 = 1400.0;
pub const DEFAULT_BPM: f32 = 120.0;

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    engine: EngineSection,
    #[serde(default)]
    host: HostSection,
}

#[derive(Deserialize, Default)]
struct EngineSection {
    ticks_per_step: Option<u32>,
    sensor_max_range: Option<f32>,
    seed: Option<u64>,
}

#[derive(Deserialize, Default)]
struct HostSection {
    bpm: Option<f32>,
    midi_port: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Clock ticks per sequencer step; gate length is a fraction of this.
    pub ticks_per_step: u32,
    /// Sensor distance that maps to a normalized reading of 1.0.
    pub sensor_max_range: f32,
    /// Fixed randomizer seed. Drawn from the OS when absent.
    pub seed: Option<u64>,
    pub bpm: f32,
    pub midi_port: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ticks_per_step: DEFAULT_TICKS_PER_STEP,
            sensor_max_range: DEFAULT_SENSOR_MAX_RANGE,
            seed: None,
            bpm: DEFAULT_BPM,
            midi_port: None,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents)?;
        let fallback = Self::default();

        let config = Self {
            ticks_per_step: file.engine.ticks_per_step.unwrap_or(fallback.ticks_per_step),
            sensor_max_range: file
                .engine
                .sensor_max_range
                .unwrap_or(fallback.sensor_max_range),
            seed: file.engine.seed,
            bpm: file.host.bpm.unwrap_or(fallback.bpm).clamp(40.0, 240.0),
            midi_port: file.host.midi_port,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        log::debug!(target: "config", "loaded {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ticks_per_step == 0 {
            return Err(Error::InvalidConfig("ticks_per_step must be at least 1"));
        }
        if self.sensor_max_range.is_nan() || self.sensor_max_range <= 0.0 {
            return Err(Error::InvalidConfig("sensor_max_range must be positive"));
        }
        if !self.bpm.is_finite() {
            return Err(Error::InvalidConfig("bpm must be a finite number"));
        }
        Ok(())
    }

    /// Duration of one clock tick at the configured tempo (16th-note steps).
    pub fn tick_duration_secs(&self) -> f32 {
        let steps_per_second = self.bpm / 60.0 * 4.0;
        1.0 / (steps_per_second * self.ticks_per_step as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = EngineConfig::from_toml_str(
            "[engine]\nticks_per_step = 12\nsensor_max_range = 800.0\nseed = 7\n\n[host]\nbpm = 300.0\nmidi_port = 1\n",
        )
        .unwrap();
        assert_eq!(config.ticks_per_step, 12);
        assert_eq!(config.sensor_max_range, 800.0);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.bpm, 240.0);
        assert_eq!(config.midi_port, Some(1));
    }

    #[test]
    fn test_zero_ticks_per_step_rejected() {
        let err = EngineConfig::from_toml_str("[engine]\nticks_per_step = 0\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_non_finite_bpm_rejected() {
        let err = EngineConfig::from_toml_str("[host]\nbpm = nan\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let config = EngineConfig {
            bpm: f32::INFINITY,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_config_rejected() {
        let err = EngineConfig::from_toml_str("[engine\n").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = EngineConfig::load("/nonexistent/polylane.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/polylane.toml"));
    }

    #[test]
    fn test_tick_duration() {
        let config = EngineConfig::default();
        // 120 bpm, 16ths: 8 steps/s, 6 ticks per step
        assert!((config.tick_duration_secs() - 1.0 / 48.0).abs() < 1e-6);
    }
}
