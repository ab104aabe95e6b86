//! Audio monitor using cpal - a plain sine voice following one channel
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::midi::voice_note_to_midi;

#[derive(Debug, Clone, Copy, PartialEq)]
struct MonitorVoice {
    frequency: f32,
    amplitude: f32,
}

pub struct AudioOutput {
    _stream: Option<cpal::Stream>,
    phase: Arc<Mutex<f32>>,
    voice: Arc<Mutex<Option<MonitorVoice>>>,
}

impl AudioOutput {
    pub fn new() -> Option<Self> {
        let phase = Arc::new(Mutex::new(0.0));
        let voice = Arc::new(Mutex::new(None));

        let phase_clone = Arc::clone(&phase);
        let voice_clone = Arc::clone(&voice);

        let stream = Self::setup_audio_stream(phase_clone, voice_clone)?;

        Some(Self {
            _stream: Some(stream),
            phase,
            voice,
        })
    }

    /// Output that keeps note state but produces no sound.
    pub fn silent() -> Self {
        Self {
            _stream: None,
            phase: Arc::new(Mutex::new(0.0)),
            voice: Arc::new(Mutex::new(None)),
        }
    }

    fn setup_audio_stream(
        phase: Arc<Mutex<f32>>,
        voice: Arc<Mutex<Option<MonitorVoice>>>,
    ) -> Option<cpal::Stream> {
        let host = cpal::default_host();
        let device = host.default_output_device()?;
        let config = device.default_output_config().ok()?;

        let sample_rate = config.sample_rate().0 as f32;

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut phase = phase.lock();
                    let voice = *voice.lock();

                    for sample in data.iter_mut() {
                        if let Some(voice) = voice {
                            *sample = (*phase * std::f32::consts::TAU).sin() * voice.amplitude;
                            *phase += voice.frequency / sample_rate;
                            if *phase >= 1.0 {
                                *phase -= 1.0;
                            }
                        } else {
                            *sample = 0.0;
                            *phase = 0.0;
                        }
                    }
                },
                |err| log::error!(target: "audio", "stream error: {}", err),
                None,
            ),
            format => {
                log::warn!(target: "audio", "unsupported sample format {:?}", format);
                return None;
            }
        };

        match stream {
            Ok(stream) => {
                if let Err(err) = stream.play() {
                    log::warn!(target: "audio", "could not start stream: {}", err);
                }
                Some(stream)
            }
            Err(err) => {
                log::warn!(target: "audio", "could not open stream: {}", err);
                None
            }
        }
    }

    /// Start a note from a voice's note value and velocity.
    pub fn trigger_note(&mut self, note: i32, velocity: f32) {
        *self.voice.lock() = Some(MonitorVoice {
            frequency: voice_note_to_frequency(note),
            amplitude: 0.05 + 0.2 * velocity.clamp(0.0, 1.0),
        });
    }

    /// Move a sounding note to a new pitch without restarting it.
    pub fn glide_to(&mut self, note: i32) {
        if let Some(voice) = self.voice.lock().as_mut() {
            voice.frequency = voice_note_to_frequency(note);
        }
    }

    pub fn stop_note(&mut self) {
        *self.voice.lock() = None;
        *self.phase.lock() = 0.0;
    }

    pub fn is_sounding(&self) -> bool {
        self.voice.lock().is_some()
    }

    pub fn frequency(&self) -> Option<f32> {
        self.voice.lock().as_ref().map(|v| v.frequency)
    }
}

impl Default for AudioOutput {
    fn default() -> Self {
        Self::new().unwrap_or_else(Self::silent)
    }
}

fn voice_note_to_frequency(note: i32) -> f32 {
    midi_note_to_frequency(voice_note_to_midi(note))
}

fn midi_note_to_frequency(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a4_is_440() {
        assert!((midi_note_to_frequency(69) - 440.0).abs() < 1e-3);
        assert!((midi_note_to_frequency(57) - 220.0).abs() < 1e-3);
    }

    #[test]
    fn test_silent_output_tracks_voice() {
        let mut audio = AudioOutput::silent();
        assert!(!audio.is_sounding());
        audio.trigger_note(21, 1.0);
        assert!((audio.frequency().unwrap() - 440.0).abs() < 1e-3);
        audio.glide_to(9);
        assert!((audio.frequency().unwrap() - 220.0).abs() < 1e-3);
        audio.stop_note();
        assert!(!audio.is_sounding());
        audio.glide_to(9);
        assert!(!audio.is_sounding());
    }
}
