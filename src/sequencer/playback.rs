//! Playback engine - runs a channel bank on its own clock thread
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::EngineConfig;

use super::bank::{ChannelBank, CHANNEL_COUNT};
use super::io::{GatePin, SequencerIo};
use super::manager::ParameterManager;
use super::params::ParamId;
use super::voice::TickInput;

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    StepAdvanced {
        channel: u8,
        cursors: [usize; ParamId::COUNT],
    },
    NoteOn {
        channel: u8,
        note: i32,
        velocity: f32,
    },
    Glide {
        channel: u8,
        note: i32,
    },
    NoteOff {
        channel: u8,
    },
    Gate {
        pin: GatePin,
        high: bool,
    },
    ClockPulse,
}

/// Forwards hardware side effects to the UI as events.
///
/// Per-channel step pulses are dropped here. The clock thread sends one
/// `ClockPulse` per fine tick instead, which gives MIDI clock a fixed rate
/// (24 PPQN at six ticks per 16th step) however many channels are running.
struct EventIo {
    sender: Sender<PlaybackEvent>,
}

impl SequencerIo for EventIo {
    fn clock_pulse(&mut self) {}

    fn set_gate(&mut self, pin: GatePin, high: bool) {
        let _ = self.sender.send(PlaybackEvent::Gate { pin, high });
    }

    fn note_off(&mut self, channel: u8) {
        let _ = self.sender.send(PlaybackEvent::NoteOff { channel });
    }
}

/// Flags shared with the clock thread.
#[derive(Default)]
struct Shared {
    running: AtomicBool,
    reset_requested: AtomicBool,
    record_target: AtomicUsize,
    input: Mutex<TickInput>,
}

pub struct PlaybackEngine {
    sender: Sender<PlaybackEvent>,
    receiver: Receiver<PlaybackEvent>,
    shared: Arc<Shared>,
    params: [Arc<ParameterManager>; CHANNEL_COUNT],
    bank: Option<ChannelBank>,
    worker: Option<JoinHandle<(ChannelBank, u64)>>,
    next_tick: u64,
    config: EngineConfig,
}

impl PlaybackEngine {
    pub fn new(config: EngineConfig) -> Self {
        let (sender, receiver) = channel();
        let bank = ChannelBank::new(&config);

        Self {
            sender,
            receiver,
            shared: Arc::new(Shared::default()),
            params: bank.param_handles(),
            bank: Some(bank),
            worker: None,
            next_tick: 0,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Change the tempo. Takes effect on the next start.
    pub fn set_bpm(&mut self, bpm: f32) {
        if bpm.is_finite() {
            self.config.bpm = bpm.clamp(40.0, 240.0);
        }
    }

    /// Lanes of channel slot `index`, editable while playing.
    pub fn params(&self, index: usize) -> Option<&Arc<ParameterManager>> {
        self.params.get(index)
    }

    /// Latest pre-sampled sensor and record-button state.
    pub fn set_input(&self, input: TickInput) {
        *self.shared.input.lock() = input;
    }

    pub fn set_record_target(&self, index: usize) {
        self.shared.record_target.store(index, Ordering::Relaxed);
    }

    /// Step tick the next pulse will use.
    pub fn next_tick(&self) -> u64 {
        self.next_tick
    }

    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        if let Err(err) = self.config.validate() {
            log::error!(target: "playback", "not starting: {}", err);
            return;
        }
        let Some(mut bank) = self.bank.take() else {
            return;
        };

        self.shared.running.store(true, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        let mut io = EventIo {
            sender: self.sender.clone(),
        };
        let tick_duration = Duration::from_secs_f32(self.config.tick_duration_secs());
        let ticks_per_step = u64::from(self.config.ticks_per_step.max(1));
        let mut step_tick = self.next_tick;

        log::info!(
            target: "playback",
            "starting at tick {} ({} bpm, {} ticks per step)",
            step_tick,
            self.config.bpm,
            ticks_per_step
        );

        self.worker = Some(thread::spawn(move || {
            let mut fine_tick: u64 = 0;
            let mut last_tick_time = Instant::now();
            bank.start_all();

            while shared.running.load(Ordering::Acquire) {
                if shared.reset_requested.swap(false, Ordering::AcqRel) {
                    bank.reset_all(&mut io);
                    step_tick = 0;
                    fine_tick = 0;
                }

                let now = Instant::now();
                if now.duration_since(last_tick_time) >= tick_duration {
                    // End expiring notes before the next step can retrigger
                    bank.tick_note_duration(&mut io);
                    let _ = io.sender.send(PlaybackEvent::ClockPulse);

                    if fine_tick % ticks_per_step == 0 {
                        bank.set_record_target(shared.record_target.load(Ordering::Relaxed));
                        let input = *shared.input.lock();
                        bank.advance(step_tick, &input, &mut io);
                        send_step_events(&bank, &io.sender);
                        step_tick += 1;
                    }

                    fine_tick += 1;
                    last_tick_time = now;
                }

                thread::sleep(Duration::from_millis(1));
            }

            bank.stop_all();
            (bank, step_tick)
        }));
    }

    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::Release);

        if let Some(worker) = self.worker.take() {
            match worker.join() {
                Ok((bank, next_tick)) => {
                    self.bank = Some(bank);
                    self.next_tick = next_tick;
                }
                Err(_) => {
                    log::error!(target: "playback", "clock thread panicked, rebuilding channels");
                    let bank = ChannelBank::new(&self.config);
                    self.params = bank.param_handles();
                    self.bank = Some(bank);
                    self.next_tick = 0;
                }
            }
        }
    }

    /// Rewind every channel to step 0 and release all notes.
    pub fn reset(&mut self) {
        if self.is_running() {
            self.shared.reset_requested.store(true, Ordering::Release);
            return;
        }
        if let Some(bank) = self.bank.as_mut() {
            let mut io = EventIo {
                sender: self.sender.clone(),
            };
            bank.reset_all(&mut io);
        }
        self.next_tick = 0;
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn poll_events(&self) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn send_step_events(bank: &ChannelBank, sender: &Sender<PlaybackEvent>) {
    for (seq, voice) in bank.channels().iter().zip(bank.voices()) {
        if !seq.is_running() {
            continue;
        }
        let channel = seq.channel();
        let _ = sender.send(PlaybackEvent::StepAdvanced {
            channel,
            cursors: *seq.cursors(),
        });
        if voice.retrigger {
            let _ = sender.send(PlaybackEvent::NoteOn {
                channel,
                note: voice.note,
                velocity: voice.velocity,
            });
        } else if voice.gate && voice.slide {
            let _ = sender.send(PlaybackEvent::Glide {
                channel,
                note: voice.note,
            });
        }
    }
}
