#[cfg(feature = "gui")]
use eframe::egui;

#[cfg(feature = "gui")]
use polylane::{
    midi_note_name, randomize_lanes, AudioOutput, EngineConfig, GatePin, MidiOutputDevice, ParamId,
    PlaybackEngine, PlaybackEvent, TickInput, CHANNEL_COUNT, MAX_STEPS, MIN_STEPS,
};

#[cfg(feature = "gui")]
fn main() -> Result<(), eframe::Error> {
    env_logger::init();
    log::info!("Starting POLYLANE");

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(&path).unwrap_or_else(|err| {
            log::warn!("{}; using defaults", err);
            EngineConfig::default()
        }),
        None => EngineConfig::default(),
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 700.0])
            .with_title("POLYLANE - Parameter Lane Sequencer"),
        ..Default::default()
    };

    eframe::run_native(
        "POLYLANE",
        options,
        Box::new(|_cc| Ok(Box::new(SequencerApp::new(config)))),
    )
}

#[cfg(not(feature = "gui"))]
fn main() {
    eprintln!("This binary requires the 'gui' feature to be enabled");
    std::process::exit(1);
}

#[cfg(feature = "gui")]
struct SequencerApp {
    playback_engine: PlaybackEngine,
    audio_output: AudioOutput,
    midi_output: MidiOutputDevice,

    // UI state
    available_midi_ports: Vec<String>,
    selected_port: Option<usize>,
    selected_channel: usize,
    cursors: [[usize; ParamId::COUNT]; CHANNEL_COUNT],
    gate_leds: [bool; 2],
    sensor_active: bool,
    sensor_distance: f32,
    held: [bool; 6],
    edit_mode: bool,
}

#[cfg(feature = "gui")]
impl SequencerApp {
    fn new(config: EngineConfig) -> Self {
        let available_midi_ports = MidiOutputDevice::available_ports();
        let mut midi_output = MidiOutputDevice::new();
        let mut selected_port = None;
        if let Some(port) = config.midi_port {
            match midi_output.connect(port) {
                Ok(()) => selected_port = Some(port),
                Err(err) => log::warn!("{}", err),
            }
        }

        Self {
            playback_engine: PlaybackEngine::new(config),
            audio_output: AudioOutput::default(),
            midi_output,
            available_midi_ports,
            selected_port,
            selected_channel: 0,
            cursors: [[0; ParamId::COUNT]; CHANNEL_COUNT],
            gate_leds: [false; 2],
            sensor_active: false,
            sensor_distance: 0.0,
            held: [false; 6],
            edit_mode: false,
        }
    }

    fn monitored_channel(&self) -> u8 {
        self.selected_channel as u8 + 1
    }

    fn handle_playback_events(&mut self) {
        let events = self.playback_engine.poll_events();
        let monitored = self.monitored_channel();

        for event in events {
            let sent = match event {
                PlaybackEvent::StepAdvanced { channel, cursors } => {
                    let slot = (channel as usize)
                        .checked_sub(1)
                        .and_then(|i| self.cursors.get_mut(i));
                    if let Some(slot) = slot {
                        *slot = cursors;
                    }
                    Ok(())
                }
                PlaybackEvent::NoteOn {
                    channel,
                    note,
                    velocity,
                } => {
                    if channel == monitored {
                        self.audio_output.trigger_note(note, velocity);
                    }
                    self.midi_output.send_note_on(channel, note, velocity)
                }
                PlaybackEvent::Glide { channel, note } => {
                    if channel == monitored {
                        self.audio_output.glide_to(note);
                    }
                    self.midi_output.send_glide(channel, note)
                }
                PlaybackEvent::NoteOff { channel } => {
                    if channel == monitored {
                        self.audio_output.stop_note();
                    }
                    self.midi_output.send_note_off(channel)
                }
                PlaybackEvent::Gate { pin, high } => {
                    let led = match pin {
                        GatePin::A => 0,
                        GatePin::B => 1,
                    };
                    self.gate_leds[led] = high;
                    Ok(())
                }
                PlaybackEvent::ClockPulse => self.midi_output.send_clock(),
            };
            if let Err(err) = sent {
                log::warn!(target: "midi", "{}", err);
            }
        }
    }

    fn push_tick_input(&self) {
        let input = TickInput {
            sensor_distance: self.sensor_active.then_some(self.sensor_distance),
            held: self.held,
            edit_mode: self.edit_mode,
        };
        self.playback_engine.set_input(input);
        self.playback_engine.set_record_target(self.selected_channel);
    }

    fn stop_playback(&mut self) {
        self.playback_engine.stop();
        self.audio_output.stop_note();
        if let Err(err) = self.midi_output.all_notes_off() {
            log::warn!(target: "midi", "{}", err);
        }
    }

    fn lane_editor(&self, ui: &mut egui::Ui) {
        let Some(params) = self.playback_engine.params(self.selected_channel) else {
            return;
        };
        let is_playing = self.playback_engine.is_running();
        let cursors = &self.cursors[self.selected_channel];

        egui::ScrollArea::both().show(ui, |ui| {
            egui::Grid::new("lanes").spacing([4.0, 6.0]).show(ui, |ui| {
                for id in ParamId::ALL {
                    let def = id.definition();
                    ui.label(id.name());

                    let mut length = params.step_count(id);
                    if ui
                        .add(egui::DragValue::new(&mut length).range(MIN_STEPS..=MAX_STEPS))
                        .changed()
                    {
                        params.set_step_count(id, length);
                    }

                    let track = params.track(id);
                    for (step, &value) in track.active_values().iter().enumerate() {
                        let is_current = is_playing && cursors[id.index()] == step;
                        if def.is_binary {
                            let on = value >= 0.5;
                            let button = egui::Button::new(if is_current { "●" } else { " " })
                                .min_size(egui::vec2(22.0, 22.0))
                                .fill(if is_current {
                                    egui::Color32::from_rgb(100, 200, 100)
                                } else if on {
                                    egui::Color32::from_rgb(60, 60, 200)
                                } else {
                                    egui::Color32::from_rgb(40, 40, 40)
                                });
                            if ui.add(button).clicked() {
                                params.set_value(id, step, if on { 0.0 } else { 1.0 });
                            }
                        } else {
                            let mut edited = value;
                            let speed = (def.max_f32() - def.min_f32()) / 200.0;
                            let mut drag = egui::DragValue::new(&mut edited)
                                .range(def.min_f32()..=def.max_f32())
                                .speed(speed)
                                .max_decimals(2);
                            if id == ParamId::Note {
                                drag = drag.custom_formatter(|n, _| {
                                    let key = polylane::midi::voice_note_to_midi(n as i32);
                                    midi_note_name(key)
                                });
                            }
                            let mut response = ui.add(drag);
                            if is_current {
                                response = response.highlight();
                            }
                            if response.changed() {
                                params.set_value(id, step, edited);
                            }
                        }
                    }
                    ui.end_row();
                }
            });
        });
    }
}

#[cfg(feature = "gui")]
impl eframe::App for SequencerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint();

        self.handle_playback_events();
        self.push_tick_input();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("POLYLANE - Parameter Lane Sequencer");
            ui.add_space(10.0);

            // MIDI Port Selection
            let mut selected_port_changed = None;
            ui.horizontal(|ui| {
                ui.label("MIDI Output:");
                if self.available_midi_ports.is_empty() {
                    ui.label("No MIDI ports available");
                } else {
                    egui::ComboBox::from_label("")
                        .selected_text(
                            self.selected_port
                                .and_then(|i| self.available_midi_ports.get(i))
                                .map(String::as_str)
                                .unwrap_or("Select port..."),
                        )
                        .show_ui(ui, |ui| {
                            for (i, port_name) in self.available_midi_ports.iter().enumerate() {
                                if ui
                                    .selectable_label(self.selected_port == Some(i), port_name)
                                    .clicked()
                                {
                                    selected_port_changed = Some(i);
                                }
                            }
                        });
                }
            });

            if let Some(port_idx) = selected_port_changed {
                match self.midi_output.connect(port_idx) {
                    Ok(()) => self.selected_port = Some(port_idx),
                    Err(err) => log::warn!(target: "midi", "{}", err),
                }
            }

            ui.add_space(10.0);

            // Transport controls
            ui.horizontal(|ui| {
                let is_playing = self.playback_engine.is_running();

                if is_playing {
                    if ui.button("⏸ Stop").clicked() {
                        self.stop_playback();
                    }
                } else if ui.button("▶ Play").clicked() {
                    self.playback_engine.start();
                }

                if ui.button("⏮ Reset").clicked() {
                    self.playback_engine.reset();
                }

                ui.add_space(20.0);

                ui.label("BPM:");
                let mut bpm = self.playback_engine.config().bpm;
                if ui
                    .add_enabled(
                        !is_playing,
                        egui::Slider::new(&mut bpm, 40.0..=240.0).step_by(1.0),
                    )
                    .changed()
                {
                    self.playback_engine.set_bpm(bpm);
                }

                ui.add_space(20.0);

                for (led, name) in self.gate_leds.iter().zip(["Gate A", "Gate B"]) {
                    let color = if *led {
                        egui::Color32::from_rgb(100, 200, 100)
                    } else {
                        egui::Color32::DARK_GRAY
                    };
                    ui.colored_label(color, format!("● {}", name));
                }
            });

            ui.add_space(10.0);

            // Channel selection
            ui.horizontal(|ui| {
                ui.label("Channel:");
                for i in 0..CHANNEL_COUNT {
                    if ui
                        .selectable_label(self.selected_channel == i, format!("{}", i + 1))
                        .clicked()
                    {
                        self.selected_channel = i;
                        self.audio_output.stop_note();
                    }
                }

                ui.add_space(20.0);

                if ui.button("🎲 Randomize").clicked() {
                    if let Some(params) = self.playback_engine.params(self.selected_channel) {
                        randomize_lanes(params);
                    }
                }
            });

            ui.add_space(10.0);

            // Distance sensor
            ui.horizontal(|ui| {
                ui.checkbox(&mut self.sensor_active, "Sensor");
                let max_range = self.playback_engine.config().sensor_max_range;
                ui.add(egui::Slider::new(&mut self.sensor_distance, 0.0..=max_range).text("mm"));
                ui.add_space(10.0);
                ui.label("Record:");
                for (held, id) in self.held.iter_mut().zip(ParamId::RECORDABLE) {
                    ui.toggle_value(held, id.name());
                }
                ui.add_space(10.0);
                ui.checkbox(&mut self.edit_mode, "Edit mode");
            });

            ui.separator();

            self.lane_editor(ui);

            // Info
            ui.separator();
            ui.label("Each lane loops at its own length; hold a record button to paint the sensor into it");
            if !self.midi_output.is_connected() {
                ui.colored_label(
                    egui::Color32::YELLOW,
                    "⚠ No MIDI output connected - audio playback only",
                );
            }
        });
    }
}
