//! The "Heart Rate Demo" window.

use std::sync::mpsc as std_mpsc;
use std::time::Duration;

use eframe::egui::{self, Color32, RichText};
use heartlink_core::state::DISCONNECTED_STATUS;
use heartlink_core::{
    Command, ControlPointReading, DeviceLabel, HeartRate, PollOptions, SessionEvent, UiState,
};
use heartlink_types::{MAX_BPM, MIN_BPM};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::Config;

const ERROR_FILL: Color32 = Color32::from_rgb(90, 20, 20);
const ERROR_TEXT: Color32 = Color32::from_rgb(255, 140, 140);
const MAX_JITTER_BPM: u16 = 40;

/// What the window shows, rebuilt from worker events.
#[derive(Debug, Clone, Default)]
pub struct DemoState {
    pub ui: UiState,
    pub device: Option<DeviceLabel>,
    pub last_reading: Option<ControlPointReading>,
    pub last_written: Option<HeartRate>,
    pub polling: bool,
    /// Set when the user dismisses the current error alert.
    pub error_dismissed: bool,
}

impl DemoState {
    /// Fold one worker event into the view state.
    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::StateChanged(state) => {
                if state.error_message() != self.ui.error_message() {
                    self.error_dismissed = false;
                }
                self.polling = state.is_polling();
                // A failed action has already cleared the worker's connection.
                if state.has_error() && state.status() == DISCONNECTED_STATUS {
                    self.device = None;
                }
                self.ui = state;
            }
            SessionEvent::Connected { label } => self.device = Some(label),
            SessionEvent::ControlPointRead(reading) => self.last_reading = Some(reading),
            SessionEvent::HeartRateWritten { bpm } => self.last_written = Some(bpm),
            SessionEvent::PollingStarted { .. } => self.polling = true,
            SessionEvent::PollingStopped => self.polling = false,
            SessionEvent::Disconnected => {
                self.device = None;
                self.polling = false;
            }
        }
    }

    /// The error to show, unless the user dismissed it.
    pub fn visible_error(&self) -> Option<&str> {
        if self.error_dismissed {
            None
        } else {
            self.ui.error_message()
        }
    }
}

/// Main application state.
pub struct HeartRateApp {
    command_tx: mpsc::Sender<Command>,
    event_rx: std_mpsc::Receiver<SessionEvent>,
    state: DemoState,
    /// Polling checkbox; mirrors the worker once it confirms.
    poll_enabled: bool,
    write_enabled: bool,
    poll_interval_secs: u64,
    base_bpm: u16,
    jitter_bpm: u16,
}

impl HeartRateApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        command_tx: mpsc::Sender<Command>,
        event_rx: std_mpsc::Receiver<SessionEvent>,
        config: &Config,
    ) -> Self {
        Self {
            command_tx,
            event_rx,
            state: DemoState::default(),
            poll_enabled: false,
            write_enabled: config.write_enabled,
            poll_interval_secs: config.poll_interval().as_secs(),
            base_bpm: config.simulator.base_bpm.clamp(MIN_BPM, MAX_BPM),
            jitter_bpm: config.simulator.jitter_bpm.min(MAX_JITTER_BPM),
        }
    }

    /// Process pending events from the worker.
    fn process_events(&mut self) {
        let mut received = false;
        while let Ok(event) = self.event_rx.try_recv() {
            debug!(?event, "Worker event");
            self.state.apply(event);
            received = true;
        }
        if received {
            self.poll_enabled = self.state.polling;
        }
    }

    /// Send a command to the worker.
    fn send_command(&self, cmd: Command) {
        let _ = self.command_tx.try_send(cmd);
    }

    fn poll_options(&self) -> PollOptions {
        PollOptions::with_interval(Duration::from_secs(self.poll_interval_secs.max(1)))
            .write(self.write_enabled)
    }

    fn render_error(&mut self, ui: &mut egui::Ui) {
        let Some(message) = self.state.visible_error().map(str::to_owned) else {
            return;
        };
        egui::Frame::new()
            .fill(ERROR_FILL)
            .inner_margin(egui::Margin::same(8))
            .corner_radius(4.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new("Error").strong().color(ERROR_TEXT));
                    ui.label(RichText::new(message).color(ERROR_TEXT));
                    if ui.small_button("Dismiss").clicked() {
                        self.state.error_dismissed = true;
                    }
                });
            });
        ui.add_space(8.0);
    }

    fn render_controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Connect").clicked() {
                info!("Connect clicked");
                self.send_command(Command::Connect);
            }
            let connected = self.state.device.is_some();
            if ui
                .add_enabled(connected, egui::Button::new("Disconnect"))
                .clicked()
            {
                self.send_command(Command::Disconnect);
            }
        });

        ui.add_space(8.0);

        if ui
            .checkbox(&mut self.poll_enabled, "Poll control point")
            .changed()
        {
            if self.poll_enabled {
                self.send_command(Command::StartPolling {
                    options: self.poll_options(),
                });
            } else {
                self.send_command(Command::StopPolling);
            }
        }

        ui.add_enabled_ui(!self.state.polling, |ui| {
            ui.checkbox(&mut self.write_enabled, "Write simulated heart rate");
            ui.add(
                egui::Slider::new(&mut self.poll_interval_secs, 1..=60)
                    .text("Interval (s)"),
            );
        });

        ui.add_space(8.0);

        let base = ui.add(
            egui::Slider::new(&mut self.base_bpm, MIN_BPM..=MAX_BPM).text("Simulated BPM"),
        );
        let jitter =
            ui.add(egui::Slider::new(&mut self.jitter_bpm, 0..=MAX_JITTER_BPM).text("Jitter"));
        if base.changed() || jitter.changed() {
            self.send_command(Command::TuneSimulator {
                base_bpm: self.base_bpm,
                jitter_bpm: self.jitter_bpm,
            });
        }

        if ui.button("Send heart rate").clicked() {
            self.send_command(Command::SetHeartRate { bpm: None });
        }
    }

    fn render_status(&self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.set_width(ui.available_width());
            ui.label(RichText::new(self.state.ui.status()).strong());
            if let Some(device) = &self.state.device {
                ui.label(format!("Device: {}", device));
            }
            if let Some(reading) = &self.state.last_reading {
                ui.label(format!("Control point: {}", reading.value));
            }
            if let Some(bpm) = self.state.last_written {
                ui.label(format!("Last written: {}", bpm));
            }
            if self.state.polling {
                ui.label(RichText::new("Polling").color(Color32::LIGHT_GREEN));
            }
        });
    }
}

impl eframe::App for HeartRateApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_events();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(super::WINDOW_TITLE);
            ui.add_space(8.0);
            self.render_error(ui);
            self.render_controls(ui);
            ui.add_space(12.0);
            self.render_status(ui);
        });

        // Keep draining worker events while idle.
        ctx.request_repaint_after(Duration::from_millis(100));
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        info!("Clearing poll timer and shutting down worker");
        self.send_command(Command::StopPolling);
        self.send_command(Command::Shutdown);
    }
}
