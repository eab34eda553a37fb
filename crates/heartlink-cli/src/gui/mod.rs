//! Native desktop window for driving a heart rate sensor.
//!
//! This module provides the "Heart Rate Demo" window built with
//! [egui](https://www.egui.rs/).
//!
//! # Usage
//!
//! ```bash
//! heartlink gui
//! ```

mod app;

use std::sync::Arc;
use std::sync::mpsc as std_mpsc;

use anyhow::Result;
use eframe::egui;
use heartlink_core::{
    BtleplugHost, Command, HeartRateSimulator, RequestOptions, SessionEvent, SessionWorker,
    UiState,
};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::config::Config;

pub use app::HeartRateApp;

/// Window title.
pub const WINDOW_TITLE: &str = "Heart Rate Demo";

/// Run the GUI application.
///
/// This is the main entry point for the GUI. It:
/// 1. Starts a tokio runtime in a background thread
/// 2. Creates communication channels between UI and worker
/// 3. Runs the session worker on that runtime
/// 4. Runs the egui/eframe main loop
pub fn run(config: Config) -> Result<()> {
    let (command_tx, command_rx) = mpsc::channel::<Command>(32);
    let (event_tx, event_rx_tokio) = mpsc::channel::<SessionEvent>(32);

    // Bridge from tokio mpsc to std mpsc for sync access in egui
    let (std_tx, std_rx) = std_mpsc::channel::<SessionEvent>();

    let options = RequestOptions::new().maybe_identifier(
        config
            .device
            .clone()
            .or_else(|| config.last_device.clone()),
    );
    let simulator =
        HeartRateSimulator::new(config.simulator.base_bpm, config.simulator.jitter_bpm);

    let runtime_thread = std::thread::spawn(move || {
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                error!("Failed to create tokio runtime: {}", e);
                return;
            }
        };
        rt.block_on(async move {
            let host = match BtleplugHost::new().await {
                Ok(host) => host,
                Err(e) => {
                    error!("Bluetooth unavailable: {}", e);
                    let mut state = UiState::default();
                    state.fail(e.to_string());
                    let _ = std_tx.send(SessionEvent::StateChanged(state));
                    return;
                }
            };

            let worker = SessionWorker::new(command_rx, event_tx, Arc::new(host), options)
                .with_simulator(simulator);

            // Forward events from worker to std channel
            let mut event_rx = event_rx_tokio;
            let forward_handle = tokio::spawn(async move {
                while let Some(event) = event_rx.recv().await {
                    if std_tx.send(event).is_err() {
                        break; // GUI closed
                    }
                }
            });

            worker.run().await;
            forward_handle.abort();
        });
    });

    let viewport = egui::ViewportBuilder::default()
        .with_title(WINDOW_TITLE)
        .with_inner_size([420.0, 360.0])
        .with_min_inner_size([360.0, 300.0]);

    let native_options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    let app_command_tx = command_tx.clone();
    eframe::run_native(
        WINDOW_TITLE,
        native_options,
        Box::new(move |cc| Ok(Box::new(HeartRateApp::new(cc, app_command_tx, std_rx, &config)))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run eframe: {}", e))?;

    // The window is closed: make sure the worker clears its timer and disconnects.
    let _ = command_tx.try_send(Command::Shutdown);
    drop(command_tx);
    if runtime_thread.join().is_err() {
        error!("Worker thread panicked");
    }
    info!("GUI closed");
    Ok(())
}
