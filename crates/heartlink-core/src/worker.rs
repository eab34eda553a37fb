//! Background worker that owns a heart rate session.
//!
//! [`SessionWorker`] holds the host, the [`ConnectionHandle`], the
//! [`UiState`], the simulator and at most one [`Poller`]. It handles commands
//! one at a time on a single task and interleaves poll ticks with them, so
//! none of that state needs locking.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use heartlink_types::HeartRate;

use crate::actions;
use crate::connection::ConnectionHandle;
use crate::host::{BluetoothHost, RequestOptions};
use crate::messages::{Command, SessionEvent};
use crate::polling::{PollOptions, Poller, next_tick};
use crate::simulator::HeartRateSimulator;
use crate::state::{DISCONNECTED_STATUS, UiState};

/// Background worker for one heart rate session.
pub struct SessionWorker<H: BluetoothHost> {
    command_rx: mpsc::Receiver<Command>,
    event_tx: mpsc::Sender<SessionEvent>,
    host: Arc<H>,
    options: RequestOptions,
    handle: ConnectionHandle<H>,
    state: UiState,
    simulator: HeartRateSimulator,
    poller: Option<Poller>,
    cancel_token: CancellationToken,
}

impl<H: BluetoothHost> SessionWorker<H> {
    /// Create a worker for `host`.
    pub fn new(
        command_rx: mpsc::Receiver<Command>,
        event_tx: mpsc::Sender<SessionEvent>,
        host: Arc<H>,
        options: RequestOptions,
    ) -> Self {
        Self {
            command_rx,
            event_tx,
            host,
            options,
            handle: ConnectionHandle::new(),
            state: UiState::default(),
            simulator: HeartRateSimulator::default(),
            poller: None,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Use a specific simulator.
    pub fn with_simulator(mut self, simulator: HeartRateSimulator) -> Self {
        self.simulator = simulator;
        self
    }

    /// A token that stops the worker when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Run the worker's main loop until shutdown.
    pub async fn run(mut self) {
        info!("SessionWorker started");
        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => break,
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(Command::Shutdown) | None => break,
                        Some(cmd) => self.handle_command(cmd).await,
                    }
                }
                tick = next_tick(&mut self.poller) => {
                    match tick {
                        Some(n) => self.handle_tick(n).await,
                        None => self.clear_timer().await,
                    }
                }
            }
        }

        self.poller = None;
        self.handle.disconnect(self.host.as_ref()).await;
        info!("SessionWorker stopped");
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect => {
                self.handle_connect().await;
            }
            Command::SetHeartRate { bpm } => {
                let bpm = bpm.unwrap_or_else(|| self.simulator.next_bpm());
                self.handle_set_heart_rate(bpm).await;
            }
            Command::TuneSimulator {
                base_bpm,
                jitter_bpm,
            } => {
                debug!(base_bpm, jitter_bpm, "Retuning simulator");
                self.simulator.retune(base_bpm, jitter_bpm);
            }
            Command::StartPolling { options } => self.handle_start_polling(options).await,
            Command::StopPolling => self.clear_timer().await,
            Command::Disconnect => self.handle_disconnect().await,
            Command::Shutdown => {}
        }
    }

    /// Send an event to the UI, logging any send failures.
    async fn send_event(&self, event: SessionEvent) {
        if let Err(e) = self.event_tx.send(event).await {
            error!("Failed to send event to UI: {}", e);
        }
    }

    async fn publish_state(&self) {
        self.send_event(SessionEvent::StateChanged(self.state.clone()))
            .await;
    }

    /// Returns whether the read succeeded.
    async fn handle_connect(&mut self) -> bool {
        let was_ready = self.handle.is_ready();
        let result = actions::connect(
            &mut self.handle,
            self.host.as_ref(),
            &mut self.state,
            &self.options,
        )
        .await;

        let ok = match result {
            Ok(reading) => {
                self.announce_connection(was_ready).await;
                self.send_event(SessionEvent::ControlPointRead(reading)).await;
                true
            }
            Err(_) => false,
        };
        self.publish_state().await;
        ok
    }

    async fn announce_connection(&self, was_ready: bool) {
        if !was_ready && let Some(label) = self.handle.device_label(self.host.as_ref()) {
            self.send_event(SessionEvent::Connected { label }).await;
        }
    }

    /// Returns whether the write succeeded.
    async fn handle_set_heart_rate(&mut self, bpm: HeartRate) -> bool {
        let was_ready = self.handle.is_ready();
        let result = actions::set_heart_rate(
            &mut self.handle,
            self.host.as_ref(),
            &mut self.state,
            &self.options,
            bpm,
        )
        .await;

        let ok = match result {
            Ok(reading) => {
                self.announce_connection(was_ready).await;
                self.send_event(SessionEvent::HeartRateWritten { bpm }).await;
                self.send_event(SessionEvent::ControlPointRead(reading)).await;
                true
            }
            Err(_) => false,
        };
        self.publish_state().await;
        ok
    }

    async fn handle_start_polling(&mut self, options: PollOptions) {
        if self.poller.is_some() {
            debug!("Poll timer already running");
            return;
        }

        match Poller::with_token(options, self.cancel_token.child_token()) {
            Ok(poller) => {
                let interval = poller.options().interval;
                info!(?interval, write = poller.options().write, "Started polling");
                self.poller = Some(poller);
                self.state.set_polling(true);
                self.send_event(SessionEvent::PollingStarted { interval })
                    .await;
                self.publish_state().await;
            }
            Err(e) => {
                warn!(error = %e, "Refusing to start polling");
                self.state.fail(e.to_string());
                self.publish_state().await;
            }
        }
    }

    async fn handle_tick(&mut self, tick: u64) {
        let write = self.poller.as_ref().is_some_and(|p| p.options().write);
        debug!(tick, write, "Poll tick");

        let ok = if write {
            let bpm = self.simulator.next_bpm();
            self.handle_set_heart_rate(bpm).await
        } else {
            self.handle_connect().await
        };

        let Some(poller) = self.poller.as_mut() else {
            return;
        };
        if ok {
            poller.record_success();
        } else if poller.record_failure() {
            self.clear_timer().await;
        }
    }

    async fn clear_timer(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.cancel();
            info!(ticks = poller.ticks(), "Stopped polling");
            self.state.set_polling(false);
            self.send_event(SessionEvent::PollingStopped).await;
            self.publish_state().await;
        } else {
            debug!("No poll timer to stop");
        }
    }

    async fn handle_disconnect(&mut self) {
        self.clear_timer().await;
        self.handle.disconnect(self.host.as_ref()).await;
        self.state.clear_error();
        self.state.set_status(DISCONNECTED_STATUS);
        self.send_event(SessionEvent::Disconnected).await;
        self.publish_state().await;
    }
}

/// Channels and control for a spawned worker.
pub struct WorkerHandle {
    /// Send commands here.
    pub commands: mpsc::Sender<Command>,
    /// Receive events here.
    pub events: mpsc::Receiver<SessionEvent>,
    cancel_token: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl WorkerHandle {
    /// Stop the worker and wait for it to disconnect.
    pub async fn shutdown(self) {
        let Self {
            events,
            cancel_token,
            task,
            ..
        } = self;
        // A full event channel must not block the worker's exit.
        drop(events);
        cancel_token.cancel();
        if let Err(e) = task.await {
            warn!(error = %e, "Worker task ended abnormally");
        }
    }
}

/// Spawn a worker on the current tokio runtime.
pub fn spawn_worker<H>(
    host: Arc<H>,
    options: RequestOptions,
    simulator: HeartRateSimulator,
) -> WorkerHandle
where
    H: BluetoothHost + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(32);
    let (event_tx, event_rx) = mpsc::channel(64);
    let worker = SessionWorker::new(command_rx, event_tx, host, options).with_simulator(simulator);
    let cancel_token = worker.cancel_token();
    let task = tokio::spawn(worker.run());

    WorkerHandle {
        commands: command_tx,
        events: event_rx,
        cancel_token,
        task,
    }
}
