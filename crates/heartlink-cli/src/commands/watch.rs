//! Watch command implementation.
//!
//! Drives a [`SessionWorker`](heartlink_core::SessionWorker) the same way the
//! GUI does: one Connect, then a single poll timer. Each tick reads the
//! control point (or writes a simulated heart rate and reads it back).
//! A failed tick clears the cached connection, so the next tick starts over.
//! Ctrl+C clears the timer and disconnects.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use heartlink_core::{
    Command, HeartRate, HeartRateSimulator, PollOptions, SessionEvent, UiState, spawn_worker,
};
use owo_colors::OwoColorize;

use crate::cli::OutputFormat;
use crate::format::{
    FormatOptions, PollLine, format_watch_csv_header, format_watch_csv_line, format_watch_json,
    format_watch_line,
};
use crate::util::{append_output, open_host, request_options, select_device, write_output};

/// Arguments for the watch command.
pub struct WatchArgs<'a> {
    pub device: Option<String>,
    pub timeout: Duration,
    pub interval: Duration,
    pub count: u64,
    pub write: bool,
    pub base_bpm: u16,
    pub jitter_bpm: u16,
    pub max_failures: Option<u32>,
    pub format: OutputFormat,
    pub output: Option<&'a PathBuf>,
    pub quiet: bool,
    pub opts: &'a FormatOptions,
}

pub async fn cmd_watch(args: WatchArgs<'_>) -> Result<()> {
    let WatchArgs {
        device,
        timeout,
        interval,
        count,
        write,
        base_bpm,
        jitter_bpm,
        max_failures,
        format,
        output,
        quiet,
        opts,
    } = args;

    let poll_options = PollOptions::with_interval(interval)
        .write(write)
        .max_consecutive_failures(max_failures);
    poll_options.validate()?;

    let device = select_device(device, quiet).await?;
    let options = request_options(device, timeout);
    let host = Arc::new(open_host(timeout).await?);
    let simulator = HeartRateSimulator::new(base_bpm, jitter_bpm);

    let mut worker = spawn_worker(host, options, simulator);
    worker.commands.send(Command::Connect).await?;
    worker
        .commands
        .send(Command::StartPolling {
            options: poll_options,
        })
        .await?;

    if matches!(format, OutputFormat::Csv) {
        write_output(output, &format_watch_csv_header(opts))?;
    }

    let mut printer = PollPrinter {
        format,
        output,
        opts,
        polling: false,
        polls: 0,
        pending_write: None,
        last_error: None,
    };

    let result = loop {
        let event = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nShutting down...");
                break Ok(());
            }
            event = worker.events.recv() => event,
        };

        let Some(event) = event else {
            break Ok(());
        };

        match printer.handle(event, quiet) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Stop) => break Ok(()),
            Err(e) => break Err(e),
        }

        if count > 0 && printer.polls >= count {
            if !quiet {
                eprintln!("Completed {} polls.", printer.polls);
            }
            break Ok(());
        }
    };

    worker.shutdown().await;
    result
}

enum Flow {
    Continue,
    Stop,
}

/// Turns worker events into output lines.
struct PollPrinter<'a> {
    format: OutputFormat,
    output: Option<&'a PathBuf>,
    opts: &'a FormatOptions,
    polling: bool,
    polls: u64,
    pending_write: Option<HeartRate>,
    last_error: Option<String>,
}

impl PollPrinter<'_> {
    fn handle(&mut self, event: SessionEvent, quiet: bool) -> Result<Flow> {
        match event {
            SessionEvent::Connected { label } => {
                if !quiet {
                    let label = label.to_string();
                    if self.opts.no_color {
                        eprintln!("Watching: {}", label);
                    } else {
                        eprintln!("Watching: {}", label.green());
                    }
                }
            }
            SessionEvent::PollingStarted { interval } => {
                self.polling = true;
                if !quiet {
                    eprintln!("Interval: {:?} | Press Ctrl+C to stop", interval);
                    eprintln!("{}", "-".repeat(50));
                }
            }
            SessionEvent::HeartRateWritten { bpm } => self.pending_write = Some(bpm),
            SessionEvent::ControlPointRead(reading) => {
                let tick = if self.polling {
                    self.polls += 1;
                    self.polls
                } else {
                    0
                };
                let line = PollLine::new(tick, self.pending_write.take(), &reading);
                let content = match self.format {
                    OutputFormat::Json => format_watch_json(&line)?,
                    OutputFormat::Csv => format_watch_csv_line(&line),
                    OutputFormat::Text => format_watch_line(&line, self.opts),
                };
                append_output(self.output, &content)?;
            }
            SessionEvent::StateChanged(state) => {
                if let Some(message) = self.new_failure(&state) {
                    eprintln!("Poll failed: {}. Will reconnect on next poll.", message);
                }
            }
            SessionEvent::PollingStopped => {
                if self.polling {
                    eprintln!("Polling stopped after repeated failures.");
                    return Ok(Flow::Stop);
                }
            }
            SessionEvent::Disconnected => return Ok(Flow::Stop),
        }
        Ok(Flow::Continue)
    }

    /// The error of `state`, unless it is the one already reported.
    ///
    /// The worker republishes its state on timer changes, so the same
    /// failure can arrive more than once.
    fn new_failure<'s>(&mut self, state: &'s UiState) -> Option<&'s str> {
        let message = state.error_message();
        if message == self.last_error.as_deref() {
            return None;
        }
        self.last_error = message.map(str::to_string);
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heartlink_core::{ControlPointReading, DeviceLabel};

    fn printer<'a>(opts: &'a FormatOptions, output: Option<&'a PathBuf>) -> PollPrinter<'a> {
        PollPrinter {
            format: OutputFormat::Csv,
            output,
            opts,
            polling: false,
            polls: 0,
            pending_write: None,
            last_error: None,
        }
    }

    #[test]
    fn test_connect_read_is_not_counted_as_poll() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watch.csv");
        let opts = FormatOptions::new(true);
        let mut p = printer(&opts, Some(&path));

        let reading = ControlPointReading::from_bytes(vec![0x00, 0x48]).unwrap();
        p.handle(SessionEvent::ControlPointRead(reading.clone()), true)
            .unwrap();
        assert_eq!(p.polls, 0);

        p.handle(
            SessionEvent::PollingStarted {
                interval: Duration::from_secs(1),
            },
            true,
        )
        .unwrap();
        p.handle(
            SessionEvent::HeartRateWritten {
                bpm: HeartRate::new(72).unwrap(),
            },
            true,
        )
        .unwrap();
        p.handle(SessionEvent::ControlPointRead(reading), true)
            .unwrap();
        assert_eq!(p.polls, 1);

        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(",0,,72"));
        assert!(lines[1].ends_with(",1,72,72"));
    }

    #[test]
    fn test_polling_stopped_ends_watch() {
        let opts = FormatOptions::new(true);
        let mut p = printer(&opts, None);
        assert!(matches!(
            p.handle(SessionEvent::PollingStopped, true).unwrap(),
            Flow::Continue
        ));
        p.polling = true;
        assert!(matches!(
            p.handle(SessionEvent::PollingStopped, true).unwrap(),
            Flow::Stop
        ));
    }

    #[test]
    fn test_republished_failure_is_reported_once() {
        let opts = FormatOptions::new(true);
        let mut p = printer(&opts, None);

        let mut failed = UiState::default();
        failed.fail("Device not found: no heart rate devices in range");
        assert!(p.new_failure(&failed).is_some());

        failed.set_polling(true);
        assert!(p.new_failure(&failed).is_none());

        let recovered = UiState::default();
        assert!(p.new_failure(&recovered).is_none());
        assert!(p.new_failure(&failed).is_some());

        let mut other = UiState::default();
        other.fail("Not connected to device");
        assert_eq!(p.new_failure(&other), Some("Not connected to device"));
    }

    #[test]
    fn test_connected_event_is_informational() {
        let opts = FormatOptions::new(true);
        let mut p = printer(&opts, None);
        let flow = p
            .handle(
                SessionEvent::Connected {
                    label: DeviceLabel {
                        name: None,
                        identifier: "AA:BB".to_string(),
                    },
                },
                true,
            )
            .unwrap();
        assert!(matches!(flow, Flow::Continue));
    }
}
