use std::io;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod format;
#[cfg(feature = "gui")]
mod gui;
mod style;
mod util;

use cli::{Cli, Commands};
use commands::{MonitorArgs, ReadArgs, WatchArgs};
use config::{
    Config, DEFAULT_TIMEOUT_SECS, print_device_source_feedback, resolve_device, resolve_timeout,
};
use format::FormatOptions;

fn main() -> Result<()> {
    human_panic::setup_panic!();

    let cli = Cli::parse();

    // Handle completions command early (before tracing init)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "heartlink", &mut io::stdout());
        return Ok(());
    }

    init_tracing(cli.verbose, cli.quiet);

    // The GUI owns the main thread and runs its own runtime.
    #[cfg(feature = "gui")]
    {
        if matches!(cli.command, Commands::Gui) {
            return gui::run(Config::load());
        }
    }

    tokio::runtime::Runtime::new()?.block_on(run(cli))
}

/// Install the global subscriber. `-q` wins over `-v`, then `RUST_LOG`, then `info`.
fn init_tracing(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("warn")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load();
    let no_color = cli.no_color || config.no_color;
    let base_opts = FormatOptions::new(no_color).with_compact(cli.compact);
    let output = cli.output.as_ref();
    let quiet = cli.quiet;

    match cli.command {
        Commands::Scan {
            timeout,
            all,
            output: out,
        } => {
            let opts = base_opts.with_no_header(out.no_header);
            commands::cmd_scan(timeout, all, out.format, output, quiet, &opts).await
        }
        Commands::Read {
            device,
            output: out,
            location,
        } => {
            let opts = base_opts.with_no_header(out.no_header);
            let identifier = resolve_device(device.device, &config);
            print_device_source_feedback(identifier.as_deref(), &config, quiet);
            commands::cmd_read(ReadArgs {
                device: identifier,
                timeout: timeout_for(device.timeout, &config),
                format: out.format,
                location,
                output,
                quiet,
                opts: &opts,
            })
            .await
        }
        Commands::Set { device, bpm } => {
            let identifier = resolve_device(device.device, &config);
            print_device_source_feedback(identifier.as_deref(), &config, quiet);
            commands::cmd_set(
                identifier,
                timeout_for(device.timeout, &config),
                bpm,
                quiet,
                no_color,
            )
            .await
        }
        Commands::Watch {
            device,
            output: out,
            interval,
            count,
            write,
            bpm,
            jitter,
            max_failures,
        } => {
            let opts = base_opts.with_no_header(out.no_header);
            let identifier = resolve_device(device.device, &config);
            print_device_source_feedback(identifier.as_deref(), &config, quiet);
            commands::cmd_watch(WatchArgs {
                device: identifier,
                timeout: timeout_for(device.timeout, &config),
                interval: interval
                    .map(std::time::Duration::from_secs)
                    .unwrap_or_else(|| config.poll_interval()),
                count,
                write: write || config.write_enabled,
                base_bpm: bpm.unwrap_or(config.simulator.base_bpm),
                jitter_bpm: jitter.unwrap_or(config.simulator.jitter_bpm),
                max_failures,
                format: out.format,
                output,
                quiet,
                opts: &opts,
            })
            .await
        }
        Commands::Monitor {
            device,
            output: out,
            count,
        } => {
            let opts = base_opts.with_no_header(out.no_header);
            let identifier = resolve_device(device.device, &config);
            print_device_source_feedback(identifier.as_deref(), &config, quiet);
            commands::cmd_monitor(MonitorArgs {
                device: identifier,
                timeout: timeout_for(device.timeout, &config),
                count,
                format: out.format,
                output,
                quiet,
                opts: &opts,
            })
            .await
        }
        Commands::Config { action } => commands::cmd_config(action),
        Commands::Completions { .. } => Ok(()),
        #[cfg(feature = "gui")]
        Commands::Gui => Ok(()),
    }
}

fn timeout_for(cmd_timeout: u64, config: &Config) -> std::time::Duration {
    std::time::Duration::from_secs(resolve_timeout(cmd_timeout, config, DEFAULT_TIMEOUT_SECS))
}
