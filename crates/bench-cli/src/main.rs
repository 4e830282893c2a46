//! # bench
//!
//! Runs workbench commands over one shared WebSocket connection. Each target
//! gets its own panel (invoker + output); all panels share the connection.

#![deny(unsafe_code)]

mod console;
mod shell;
mod target;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use bench_channel::{SharedChannel, TransportConfig, TransportHandle, connect};
use bench_core::TokenGenerator;
use bench_invoker::{CommandInvoker, Outcome};
use bench_settings::BenchSettings;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::console::ConsoleSink;
use crate::target::{AttachArg, Target};

/// Run workbench commands over one shared connection.
#[derive(Parser, Debug)]
#[command(name = "bench", about = "Run workbench commands over one shared connection")]
struct Cli {
    /// Server WebSocket URL (overrides settings).
    #[arg(long, global = true)]
    url: Option<String>,

    /// Settings file (defaults to ~/.bench/settings.json).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log level filter (overrides settings; `RUST_LOG` wins over both).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one or more commands concurrently and wait for all of them.
    Run {
        /// Targets as `<command>:<module>`, e.g. `runjs:/sample/sh-test.mjs`.
        #[arg(required = true)]
        targets: Vec<Target>,

        /// Argument text sent with every command.
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        args: String,

        /// Attach `NAME=TEXT` to every command. Repeatable.
        #[arg(long = "attach", value_name = "NAME=TEXT")]
        attachments: Vec<AttachArg>,

        /// Write each panel's output to `output_<command>_<module>.txt`.
        #[arg(long)]
        save_output: bool,
    },
    /// Interactive panel for a single command.
    Shell {
        /// Target as `<command>:<module>`.
        target: Target,
    },
}

fn load_settings(cli: &Cli) -> Result<BenchSettings> {
    let mut settings = match &cli.settings {
        Some(path) => bench_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => bench_settings::load_settings().context("Failed to load settings")?,
    };
    if let Some(url) = &cli.url {
        settings.connection.url.clone_from(url);
    }
    if let Some(level) = &cli.log_level {
        settings.logging.level.clone_from(level);
    }
    bench_settings::loader::validate(&settings).context("Invalid settings")?;
    Ok(settings)
}

async fn open_channel(settings: &BenchSettings) -> Result<(SharedChannel, TransportHandle)> {
    let (channel, outbound) = SharedChannel::new(settings.connection.outbound_queue);
    let config = TransportConfig::from(&settings.connection);
    let handle = connect(&config, &channel, outbound)
        .await
        .with_context(|| format!("Failed to connect to {}", config.url))?;
    Ok((channel, handle))
}

struct Panel {
    invoker: Arc<CommandInvoker>,
    sink: Arc<ConsoleSink>,
}

fn open_panel(index: usize, target: &Target, channel: &SharedChannel, tokens: &TokenGenerator) -> Panel {
    let owner = format!("cmdView-{index}");
    let sink = Arc::new(ConsoleSink::new(owner.clone()));
    let invoker = CommandInvoker::new(
        &owner,
        target.to_def(),
        Arc::new(channel.clone()),
        sink.clone(),
        tokens,
    );
    Panel { invoker, sink }
}

async fn run_targets(
    settings: &BenchSettings,
    targets: &[Target],
    args: &str,
    attachments: &[AttachArg],
    save_output: bool,
) -> Result<()> {
    let (channel, handle) = open_channel(settings).await?;
    let tokens = TokenGenerator::new(settings.tokens.strategy);

    let panels: Vec<Panel> = targets
        .iter()
        .enumerate()
        .map(|(i, target)| open_panel(i, target, &channel, &tokens))
        .collect();

    for panel in &panels {
        let _ = panel.invoker.set_args(args);
        for attach in attachments {
            let _ = panel.invoker.add_attachment(attach.name.clone(), attach.text.clone());
        }
        if let Err(e) = panel.invoker.run() {
            warn!(token = %panel.invoker.token(), error = %e, "command not started");
        }
    }

    let all_idle = async {
        for panel in &panels {
            panel.invoker.wait_until_idle().await;
        }
    };
    tokio::select! {
        () = all_idle => {}
        res = tokio::signal::ctrl_c() => {
            res.context("Failed to listen for ctrl-c")?;
            warn!("interrupted; in-flight commands are not cancelled on the server");
        }
    }

    // Joining the transport flushes any output still being delivered.
    handle.shutdown();
    let exit = handle.join().await;
    info!(?exit, "transport stopped");

    if save_output {
        for panel in &panels {
            let file = panel.invoker.output_file_name();
            std::fs::write(&file, panel.sink.contents().trim())
                .with_context(|| format!("Failed to write {file}"))?;
            info!(file, "output saved");
        }
    }

    let failed = panels
        .iter()
        .filter(|p| !p.invoker.last_outcome().as_ref().is_some_and(Outcome::is_success))
        .count();
    if failed > 0 {
        bail!("{failed} of {} commands did not succeed", panels.len());
    }
    Ok(())
}

async fn run_shell(settings: &BenchSettings, target: &Target) -> Result<()> {
    let (channel, handle) = open_channel(settings).await?;
    let tokens = TokenGenerator::new(settings.tokens.strategy);
    let panel = open_panel(0, target, &channel, &tokens);

    shell::run_shell(Arc::clone(&panel.invoker)).await?;

    handle.shutdown();
    let _ = handle.join().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(&cli)?;
    if settings.logging.json {
        bench_core::logging::init_json_subscriber(&settings.logging.level);
    } else {
        bench_core::logging::init_subscriber(&settings.logging.level);
    }
    if bench_settings::init_settings(settings).is_err() {
        warn!("settings already initialized");
    }
    let settings = bench_settings::get_settings();
    info!(url = %settings.connection.url, "bench starting");

    match &cli.command {
        Command::Run {
            targets,
            args,
            attachments,
            save_output,
        } => run_targets(settings, targets, args, attachments, *save_output).await,
        Command::Shell { target } => run_shell(settings, target).await,
    }
}
