//! Dropsy - one-way directory mirroring agent
//!
//! Watches local directory trees and replays every addition, modification and
//! deletion on a remote host, once or in a poll loop.

mod display;
mod signals;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dropsy_config::{Config, ConfigLoader};
use dropsy_engine::{CommandTransport, MonitorConfig, WatchController, PASSWORD_ENV};
use dropsy_types::error::EXIT_FATAL;
use dropsy_types::{Credentials, Error, Parallelism, PollInterval, Target};
use signals::wait_for_shutdown_signal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Dropsy - mirror local directories to a remote host
#[derive(Parser, Debug)]
#[command(
    name = "dropsy",
    version = env!("CARGO_PKG_VERSION"),
    about = "Mirror local directories to a remote host",
    long_about = "Dropsy watches local directory trees and replays additions, modifications\n\
                  and deletions on a remote host, either once or in a poll loop."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Quiet mode - errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Verbose mode - per-file output even if the configuration is quieter
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch directories and mirror their changes
    Watch {
        /// Targets in the form user@host:directory
        #[arg(required = true)]
        targets: Vec<String>,
        /// Seconds between cycles (0 runs a single cycle)
        #[arg(short, long)]
        poll: Option<u64>,
        /// Maximum number of concurrent transfers
        #[arg(short, long)]
        jobs: Option<usize>,
        /// Directory holding the state files
        #[arg(long)]
        state_dir: Option<PathBuf>,
    },
    /// Show configuration
    Config {
        /// Show the default configuration instead of the effective one
        #[arg(long)]
        default: bool,
        /// Write the configuration to a file instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(error) = run(cli).await {
        display::print_fatal(&error);
        std::process::exit(exit_code(&error));
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_ref())?;

    init_logging(cli.debug, cli.quiet, cli.verbose, &config)?;
    info!("Dropsy v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Watch {
            targets,
            poll,
            jobs,
            state_dir,
        } => watch_command(config, &targets, poll, jobs, state_dir, cli.quiet).await,
        Commands::Config { default, output } => config_command(&config, default, output),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load_default(),
    };
    Ok(config.map_err(Error::from)?)
}

fn init_logging(debug: bool, quiet: bool, verbose: bool, config: &Config) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug {
        "debug"
    } else if quiet {
        "error"
    } else if verbose {
        "info"
    } else {
        config.logging.level.as_str()
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Invalid log filter")?;

    console::set_colors_enabled(config.logging.colored_output);

    fmt()
        .with_env_filter(filter)
        .with_ansi(config.logging.colored_output)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    Ok(())
}

/// Parse targets and check that they all point at the same account
fn parse_targets(raw_targets: &[String]) -> Result<Vec<Target>> {
    let targets = raw_targets
        .iter()
        .map(|raw| raw.parse::<Target>())
        .collect::<dropsy_types::Result<Vec<_>>>()?;

    if let Some(first) = targets.first() {
        if let Some(other) = targets
            .iter()
            .find(|t| t.username != first.username || t.hostname != first.hostname)
        {
            return Err(Error::config(format!(
                "All targets must share one account: '{}' differs from '{}'",
                other, first
            ))
            .into());
        }
    }

    Ok(targets)
}

fn read_password(target: &Target) -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }

    dialoguer::Password::new()
        .with_prompt(format!("Password for {}@{}", target.username, target.hostname))
        .allow_empty_password(true)
        .interact()
        .context("Failed to read password")
}

async fn watch_command(
    config: Config,
    raw_targets: &[String],
    poll: Option<u64>,
    jobs: Option<usize>,
    state_dir: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    let targets = parse_targets(raw_targets)?;
    let account = targets
        .first()
        .ok_or_else(|| Error::config("No targets given"))?;

    let password = read_password(account)?;
    let credentials = Credentials::new(account.username.clone(), account.hostname.clone(), password);
    let transport = CommandTransport::new(&config.transport, &account.username, &account.hostname);

    let directories = targets.iter().map(|t| t.directory.clone()).collect();
    let mut monitor = MonitorConfig::from_config(&config, directories, credentials);
    if let Some(secs) = poll {
        monitor = monitor.with_poll_interval(PollInterval::from_secs(secs));
    }
    if let Some(jobs) = jobs {
        monitor = monitor.with_parallelism(Parallelism::new(jobs).map_err(Error::config)?);
    }
    if let Some(dir) = state_dir {
        monitor = monitor.with_state_dir(dir);
    }

    if !quiet {
        display::print_banner(&targets, monitor.poll_interval.as_secs(), monitor.parallelism.get());
    }

    let mut controller = WatchController::new(monitor, Arc::new(transport));
    if let Err(e) = controller.init().await {
        controller.shutdown().await;
        return Err(e.into());
    }

    let token = controller.stop_token();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("Shutdown signal received, finishing the current cycle");
        token.cancel();
    });

    controller.run().await?;
    controller.shutdown().await;

    if !quiet {
        display::print_stopped();
    }
    Ok(())
}

fn config_command(config: &Config, default: bool, output: Option<PathBuf>) -> Result<()> {
    let Some(path) = output else {
        let config = if default { Config::default() } else { config.clone() };
        print!("{}", serde_yaml::to_string(&config)?);
        return Ok(());
    };

    if default {
        ConfigLoader::generate_default_config(&path).map_err(Error::from)?;
    } else {
        ConfigLoader::save_to_file(config, &path).map_err(Error::from)?;
    }
    display::print_config_written(&path);
    Ok(())
}

/// Process exit code for a top-level error
fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<Error>()
        .map_or(EXIT_FATAL, Error::exit_code)
}
