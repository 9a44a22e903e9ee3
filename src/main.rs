//! Headset PnP Status - Command Line Entry Point

use clap::{Parser, Subcommand};
use headset_pnp_status::error::{AppError, Result};
use headset_pnp_status::headset::{Headset, HeadsetStatus};
use headset_pnp_status::logging::{init_logging, parse_log_level, LogSetup};
use headset_pnp_status::pnp::DeviceDirectory;
use headset_pnp_status::settings::{AppConfig, ConfigManager};
use log::{debug, error};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "headset_status")]
#[command(about = "Battery and connection state of a Bluetooth headset from Windows PnP data", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Friendly name of the hands-free device (`_` matches any one character)
    #[arg(long, global = true)]
    hands_free: Option<String>,

    /// Friendly name of the headphones device (`_` matches any one character)
    #[arg(long, global = true)]
    headphones: Option<String>,

    /// Configuration file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show battery, connection and last-connected time (default)
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the battery level in percent
    Battery,
    /// Print whether the headphones are connected
    Connected,
    /// Print when the headphones were last connected (UTC)
    LastConnected,
    /// Cycle the Bluetooth sub-devices to reconnect (needs administrative rights)
    Connect,
    /// Disable the Bluetooth sub-devices to disconnect (needs administrative rights)
    Disconnect,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };
    let config = config_manager.load()?;

    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    init_logging(LogSetup {
        level: parse_log_level(level),
        log_dir: Some(config_manager.log_dir()),
        max_file_size: config.logging.max_file_size,
        max_files: config.logging.max_files,
    })?;
    debug!("Using config {:?}", config_manager.config_path());

    execute(cli, config)
}

#[cfg(windows)]
fn execute(cli: Cli, config: AppConfig) -> Result<()> {
    use headset_pnp_status::pnp::SetupApiDirectory;
    execute_with(SetupApiDirectory::new(), cli, config)
}

#[cfg(not(windows))]
fn execute(_cli: Cli, _config: AppConfig) -> Result<()> {
    Err(AppError::Unsupported(
        "The PnP device inventory is only available on Windows".to_string(),
    ))
}

#[cfg_attr(not(windows), allow(dead_code))]
fn execute_with<D: DeviceDirectory>(directory: D, cli: Cli, config: AppConfig) -> Result<()> {
    let headset = Headset::create_with_config(
        directory,
        config.headset,
        cli.hands_free.as_deref(),
        cli.headphones.as_deref(),
    )?;

    match cli.command.unwrap_or(Commands::Status { json: false }) {
        Commands::Status { json } => {
            let status = HeadsetStatus::read(&headset)?;
            if json {
                let out = serde_json::to_string_pretty(&status).map_err(|e| {
                    AppError::ConfigError(format!("Could not serialize status: {}", e))
                })?;
                println!("{}", out);
            } else {
                println!("{}", status);
            }
        }
        Commands::Battery => println!("{}", headset.battery_level()),
        Commands::Connected => println!("{}", headset.connected()?),
        Commands::LastConnected => println!("{}", headset.last_connected_time()?.to_rfc3339()),
        Commands::Connect => headset.try_connect()?,
        Commands::Disconnect => headset.try_disconnect()?,
    }

    Ok(())
}
