use std::path::PathBuf;

use a8remote_core::server::Remote;
use a8remote_machines::registry;
use clap::Parser;

mod config;
mod media;
mod runner;

const DEFAULT_MACHINE: &str = "headless";

/// Headless Atari 8-bit host with a socket control interface for agents.
///
/// The emulator-style flags `-ai`, `-ai-run`, `-ai-socket <path>` and
/// `-ai-debug-port <addr>` are also accepted.
#[derive(Parser, Debug)]
#[command(name = "a8remote", version)]
pub struct Cli {
    /// Program (.xex), disk (.atr/.xfd) or saved state (.a8s) to load.
    pub media: Option<PathBuf>,

    /// Machine to run.
    #[arg(short, long)]
    pub machine: Option<String>,

    /// Config file (default: <config dir>/a8remote/config.toml).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable the control socket, starting paused.
    #[arg(long)]
    pub ai: bool,

    /// Enable the control socket and run until a client connects.
    #[arg(long)]
    pub ai_run: bool,

    /// Control socket path.
    #[arg(long, value_name = "PATH")]
    pub ai_socket: Option<PathBuf>,

    /// Debug output address (decimal, 0x hex or 0 octal).
    #[arg(long, value_name = "ADDR")]
    pub ai_debug_port: Option<String>,

    /// Exit after this many frames.
    #[arg(long)]
    pub frames: Option<u64>,

    /// Run as fast as possible instead of at 59.92 Hz.
    #[arg(long)]
    pub turbo: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (cli, file) = config::resolve(std::env::args().collect())?;

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    let machine_name = cli
        .machine
        .as_deref()
        .or(file.machine.as_deref())
        .unwrap_or(DEFAULT_MACHINE);
    let Some(entry) = registry::find(machine_name) else {
        let names: Vec<_> = registry::all().iter().map(|e| e.name).collect();
        return Err(format!(
            "Unknown machine: {machine_name} (available: {})",
            names.join(", ")
        )
        .into());
    };
    log::info!("Machine: {} ({})", entry.name, entry.description);

    let mut machine = (entry.create)();
    if let Some(path) = &cli.media {
        media::load(machine.as_mut(), path)?;
    }

    let mut remote = if file.remote.enabled {
        Some(Remote::bind(&file.remote, machine.as_mut())?)
    } else {
        None
    };

    let opts = runner::RunOptions {
        frames: cli.frames,
        turbo: cli.turbo,
    };
    runner::run(machine.as_mut(), remote.as_mut(), &opts);
    Ok(())
}
