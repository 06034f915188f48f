//! Startup configuration: built-in defaults, then an optional TOML file,
//! then command-line flags.

use std::path::{Path, PathBuf};

use a8remote_core::config::RemoteConfig;
use a8remote_core::error::ConfigError;
use serde::Deserialize;
use thiserror::Error;

use crate::Cli;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Flag(#[from] ConfigError),
}

/// Contents of `config.toml`.
///
/// ```toml
/// machine = "headless"
///
/// [remote]
/// enabled = true
/// socket_path = "/tmp/atari800_ai.sock"
/// debug_port = 0xD7FF
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub machine: Option<String>,
    pub remote: RemoteConfig,
}

/// `<config_dir>/a8remote/config.toml`, when the platform has a config dir.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("a8remote").join("config.toml"))
}

/// Load the config file named on the command line, or the default one if
/// it exists. A missing default file is not an error; a missing explicit
/// one is.
pub fn load_file(explicit: Option<&Path>) -> Result<FileConfig, LoadError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(FileConfig::default()),
        },
    };
    let text = std::fs::read_to_string(&path).map_err(|source| LoadError::Read {
        path: path.clone(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| LoadError::Parse { path, source })
}

/// Resolve the effective settings from a full argv.
///
/// The single-dash `-ai` flags are stripped before clap sees the arguments,
/// then applied on top of the file config together with the clap flags.
pub fn resolve(argv: Vec<String>) -> Result<(Cli, FileConfig), LoadError> {
    use clap::Parser;

    let mut remaining = argv.clone();
    RemoteConfig::default().extract_args(&mut remaining)?;
    let cli = Cli::parse_from(remaining);

    let mut file = load_file(cli.config.as_deref())?;
    file.remote.extract_args(&mut argv.clone())?;
    apply_cli(&cli, &mut file.remote)?;
    Ok((cli, file))
}

fn apply_cli(cli: &Cli, remote: &mut RemoteConfig) -> Result<(), ConfigError> {
    if cli.ai {
        remote.enabled = true;
    }
    if cli.ai_run {
        remote.enabled = true;
        remote.start_running = true;
    }
    if let Some(path) = &cli.ai_socket {
        remote.socket_path = path.clone();
    }
    if let Some(addr) = &cli.ai_debug_port {
        remote.debug_port = a8remote_core::config::parse_address(addr)
            .ok_or_else(|| ConfigError::InvalidAddress(addr.clone()))?;
    }
    Ok(())
}
