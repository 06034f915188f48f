//! Error types for each layer of the remote-control stack.
//!
//! Nothing here is fatal to the host once the listener is bound: framing and
//! command errors are answered on the wire, transport errors only tear the
//! session down.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Startup failures surfaced to the host.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("failed to bind control socket {}: {source}", path.display())]
    Bind {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Malformed request envelopes. Answered with an error response; the
/// session stays open.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("Malformed length prefix")]
    BadPrefix,

    #[error("Request length must be positive")]
    Empty,

    #[error("Request length {len} exceeds maximum of {max} bytes")]
    TooLarge { len: usize, max: usize },

    #[error("Invalid JSON: {0}")]
    InvalidPayload(String),

    #[error("Missing cmd")]
    MissingCommand,
}

/// Failures reported by the emulator collaborator.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("no such drive D{0}:")]
    InvalidDrive(u8),

    #[error("invalid state snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("image encoding failed: {0}")]
    Encoding(String),
}

/// Reasons a single command could not be carried out. The emulator state is
/// left unchanged whenever one of these is returned.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("No {0} specified")]
    MissingField(&'static str),

    #[error("Invalid port {port} (expected 0-{max})")]
    InvalidPort { port: i64, max: i64 },

    #[error("Invalid drive {0} (expected 1-8)")]
    InvalidDrive(i64),

    #[error("Invalid address {0}")]
    InvalidAddress(i64),

    #[error("Invalid byte value {0}")]
    InvalidByte(i64),

    #[error("Invalid range {start}-{end}")]
    InvalidRange { start: i64, end: i64 },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("{context}: {source}")]
    Machine {
        context: String,
        #[source]
        source: MachineError,
    },
}

impl CommandError {
    pub fn machine(context: impl Into<String>, source: MachineError) -> Self {
        Self::Machine {
            context: context.into(),
            source,
        }
    }
}

/// Invalid startup flags.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid debug port address: {0}")]
    InvalidAddress(String),
}
