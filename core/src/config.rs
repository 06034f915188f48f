use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::debug_port::DEFAULT_CAPACITY;
use crate::error::ConfigError;
use crate::protocol::codec::DEFAULT_MAX_REQUEST;

pub const DEFAULT_SOCKET_PATH: &str = "/tmp/atari800_ai.sock";

/// Startup settings for the remote-control layer. Every field has a default
/// so a partial TOML table is enough.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub enabled: bool,
    pub socket_path: PathBuf,
    /// Debug capture address; 0 leaves capture disarmed.
    pub debug_port: u16,
    /// Free-run until the first client connects instead of starting paused.
    pub start_running: bool,
    pub max_request: usize,
    pub debug_capacity: usize,
    pub idle_wait_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            debug_port: 0,
            start_running: false,
            max_request: DEFAULT_MAX_REQUEST,
            debug_capacity: DEFAULT_CAPACITY,
            idle_wait_ms: 1,
        }
    }
}

impl RemoteConfig {
    /// Sleep between empty polls while paused.
    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms)
    }

    /// Consume the `-ai` family of flags from a host argv, leaving every
    /// other argument in place. `args[0]` is the program name and is never
    /// examined. A value flag in last position has no value and is left
    /// for the host.
    pub fn extract_args(&mut self, args: &mut Vec<String>) -> Result<(), ConfigError> {
        let mut kept = Vec::with_capacity(args.len());
        let mut iter = std::mem::take(args).into_iter();
        if let Some(program) = iter.next() {
            kept.push(program);
        }
        let mut iter = iter.peekable();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-ai" => self.enabled = true,
                "-ai-run" => {
                    self.enabled = true;
                    self.start_running = true;
                }
                "-ai-socket" if iter.peek().is_some() => {
                    if let Some(path) = iter.next() {
                        self.socket_path = PathBuf::from(path);
                    }
                }
                "-ai-debug-port" if iter.peek().is_some() => {
                    if let Some(value) = iter.next() {
                        self.debug_port = parse_address(&value)
                            .ok_or(ConfigError::InvalidAddress(value))?;
                    }
                }
                _ => kept.push(arg),
            }
        }
        *args = kept;
        Ok(())
    }
}

/// Parse an address the way C's `strtol(s, NULL, 0)` reads it: `0x` hex,
/// leading-zero octal, otherwise decimal.
pub fn parse_address(text: &str) -> Option<u16> {
    let text = text.trim();
    let (digits, radix) = if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        (hex, 16)
    } else if text.len() > 1 && text.starts_with('0') {
        (&text[1..], 8)
    } else {
        (text, 10)
    };
    u16::from_str_radix(digits, radix).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn address_radixes() {
        assert_eq!(parse_address("55295"), Some(0xD7FF));
        assert_eq!(parse_address("0xD7FF"), Some(0xD7FF));
        assert_eq!(parse_address("0XD7ff"), Some(0xD7FF));
        assert_eq!(parse_address("0153777"), Some(0xD7FF));
        assert_eq!(parse_address("0"), Some(0));
        assert_eq!(parse_address("0x"), None);
        assert_eq!(parse_address("70000"), None);
        assert_eq!(parse_address("zz"), None);
    }

    #[test]
    fn extracts_flags_and_keeps_the_rest() {
        let mut config = RemoteConfig::default();
        let mut args = argv(&[
            "atari800",
            "-ai",
            "-ai-socket",
            "/tmp/x.sock",
            "-xl",
            "-ai-debug-port",
            "0xD7FF",
            "game.xex",
        ]);
        config.extract_args(&mut args).unwrap();
        assert!(config.enabled);
        assert!(!config.start_running);
        assert_eq!(config.socket_path, PathBuf::from("/tmp/x.sock"));
        assert_eq!(config.debug_port, 0xD7FF);
        assert_eq!(args, argv(&["atari800", "-xl", "game.xex"]));
    }

    #[test]
    fn run_flag_enables_and_starts_running() {
        let mut config = RemoteConfig::default();
        let mut args = argv(&["atari800", "-ai-run"]);
        config.extract_args(&mut args).unwrap();
        assert!(config.enabled);
        assert!(config.start_running);
        assert_eq!(args, argv(&["atari800"]));
    }

    #[test]
    fn trailing_value_flag_is_left_alone() {
        let mut config = RemoteConfig::default();
        let mut args = argv(&["atari800", "-ai-socket"]);
        config.extract_args(&mut args).unwrap();
        assert_eq!(config.socket_path, PathBuf::from(DEFAULT_SOCKET_PATH));
        assert_eq!(args, argv(&["atari800", "-ai-socket"]));
    }

    #[test]
    fn bad_debug_port_is_an_error() {
        let mut config = RemoteConfig::default();
        let mut args = argv(&["atari800", "-ai-debug-port", "nope"]);
        assert_eq!(
            config.extract_args(&mut args),
            Err(ConfigError::InvalidAddress("nope".to_string()))
        );
    }
}
