pub mod config;
pub mod core;
pub mod debug_port;
pub mod error;
pub mod input;
pub mod protocol;
pub mod screen;
pub mod server;

pub mod prelude {
    pub use crate::config::RemoteConfig;
    pub use crate::core::machine::{CpuRegisters, Machine};
    pub use crate::debug_port::DebugPort;
    pub use crate::error::{CommandError, MachineError, RemoteError};
    pub use crate::server::{Remote, scheduler::RunState};
}
