//! The remote-control context driven by the host frame loop.
//!
//! ```text
//! host loop ──► Remote::frame(machine)
//!                 ├─ begin_frame: accept, account frame, answer completion,
//!                 │               serve requests while paused
//!                 ├─ machine.poll_input()
//!                 ├─ apply_input (agent overrides)
//!                 └─ machine.run_frame()
//! ```

pub mod dispatch;
pub mod scheduler;
pub mod session;

use std::path::Path;
use std::time::Duration;

use log::{debug, info, warn};

use self::dispatch::{Outcome, dispatch};
use self::scheduler::{Completion, RunState, Scheduler};
use self::session::{Incoming, Listener};
use crate::config::RemoteConfig;
use crate::core::machine::Machine;
use crate::debug_port::DebugCapture;
use crate::error::RemoteError;
use crate::input::InputOverrides;
use crate::protocol::Response;

/// Per-session control state that commands act on.
#[derive(Debug)]
pub struct Control {
    pub scheduler: Scheduler,
    pub overrides: InputOverrides,
    pub debug: DebugCapture,
}

impl Control {
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            scheduler: Scheduler::new(config.start_running),
            overrides: InputOverrides::new(),
            debug: DebugCapture::new(config.debug_capacity),
        }
    }
}

pub struct Remote {
    listener: Listener,
    control: Control,
    idle_wait: Duration,
}

impl Remote {
    /// Bind the control socket and arm the configured debug address.
    pub fn bind<M: Machine + ?Sized>(
        config: &RemoteConfig,
        machine: &mut M,
    ) -> Result<Self, RemoteError> {
        let listener = Listener::bind(&config.socket_path, config.max_request)?;
        let mut control = Control::new(config);
        if config.debug_port != 0 {
            control.debug.enable(config.debug_port, machine);
            info!("Debug capture armed at ${:04X}", config.debug_port);
        }
        if config.start_running {
            info!("Running until a client connects");
        }
        Ok(Self {
            listener,
            control,
            idle_wait: config.idle_wait(),
        })
    }

    pub fn socket_path(&self) -> &Path {
        self.listener.path()
    }

    pub fn state(&self) -> RunState {
        self.control.scheduler.state()
    }

    pub fn is_paused(&self) -> bool {
        self.control.scheduler.is_paused()
    }

    pub fn is_attached(&self) -> bool {
        self.listener.is_attached()
    }

    /// One full host frame: control work, input poll, overrides, emulation.
    pub fn frame<M: Machine + ?Sized>(&mut self, machine: &mut M) {
        self.begin_frame(machine);
        machine.poll_input();
        self.apply_input(machine);
        machine.run_frame();
    }

    /// Control work before a frame runs. Blocks while paused with a client
    /// attached, serving its requests.
    pub fn begin_frame<M: Machine + ?Sized>(&mut self, machine: &mut M) {
        self.poll_connections();

        let hit = machine.take_breakpoint_hit();
        if let Some(completion) = self.control.scheduler.frame_elapsed(hit) {
            self.complete(completion, machine);
        } else if let Some(pc) = hit {
            debug!("Breakpoint hit at ${pc:04X}");
        }

        self.serve_while_paused(machine);
    }

    /// Replace polled joystick state with the agent's overrides.
    pub fn apply_input<M: Machine + ?Sized>(&self, machine: &mut M) {
        self.control.overrides.apply(machine);
    }

    /// Serve at most one pending request. Returns false when nothing was
    /// waiting.
    pub fn pump<M: Machine + ?Sized>(&mut self, machine: &mut M) -> bool {
        let Some(incoming) = self.listener.next_request() else {
            return false;
        };
        match incoming {
            Incoming::Request(req) => match dispatch(&req, &mut self.control, machine) {
                Outcome::Reply(response) => {
                    self.listener.send(&response);
                }
                Outcome::Deferred => {}
            },
            Incoming::Malformed(e) => {
                warn!("Malformed request: {e}");
                self.listener.send(&Response::error(e.to_string()));
            }
            Incoming::Closed => self.control.overrides.clear(),
        }
        true
    }

    fn poll_connections(&mut self) {
        if self.listener.poll_accept() {
            self.control.scheduler.force_pause();
            self.control.overrides.clear();
        }
    }

    fn serve_while_paused<M: Machine + ?Sized>(&mut self, machine: &mut M) {
        loop {
            if self.control.scheduler.is_stepping() {
                self.run_instructions(machine);
                continue;
            }
            if !self.control.scheduler.is_paused() || !self.listener.is_attached() {
                break;
            }
            if !self.pump(machine) {
                std::thread::sleep(self.idle_wait);
            }
            self.poll_connections();
        }
        if !self.listener.is_attached() {
            self.control.overrides.clear();
        }
    }

    fn run_instructions<M: Machine + ?Sized>(&mut self, machine: &mut M) {
        while self.control.scheduler.is_stepping() {
            machine.step_instruction();
            let hit = machine.take_breakpoint_hit();
            if let Some(completion) = self.control.scheduler.instruction_elapsed(hit) {
                self.complete(completion, machine);
            }
        }
    }

    fn complete<M: Machine + ?Sized>(&mut self, completion: Completion, machine: &M) {
        let (response, breakpoint) = match completion {
            Completion::Frames { run, breakpoint } => {
                (Response::ok().with("frames_run", run), breakpoint)
            }
            Completion::Instructions { run, breakpoint } => (
                Response::ok()
                    .with("instructions_run", run)
                    .with("pc", machine.cpu().pc),
                breakpoint,
            ),
        };
        let response = match breakpoint {
            Some(pc) => response.with("breakpoint", pc),
            None => response,
        };
        self.listener.send(&response);
    }
}
