//! Command name to handler mapping.
//!
//! Every handler validates its arguments before touching the machine, so a
//! request answered with an error leaves the emulator exactly as it was.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;

use super::Control;
use crate::core::machine::{CpuRegisters, Machine};
use crate::debug_port::DEFAULT_DEBUG_ADDRESS;
use crate::error::CommandError;
use crate::input::{
    AKEY_NONE, CONSOL_NONE, CONSOL_OPTION, CONSOL_SELECT, CONSOL_START, Direction, JOYSTICK_PORTS,
    PADDLE_MAX, PADDLE_PORTS,
};
use crate::protocol::{Request, Response};
use crate::screen::{self, ASCII_COLUMNS, ASCII_ROWS};

/// Longest `peek` read in bytes.
pub const MAX_PEEK: i64 = 256;

/// Number of disk drives, addressed 1-8.
pub const DRIVES: i64 = 8;

const DEFAULT_PADDLE: i64 = 128;

/// What the caller should do after a command.
#[derive(Debug)]
pub enum Outcome {
    /// Send this response now.
    Reply(Response),
    /// The response follows when the scheduler completes a run or step.
    Deferred,
}

type Handled = Result<Response, CommandError>;

/// Execute one request against the machine.
pub fn dispatch<M: Machine + ?Sized>(
    req: &Request,
    control: &mut Control,
    machine: &mut M,
) -> Outcome {
    debug!("Remote command: {}", req.cmd());

    let result = match req.cmd() {
        "ping" => Ok(Response::ok().with("msg", "pong")),
        "load" => load(req, machine),
        "run" => {
            control.scheduler.run_frames(count(req, "frames"));
            return Outcome::Deferred;
        }
        "step" => {
            control.scheduler.run_instructions(count(req, "instructions"));
            return Outcome::Deferred;
        }
        "pause" => {
            control.scheduler.pause();
            Ok(Response::ok())
        }
        "reset" => {
            machine.reset();
            Ok(Response::ok())
        }

        "key" => key(req, machine),
        "key_release" => {
            machine.set_key(AKEY_NONE, false);
            Ok(Response::ok())
        }
        "joystick" => joystick(req, control),
        "paddle" => paddle(req, machine),
        "consol" => consol(req, machine),

        "screenshot" => screenshot(req, machine),
        "screen_ascii" => Ok(screen_ascii(machine)),
        "screen_raw" => Ok(screen_raw(machine)),

        "peek" => peek(req, machine),
        "poke" => poke(req, machine),
        "dump" => dump(req, machine),

        "cpu" => Ok(cpu(machine.cpu())),
        "cpu_set" => cpu_set(req, machine),
        "antic" => Ok(Response::ok().merge(&machine.antic())),
        "gtia" => Ok(Response::ok().merge(&machine.gtia())),
        "pokey" => Ok(Response::ok().merge(&machine.pokey())),
        "pia" => Ok(Response::ok().merge(&machine.pia())),
        "breakpoint" => breakpoint(req, machine),

        "disk_insert" => disk_insert(req, machine),
        "disk_eject" => disk_eject(req, machine),
        "disk_status" => Ok(Response::ok().with_serialized("drives", &machine.disk_status())),

        "save_state" => save_state(req, machine),
        "load_state" => load_state(req, machine),

        "debug_enable" => debug_enable(req, control, machine),
        "debug_read" => {
            let capture = control.debug.drain();
            Ok(Response::ok()
                .with("data", capture.bytes.clone())
                .with("ascii", capture.ascii()))
        }

        other => Err(CommandError::Unknown(other.to_string())),
    };

    Outcome::Reply(result.unwrap_or_else(|e| {
        debug!("Remote command {} failed: {e}", req.cmd());
        Response::error(e.to_string())
    }))
}

// ====================================================================
// Argument helpers
// ====================================================================

fn count(req: &Request, key: &str) -> u32 {
    req.int_or(key, 1).clamp(1, i64::from(u32::MAX)) as u32
}

fn required_path<'a>(req: &'a Request) -> Result<&'a Path, CommandError> {
    req.opt_str("path")
        .map(Path::new)
        .ok_or(CommandError::MissingField("path"))
}

fn address(value: i64) -> Result<u16, CommandError> {
    u16::try_from(value).map_err(|_| CommandError::InvalidAddress(value))
}

fn byte(value: i64) -> Result<u8, CommandError> {
    u8::try_from(value).map_err(|_| CommandError::InvalidByte(value))
}

fn port(value: i64, ports: usize) -> Result<usize, CommandError> {
    usize::try_from(value)
        .ok()
        .filter(|&p| p < ports)
        .ok_or(CommandError::InvalidPort {
            port: value,
            max: ports as i64 - 1,
        })
}

fn drive(req: &Request) -> Result<u8, CommandError> {
    let value = req.int_or("drive", 1);
    if (1..=DRIVES).contains(&value) {
        Ok(value as u8)
    } else {
        Err(CommandError::InvalidDrive(value))
    }
}

// ====================================================================
// Lifecycle
// ====================================================================

fn load<M: Machine + ?Sized>(req: &Request, machine: &mut M) -> Handled {
    let path = required_path(req)?;
    machine
        .load_program(path)
        .map_err(|e| CommandError::machine(format!("Failed to load {}", path.display()), e))?;
    Ok(Response::ok())
}

// ====================================================================
// Input
// ====================================================================

fn key<M: Machine + ?Sized>(req: &Request, machine: &mut M) -> Handled {
    let code = req
        .int_or("code", i64::from(AKEY_NONE))
        .clamp(i64::from(AKEY_NONE), i64::from(i32::MAX)) as i32;
    machine.set_key(code, req.bool_or("shift", false));
    Ok(Response::ok())
}

fn joystick(req: &Request, control: &mut Control) -> Handled {
    let port = port(req.int_or("port", 0), JOYSTICK_PORTS)?;
    let direction = Direction::parse(req.str_or("direction", "center"));
    control
        .overrides
        .set(port, direction, req.bool_or("fire", false));
    Ok(Response::ok())
}

fn paddle<M: Machine + ?Sized>(req: &Request, machine: &mut M) -> Handled {
    let port = port(req.int_or("port", 0), PADDLE_PORTS)?;
    let value = req
        .int_or("value", DEFAULT_PADDLE)
        .clamp(0, i64::from(PADDLE_MAX)) as u8;
    machine.set_paddle(port, value);
    Ok(Response::ok())
}

fn consol<M: Machine + ?Sized>(req: &Request, machine: &mut M) -> Handled {
    let mut value = CONSOL_NONE;
    for (key, bit) in [
        ("start", CONSOL_START),
        ("select", CONSOL_SELECT),
        ("option", CONSOL_OPTION),
    ] {
        if req.bool_or(key, false) {
            value &= !bit;
        }
    }
    machine.set_console(value);
    Ok(Response::ok())
}

// ====================================================================
// Screen
// ====================================================================

fn screenshot<M: Machine + ?Sized>(req: &Request, machine: &mut M) -> Handled {
    let path = match req.opt_str("path") {
        Some(path) => path.to_string(),
        None => {
            let secs = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            format!("/tmp/atari800_ai_{secs}.png")
        }
    };
    machine
        .save_screenshot(Path::new(&path))
        .map_err(|e| CommandError::machine(format!("Failed to save screenshot {path}"), e))?;
    Ok(Response::ok().with("path", path))
}

fn screen_ascii<M: Machine + ?Sized>(machine: &M) -> Response {
    let (width, height) = machine.display_size();
    let rows = screen::ascii_rows(machine.screen(), width as usize, height as usize);
    Response::ok()
        .with("width", ASCII_COLUMNS)
        .with("height", ASCII_ROWS)
        .with("data", rows)
}

fn screen_raw<M: Machine + ?Sized>(machine: &M) -> Response {
    let (width, height) = machine.display_size();
    Response::ok()
        .with("width", width)
        .with("height", height)
        .with("data", screen::encode_raw(machine.screen()))
}

// ====================================================================
// Memory
// ====================================================================

fn peek<M: Machine + ?Sized>(req: &Request, machine: &M) -> Handled {
    let addr = address(req.int_or("addr", 0))?;
    let len = req.int_or("len", 1).clamp(0, MAX_PEEK) as u16;
    let data: Vec<u8> = (0..len)
        .map(|i| machine.peek(addr.wrapping_add(i)))
        .collect();
    Ok(Response::ok().with("addr", addr).with("data", data))
}

fn poke<M: Machine + ?Sized>(req: &Request, machine: &mut M) -> Handled {
    let addr = address(req.int_or("addr", 0))?;
    let values = req
        .int_list("data")
        .or_else(|| req.int_list("values"))
        .ok_or(CommandError::MissingField("data"))?;
    let bytes = values
        .into_iter()
        .map(byte)
        .collect::<Result<Vec<u8>, _>>()?;
    for (offset, &value) in bytes.iter().enumerate() {
        machine.poke(addr.wrapping_add(offset as u16), value);
    }
    Ok(Response::ok().with("bytes", bytes.len()))
}

fn dump<M: Machine + ?Sized>(req: &Request, machine: &M) -> Handled {
    let start_raw = req.int_or("start", 0);
    let end_raw = req.int_or("end", 0xFFFF);
    let start = address(start_raw)?;
    let end = address(end_raw)?;
    if start > end {
        return Err(CommandError::InvalidRange {
            start: start_raw,
            end: end_raw,
        });
    }
    let path = required_path(req)?;
    let bytes: Vec<u8> = (start..=end).map(|addr| machine.peek(addr)).collect();
    std::fs::write(path, &bytes).map_err(|source| CommandError::Io {
        context: format!("Failed to write {}", path.display()),
        source,
    })?;
    Ok(Response::ok().with("bytes", bytes.len()))
}

// ====================================================================
// CPU and chips
// ====================================================================

fn cpu(regs: CpuRegisters) -> Response {
    Response::ok()
        .merge(&regs)
        .with("n", regs.flag(CpuRegisters::FLAG_N))
        .with("v", regs.flag(CpuRegisters::FLAG_V))
        .with("b", regs.flag(CpuRegisters::FLAG_B))
        .with("d", regs.flag(CpuRegisters::FLAG_D))
        .with("i", regs.flag(CpuRegisters::FLAG_I))
        .with("z", regs.flag(CpuRegisters::FLAG_Z))
        .with("c", regs.flag(CpuRegisters::FLAG_C))
}

fn cpu_set<M: Machine + ?Sized>(req: &Request, machine: &mut M) -> Handled {
    let mut regs = machine.cpu();
    if let Some(pc) = req.int("pc") {
        regs.pc = address(pc)?;
    }
    for (key, reg) in [
        ("a", &mut regs.a),
        ("x", &mut regs.x),
        ("y", &mut regs.y),
        ("sp", &mut regs.sp),
        ("p", &mut regs.p),
    ] {
        if let Some(value) = req.int(key) {
            *reg = byte(value)?;
        }
    }
    machine.set_cpu(regs);
    Ok(cpu(regs))
}

fn breakpoint<M: Machine + ?Sized>(req: &Request, machine: &mut M) -> Handled {
    let addr = address(req.int_or("addr", 0))?;
    let enabled = req.bool_or("enabled", true);
    machine.set_breakpoint(addr, enabled);
    Ok(Response::ok().with("addr", addr).with("enabled", enabled))
}

// ====================================================================
// Devices
// ====================================================================

fn disk_insert<M: Machine + ?Sized>(req: &Request, machine: &mut M) -> Handled {
    let drive = drive(req)?;
    let path = required_path(req)?;
    machine.insert_disk(drive, path).map_err(|e| {
        CommandError::machine(format!("Failed to mount {} in D{drive}:", path.display()), e)
    })?;
    Ok(Response::ok().with("drive", drive))
}

fn disk_eject<M: Machine + ?Sized>(req: &Request, machine: &mut M) -> Handled {
    let drive = drive(req)?;
    machine
        .eject_disk(drive)
        .map_err(|e| CommandError::machine(format!("Failed to eject D{drive}:"), e))?;
    Ok(Response::ok().with("drive", drive))
}

// ====================================================================
// Persistence
// ====================================================================

fn save_state<M: Machine + ?Sized>(req: &Request, machine: &mut M) -> Handled {
    let path = required_path(req)?;
    machine
        .save_state(path)
        .map_err(|e| CommandError::machine(format!("Failed to save state {}", path.display()), e))?;
    Ok(Response::ok())
}

fn load_state<M: Machine + ?Sized>(req: &Request, machine: &mut M) -> Handled {
    let path = required_path(req)?;
    machine
        .load_state(path)
        .map_err(|e| CommandError::machine(format!("Failed to load state {}", path.display()), e))?;
    Ok(Response::ok())
}

// ====================================================================
// Debug capture
// ====================================================================

fn debug_enable<M: Machine + ?Sized>(
    req: &Request,
    control: &mut Control,
    machine: &mut M,
) -> Handled {
    let addr = address(req.int_or("addr", i64::from(DEFAULT_DEBUG_ADDRESS)))?;
    control.debug.enable(addr, machine);
    Ok(Response::ok().with("addr", addr))
}
