use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::debug_port::DebugPort;
use crate::error::MachineError;

/// 6502 register file as exchanged with the remote layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuRegisters {
    pub pc: u16,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub p: u8,
}

impl CpuRegisters {
    pub const FLAG_C: u8 = 0x01;
    pub const FLAG_Z: u8 = 0x02;
    pub const FLAG_I: u8 = 0x04;
    pub const FLAG_D: u8 = 0x08;
    pub const FLAG_B: u8 = 0x10;
    pub const FLAG_V: u8 = 0x40;
    pub const FLAG_N: u8 = 0x80;

    pub fn flag(&self, mask: u8) -> bool {
        self.p & mask != 0
    }
}

/// ANTIC register snapshot. Field names match the wire protocol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AnticRegisters {
    pub dmactl: u8,
    pub chactl: u8,
    pub dlist: u16,
    pub hscrol: u8,
    pub vscrol: u8,
    pub pmbase: u8,
    pub chbase: u8,
    pub nmien: u8,
    pub nmist: u8,
    pub vcount: u8,
    pub ypos: u16,
    pub xpos: u16,
}

/// GTIA register snapshot (write registers plus the trigger inputs).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GtiaRegisters {
    pub hposp0: u8,
    pub hposp1: u8,
    pub hposp2: u8,
    pub hposp3: u8,
    pub hposm0: u8,
    pub hposm1: u8,
    pub hposm2: u8,
    pub hposm3: u8,
    pub sizep0: u8,
    pub sizep1: u8,
    pub sizep2: u8,
    pub sizep3: u8,
    pub sizem: u8,
    pub grafp0: u8,
    pub grafp1: u8,
    pub grafp2: u8,
    pub grafp3: u8,
    pub grafm: u8,
    pub colpm0: u8,
    pub colpm1: u8,
    pub colpm2: u8,
    pub colpm3: u8,
    pub colpf0: u8,
    pub colpf1: u8,
    pub colpf2: u8,
    pub colpf3: u8,
    pub colbk: u8,
    pub prior: u8,
    pub gractl: u8,
    pub trig0: u8,
    pub trig1: u8,
    pub trig2: u8,
    pub trig3: u8,
}

/// POKEY register snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PokeyRegisters {
    pub audf1: u8,
    pub audc1: u8,
    pub audf2: u8,
    pub audc2: u8,
    pub audf3: u8,
    pub audc3: u8,
    pub audf4: u8,
    pub audc4: u8,
    pub audctl: u8,
    pub kbcode: u8,
    pub irqen: u8,
    pub irqst: u8,
    pub skstat: u8,
    pub skctl: u8,
    pub pot0: u8,
    pub pot1: u8,
    pub pot2: u8,
    pub pot3: u8,
    pub pot4: u8,
    pub pot5: u8,
    pub pot6: u8,
    pub pot7: u8,
}

/// PIA register snapshot, including the joystick input latches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PiaRegisters {
    pub porta: u8,
    pub portb: u8,
    pub pactl: u8,
    pub pbctl: u8,
    pub port_input0: u8,
    pub port_input1: u8,
}

/// One mounted disk drive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DriveStatus {
    pub drive: u8,
    pub path: String,
    pub sectors: u32,
}

/// The emulator as seen by the remote layer.
///
/// The remote layer never simulates anything itself: every effect on the
/// emulated machine goes through this trait. Implementors own CPU
/// execution, chip timing, rendering, and the on-disk formats for programs,
/// disks, states, and screenshots.
///
/// Per-frame call order from the host is `poll_input()`, then the remote
/// layer's input overrides, then `run_frame()`.
pub trait Machine {
    /// Native display resolution as (width, height) in pixels.
    fn display_size(&self) -> (u32, u32);

    /// Palette-index screen buffer, `width * height` bytes, row-major.
    /// The low nibble of each byte is luminance.
    fn screen(&self) -> &[u8];

    /// Sample the host-side input devices into the hardware input latches
    /// (PIA port inputs, GTIA triggers) for the coming frame.
    fn poll_input(&mut self);

    /// Run one frame of emulation. May end early when a breakpoint is hit.
    fn run_frame(&mut self);

    /// Execute exactly one CPU instruction.
    fn step_instruction(&mut self);

    /// Cold start.
    fn reset(&mut self);

    fn cpu(&self) -> CpuRegisters;
    fn set_cpu(&mut self, regs: CpuRegisters);

    /// Side-effect-free memory read (I/O registers are not strobed).
    fn peek(&self, addr: u16) -> u8;

    /// Memory write with normal bus semantics, including write hooks.
    fn poke(&mut self, addr: u16, data: u8);

    fn antic(&self) -> AnticRegisters;
    fn gtia(&self) -> GtiaRegisters;
    fn pokey(&self) -> PokeyRegisters;
    fn pia(&self) -> PiaRegisters;

    /// PIA joystick input latch. Index 0 holds sticks 0 (low nibble) and 1
    /// (high nibble); index 1 holds sticks 2 and 3.
    fn port_input(&self, index: usize) -> u8;
    fn set_port_input(&mut self, index: usize, value: u8);

    /// Set the GTIA trigger input for a joystick port, active-low (0 = pressed).
    fn set_trig(&mut self, port: usize, value: u8);

    /// Hold a key down. A negative `code` means no key.
    fn set_key(&mut self, code: i32, shift: bool);

    /// Console switch byte, active-low (bit 0 START, 1 SELECT, 2 OPTION).
    fn set_console(&mut self, consol: u8);

    /// Paddle position for POT0-POT7.
    fn set_paddle(&mut self, port: usize, value: u8);

    fn set_breakpoint(&mut self, addr: u16, enabled: bool);

    /// Address of the breakpoint hit since the last call, if any.
    fn take_breakpoint_hit(&mut self) -> Option<u16>;

    fn load_program(&mut self, path: &Path) -> Result<(), MachineError>;
    fn save_screenshot(&self, path: &Path) -> Result<(), MachineError>;
    fn save_state(&self, path: &Path) -> Result<(), MachineError>;
    fn load_state(&mut self, path: &Path) -> Result<(), MachineError>;

    /// Mount a disk image in drive 1-8.
    fn insert_disk(&mut self, drive: u8, path: &Path) -> Result<(), MachineError>;
    fn eject_disk(&mut self, drive: u8) -> Result<(), MachineError>;

    /// Status of every mounted drive, in drive order.
    fn disk_status(&self) -> Vec<DriveStatus>;

    /// Install (or with `None`, remove) the write hook for the debug address.
    /// Guest writes to `port.address()` must be passed to `port.capture()`.
    fn attach_debug_port(&mut self, port: Option<DebugPort>);
}
