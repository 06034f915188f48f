use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use a8remote_core::core::{
    AnticRegisters, CpuRegisters, DriveStatus, GtiaRegisters, Machine, PiaRegisters,
    PokeyRegisters,
};
use a8remote_core::debug_port::DebugPort;
use a8remote_core::error::MachineError;

pub const WIDTH: u32 = 384;
pub const HEIGHT: u32 = 240;

/// Frame counter location, bumped once per frame like the OS clock.
pub const RTCLOK: u16 = 0x0014;
pub const PORTA: u16 = 0xD300;
pub const TRIG0: u16 = 0xD010;

/// Minimal machine for testing: flat 64KB memory, a CPU that only advances
/// its PC, and input latches that can be inspected directly.
pub struct TestMachine {
    pub memory: Vec<u8>,
    pub cpu: CpuRegisters,
    pub screen: Vec<u8>,
    pub frames: u32,
    pub steps: u32,
    pub port_input: [u8; 2],
    pub trig: [u8; 4],
    /// Values `poll_input` copies into the latches, standing in for the
    /// host keyboard joystick.
    pub host_port_input: [u8; 2],
    pub host_trig: [u8; 4],
    pub key: (i32, bool),
    pub consol: u8,
    pub paddles: [u8; 8],
    pub breakpoints: Vec<u16>,
    pub breakpoint_hit: Option<u16>,
    pub loaded: Vec<PathBuf>,
    pub disks: BTreeMap<u8, PathBuf>,
    pub debug: Option<DebugPort>,
}

impl TestMachine {
    pub fn new() -> Self {
        Self {
            memory: vec![0; 0x10000],
            cpu: CpuRegisters {
                pc: 0x0600,
                sp: 0xFF,
                p: 0x34,
                ..CpuRegisters::default()
            },
            screen: vec![0; (WIDTH * HEIGHT) as usize],
            frames: 0,
            steps: 0,
            port_input: [0xFF; 2],
            trig: [1; 4],
            host_port_input: [0xFF; 2],
            host_trig: [1; 4],
            key: (-1, false),
            consol: 0x07,
            paddles: [228; 8],
            breakpoints: Vec::new(),
            breakpoint_hit: None,
            loaded: Vec::new(),
            disks: BTreeMap::new(),
            debug: None,
        }
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        let start = addr as usize;
        self.memory[start..start + data.len()].copy_from_slice(data);
    }

    fn check_breakpoint(&mut self) {
        if self.breakpoints.contains(&self.cpu.pc) {
            self.breakpoint_hit = Some(self.cpu.pc);
        }
    }
}

impl Machine for TestMachine {
    fn display_size(&self) -> (u32, u32) {
        (WIDTH, HEIGHT)
    }

    fn screen(&self) -> &[u8] {
        &self.screen
    }

    fn poll_input(&mut self) {
        self.port_input = self.host_port_input;
        self.trig = self.host_trig;
    }

    fn run_frame(&mut self) {
        self.frames += 1;
        let clock = RTCLOK as usize;
        self.memory[clock] = self.memory[clock].wrapping_add(1);
        self.cpu.pc = self.cpu.pc.wrapping_add(0x10);
        self.check_breakpoint();
    }

    fn step_instruction(&mut self) {
        self.steps += 1;
        self.cpu.pc = self.cpu.pc.wrapping_add(1);
        self.check_breakpoint();
    }

    fn reset(&mut self) {
        self.memory.fill(0);
        self.cpu = CpuRegisters {
            pc: 0x0600,
            sp: 0xFF,
            p: 0x34,
            ..CpuRegisters::default()
        };
    }

    fn cpu(&self) -> CpuRegisters {
        self.cpu
    }

    fn set_cpu(&mut self, regs: CpuRegisters) {
        self.cpu = regs;
    }

    fn peek(&self, addr: u16) -> u8 {
        match addr {
            PORTA => self.port_input[0],
            0xD301 => self.port_input[1],
            0xD010..=0xD013 => self.trig[(addr - TRIG0) as usize],
            _ => self.memory[addr as usize],
        }
    }

    fn poke(&mut self, addr: u16, data: u8) {
        self.memory[addr as usize] = data;
        if let Some(port) = &self.debug {
            if port.address() == addr {
                port.capture(data);
            }
        }
    }

    fn antic(&self) -> AnticRegisters {
        AnticRegisters {
            dmactl: 0x22,
            dlist: 0xBC20,
            ..AnticRegisters::default()
        }
    }

    fn gtia(&self) -> GtiaRegisters {
        GtiaRegisters {
            colbk: 0x94,
            trig0: self.trig[0],
            trig1: self.trig[1],
            trig2: self.trig[2],
            trig3: self.trig[3],
            ..GtiaRegisters::default()
        }
    }

    fn pokey(&self) -> PokeyRegisters {
        PokeyRegisters {
            pot0: self.paddles[0],
            pot7: self.paddles[7],
            ..PokeyRegisters::default()
        }
    }

    fn pia(&self) -> PiaRegisters {
        PiaRegisters {
            port_input0: self.port_input[0],
            port_input1: self.port_input[1],
            ..PiaRegisters::default()
        }
    }

    fn port_input(&self, index: usize) -> u8 {
        self.port_input[index]
    }

    fn set_port_input(&mut self, index: usize, value: u8) {
        self.port_input[index] = value;
    }

    fn set_trig(&mut self, port: usize, value: u8) {
        self.trig[port] = value;
    }

    fn set_key(&mut self, code: i32, shift: bool) {
        self.key = (code, shift);
    }

    fn set_console(&mut self, consol: u8) {
        self.consol = consol;
    }

    fn set_paddle(&mut self, port: usize, value: u8) {
        self.paddles[port] = value;
    }

    fn set_breakpoint(&mut self, addr: u16, enabled: bool) {
        self.breakpoints.retain(|&a| a != addr);
        if enabled {
            self.breakpoints.push(addr);
        }
    }

    fn take_breakpoint_hit(&mut self) -> Option<u16> {
        self.breakpoint_hit.take()
    }

    fn load_program(&mut self, path: &Path) -> Result<(), MachineError> {
        if !path.exists() {
            return Err(MachineError::InvalidImage(format!("{} not found", path.display())));
        }
        self.loaded.push(path.to_path_buf());
        Ok(())
    }

    fn save_screenshot(&self, path: &Path) -> Result<(), MachineError> {
        std::fs::write(path, &self.screen)?;
        Ok(())
    }

    fn save_state(&self, path: &Path) -> Result<(), MachineError> {
        let mut bytes = self.memory.clone();
        bytes.extend_from_slice(&self.cpu.pc.to_le_bytes());
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn load_state(&mut self, path: &Path) -> Result<(), MachineError> {
        let bytes = std::fs::read(path)?;
        if bytes.len() != 0x10002 {
            return Err(MachineError::InvalidSnapshot("wrong size".to_string()));
        }
        self.memory.copy_from_slice(&bytes[..0x10000]);
        self.cpu.pc = u16::from_le_bytes([bytes[0x10000], bytes[0x10001]]);
        Ok(())
    }

    fn insert_disk(&mut self, drive: u8, path: &Path) -> Result<(), MachineError> {
        if !path.exists() {
            return Err(MachineError::InvalidImage(format!("{} not found", path.display())));
        }
        self.disks.insert(drive, path.to_path_buf());
        Ok(())
    }

    fn eject_disk(&mut self, drive: u8) -> Result<(), MachineError> {
        self.disks.remove(&drive);
        Ok(())
    }

    fn disk_status(&self) -> Vec<DriveStatus> {
        self.disks
            .iter()
            .map(|(&drive, path)| DriveStatus {
                drive,
                path: path.display().to_string(),
                sectors: 720,
            })
            .collect()
    }

    fn attach_debug_port(&mut self, port: Option<DebugPort>) {
        self.debug = port;
    }
}
