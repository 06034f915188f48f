use std::collections::BTreeSet;
use std::path::Path;

use log::info;

use a8remote_core::core::{
    AnticRegisters, CpuRegisters, DriveStatus, GtiaRegisters, Machine, PiaRegisters,
    PokeyRegisters,
};
use a8remote_core::debug_port::DebugPort;
use a8remote_core::error::MachineError;

use crate::cpu::{Cpu6502, Memory};
use crate::media::{DiskImage, LoadFile, RUNAD};
use crate::registry::MachineEntry;
use crate::snapshot::{SNAPSHOT_VERSION, Snapshot};
use crate::video;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------
// NTSC: 114 CPU cycles per scanline, 262 scanlines per frame.
const CYCLES_PER_SCANLINE: u32 = 114;
const SCANLINES_PER_FRAME: u32 = 262;
const CYCLES_PER_FRAME: u32 = CYCLES_PER_SCANLINE * SCANLINES_PER_FRAME;

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------
pub const WIDTH: u32 = 384;
pub const HEIGHT: u32 = 240;

// Playfield window drawn in COLPF2 when ANTIC playfield DMA is on.
const PLAYFIELD_X: std::ops::Range<u32> = 24..360;
const PLAYFIELD_Y: std::ops::Range<u32> = 24..216;

// ---------------------------------------------------------------------------
// Memory map
// ---------------------------------------------------------------------------
/// OS real-time clock, bumped once per frame (big-endian, $12-$14).
pub const RTCLOK: u16 = 0x0012;

const GTIA_BASE: u16 = 0xD000;
const POKEY_BASE: u16 = 0xD200;
const PIA_BASE: u16 = 0xD300;
const ANTIC_BASE: u16 = 0xD400;

// Register offsets used outside plain storage.
const GTIA_COLPF2: usize = 0x18;
const GTIA_COLBK: usize = 0x1A;
const GTIA_PAL: u16 = 0x14;
const GTIA_CONSOL: u16 = 0x1F;
const POKEY_ALLPOT: u16 = 0x08;
const POKEY_KBCODE: u16 = 0x09;
const POKEY_IRQST: u16 = 0x0E;
const POKEY_SKSTAT: u16 = 0x0F;
const ANTIC_DMACTL: usize = 0x00;
const ANTIC_VCOUNT: u16 = 0x0B;
const ANTIC_NMIST: u16 = 0x0F;

const NMIST_VBI: u8 = 0x40;
const SKSTAT_KEY_DOWN: u8 = 0x04;
const SKSTAT_SHIFT_DOWN: u8 = 0x08;
const IRQST_KEY: u8 = 0x40;

pub const DRIVES: usize = 8;

/// Everything the CPU can address: RAM plus the chip register files and
/// the input latches the chips read back.
///
/// Memory map (Atari 800, no OS ROM):
///   0x0000-0xCFFF  RAM
///   0xD000-0xD0FF  GTIA (32 registers, mirrored)
///   0xD200-0xD2FF  POKEY (16 registers, mirrored)
///   0xD300-0xD3FF  PIA (4 registers, mirrored)
///   0xD400-0xD4FF  ANTIC (16 registers, mirrored)
///   everything else RAM
pub struct AtariBus {
    ram: Vec<u8>,
    antic: [u8; 16],
    gtia: [u8; 32],
    pokey: [u8; 16],
    pia: [u8; 4],
    port_input: [u8; 2],
    trig: [u8; 4],
    pot: [u8; 8],
    consol: u8,
    kbcode: u8,
    skstat: u8,
    irqst: u8,
    nmist: u8,
    vcount: u8,
    debug: Option<DebugPort>,
}

impl AtariBus {
    fn new() -> Self {
        Self {
            ram: vec![0; 0x10000],
            antic: [0; 16],
            gtia: [0; 32],
            pokey: [0; 16],
            pia: [0; 4],
            port_input: [0xFF; 2],
            trig: [1; 4],
            pot: [228; 8],
            consol: 0x07,
            kbcode: 0xFF,
            skstat: 0xFF,
            irqst: 0xFF,
            nmist: 0,
            vcount: 0,
            debug: None,
        }
    }

    /// Power-on chip and RAM state. The debug hook stays installed.
    fn cold_start(&mut self) {
        let debug = self.debug.take();
        *self = Self::new();
        self.debug = debug;
    }

    /// Side-effect-free read.
    fn peek(&self, addr: u16) -> u8 {
        match addr & 0xFF00 {
            GTIA_BASE => match addr & 0x1F {
                0x10..=0x13 => self.trig[(addr & 0x03) as usize],
                GTIA_PAL => 0x0F,
                GTIA_CONSOL => self.consol,
                // Collision registers: nothing collides.
                _ => 0x00,
            },
            POKEY_BASE => match addr & 0x0F {
                reg @ 0x00..=0x07 => self.pot[reg as usize],
                POKEY_ALLPOT => 0x00,
                POKEY_KBCODE => self.kbcode,
                POKEY_IRQST => self.irqst,
                POKEY_SKSTAT => self.skstat,
                _ => 0xFF,
            },
            PIA_BASE => match addr & 0x03 {
                0 => self.port_input[0],
                1 => self.port_input[1],
                reg => self.pia[reg as usize],
            },
            ANTIC_BASE => match addr & 0x0F {
                ANTIC_VCOUNT => self.vcount,
                ANTIC_NMIST => self.nmist | 0x1F,
                _ => 0xFF,
            },
            _ => self.ram[addr as usize],
        }
    }

    fn store(&mut self, addr: u16, data: u8) {
        if let Some(port) = &self.debug
            && port.address() == addr
        {
            port.capture(data);
        }
        match addr & 0xFF00 {
            GTIA_BASE => {
                let reg = (addr & 0x1F) as usize;
                if reg == GTIA_CONSOL as usize {
                    // Speaker and console output bits; the switches stay host-driven.
                    return;
                }
                self.gtia[reg] = data;
            }
            POKEY_BASE => self.pokey[(addr & 0x0F) as usize] = data,
            PIA_BASE => self.pia[(addr & 0x03) as usize] = data,
            ANTIC_BASE => {
                let reg = (addr & 0x0F) as usize;
                if reg == ANTIC_NMIST as usize {
                    // NMIRES
                    self.nmist = 0;
                }
                self.antic[reg] = data;
            }
            _ => self.ram[addr as usize] = data,
        }
    }
}

impl Memory for AtariBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.peek(addr)
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.store(addr, data);
    }
}

/// Headless Atari-800-shaped machine.
///
/// Hardware: a small 6502 subset at 114 cycles per scanline, register-file
/// models of ANTIC, GTIA, POKEY and PIA, eight disk drives. The display is
/// a flat fill: COLBK everywhere, COLPF2 over the playfield window when
/// playfield DMA is enabled.
pub struct HeadlessMachine {
    cpu: Cpu6502,
    bus: AtariBus,
    screen: Vec<u8>,
    breakpoints: BTreeSet<u16>,
    breakpoint_hit: Option<u16>,
    disks: [Option<DiskImage>; DRIVES],
    // Host-side joystick state sampled by poll_input().
    host_sticks: [u8; 4],
    host_trig: [u8; 4],
    frame: u64,
    cycle: u32,
}

impl Default for HeadlessMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessMachine {
    pub fn new() -> Self {
        let mut machine = Self {
            cpu: Cpu6502::new(),
            bus: AtariBus::new(),
            screen: vec![0; (WIDTH * HEIGHT) as usize],
            breakpoints: BTreeSet::new(),
            breakpoint_hit: None,
            disks: Default::default(),
            host_sticks: [0x0F; 4],
            host_trig: [1; 4],
            frame: 0,
            cycle: 0,
        };
        machine.reset();
        machine
    }

    /// Set the host joystick state for `port` (direction nibble, active-low
    /// trigger). Takes effect at the next `poll_input()`.
    pub fn set_host_joystick(&mut self, port: usize, nibble: u8, pressed: bool) {
        if port < self.host_sticks.len() {
            self.host_sticks[port] = nibble & 0x0F;
            self.host_trig[port] = u8::from(!pressed);
        }
    }

    /// Frames completed since power-on.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    fn check_breakpoint(&mut self) -> bool {
        if self.breakpoints.contains(&self.cpu.pc) {
            self.breakpoint_hit = Some(self.cpu.pc);
            true
        } else {
            false
        }
    }

    fn execute(&mut self) {
        let cycles = self.cpu.step(&mut self.bus);
        self.cycle += cycles;
        self.bus.vcount = (self.cycle / CYCLES_PER_SCANLINE / 2) as u8;
        if self.cycle >= CYCLES_PER_FRAME {
            self.end_frame();
        }
    }

    fn end_frame(&mut self) {
        self.cycle -= CYCLES_PER_FRAME;
        self.frame += 1;
        self.bus.nmist |= NMIST_VBI;

        // Stand-in for the OS vertical blank: advance the 24-bit clock.
        let clock = RTCLOK as usize;
        let ticks = u32::from_be_bytes([
            0,
            self.bus.ram[clock],
            self.bus.ram[clock + 1],
            self.bus.ram[clock + 2],
        ])
        .wrapping_add(1);
        let [_, hi, mid, lo] = ticks.to_be_bytes();
        self.bus.ram[clock..clock + 3].copy_from_slice(&[hi, mid, lo]);

        self.render();
    }

    fn render(&mut self) {
        let colbk = self.bus.gtia[GTIA_COLBK];
        let colpf2 = self.bus.gtia[GTIA_COLPF2];
        let playfield = self.bus.antic[ANTIC_DMACTL] & 0x03 != 0;
        for y in 0..HEIGHT {
            let row = &mut self.screen[(y * WIDTH) as usize..((y + 1) * WIDTH) as usize];
            for (x, pixel) in row.iter_mut().enumerate() {
                let inside =
                    playfield && PLAYFIELD_Y.contains(&y) && PLAYFIELD_X.contains(&(x as u32));
                *pixel = if inside { colpf2 } else { colbk };
            }
        }
    }

    fn snapshot(&self) -> Snapshot {
        let bus = &self.bus;
        Snapshot {
            version: SNAPSHOT_VERSION,
            cpu: self.cpu.registers(),
            ram: bus.ram.clone(),
            antic: bus.antic,
            gtia: bus.gtia,
            pokey: bus.pokey,
            pia: bus.pia,
            port_input: bus.port_input,
            trig: bus.trig,
            pot: bus.pot,
            consol: bus.consol,
            kbcode: bus.kbcode,
            skstat: bus.skstat,
            irqst: bus.irqst,
            nmist: bus.nmist,
            frame: self.frame,
            cycle: self.cycle,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        let bus = &mut self.bus;
        bus.ram = snapshot.ram;
        bus.antic = snapshot.antic;
        bus.gtia = snapshot.gtia;
        bus.pokey = snapshot.pokey;
        bus.pia = snapshot.pia;
        bus.port_input = snapshot.port_input;
        bus.trig = snapshot.trig;
        bus.pot = snapshot.pot;
        bus.consol = snapshot.consol;
        bus.kbcode = snapshot.kbcode;
        bus.skstat = snapshot.skstat;
        bus.irqst = snapshot.irqst;
        bus.nmist = snapshot.nmist;
        self.cpu.set_registers(snapshot.cpu);
        self.frame = snapshot.frame;
        self.cycle = snapshot.cycle % CYCLES_PER_FRAME;
        self.bus.vcount = (self.cycle / CYCLES_PER_SCANLINE / 2) as u8;
        self.render();
    }

    fn drive_slot(&mut self, drive: u8) -> Result<&mut Option<DiskImage>, MachineError> {
        match drive {
            1..=8 => Ok(&mut self.disks[drive as usize - 1]),
            _ => Err(MachineError::InvalidDrive(drive)),
        }
    }
}

impl Machine for HeadlessMachine {
    fn display_size(&self) -> (u32, u32) {
        (WIDTH, HEIGHT)
    }

    fn screen(&self) -> &[u8] {
        &self.screen
    }

    fn poll_input(&mut self) {
        self.bus.port_input[0] = self.host_sticks[0] | (self.host_sticks[1] << 4);
        self.bus.port_input[1] = self.host_sticks[2] | (self.host_sticks[3] << 4);
        self.bus.trig = self.host_trig;
    }

    /// Runs to the end of the current frame, or stops early when the PC
    /// reaches a breakpoint. A stopped frame resumes on the next call.
    fn run_frame(&mut self) {
        let target = self.frame + 1;
        while self.frame < target {
            self.execute();
            if self.check_breakpoint() {
                return;
            }
        }
    }

    fn step_instruction(&mut self) {
        self.execute();
        self.check_breakpoint();
    }

    fn reset(&mut self) {
        self.bus.cold_start();
        self.cpu.reset(&mut self.bus);
        self.cycle = 0;
        self.breakpoint_hit = None;
        self.render();
    }

    fn cpu(&self) -> CpuRegisters {
        self.cpu.registers()
    }

    fn set_cpu(&mut self, regs: CpuRegisters) {
        self.cpu.set_registers(regs);
    }

    fn peek(&self, addr: u16) -> u8 {
        self.bus.peek(addr)
    }

    fn poke(&mut self, addr: u16, data: u8) {
        self.bus.store(addr, data);
    }

    fn antic(&self) -> AnticRegisters {
        let a = &self.bus.antic;
        AnticRegisters {
            dmactl: a[0x00],
            chactl: a[0x01],
            dlist: u16::from_le_bytes([a[0x02], a[0x03]]),
            hscrol: a[0x04],
            vscrol: a[0x05],
            pmbase: a[0x07],
            chbase: a[0x09],
            nmien: a[0x0E],
            nmist: self.bus.nmist | 0x1F,
            vcount: self.bus.vcount,
            ypos: (self.cycle / CYCLES_PER_SCANLINE) as u16,
            xpos: (self.cycle % CYCLES_PER_SCANLINE) as u16,
        }
    }

    fn gtia(&self) -> GtiaRegisters {
        let g = &self.bus.gtia;
        GtiaRegisters {
            hposp0: g[0x00],
            hposp1: g[0x01],
            hposp2: g[0x02],
            hposp3: g[0x03],
            hposm0: g[0x04],
            hposm1: g[0x05],
            hposm2: g[0x06],
            hposm3: g[0x07],
            sizep0: g[0x08],
            sizep1: g[0x09],
            sizep2: g[0x0A],
            sizep3: g[0x0B],
            sizem: g[0x0C],
            grafp0: g[0x0D],
            grafp1: g[0x0E],
            grafp2: g[0x0F],
            grafp3: g[0x10],
            grafm: g[0x11],
            colpm0: g[0x12],
            colpm1: g[0x13],
            colpm2: g[0x14],
            colpm3: g[0x15],
            colpf0: g[0x16],
            colpf1: g[0x17],
            colpf2: g[0x18],
            colpf3: g[0x19],
            colbk: g[0x1A],
            prior: g[0x1B],
            gractl: g[0x1D],
            trig0: self.bus.trig[0],
            trig1: self.bus.trig[1],
            trig2: self.bus.trig[2],
            trig3: self.bus.trig[3],
        }
    }

    fn pokey(&self) -> PokeyRegisters {
        let p = &self.bus.pokey;
        let pot = &self.bus.pot;
        PokeyRegisters {
            audf1: p[0x00],
            audc1: p[0x01],
            audf2: p[0x02],
            audc2: p[0x03],
            audf3: p[0x04],
            audc3: p[0x05],
            audf4: p[0x06],
            audc4: p[0x07],
            audctl: p[0x08],
            kbcode: self.bus.kbcode,
            irqen: p[0x0E],
            irqst: self.bus.irqst,
            skstat: self.bus.skstat,
            skctl: p[0x0F],
            pot0: pot[0],
            pot1: pot[1],
            pot2: pot[2],
            pot3: pot[3],
            pot4: pot[4],
            pot5: pot[5],
            pot6: pot[6],
            pot7: pot[7],
        }
    }

    fn pia(&self) -> PiaRegisters {
        PiaRegisters {
            porta: self.bus.pia[0],
            portb: self.bus.pia[1],
            pactl: self.bus.pia[2],
            pbctl: self.bus.pia[3],
            port_input0: self.bus.port_input[0],
            port_input1: self.bus.port_input[1],
        }
    }

    fn port_input(&self, index: usize) -> u8 {
        self.bus.port_input.get(index).copied().unwrap_or(0xFF)
    }

    fn set_port_input(&mut self, index: usize, value: u8) {
        if let Some(latch) = self.bus.port_input.get_mut(index) {
            *latch = value;
        }
    }

    fn set_trig(&mut self, port: usize, value: u8) {
        if let Some(trig) = self.bus.trig.get_mut(port) {
            *trig = value;
        }
    }

    fn set_key(&mut self, code: i32, shift: bool) {
        if code < 0 {
            self.bus.skstat |= SKSTAT_KEY_DOWN | SKSTAT_SHIFT_DOWN;
            self.bus.irqst |= IRQST_KEY;
            return;
        }
        self.bus.kbcode = (code as u8 & 0x3F) | if shift { 0x40 } else { 0x00 };
        self.bus.skstat &= !SKSTAT_KEY_DOWN;
        if shift {
            self.bus.skstat &= !SKSTAT_SHIFT_DOWN;
        } else {
            self.bus.skstat |= SKSTAT_SHIFT_DOWN;
        }
        self.bus.irqst &= !IRQST_KEY;
    }

    fn set_console(&mut self, consol: u8) {
        self.bus.consol = consol & 0x07;
    }

    fn set_paddle(&mut self, port: usize, value: u8) {
        if let Some(pot) = self.bus.pot.get_mut(port) {
            *pot = value;
        }
    }

    fn set_breakpoint(&mut self, addr: u16, enabled: bool) {
        if enabled {
            self.breakpoints.insert(addr);
        } else {
            self.breakpoints.remove(&addr);
        }
    }

    fn take_breakpoint_hit(&mut self) -> Option<u16> {
        self.breakpoint_hit.take()
    }

    fn load_program(&mut self, path: &Path) -> Result<(), MachineError> {
        let file = LoadFile::parse(&std::fs::read(path)?)?;

        let runad = RUNAD as usize;
        self.bus.ram[runad..runad + 2].fill(0);
        for segment in &file.segments {
            for (offset, &byte) in segment.data.iter().enumerate() {
                let addr = segment.start.wrapping_add(offset as u16);
                self.bus.ram[addr as usize] = byte;
            }
        }

        let run = u16::from_le_bytes([self.bus.ram[runad], self.bus.ram[runad + 1]]);
        self.cpu.pc = if run != 0 {
            run
        } else {
            file.segments[0].start
        };
        info!(
            "Loaded {} ({} segments), running at ${:04X}",
            path.display(),
            file.segments.len(),
            self.cpu.pc
        );
        Ok(())
    }

    fn save_screenshot(&self, path: &Path) -> Result<(), MachineError> {
        video::save_png(path, &self.screen, WIDTH, HEIGHT)
    }

    fn save_state(&self, path: &Path) -> Result<(), MachineError> {
        self.snapshot().save(path)
    }

    fn load_state(&mut self, path: &Path) -> Result<(), MachineError> {
        let snapshot = Snapshot::load(path)?;
        self.restore(snapshot);
        Ok(())
    }

    fn insert_disk(&mut self, drive: u8, path: &Path) -> Result<(), MachineError> {
        let slot = self.drive_slot(drive)?;
        let image = DiskImage::open(path)?;
        info!("D{drive}: {} ({} sectors)", image.path, image.sectors);
        *slot = Some(image);
        Ok(())
    }

    fn eject_disk(&mut self, drive: u8) -> Result<(), MachineError> {
        *self.drive_slot(drive)? = None;
        Ok(())
    }

    fn disk_status(&self) -> Vec<DriveStatus> {
        self.disks
            .iter()
            .enumerate()
            .filter_map(|(i, disk)| {
                disk.as_ref().map(|image| DriveStatus {
                    drive: i as u8 + 1,
                    path: image.path.clone(),
                    sectors: image.sectors,
                })
            })
            .collect()
    }

    fn attach_debug_port(&mut self, port: Option<DebugPort>) {
        self.bus.debug = port;
    }
}

fn create() -> Box<dyn Machine> {
    Box::new(HeadlessMachine::new())
}

inventory::submit! {
    MachineEntry::new(
        "headless",
        "Atari 800 register model with a 6502 subset, no video or audio output",
        create,
    )
}
