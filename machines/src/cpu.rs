//! A small instruction-stepped 6502 covering the opcodes the headless
//! machine's tests and demo programs use. Unimplemented opcodes execute as
//! one-byte NOPs.

use a8remote_core::core::CpuRegisters;

/// Memory as the CPU sees it.
pub trait Memory {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, data: u8);
}

#[repr(u8)]
#[derive(Copy, Clone, Debug)]
pub enum StatusFlag {
    C = 0x01, // Carry
    Z = 0x02, // Zero
    I = 0x04, // Interrupt Disable
    D = 0x08, // Decimal
    B = 0x10, // Break
    U = 0x20, // Unused (always 1)
    V = 0x40, // Overflow
    N = 0x80, // Negative
}

pub const RESET_VECTOR: u16 = 0xFFFC;

#[derive(Clone, Debug)]
pub struct Cpu6502 {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub pc: u16,
    pub sp: u8,
    pub p: u8,
}

impl Default for Cpu6502 {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu6502 {
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            pc: 0,
            sp: 0xFD,
            p: 0x24, // I=1, U=1
        }
    }

    pub fn reset<M: Memory + ?Sized>(&mut self, mem: &mut M) {
        *self = Self::new();
        self.pc = read_word(mem, RESET_VECTOR);
    }

    pub fn registers(&self) -> CpuRegisters {
        CpuRegisters {
            pc: self.pc,
            a: self.a,
            x: self.x,
            y: self.y,
            sp: self.sp,
            p: self.p,
        }
    }

    pub fn set_registers(&mut self, regs: CpuRegisters) {
        self.pc = regs.pc;
        self.a = regs.a;
        self.x = regs.x;
        self.y = regs.y;
        self.sp = regs.sp;
        self.p = regs.p | StatusFlag::U as u8;
    }

    #[inline]
    fn set_flag(&mut self, flag: StatusFlag, set: bool) {
        if set {
            self.p |= flag as u8;
        } else {
            self.p &= !(flag as u8);
        }
    }

    #[inline]
    fn flag(&self, flag: StatusFlag) -> bool {
        self.p & flag as u8 != 0
    }

    fn set_nz(&mut self, value: u8) {
        self.set_flag(StatusFlag::Z, value == 0);
        self.set_flag(StatusFlag::N, value & 0x80 != 0);
    }

    fn fetch<M: Memory + ?Sized>(&mut self, mem: &mut M) -> u8 {
        let byte = mem.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        byte
    }

    fn fetch_word<M: Memory + ?Sized>(&mut self, mem: &mut M) -> u16 {
        let lo = self.fetch(mem);
        let hi = self.fetch(mem);
        u16::from_le_bytes([lo, hi])
    }

    fn push<M: Memory + ?Sized>(&mut self, mem: &mut M, data: u8) {
        mem.write(0x0100 | self.sp as u16, data);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pull<M: Memory + ?Sized>(&mut self, mem: &mut M) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        mem.read(0x0100 | self.sp as u16)
    }

    fn branch<M: Memory + ?Sized>(&mut self, mem: &mut M, taken: bool) -> u32 {
        let offset = self.fetch(mem) as i8;
        if taken {
            self.pc = self.pc.wrapping_add(offset as u16);
            3
        } else {
            2
        }
    }

    fn compare(&mut self, register: u8, operand: u8) {
        self.set_flag(StatusFlag::C, register >= operand);
        self.set_nz(register.wrapping_sub(operand));
    }

    /// Execute one instruction and return the cycles it took.
    pub fn step<M: Memory + ?Sized>(&mut self, mem: &mut M) -> u32 {
        let opcode = self.fetch(mem);
        match opcode {
            // Loads
            0xA9 => {
                self.a = self.fetch(mem);
                self.set_nz(self.a);
                2
            }
            0xA5 => {
                let addr = self.fetch(mem) as u16;
                self.a = mem.read(addr);
                self.set_nz(self.a);
                3
            }
            0xAD => {
                let addr = self.fetch_word(mem);
                self.a = mem.read(addr);
                self.set_nz(self.a);
                4
            }
            0xBD => {
                let addr = self.fetch_word(mem).wrapping_add(self.x as u16);
                self.a = mem.read(addr);
                self.set_nz(self.a);
                4
            }
            0xA2 => {
                self.x = self.fetch(mem);
                self.set_nz(self.x);
                2
            }
            0xA0 => {
                self.y = self.fetch(mem);
                self.set_nz(self.y);
                2
            }

            // Stores
            0x85 => {
                let addr = self.fetch(mem) as u16;
                mem.write(addr, self.a);
                3
            }
            0x8D => {
                let addr = self.fetch_word(mem);
                mem.write(addr, self.a);
                4
            }
            0x9D => {
                let addr = self.fetch_word(mem).wrapping_add(self.x as u16);
                mem.write(addr, self.a);
                5
            }
            0x8E => {
                let addr = self.fetch_word(mem);
                mem.write(addr, self.x);
                4
            }
            0x8C => {
                let addr = self.fetch_word(mem);
                mem.write(addr, self.y);
                4
            }

            // Register transfers and increments
            0xAA => {
                self.x = self.a;
                self.set_nz(self.x);
                2
            }
            0x8A => {
                self.a = self.x;
                self.set_nz(self.a);
                2
            }
            0xE8 => {
                self.x = self.x.wrapping_add(1);
                self.set_nz(self.x);
                2
            }
            0xC8 => {
                self.y = self.y.wrapping_add(1);
                self.set_nz(self.y);
                2
            }
            0xCA => {
                self.x = self.x.wrapping_sub(1);
                self.set_nz(self.x);
                2
            }
            0x88 => {
                self.y = self.y.wrapping_sub(1);
                self.set_nz(self.y);
                2
            }
            0xEE => {
                let addr = self.fetch_word(mem);
                let value = mem.read(addr).wrapping_add(1);
                mem.write(addr, value);
                self.set_nz(value);
                6
            }

            // Compare
            0xC9 => {
                let operand = self.fetch(mem);
                self.compare(self.a, operand);
                2
            }

            // Flow control
            0x4C => {
                self.pc = self.fetch_word(mem);
                3
            }
            0x20 => {
                let target = self.fetch_word(mem);
                let ret = self.pc.wrapping_sub(1);
                self.push(mem, (ret >> 8) as u8);
                self.push(mem, ret as u8);
                self.pc = target;
                6
            }
            0x60 => {
                let lo = self.pull(mem);
                let hi = self.pull(mem);
                self.pc = u16::from_le_bytes([lo, hi]).wrapping_add(1);
                6
            }
            0xD0 => {
                let taken = !self.flag(StatusFlag::Z);
                self.branch(mem, taken)
            }
            0xF0 => {
                let taken = self.flag(StatusFlag::Z);
                self.branch(mem, taken)
            }

            // Flags
            0x18 => {
                self.set_flag(StatusFlag::C, false);
                2
            }
            0x38 => {
                self.set_flag(StatusFlag::C, true);
                2
            }
            0x58 => {
                self.set_flag(StatusFlag::I, false);
                2
            }
            0x78 => {
                self.set_flag(StatusFlag::I, true);
                2
            }
            0xD8 => {
                self.set_flag(StatusFlag::D, false);
                2
            }

            // NOP and everything not implemented
            _ => 2,
        }
    }
}

pub fn read_word<M: Memory + ?Sized>(mem: &mut M, addr: u16) -> u16 {
    let lo = mem.read(addr);
    let hi = mem.read(addr.wrapping_add(1));
    u16::from_le_bytes([lo, hi])
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ram(Vec<u8>);

    impl Memory for Ram {
        fn read(&mut self, addr: u16) -> u8 {
            self.0[addr as usize]
        }
        fn write(&mut self, addr: u16, data: u8) {
            self.0[addr as usize] = data;
        }
    }

    fn ram_with(addr: u16, program: &[u8]) -> Ram {
        let mut ram = Ram(vec![0; 0x10000]);
        ram.0[addr as usize..addr as usize + program.len()].copy_from_slice(program);
        ram
    }

    #[test]
    fn lda_sta_round_trip() {
        let mut mem = ram_with(0x0600, &[0xA9, 0x80, 0x8D, 0x00, 0x07]);
        let mut cpu = Cpu6502::new();
        cpu.pc = 0x0600;
        cpu.step(&mut mem);
        assert_eq!(cpu.a, 0x80);
        assert!(cpu.flag(StatusFlag::N));
        cpu.step(&mut mem);
        assert_eq!(mem.0[0x0700], 0x80);
        assert_eq!(cpu.pc, 0x0605);
    }

    #[test]
    fn countdown_loop_exits() {
        // LDX #3; DEX; BNE -3
        let mut mem = ram_with(0x0600, &[0xA2, 0x03, 0xCA, 0xD0, 0xFD]);
        let mut cpu = Cpu6502::new();
        cpu.pc = 0x0600;
        for _ in 0..7 {
            cpu.step(&mut mem);
        }
        assert_eq!(cpu.x, 0);
        assert_eq!(cpu.pc, 0x0605);
    }

    #[test]
    fn jsr_rts_return_past_call() {
        // JSR $0610; NOP ... $0610: RTS
        let mut mem = ram_with(0x0600, &[0x20, 0x10, 0x06, 0xEA]);
        mem.0[0x0610] = 0x60;
        let mut cpu = Cpu6502::new();
        cpu.pc = 0x0600;
        cpu.step(&mut mem);
        assert_eq!(cpu.pc, 0x0610);
        cpu.step(&mut mem);
        assert_eq!(cpu.pc, 0x0603);
        assert_eq!(cpu.sp, 0xFD);
    }

    #[test]
    fn reset_reads_vector() {
        let mut mem = ram_with(RESET_VECTOR, &[0x00, 0x20]);
        let mut cpu = Cpu6502::new();
        cpu.a = 9;
        cpu.reset(&mut mem);
        assert_eq!(cpu.pc, 0x2000);
        assert_eq!(cpu.a, 0);
    }
}
