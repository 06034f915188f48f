//! Debug capture: guest writes to one armed address are collected into a
//! bounded host-readable buffer.
//!
//! The machine's memory subsystem holds a [`DebugPort`] handle and forwards
//! matching writes to it; the remote layer holds the [`DebugCapture`] owner
//! side and drains it on `debug_read`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::machine::Machine;

/// Address armed by `debug_enable` when the request carries none.
pub const DEFAULT_DEBUG_ADDRESS: u16 = 0xD7FF;

/// Default buffer capacity in bytes.
pub const DEFAULT_CAPACITY: usize = 4096;

/// Fixed-capacity append-only byte buffer. Bytes past capacity are dropped.
#[derive(Debug)]
pub struct DebugBuffer {
    data: Vec<u8>,
    capacity: usize,
}

impl DebugBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Store `byte` if there is room. Returns false when it was dropped.
    pub fn append(&mut self, byte: u8) -> bool {
        if self.data.len() < self.capacity {
            self.data.push(byte);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Take everything captured so far and leave the buffer empty.
    pub fn drain(&mut self) -> Capture {
        Capture {
            bytes: std::mem::take(&mut self.data),
        }
    }
}

/// Contents of one drain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Capture {
    pub bytes: Vec<u8>,
}

impl Capture {
    /// Printable rendering: bytes outside 0x20-0x7E, `"` and `\` become `.`.
    pub fn ascii(&self) -> String {
        self.bytes
            .iter()
            .map(|&b| {
                if (0x20..0x7F).contains(&b) && b != b'"' && b != b'\\' {
                    b as char
                } else {
                    '.'
                }
            })
            .collect()
    }
}

/// Write-hook handle installed in the machine's memory subsystem.
#[derive(Clone, Debug)]
pub struct DebugPort {
    address: u16,
    buffer: Rc<RefCell<DebugBuffer>>,
}

impl DebugPort {
    pub fn address(&self) -> u16 {
        self.address
    }

    /// Record one guest write to the debug address.
    pub fn capture(&self, data: u8) {
        self.buffer.borrow_mut().append(data);
    }
}

/// Owner side of the debug capture: arms the hook and drains the buffer.
#[derive(Debug)]
pub struct DebugCapture {
    address: u16,
    buffer: Rc<RefCell<DebugBuffer>>,
}

impl DebugCapture {
    pub fn new(capacity: usize) -> Self {
        Self {
            address: 0,
            buffer: Rc::new(RefCell::new(DebugBuffer::new(capacity))),
        }
    }

    /// Currently armed address, 0 when disarmed.
    pub fn address(&self) -> u16 {
        self.address
    }

    /// Arm capture at `address` and install the hook in `machine`.
    /// Address 0 disarms the hook; buffered bytes are kept either way.
    pub fn enable<M: Machine + ?Sized>(&mut self, address: u16, machine: &mut M) {
        self.address = address;
        machine.attach_debug_port(self.port());
    }

    /// Hook handle for the armed address, `None` when disarmed.
    pub fn port(&self) -> Option<DebugPort> {
        (self.address != 0).then(|| DebugPort {
            address: self.address,
            buffer: Rc::clone(&self.buffer),
        })
    }

    pub fn len(&self) -> usize {
        self.buffer.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.borrow().is_empty()
    }

    pub fn drain(&mut self) -> Capture {
        self.buffer.borrow_mut().drain()
    }
}
