//! Machine state files: gzip-compressed JSON.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};

use a8remote_core::core::CpuRegisters;
use a8remote_core::error::MachineError;

pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything needed to resume the headless machine exactly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub cpu: CpuRegisters,
    pub ram: Vec<u8>,
    pub antic: [u8; 16],
    pub gtia: [u8; 32],
    pub pokey: [u8; 16],
    pub pia: [u8; 4],
    pub port_input: [u8; 2],
    pub trig: [u8; 4],
    pub pot: [u8; 8],
    pub consol: u8,
    pub kbcode: u8,
    pub skstat: u8,
    pub irqst: u8,
    pub nmist: u8,
    pub frame: u64,
    pub cycle: u32,
}

impl Snapshot {
    pub fn save(&self, path: &Path) -> Result<(), MachineError> {
        let file = File::create(path)?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        serde_json::to_writer(&mut encoder, self)
            .map_err(|e| MachineError::InvalidSnapshot(e.to_string()))?;
        encoder.finish()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, MachineError> {
        let file = File::open(path)?;
        let decoder = GzDecoder::new(BufReader::new(file));
        let snapshot: Self = serde_json::from_reader(decoder)
            .map_err(|e| MachineError::InvalidSnapshot(e.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(MachineError::InvalidSnapshot(format!(
                "unsupported version {}",
                snapshot.version
            )));
        }
        if snapshot.ram.len() != 0x10000 {
            return Err(MachineError::InvalidSnapshot(format!(
                "expected 65536 bytes of RAM, found {}",
                snapshot.ram.len()
            )));
        }
        Ok(snapshot)
    }
}
