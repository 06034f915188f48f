//! Program and disk image formats: XEX binary load files and ATR/XFD disk
//! images.

use std::path::Path;

use a8remote_core::error::MachineError;

/// Run address written by a load file to start the program.
pub const RUNAD: u16 = 0x02E0;

pub const SECTOR_SIZE: usize = 128;

/// One contiguous block of a load file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub start: u16,
    pub data: Vec<u8>,
}

/// Parsed XEX load file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadFile {
    pub segments: Vec<Segment>,
}

impl LoadFile {
    /// Parse a binary load file: `FF FF`, then segments of
    /// `start-lo start-hi end-lo end-hi data...`. Segment headers may repeat
    /// the `FF FF` marker.
    pub fn parse(bytes: &[u8]) -> Result<Self, MachineError> {
        if bytes.len() < 2 || bytes[0] != 0xFF || bytes[1] != 0xFF {
            return Err(MachineError::InvalidImage(
                "missing $FFFF load file header".to_string(),
            ));
        }

        let mut segments = Vec::new();
        let mut pos = 2;
        while pos < bytes.len() {
            let word = |pos: &mut usize| -> Result<u16, MachineError> {
                let lo = *bytes.get(*pos).ok_or_else(truncated)?;
                let hi = *bytes.get(*pos + 1).ok_or_else(truncated)?;
                *pos += 2;
                Ok(u16::from_le_bytes([lo, hi]))
            };

            let mut start = word(&mut pos)?;
            if start == 0xFFFF {
                start = word(&mut pos)?;
            }
            let end = word(&mut pos)?;
            if end < start {
                return Err(MachineError::InvalidImage(format!(
                    "segment ${start:04X}-${end:04X} ends before it starts"
                )));
            }
            let len = (end - start) as usize + 1;
            let data = bytes.get(pos..pos + len).ok_or_else(truncated)?;
            segments.push(Segment {
                start,
                data: data.to_vec(),
            });
            pos += len;
        }

        if segments.is_empty() {
            return Err(MachineError::InvalidImage("no segments".to_string()));
        }
        Ok(Self { segments })
    }
}

fn truncated() -> MachineError {
    MachineError::InvalidImage("truncated segment".to_string())
}

/// A mounted disk image.
#[derive(Clone, Debug)]
pub struct DiskImage {
    pub path: String,
    pub sector_size: usize,
    pub sectors: u32,
    pub data: Vec<u8>,
}

impl DiskImage {
    /// Load an ATR image (16-byte header with magic `96 02`) or a headerless
    /// XFD image of 128-byte sectors.
    pub fn open(path: &Path) -> Result<Self, MachineError> {
        let bytes = std::fs::read(path)?;
        let name = path.display().to_string();

        if bytes.len() >= 16 && bytes[0] == 0x96 && bytes[1] == 0x02 {
            let paragraphs =
                u32::from(u16::from_le_bytes([bytes[2], bytes[3]])) | (u32::from(bytes[6]) << 16);
            let sector_size = u16::from_le_bytes([bytes[4], bytes[5]]) as usize;
            if sector_size != 128 && sector_size != 256 {
                return Err(MachineError::InvalidImage(format!(
                    "unsupported sector size {sector_size}"
                )));
            }
            let image_len = paragraphs as usize * 16;
            let data = bytes[16..].to_vec();
            if data.len() < image_len {
                return Err(MachineError::InvalidImage(format!(
                    "ATR header claims {image_len} bytes, file has {}",
                    data.len()
                )));
            }
            // Double-density images keep the three boot sectors at 128 bytes.
            let sectors = if sector_size == 256 && image_len >= 3 * SECTOR_SIZE {
                3 + (image_len - 3 * SECTOR_SIZE) / 256
            } else {
                image_len / sector_size
            };
            return Ok(Self {
                path: name,
                sector_size,
                sectors: sectors as u32,
                data,
            });
        }

        let is_xfd = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xfd"));
        if is_xfd && !bytes.is_empty() && bytes.len() % SECTOR_SIZE == 0 {
            return Ok(Self {
                path: name,
                sector_size: SECTOR_SIZE,
                sectors: (bytes.len() / SECTOR_SIZE) as u32,
                data: bytes,
            });
        }

        Err(MachineError::InvalidImage(format!(
            "{name} is not an ATR or XFD disk image"
        )))
    }
}
